//! Catalog seed files.
//!
//! ```toml
//! [defaults]
//! mall = 800
//! schools = 400
//!
//! [[causes]]
//! title = "Clean Beaches"
//! target_totes = 5000
//!
//! [[locations]]
//! city = "Pune"
//! category = "mall"
//! name = "Phoenix Marketcity"
//! address = "Viman Nagar"
//! ```

use std::{collections::BTreeMap, fs, path::Path};

use anyhow::{Context, Result};
use serde::Deserialize;
use shared::domain::LocationCategory;
use storage::{NewLocation, Storage};
use tracing::info;

#[derive(Debug, Default, Deserialize)]
pub struct SeedFile {
    #[serde(default)]
    pub defaults: BTreeMap<String, u32>,
    #[serde(default)]
    pub causes: Vec<SeedCause>,
    #[serde(default)]
    pub locations: Vec<SeedLocation>,
}

#[derive(Debug, Deserialize)]
pub struct SeedCause {
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub image_url: Option<String>,
    #[serde(default)]
    pub target_totes: u32,
}

#[derive(Debug, Deserialize)]
pub struct SeedLocation {
    pub city: String,
    pub category: String,
    pub name: String,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub contact_person: String,
    #[serde(default)]
    pub phone: String,
}

#[derive(Debug, Default, PartialEq, Eq)]
pub struct SeedReport {
    pub defaults: usize,
    pub causes: usize,
    pub locations: usize,
}

pub fn parse_seed(raw: &str) -> Result<SeedFile> {
    let seed: SeedFile = toml::from_str(raw).context("invalid seed file")?;
    for key in seed.defaults.keys() {
        key.parse::<LocationCategory>()?;
    }
    for location in &seed.locations {
        location
            .category
            .parse::<LocationCategory>()
            .with_context(|| format!("location '{}' in {}", location.name, location.city))?;
    }
    Ok(seed)
}

pub fn load_seed(path: &Path) -> Result<SeedFile> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read seed file '{}'", path.display()))?;
    parse_seed(&raw)
}

pub async fn apply_seed(storage: &Storage, seed: &SeedFile) -> Result<SeedReport> {
    let mut report = SeedReport::default();

    for (key, totes) in &seed.defaults {
        storage
            .set_category_default(key.parse::<LocationCategory>()?, *totes)
            .await?;
        report.defaults += 1;
    }

    for cause in &seed.causes {
        let cause_id = storage
            .create_cause(
                &cause.title,
                &cause.description,
                cause.image_url.as_deref(),
                cause.target_totes,
            )
            .await?;
        info!(cause_id = cause_id.0, title = %cause.title, "cause created");
        report.causes += 1;
    }

    for location in &seed.locations {
        storage
            .upsert_location(&NewLocation {
                city: &location.city,
                category: location.category.parse::<LocationCategory>()?,
                name: &location.name,
                address: &location.address,
                contact_person: &location.contact_person,
                phone: &location.phone,
            })
            .await?;
        report.locations += 1;
    }

    Ok(report)
}
