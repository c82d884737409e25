//! Scripted answers for every wizard step, read from TOML.

use std::{collections::BTreeMap, fs, path::Path};

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use onboarding::{EntryDetails, EntryRef, OnboardingSession, OrganizationDetails, WizardStep};
use serde::Deserialize;
use shared::domain::{DistributionType, LocationCategory};
use tracing::{debug, warn};

#[derive(Debug, Deserialize)]
pub struct Plan {
    pub cause_id: Option<i64>,
    pub organization: PlanOrganization,
    #[serde(default)]
    pub distribution_type: DistributionType,
    pub tote_quantity: Option<i64>,
    /// Applied after the distribution step, rescaling selected points.
    pub final_quantity: Option<i64>,
    pub logo_url: Option<String>,
    #[serde(default)]
    pub message: String,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    #[serde(default)]
    pub cities: Vec<PlanCity>,
    #[serde(default)]
    pub custom_points: Vec<PlanCustomPoint>,
}

#[derive(Debug, Deserialize)]
pub struct PlanOrganization {
    pub organization_name: String,
    pub contact_name: String,
    pub email: String,
    #[serde(default)]
    pub phone: String,
}

#[derive(Debug, Deserialize)]
pub struct PlanCity {
    pub name: String,
    /// Catalog location names to select.
    #[serde(default)]
    pub select: Vec<String>,
    /// Tote counts keyed by catalog location name.
    #[serde(default)]
    pub resize: BTreeMap<String, i64>,
}

#[derive(Debug, Deserialize)]
pub struct PlanCustomPoint {
    pub city: String,
    pub category: LocationCategory,
    pub name: String,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub contact_person: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub totes: i64,
}

pub fn parse_plan(raw: &str) -> Result<Plan> {
    toml::from_str(raw).context("invalid wizard plan")
}

pub fn load_plan(path: &Path) -> Result<Plan> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read plan '{}'", path.display()))?;
    parse_plan(&raw)
}

/// Walks the session from its current step to the confirmation step,
/// answering each one from the plan.
pub fn apply_plan(session: &mut OnboardingSession, plan: &Plan) -> Result<()> {
    loop {
        let step = session.step();
        debug!(step = step.number(), title = step.title(), "answering step");
        match step {
            WizardStep::OrganizationDetails => {
                session.set_organization(OrganizationDetails {
                    organization_name: plan.organization.organization_name.clone(),
                    contact_name: plan.organization.contact_name.clone(),
                    email: plan.organization.email.clone(),
                    phone: plan.organization.phone.clone(),
                });
            }
            WizardStep::Quantity => {
                session.set_distribution_type(plan.distribution_type);
                if let Some(quantity) = plan.tote_quantity {
                    session.set_tote_quantity(quantity);
                }
            }
            WizardStep::LogoDesign => {
                session.set_logo_url(plan.logo_url.clone());
                session.set_message(plan.message.clone());
            }
            WizardStep::DistributionInfo => {
                if plan.distribution_type == DistributionType::Physical {
                    apply_distribution(session, plan)?;
                    session.set_dates(plan.start_date, plan.end_date);
                }
                if let Some(quantity) = plan.final_quantity {
                    let outcome = session.set_tote_quantity(quantity);
                    debug!(?outcome, quantity, "final quantity applied");
                }
            }
            WizardStep::Confirmation => return Ok(()),
        }
        session.next_step();
    }
}

fn apply_distribution(session: &mut OnboardingSession, plan: &Plan) -> Result<()> {
    for city in &plan.cities {
        if !session.add_city(&city.name) && !session.state().selection.contains_city(&city.name) {
            bail!("city '{}' is not in the location catalog", city.name);
        }
        for name in &city.select {
            let at = find_catalog_entry(session, &city.name, name)
                .with_context(|| format!("no location '{name}' in {}", city.name))?;
            session.toggle_entry(&at);
        }
        for (name, totes) in &city.resize {
            let at = find_catalog_entry(session, &city.name, name)
                .with_context(|| format!("no location '{name}' in {}", city.name))?;
            session.resize_entry(&at, *totes);
        }
    }

    for point in &plan.custom_points {
        let added = session.add_custom_point(
            &point.city,
            point.category,
            &point.name,
            EntryDetails {
                address: point.address.clone(),
                contact_person: point.contact_person.clone(),
                phone: point.phone.clone(),
            },
            point.totes,
        );
        if added.is_none() {
            warn!(city = %point.city, name = %point.name, "custom point skipped");
        }
    }
    Ok(())
}

/// First catalog (non-custom) entry with this name, in any category.
fn find_catalog_entry(session: &OnboardingSession, city: &str, name: &str) -> Option<EntryRef> {
    let distribution = session.state().selection.city(city)?;
    distribution.categories().find_map(|(category, entries)| {
        entries
            .iter()
            .position(|entry| !entry.id.is_custom() && entry.name.eq_ignore_ascii_case(name))
            .map(|index| EntryRef::new(city, category, index))
    })
}
