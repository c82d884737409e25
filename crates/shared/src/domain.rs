use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

macro_rules! id_newtype {
    ($name:ident) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        pub struct $name(pub i64);
    };
}

id_newtype!(CauseId);
id_newtype!(SponsorshipId);
id_newtype!(LocationId);

#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown {kind} '{value}'")]
pub struct ParseDomainError {
    pub kind: &'static str,
    pub value: String,
}

impl ParseDomainError {
    fn new(kind: &'static str, value: &str) -> Self {
        Self {
            kind,
            value: value.to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DistributionType {
    #[default]
    Online,
    Physical,
}

impl DistributionType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Online => "online",
            Self::Physical => "physical",
        }
    }
}

impl FromStr for DistributionType {
    type Err = ParseDomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "online" => Ok(Self::Online),
            "physical" => Ok(Self::Physical),
            other => Err(ParseDomainError::new("distribution type", other)),
        }
    }
}

/// Kind of physical venue where totes are handed out.
///
/// The derived ordering is the order categories are listed in a city and the
/// order distribution points are flattened into a submission.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum LocationCategory {
    Mall,
    Park,
    Theatre,
    MetroStation,
    School,
}

impl LocationCategory {
    pub const ALL: [LocationCategory; 5] = [
        Self::Mall,
        Self::Park,
        Self::Theatre,
        Self::MetroStation,
        Self::School,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Mall => "mall",
            Self::Park => "park",
            Self::Theatre => "theatre",
            Self::MetroStation => "metro_station",
            Self::School => "school",
        }
    }

    /// Tote count a fresh entry starts at, and the floor it can never be
    /// scaled below, when no admin override exists.
    pub fn builtin_default_totes(self) -> u32 {
        match self {
            Self::Mall => 800,
            Self::Park => 600,
            Self::Theatre => 600,
            Self::MetroStation => 800,
            Self::School => 400,
        }
    }
}

impl fmt::Display for LocationCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LocationCategory {
    type Err = ParseDomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "mall" | "malls" => Ok(Self::Mall),
            "park" | "parks" => Ok(Self::Park),
            "theatre" | "theatres" | "theater" => Ok(Self::Theatre),
            "metro_station" | "metro" | "metro_stations" => Ok(Self::MetroStation),
            "school" | "schools" => Ok(Self::School),
            other => Err(ParseDomainError::new("location category", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SponsorshipStatus {
    #[default]
    Pending,
    Approved,
    Rejected,
}

impl SponsorshipStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
        }
    }
}

impl FromStr for SponsorshipStatus {
    type Err = ParseDomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pending" => Ok(Self::Pending),
            "approved" => Ok(Self::Approved),
            "rejected" => Ok(Self::Rejected),
            other => Err(ParseDomainError::new("sponsorship status", other)),
        }
    }
}

/// Stable key of a distribution point.
///
/// Catalog points reuse the catalog row id; manually added points get a
/// random id so two points can share a display name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum PointId {
    Catalog(LocationId),
    Custom(Uuid),
}

impl PointId {
    pub fn new_custom() -> Self {
        Self::Custom(Uuid::new_v4())
    }

    pub fn is_custom(&self) -> bool {
        matches!(self, Self::Custom(_))
    }
}

impl fmt::Display for PointId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Catalog(id) => write!(f, "catalog:{}", id.0),
            Self::Custom(id) => write!(f, "custom:{id}"),
        }
    }
}

impl FromStr for PointId {
    type Err = ParseDomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Some(raw) = s.strip_prefix("catalog:") {
            return raw
                .parse::<i64>()
                .map(|id| Self::Catalog(LocationId(id)))
                .map_err(|_| ParseDomainError::new("point id", s));
        }
        if let Some(raw) = s.strip_prefix("custom:") {
            return Uuid::parse_str(raw)
                .map(Self::Custom)
                .map_err(|_| ParseDomainError::new("point id", s));
        }
        Err(ParseDomainError::new("point id", s))
    }
}

impl TryFrom<String> for PointId {
    type Error = ParseDomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<PointId> for String {
    fn from(value: PointId) -> Self {
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn point_id_round_trips_through_its_string_form() {
        let catalog = PointId::Catalog(LocationId(42));
        assert_eq!(catalog.to_string(), "catalog:42");
        assert_eq!("catalog:42".parse::<PointId>().expect("parse"), catalog);

        let custom = PointId::new_custom();
        assert!(custom.is_custom());
        assert_eq!(custom.to_string().parse::<PointId>().expect("parse"), custom);
    }

    #[test]
    fn rejects_malformed_point_ids() {
        assert!("mall:1".parse::<PointId>().is_err());
        assert!("catalog:abc".parse::<PointId>().is_err());
        assert!("custom:not-a-uuid".parse::<PointId>().is_err());
    }

    #[test]
    fn category_parsing_accepts_plural_seed_keys() {
        assert_eq!("malls".parse(), Ok(LocationCategory::Mall));
        assert_eq!("Metro".parse(), Ok(LocationCategory::MetroStation));
        assert_eq!("theater".parse(), Ok(LocationCategory::Theatre));
        assert!("airport".parse::<LocationCategory>().is_err());
    }

    #[test]
    fn category_serializes_snake_case() {
        let json = serde_json::to_string(&LocationCategory::MetroStation).expect("json");
        assert_eq!(json, "\"metro_station\"");
    }
}
