use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    domain::{
        CauseId, DistributionType, LocationCategory, LocationId, PointId, SponsorshipId,
        SponsorshipStatus,
    },
    error::ApiError,
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CauseSummary {
    pub cause_id: CauseId,
    pub title: String,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    pub target_totes: u32,
    pub sponsored_totes: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryDefault {
    pub category: LocationCategory,
    pub default_tote_count: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogLocation {
    pub location_id: LocationId,
    pub city: String,
    pub category: LocationCategory,
    pub name: String,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub contact_person: String,
    #[serde(default)]
    pub phone: String,
}

/// Everything the onboarding wizard needs to build a selection tree.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocationCatalogResponse {
    pub categories: Vec<CategoryDefault>,
    pub locations: Vec<CatalogLocation>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DistributionPointPayload {
    pub point_id: PointId,
    pub category: LocationCategory,
    pub name: String,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub contact_person: String,
    #[serde(default)]
    pub phone: String,
    /// City the point belongs to.
    pub location: String,
    pub totes_count: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SponsorshipSubmission {
    pub organization_name: String,
    pub contact_name: String,
    pub email: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cause_id: Option<CauseId>,
    pub distribution_type: DistributionType,
    pub tote_quantity: u32,
    #[serde(default)]
    pub distribution_points: Vec<DistributionPointPayload>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub distribution_start_date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub distribution_end_date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logo_url: Option<String>,
    #[serde(default)]
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SponsorshipReceipt {
    pub sponsorship_id: SponsorshipId,
    pub status: SponsorshipStatus,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SponsorshipSummary {
    pub sponsorship_id: SponsorshipId,
    pub organization_name: String,
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cause_id: Option<CauseId>,
    pub distribution_type: DistributionType,
    pub tote_quantity: u32,
    pub status: SponsorshipStatus,
    pub point_count: u32,
    pub created_at: DateTime<Utc>,
}

/// One stored sponsorship with its distribution points in submission order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SponsorshipDetail {
    #[serde(flatten)]
    pub sponsorship: SponsorshipSummary,
    pub distribution_points: Vec<DistributionPointPayload>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModerationRequest {
    pub status: SponsorshipStatus,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum ServerEvent {
    SponsorshipSubmitted {
        sponsorship: SponsorshipSummary,
    },
    SponsorshipModerated {
        sponsorship_id: SponsorshipId,
        status: SponsorshipStatus,
    },
    Error(ApiError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn submission_uses_camel_case_wire_names() {
        let submission = SponsorshipSubmission {
            organization_name: "Acme".into(),
            contact_name: "Sam".into(),
            email: "sam@acme.test".into(),
            phone: String::new(),
            cause_id: Some(CauseId(3)),
            distribution_type: DistributionType::Physical,
            tote_quantity: 800,
            distribution_points: vec![DistributionPointPayload {
                point_id: PointId::Catalog(LocationId(9)),
                category: LocationCategory::Mall,
                name: "Phoenix Mall".into(),
                address: String::new(),
                contact_person: String::new(),
                phone: String::new(),
                location: "Pune".into(),
                totes_count: 800,
            }],
            distribution_start_date: None,
            distribution_end_date: None,
            logo_url: None,
            message: String::new(),
        };

        let value = serde_json::to_value(&submission).expect("json");
        assert_eq!(value["distributionType"], "physical");
        assert_eq!(value["toteQuantity"], 800);
        assert_eq!(value["causeId"], 3);
        let point = &value["distributionPoints"][0];
        assert_eq!(point["pointId"], "catalog:9");
        assert_eq!(point["totesCount"], 800);
        assert_eq!(point["location"], "Pune");
        assert_eq!(point["contactPerson"], "");
        assert!(value.get("logoUrl").is_none());
    }

    #[test]
    fn server_event_is_tagged() {
        let event = ServerEvent::SponsorshipModerated {
            sponsorship_id: SponsorshipId(5),
            status: SponsorshipStatus::Approved,
        };
        let value = serde_json::to_value(&event).expect("json");
        assert_eq!(value["type"], "sponsorship_moderated");
        assert_eq!(value["payload"]["status"], "approved");
    }
}
