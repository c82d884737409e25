use shared::{
    domain::{CauseId, DistributionType, LocationCategory, SponsorshipId, SponsorshipStatus},
    error::{ApiError, ErrorCode},
    protocol::{
        CategoryDefault, CauseSummary, LocationCatalogResponse, ServerEvent, SponsorshipDetail,
        SponsorshipSubmission, SponsorshipSummary,
    },
};
use storage::Storage;
use tracing::info;

/// Smallest order the program accepts, in totes.
pub const MIN_TOTE_QUANTITY: u32 = 50;

#[derive(Clone)]
pub struct ApiContext {
    pub storage: Storage,
    /// Allowed gap between a physical order's quantity and its point total.
    pub rescale_deadband: u32,
}

pub async fn list_causes(ctx: &ApiContext) -> Result<Vec<CauseSummary>, ApiError> {
    ctx.storage.list_causes().await.map_err(internal)
}

pub async fn get_cause(ctx: &ApiContext, cause_id: CauseId) -> Result<CauseSummary, ApiError> {
    ctx.storage
        .get_cause(cause_id)
        .await
        .map_err(internal)?
        .ok_or_else(|| ApiError::not_found("cause not found"))
}

pub async fn list_category_defaults(ctx: &ApiContext) -> Result<Vec<CategoryDefault>, ApiError> {
    ctx.storage.list_category_defaults().await.map_err(internal)
}

pub async fn location_catalog(
    ctx: &ApiContext,
    city: Option<&str>,
) -> Result<LocationCatalogResponse, ApiError> {
    let categories = list_category_defaults(ctx).await?;
    let locations = ctx
        .storage
        .list_locations(city.map(str::trim).filter(|city| !city.is_empty()))
        .await
        .map_err(internal)?;
    Ok(LocationCatalogResponse {
        categories,
        locations,
    })
}

/// Validates and stores a submission. The returned event announces it to
/// moderators.
pub async fn submit_sponsorship(
    ctx: &ApiContext,
    submission: SponsorshipSubmission,
) -> Result<ServerEvent, ApiError> {
    let defaults = list_category_defaults(ctx).await?;
    validate_submission(&submission, &defaults, ctx.rescale_deadband)?;

    if let Some(cause_id) = submission.cause_id {
        let known = ctx
            .storage
            .get_cause(cause_id)
            .await
            .map_err(internal)?
            .is_some();
        if !known {
            return Err(ApiError::validation(format!("unknown cause {}", cause_id.0)));
        }
    }

    let sponsorship = ctx
        .storage
        .insert_sponsorship(&submission)
        .await
        .map_err(internal)?;
    info!(
        sponsorship_id = sponsorship.sponsorship_id.0,
        distribution_type = sponsorship.distribution_type.as_str(),
        tote_quantity = sponsorship.tote_quantity,
        "sponsorship submitted"
    );
    Ok(ServerEvent::SponsorshipSubmitted { sponsorship })
}

pub async fn list_sponsorships(
    ctx: &ApiContext,
    status: Option<SponsorshipStatus>,
) -> Result<Vec<SponsorshipSummary>, ApiError> {
    ctx.storage.list_sponsorships(status).await.map_err(internal)
}

pub async fn get_sponsorship(
    ctx: &ApiContext,
    sponsorship_id: SponsorshipId,
) -> Result<SponsorshipDetail, ApiError> {
    let sponsorship = ctx
        .storage
        .get_sponsorship(sponsorship_id)
        .await
        .map_err(internal)?
        .ok_or_else(|| ApiError::not_found("sponsorship not found"))?;
    let distribution_points = ctx
        .storage
        .load_sponsorship_points(sponsorship_id)
        .await
        .map_err(internal)?;
    Ok(SponsorshipDetail {
        sponsorship,
        distribution_points,
    })
}

pub async fn moderate_sponsorship(
    ctx: &ApiContext,
    sponsorship_id: SponsorshipId,
    status: SponsorshipStatus,
) -> Result<ServerEvent, ApiError> {
    if status == SponsorshipStatus::Pending {
        return Err(ApiError::validation(
            "moderation must approve or reject a sponsorship",
        ));
    }

    let current = ctx
        .storage
        .get_sponsorship(sponsorship_id)
        .await
        .map_err(internal)?
        .ok_or_else(|| ApiError::not_found("sponsorship not found"))?;
    if current.status != SponsorshipStatus::Pending {
        return Err(ApiError::validation(format!(
            "sponsorship is already {}",
            current.status.as_str()
        )));
    }

    let updated = ctx
        .storage
        .set_sponsorship_status(sponsorship_id, status)
        .await
        .map_err(internal)?;
    if !updated {
        return Err(ApiError::new(
            ErrorCode::Conflict,
            "sponsorship was moderated concurrently",
        ));
    }

    info!(
        sponsorship_id = sponsorship_id.0,
        status = status.as_str(),
        "sponsorship moderated"
    );
    Ok(ServerEvent::SponsorshipModerated {
        sponsorship_id,
        status,
    })
}

/// Checks a submission against the program rules. `defaults` supplies the
/// per-category minimum; categories missing from it use their built-in
/// value.
pub fn validate_submission(
    submission: &SponsorshipSubmission,
    defaults: &[CategoryDefault],
    rescale_deadband: u32,
) -> Result<(), ApiError> {
    if submission.organization_name.trim().is_empty() {
        return Err(ApiError::validation("organization name is required"));
    }
    if submission.contact_name.trim().is_empty() {
        return Err(ApiError::validation("contact name is required"));
    }
    if !submission.email.contains('@') {
        return Err(ApiError::validation("email address is invalid"));
    }
    if submission.tote_quantity < MIN_TOTE_QUANTITY {
        return Err(ApiError::validation(format!(
            "tote quantity must be at least {MIN_TOTE_QUANTITY}"
        )));
    }
    if let (Some(start), Some(end)) = (
        submission.distribution_start_date,
        submission.distribution_end_date,
    ) {
        if end < start {
            return Err(ApiError::validation(
                "distribution end date is before the start date",
            ));
        }
    }

    match submission.distribution_type {
        DistributionType::Online => {
            if !submission.distribution_points.is_empty() {
                return Err(ApiError::validation(
                    "online sponsorships cannot carry distribution points",
                ));
            }
        }
        DistributionType::Physical => {
            if submission.distribution_points.is_empty() {
                return Err(ApiError::validation(
                    "physical sponsorships need at least one distribution point",
                ));
            }
            let mut total = 0u64;
            for point in &submission.distribution_points {
                let minimum = minimum_for(defaults, point.category);
                if point.totes_count < minimum {
                    return Err(ApiError::validation(format!(
                        "{} needs at least {minimum} totes",
                        point.name
                    )));
                }
                if point.location.trim().is_empty() {
                    return Err(ApiError::validation(format!(
                        "{} is missing its city",
                        point.name
                    )));
                }
                total += u64::from(point.totes_count);
            }
            let gap = total.abs_diff(u64::from(submission.tote_quantity));
            if gap > u64::from(rescale_deadband) {
                return Err(ApiError::validation(format!(
                    "tote quantity {} does not match distribution total {total}",
                    submission.tote_quantity
                )));
            }
        }
    }

    Ok(())
}

fn minimum_for(defaults: &[CategoryDefault], category: LocationCategory) -> u32 {
    defaults
        .iter()
        .find(|default| default.category == category)
        .map(|default| default.default_tote_count)
        .unwrap_or_else(|| category.builtin_default_totes())
}

fn internal(err: anyhow::Error) -> ApiError {
    ApiError::new(ErrorCode::Internal, err.to_string())
}
