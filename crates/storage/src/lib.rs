use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use sqlx::{
    sqlite::{SqliteConnectOptions, SqlitePoolOptions, SqliteRow},
    Pool, Row, Sqlite,
};
use std::{
    fs,
    path::{Path, PathBuf},
    str::FromStr,
};
use tracing::debug;

use shared::{
    domain::{
        CauseId, DistributionType, LocationCategory, LocationId, PointId, SponsorshipId,
        SponsorshipStatus,
    },
    protocol::{
        CatalogLocation, CategoryDefault, CauseSummary, DistributionPointPayload,
        SponsorshipSubmission, SponsorshipSummary,
    },
};

#[derive(Clone)]
pub struct Storage {
    pool: Pool<Sqlite>,
}

/// Catalog row as written by the seeding tools.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewLocation<'a> {
    pub city: &'a str,
    pub category: LocationCategory,
    pub name: &'a str,
    pub address: &'a str,
    pub contact_person: &'a str,
    pub phone: &'a str,
}

const CAUSE_COLUMNS: &str = "SELECT c.id, c.title, c.description, c.image_url, c.target_totes,
        COALESCE((SELECT SUM(s.tote_quantity) FROM sponsorships s
                  WHERE s.cause_id = c.id AND s.status = 'approved'), 0)
     FROM causes c";

const SPONSORSHIP_COLUMNS: &str = "SELECT s.id, s.organization_name, s.email, s.cause_id,
        s.distribution_type, s.tote_quantity, s.status, s.created_at,
        (SELECT COUNT(*) FROM distribution_points p WHERE p.sponsorship_id = s.id)
     FROM sponsorships s";

impl Storage {
    pub async fn new(database_url: &str) -> Result<Self> {
        ensure_sqlite_parent_dir_exists(database_url)?;

        let connect_options = SqliteConnectOptions::from_str(database_url)?.create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(connect_options)
            .await?;
        sqlx::migrate!("./migrations").run(&pool).await?;
        Ok(Self { pool })
    }

    pub async fn health_check(&self) -> Result<()> {
        let _: i64 = sqlx::query_scalar("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .context("sqlite ping failed")?;
        Ok(())
    }

    pub async fn create_cause(
        &self,
        title: &str,
        description: &str,
        image_url: Option<&str>,
        target_totes: u32,
    ) -> Result<CauseId> {
        let rec = sqlx::query(
            "INSERT INTO causes (title, description, image_url, target_totes) VALUES (?, ?, ?, ?) RETURNING id",
        )
        .bind(title)
        .bind(description)
        .bind(image_url)
        .bind(i64::from(target_totes))
        .fetch_one(&self.pool)
        .await?;
        Ok(CauseId(rec.get::<i64, _>(0)))
    }

    /// Causes with the approved tote total accumulated so far.
    pub async fn list_causes(&self) -> Result<Vec<CauseSummary>> {
        let sql = format!("{CAUSE_COLUMNS} ORDER BY c.id ASC");
        let rows = sqlx::query(&sql).fetch_all(&self.pool).await?;
        Ok(rows.iter().map(cause_from_row).collect())
    }

    pub async fn get_cause(&self, cause_id: CauseId) -> Result<Option<CauseSummary>> {
        let sql = format!("{CAUSE_COLUMNS} WHERE c.id = ?");
        let row = sqlx::query(&sql)
            .bind(cause_id.0)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.as_ref().map(cause_from_row))
    }

    pub async fn set_category_default(
        &self,
        category: LocationCategory,
        default_tote_count: u32,
    ) -> Result<()> {
        sqlx::query(
            "INSERT INTO category_defaults (category, default_tote_count) VALUES (?, ?)
             ON CONFLICT(category) DO UPDATE SET default_tote_count = excluded.default_tote_count",
        )
        .bind(category.as_str())
        .bind(i64::from(default_tote_count))
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn list_category_defaults(&self) -> Result<Vec<CategoryDefault>> {
        let rows = sqlx::query("SELECT category, default_tote_count FROM category_defaults")
            .fetch_all(&self.pool)
            .await?;

        let mut defaults = Vec::with_capacity(rows.len());
        for r in rows {
            let category = r
                .get::<String, _>(0)
                .parse::<LocationCategory>()
                .context("unknown category in category_defaults")?;
            defaults.push(CategoryDefault {
                category,
                default_tote_count: to_u32(r.get::<i64, _>(1)),
            });
        }
        defaults.sort_by_key(|default| default.category);
        Ok(defaults)
    }

    /// Inserts a catalog location or refreshes the contact fields of the one
    /// already stored under the same city, category and name.
    pub async fn upsert_location(&self, location: &NewLocation<'_>) -> Result<LocationId> {
        let rec = sqlx::query(
            "INSERT INTO locations (city, category, name, address, contact_person, phone)
             VALUES (?, ?, ?, ?, ?, ?)
             ON CONFLICT(city, category, name) DO UPDATE SET
                address = excluded.address,
                contact_person = excluded.contact_person,
                phone = excluded.phone
             RETURNING id",
        )
        .bind(location.city.trim())
        .bind(location.category.as_str())
        .bind(location.name.trim())
        .bind(location.address)
        .bind(location.contact_person)
        .bind(location.phone)
        .fetch_one(&self.pool)
        .await?;
        Ok(LocationId(rec.get::<i64, _>(0)))
    }

    pub async fn list_locations(&self, city: Option<&str>) -> Result<Vec<CatalogLocation>> {
        let rows = sqlx::query(
            "SELECT id, city, category, name, address, contact_person, phone
             FROM locations
             WHERE ?1 IS NULL OR city = ?1
             ORDER BY city ASC, id ASC",
        )
        .bind(city)
        .fetch_all(&self.pool)
        .await?;

        let mut locations = Vec::with_capacity(rows.len());
        for r in rows {
            let category = r
                .get::<String, _>(2)
                .parse::<LocationCategory>()
                .context("unknown category in locations")?;
            locations.push(CatalogLocation {
                location_id: LocationId(r.get::<i64, _>(0)),
                city: r.get::<String, _>(1),
                category,
                name: r.get::<String, _>(3),
                address: r.get::<String, _>(4),
                contact_person: r.get::<String, _>(5),
                phone: r.get::<String, _>(6),
            });
        }
        Ok(locations)
    }

    /// Persists a submission and its points in a single transaction. The
    /// sponsorship starts out pending.
    pub async fn insert_sponsorship(
        &self,
        submission: &SponsorshipSubmission,
    ) -> Result<SponsorshipSummary> {
        let mut tx = self.pool.begin().await?;

        let rec = sqlx::query(
            "INSERT INTO sponsorships (
                organization_name, contact_name, email, phone, cause_id, distribution_type,
                tote_quantity, start_date, end_date, logo_url, message, status
             ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
             RETURNING id, created_at",
        )
        .bind(&submission.organization_name)
        .bind(&submission.contact_name)
        .bind(&submission.email)
        .bind(&submission.phone)
        .bind(submission.cause_id.map(|cause| cause.0))
        .bind(submission.distribution_type.as_str())
        .bind(i64::from(submission.tote_quantity))
        .bind(submission.distribution_start_date)
        .bind(submission.distribution_end_date)
        .bind(submission.logo_url.as_deref())
        .bind(&submission.message)
        .bind(SponsorshipStatus::Pending.as_str())
        .fetch_one(&mut *tx)
        .await?;
        let sponsorship_id = SponsorshipId(rec.get::<i64, _>(0));
        let created_at = rec.get::<DateTime<Utc>, _>(1);

        for (position, point) in submission.distribution_points.iter().enumerate() {
            sqlx::query(
                "INSERT INTO distribution_points (
                    sponsorship_id, position, point_id, category, name, address,
                    contact_person, phone, city, totes_count
                 ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
            )
            .bind(sponsorship_id.0)
            .bind(i64::try_from(position).unwrap_or(i64::MAX))
            .bind(point.point_id.to_string())
            .bind(point.category.as_str())
            .bind(&point.name)
            .bind(&point.address)
            .bind(&point.contact_person)
            .bind(&point.phone)
            .bind(&point.location)
            .bind(i64::from(point.totes_count))
            .execute(&mut *tx)
            .await
            .with_context(|| format!("failed to store distribution point '{}'", point.point_id))?;
        }

        tx.commit().await?;
        debug!(
            sponsorship_id = sponsorship_id.0,
            points = submission.distribution_points.len(),
            "sponsorship stored"
        );

        Ok(SponsorshipSummary {
            sponsorship_id,
            organization_name: submission.organization_name.clone(),
            email: submission.email.clone(),
            cause_id: submission.cause_id,
            distribution_type: submission.distribution_type,
            tote_quantity: submission.tote_quantity,
            status: SponsorshipStatus::Pending,
            point_count: u32::try_from(submission.distribution_points.len()).unwrap_or(u32::MAX),
            created_at,
        })
    }

    /// Newest first, optionally restricted to one status.
    pub async fn list_sponsorships(
        &self,
        status: Option<SponsorshipStatus>,
    ) -> Result<Vec<SponsorshipSummary>> {
        let sql = format!("{SPONSORSHIP_COLUMNS} WHERE ?1 IS NULL OR s.status = ?1 ORDER BY s.id DESC");
        let rows = sqlx::query(&sql)
            .bind(status.map(SponsorshipStatus::as_str))
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(sponsorship_from_row).collect()
    }

    pub async fn get_sponsorship(
        &self,
        sponsorship_id: SponsorshipId,
    ) -> Result<Option<SponsorshipSummary>> {
        let sql = format!("{SPONSORSHIP_COLUMNS} WHERE s.id = ?");
        let row = sqlx::query(&sql)
            .bind(sponsorship_id.0)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(sponsorship_from_row).transpose()
    }

    pub async fn load_sponsorship_points(
        &self,
        sponsorship_id: SponsorshipId,
    ) -> Result<Vec<DistributionPointPayload>> {
        let rows = sqlx::query(
            "SELECT point_id, category, name, address, contact_person, phone, city, totes_count
             FROM distribution_points
             WHERE sponsorship_id = ?
             ORDER BY position ASC",
        )
        .bind(sponsorship_id.0)
        .fetch_all(&self.pool)
        .await?;

        let mut points = Vec::with_capacity(rows.len());
        for r in rows {
            points.push(DistributionPointPayload {
                point_id: r.get::<String, _>(0).parse::<PointId>()?,
                category: r.get::<String, _>(1).parse::<LocationCategory>()?,
                name: r.get::<String, _>(2),
                address: r.get::<String, _>(3),
                contact_person: r.get::<String, _>(4),
                phone: r.get::<String, _>(5),
                location: r.get::<String, _>(6),
                totes_count: to_u32(r.get::<i64, _>(7)),
            });
        }
        Ok(points)
    }

    /// Moves a pending sponsorship to `status`. Returns false when the row is
    /// missing or has already left the pending state.
    pub async fn set_sponsorship_status(
        &self,
        sponsorship_id: SponsorshipId,
        status: SponsorshipStatus,
    ) -> Result<bool> {
        let updated = sqlx::query("UPDATE sponsorships SET status = ? WHERE id = ? AND status = 'pending'")
            .bind(status.as_str())
            .bind(sponsorship_id.0)
            .execute(&self.pool)
            .await?
            .rows_affected();
        Ok(updated > 0)
    }
}

fn cause_from_row(r: &SqliteRow) -> CauseSummary {
    CauseSummary {
        cause_id: CauseId(r.get::<i64, _>(0)),
        title: r.get::<String, _>(1),
        description: r.get::<String, _>(2),
        image_url: r.get::<Option<String>, _>(3),
        target_totes: to_u32(r.get::<i64, _>(4)),
        sponsored_totes: to_u32(r.get::<i64, _>(5)),
    }
}

fn sponsorship_from_row(r: &SqliteRow) -> Result<SponsorshipSummary> {
    Ok(SponsorshipSummary {
        sponsorship_id: SponsorshipId(r.get::<i64, _>(0)),
        organization_name: r.get::<String, _>(1),
        email: r.get::<String, _>(2),
        cause_id: r.get::<Option<i64>, _>(3).map(CauseId),
        distribution_type: r.get::<String, _>(4).parse::<DistributionType>()?,
        tote_quantity: to_u32(r.get::<i64, _>(5)),
        status: r.get::<String, _>(6).parse::<SponsorshipStatus>()?,
        created_at: r.get::<DateTime<Utc>, _>(7),
        point_count: to_u32(r.get::<i64, _>(8)),
    })
}

fn to_u32(value: i64) -> u32 {
    u32::try_from(value.max(0)).unwrap_or(u32::MAX)
}

fn ensure_sqlite_parent_dir_exists(database_url: &str) -> Result<()> {
    let Some(path) = sqlite_path(database_url) else {
        return Ok(());
    };

    let Some(parent) = path.parent() else {
        return Ok(());
    };

    fs::create_dir_all(parent).with_context(|| {
        format!(
            "failed to create parent directory '{}' for database url '{database_url}'",
            parent.display()
        )
    })?;

    Ok(())
}

fn sqlite_path(database_url: &str) -> Option<PathBuf> {
    if database_url == "sqlite::memory:" || !database_url.starts_with("sqlite:") {
        return None;
    }

    let path = database_url
        .trim_start_matches("sqlite://")
        .trim_start_matches("sqlite:")
        .split('?')
        .next()
        .unwrap_or_default();

    if path.is_empty() {
        return None;
    }

    Some(Path::new(path).to_path_buf())
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
