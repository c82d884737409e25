use super::*;
use chrono::NaiveDate;

fn location<'a>(city: &'a str, category: LocationCategory, name: &'a str) -> NewLocation<'a> {
    NewLocation {
        city,
        category,
        name,
        address: "",
        contact_person: "",
        phone: "",
    }
}

fn submission(cause_id: Option<CauseId>, points: Vec<DistributionPointPayload>) -> SponsorshipSubmission {
    let tote_quantity = points.iter().map(|point| point.totes_count).sum::<u32>().max(50);
    SponsorshipSubmission {
        organization_name: "Acme".into(),
        contact_name: "Sam".into(),
        email: "sam@acme.test".into(),
        phone: String::new(),
        cause_id,
        distribution_type: if points.is_empty() {
            DistributionType::Online
        } else {
            DistributionType::Physical
        },
        tote_quantity,
        distribution_points: points,
        distribution_start_date: NaiveDate::from_ymd_opt(2026, 11, 1),
        distribution_end_date: NaiveDate::from_ymd_opt(2026, 11, 30),
        logo_url: None,
        message: String::new(),
    }
}

fn point(point_id: PointId, category: LocationCategory, name: &str, totes_count: u32) -> DistributionPointPayload {
    DistributionPointPayload {
        point_id,
        category,
        name: name.to_string(),
        address: String::new(),
        contact_person: String::new(),
        phone: String::new(),
        location: "Pune".into(),
        totes_count,
    }
}

#[tokio::test]
async fn health_check_succeeds_for_live_pool() {
    let storage = Storage::new("sqlite::memory:").await.expect("db");
    storage.health_check().await.expect("health check");
}

#[tokio::test]
async fn creates_database_file_when_missing() {
    let temp_root = tempfile::tempdir().expect("tempdir");
    let db_path = temp_root.path().join("nested").join("storage.db");
    let database_url = format!("sqlite://{}", db_path.to_string_lossy().replace('\\', "/"));

    let storage = Storage::new(&database_url).await.expect("db");
    drop(storage);

    assert!(
        db_path.exists(),
        "database file should exist: {}",
        db_path.display()
    );
}

#[test]
fn sqlite_path_ignores_memory_and_foreign_urls() {
    assert_eq!(sqlite_path("sqlite::memory:"), None);
    assert_eq!(sqlite_path("postgres://db"), None);
    assert_eq!(
        sqlite_path("sqlite://data/app.db?mode=rwc"),
        Some(PathBuf::from("data/app.db"))
    );
}

#[tokio::test]
async fn category_defaults_are_seeded_and_overridable() {
    let storage = Storage::new("sqlite::memory:").await.expect("db");
    let defaults = storage.list_category_defaults().await.expect("defaults");
    assert_eq!(defaults.len(), LocationCategory::ALL.len());
    assert_eq!(defaults[0].category, LocationCategory::Mall);
    assert_eq!(defaults[0].default_tote_count, 800);

    storage
        .set_category_default(LocationCategory::School, 250)
        .await
        .expect("override");
    let school = storage
        .list_category_defaults()
        .await
        .expect("defaults")
        .into_iter()
        .find(|default| default.category == LocationCategory::School)
        .expect("school");
    assert_eq!(school.default_tote_count, 250);
}

#[tokio::test]
async fn upsert_location_refreshes_existing_row() {
    let storage = Storage::new("sqlite::memory:").await.expect("db");
    let first = storage
        .upsert_location(&location("Pune", LocationCategory::Mall, "Phoenix"))
        .await
        .expect("insert");
    let again = storage
        .upsert_location(&NewLocation {
            phone: "020-555",
            ..location("Pune", LocationCategory::Mall, "Phoenix")
        })
        .await
        .expect("upsert");
    assert_eq!(first, again);

    storage
        .upsert_location(&location("Mumbai", LocationCategory::Park, "Joggers Park"))
        .await
        .expect("insert");

    let all = storage.list_locations(None).await.expect("all");
    assert_eq!(all.len(), 2);
    assert_eq!(all[0].city, "Mumbai");

    let pune = storage.list_locations(Some("Pune")).await.expect("pune");
    assert_eq!(pune.len(), 1);
    assert_eq!(pune[0].phone, "020-555");
}

#[tokio::test]
async fn cause_totals_count_only_approved_sponsorships() {
    let storage = Storage::new("sqlite::memory:").await.expect("db");
    let cause = storage
        .create_cause("Clean Beaches", "Tote drive", None, 5000)
        .await
        .expect("cause");

    let approved = storage
        .insert_sponsorship(&submission(Some(cause), Vec::new()))
        .await
        .expect("first");
    storage
        .insert_sponsorship(&submission(Some(cause), Vec::new()))
        .await
        .expect("second");
    assert!(storage
        .set_sponsorship_status(approved.sponsorship_id, SponsorshipStatus::Approved)
        .await
        .expect("approve"));

    let summary = storage.get_cause(cause).await.expect("get").expect("cause");
    assert_eq!(summary.target_totes, 5000);
    assert_eq!(summary.sponsored_totes, 50);
    assert_eq!(storage.list_causes().await.expect("list").len(), 1);
    assert!(storage.get_cause(CauseId(99)).await.expect("get").is_none());
}

#[tokio::test]
async fn sponsorship_points_round_trip_in_order() {
    let storage = Storage::new("sqlite::memory:").await.expect("db");
    let custom = PointId::new_custom();
    let stored = storage
        .insert_sponsorship(&submission(
            None,
            vec![
                point(PointId::Catalog(LocationId(4)), LocationCategory::Mall, "Phoenix", 900),
                point(custom, LocationCategory::Mall, "Phoenix", 800),
            ],
        ))
        .await
        .expect("insert");
    assert_eq!(stored.status, SponsorshipStatus::Pending);
    assert_eq!(stored.point_count, 2);
    assert_eq!(stored.tote_quantity, 1700);

    let points = storage
        .load_sponsorship_points(stored.sponsorship_id)
        .await
        .expect("points");
    assert_eq!(points.len(), 2);
    assert_eq!(points[0].point_id, PointId::Catalog(LocationId(4)));
    assert_eq!(points[1].point_id, custom);
    assert_eq!(points[1].location, "Pune");

    let listed = storage
        .get_sponsorship(stored.sponsorship_id)
        .await
        .expect("get")
        .expect("row");
    assert_eq!(listed.point_count, 2);
    assert_eq!(listed.distribution_type, DistributionType::Physical);
}

#[tokio::test]
async fn status_only_moves_out_of_pending_once() {
    let storage = Storage::new("sqlite::memory:").await.expect("db");
    let first = storage
        .insert_sponsorship(&submission(None, Vec::new()))
        .await
        .expect("first");
    let second = storage
        .insert_sponsorship(&submission(None, Vec::new()))
        .await
        .expect("second");

    assert!(storage
        .set_sponsorship_status(first.sponsorship_id, SponsorshipStatus::Rejected)
        .await
        .expect("reject"));
    assert!(!storage
        .set_sponsorship_status(first.sponsorship_id, SponsorshipStatus::Approved)
        .await
        .expect("second transition"));
    assert!(!storage
        .set_sponsorship_status(SponsorshipId(404), SponsorshipStatus::Approved)
        .await
        .expect("missing"));

    let pending = storage
        .list_sponsorships(Some(SponsorshipStatus::Pending))
        .await
        .expect("pending");
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].sponsorship_id, second.sponsorship_id);

    let all = storage.list_sponsorships(None).await.expect("all");
    assert_eq!(all.len(), 2);
    assert_eq!(all[0].sponsorship_id, second.sponsorship_id);
    assert_eq!(all[1].status, SponsorshipStatus::Rejected);
}
