use shared::{
    domain::{DistributionType, LocationCategory, SponsorshipStatus},
    protocol::SponsorshipSubmission,
};
use storage::{NewLocation, Storage};

#[tokio::test]
async fn data_survives_reopening_the_database() {
    let dir = tempfile::tempdir().expect("tempdir");
    let database_url = format!(
        "sqlite://{}",
        dir.path().join("tote.db").to_string_lossy().replace('\\', "/")
    );

    {
        let storage = Storage::new(&database_url).await.expect("db");
        storage
            .upsert_location(&NewLocation {
                city: "Pune",
                category: LocationCategory::Theatre,
                name: "City Pride",
                address: "Kothrud",
                contact_person: "",
                phone: "",
            })
            .await
            .expect("location");
        storage
            .set_category_default(LocationCategory::Theatre, 700)
            .await
            .expect("default");
        storage
            .insert_sponsorship(&SponsorshipSubmission {
                organization_name: "Acme".into(),
                contact_name: "Sam".into(),
                email: "sam@acme.test".into(),
                phone: String::new(),
                cause_id: None,
                distribution_type: DistributionType::Online,
                tote_quantity: 120,
                distribution_points: Vec::new(),
                distribution_start_date: None,
                distribution_end_date: None,
                logo_url: Some("https://cdn.test/logo.png".into()),
                message: "hello".into(),
            })
            .await
            .expect("sponsorship");
    }

    let storage = Storage::new(&database_url).await.expect("reopen");
    let locations = storage.list_locations(Some("Pune")).await.expect("locations");
    assert_eq!(locations.len(), 1);
    assert_eq!(locations[0].address, "Kothrud");

    let theatre = storage
        .list_category_defaults()
        .await
        .expect("defaults")
        .into_iter()
        .find(|default| default.category == LocationCategory::Theatre)
        .expect("theatre");
    assert_eq!(theatre.default_tote_count, 700);

    let sponsorships = storage.list_sponsorships(None).await.expect("list");
    assert_eq!(sponsorships.len(), 1);
    assert_eq!(sponsorships[0].status, SponsorshipStatus::Pending);
    assert_eq!(sponsorships[0].point_count, 0);
}
