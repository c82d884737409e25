use async_trait::async_trait;
use shared::{domain::LocationId, protocol::CatalogLocation};

use super::*;

fn catalog() -> LocationCatalog {
    let row = |id: i64, city: &str, category: LocationCategory, name: &str| CatalogLocation {
        location_id: LocationId(id),
        city: city.to_string(),
        category,
        name: name.to_string(),
        address: String::new(),
        contact_person: String::new(),
        phone: String::new(),
    };
    LocationCatalog::from_locations(vec![
        row(1, "Pune", LocationCategory::Mall, "Phoenix"),
        row(2, "Pune", LocationCategory::School, "Loyola"),
        row(3, "Mumbai", LocationCategory::Mall, "Palladium"),
        row(4, "Mumbai", LocationCategory::Park, "Joggers Park"),
        row(5, "Delhi", LocationCategory::MetroStation, "Rajiv Chowk"),
    ])
}

fn physical_session() -> OnboardingSession {
    let mut session = OnboardingSession::new(
        catalog(),
        CategoryMinimums::default(),
        SyncPolicy::default(),
    );
    session.set_distribution_type(DistributionType::Physical);
    session
}

#[test]
fn session_starts_online_at_step_one_with_default_quantity() {
    let session = OnboardingSession::new(catalog(), CategoryMinimums::default(), SyncPolicy::default());
    assert_eq!(session.step(), WizardStep::OrganizationDetails);
    assert_eq!(session.state().distribution_type, DistributionType::Online);
    assert_eq!(session.state().tote_quantity, DEFAULT_TOTE_QUANTITY);
}

#[test]
fn add_city_requires_physical_mode_and_a_known_new_city() {
    let mut session = OnboardingSession::new(catalog(), CategoryMinimums::default(), SyncPolicy::default());
    assert!(!session.add_city("Pune"));

    session.set_distribution_type(DistributionType::Physical);
    assert!(session.add_city("Pune"));
    assert!(!session.add_city("Pune"));
    assert!(!session.add_city("Atlantis"));
    assert_eq!(session.expanded_city(), Some("Pune"));
    assert_eq!(session.available_cities(), vec!["Delhi", "Mumbai"]);
    assert_eq!(session.search_cities("m"), vec!["Mumbai"]);
}

#[test]
fn selecting_one_mall_sets_quantity_and_deselecting_zeroes_it() {
    let mut session = physical_session();
    session.add_city("Pune");
    let phoenix = EntryRef::new("Pune", LocationCategory::Mall, 0);

    assert!(session.toggle_entry(&phoenix));
    assert_eq!(session.state().tote_quantity, 800);

    assert!(session.toggle_entry(&phoenix));
    assert_eq!(session.state().tote_quantity, 0);
}

#[test]
fn removing_a_city_drops_its_selected_totes() {
    let mut session = physical_session();
    session.add_city("Pune");
    session.add_city("Mumbai");
    session.toggle_entry(&EntryRef::new("Pune", LocationCategory::Mall, 0));
    session.toggle_entry(&EntryRef::new("Mumbai", LocationCategory::Park, 0));
    session.resize_entry(&EntryRef::new("Mumbai", LocationCategory::Park, 0), 1500);
    assert_eq!(session.state().tote_quantity, 2300);
    assert_eq!(session.expanded_city(), Some("Mumbai"));

    assert!(session.remove_city("Mumbai"));
    assert_eq!(session.derived_quantity(), 800);
    assert_eq!(session.state().tote_quantity, 800);
    assert_eq!(session.expanded_city(), None);
    assert!(!session.remove_city("Mumbai"));
}

#[test]
fn removing_a_city_without_selection_keeps_typed_quantity() {
    let mut session = physical_session();
    session.set_tote_quantity(1000);
    session.add_city("Delhi");
    assert!(session.remove_city("Delhi"));
    assert_eq!(session.state().tote_quantity, 1000);
}

#[test]
fn switching_mode_clears_selection_and_dates() {
    let mut session = physical_session();
    session.add_city("Pune");
    session.toggle_entry(&EntryRef::new("Pune", LocationCategory::Mall, 0));
    let start = NaiveDate::from_ymd_opt(2026, 11, 1);
    let end = NaiveDate::from_ymd_opt(2026, 11, 30);
    session.set_dates(start, end);

    session.set_distribution_type(DistributionType::Online);
    assert!(session.state().selection.is_empty());
    assert_eq!(session.state().start_date, None);
    assert_eq!(session.state().end_date, None);
    assert_eq!(session.expanded_city(), None);

    session.set_distribution_type(DistributionType::Physical);
    assert!(session.state().selection.is_empty());
}

#[test]
fn custom_point_with_catalog_name_is_kept_distinct() {
    let mut session = physical_session();
    session.add_city("Pune");
    let catalog_point = PointId::Catalog(LocationId(1));

    let custom = session
        .add_custom_point("Pune", LocationCategory::Mall, "Phoenix", EntryDetails::default(), 100)
        .expect("custom point");
    assert_ne!(custom, catalog_point);
    assert_eq!(session.state().tote_quantity, 800);

    assert!(session.edit_point(catalog_point, EntryEdit::SetSelected(true)));
    assert_eq!(session.state().tote_quantity, 1600);
    assert!(session.edit_point(custom, EntryEdit::SetSelected(false)));
    assert_eq!(session.state().tote_quantity, 800);

    assert!(session
        .add_custom_point("Goa", LocationCategory::Mall, "Beach", EntryDetails::default(), 900)
        .is_none());
    assert!(session
        .add_custom_point("Pune", LocationCategory::Mall, "   ", EntryDetails::default(), 900)
        .is_none());
}

#[test]
fn scalar_edit_then_echo_leaves_scaled_entries() {
    let mut session = physical_session();
    session.add_city("Pune");
    session.toggle_entry(&EntryRef::new("Pune", LocationCategory::Mall, 0));
    session.toggle_entry(&EntryRef::new("Pune", LocationCategory::School, 0));

    // the input box is bound to the scalar and writes the derived value back
    assert_eq!(session.set_tote_quantity(1200), ScalarOutcome::EchoSuppressed);

    let outcome = session.set_tote_quantity(2400);
    assert!(matches!(outcome, ScalarOutcome::Rescaled { changed_entries: 2, .. }));
    assert_eq!(session.derived_quantity(), 2400);
}

#[test]
fn submission_only_from_confirmation_step() {
    let mut session = physical_session();
    let err = session.submission().expect_err("step one");
    assert!(matches!(
        err,
        OnboardingError::NotAtConfirmation {
            step: WizardStep::OrganizationDetails
        }
    ));

    for _ in 0..10 {
        session.next_step();
    }
    assert_eq!(session.step(), WizardStep::Confirmation);
    assert!(session.submission().is_ok());

    session.back_step();
    assert!(session.submission().is_err());
}

#[test]
fn submission_flattens_selected_points() {
    let mut session = physical_session().with_cause(CauseId(7));
    session.set_organization(OrganizationDetails {
        organization_name: "  Acme Foundation ".into(),
        contact_name: "Sam".into(),
        email: "sam@acme.test".into(),
        phone: "555".into(),
    });
    session.add_city("Pune");
    session.add_city("Mumbai");
    session.toggle_entry(&EntryRef::new("Pune", LocationCategory::School, 0));
    session.toggle_entry(&EntryRef::new("Mumbai", LocationCategory::Mall, 0));
    session.set_logo_url(Some("https://cdn.test/logo.png".into()));
    session.set_message("thanks");
    while session.next_step() {}

    let submission = session.submission().expect("submission");
    assert_eq!(submission.organization_name, "Acme Foundation");
    assert_eq!(submission.cause_id, Some(CauseId(7)));
    assert_eq!(submission.tote_quantity, 1200);
    let cities: Vec<_> = submission
        .distribution_points
        .iter()
        .map(|point| point.location.as_str())
        .collect();
    assert_eq!(cities, vec!["Mumbai", "Pune"]);
    assert_eq!(
        submission
            .distribution_points
            .iter()
            .map(|point| point.totes_count)
            .sum::<u32>(),
        1200
    );

    let state = session.into_state();
    assert_eq!(state.logo_url.as_deref(), Some("https://cdn.test/logo.png"));
}

#[test]
fn online_submission_has_no_points() {
    let mut session = OnboardingSession::new(catalog(), CategoryMinimums::default(), SyncPolicy::default());
    session.set_tote_quantity(500);
    while session.next_step() {}
    let submission = session.submission().expect("submission");
    assert_eq!(submission.distribution_type, DistributionType::Online);
    assert_eq!(submission.tote_quantity, 500);
    assert!(submission.distribution_points.is_empty());
}

struct FixedDirectory;

#[async_trait]
impl CauseDirectory for FixedDirectory {
    async fn fetch_cause(&self, cause_id: CauseId) -> Result<CauseSummary> {
        Ok(CauseSummary {
            cause_id,
            title: "Clean Beaches".into(),
            description: String::new(),
            image_url: None,
            target_totes: 5000,
            sponsored_totes: 0,
        })
    }
}

struct PendingDirectory;

#[async_trait]
impl CauseDirectory for PendingDirectory {
    async fn fetch_cause(&self, _cause_id: CauseId) -> Result<CauseSummary> {
        std::future::pending().await
    }
}

#[tokio::test]
async fn prefetch_merges_cause_metadata_when_ready() {
    let mut session = physical_session().with_cause(CauseId(3));
    assert!(session.prefetch_cause(Arc::new(FixedDirectory)));

    let mut loaded = false;
    for _ in 0..50 {
        if session.poll_cause_prefetch() {
            loaded = true;
            break;
        }
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
    }
    assert!(loaded);
    assert_eq!(session.cause().expect("cause").title, "Clean Beaches");
}

#[tokio::test]
async fn prefetch_without_cause_is_skipped_and_pending_lookup_does_not_block() {
    let mut session = physical_session();
    assert!(!session.prefetch_cause(Arc::new(FixedDirectory)));

    let mut session = session.with_cause(CauseId(1));
    assert!(session.prefetch_cause(Arc::new(PendingDirectory)));
    assert!(!session.poll_cause_prefetch());
    session.add_city("Pune");
    assert!(session.toggle_entry(&EntryRef::new("Pune", LocationCategory::Mall, 0)));
    drop(session);
}
