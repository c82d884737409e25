//! Sponsorship onboarding: the wizard session that reconciles a tote
//! quantity with a city/category/location selection, and the HTTP client
//! that feeds it catalog data and takes the finished submission.

pub mod catalog;
pub mod client;
pub mod config;
pub mod error;
pub mod selection;
pub mod session;
pub mod sync;
pub mod wizard;

pub use catalog::LocationCatalog;
pub use client::{CauseDirectory, SponsorshipClient, SubmissionSink};
pub use config::{CategoryMinimums, SyncPolicy};
pub use error::OnboardingError;
pub use selection::{CityDistribution, EntryDetails, EntryRef, SelectionEntry, SelectionTree};
pub use session::{OnboardingSession, OrganizationDetails, WizardFormState};
pub use sync::{EntryEdit, ScalarOutcome, Synchronizer};
pub use wizard::{StepSequencer, WizardStep};
