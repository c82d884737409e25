use std::sync::Arc;

use chrono::NaiveDate;
use shared::{
    domain::{CauseId, DistributionType, LocationCategory, PointId},
    protocol::{CauseSummary, SponsorshipSubmission},
};
use tokio::{
    sync::oneshot::{self, error::TryRecvError},
    task::JoinHandle,
};
use tracing::{debug, info, warn};

use crate::{
    catalog::LocationCatalog,
    client::CauseDirectory,
    config::{CategoryMinimums, SyncPolicy},
    error::{OnboardingError, Result},
    selection::{CityDistribution, EntryDetails, EntryRef, SelectionEntry, SelectionTree},
    sync::{EntryEdit, ScalarOutcome, Synchronizer},
    wizard::{StepSequencer, WizardStep},
};

pub const DEFAULT_TOTE_QUANTITY: u32 = 50;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OrganizationDetails {
    pub organization_name: String,
    pub contact_name: String,
    pub email: String,
    pub phone: String,
}

/// Aggregate state collected across all wizard steps.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WizardFormState {
    pub organization: OrganizationDetails,
    pub cause_id: Option<CauseId>,
    pub distribution_type: DistributionType,
    pub tote_quantity: u32,
    pub selection: SelectionTree,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub logo_url: Option<String>,
    pub message: String,
}

impl Default for WizardFormState {
    fn default() -> Self {
        Self {
            organization: OrganizationDetails::default(),
            cause_id: None,
            distribution_type: DistributionType::default(),
            tote_quantity: DEFAULT_TOTE_QUANTITY,
            selection: SelectionTree::new(),
            start_date: None,
            end_date: None,
            logo_url: None,
            message: String::new(),
        }
    }
}

impl WizardFormState {
    /// Physical orders report the sum of their points as the quantity, since
    /// rounding and category floors can leave the typed scalar off the tree.
    pub fn to_submission(&self) -> SponsorshipSubmission {
        let (tote_quantity, distribution_points) = match self.distribution_type {
            DistributionType::Physical => (
                self.selection.selected_total(),
                self.selection.to_distribution_points(),
            ),
            DistributionType::Online => (self.tote_quantity, Vec::new()),
        };
        SponsorshipSubmission {
            organization_name: self.organization.organization_name.trim().to_string(),
            contact_name: self.organization.contact_name.trim().to_string(),
            email: self.organization.email.trim().to_string(),
            phone: self.organization.phone.trim().to_string(),
            cause_id: self.cause_id,
            distribution_type: self.distribution_type,
            tote_quantity,
            distribution_points,
            distribution_start_date: self.start_date,
            distribution_end_date: self.end_date,
            logo_url: self.logo_url.clone(),
            message: self.message.clone(),
        }
    }
}

/// Background cause lookup. Dropping it aborts the request.
struct CausePrefetch {
    rx: oneshot::Receiver<Result<CauseSummary>>,
    task: JoinHandle<()>,
}

impl Drop for CausePrefetch {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// One user's pass through the sponsorship wizard.
pub struct OnboardingSession {
    form: WizardFormState,
    steps: StepSequencer,
    sync: Synchronizer,
    catalog: LocationCatalog,
    expanded_city: Option<String>,
    cause: Option<CauseSummary>,
    prefetch: Option<CausePrefetch>,
}

impl OnboardingSession {
    pub fn new(catalog: LocationCatalog, minimums: CategoryMinimums, policy: SyncPolicy) -> Self {
        Self {
            form: WizardFormState::default(),
            steps: StepSequencer::new(),
            sync: Synchronizer::new(minimums, policy),
            catalog,
            expanded_city: None,
            cause: None,
            prefetch: None,
        }
    }

    pub fn with_cause(mut self, cause_id: CauseId) -> Self {
        self.form.cause_id = Some(cause_id);
        self
    }

    pub fn state(&self) -> &WizardFormState {
        &self.form
    }

    /// Final read of the collected state.
    pub fn into_state(self) -> WizardFormState {
        self.form
    }

    pub fn catalog(&self) -> &LocationCatalog {
        &self.catalog
    }

    pub fn minimums(&self) -> &CategoryMinimums {
        self.sync.minimums()
    }

    pub fn cause(&self) -> Option<&CauseSummary> {
        self.cause.as_ref()
    }

    pub fn expanded_city(&self) -> Option<&str> {
        self.expanded_city.as_deref()
    }

    pub fn step(&self) -> WizardStep {
        self.steps.current()
    }

    pub fn next_step(&mut self) -> bool {
        let moved = self.steps.next();
        debug!(step = self.steps.current().number(), moved, "wizard next");
        moved
    }

    pub fn back_step(&mut self) -> bool {
        let moved = self.steps.back();
        debug!(step = self.steps.current().number(), moved, "wizard back");
        moved
    }

    pub fn set_organization(&mut self, organization: OrganizationDetails) {
        self.form.organization = organization;
    }

    pub fn set_dates(&mut self, start: Option<NaiveDate>, end: Option<NaiveDate>) {
        self.form.start_date = start;
        self.form.end_date = end;
    }

    pub fn set_logo_url(&mut self, logo_url: Option<String>) {
        self.form.logo_url = logo_url.filter(|url| !url.trim().is_empty());
    }

    pub fn set_message(&mut self, message: impl Into<String>) {
        self.form.message = message.into();
    }

    /// Switching mode discards the selection and the date range.
    pub fn set_distribution_type(&mut self, distribution_type: DistributionType) {
        if self.form.distribution_type == distribution_type {
            return;
        }
        info!(
            from = self.form.distribution_type.as_str(),
            to = distribution_type.as_str(),
            "distribution type switched; selection cleared"
        );
        self.form.distribution_type = distribution_type;
        self.form.selection.clear();
        self.form.start_date = None;
        self.form.end_date = None;
        self.expanded_city = None;
        self.sync.reset();
    }

    pub fn set_tote_quantity(&mut self, quantity: i64) -> ScalarOutcome {
        let form = &mut self.form;
        self.sync.apply_scalar_edit(
            form.distribution_type,
            &mut form.tote_quantity,
            &mut form.selection,
            quantity,
        )
    }

    pub fn derived_quantity(&self) -> u32 {
        self.form.selection.selected_total()
    }

    /// Catalog cities not yet in the selection.
    pub fn available_cities(&self) -> Vec<&str> {
        self.catalog
            .cities()
            .filter(|city| !self.form.selection.contains_city(city))
            .collect()
    }

    pub fn search_cities(&self, query: &str) -> Vec<&str> {
        self.catalog
            .search_cities(query)
            .filter(|city| !self.form.selection.contains_city(city))
            .collect()
    }

    pub fn add_city(&mut self, city: &str) -> bool {
        if self.form.distribution_type != DistributionType::Physical
            || !self.catalog.contains_city(city)
            || self.form.selection.contains_city(city)
        {
            return false;
        }
        let distribution = CityDistribution::from_catalog(&self.catalog, city, self.sync.minimums());
        let added = self.form.selection.insert_city(city, distribution);
        if added {
            self.expanded_city = Some(city.to_string());
            debug!(city, "city added to distribution");
        }
        added
    }

    /// Removes a city. The scalar drops by the city's selected totes; other
    /// entries are not rebalanced.
    pub fn remove_city(&mut self, city: &str) -> bool {
        let Some(removed) = self.form.selection.remove_city(city) else {
            return false;
        };
        if self.expanded_city.as_deref() == Some(city) {
            self.expanded_city = None;
        }
        let dropped = removed.selected_total();
        if dropped > 0 {
            self.sync
                .recompute(&mut self.form.tote_quantity, &self.form.selection);
        }
        debug!(city, dropped, "city removed from distribution");
        true
    }

    pub fn expand_city(&mut self, city: Option<&str>) {
        self.expanded_city = city
            .filter(|city| self.form.selection.contains_city(city))
            .map(str::to_string);
    }

    pub fn edit_entry(&mut self, at: &EntryRef, edit: EntryEdit) -> bool {
        let form = &mut self.form;
        self.sync.apply_entry_edit(
            form.distribution_type,
            &mut form.tote_quantity,
            &mut form.selection,
            at,
            edit,
        )
    }

    pub fn toggle_entry(&mut self, at: &EntryRef) -> bool {
        self.edit_entry(at, EntryEdit::Toggle)
    }

    pub fn resize_entry(&mut self, at: &EntryRef, totes: i64) -> bool {
        self.edit_entry(at, EntryEdit::Resize(totes))
    }

    pub fn edit_point(&mut self, id: PointId, edit: EntryEdit) -> bool {
        match self.form.selection.find(id) {
            Some(at) => self.edit_entry(&at, edit),
            None => false,
        }
    }

    /// Adds a manually named point to a city already in the selection. The
    /// point starts selected and gets a fresh id.
    pub fn add_custom_point(
        &mut self,
        city: &str,
        category: LocationCategory,
        name: &str,
        details: EntryDetails,
        totes: i64,
    ) -> Option<PointId> {
        let name = name.trim();
        if self.form.distribution_type != DistributionType::Physical || name.is_empty() {
            return None;
        }
        let entry = SelectionEntry {
            id: PointId::new_custom(),
            name: name.to_string(),
            totes: self.sync.minimums().clamp(category, totes),
            selected: true,
            details,
        };
        let id = entry.id;
        self.form.selection.push_entry(city, category, entry)?;
        self.sync
            .recompute(&mut self.form.tote_quantity, &self.form.selection);
        debug!(city, %category, point = %id, "custom point added");
        Some(id)
    }

    /// Starts fetching display metadata for the session's cause, replacing
    /// any earlier lookup.
    pub fn prefetch_cause(&mut self, directory: Arc<dyn CauseDirectory>) -> bool {
        let Some(cause_id) = self.form.cause_id else {
            return false;
        };
        let (tx, rx) = oneshot::channel();
        let task = tokio::spawn(async move {
            let result = directory.fetch_cause(cause_id).await;
            let _ = tx.send(result);
        });
        self.prefetch = Some(CausePrefetch { rx, task });
        true
    }

    /// Merges a finished prefetch into the session without waiting.
    /// Returns true once metadata is available.
    pub fn poll_cause_prefetch(&mut self) -> bool {
        let Some(prefetch) = self.prefetch.as_mut() else {
            return self.cause.is_some();
        };
        match prefetch.rx.try_recv() {
            Ok(Ok(cause)) => {
                debug!(cause_id = cause.cause_id.0, "cause metadata loaded");
                self.cause = Some(cause);
                self.prefetch = None;
            }
            Ok(Err(error)) => {
                warn!(%error, "cause metadata prefetch failed");
                self.prefetch = None;
            }
            Err(TryRecvError::Empty) => {}
            Err(TryRecvError::Closed) => {
                self.prefetch = None;
            }
        }
        self.cause.is_some()
    }

    pub fn submission(&self) -> Result<SponsorshipSubmission> {
        if !self.steps.can_submit() {
            return Err(OnboardingError::NotAtConfirmation {
                step: self.steps.current(),
            });
        }
        Ok(self.form.to_submission())
    }
}

#[cfg(test)]
#[path = "tests/session_tests.rs"]
mod tests;
