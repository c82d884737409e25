//! Keeps the scalar tote quantity and the selection tree consistent.
//!
//! Two edit paths feed the same invariant. A scalar edit rescales the
//! selected entries; an entry edit recomputes the scalar from the tree. The
//! recompute arms a one-shot echo guard so that a UI binding writing the
//! derived value straight back into the scalar input is reported as
//! [`ScalarOutcome::EchoSuppressed`].
//!
//! The guard only labels the write-back. It holds the selected total, and
//! nothing changes that total before the next scalar edit, so a zero gap
//! would leave the tree alone under any deadband anyway. The tree outcome
//! of every scalar edit is decided by the deadband and the rescale.

use shared::domain::DistributionType;
use tracing::debug;

use crate::{
    config::{CategoryMinimums, SyncPolicy},
    selection::{EntryRef, SelectionTree},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryEdit {
    Toggle,
    SetSelected(bool),
    /// New tote count; clamped up to the category minimum.
    Resize(i64),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ScalarOutcome {
    /// Online mode or nothing selected: only the scalar moved.
    ScalarOnly,
    /// The edit repeated the last derived write and was ignored.
    EchoSuppressed,
    /// The edit landed inside the deadband; entries kept their counts.
    WithinDeadband,
    Rescaled { factor: f64, changed_entries: usize },
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct EchoGuard(Option<u32>);

impl EchoGuard {
    fn arm(&mut self, value: u32) {
        self.0 = Some(value);
    }

    fn disarm(&mut self) {
        self.0 = None;
    }

    /// Consumes the guard; true when `value` is the armed echo.
    fn absorbs(&mut self, value: u32) -> bool {
        self.0.take() == Some(value)
    }
}

#[derive(Debug, Clone)]
pub struct Synchronizer {
    minimums: CategoryMinimums,
    policy: SyncPolicy,
    echo: EchoGuard,
}

impl Synchronizer {
    pub fn new(minimums: CategoryMinimums, policy: SyncPolicy) -> Self {
        Self {
            minimums,
            policy,
            echo: EchoGuard::default(),
        }
    }

    pub fn minimums(&self) -> &CategoryMinimums {
        &self.minimums
    }

    pub fn policy(&self) -> SyncPolicy {
        self.policy
    }

    pub fn reset(&mut self) {
        self.echo.disarm();
    }

    /// Scalar edit path. `quantity` and `tree` are replaced together.
    pub fn apply_scalar_edit(
        &mut self,
        mode: DistributionType,
        quantity: &mut u32,
        tree: &mut SelectionTree,
        requested: i64,
    ) -> ScalarOutcome {
        let requested = u32::try_from(requested.max(0)).unwrap_or(u32::MAX);

        if self.echo.absorbs(requested) {
            debug!(quantity = requested, "scalar edit matched derived write; suppressed");
            *quantity = requested;
            return ScalarOutcome::EchoSuppressed;
        }

        if mode == DistributionType::Online || !tree.has_selection() {
            *quantity = requested;
            return ScalarOutcome::ScalarOnly;
        }

        let current = tree.selected_total();
        if current.abs_diff(requested) <= self.policy.rescale_deadband {
            debug!(current, requested, "scalar edit within deadband; entries kept");
            *quantity = requested;
            return ScalarOutcome::WithinDeadband;
        }

        let factor = f64::from(requested) / f64::from(current.max(1));
        let mut next = tree.clone();
        let changed_entries = next.scale_selected(factor, &self.minimums);
        debug!(current, requested, factor, changed_entries, "rescaled selected entries");

        *tree = next;
        *quantity = requested;
        ScalarOutcome::Rescaled {
            factor,
            changed_entries,
        }
    }

    /// Entry edit path. Online sessions have no authoritative tree, so the
    /// edit is refused and neither side changes.
    pub fn apply_entry_edit(
        &mut self,
        mode: DistributionType,
        quantity: &mut u32,
        tree: &mut SelectionTree,
        at: &EntryRef,
        edit: EntryEdit,
    ) -> bool {
        if mode == DistributionType::Online {
            return false;
        }

        let minimums = &self.minimums;
        let applied = tree.update_entry(at, |entry| match edit {
            EntryEdit::Toggle => entry.selected = !entry.selected,
            EntryEdit::SetSelected(selected) => entry.selected = selected,
            EntryEdit::Resize(raw) => entry.totes = minimums.clamp(at.category, raw),
        });
        if applied {
            self.recompute(quantity, tree);
        }
        applied
    }

    /// Writes the derived sum into the scalar and arms the echo guard.
    pub fn recompute(&mut self, quantity: &mut u32, tree: &SelectionTree) {
        let derived = tree.selected_total();
        *quantity = derived;
        self.echo.arm(derived);
    }
}

#[cfg(test)]
#[path = "tests/sync_tests.rs"]
mod tests;
