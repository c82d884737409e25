use std::collections::BTreeMap;

use shared::{domain::LocationCategory, protocol::CategoryDefault};

pub const DEFAULT_RESCALE_DEADBAND: u32 = 5;

/// Per-category tote floor. A fresh entry starts at its category's value and
/// no rescale may push it lower.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryMinimums {
    overrides: BTreeMap<LocationCategory, u32>,
}

impl Default for CategoryMinimums {
    fn default() -> Self {
        Self {
            overrides: LocationCategory::ALL
                .into_iter()
                .map(|category| (category, category.builtin_default_totes()))
                .collect(),
        }
    }
}

impl CategoryMinimums {
    /// Builtin table with the admin-configured defaults layered on top.
    pub fn from_defaults(defaults: &[CategoryDefault]) -> Self {
        defaults
            .iter()
            .fold(Self::default(), |table, default| {
                table.with(default.category, default.default_tote_count)
            })
    }

    pub fn with(mut self, category: LocationCategory, minimum: u32) -> Self {
        self.overrides.insert(category, minimum);
        self
    }

    pub fn minimum(&self, category: LocationCategory) -> u32 {
        self.overrides
            .get(&category)
            .copied()
            .unwrap_or_else(|| category.builtin_default_totes())
    }

    /// Clamps a raw (possibly negative) count up to the category floor.
    pub fn clamp(&self, category: LocationCategory, raw: i64) -> u32 {
        let floor = self.minimum(category);
        u32::try_from(raw.max(0)).unwrap_or(u32::MAX).max(floor)
    }

    pub fn to_defaults(&self) -> Vec<CategoryDefault> {
        LocationCategory::ALL
            .into_iter()
            .map(|category| CategoryDefault {
                category,
                default_tote_count: self.minimum(category),
            })
            .collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncPolicy {
    /// Scalar edits landing within this distance of the selected sum keep
    /// the entries as they are. Zero rescales on every differing edit.
    pub rescale_deadband: u32,
}

impl Default for SyncPolicy {
    fn default() -> Self {
        Self {
            rescale_deadband: DEFAULT_RESCALE_DEADBAND,
        }
    }
}
