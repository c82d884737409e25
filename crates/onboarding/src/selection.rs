//! Hierarchical distribution selection: city -> category -> entries.
//!
//! Backed by persistent collections, so cloning a tree is O(1) and a
//! mutation only copies the path down to the entry it touches. A clone taken
//! before an edit keeps observing the old values.

use im::{OrdMap, Vector};
use shared::{
    domain::{LocationCategory, PointId},
    protocol::DistributionPointPayload,
};

use crate::{catalog::LocationCatalog, config::CategoryMinimums};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EntryDetails {
    pub address: String,
    pub contact_person: String,
    pub phone: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectionEntry {
    pub id: PointId,
    pub name: String,
    pub totes: u32,
    pub selected: bool,
    pub details: EntryDetails,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CityDistribution {
    categories: OrdMap<LocationCategory, Vector<SelectionEntry>>,
}

impl CityDistribution {
    /// One unselected entry per known location in every category, each
    /// starting at its category minimum.
    pub fn from_catalog(catalog: &LocationCatalog, city: &str, minimums: &CategoryMinimums) -> Self {
        let categories = LocationCategory::ALL
            .into_iter()
            .map(|category| {
                let entries = catalog
                    .locations(city, category)
                    .iter()
                    .map(|location| SelectionEntry {
                        id: PointId::Catalog(location.location_id),
                        name: location.name.clone(),
                        totes: minimums.minimum(category),
                        selected: false,
                        details: EntryDetails {
                            address: location.address.clone(),
                            contact_person: location.contact_person.clone(),
                            phone: location.phone.clone(),
                        },
                    })
                    .collect::<Vector<_>>();
                (category, entries)
            })
            .collect();
        Self { categories }
    }

    pub fn entries(&self, category: LocationCategory) -> impl Iterator<Item = &SelectionEntry> {
        self.categories
            .get(&category)
            .into_iter()
            .flat_map(|entries| entries.iter())
    }

    pub fn categories(&self) -> impl Iterator<Item = (LocationCategory, &Vector<SelectionEntry>)> {
        self.categories.iter().map(|(category, entries)| (*category, entries))
    }

    pub fn selected_total(&self) -> u32 {
        self.categories
            .values()
            .flat_map(|entries| entries.iter())
            .filter(|entry| entry.selected)
            .fold(0u32, |sum, entry| sum.saturating_add(entry.totes))
    }

    pub fn selected_count(&self) -> usize {
        self.categories
            .values()
            .flat_map(|entries| entries.iter())
            .filter(|entry| entry.selected)
            .count()
    }
}

/// Address of one entry inside a [`SelectionTree`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EntryRef {
    pub city: String,
    pub category: LocationCategory,
    pub index: usize,
}

impl EntryRef {
    pub fn new(city: impl Into<String>, category: LocationCategory, index: usize) -> Self {
        Self {
            city: city.into(),
            category,
            index,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelectionTree {
    cities: OrdMap<String, CityDistribution>,
}

impl SelectionTree {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.cities.is_empty()
    }

    pub fn contains_city(&self, city: &str) -> bool {
        self.cities.contains_key(city)
    }

    pub fn cities(&self) -> impl Iterator<Item = &str> {
        self.cities.keys().map(String::as_str)
    }

    pub fn city(&self, city: &str) -> Option<&CityDistribution> {
        self.cities.get(city)
    }

    /// Inserts a city that is not yet present. Returns false for duplicates.
    pub fn insert_city(&mut self, city: impl Into<String>, distribution: CityDistribution) -> bool {
        let city = city.into();
        if self.cities.contains_key(&city) {
            return false;
        }
        self.cities.insert(city, distribution);
        true
    }

    pub fn remove_city(&mut self, city: &str) -> Option<CityDistribution> {
        self.cities.remove(city)
    }

    pub fn clear(&mut self) {
        self.cities = OrdMap::new();
    }

    pub fn entry(&self, at: &EntryRef) -> Option<&SelectionEntry> {
        self.cities
            .get(&at.city)
            .and_then(|distribution| distribution.categories.get(&at.category))
            .and_then(|entries| entries.get(at.index))
    }

    pub fn find(&self, id: PointId) -> Option<EntryRef> {
        self.cities.iter().find_map(|(city, distribution)| {
            distribution.categories.iter().find_map(|(category, entries)| {
                entries
                    .iter()
                    .position(|entry| entry.id == id)
                    .map(|index| EntryRef::new(city.clone(), *category, index))
            })
        })
    }

    /// Applies `edit` to a single entry, copying only the path to it.
    pub fn update_entry(&mut self, at: &EntryRef, edit: impl FnOnce(&mut SelectionEntry)) -> bool {
        let Some(entry) = self
            .cities
            .get_mut(&at.city)
            .and_then(|distribution| distribution.categories.get_mut(&at.category))
            .and_then(|entries| entries.get_mut(at.index))
        else {
            return false;
        };
        edit(entry);
        true
    }

    /// Appends an entry to an existing city. Returns its address.
    pub fn push_entry(
        &mut self,
        city: &str,
        category: LocationCategory,
        entry: SelectionEntry,
    ) -> Option<EntryRef> {
        let distribution = self.cities.get_mut(city)?;
        if !distribution.categories.contains_key(&category) {
            distribution.categories.insert(category, Vector::new());
        }
        let entries = distribution.categories.get_mut(&category)?;
        entries.push_back(entry);
        Some(EntryRef::new(city, category, entries.len() - 1))
    }

    pub fn selected_total(&self) -> u32 {
        self.cities
            .values()
            .fold(0u32, |sum, distribution| sum.saturating_add(distribution.selected_total()))
    }

    pub fn has_selection(&self) -> bool {
        self.cities
            .values()
            .any(|distribution| distribution.selected_count() > 0)
    }

    pub fn selected_count(&self) -> usize {
        self.cities.values().map(CityDistribution::selected_count).sum()
    }

    /// Selected entries in flattening order: city, then category, then
    /// position within the category.
    pub fn selected_entries(
        &self,
    ) -> impl Iterator<Item = (&str, LocationCategory, &SelectionEntry)> {
        self.cities.iter().flat_map(|(city, distribution)| {
            distribution.categories.iter().flat_map(move |(category, entries)| {
                entries
                    .iter()
                    .filter(|entry| entry.selected)
                    .map(move |entry| (city.as_str(), *category, entry))
            })
        })
    }

    /// Multiplies every selected entry by `factor`, rounding and then
    /// flooring each at its category minimum. Returns how many entries
    /// changed.
    pub fn scale_selected(&mut self, factor: f64, minimums: &CategoryMinimums) -> usize {
        let targets: Vec<(EntryRef, u32)> = self
            .cities
            .iter()
            .flat_map(move |(city, distribution)| {
                distribution.categories.iter().flat_map(move |(category, entries)| {
                    entries
                        .iter()
                        .enumerate()
                        .filter(|(_, entry)| entry.selected)
                        .filter_map(move |(index, entry)| {
                            let scaled = scale_count(entry.totes, factor)
                                .max(minimums.minimum(*category));
                            (scaled != entry.totes)
                                .then(|| (EntryRef::new(city.clone(), *category, index), scaled))
                        })
                })
            })
            .collect();

        for (at, totes) in &targets {
            self.update_entry(at, |entry| entry.totes = *totes);
        }
        targets.len()
    }

    pub fn to_distribution_points(&self) -> Vec<DistributionPointPayload> {
        self.selected_entries()
            .map(|(city, category, entry)| DistributionPointPayload {
                point_id: entry.id,
                category,
                name: entry.name.clone(),
                address: entry.details.address.clone(),
                contact_person: entry.details.contact_person.clone(),
                phone: entry.details.phone.clone(),
                location: city.to_string(),
                totes_count: entry.totes,
            })
            .collect()
    }
}

fn scale_count(totes: u32, factor: f64) -> u32 {
    let scaled = (f64::from(totes) * factor).round();
    if scaled <= 0.0 {
        0
    } else if scaled >= f64::from(u32::MAX) {
        u32::MAX
    } else {
        scaled as u32
    }
}

#[cfg(test)]
#[path = "tests/selection_tests.rs"]
mod tests;
