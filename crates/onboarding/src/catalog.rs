use std::collections::BTreeMap;

use shared::{
    domain::LocationCategory,
    protocol::{CatalogLocation, CategoryDefault, LocationCatalogResponse},
};

/// Known distribution locations grouped by city and category.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LocationCatalog {
    cities: BTreeMap<String, BTreeMap<LocationCategory, Vec<CatalogLocation>>>,
}

impl LocationCatalog {
    pub fn from_locations(locations: impl IntoIterator<Item = CatalogLocation>) -> Self {
        let mut cities: BTreeMap<String, BTreeMap<LocationCategory, Vec<CatalogLocation>>> =
            BTreeMap::new();
        for location in locations {
            let city = location.city.trim().to_string();
            if city.is_empty() {
                continue;
            }
            cities
                .entry(city)
                .or_default()
                .entry(location.category)
                .or_default()
                .push(location);
        }
        Self { cities }
    }

    pub fn cities(&self) -> impl Iterator<Item = &str> {
        self.cities.keys().map(String::as_str)
    }

    pub fn contains_city(&self, city: &str) -> bool {
        self.cities.contains_key(city)
    }

    pub fn locations(&self, city: &str, category: LocationCategory) -> &[CatalogLocation] {
        self.cities
            .get(city)
            .and_then(|categories| categories.get(&category))
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Case-insensitive substring match over city names.
    pub fn search_cities<'a>(&'a self, query: &str) -> impl Iterator<Item = &'a str> + 'a {
        let needle = query.trim().to_lowercase();
        self.cities()
            .filter(move |city| needle.is_empty() || city.to_lowercase().contains(&needle))
    }

    pub fn len(&self) -> usize {
        self.cities
            .values()
            .flat_map(|categories| categories.values())
            .map(Vec::len)
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.cities.is_empty()
    }
}

/// Splits a server catalog response into the catalog and its category table.
pub fn split_catalog_response(
    response: LocationCatalogResponse,
) -> (LocationCatalog, Vec<CategoryDefault>) {
    (
        LocationCatalog::from_locations(response.locations),
        response.categories,
    )
}
