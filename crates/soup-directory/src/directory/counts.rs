use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::sync::Arc;

use serde::Serialize;

use super::domain::{LaunchCities, RestaurantId};
use super::error::DirectoryError;
use super::repository::DirectoryReader;
use super::soup_types::soup_key;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CityCount {
    pub city: String,
    pub state: String,
    pub count: usize,
}

/// Soup-type counts keyed by normalized key, plus the display spelling for each key.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SoupTypeCounts {
    pub counts: BTreeMap<String, usize>,
    pub names: BTreeMap<String, String>,
    pub display_counts: BTreeMap<String, usize>,
}

/// Per-city and per-soup-type summaries over published restaurants in launch cities.
pub struct CountsReporter<R> {
    reader: Arc<R>,
    launch_cities: LaunchCities,
}

impl<R> CountsReporter<R>
where
    R: DirectoryReader + 'static,
{
    pub fn new(reader: Arc<R>, launch_cities: LaunchCities) -> Self {
        Self {
            reader,
            launch_cities,
        }
    }

    /// One entry per launch city, in allow-list order, including empty ones.
    pub fn city_counts(&self) -> Result<Vec<CityCount>, DirectoryError> {
        let restaurants = self.reader.published_restaurants()?;
        Ok(self
            .launch_cities
            .iter()
            .map(|launch| {
                let count = restaurants
                    .iter()
                    .filter(|restaurant| {
                        match (restaurant.city.as_deref(), restaurant.state.as_deref()) {
                            (Some(city), Some(state)) => launch.matches(city, state),
                            _ => false,
                        }
                    })
                    .map(|restaurant| restaurant.id)
                    .collect::<HashSet<_>>()
                    .len();
                CityCount {
                    city: launch.city.clone(),
                    state: launch.state.clone(),
                    count,
                }
            })
            .collect())
    }

    pub fn soup_type_counts(&self) -> Result<SoupTypeCounts, DirectoryError> {
        let visible: HashSet<RestaurantId> = self
            .reader
            .published_restaurants()?
            .into_iter()
            .filter(|restaurant| self.launch_cities.covers(restaurant))
            .map(|restaurant| restaurant.id)
            .collect();

        let mut restaurants_by_key: BTreeMap<String, BTreeSet<RestaurantId>> = BTreeMap::new();
        let mut spellings: BTreeMap<String, BTreeMap<String, usize>> = BTreeMap::new();
        for soup in self.reader.all_soups()? {
            if !visible.contains(&soup.restaurant_id) {
                continue;
            }
            let key = soup_key(&soup.soup_type);
            if key.is_empty() {
                continue;
            }
            restaurants_by_key
                .entry(key.clone())
                .or_default()
                .insert(soup.restaurant_id);
            *spellings
                .entry(key)
                .or_default()
                .entry(soup.soup_type.trim().to_string())
                .or_default() += 1;
        }

        let mut report = SoupTypeCounts::default();
        for (key, restaurants) in restaurants_by_key {
            let count = restaurants.len();
            let name = spellings
                .get(&key)
                .and_then(preferred_spelling)
                .unwrap_or_else(|| key.clone());
            *report.display_counts.entry(name.clone()).or_default() += count;
            report.names.insert(key.clone(), name);
            report.counts.insert(key, count);
        }

        Ok(report)
    }
}

/// Most frequent spelling; ties go to the alphabetically first.
fn preferred_spelling(spellings: &BTreeMap<String, usize>) -> Option<String> {
    spellings
        .iter()
        .max_by(|(left_name, left), (right_name, right)| {
            left.cmp(right).then_with(|| right_name.cmp(left_name))
        })
        .map(|(name, _)| name.clone())
}
