use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, warn};

use super::domain::{LaunchCities, RestaurantListing};
use super::error::DirectoryError;
use super::predicate::{Clause, RestaurantPredicate, SortSpec};
use super::repository::DirectoryReader;
use super::soup_types::SoupTypeMatch;
use super::validation::normalize_state;
use crate::config::DirectoryConfig;

/// Caller-supplied search filters; every field is optional.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchFilters {
    pub city: Option<String>,
    pub state: Option<String>,
    pub location: Option<String>,
    pub soup_types: Vec<String>,
    pub min_rating: Option<f32>,
    pub price_range: Vec<String>,
    pub featured: Option<bool>,
    pub limit: Option<usize>,
    pub offset: usize,
    pub sort_by: Option<String>,
    pub sort_order: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResult {
    pub rows: Vec<RestaurantListing>,
    pub total_count: usize,
}

impl SearchResult {
    fn empty() -> Self {
        Self::default()
    }
}

/// Launch-city-bounded restaurant search.
pub struct DirectoryQueryEngine<R> {
    reader: Arc<R>,
    launch_cities: LaunchCities,
    default_page_size: usize,
    max_page_size: usize,
}

impl<R> DirectoryQueryEngine<R>
where
    R: DirectoryReader + 'static,
{
    pub fn new(reader: Arc<R>, config: &DirectoryConfig) -> Self {
        Self {
            reader,
            launch_cities: config.launch_cities.clone(),
            default_page_size: config.default_page_size,
            max_page_size: config.max_page_size,
        }
    }

    pub fn launch_cities(&self) -> &LaunchCities {
        &self.launch_cities
    }

    /// Clamps a requested page size into `1..=max_page_size`.
    pub fn page_size(&self, requested: Option<usize>) -> usize {
        requested
            .unwrap_or(self.default_page_size)
            .clamp(1, self.max_page_size.max(1))
    }

    pub fn search(&self, filters: &SearchFilters) -> Result<SearchResult, DirectoryError> {
        let soup_filter = SoupTypeMatch::from_requested(&filters.soup_types);
        let mut predicate = RestaurantPredicate::within(&self.launch_cities);
        let mut variant_exact = true;

        if let Some(filter) = &soup_filter {
            let restriction = self.reader.soup_restriction(filter)?;
            if restriction.restaurant_ids.is_empty() {
                debug!(soup_types = ?filter.requested(), "no restaurants serve the requested soups");
                return Ok(SearchResult::empty());
            }
            variant_exact = restriction.variant_exact;
            predicate = predicate.and(Clause::IdIn(restriction.restaurant_ids));
        }

        let Some(predicate) = self.apply_filters(predicate, filters) else {
            debug!(
                city = filters.city.as_deref(),
                state = filters.state.as_deref(),
                "location outside launch cities"
            );
            return Ok(SearchResult::empty());
        };

        let total_count = match self.reader.count_restaurants(&predicate)? {
            Some(count) => count,
            None => self.reader.restaurant_ids(&predicate)?.len(),
        };
        if total_count == 0 {
            return Ok(SearchResult::empty());
        }

        let sort = SortSpec::resolve(filters.sort_by.as_deref(), filters.sort_order.as_deref());
        let limit = self.page_size(filters.limit);
        let mut rows = self
            .reader
            .restaurant_page(&predicate, sort, filters.offset, limit)?;

        let Some(filter) = soup_filter else {
            return Ok(SearchResult { rows, total_count });
        };

        let fetched = rows.len();
        rows.retain(|listing| {
            listing
                .soups
                .iter()
                .any(|soup| filter.accepts(&soup.soup_type))
        });
        let dropped = fetched - rows.len();

        let total_count = if !variant_exact {
            rows.len()
        } else if dropped > 0 {
            warn!(
                dropped,
                soup_types = ?filter.requested(),
                "soup filter pass disagreed with store restriction"
            );
            total_count.saturating_sub(dropped)
        } else {
            total_count
        };

        Ok(SearchResult { rows, total_count })
    }

    /// A single published listing, hidden outside the launch cities.
    pub fn listing_by_slug(&self, slug: &str) -> Result<Option<RestaurantListing>, DirectoryError> {
        let listing = self.reader.listing_by_slug(slug.trim())?;
        Ok(listing.filter(|listing| {
            listing.restaurant.is_published() && self.launch_cities.covers(&listing.restaurant)
        }))
    }

    /// `None` when a named city or state falls outside the allow-list.
    fn apply_filters(
        &self,
        mut predicate: RestaurantPredicate,
        filters: &SearchFilters,
    ) -> Option<RestaurantPredicate> {
        let city = non_blank(filters.city.as_deref());
        let state = non_blank(filters.state.as_deref());

        match (city, state) {
            (Some(city), Some(state)) if !self.launch_cities.contains(city, state) => return None,
            (Some(city), None) if !self.launch_cities.contains_city(city) => return None,
            (None, Some(state)) if !self.launch_cities.contains_state(state) => return None,
            _ => {}
        }

        if let Some(city) = city {
            predicate = predicate.and(Clause::City(city.to_string()));
        }
        if let Some(code) = state.and_then(normalize_state) {
            predicate = predicate.and(Clause::State(code));
        }
        if city.is_none() && state.is_none() {
            if let Some(location) = non_blank(filters.location.as_deref()) {
                predicate = predicate.and(Clause::Location(location.to_string()));
            }
        }
        if let Some(floor) = filters.min_rating.filter(|floor| floor.is_finite()) {
            predicate = predicate.and(Clause::MinRating(floor));
        }

        let tiers: Vec<String> = filters
            .price_range
            .iter()
            .map(|tier| tier.trim())
            .filter(|tier| !tier.is_empty())
            .map(str::to_string)
            .collect();
        if !tiers.is_empty() {
            predicate = predicate.and(Clause::PriceIn(tiers));
        }
        if let Some(featured) = filters.featured {
            predicate = predicate.and(Clause::Featured(featured));
        }

        Some(predicate)
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|value| !value.is_empty())
}
