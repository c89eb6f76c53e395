//! Explicit filter predicates and sort specs handed to the data layer.

use std::cmp::Ordering;
use std::collections::BTreeSet;

use serde::Serialize;

use super::domain::{LaunchCities, LaunchCity, Restaurant, RestaurantId};
use super::validation::normalize_state;

/// One conjunct of a restaurant predicate.
#[derive(Debug, Clone, PartialEq)]
pub enum Clause {
    /// OR of `(city, state)` equalities.
    LaunchCities(Vec<LaunchCity>),
    IdIn(BTreeSet<RestaurantId>),
    City(String),
    State(String),
    /// Case-insensitive substring of city or name.
    Location(String),
    MinRating(f32),
    PriceIn(Vec<String>),
    Featured(bool),
}

impl Clause {
    fn matches(&self, restaurant: &Restaurant) -> bool {
        match self {
            Clause::LaunchCities(cities) => match (&restaurant.city, &restaurant.state) {
                (Some(city), Some(state)) => cities.iter().any(|launch| launch.matches(city, state)),
                _ => false,
            },
            Clause::IdIn(ids) => ids.contains(&restaurant.id),
            Clause::City(city) => restaurant
                .city
                .as_deref()
                .is_some_and(|value| value.trim().eq_ignore_ascii_case(city)),
            Clause::State(state) => restaurant
                .state
                .as_deref()
                .and_then(normalize_state)
                .is_some_and(|code| code.eq_ignore_ascii_case(state)),
            Clause::Location(needle) => {
                let needle = needle.to_lowercase();
                let in_city = restaurant
                    .city
                    .as_deref()
                    .is_some_and(|city| city.to_lowercase().contains(&needle));
                in_city || restaurant.name.to_lowercase().contains(&needle)
            }
            Clause::MinRating(floor) => restaurant.rating.is_some_and(|rating| rating >= *floor),
            Clause::PriceIn(tiers) => restaurant.price_range.as_deref().is_some_and(|price| {
                tiers
                    .iter()
                    .any(|tier| tier.trim().eq_ignore_ascii_case(price.trim()))
            }),
            Clause::Featured(featured) => restaurant.is_featured == *featured,
        }
    }
}

/// Conjunction of clauses over published restaurants.
#[derive(Debug, Clone, PartialEq)]
pub struct RestaurantPredicate {
    clauses: Vec<Clause>,
}

impl RestaurantPredicate {
    /// Base predicate: the launch-city allow-list.
    pub fn within(cities: &LaunchCities) -> Self {
        Self {
            clauses: vec![Clause::LaunchCities(cities.iter().cloned().collect())],
        }
    }

    pub fn and(mut self, clause: Clause) -> Self {
        self.clauses.push(clause);
        self
    }

    pub fn clauses(&self) -> &[Clause] {
        &self.clauses
    }

    pub fn matches(&self, restaurant: &Restaurant) -> bool {
        restaurant.is_published() && self.clauses.iter().all(|clause| clause.matches(restaurant))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SortField {
    Rating,
    Name,
    ReviewCount,
    CreatedAt,
}

impl SortField {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "rating" => Some(Self::Rating),
            "name" => Some(Self::Name),
            "review_count" | "reviewcount" | "reviews" => Some(Self::ReviewCount),
            "created_at" | "createdat" | "newest" => Some(Self::CreatedAt),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
    Asc,
    Desc,
}

impl SortOrder {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "asc" | "ascending" => Some(Self::Asc),
            "desc" | "descending" => Some(Self::Desc),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SortSpec {
    pub field: SortField,
    pub order: SortOrder,
}

impl Default for SortSpec {
    fn default() -> Self {
        Self {
            field: SortField::Rating,
            order: SortOrder::Desc,
        }
    }
}

impl SortSpec {
    /// Unknown fields fall back to the default `rating desc`; a missing order keeps the field.
    pub fn resolve(field: Option<&str>, order: Option<&str>) -> Self {
        let Some(raw_field) = field.filter(|value| !value.trim().is_empty()) else {
            return Self {
                order: order.and_then(SortOrder::parse).unwrap_or(SortOrder::Desc),
                ..Self::default()
            };
        };

        match SortField::parse(raw_field) {
            Some(field) => Self {
                field,
                order: order.and_then(SortOrder::parse).unwrap_or(SortOrder::Desc),
            },
            None => Self::default(),
        }
    }

    /// Missing ratings sort last in either direction; ties break on name then id.
    pub fn compare(&self, left: &Restaurant, right: &Restaurant) -> Ordering {
        let primary = match self.field {
            SortField::Rating => match (left.rating, right.rating) {
                (Some(a), Some(b)) => self.directed(a.total_cmp(&b)),
                (Some(_), None) => Ordering::Less,
                (None, Some(_)) => Ordering::Greater,
                (None, None) => Ordering::Equal,
            },
            SortField::Name => self.directed(
                left.name
                    .to_lowercase()
                    .cmp(&right.name.to_lowercase()),
            ),
            SortField::ReviewCount => self.directed(left.review_count.cmp(&right.review_count)),
            SortField::CreatedAt => self.directed(left.created_at.cmp(&right.created_at)),
        };

        primary
            .then_with(|| left.name.to_lowercase().cmp(&right.name.to_lowercase()))
            .then_with(|| left.id.cmp(&right.id))
    }

    fn directed(&self, ordering: Ordering) -> Ordering {
        match self.order {
            SortOrder::Asc => ordering,
            SortOrder::Desc => ordering.reverse(),
        }
    }
}
