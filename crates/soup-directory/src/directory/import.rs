use std::io::Read;
use std::path::Path;

use chrono::Utc;
use serde::{Deserialize, Deserializer};
use tracing::{info, warn};

use super::domain::{Restaurant, RestaurantId, RestaurantStatus, Soup, SoupId};
use super::repository::{ListingStore, RepositoryError};
use super::slug::{base_restaurant_slug, unique_slug};
use super::validation::{clean_soup_tags, normalize_state};

#[derive(Debug, thiserror::Error)]
pub enum ImportError {
    #[error("failed to read seed file: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid seed CSV data: {0}")]
    Csv(#[from] csv::Error),
    #[error("could not store seeded restaurant: {0}")]
    Store(#[from] RepositoryError),
    #[error("no free slug for seeded restaurant '{0}'")]
    SlugExhausted(String),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImportSummary {
    pub restaurants: usize,
    pub soups: usize,
    pub skipped: usize,
}

/// Loads operator-curated restaurants straight into the live directory.
pub struct SeedImporter;

impl SeedImporter {
    pub fn from_path<P, S>(path: P, store: &S) -> Result<ImportSummary, ImportError>
    where
        P: AsRef<Path>,
        S: ListingStore + ?Sized,
    {
        let file = std::fs::File::open(path)?;
        Self::from_reader(file, store)
    }

    pub fn from_reader<R, S>(reader: R, store: &S) -> Result<ImportSummary, ImportError>
    where
        R: Read,
        S: ListingStore + ?Sized,
    {
        let mut csv_reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(reader);
        let mut summary = ImportSummary::default();

        for (index, record) in csv_reader.deserialize::<SeedRow>().enumerate() {
            let row = record?;
            let line = index + 2;
            let Some(state) = normalize_state(&row.state) else {
                warn!(line, state = %row.state, "skipping seed row with unknown state");
                summary.skipped += 1;
                continue;
            };
            if row.name.is_empty() || row.city.is_empty() {
                warn!(line, "skipping seed row without name or city");
                summary.skipped += 1;
                continue;
            }

            let base = base_restaurant_slug(&row.name, &row.city, &state);
            let slug = unique_slug(&base, |candidate| store.slug_taken(candidate))?
                .ok_or_else(|| ImportError::SlugExhausted(row.name.clone()))?;
            let (restaurant, soups) = row.into_listing(slug, state);

            summary.soups += soups.len();
            store.insert_restaurant(restaurant, soups)?;
            summary.restaurants += 1;
        }

        info!(
            restaurants = summary.restaurants,
            soups = summary.soups,
            skipped = summary.skipped,
            "seed import finished"
        );
        Ok(summary)
    }
}

#[derive(Debug, Deserialize)]
struct SeedRow {
    name: String,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    address: Option<String>,
    city: String,
    state: String,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    zip: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    phone: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    website: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    cuisine: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    rating: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    review_count: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    price_range: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    featured: Option<String>,
    #[serde(default)]
    soup_types: String,
}

impl SeedRow {
    fn into_listing(self, slug: String, state: String) -> (Restaurant, Vec<Soup>) {
        let now = Utc::now();
        let id = RestaurantId::new();
        let rating = self
            .rating
            .as_deref()
            .and_then(|raw| raw.parse::<f32>().ok())
            .filter(|rating| rating.is_finite());
        let review_count = self
            .review_count
            .as_deref()
            .and_then(|raw| raw.parse::<u32>().ok())
            .unwrap_or(0);
        let is_featured = self.featured.as_deref().is_some_and(parse_flag);

        let soups = clean_soup_tags(self.soup_types.split(';').map(str::to_string).collect())
            .into_iter()
            .map(|soup_type| Soup {
                id: SoupId::new(),
                restaurant_id: id,
                name: soup_type.clone(),
                soup_type,
                description: None,
                price_cents: None,
                dietary_tags: Vec::new(),
            })
            .collect();

        let restaurant = Restaurant {
            id,
            slug,
            name: self.name,
            address: self.address,
            city: Some(self.city),
            state: Some(state),
            zip: self.zip,
            phone: self.phone,
            website: self.website,
            cuisine: self.cuisine,
            rating,
            review_count,
            price_range: self.price_range,
            is_featured,
            owner_id: None,
            owner_org_id: None,
            is_verified: false,
            verified_at: None,
            is_active: true,
            status: RestaurantStatus::Live,
            source_submission_id: None,
            created_at: now,
            updated_at: now,
        };

        (restaurant, soups)
    }
}

fn parse_flag(raw: &str) -> bool {
    matches!(
        raw.trim().to_ascii_lowercase().as_str(),
        "true" | "yes" | "y" | "1"
    )
}

fn empty_string_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let opt = Option::<String>::deserialize(deserializer)?;
    Ok(opt.filter(|value| !value.trim().is_empty()))
}
