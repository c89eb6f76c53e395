use std::collections::BTreeSet;
use std::sync::Arc;

use axum::response::Response;
use chrono::{Duration, Utc};
use serde_json::Value;

use crate::config::{parse_launch_cities, DirectoryConfig};
use crate::directory::domain::{
    Actor, Claim, ClaimEvidence, ClaimId, ClaimStatus, Restaurant, RestaurantId,
    RestaurantListing, RestaurantStatus, Soup, SoupId, Submission, SubmissionId,
    SubmissionPayload, SubmissionStatus, UserId,
};
use crate::directory::lifecycle::SubmissionPhase;
use crate::directory::memory::MemoryDirectoryStore;
use crate::directory::predicate::{RestaurantPredicate, SortSpec};
use crate::directory::repository::{
    ApprovalCommit, DirectoryReader, ListingStore, RepositoryError, SoupRestriction,
};
use crate::directory::router::{directory_router, DirectoryServices};
use crate::directory::slug::{disambiguate, slugify};
use crate::directory::soup_types::SoupTypeMatch;

pub(super) fn directory_config() -> DirectoryConfig {
    DirectoryConfig {
        launch_cities: parse_launch_cities("Minneapolis,MN;Saint Paul,MN;Chicago,IL")
            .expect("valid launch cities"),
        default_page_size: 20,
        max_page_size: 50,
        seed_csv: None,
    }
}

pub(super) fn member() -> Actor {
    Actor::member("user-dana")
}

pub(super) fn other_member() -> Actor {
    Actor::member("user-riley")
}

pub(super) fn admin() -> Actor {
    Actor::admin("admin-sam")
}

pub(super) fn payload() -> SubmissionPayload {
    SubmissionPayload {
        restaurant_name: "Broth House".to_string(),
        address: "12 Lake St".to_string(),
        city: "Minneapolis".to_string(),
        state: "MN".to_string(),
        zip: Some("55401".to_string()),
        cuisine: Some("Vietnamese".to_string()),
        soup_tags: vec!["Pho".to_string(), "Ramen".to_string()],
        contact_name: "Dana".to_string(),
        contact_email: "dana@example.com".to_string(),
        ..SubmissionPayload::default()
    }
}

pub(super) fn owner_payload() -> SubmissionPayload {
    SubmissionPayload {
        is_restaurant_owner: true,
        ..payload()
    }
}

pub(super) fn evidence() -> ClaimEvidence {
    ClaimEvidence {
        contact_name: "Riley".to_string(),
        contact_email: "riley@example.com".to_string(),
        role: Some("Owner".to_string()),
        ..ClaimEvidence::default()
    }
}

pub(super) fn build_services() -> (
    Arc<MemoryDirectoryStore>,
    Arc<DirectoryServices<MemoryDirectoryStore>>,
) {
    let store = Arc::new(MemoryDirectoryStore::new());
    let services = Arc::new(DirectoryServices::new(store.clone(), &directory_config()));
    (store, services)
}

pub(super) fn router_with_services(
    services: Arc<DirectoryServices<MemoryDirectoryStore>>,
) -> axum::Router {
    directory_router(services)
}

/// Creates a submission as `member()` and approves it.
pub(super) fn approved_submission(
    services: &DirectoryServices<MemoryDirectoryStore>,
) -> (Submission, Restaurant) {
    let submission = services
        .submissions
        .create(payload(), &member())
        .expect("submission created");
    let outcome = services
        .moderation
        .approve(&submission.id, &admin())
        .expect("approval succeeds");
    (outcome.submission, outcome.restaurant)
}

pub(super) struct RestaurantSeed<'a> {
    pub name: &'a str,
    pub city: Option<&'a str>,
    pub state: Option<&'a str>,
    pub rating: Option<f32>,
    pub price_range: Option<&'a str>,
    pub featured: bool,
    pub soups: &'a [&'a str],
}

impl Default for RestaurantSeed<'_> {
    fn default() -> Self {
        Self {
            name: "Soup Spot",
            city: Some("Minneapolis"),
            state: Some("MN"),
            rating: Some(4.0),
            price_range: Some("$$"),
            featured: false,
            soups: &[],
        }
    }
}

/// Inserts a live restaurant directly, bypassing moderation.
pub(super) fn seed(store: &MemoryDirectoryStore, seed: RestaurantSeed<'_>) -> Restaurant {
    let now = Utc::now();
    let id = RestaurantId::new();
    let restaurant = Restaurant {
        id,
        slug: disambiguate(&slugify(seed.name)),
        name: seed.name.to_string(),
        address: Some("1 Main St".to_string()),
        city: seed.city.map(str::to_string),
        state: seed.state.map(str::to_string),
        zip: None,
        phone: None,
        website: None,
        cuisine: None,
        rating: seed.rating,
        review_count: 10,
        price_range: seed.price_range.map(str::to_string),
        is_featured: seed.featured,
        owner_id: None,
        owner_org_id: None,
        is_verified: false,
        verified_at: None,
        is_active: true,
        status: RestaurantStatus::Live,
        source_submission_id: None,
        created_at: now - Duration::minutes(5),
        updated_at: now,
    };
    let soups = seed
        .soups
        .iter()
        .map(|soup_type| Soup {
            id: SoupId::new(),
            restaurant_id: id,
            soup_type: soup_type.to_string(),
            name: soup_type.to_string(),
            description: None,
            price_cents: Some(1200),
            dietary_tags: Vec::new(),
        })
        .collect();

    store
        .insert_restaurant(restaurant.clone(), soups)
        .expect("seed restaurant inserted");
    restaurant
}

pub(super) fn names(rows: &[RestaurantListing]) -> Vec<String> {
    rows.iter()
        .map(|listing| listing.restaurant.name.clone())
        .collect()
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 1024 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}

/// Reader that only matches soup types verbatim and cannot count, like a bare SQL backend.
pub(super) struct VerbatimReader {
    pub inner: MemoryDirectoryStore,
}

impl DirectoryReader for VerbatimReader {
    fn soup_restriction(&self, filter: &SoupTypeMatch) -> Result<SoupRestriction, RepositoryError> {
        let restaurant_ids: BTreeSet<RestaurantId> = self
            .inner
            .all_soups()?
            .into_iter()
            .filter(|soup| {
                filter.case_variants().contains(soup.soup_type.trim())
                    || filter
                        .requested()
                        .iter()
                        .any(|requested| soup.soup_type.contains(requested.as_str()))
            })
            .map(|soup| soup.restaurant_id)
            .collect();
        Ok(SoupRestriction {
            restaurant_ids,
            variant_exact: false,
        })
    }

    fn count_restaurants(
        &self,
        _predicate: &RestaurantPredicate,
    ) -> Result<Option<usize>, RepositoryError> {
        Ok(None)
    }

    fn restaurant_ids(
        &self,
        predicate: &RestaurantPredicate,
    ) -> Result<Vec<RestaurantId>, RepositoryError> {
        self.inner.restaurant_ids(predicate)
    }

    fn restaurant_page(
        &self,
        predicate: &RestaurantPredicate,
        sort: SortSpec,
        offset: usize,
        limit: usize,
    ) -> Result<Vec<RestaurantListing>, RepositoryError> {
        self.inner.restaurant_page(predicate, sort, offset, limit)
    }

    fn listing_by_slug(&self, slug: &str) -> Result<Option<RestaurantListing>, RepositoryError> {
        self.inner.listing_by_slug(slug)
    }

    fn published_restaurants(&self) -> Result<Vec<Restaurant>, RepositoryError> {
        self.inner.published_restaurants()
    }

    fn all_soups(&self) -> Result<Vec<Soup>, RepositoryError> {
        self.inner.all_soups()
    }
}

pub(super) struct UnavailableStore;

fn unavailable<T>() -> Result<T, RepositoryError> {
    Err(RepositoryError::Unavailable("connection refused".to_string()))
}

impl ListingStore for UnavailableStore {
    fn insert_submission(&self, _submission: Submission) -> Result<Submission, RepositoryError> {
        unavailable()
    }

    fn fetch_submission(&self, _id: &SubmissionId) -> Result<Option<Submission>, RepositoryError> {
        unavailable()
    }

    fn update_submission(
        &self,
        _submission: Submission,
        _expected: SubmissionPhase,
    ) -> Result<(), RepositoryError> {
        unavailable()
    }

    fn delete_submission(
        &self,
        _id: &SubmissionId,
        _expected: SubmissionPhase,
    ) -> Result<(), RepositoryError> {
        unavailable()
    }

    fn submissions_by_status(
        &self,
        _status: SubmissionStatus,
        _limit: usize,
    ) -> Result<Vec<Submission>, RepositoryError> {
        unavailable()
    }

    fn submissions_by_submitter(
        &self,
        _user_id: &UserId,
    ) -> Result<Vec<Submission>, RepositoryError> {
        unavailable()
    }

    fn all_submissions(&self) -> Result<Vec<Submission>, RepositoryError> {
        unavailable()
    }

    fn fetch_restaurant(&self, _id: &RestaurantId) -> Result<Option<Restaurant>, RepositoryError> {
        unavailable()
    }

    fn slug_taken(&self, _slug: &str) -> Result<bool, RepositoryError> {
        unavailable()
    }

    fn insert_restaurant(
        &self,
        _restaurant: Restaurant,
        _soups: Vec<Soup>,
    ) -> Result<(), RepositoryError> {
        unavailable()
    }

    fn all_restaurants(&self) -> Result<Vec<Restaurant>, RepositoryError> {
        unavailable()
    }

    fn commit_approval(&self, _commit: ApprovalCommit) -> Result<(), RepositoryError> {
        unavailable()
    }

    fn commit_removal(
        &self,
        _submission: Submission,
        _restaurant: Restaurant,
        _expected: SubmissionPhase,
    ) -> Result<Restaurant, RepositoryError> {
        unavailable()
    }

    fn insert_claim(&self, _claim: Claim) -> Result<Claim, RepositoryError> {
        unavailable()
    }

    fn fetch_claim(&self, _id: &ClaimId) -> Result<Option<Claim>, RepositoryError> {
        unavailable()
    }

    fn update_claim(&self, _claim: Claim, _expected: ClaimStatus) -> Result<(), RepositoryError> {
        unavailable()
    }

    fn commit_claim_approval(
        &self,
        _claim: Claim,
        _restaurant: Restaurant,
        _expected: ClaimStatus,
    ) -> Result<Restaurant, RepositoryError> {
        unavailable()
    }

    fn claims_by_status(
        &self,
        _status: ClaimStatus,
        _limit: usize,
    ) -> Result<Vec<Claim>, RepositoryError> {
        unavailable()
    }
}

impl DirectoryReader for UnavailableStore {
    fn soup_restriction(&self, _filter: &SoupTypeMatch) -> Result<SoupRestriction, RepositoryError> {
        unavailable()
    }

    fn count_restaurants(
        &self,
        _predicate: &RestaurantPredicate,
    ) -> Result<Option<usize>, RepositoryError> {
        unavailable()
    }

    fn restaurant_ids(
        &self,
        _predicate: &RestaurantPredicate,
    ) -> Result<Vec<RestaurantId>, RepositoryError> {
        unavailable()
    }

    fn restaurant_page(
        &self,
        _predicate: &RestaurantPredicate,
        _sort: SortSpec,
        _offset: usize,
        _limit: usize,
    ) -> Result<Vec<RestaurantListing>, RepositoryError> {
        unavailable()
    }

    fn listing_by_slug(&self, _slug: &str) -> Result<Option<RestaurantListing>, RepositoryError> {
        unavailable()
    }

    fn published_restaurants(&self) -> Result<Vec<Restaurant>, RepositoryError> {
        unavailable()
    }

    fn all_soups(&self) -> Result<Vec<Soup>, RepositoryError> {
        unavailable()
    }
}
