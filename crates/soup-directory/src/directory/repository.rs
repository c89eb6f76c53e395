use std::collections::BTreeSet;

use super::domain::{
    Claim, ClaimId, ClaimStatus, Restaurant, RestaurantId, RestaurantListing, Soup, Submission,
    SubmissionId, SubmissionStatus, UserId,
};
use super::lifecycle::SubmissionPhase;
use super::predicate::{RestaurantPredicate, SortSpec};
use super::soup_types::SoupTypeMatch;

/// Error enumeration for store failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RepositoryError {
    #[error("record already exists")]
    Conflict,
    #[error("record not found")]
    NotFound,
    /// A conditional write found the record in a different state than the caller read.
    #[error("record changed since it was read")]
    Stale,
    #[error("store inconsistency: {0}")]
    Inconsistent(String),
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}

/// Both effects of approving a submission, applied as one unit.
#[derive(Debug, Clone)]
pub struct ApprovalCommit {
    pub submission: Submission,
    pub restaurant: Restaurant,
    pub soups: Vec<Soup>,
}

/// Write-side storage for the moderation pipeline.
///
/// Every mutation of a moderated record names the state it expects to replace and fails with
/// [`RepositoryError::Stale`] when another writer got there first.
pub trait ListingStore: Send + Sync {
    fn insert_submission(&self, submission: Submission) -> Result<Submission, RepositoryError>;
    fn fetch_submission(&self, id: &SubmissionId) -> Result<Option<Submission>, RepositoryError>;
    fn update_submission(
        &self,
        submission: Submission,
        expected: SubmissionPhase,
    ) -> Result<(), RepositoryError>;
    fn delete_submission(
        &self,
        id: &SubmissionId,
        expected: SubmissionPhase,
    ) -> Result<(), RepositoryError>;
    fn submissions_by_status(
        &self,
        status: SubmissionStatus,
        limit: usize,
    ) -> Result<Vec<Submission>, RepositoryError>;
    fn submissions_by_submitter(&self, user_id: &UserId)
        -> Result<Vec<Submission>, RepositoryError>;
    fn all_submissions(&self) -> Result<Vec<Submission>, RepositoryError>;

    fn fetch_restaurant(&self, id: &RestaurantId) -> Result<Option<Restaurant>, RepositoryError>;
    /// True for any slug ever issued, including removed restaurants.
    fn slug_taken(&self, slug: &str) -> Result<bool, RepositoryError>;
    /// Operator import path; fails with `Conflict` on a duplicate id or slug.
    fn insert_restaurant(
        &self,
        restaurant: Restaurant,
        soups: Vec<Soup>,
    ) -> Result<(), RepositoryError>;
    fn all_restaurants(&self) -> Result<Vec<Restaurant>, RepositoryError>;

    /// Inserts the restaurant and its soups and replaces the submission, only while the stored
    /// submission is still pending.
    fn commit_approval(&self, commit: ApprovalCommit) -> Result<(), RepositoryError>;
    /// Replaces the submission and flips the stored restaurant's `is_active`, `status` and
    /// `updated_at` to the given values, guarded by the submission phase. Returns the stored row.
    fn commit_removal(
        &self,
        submission: Submission,
        restaurant: Restaurant,
        expected: SubmissionPhase,
    ) -> Result<Restaurant, RepositoryError>;

    /// Fails with `Conflict` when the claimant already has an actionable claim on the restaurant.
    fn insert_claim(&self, claim: Claim) -> Result<Claim, RepositoryError>;
    fn fetch_claim(&self, id: &ClaimId) -> Result<Option<Claim>, RepositoryError>;
    fn update_claim(&self, claim: Claim, expected: ClaimStatus) -> Result<(), RepositoryError>;
    /// Replaces the claim and copies owner and verification fields onto the stored restaurant.
    /// Fails with `Stale` when the claim moved on, or the stored restaurant is no longer
    /// published or is verified to someone else.
    fn commit_claim_approval(
        &self,
        claim: Claim,
        restaurant: Restaurant,
        expected: ClaimStatus,
    ) -> Result<Restaurant, RepositoryError>;
    fn claims_by_status(
        &self,
        status: ClaimStatus,
        limit: usize,
    ) -> Result<Vec<Claim>, RepositoryError>;
}

/// Restaurant ids qualifying under a soup-type filter.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SoupRestriction {
    pub restaurant_ids: BTreeSet<RestaurantId>,
    /// Whether the store compared normalized slug variants rather than verbatim casings.
    pub variant_exact: bool,
}

/// Read-side access used by the query engine and counts reporter.
pub trait DirectoryReader: Send + Sync {
    fn soup_restriction(&self, filter: &SoupTypeMatch) -> Result<SoupRestriction, RepositoryError>;
    /// `None` when the backend cannot count directly.
    fn count_restaurants(
        &self,
        predicate: &RestaurantPredicate,
    ) -> Result<Option<usize>, RepositoryError>;
    fn restaurant_ids(
        &self,
        predicate: &RestaurantPredicate,
    ) -> Result<Vec<RestaurantId>, RepositoryError>;
    fn restaurant_page(
        &self,
        predicate: &RestaurantPredicate,
        sort: SortSpec,
        offset: usize,
        limit: usize,
    ) -> Result<Vec<RestaurantListing>, RepositoryError>;
    fn listing_by_slug(&self, slug: &str) -> Result<Option<RestaurantListing>, RepositoryError>;
    fn published_restaurants(&self) -> Result<Vec<Restaurant>, RepositoryError>;
    fn all_soups(&self) -> Result<Vec<Soup>, RepositoryError>;
}
