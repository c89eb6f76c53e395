use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};

use super::domain::{
    Claim, ClaimId, ClaimStatus, Restaurant, RestaurantId, RestaurantListing, Soup, Submission,
    SubmissionId, SubmissionStatus, UserId,
};
use super::lifecycle::SubmissionPhase;
use super::predicate::{RestaurantPredicate, SortSpec};
use super::repository::{
    ApprovalCommit, DirectoryReader, ListingStore, RepositoryError, SoupRestriction,
};
use super::soup_types::SoupTypeMatch;

#[derive(Debug, Default)]
struct StoreState {
    submissions: HashMap<SubmissionId, Submission>,
    restaurants: HashMap<RestaurantId, Restaurant>,
    slugs: HashSet<String>,
    soups: Vec<Soup>,
    claims: HashMap<ClaimId, Claim>,
}

impl StoreState {
    fn listing(&self, restaurant: &Restaurant) -> RestaurantListing {
        RestaurantListing {
            restaurant: restaurant.clone(),
            soups: self
                .soups
                .iter()
                .filter(|soup| soup.restaurant_id == restaurant.id)
                .cloned()
                .collect(),
        }
    }

    fn matching<'a>(
        &'a self,
        predicate: &'a RestaurantPredicate,
    ) -> impl Iterator<Item = &'a Restaurant> + 'a {
        self.restaurants
            .values()
            .filter(move |restaurant| predicate.matches(restaurant))
    }

    fn expect_submission_phase(
        &self,
        id: &SubmissionId,
        expected: SubmissionPhase,
    ) -> Result<(), RepositoryError> {
        let stored = self
            .submissions
            .get(id)
            .ok_or(RepositoryError::NotFound)?;
        if SubmissionPhase::of(stored) == expected {
            Ok(())
        } else {
            Err(RepositoryError::Stale)
        }
    }

    fn expect_claim_status(&self, id: &ClaimId, expected: ClaimStatus) -> Result<(), RepositoryError> {
        let stored = self.claims.get(id).ok_or(RepositoryError::NotFound)?;
        if stored.status == expected {
            Ok(())
        } else {
            Err(RepositoryError::Stale)
        }
    }
}

/// Process-local store backing the service and tests; every commit holds one lock.
#[derive(Debug, Default, Clone)]
pub struct MemoryDirectoryStore {
    state: Arc<Mutex<StoreState>>,
}

impl MemoryDirectoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, StoreState>, RepositoryError> {
        self.state
            .lock()
            .map_err(|_| RepositoryError::Unavailable("directory store mutex poisoned".into()))
    }
}

impl ListingStore for MemoryDirectoryStore {
    fn insert_submission(&self, submission: Submission) -> Result<Submission, RepositoryError> {
        let mut guard = self.lock()?;
        if guard.submissions.contains_key(&submission.id) {
            return Err(RepositoryError::Conflict);
        }
        guard.submissions.insert(submission.id, submission.clone());
        Ok(submission)
    }

    fn fetch_submission(&self, id: &SubmissionId) -> Result<Option<Submission>, RepositoryError> {
        Ok(self.lock()?.submissions.get(id).cloned())
    }

    fn update_submission(
        &self,
        submission: Submission,
        expected: SubmissionPhase,
    ) -> Result<(), RepositoryError> {
        let mut guard = self.lock()?;
        guard.expect_submission_phase(&submission.id, expected)?;
        guard.submissions.insert(submission.id, submission);
        Ok(())
    }

    fn delete_submission(
        &self,
        id: &SubmissionId,
        expected: SubmissionPhase,
    ) -> Result<(), RepositoryError> {
        let mut guard = self.lock()?;
        guard.expect_submission_phase(id, expected)?;
        guard.submissions.remove(id);
        Ok(())
    }

    fn submissions_by_status(
        &self,
        status: SubmissionStatus,
        limit: usize,
    ) -> Result<Vec<Submission>, RepositoryError> {
        let guard = self.lock()?;
        let mut matching: Vec<Submission> = guard
            .submissions
            .values()
            .filter(|submission| submission.status == status)
            .cloned()
            .collect();
        matching.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        matching.truncate(limit);
        Ok(matching)
    }

    fn submissions_by_submitter(
        &self,
        user_id: &UserId,
    ) -> Result<Vec<Submission>, RepositoryError> {
        let guard = self.lock()?;
        let mut owned: Vec<Submission> = guard
            .submissions
            .values()
            .filter(|submission| submission.is_owned_by(user_id))
            .cloned()
            .collect();
        owned.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(a.id.cmp(&b.id)));
        Ok(owned)
    }

    fn all_submissions(&self) -> Result<Vec<Submission>, RepositoryError> {
        Ok(self.lock()?.submissions.values().cloned().collect())
    }

    fn fetch_restaurant(&self, id: &RestaurantId) -> Result<Option<Restaurant>, RepositoryError> {
        Ok(self.lock()?.restaurants.get(id).cloned())
    }

    fn slug_taken(&self, slug: &str) -> Result<bool, RepositoryError> {
        Ok(self.lock()?.slugs.contains(slug))
    }

    fn insert_restaurant(
        &self,
        restaurant: Restaurant,
        soups: Vec<Soup>,
    ) -> Result<(), RepositoryError> {
        let mut guard = self.lock()?;
        if guard.restaurants.contains_key(&restaurant.id) || guard.slugs.contains(&restaurant.slug)
        {
            return Err(RepositoryError::Conflict);
        }
        guard.slugs.insert(restaurant.slug.clone());
        guard.restaurants.insert(restaurant.id, restaurant);
        guard.soups.extend(soups);
        Ok(())
    }

    fn all_restaurants(&self) -> Result<Vec<Restaurant>, RepositoryError> {
        Ok(self.lock()?.restaurants.values().cloned().collect())
    }

    fn commit_approval(&self, commit: ApprovalCommit) -> Result<(), RepositoryError> {
        let ApprovalCommit {
            submission,
            restaurant,
            soups,
        } = commit;

        let mut guard = self.lock()?;
        guard.expect_submission_phase(&submission.id, SubmissionPhase::Pending)?;
        if guard.restaurants.contains_key(&restaurant.id) || guard.slugs.contains(&restaurant.slug)
        {
            return Err(RepositoryError::Conflict);
        }

        guard.slugs.insert(restaurant.slug.clone());
        guard.restaurants.insert(restaurant.id, restaurant);
        guard.soups.extend(soups);
        guard.submissions.insert(submission.id, submission);
        Ok(())
    }

    fn commit_removal(
        &self,
        submission: Submission,
        restaurant: Restaurant,
        expected: SubmissionPhase,
    ) -> Result<Restaurant, RepositoryError> {
        let mut guard = self.lock()?;
        guard.expect_submission_phase(&submission.id, expected)?;
        let stored = guard.restaurants.get_mut(&restaurant.id).ok_or_else(|| {
            RepositoryError::Inconsistent(format!(
                "restaurant {} linked from submission {} is missing",
                restaurant.id, submission.id
            ))
        })?;

        stored.is_active = restaurant.is_active;
        stored.status = restaurant.status;
        stored.updated_at = restaurant.updated_at;
        let committed = stored.clone();
        guard.submissions.insert(submission.id, submission);
        Ok(committed)
    }

    fn insert_claim(&self, claim: Claim) -> Result<Claim, RepositoryError> {
        let mut guard = self.lock()?;
        let duplicate = guard.claims.values().any(|existing| {
            existing.id == claim.id
                || (existing.restaurant_id == claim.restaurant_id
                    && existing.user_id == claim.user_id
                    && existing.status.is_actionable())
        });
        if duplicate {
            return Err(RepositoryError::Conflict);
        }
        guard.claims.insert(claim.id, claim.clone());
        Ok(claim)
    }

    fn fetch_claim(&self, id: &ClaimId) -> Result<Option<Claim>, RepositoryError> {
        Ok(self.lock()?.claims.get(id).cloned())
    }

    fn update_claim(&self, claim: Claim, expected: ClaimStatus) -> Result<(), RepositoryError> {
        let mut guard = self.lock()?;
        guard.expect_claim_status(&claim.id, expected)?;
        guard.claims.insert(claim.id, claim);
        Ok(())
    }

    fn commit_claim_approval(
        &self,
        claim: Claim,
        restaurant: Restaurant,
        expected: ClaimStatus,
    ) -> Result<Restaurant, RepositoryError> {
        let mut guard = self.lock()?;
        guard.expect_claim_status(&claim.id, expected)?;
        let stored = guard
            .restaurants
            .get_mut(&restaurant.id)
            .ok_or(RepositoryError::NotFound)?;
        if !stored.is_published()
            || (stored.is_verified && stored.owner_id.as_ref() != Some(&claim.user_id))
        {
            return Err(RepositoryError::Stale);
        }

        stored.owner_id = restaurant.owner_id;
        stored.is_verified = restaurant.is_verified;
        stored.verified_at = restaurant.verified_at;
        stored.updated_at = restaurant.updated_at;
        let committed = stored.clone();
        guard.claims.insert(claim.id, claim);
        Ok(committed)
    }

    fn claims_by_status(
        &self,
        status: ClaimStatus,
        limit: usize,
    ) -> Result<Vec<Claim>, RepositoryError> {
        let guard = self.lock()?;
        let mut matching: Vec<Claim> = guard
            .claims
            .values()
            .filter(|claim| claim.status == status)
            .cloned()
            .collect();
        matching.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        matching.truncate(limit);
        Ok(matching)
    }
}

impl DirectoryReader for MemoryDirectoryStore {
    fn soup_restriction(&self, filter: &SoupTypeMatch) -> Result<SoupRestriction, RepositoryError> {
        let guard = self.lock()?;
        let restaurant_ids: BTreeSet<RestaurantId> = guard
            .soups
            .iter()
            .filter(|soup| filter.accepts(&soup.soup_type))
            .map(|soup| soup.restaurant_id)
            .collect();

        Ok(SoupRestriction {
            restaurant_ids,
            variant_exact: true,
        })
    }

    fn count_restaurants(
        &self,
        predicate: &RestaurantPredicate,
    ) -> Result<Option<usize>, RepositoryError> {
        Ok(Some(self.lock()?.matching(predicate).count()))
    }

    fn restaurant_ids(
        &self,
        predicate: &RestaurantPredicate,
    ) -> Result<Vec<RestaurantId>, RepositoryError> {
        Ok(self
            .lock()?
            .matching(predicate)
            .map(|restaurant| restaurant.id)
            .collect())
    }

    fn restaurant_page(
        &self,
        predicate: &RestaurantPredicate,
        sort: SortSpec,
        offset: usize,
        limit: usize,
    ) -> Result<Vec<RestaurantListing>, RepositoryError> {
        let guard = self.lock()?;
        let mut rows: Vec<&Restaurant> = guard.matching(predicate).collect();
        rows.sort_by(|left, right| sort.compare(left, right));

        Ok(rows
            .into_iter()
            .skip(offset)
            .take(limit)
            .map(|restaurant| guard.listing(restaurant))
            .collect())
    }

    fn listing_by_slug(&self, slug: &str) -> Result<Option<RestaurantListing>, RepositoryError> {
        let guard = self.lock()?;
        Ok(guard
            .restaurants
            .values()
            .find(|restaurant| restaurant.slug == slug)
            .map(|restaurant| guard.listing(restaurant)))
    }

    fn published_restaurants(&self) -> Result<Vec<Restaurant>, RepositoryError> {
        Ok(self
            .lock()?
            .restaurants
            .values()
            .filter(|restaurant| restaurant.is_published())
            .cloned()
            .collect())
    }

    fn all_soups(&self) -> Result<Vec<Soup>, RepositoryError> {
        Ok(self.lock()?.soups.clone())
    }
}
