use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{error, info, warn};

use super::domain::{
    Actor, Claim, ClaimEvidence, ClaimId, ClaimStatus, Restaurant, RestaurantId,
    RestaurantStatus, ReviewStamp, Soup, SoupId, Submission, SubmissionId, SubmissionStatus,
};
use super::error::{AuthorizationError, DirectoryError};
use super::lifecycle::{
    next_claim_status, next_submission_phase, ClaimAction, InvalidTransition, SubmissionAction,
    SubmissionPhase,
};
use super::repository::{ApprovalCommit, ListingStore, RepositoryError};
use super::slug::{base_restaurant_slug, unique_slug};
use super::submissions::explain_write;
use super::validation::validate_claim_evidence;

const SLUG_COMMIT_ATTEMPTS: usize = 3;

/// Result of approving a submission.
#[derive(Debug, Clone, Serialize)]
pub struct ApprovalOutcome {
    pub restaurant: Restaurant,
    pub submission: Submission,
}

/// Result of removing an approved listing.
#[derive(Debug, Clone, Serialize)]
pub struct RemovalOutcome {
    pub restaurant: Restaurant,
    pub submission: Submission,
}

#[derive(Debug, Clone, Serialize)]
pub struct ClaimApproval {
    pub claim: Claim,
    pub restaurant: Restaurant,
}

/// Records whose submission/restaurant links disagree and need manual attention.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReconciliationReport {
    /// Restaurants created from a submission that does not point back to them.
    pub orphaned_restaurants: Vec<RestaurantId>,
    /// Approved or removed submissions whose linked restaurant is missing.
    pub dangling_submissions: Vec<SubmissionId>,
}

impl ReconciliationReport {
    pub fn is_consistent(&self) -> bool {
        self.orphaned_restaurants.is_empty() && self.dangling_submissions.is_empty()
    }
}

/// Admin review of submissions and ownership claims.
pub struct ModerationService<S> {
    store: Arc<S>,
}

impl<S> ModerationService<S>
where
    S: ListingStore + 'static,
{
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    pub fn submissions(
        &self,
        admin: &Actor,
        status: SubmissionStatus,
        limit: usize,
    ) -> Result<Vec<Submission>, DirectoryError> {
        require_admin(admin)?;
        Ok(self.store.submissions_by_status(status, limit)?)
    }

    /// Publishes a pending submission as a live restaurant in one store commit.
    pub fn approve(
        &self,
        id: &SubmissionId,
        admin: &Actor,
    ) -> Result<ApprovalOutcome, DirectoryError> {
        require_admin(admin)?;
        let current = self.fetch_submission(id)?;
        let phase = SubmissionPhase::of(&current);
        let next = next_submission_phase(phase, SubmissionAction::Approve)?;

        let now = Utc::now();
        let details = &current.restaurant;
        let base = base_restaurant_slug(&details.name, &details.city, &details.state);

        for attempt in 1..=SLUG_COMMIT_ATTEMPTS {
            let slug = unique_slug(&base, |candidate| self.store.slug_taken(candidate))?
                .ok_or_else(|| {
                    DirectoryError::Infrastructure(RepositoryError::Inconsistent(format!(
                        "no free slug for base '{base}'"
                    )))
                })?;
            let restaurant = restaurant_from_submission(&current, slug, now);
            let soups = soups_from_tags(&current, restaurant.id);
            let submission = Submission {
                status: next.status(),
                created_restaurant_id: Some(restaurant.id),
                review: Some(ReviewStamp {
                    reviewer_id: admin.user_id.clone(),
                    reviewed_at: now,
                    notes: None,
                }),
                updated_at: now,
                ..current.clone()
            };

            let commit = ApprovalCommit {
                submission: submission.clone(),
                restaurant: restaurant.clone(),
                soups,
            };
            match self.store.commit_approval(commit) {
                Ok(()) => {
                    info!(
                        submission_id = %id,
                        restaurant_id = %restaurant.id,
                        slug = %restaurant.slug,
                        reviewer = %admin.user_id,
                        verified = restaurant.is_verified,
                        "submission approved"
                    );
                    return Ok(ApprovalOutcome {
                        restaurant,
                        submission,
                    });
                }
                Err(RepositoryError::Conflict) => {
                    warn!(submission_id = %id, attempt, "slug claimed concurrently, retrying");
                }
                Err(error) => {
                    return Err(explain_write(
                        self.store.as_ref(),
                        id,
                        SubmissionAction::Approve,
                        error,
                    ))
                }
            }
        }

        Err(DirectoryError::Infrastructure(RepositoryError::Conflict))
    }

    pub fn reject(
        &self,
        id: &SubmissionId,
        admin: &Actor,
        notes: Option<String>,
    ) -> Result<Submission, DirectoryError> {
        require_admin(admin)?;
        let current = self.fetch_submission(id)?;
        let phase = SubmissionPhase::of(&current);
        let next = next_submission_phase(phase, SubmissionAction::Reject)?;

        let now = Utc::now();
        let rejected = Submission {
            status: next.status(),
            review: Some(ReviewStamp {
                reviewer_id: admin.user_id.clone(),
                reviewed_at: now,
                notes: trimmed(notes),
            }),
            updated_at: now,
            ..current
        };

        self.store
            .update_submission(rejected.clone(), phase)
            .map_err(|error| {
                explain_write(self.store.as_ref(), id, SubmissionAction::Reject, error)
            })?;
        info!(submission_id = %id, reviewer = %admin.user_id, "submission rejected");
        Ok(rejected)
    }

    /// Honors a submitter's deletion request by deactivating the linked restaurant.
    pub fn remove(
        &self,
        id: &SubmissionId,
        admin: &Actor,
    ) -> Result<RemovalOutcome, DirectoryError> {
        require_admin(admin)?;
        let current = self.fetch_submission(id)?;
        let phase = SubmissionPhase::of(&current);
        let next = next_submission_phase(phase, SubmissionAction::Remove)?;

        let restaurant_id = current.created_restaurant_id.ok_or_else(|| {
            inconsistency(format!("approved submission {id} has no linked restaurant"))
        })?;
        let restaurant = self.store.fetch_restaurant(&restaurant_id)?.ok_or_else(|| {
            inconsistency(format!(
                "restaurant {restaurant_id} linked from submission {id} is missing"
            ))
        })?;

        let now = Utc::now();
        let restaurant = Restaurant {
            is_active: false,
            status: RestaurantStatus::Removed,
            updated_at: now,
            ..restaurant
        };
        let submission = Submission {
            status: next.status(),
            delete_requested: next.delete_requested(),
            delete_reason: None,
            updated_at: now,
            ..current
        };

        let restaurant = self
            .store
            .commit_removal(submission.clone(), restaurant, phase)
            .map_err(|error| {
                explain_write(self.store.as_ref(), id, SubmissionAction::Remove, error)
            })?;
        info!(
            submission_id = %id,
            restaurant_id = %restaurant.id,
            reviewer = %admin.user_id,
            "listing removed on submitter request"
        );
        Ok(RemovalOutcome {
            restaurant,
            submission,
        })
    }

    /// Opens an ownership claim on a published restaurant.
    pub fn file_claim(
        &self,
        restaurant_id: &RestaurantId,
        claimant: &Actor,
        evidence: ClaimEvidence,
    ) -> Result<Claim, DirectoryError> {
        let evidence = validate_claim_evidence(evidence)?;
        let restaurant = self
            .store
            .fetch_restaurant(restaurant_id)?
            .ok_or(DirectoryError::NotFound)?;
        if !restaurant.is_published() {
            return Err(InvalidTransition::RestaurantInactive.into());
        }
        if restaurant.is_verified && restaurant.owner_id.as_ref() == Some(&claimant.user_id) {
            return Err(InvalidTransition::AlreadyOwned.into());
        }

        let now = Utc::now();
        let claim = Claim {
            id: ClaimId::new(),
            restaurant_id: *restaurant_id,
            user_id: claimant.user_id.clone(),
            status: ClaimStatus::Pending,
            evidence,
            review: None,
            created_at: now,
            updated_at: now,
        };

        let stored = self.store.insert_claim(claim).map_err(|error| match error {
            RepositoryError::Conflict => InvalidTransition::ClaimAlreadyOpen.into(),
            other => DirectoryError::from(other),
        })?;
        info!(
            claim_id = %stored.id,
            restaurant_id = %restaurant_id,
            claimant = %claimant.user_id,
            "ownership claim filed"
        );
        Ok(stored)
    }

    pub fn claims(
        &self,
        admin: &Actor,
        status: ClaimStatus,
        limit: usize,
    ) -> Result<Vec<Claim>, DirectoryError> {
        require_admin(admin)?;
        Ok(self.store.claims_by_status(status, limit)?)
    }

    /// Grants ownership and verification together with the claim decision.
    pub fn approve_claim(
        &self,
        id: &ClaimId,
        admin: &Actor,
    ) -> Result<ClaimApproval, DirectoryError> {
        require_admin(admin)?;
        let current = self.fetch_claim(id)?;
        let next = next_claim_status(current.status, ClaimAction::Approve)?;

        let restaurant = self
            .store
            .fetch_restaurant(&current.restaurant_id)?
            .ok_or_else(|| {
                inconsistency(format!(
                    "claim {id} references missing restaurant {}",
                    current.restaurant_id
                ))
            })?;
        if !restaurant.is_published() {
            return Err(InvalidTransition::RestaurantInactive.into());
        }
        if restaurant.is_verified && restaurant.owner_id.as_ref() != Some(&current.user_id) {
            return Err(InvalidTransition::AlreadyOwned.into());
        }

        let now = Utc::now();
        let restaurant = Restaurant {
            owner_id: Some(current.user_id.clone()),
            is_verified: true,
            verified_at: Some(now),
            updated_at: now,
            ..restaurant
        };
        let expected = current.status;
        let claim = Claim {
            status: next,
            review: Some(ReviewStamp {
                reviewer_id: admin.user_id.clone(),
                reviewed_at: now,
                notes: None,
            }),
            updated_at: now,
            ..current
        };

        let restaurant = self
            .store
            .commit_claim_approval(claim.clone(), restaurant, expected)
            .map_err(|error| self.explain_claim_write(id, ClaimAction::Approve, error))?;
        info!(
            claim_id = %id,
            restaurant_id = %restaurant.id,
            owner = %claim.user_id,
            reviewer = %admin.user_id,
            "ownership claim approved"
        );
        Ok(ClaimApproval { claim, restaurant })
    }

    pub fn deny_claim(
        &self,
        id: &ClaimId,
        admin: &Actor,
        notes: Option<String>,
    ) -> Result<Claim, DirectoryError> {
        self.review_claim(id, admin, ClaimAction::Deny, notes)
    }

    pub fn request_claim_info(
        &self,
        id: &ClaimId,
        admin: &Actor,
        notes: Option<String>,
    ) -> Result<Claim, DirectoryError> {
        self.review_claim(id, admin, ClaimAction::RequestInfo, notes)
    }

    /// Lets the claimant answer a request for more information, returning the claim to review.
    pub fn resubmit_claim(
        &self,
        id: &ClaimId,
        claimant: &Actor,
        evidence: ClaimEvidence,
    ) -> Result<Claim, DirectoryError> {
        let current = self.fetch_claim(id)?;
        if current.user_id != claimant.user_id {
            return Err(DirectoryError::NotFound);
        }
        let next = next_claim_status(current.status, ClaimAction::Resubmit)?;
        let evidence = validate_claim_evidence(evidence)?;

        let expected = current.status;
        let claim = Claim {
            status: next,
            evidence,
            updated_at: Utc::now(),
            ..current
        };
        self.store
            .update_claim(claim.clone(), expected)
            .map_err(|error| self.explain_claim_write(id, ClaimAction::Resubmit, error))?;
        info!(claim_id = %id, claimant = %claimant.user_id, "claim evidence resubmitted");
        Ok(claim)
    }

    /// Cross-checks submission/restaurant links in both directions.
    pub fn reconcile(&self, admin: &Actor) -> Result<ReconciliationReport, DirectoryError> {
        require_admin(admin)?;
        let submissions: BTreeMap<SubmissionId, Submission> = self
            .store
            .all_submissions()?
            .into_iter()
            .map(|submission| (submission.id, submission))
            .collect();
        let restaurants = self.store.all_restaurants()?;
        let restaurant_ids: BTreeSet<RestaurantId> =
            restaurants.iter().map(|restaurant| restaurant.id).collect();

        let mut orphaned_restaurants: Vec<RestaurantId> = restaurants
            .iter()
            .filter(|restaurant| match restaurant.source_submission_id {
                Some(source) => submissions
                    .get(&source)
                    .map_or(true, |submission| {
                        submission.created_restaurant_id != Some(restaurant.id)
                    }),
                None => false,
            })
            .map(|restaurant| restaurant.id)
            .collect();
        orphaned_restaurants.sort();

        let dangling_submissions: Vec<SubmissionId> = submissions
            .values()
            .filter(|submission| {
                matches!(
                    submission.status,
                    SubmissionStatus::Approved | SubmissionStatus::Removed
                )
            })
            .filter(|submission| {
                submission
                    .created_restaurant_id
                    .map_or(true, |linked| !restaurant_ids.contains(&linked))
            })
            .map(|submission| submission.id)
            .collect();

        let report = ReconciliationReport {
            orphaned_restaurants,
            dangling_submissions,
        };
        if !report.is_consistent() {
            warn!(
                orphaned = report.orphaned_restaurants.len(),
                dangling = report.dangling_submissions.len(),
                "listing store needs manual reconciliation"
            );
        }
        Ok(report)
    }

    fn review_claim(
        &self,
        id: &ClaimId,
        admin: &Actor,
        action: ClaimAction,
        notes: Option<String>,
    ) -> Result<Claim, DirectoryError> {
        require_admin(admin)?;
        let current = self.fetch_claim(id)?;
        let next = next_claim_status(current.status, action)?;

        let now = Utc::now();
        let expected = current.status;
        let claim = Claim {
            status: next,
            review: Some(ReviewStamp {
                reviewer_id: admin.user_id.clone(),
                reviewed_at: now,
                notes: trimmed(notes),
            }),
            updated_at: now,
            ..current
        };
        self.store
            .update_claim(claim.clone(), expected)
            .map_err(|error| self.explain_claim_write(id, action, error))?;
        info!(
            claim_id = %id,
            status = claim.status.label(),
            reviewer = %admin.user_id,
            "ownership claim reviewed"
        );
        Ok(claim)
    }

    fn explain_claim_write(
        &self,
        id: &ClaimId,
        action: ClaimAction,
        error: RepositoryError,
    ) -> DirectoryError {
        if error != RepositoryError::Stale {
            return error.into();
        }

        let current = match self.store.fetch_claim(id) {
            Ok(Some(current)) => current,
            Ok(None) => return DirectoryError::NotFound,
            Err(error) => return error.into(),
        };
        if let Err(transition) = next_claim_status(current.status, action) {
            return transition.into();
        }

        // Claim still reviewable, so the restaurant changed underneath it.
        match self.store.fetch_restaurant(&current.restaurant_id) {
            Ok(Some(restaurant)) if !restaurant.is_published() => {
                InvalidTransition::RestaurantInactive.into()
            }
            Ok(Some(_)) => InvalidTransition::AlreadyOwned.into(),
            Ok(None) => DirectoryError::NotFound,
            Err(error) => error.into(),
        }
    }

    fn fetch_submission(&self, id: &SubmissionId) -> Result<Submission, DirectoryError> {
        self.store
            .fetch_submission(id)?
            .ok_or(DirectoryError::NotFound)
    }

    fn fetch_claim(&self, id: &ClaimId) -> Result<Claim, DirectoryError> {
        self.store.fetch_claim(id)?.ok_or(DirectoryError::NotFound)
    }
}

pub fn require_admin(actor: &Actor) -> Result<(), DirectoryError> {
    if actor.is_admin() {
        Ok(())
    } else {
        Err(AuthorizationError::Forbidden.into())
    }
}

fn restaurant_from_submission(
    submission: &Submission,
    slug: String,
    now: DateTime<Utc>,
) -> Restaurant {
    let details = &submission.restaurant;
    let owned = submission.is_restaurant_owner;
    Restaurant {
        id: RestaurantId::new(),
        slug,
        name: details.name.clone(),
        address: Some(details.address.clone()),
        city: Some(details.city.clone()),
        state: Some(details.state.clone()),
        zip: details.zip.clone(),
        phone: details.phone.clone(),
        website: details.website.clone(),
        cuisine: details.cuisine.clone(),
        rating: None,
        review_count: 0,
        price_range: None,
        is_featured: false,
        owner_id: owned.then(|| submission.submitted_by.clone()),
        owner_org_id: None,
        is_verified: owned,
        verified_at: owned.then_some(now),
        is_active: true,
        status: RestaurantStatus::Live,
        source_submission_id: Some(submission.id),
        created_at: now,
        updated_at: now,
    }
}

fn soups_from_tags(submission: &Submission, restaurant_id: RestaurantId) -> Vec<Soup> {
    submission
        .restaurant
        .soup_tags
        .iter()
        .map(|tag| Soup {
            id: SoupId::new(),
            restaurant_id,
            soup_type: tag.clone(),
            name: tag.clone(),
            description: None,
            price_cents: None,
            dietary_tags: Vec::new(),
        })
        .collect()
}

fn inconsistency(detail: String) -> DirectoryError {
    error!(%detail, "listing store inconsistency");
    DirectoryError::Infrastructure(RepositoryError::Inconsistent(detail))
}

fn trimmed(notes: Option<String>) -> Option<String> {
    notes
        .map(|notes| notes.trim().to_string())
        .filter(|notes| !notes.is_empty())
}
