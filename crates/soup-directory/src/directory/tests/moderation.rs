use std::sync::Arc;
use std::thread;

use chrono::Utc;

use super::common::*;
use crate::directory::domain::{
    Claim, ClaimStatus, Restaurant, RestaurantStatus, Submission, SubmissionId, SubmissionStatus,
};
use crate::directory::error::{AuthorizationError, DirectoryError};
use crate::directory::lifecycle::{InvalidTransition, SubmissionPhase};
use crate::directory::repository::{DirectoryReader, ListingStore};

#[test]
fn approve_materializes_one_linked_restaurant() {
    let (store, services) = build_services();
    let (submission, restaurant) = approved_submission(&services);

    assert_eq!(submission.status, SubmissionStatus::Approved);
    assert_eq!(submission.created_restaurant_id, Some(restaurant.id));
    let review = submission.review.as_ref().expect("review stamped");
    assert_eq!(review.reviewer_id, admin().user_id);

    assert_eq!(restaurant.slug, "broth-house-minneapolis-mn");
    assert_eq!(restaurant.source_submission_id, Some(submission.id));
    assert!(restaurant.is_published());
    assert!(!restaurant.is_verified);
    assert!(restaurant.owner_id.is_none());

    let stored = store.all_restaurants().expect("restaurants");
    assert_eq!(stored.len(), 1);
    let listing = store
        .listing_by_slug(&restaurant.slug)
        .expect("lookup succeeds")
        .expect("listing present");
    let mut soups: Vec<String> = listing.soups.into_iter().map(|soup| soup.soup_type).collect();
    soups.sort();
    assert_eq!(soups, vec!["Pho".to_string(), "Ramen".to_string()]);
}

#[test]
fn owner_submissions_are_verified_on_approval() {
    let (_, services) = build_services();
    let submission = services
        .submissions
        .create(owner_payload(), &member())
        .expect("submission created");
    let outcome = services
        .moderation
        .approve(&submission.id, &admin())
        .expect("approval succeeds");

    assert!(outcome.restaurant.is_verified);
    assert!(outcome.restaurant.verified_at.is_some());
    assert_eq!(outcome.restaurant.owner_id, Some(member().user_id));
}

#[test]
fn approve_and_reject_succeed_at_most_once() {
    let (_, services) = build_services();
    let (submission, _) = approved_submission(&services);

    assert!(matches!(
        services.moderation.approve(&submission.id, &admin()),
        Err(DirectoryError::InvalidState(InvalidTransition::AlreadyReviewed(_)))
    ));
    assert!(matches!(
        services.moderation.reject(&submission.id, &admin(), None),
        Err(DirectoryError::InvalidState(InvalidTransition::AlreadyReviewed(_)))
    ));

    let pending = services
        .submissions
        .create(payload(), &member())
        .expect("created");
    let rejected = services
        .moderation
        .reject(&pending.id, &admin(), Some(" duplicate ".to_string()))
        .expect("reject succeeds");
    assert_eq!(rejected.status, SubmissionStatus::Rejected);
    assert_eq!(
        rejected.review.and_then(|review| review.notes).as_deref(),
        Some("duplicate")
    );
    assert!(matches!(
        services.moderation.approve(&pending.id, &admin()),
        Err(DirectoryError::InvalidState(InvalidTransition::AlreadyReviewed(_)))
    ));
}

#[test]
fn colliding_slugs_are_disambiguated() {
    let (_, services) = build_services();
    let (_, first) = approved_submission(&services);
    let (_, second) = approved_submission(&services);

    assert_eq!(first.slug, "broth-house-minneapolis-mn");
    assert_ne!(first.slug, second.slug);
    assert!(second.slug.starts_with("broth-house-minneapolis-mn-"));
}

#[test]
fn concurrent_approvals_create_a_single_restaurant() {
    let (store, services) = build_services();
    let submission = services
        .submissions
        .create(payload(), &member())
        .expect("created");

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let services = Arc::clone(&services);
            let id: SubmissionId = submission.id;
            thread::spawn(move || services.moderation.approve(&id, &admin()))
        })
        .collect();
    let results: Vec<_> = handles
        .into_iter()
        .map(|handle| handle.join().expect("thread completes"))
        .collect();

    assert_eq!(results.iter().filter(|result| result.is_ok()).count(), 1);
    assert!(results.iter().filter_map(|result| result.as_ref().err()).all(
        |error| matches!(
            error,
            DirectoryError::InvalidState(InvalidTransition::AlreadyReviewed(_))
        )
    ));
    assert_eq!(store.all_restaurants().expect("restaurants").len(), 1);
}

#[test]
fn moderation_requires_admin_role() {
    let (_, services) = build_services();
    let submission = services
        .submissions
        .create(payload(), &member())
        .expect("created");

    assert!(matches!(
        services.moderation.approve(&submission.id, &member()),
        Err(DirectoryError::Authorization(AuthorizationError::Forbidden))
    ));
    assert!(matches!(
        services
            .moderation
            .submissions(&member(), SubmissionStatus::Pending, 10),
        Err(DirectoryError::Authorization(AuthorizationError::Forbidden))
    ));
}

#[test]
fn pending_queue_lists_unreviewed_submissions() {
    let (_, services) = build_services();
    approved_submission(&services);
    let pending = services
        .submissions
        .create(payload(), &other_member())
        .expect("created");

    let queue = services
        .moderation
        .submissions(&admin(), SubmissionStatus::Pending, 10)
        .expect("queue");
    assert_eq!(queue.len(), 1);
    assert_eq!(queue[0].id, pending.id);
}

#[test]
fn remove_requires_a_deletion_request() {
    let (store, services) = build_services();
    let (submission, restaurant) = approved_submission(&services);

    assert!(matches!(
        services.moderation.remove(&submission.id, &admin()),
        Err(DirectoryError::InvalidState(InvalidTransition::NoDeletionRequest(_)))
    ));

    services
        .submissions
        .request_deletion(&submission.id, &member(), Some("closed".to_string()))
        .expect("deletion requested");
    let outcome = services
        .moderation
        .remove(&submission.id, &admin())
        .expect("removal succeeds");

    assert_eq!(outcome.submission.status, SubmissionStatus::Removed);
    assert!(!outcome.submission.delete_requested);
    assert!(outcome.submission.delete_reason.is_none());
    assert!(!outcome.restaurant.is_active);
    assert_eq!(outcome.restaurant.status, RestaurantStatus::Removed);

    let stored = store
        .fetch_restaurant(&restaurant.id)
        .expect("fetch")
        .expect("restaurant kept");
    assert!(!stored.is_published());
    assert!(store.slug_taken(&restaurant.slug).expect("slug lookup"));
}

#[test]
fn claim_approval_sets_owner_and_verification() {
    let (store, services) = build_services();
    let (_, restaurant) = approved_submission(&services);

    let claim = services
        .moderation
        .file_claim(&restaurant.id, &other_member(), evidence())
        .expect("claim filed");
    assert_eq!(claim.status, ClaimStatus::Pending);

    let approval = services
        .moderation
        .approve_claim(&claim.id, &admin())
        .expect("claim approved");
    assert_eq!(approval.claim.status, ClaimStatus::Approved);
    assert_eq!(approval.restaurant.owner_id, Some(other_member().user_id));
    assert!(approval.restaurant.is_verified);

    let stored = store
        .fetch_restaurant(&restaurant.id)
        .expect("fetch")
        .expect("restaurant present");
    assert_eq!(stored.owner_id, Some(other_member().user_id));
    assert!(stored.verified_at.is_some());
    let stored_claim = store
        .fetch_claim(&claim.id)
        .expect("fetch")
        .expect("claim present");
    assert_eq!(stored_claim.status, ClaimStatus::Approved);

    assert!(matches!(
        services.moderation.deny_claim(&claim.id, &admin(), None),
        Err(DirectoryError::InvalidState(InvalidTransition::ClaimAlreadyDecided(_)))
    ));
}

#[test]
fn only_one_actionable_claim_per_user() {
    let (_, services) = build_services();
    let (_, restaurant) = approved_submission(&services);

    services
        .moderation
        .file_claim(&restaurant.id, &other_member(), evidence())
        .expect("claim filed");
    assert!(matches!(
        services
            .moderation
            .file_claim(&restaurant.id, &other_member(), evidence()),
        Err(DirectoryError::InvalidState(InvalidTransition::ClaimAlreadyOpen))
    ));
    services
        .moderation
        .file_claim(&restaurant.id, &member(), evidence())
        .expect("a different user may also claim");
}

#[test]
fn claim_info_requests_loop_back_to_pending() {
    let (_, services) = build_services();
    let (_, restaurant) = approved_submission(&services);
    let claim = services
        .moderation
        .file_claim(&restaurant.id, &other_member(), evidence())
        .expect("claim filed");

    let waiting = services
        .moderation
        .request_claim_info(&claim.id, &admin(), Some("send a utility bill".to_string()))
        .expect("info requested");
    assert_eq!(waiting.status, ClaimStatus::NeedsMoreInfo);
    assert!(matches!(
        services.moderation.approve_claim(&claim.id, &admin()),
        Err(DirectoryError::InvalidState(InvalidTransition::ClaimNotPending(_)))
    ));
    assert!(matches!(
        services
            .moderation
            .resubmit_claim(&claim.id, &member(), evidence()),
        Err(DirectoryError::NotFound)
    ));

    let resubmitted = services
        .moderation
        .resubmit_claim(&claim.id, &other_member(), evidence())
        .expect("claimant resubmits");
    assert_eq!(resubmitted.status, ClaimStatus::Pending);
    services
        .moderation
        .approve_claim(&claim.id, &admin())
        .expect("approval after resubmission");
}

#[test]
fn claims_on_inactive_or_owned_restaurants_are_refused() {
    let (_, services) = build_services();
    let (submission, restaurant) = approved_submission(&services);

    let first = services
        .moderation
        .file_claim(&restaurant.id, &other_member(), evidence())
        .expect("claim filed");
    let second = services
        .moderation
        .file_claim(&restaurant.id, &admin(), evidence())
        .expect("second claimant");
    services
        .moderation
        .approve_claim(&first.id, &admin())
        .expect("first approval");
    assert!(matches!(
        services.moderation.approve_claim(&second.id, &admin()),
        Err(DirectoryError::InvalidState(InvalidTransition::AlreadyOwned))
    ));
    assert!(matches!(
        services
            .moderation
            .file_claim(&restaurant.id, &other_member(), evidence()),
        Err(DirectoryError::InvalidState(InvalidTransition::AlreadyOwned))
    ));

    services
        .submissions
        .request_deletion(&submission.id, &member(), None)
        .expect("deletion requested");
    services
        .moderation
        .remove(&submission.id, &admin())
        .expect("removed");
    assert!(matches!(
        services
            .moderation
            .file_claim(&restaurant.id, &member(), evidence()),
        Err(DirectoryError::InvalidState(InvalidTransition::RestaurantInactive))
    ));
}

#[test]
fn claim_queue_filters_by_status() {
    let (_, services) = build_services();
    let (_, restaurant) = approved_submission(&services);
    let claim = services
        .moderation
        .file_claim(&restaurant.id, &other_member(), evidence())
        .expect("claim filed");
    services
        .moderation
        .deny_claim(&claim.id, &admin(), Some("no proof".to_string()))
        .expect("denied");

    let pending = services
        .moderation
        .claims(&admin(), ClaimStatus::Pending, 10)
        .expect("pending claims");
    let denied = services
        .moderation
        .claims(&admin(), ClaimStatus::Denied, 10)
        .expect("denied claims");
    assert!(pending.is_empty());
    assert_eq!(denied.len(), 1);
}

#[test]
fn reconcile_reports_dangling_links() {
    let (store, services) = build_services();
    let (submission, _) = approved_submission(&services);
    assert!(services
        .moderation
        .reconcile(&admin())
        .expect("report")
        .is_consistent());

    let mut broken = submission.clone();
    broken.created_restaurant_id = None;
    store
        .update_submission(broken, SubmissionPhase::Approved)
        .expect("overwrite link");

    let report = services.moderation.reconcile(&admin()).expect("report");
    assert_eq!(report.dangling_submissions, vec![submission.id]);
    assert_eq!(report.orphaned_restaurants.len(), 1);
}

#[test]
fn claims_filed_before_removal_cannot_be_approved_after_it() {
    let (store, services) = build_services();
    let (submission, restaurant) = approved_submission(&services);
    let claim = services
        .moderation
        .file_claim(&restaurant.id, &other_member(), evidence())
        .expect("claim filed while live");

    services
        .submissions
        .request_deletion(&submission.id, &member(), None)
        .expect("deletion requested");
    services
        .moderation
        .remove(&submission.id, &admin())
        .expect("removed");

    assert!(matches!(
        services.moderation.approve_claim(&claim.id, &admin()),
        Err(DirectoryError::InvalidState(InvalidTransition::RestaurantInactive))
    ));
    let stored = store
        .fetch_restaurant(&restaurant.id)
        .expect("fetch")
        .expect("restaurant kept");
    assert!(stored.owner_id.is_none());
    assert!(stored.verified_at.is_none());
    let stored_claim = store
        .fetch_claim(&claim.id)
        .expect("fetch")
        .expect("claim present");
    assert_eq!(stored_claim.status, ClaimStatus::Pending);
}

#[test]
fn stale_claim_commit_does_not_revive_a_removed_listing() {
    let (store, services) = build_services();
    let (submission, restaurant) = approved_submission(&services);
    let claim = services
        .moderation
        .file_claim(&restaurant.id, &other_member(), evidence())
        .expect("claim filed");

    // Read before the removal lands, as a concurrent claim approval would.
    let read = store
        .fetch_restaurant(&restaurant.id)
        .expect("fetch")
        .expect("restaurant present");
    let now = Utc::now();
    let owned = Restaurant {
        owner_id: Some(other_member().user_id),
        is_verified: true,
        verified_at: Some(now),
        updated_at: now,
        ..read
    };
    let approved = Claim {
        status: ClaimStatus::Approved,
        updated_at: now,
        ..claim.clone()
    };

    services
        .submissions
        .request_deletion(&submission.id, &member(), None)
        .expect("deletion requested");
    services
        .moderation
        .remove(&submission.id, &admin())
        .expect("removed");

    assert!(matches!(
        store.commit_claim_approval(approved, owned, ClaimStatus::Pending),
        Err(crate::directory::repository::RepositoryError::Stale)
    ));
    let stored = store
        .fetch_restaurant(&restaurant.id)
        .expect("fetch")
        .expect("restaurant kept");
    assert!(!stored.is_active);
    assert_eq!(stored.status, RestaurantStatus::Removed);
    assert!(stored.owner_id.is_none());
    assert_eq!(
        services
            .query
            .search(&crate::directory::query::SearchFilters::default())
            .expect("search")
            .total_count,
        0
    );
}

#[test]
fn stale_removal_commit_keeps_a_freshly_approved_owner() {
    let (store, services) = build_services();
    let (submission, restaurant) = approved_submission(&services);
    let flagged = services
        .submissions
        .request_deletion(&submission.id, &member(), Some("closed".to_string()))
        .expect("deletion requested");

    // Removal read the row before the claim approval below committed.
    let read = store
        .fetch_restaurant(&restaurant.id)
        .expect("fetch")
        .expect("restaurant present");

    let claim = services
        .moderation
        .file_claim(&restaurant.id, &other_member(), evidence())
        .expect("claim filed");
    services
        .moderation
        .approve_claim(&claim.id, &admin())
        .expect("claim approved");

    let now = Utc::now();
    let removed_row = Restaurant {
        is_active: false,
        status: RestaurantStatus::Removed,
        updated_at: now,
        ..read
    };
    let removed_submission = Submission {
        status: SubmissionStatus::Removed,
        delete_requested: false,
        delete_reason: None,
        updated_at: now,
        ..flagged
    };
    let committed = store
        .commit_removal(
            removed_submission,
            removed_row,
            SubmissionPhase::DeletionRequested,
        )
        .expect("removal commits");

    assert!(!committed.is_active);
    assert_eq!(committed.owner_id, Some(other_member().user_id));
    assert!(committed.is_verified);
    let stored = store
        .fetch_restaurant(&restaurant.id)
        .expect("fetch")
        .expect("restaurant kept");
    assert_eq!(stored, committed);
}
