//! Transition tables for submissions and ownership claims.
//!
//! Every status change in the moderation pipeline is looked up here first; services never
//! compare statuses directly.

use super::domain::{ClaimStatus, Submission, SubmissionStatus};

/// Submission status combined with the deletion-request flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmissionPhase {
    Pending,
    Approved,
    DeletionRequested,
    Rejected,
    Removed,
}

impl SubmissionPhase {
    pub fn of(submission: &Submission) -> Self {
        match (submission.status, submission.delete_requested) {
            (SubmissionStatus::Pending, _) => Self::Pending,
            (SubmissionStatus::Approved, false) => Self::Approved,
            (SubmissionStatus::Approved, true) => Self::DeletionRequested,
            (SubmissionStatus::Rejected, _) => Self::Rejected,
            (SubmissionStatus::Removed, _) => Self::Removed,
        }
    }

    pub const fn status(self) -> SubmissionStatus {
        match self {
            Self::Pending => SubmissionStatus::Pending,
            Self::Approved | Self::DeletionRequested => SubmissionStatus::Approved,
            Self::Rejected => SubmissionStatus::Rejected,
            Self::Removed => SubmissionStatus::Removed,
        }
    }

    pub const fn delete_requested(self) -> bool {
        matches!(self, Self::DeletionRequested)
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::DeletionRequested => "approved (deletion requested)",
            Self::Rejected => "rejected",
            Self::Removed => "removed",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmissionAction {
    Edit,
    Delete,
    Approve,
    Reject,
    RequestDeletion,
    Remove,
}

const SUBMISSION_TRANSITIONS: &[(SubmissionPhase, SubmissionAction, SubmissionPhase)] = &[
    (SubmissionPhase::Pending, SubmissionAction::Edit, SubmissionPhase::Pending),
    (SubmissionPhase::Pending, SubmissionAction::Delete, SubmissionPhase::Pending),
    (SubmissionPhase::Rejected, SubmissionAction::Delete, SubmissionPhase::Rejected),
    (SubmissionPhase::Pending, SubmissionAction::Approve, SubmissionPhase::Approved),
    (SubmissionPhase::Pending, SubmissionAction::Reject, SubmissionPhase::Rejected),
    (
        SubmissionPhase::Approved,
        SubmissionAction::RequestDeletion,
        SubmissionPhase::DeletionRequested,
    ),
    (
        SubmissionPhase::DeletionRequested,
        SubmissionAction::Remove,
        SubmissionPhase::Removed,
    ),
];

/// Looks up the phase reached by `action`, or explains why it is illegal from `from`.
pub fn next_submission_phase(
    from: SubmissionPhase,
    action: SubmissionAction,
) -> Result<SubmissionPhase, InvalidTransition> {
    SUBMISSION_TRANSITIONS
        .iter()
        .find(|(source, candidate, _)| *source == from && *candidate == action)
        .map(|(_, _, target)| *target)
        .ok_or_else(|| submission_rejection(from, action))
}

fn submission_rejection(from: SubmissionPhase, action: SubmissionAction) -> InvalidTransition {
    let label = from.label();
    match action {
        SubmissionAction::Edit | SubmissionAction::Delete => InvalidTransition::NotEditable(label),
        SubmissionAction::Approve | SubmissionAction::Reject => {
            InvalidTransition::AlreadyReviewed(label)
        }
        SubmissionAction::RequestDeletion if from == SubmissionPhase::DeletionRequested => {
            InvalidTransition::DeletionAlreadyRequested
        }
        SubmissionAction::RequestDeletion => InvalidTransition::NotApproved(label),
        SubmissionAction::Remove => InvalidTransition::NoDeletionRequest(label),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClaimAction {
    Approve,
    Deny,
    RequestInfo,
    Resubmit,
}

const CLAIM_TRANSITIONS: &[(ClaimStatus, ClaimAction, ClaimStatus)] = &[
    (ClaimStatus::Pending, ClaimAction::Approve, ClaimStatus::Approved),
    (ClaimStatus::Pending, ClaimAction::Deny, ClaimStatus::Denied),
    (ClaimStatus::Pending, ClaimAction::RequestInfo, ClaimStatus::NeedsMoreInfo),
    (ClaimStatus::NeedsMoreInfo, ClaimAction::Resubmit, ClaimStatus::Pending),
    (ClaimStatus::NeedsMoreInfo, ClaimAction::Deny, ClaimStatus::Denied),
];

pub fn next_claim_status(
    from: ClaimStatus,
    action: ClaimAction,
) -> Result<ClaimStatus, InvalidTransition> {
    CLAIM_TRANSITIONS
        .iter()
        .find(|(source, candidate, _)| *source == from && *candidate == action)
        .map(|(_, _, target)| *target)
        .ok_or_else(|| match (from, action) {
            (ClaimStatus::Approved | ClaimStatus::Denied, _) => {
                InvalidTransition::ClaimAlreadyDecided(from.label())
            }
            (_, ClaimAction::Resubmit) => InvalidTransition::ClaimNotAwaitingInfo(from.label()),
            _ => InvalidTransition::ClaimNotPending(from.label()),
        })
}

/// Legal input applied to a record whose current state forbids it.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InvalidTransition {
    #[error("only pending submissions can be changed by the submitter (status: {0})")]
    NotEditable(&'static str),
    #[error("submission has already been reviewed (status: {0})")]
    AlreadyReviewed(&'static str),
    #[error("only approved submissions can request deletion (status: {0})")]
    NotApproved(&'static str),
    #[error("a deletion request is already pending")]
    DeletionAlreadyRequested,
    #[error("submission has no pending deletion request (status: {0})")]
    NoDeletionRequest(&'static str),
    #[error("claim has already been decided (status: {0})")]
    ClaimAlreadyDecided(&'static str),
    #[error("claim is not pending review (status: {0})")]
    ClaimNotPending(&'static str),
    #[error("claim is not awaiting more information (status: {0})")]
    ClaimNotAwaitingInfo(&'static str),
    #[error("an ownership claim for this restaurant is already open")]
    ClaimAlreadyOpen,
    #[error("restaurant already has a verified owner")]
    AlreadyOwned,
    #[error("restaurant is not accepting claims")]
    RestaurantInactive,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn review_is_only_legal_from_pending() {
        assert_eq!(
            next_submission_phase(SubmissionPhase::Pending, SubmissionAction::Approve),
            Ok(SubmissionPhase::Approved)
        );
        assert_eq!(
            next_submission_phase(SubmissionPhase::Pending, SubmissionAction::Reject),
            Ok(SubmissionPhase::Rejected)
        );
        for from in [
            SubmissionPhase::Approved,
            SubmissionPhase::DeletionRequested,
            SubmissionPhase::Rejected,
            SubmissionPhase::Removed,
        ] {
            assert!(matches!(
                next_submission_phase(from, SubmissionAction::Approve),
                Err(InvalidTransition::AlreadyReviewed(_))
            ));
        }
    }

    #[test]
    fn removal_requires_a_deletion_request() {
        assert_eq!(
            next_submission_phase(SubmissionPhase::Approved, SubmissionAction::RequestDeletion),
            Ok(SubmissionPhase::DeletionRequested)
        );
        assert_eq!(
            next_submission_phase(
                SubmissionPhase::DeletionRequested,
                SubmissionAction::RequestDeletion
            ),
            Err(InvalidTransition::DeletionAlreadyRequested)
        );
        assert!(matches!(
            next_submission_phase(SubmissionPhase::Pending, SubmissionAction::RequestDeletion),
            Err(InvalidTransition::NotApproved("pending"))
        ));
        assert!(matches!(
            next_submission_phase(SubmissionPhase::Approved, SubmissionAction::Remove),
            Err(InvalidTransition::NoDeletionRequest(_))
        ));
        let removed =
            next_submission_phase(SubmissionPhase::DeletionRequested, SubmissionAction::Remove)
                .expect("removal allowed");
        assert_eq!(removed.status(), SubmissionStatus::Removed);
        assert!(!removed.delete_requested());
    }

    #[test]
    fn terminal_phases_accept_nothing_but_cleanup() {
        for action in [
            SubmissionAction::Edit,
            SubmissionAction::Approve,
            SubmissionAction::Reject,
            SubmissionAction::RequestDeletion,
            SubmissionAction::Remove,
        ] {
            assert!(next_submission_phase(SubmissionPhase::Removed, action).is_err());
            assert!(next_submission_phase(SubmissionPhase::Rejected, action).is_err());
        }
        assert!(next_submission_phase(SubmissionPhase::Rejected, SubmissionAction::Delete).is_ok());
        assert!(next_submission_phase(SubmissionPhase::Approved, SubmissionAction::Edit).is_err());
    }

    #[test]
    fn claims_decide_once_and_can_return_from_needs_more_info() {
        assert_eq!(
            next_claim_status(ClaimStatus::Pending, ClaimAction::RequestInfo),
            Ok(ClaimStatus::NeedsMoreInfo)
        );
        assert_eq!(
            next_claim_status(ClaimStatus::NeedsMoreInfo, ClaimAction::Resubmit),
            Ok(ClaimStatus::Pending)
        );
        assert!(matches!(
            next_claim_status(ClaimStatus::NeedsMoreInfo, ClaimAction::Approve),
            Err(InvalidTransition::ClaimNotPending(_))
        ));
        assert!(matches!(
            next_claim_status(ClaimStatus::Approved, ClaimAction::Deny),
            Err(InvalidTransition::ClaimAlreadyDecided("approved"))
        ));
        assert!(matches!(
            next_claim_status(ClaimStatus::Pending, ClaimAction::Resubmit),
            Err(InvalidTransition::ClaimNotAwaitingInfo(_))
        ));
    }
}
