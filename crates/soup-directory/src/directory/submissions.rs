use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info};

use super::domain::{
    Actor, Submission, SubmissionId, SubmissionPatch, SubmissionPayload, SubmissionStatus,
};
use super::error::DirectoryError;
use super::lifecycle::{next_submission_phase, SubmissionAction, SubmissionPhase};
use super::repository::{ListingStore, RepositoryError};
use super::validation::validate_submission;

/// Submitter-facing CRUD over restaurant submissions.
pub struct SubmissionService<S> {
    store: Arc<S>,
}

impl<S> SubmissionService<S>
where
    S: ListingStore + 'static,
{
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    pub fn create(
        &self,
        payload: SubmissionPayload,
        submitter: &Actor,
    ) -> Result<Submission, DirectoryError> {
        let (restaurant, contact, is_restaurant_owner) = validate_submission(payload)?;
        let now = Utc::now();
        let submission = Submission {
            id: SubmissionId::new(),
            submitted_by: submitter.user_id.clone(),
            restaurant,
            contact,
            is_restaurant_owner,
            status: SubmissionStatus::Pending,
            delete_requested: false,
            delete_reason: None,
            created_restaurant_id: None,
            review: None,
            created_at: now,
            updated_at: now,
        };

        let stored = self.store.insert_submission(submission)?;
        info!(
            submission_id = %stored.id,
            submitted_by = %stored.submitted_by,
            restaurant = %stored.restaurant.name,
            "submission created"
        );
        Ok(stored)
    }

    /// Visible to its submitter and to admins.
    pub fn get(&self, id: &SubmissionId, actor: &Actor) -> Result<Submission, DirectoryError> {
        let submission = self.fetch(id)?;
        if actor.is_admin() || submission.is_owned_by(&actor.user_id) {
            Ok(submission)
        } else {
            Err(DirectoryError::NotFound)
        }
    }

    pub fn list_mine(&self, actor: &Actor) -> Result<Vec<Submission>, DirectoryError> {
        Ok(self.store.submissions_by_submitter(&actor.user_id)?)
    }

    pub fn update(
        &self,
        id: &SubmissionId,
        patch: SubmissionPatch,
        actor: &Actor,
    ) -> Result<Submission, DirectoryError> {
        let current = self.owned(id, actor)?;
        let phase = SubmissionPhase::of(&current);
        next_submission_phase(phase, SubmissionAction::Edit)?;

        let (restaurant, contact, is_restaurant_owner) =
            validate_submission(patch.merge_into(&current))?;
        let updated = Submission {
            restaurant,
            contact,
            is_restaurant_owner,
            updated_at: Utc::now(),
            ..current
        };

        self.store
            .update_submission(updated.clone(), phase)
            .map_err(|error| explain_write(self.store.as_ref(), id, SubmissionAction::Edit, error))?;
        debug!(submission_id = %id, "submission updated by submitter");
        Ok(updated)
    }

    pub fn delete(&self, id: &SubmissionId, actor: &Actor) -> Result<(), DirectoryError> {
        let current = self.owned(id, actor)?;
        let phase = SubmissionPhase::of(&current);
        next_submission_phase(phase, SubmissionAction::Delete)?;

        self.store.delete_submission(id, phase).map_err(|error| {
            explain_write(self.store.as_ref(), id, SubmissionAction::Delete, error)
        })?;
        info!(submission_id = %id, "submission deleted by submitter");
        Ok(())
    }

    /// Flags an approved submission for admin removal.
    pub fn request_deletion(
        &self,
        id: &SubmissionId,
        actor: &Actor,
        reason: Option<String>,
    ) -> Result<Submission, DirectoryError> {
        let current = self.owned(id, actor)?;
        let phase = SubmissionPhase::of(&current);
        let next = next_submission_phase(phase, SubmissionAction::RequestDeletion)?;

        let updated = Submission {
            status: next.status(),
            delete_requested: next.delete_requested(),
            delete_reason: reason
                .map(|reason| reason.trim().to_string())
                .filter(|reason| !reason.is_empty()),
            updated_at: Utc::now(),
            ..current
        };

        self.store
            .update_submission(updated.clone(), phase)
            .map_err(|error| {
                explain_write(
                    self.store.as_ref(),
                    id,
                    SubmissionAction::RequestDeletion,
                    error,
                )
            })?;
        info!(submission_id = %id, "deletion requested by submitter");
        Ok(updated)
    }

    fn fetch(&self, id: &SubmissionId) -> Result<Submission, DirectoryError> {
        self.store
            .fetch_submission(id)?
            .ok_or(DirectoryError::NotFound)
    }

    fn owned(&self, id: &SubmissionId, actor: &Actor) -> Result<Submission, DirectoryError> {
        let submission = self.fetch(id)?;
        if submission.is_owned_by(&actor.user_id) {
            Ok(submission)
        } else {
            Err(DirectoryError::NotFound)
        }
    }
}

/// Translates a failed conditional write into the transition error the caller would see now.
pub(crate) fn explain_write<S>(
    store: &S,
    id: &SubmissionId,
    action: SubmissionAction,
    error: RepositoryError,
) -> DirectoryError
where
    S: ListingStore + ?Sized,
{
    if error != RepositoryError::Stale {
        return error.into();
    }

    match store.fetch_submission(id) {
        Ok(Some(current)) => match next_submission_phase(SubmissionPhase::of(&current), action) {
            Err(transition) => DirectoryError::InvalidState(transition),
            Ok(_) => DirectoryError::Infrastructure(RepositoryError::Stale),
        },
        Ok(None) => DirectoryError::NotFound,
        Err(error) => error.into(),
    }
}
