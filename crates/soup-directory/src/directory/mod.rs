//! Restaurant directory: submission intake, moderation, claims and launch-city search.
//!
//! Services are generic over the [`ListingStore`] and [`DirectoryReader`] seams so the HTTP
//! layer and tests can share the in-memory store.

pub mod counts;
pub mod domain;
pub mod error;
pub mod import;
pub mod lifecycle;
pub mod memory;
pub mod moderation;
pub mod predicate;
pub mod query;
pub mod repository;
pub mod router;
pub mod slug;
pub mod soup_types;
pub mod submissions;
pub mod validation;

#[cfg(test)]
mod tests;

pub use counts::{CityCount, CountsReporter, SoupTypeCounts};
pub use domain::{
    Actor, ActorRole, Claim, ClaimEvidence, ClaimId, ClaimStatus, LaunchCities, LaunchCity,
    Restaurant, RestaurantId, RestaurantListing, RestaurantStatus, Soup, SoupId, Submission,
    SubmissionId, SubmissionPatch, SubmissionPayload, SubmissionStatus, UserId,
};
pub use error::{AuthorizationError, DirectoryError};
pub use import::{ImportError, ImportSummary, SeedImporter};
pub use lifecycle::{InvalidTransition, SubmissionPhase};
pub use memory::MemoryDirectoryStore;
pub use moderation::{
    ApprovalOutcome, ClaimApproval, ModerationService, ReconciliationReport, RemovalOutcome,
};
pub use predicate::{SortField, SortOrder, SortSpec};
pub use query::{DirectoryQueryEngine, SearchFilters, SearchResult};
pub use repository::{DirectoryReader, ListingStore, RepositoryError, SoupRestriction};
pub use router::{directory_router, DirectoryServices};
pub use submissions::SubmissionService;
pub use validation::ValidationError;
