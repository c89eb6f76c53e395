use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;

use super::validation::normalize_state;

macro_rules! uuid_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub Uuid);

        impl $name {
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                self.0.fmt(f)
            }
        }
    };
}

uuid_id!(
    /// Identifier for a user-proposed restaurant.
    SubmissionId
);
uuid_id!(
    /// Identifier for a published restaurant row.
    RestaurantId
);
uuid_id!(ClaimId);
uuid_id!(SoupId);

/// Subject identifier issued by the upstream identity provider.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub String);

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActorRole {
    Member,
    Admin,
}

/// Authenticated caller of a directory operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Actor {
    pub user_id: UserId,
    pub role: ActorRole,
}

impl Actor {
    pub fn member(user_id: impl Into<String>) -> Self {
        Self {
            user_id: UserId(user_id.into()),
            role: ActorRole::Member,
        }
    }

    pub fn admin(user_id: impl Into<String>) -> Self {
        Self {
            user_id: UserId(user_id.into()),
            role: ActorRole::Admin,
        }
    }

    pub fn is_admin(&self) -> bool {
        self.role == ActorRole::Admin
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubmissionStatus {
    Pending,
    Approved,
    Rejected,
    Removed,
}

impl SubmissionStatus {
    pub const fn label(self) -> &'static str {
        match self {
            SubmissionStatus::Pending => "pending",
            SubmissionStatus::Approved => "approved",
            SubmissionStatus::Rejected => "rejected",
            SubmissionStatus::Removed => "removed",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "pending" => Some(Self::Pending),
            "approved" => Some(Self::Approved),
            "rejected" => Some(Self::Rejected),
            "removed" => Some(Self::Removed),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RestaurantStatus {
    Draft,
    Live,
    Removed,
    Suspended,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClaimStatus {
    Pending,
    Approved,
    Denied,
    NeedsMoreInfo,
}

impl ClaimStatus {
    pub const fn label(self) -> &'static str {
        match self {
            ClaimStatus::Pending => "pending",
            ClaimStatus::Approved => "approved",
            ClaimStatus::Denied => "denied",
            ClaimStatus::NeedsMoreInfo => "needs_more_info",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "pending" => Some(Self::Pending),
            "approved" => Some(Self::Approved),
            "denied" => Some(Self::Denied),
            "needs_more_info" => Some(Self::NeedsMoreInfo),
            _ => None,
        }
    }

    /// Whether the claim still awaits a decision or evidence from the claimant.
    pub const fn is_actionable(self) -> bool {
        matches!(self, ClaimStatus::Pending | ClaimStatus::NeedsMoreInfo)
    }
}

/// Restaurant identity fields captured on a submission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RestaurantDetails {
    pub name: String,
    pub address: String,
    pub city: String,
    pub state: String,
    pub zip: Option<String>,
    pub phone: Option<String>,
    pub website: Option<String>,
    pub cuisine: Option<String>,
    pub soup_tags: Vec<String>,
}

/// Person to follow up with about a submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactDetails {
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
}

/// Who reviewed a record, when, and why.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewStamp {
    pub reviewer_id: UserId,
    pub reviewed_at: DateTime<Utc>,
    pub notes: Option<String>,
}

/// Inbound body for `POST /submissions`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SubmissionPayload {
    pub restaurant_name: String,
    pub address: String,
    pub city: String,
    pub state: String,
    pub zip: Option<String>,
    pub phone: Option<String>,
    pub website: Option<String>,
    pub cuisine: Option<String>,
    pub soup_tags: Vec<String>,
    pub contact_name: String,
    pub contact_email: String,
    pub contact_phone: Option<String>,
    pub is_restaurant_owner: bool,
}

/// Partial update; absent keys keep their stored value. Optional fields sent as `null`
/// are cleared (`Some(None)`).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SubmissionPatch {
    pub restaurant_name: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    #[serde(deserialize_with = "present_or_null", skip_serializing_if = "Option::is_none")]
    pub zip: Option<Option<String>>,
    #[serde(deserialize_with = "present_or_null", skip_serializing_if = "Option::is_none")]
    pub phone: Option<Option<String>>,
    #[serde(deserialize_with = "present_or_null", skip_serializing_if = "Option::is_none")]
    pub website: Option<Option<String>>,
    #[serde(deserialize_with = "present_or_null", skip_serializing_if = "Option::is_none")]
    pub cuisine: Option<Option<String>>,
    pub soup_tags: Option<Vec<String>>,
    pub contact_name: Option<String>,
    pub contact_email: Option<String>,
    #[serde(deserialize_with = "present_or_null", skip_serializing_if = "Option::is_none")]
    pub contact_phone: Option<Option<String>>,
    pub is_restaurant_owner: Option<bool>,
}

/// Only runs for keys present in the body, so `null` becomes `Some(None)`.
fn present_or_null<'de, D>(deserializer: D) -> Result<Option<Option<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<String>::deserialize(deserializer).map(Some)
}

impl SubmissionPatch {
    /// Flattens a stored submission back into payload form with the patch applied.
    pub fn merge_into(self, submission: &Submission) -> SubmissionPayload {
        let current = &submission.restaurant;
        SubmissionPayload {
            restaurant_name: self.restaurant_name.unwrap_or_else(|| current.name.clone()),
            address: self.address.unwrap_or_else(|| current.address.clone()),
            city: self.city.unwrap_or_else(|| current.city.clone()),
            state: self.state.unwrap_or_else(|| current.state.clone()),
            zip: self.zip.unwrap_or_else(|| current.zip.clone()),
            phone: self.phone.unwrap_or_else(|| current.phone.clone()),
            website: self.website.unwrap_or_else(|| current.website.clone()),
            cuisine: self.cuisine.unwrap_or_else(|| current.cuisine.clone()),
            soup_tags: self.soup_tags.unwrap_or_else(|| current.soup_tags.clone()),
            contact_name: self
                .contact_name
                .unwrap_or_else(|| submission.contact.name.clone()),
            contact_email: self
                .contact_email
                .unwrap_or_else(|| submission.contact.email.clone()),
            contact_phone: self
                .contact_phone
                .unwrap_or_else(|| submission.contact.phone.clone()),
            is_restaurant_owner: self
                .is_restaurant_owner
                .unwrap_or(submission.is_restaurant_owner),
        }
    }
}

/// A user-proposed restaurant moving through moderation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Submission {
    pub id: SubmissionId,
    pub submitted_by: UserId,
    pub restaurant: RestaurantDetails,
    pub contact: ContactDetails,
    pub is_restaurant_owner: bool,
    pub status: SubmissionStatus,
    pub delete_requested: bool,
    pub delete_reason: Option<String>,
    pub created_restaurant_id: Option<RestaurantId>,
    pub review: Option<ReviewStamp>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Submission {
    pub fn is_owned_by(&self, user_id: &UserId) -> bool {
        &self.submitted_by == user_id
    }
}

/// Published directory row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Restaurant {
    pub id: RestaurantId,
    pub slug: String,
    pub name: String,
    pub address: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub zip: Option<String>,
    pub phone: Option<String>,
    pub website: Option<String>,
    pub cuisine: Option<String>,
    pub rating: Option<f32>,
    pub review_count: u32,
    pub price_range: Option<String>,
    pub is_featured: bool,
    pub owner_id: Option<UserId>,
    pub owner_org_id: Option<String>,
    pub is_verified: bool,
    pub verified_at: Option<DateTime<Utc>>,
    pub is_active: bool,
    pub status: RestaurantStatus,
    pub source_submission_id: Option<SubmissionId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Restaurant {
    /// Only live, active rows are visible to directory reads.
    pub fn is_published(&self) -> bool {
        self.is_active && self.status == RestaurantStatus::Live
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Soup {
    pub id: SoupId,
    pub restaurant_id: RestaurantId,
    pub soup_type: String,
    pub name: String,
    pub description: Option<String>,
    pub price_cents: Option<u32>,
    pub dietary_tags: Vec<String>,
}

/// A restaurant joined with its soups, as returned by directory reads.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RestaurantListing {
    #[serde(flatten)]
    pub restaurant: Restaurant,
    pub soups: Vec<Soup>,
}

/// Contact snapshot a claimant provides as proof of ownership.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClaimEvidence {
    pub contact_name: String,
    pub contact_email: String,
    pub contact_phone: Option<String>,
    pub role: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claim {
    pub id: ClaimId,
    pub restaurant_id: RestaurantId,
    pub user_id: UserId,
    pub status: ClaimStatus,
    pub evidence: ClaimEvidence,
    pub review: Option<ReviewStamp>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// One allow-listed `(city, state)` pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LaunchCity {
    pub city: String,
    pub state: String,
}

impl LaunchCity {
    /// Returns `None` when the city is blank or the state is not a recognizable US state.
    pub fn new(city: &str, state: &str) -> Option<Self> {
        let city = city.trim();
        if city.is_empty() {
            return None;
        }
        let state = normalize_state(state)?;
        Some(Self {
            city: city.to_string(),
            state,
        })
    }

    pub fn matches(&self, city: &str, state: &str) -> bool {
        self.matches_city(city) && self.matches_state(state)
    }

    pub fn matches_city(&self, city: &str) -> bool {
        self.city.eq_ignore_ascii_case(city.trim())
    }

    pub fn matches_state(&self, state: &str) -> bool {
        normalize_state(state).is_some_and(|code| code == self.state)
    }
}

/// The hard visibility boundary for every directory read.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LaunchCities(Vec<LaunchCity>);

impl LaunchCities {
    pub fn new(cities: Vec<LaunchCity>) -> Self {
        let mut unique: Vec<LaunchCity> = Vec::with_capacity(cities.len());
        for city in cities {
            if !unique
                .iter()
                .any(|existing| existing.matches(&city.city, &city.state))
            {
                unique.push(city);
            }
        }
        Self(unique)
    }

    pub fn iter(&self) -> impl Iterator<Item = &LaunchCity> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn contains(&self, city: &str, state: &str) -> bool {
        self.0.iter().any(|launch| launch.matches(city, state))
    }

    pub fn contains_city(&self, city: &str) -> bool {
        self.0.iter().any(|launch| launch.matches_city(city))
    }

    pub fn contains_state(&self, state: &str) -> bool {
        self.0.iter().any(|launch| launch.matches_state(state))
    }

    /// Restaurants missing either half of their location never qualify.
    pub fn covers(&self, restaurant: &Restaurant) -> bool {
        match (restaurant.city.as_deref(), restaurant.state.as_deref()) {
            (Some(city), Some(state)) => self.contains(city, state),
            _ => false,
        }
    }
}
