use std::collections::BTreeSet;

use super::domain::{ClaimEvidence, ContactDetails, RestaurantDetails, SubmissionPayload};
use super::soup_types::soup_key;

/// First missing or invalid field in an inbound payload.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{field}: {reason}")]
pub struct ValidationError {
    pub field: &'static str,
    pub reason: &'static str,
}

impl ValidationError {
    fn new(field: &'static str, reason: &'static str) -> Self {
        Self { field, reason }
    }
}

const STATES: &[(&str, &str)] = &[
    ("AL", "alabama"),
    ("AK", "alaska"),
    ("AZ", "arizona"),
    ("AR", "arkansas"),
    ("CA", "california"),
    ("CO", "colorado"),
    ("CT", "connecticut"),
    ("DE", "delaware"),
    ("DC", "district of columbia"),
    ("FL", "florida"),
    ("GA", "georgia"),
    ("HI", "hawaii"),
    ("ID", "idaho"),
    ("IL", "illinois"),
    ("IN", "indiana"),
    ("IA", "iowa"),
    ("KS", "kansas"),
    ("KY", "kentucky"),
    ("LA", "louisiana"),
    ("ME", "maine"),
    ("MD", "maryland"),
    ("MA", "massachusetts"),
    ("MI", "michigan"),
    ("MN", "minnesota"),
    ("MS", "mississippi"),
    ("MO", "missouri"),
    ("MT", "montana"),
    ("NE", "nebraska"),
    ("NV", "nevada"),
    ("NH", "new hampshire"),
    ("NJ", "new jersey"),
    ("NM", "new mexico"),
    ("NY", "new york"),
    ("NC", "north carolina"),
    ("ND", "north dakota"),
    ("OH", "ohio"),
    ("OK", "oklahoma"),
    ("OR", "oregon"),
    ("PA", "pennsylvania"),
    ("RI", "rhode island"),
    ("SC", "south carolina"),
    ("SD", "south dakota"),
    ("TN", "tennessee"),
    ("TX", "texas"),
    ("UT", "utah"),
    ("VT", "vermont"),
    ("VA", "virginia"),
    ("WA", "washington"),
    ("WV", "west virginia"),
    ("WI", "wisconsin"),
    ("WY", "wyoming"),
];

/// Maps a state code or full state name to its two-letter code.
pub fn normalize_state(raw: &str) -> Option<String> {
    let collapsed = raw
        .replace('.', "")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_ascii_lowercase();
    if collapsed.is_empty() {
        return None;
    }

    STATES
        .iter()
        .find(|(code, name)| code.eq_ignore_ascii_case(&collapsed) || *name == collapsed)
        .map(|(code, _)| (*code).to_string())
}

/// Checks required fields in order and splits the payload into stored parts.
pub fn validate_submission(
    payload: SubmissionPayload,
) -> Result<(RestaurantDetails, ContactDetails, bool), ValidationError> {
    let name = required("restaurantName", &payload.restaurant_name)?;
    let address = required("address", &payload.address)?;
    let city = required("city", &payload.city)?;
    let state_raw = required("state", &payload.state)?;
    let state = normalize_state(&state_raw)
        .ok_or_else(|| ValidationError::new("state", "must be a two-letter US state code"))?;
    let contact_name = required("contactName", &payload.contact_name)?;
    let contact_email = required("contactEmail", &payload.contact_email)?;
    if !contact_email.contains('@') {
        return Err(ValidationError::new(
            "contactEmail",
            "must be a valid email address",
        ));
    }

    let restaurant = RestaurantDetails {
        name,
        address,
        city,
        state,
        zip: optional(payload.zip),
        phone: optional(payload.phone),
        website: optional(payload.website),
        cuisine: optional(payload.cuisine),
        soup_tags: clean_soup_tags(payload.soup_tags),
    };
    let contact = ContactDetails {
        name: contact_name,
        email: contact_email,
        phone: optional(payload.contact_phone),
    };

    Ok((restaurant, contact, payload.is_restaurant_owner))
}

/// Claim evidence must at least say who to contact.
pub fn validate_claim_evidence(evidence: ClaimEvidence) -> Result<ClaimEvidence, ValidationError> {
    let contact_name = required("contactName", &evidence.contact_name)?;
    let contact_email = required("contactEmail", &evidence.contact_email)?;
    if !contact_email.contains('@') {
        return Err(ValidationError::new(
            "contactEmail",
            "must be a valid email address",
        ));
    }

    Ok(ClaimEvidence {
        contact_name,
        contact_email,
        contact_phone: optional(evidence.contact_phone),
        role: optional(evidence.role),
        notes: optional(evidence.notes),
    })
}

/// Trims tags and drops blanks plus spellings that fold to an earlier tag.
pub fn clean_soup_tags(tags: Vec<String>) -> Vec<String> {
    let mut seen = BTreeSet::new();
    tags.into_iter()
        .map(|tag| tag.trim().to_string())
        .filter(|tag| {
            let key = soup_key(tag);
            !key.is_empty() && seen.insert(key)
        })
        .collect()
}

fn required(field: &'static str, value: &str) -> Result<String, ValidationError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        Err(ValidationError::new(field, "is required"))
    } else {
        Ok(trimmed.to_string())
    }
}

fn optional(value: Option<String>) -> Option<String> {
    value
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}
