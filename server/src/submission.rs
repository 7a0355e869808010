use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::errors::BackendError;

/// The literal category that activates a free-text override.
pub const OTHER: &str = "Other";

/// The maximum number of values a respondent may select.
pub const MAX_VALUES: usize = 3;

pub const DISTRICTS: &[&str] = &["Brunei-Muara", "Belait", "Tutong", "Temburong"];

pub const OCCUPATION_STATUSES: &[&str] =
    &["Student", "Working", "Unemployed", "Entrepreneur", "Other"];

pub const SECTORS: &[&str] = &[
    "Creative Arts",
    "STEM",
    "Business",
    "Education",
    "Public Sector",
    "Other",
];

pub const VALUES_OPTIONS: &[&str] = &[
    "Growth",
    "Belonging",
    "Stability",
    "Creativity",
    "Family",
    "Adventure",
    "Peace",
    "Success",
];

pub const OBSTACLES_OPTIONS: &[&str] = &[
    "I'm not sure where to start",
    "I'm afraid of failing",
    "I don't have transport or internet",
    "I struggle with mental health",
    "I'm expected to focus on other responsibilities",
    "I don't see enough opportunities around me",
    "I don't feel heard or included",
    "Other",
];

/// A single submission in the database.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct Submission {
    /// The ID of the submission.
    pub id: Uuid,

    /// The contact address. Used only by the confirmation mailer and
    /// never included in API responses.
    #[serde(skip_serializing)]
    pub email: Option<String>,

    /// The age provided.
    pub age: i32,

    /// The district provided (one of [`DISTRICTS`]).
    pub district: String,

    /// The occupation status provided.
    pub occupation_status: String,

    /// The free-text occupation, required when the status is "Other".
    pub other_occupation: Option<String>,

    /// The sector of interest provided.
    pub sector_interest: String,

    /// The free-text sector, required when the sector is "Other".
    pub other_sector: Option<String>,

    /// The values selected (at most [`MAX_VALUES`] at submission time).
    pub values: Vec<String>,

    /// The free-text value, if any.
    pub other_value: Option<String>,

    /// The obstacles selected.
    pub obstacles: Vec<String>,

    /// The free-text obstacle, required when "Other" is selected.
    pub other_obstacle: Option<String>,

    /// The open-text reflection.
    pub question1: String,

    /// The AI-highlighted variant of the reflection, if generated.
    pub question1_highlighted: Option<String>,

    /// Whether the respondent asked to keep the reflection private.
    /// Set once at submission and never mutated afterwards.
    pub is_private: bool,

    /// Whether an operator marked the submission for promotional display.
    pub is_featured: bool,

    /// The server-assigned creation time. Immutable once set. Stored
    /// records written outside the form flow may lack it.
    #[serde(default, with = "time::serde::timestamp::option")]
    pub submitted_at: Option<OffsetDateTime>,

    /// The time the featured flag was last changed.
    #[serde(default, with = "time::serde::timestamp::option")]
    pub featured_updated_at: Option<OffsetDateTime>,

    /// The time the highlighted text was last changed.
    #[serde(default, with = "time::serde::timestamp::option")]
    pub question1_highlighted_updated_at: Option<OffsetDateTime>,
}

impl Submission {
    /// Returns the occupation to display, replacing the literal "Other"
    /// with the free-text override when one is present.
    pub fn folded_occupation(&self) -> &str {
        fold(&self.occupation_status, self.other_occupation.as_deref())
    }

    /// Returns the sector to display, replacing the literal "Other" with
    /// the free-text override when one is present.
    pub fn folded_sector(&self) -> &str {
        fold(&self.sector_interest, self.other_sector.as_deref())
    }
}

fn fold<'a>(category: &'a str, other: Option<&'a str>) -> &'a str {
    match other {
        Some(o) if category == OTHER && !o.trim().is_empty() => o,
        _ => category,
    }
}

/// A submission as accepted at the API boundary, before the store
/// assigns an ID and creation time. All fields are enumerated here;
/// unknown shapes are rejected before any write.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct NewSubmission {
    pub email: String,
    pub age: i32,
    pub district: String,
    pub occupation_status: String,
    #[serde(default)]
    pub other_occupation: Option<String>,
    pub sector_interest: String,
    #[serde(default)]
    pub other_sector: Option<String>,
    #[serde(default)]
    pub values: Vec<String>,
    #[serde(default)]
    pub other_value: Option<String>,
    #[serde(default)]
    pub obstacles: Vec<String>,
    #[serde(default)]
    pub other_obstacle: Option<String>,
    pub question1: String,
    #[serde(default)]
    pub is_private: bool,
}

impl NewSubmission {
    /// Validates the record against the form rules. Called by the form
    /// flow on completion and again at the HTTP boundary.
    pub fn validate(&self) -> Result<(), BackendError> {
        use BackendError::MalformedSubmission;

        if self.question1.trim().is_empty() {
            return Err(MalformedSubmission("empty reflection".into()));
        }

        if self.obstacles.is_empty() {
            return Err(MalformedSubmission("no obstacles selected".into()));
        }

        if requires_override(&self.obstacles, self.other_obstacle.as_deref()) {
            return Err(MalformedSubmission(
                "obstacle \"Other\" selected without free text".into(),
            ));
        }

        if self.values.is_empty() {
            return Err(MalformedSubmission("no values selected".into()));
        }

        if self.values.len() > MAX_VALUES {
            return Err(MalformedSubmission(format!(
                "more than {} values selected",
                MAX_VALUES
            )));
        }

        if self.email.trim().is_empty() {
            return Err(MalformedSubmission("empty email".into()));
        }

        if self.age <= 0 {
            return Err(MalformedSubmission(format!("invalid age: {}", self.age)));
        }

        if !DISTRICTS.contains(&self.district.as_str()) {
            return Err(MalformedSubmission(format!(
                "unknown district: {}",
                self.district
            )));
        }

        if !OCCUPATION_STATUSES.contains(&self.occupation_status.as_str()) {
            return Err(MalformedSubmission(format!(
                "unknown occupation status: {}",
                self.occupation_status
            )));
        }

        if self.occupation_status == OTHER && is_blank(self.other_occupation.as_deref()) {
            return Err(MalformedSubmission(
                "occupation \"Other\" selected without free text".into(),
            ));
        }

        if !SECTORS.contains(&self.sector_interest.as_str()) {
            return Err(MalformedSubmission(format!(
                "unknown sector: {}",
                self.sector_interest
            )));
        }

        if self.sector_interest == OTHER && is_blank(self.other_sector.as_deref()) {
            return Err(MalformedSubmission(
                "sector \"Other\" selected without free text".into(),
            ));
        }

        Ok(())
    }
}

fn requires_override(selected: &[String], other: Option<&str>) -> bool {
    selected.iter().any(|o| o == OTHER) && is_blank(other)
}

fn is_blank(text: Option<&str>) -> bool {
    text.map(|t| t.trim().is_empty()).unwrap_or(true)
}
