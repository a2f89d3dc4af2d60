//! Core submission types for waiverdesk.
//!
//! A guest's form moves through three shapes:
//!
//! - [`FormInput`]: raw key/value strings as collected from the form.
//! - [`Submission`]: the typed, normalized record created at submit time,
//!   carrying a generated form identifier.
//! - [`CompleteSubmission`]: a submission plus the address of its uploaded
//!   waiver document. Only this shape is accepted by the record store and
//!   the notifier.

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Form keys recognised by the validator.
pub mod keys {
    /// Guest's full name.
    pub const GUEST_NAME: &str = "guest_name";
    /// Driver's license number.
    pub const LICENSE_NUMBER: &str = "license_number";
    /// State that issued the license.
    pub const ISSUING_STATE: &str = "issuing_state";
    /// Street address.
    pub const ADDRESS: &str = "address";
    /// Date the waiver was signed, `YYYY-MM-DD`.
    pub const SIGNATURE_DATE: &str = "signature_date";
}

/// Raw form values exactly as collected.
///
/// Nothing here is trusted; [`crate::validate::Validator`] turns it into
/// [`SubmissionFields`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormInput {
    /// Field values keyed by the names in [`keys`].
    #[serde(default)]
    pub fields: BTreeMap<String, String>,
    /// Whether the guest ticked the age confirmation box.
    #[serde(default)]
    pub age_confirmed: bool,
    /// Initials entered next to individual clauses, keyed by clause id.
    #[serde(default)]
    pub initials: BTreeMap<String, String>,
}

impl FormInput {
    /// Create an empty form.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a field value, builder style.
    #[must_use]
    pub fn with_field(mut self, key: &str, value: impl Into<String>) -> Self {
        self.fields.insert(key.to_string(), value.into());
        self
    }

    /// Set the initials for one clause, builder style.
    #[must_use]
    pub fn with_initials(mut self, clause_id: &str, initials: impl Into<String>) -> Self {
        self.initials.insert(clause_id.to_string(), initials.into());
        self
    }

    /// Set the age confirmation flag, builder style.
    #[must_use]
    pub fn with_age_confirmed(mut self, confirmed: bool) -> Self {
        self.age_confirmed = confirmed;
        self
    }

    /// Look up a field value.
    #[must_use]
    pub fn field(&self, key: &str) -> Option<&str> {
        self.fields.get(key).map(String::as_str)
    }
}

/// Initials a guest placed beside one clause.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClauseInitials {
    /// Identifier of the clause in the waiver template.
    pub clause_id: String,
    /// The initials as entered, trimmed but never re-cased.
    pub initials: String,
}

/// Validated, normalized form values.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmissionFields {
    /// Guest's full name.
    pub guest_name: String,
    /// Driver's license number.
    pub license_number: String,
    /// Issuing state, upper-cased.
    pub issuing_state: String,
    /// Street address.
    pub address: String,
    /// Date the waiver was signed.
    pub signature_date: NaiveDate,
    /// Initials for every clause in template order.
    pub clause_initials: Vec<ClauseInitials>,
}

/// Identifier printed on the waiver and stored with the record.
///
/// Built from the guest's initials and a ULID, e.g. `JD-01J9Z3...`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FormId(String);

impl FormId {
    /// Generate a new identifier for the given guest name.
    #[must_use]
    pub fn generate(guest_name: &str) -> Self {
        Self(format!("{}-{}", initials_of(guest_name), ulid::Ulid::new()))
    }

    /// Wrap an existing identifier.
    #[must_use]
    pub fn from_string(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// The identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for FormId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Derive upper-case initials from a name: the first letter of each word.
///
/// Returns `"X"` when the name contains no letters at all.
#[must_use]
pub fn initials_of(name: &str) -> String {
    let initials: String = name
        .split_whitespace()
        .filter_map(|word| word.chars().find(|c| c.is_alphabetic()))
        .flat_map(char::to_uppercase)
        .collect();

    if initials.is_empty() {
        "X".to_string()
    } else {
        initials
    }
}

/// A waiver submission, created once at submit time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Submission {
    /// Generated form identifier.
    pub form_id: FormId,
    /// When the guest submitted the form.
    pub submitted_at: DateTime<Utc>,
    /// The validated form values.
    pub fields: SubmissionFields,
}

impl Submission {
    /// Create a submission with a freshly generated form id.
    #[must_use]
    pub fn create(fields: SubmissionFields, submitted_at: DateTime<Utc>) -> Self {
        Self {
            form_id: FormId::generate(&fields.guest_name),
            submitted_at,
            fields,
        }
    }

    /// Create a submission with a known form id.
    #[must_use]
    pub fn with_form_id(
        form_id: FormId,
        fields: SubmissionFields,
        submitted_at: DateTime<Utc>,
    ) -> Self {
        Self {
            form_id,
            submitted_at,
            fields,
        }
    }

    /// The guest's initials, derived from their name.
    #[must_use]
    pub fn guest_initials(&self) -> String {
        initials_of(&self.fields.guest_name)
    }

    /// Attach the address of the uploaded waiver document.
    #[must_use]
    pub fn complete(self, artifact_url: impl Into<String>) -> CompleteSubmission {
        CompleteSubmission {
            submission: self,
            artifact_url: artifact_url.into(),
        }
    }
}

/// A submission whose waiver document has a resolvable address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompleteSubmission {
    /// The submission.
    pub submission: Submission,
    /// Public URL of the uploaded waiver PDF.
    pub artifact_url: String,
}

impl CompleteSubmission {
    /// Shortcut to the validated form values.
    #[must_use]
    pub fn fields(&self) -> &SubmissionFields {
        &self.submission.fields
    }

    /// Shortcut to the form id.
    #[must_use]
    pub fn form_id(&self) -> &FormId {
        &self.submission.form_id
    }
}
