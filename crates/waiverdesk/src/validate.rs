//! Form validation.
//!
//! The validator is the single point where raw [`FormInput`] becomes typed
//! [`SubmissionFields`]. It either accepts the whole form or returns a
//! [`ValidationReport`] naming every offending field; nothing downstream
//! runs on a rejected form.

use chrono::NaiveDate;
use regex::Regex;
use thiserror::Error;
use tracing::debug;

use crate::render::pdf::first_unrenderable;
use crate::render::WaiverTemplate;
use crate::submission::{initials_of, keys, ClauseInitials, FormInput, SubmissionFields};

/// Pattern a license number must match once trimmed.
const LICENSE_PATTERN: &str = r"^[A-Za-z0-9][A-Za-z0-9 -]*$";

/// A form field that can fail validation.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Field {
    /// Guest's full name.
    GuestName,
    /// Driver's license number.
    LicenseNumber,
    /// License issuing state.
    IssuingState,
    /// Street address.
    Address,
    /// Signature date.
    SignatureDate,
    /// Age confirmation checkbox.
    AgeConfirmation,
    /// Initials beside a clause.
    ClauseInitials(String),
}

impl std::fmt::Display for Field {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::GuestName => f.write_str(keys::GUEST_NAME),
            Self::LicenseNumber => f.write_str(keys::LICENSE_NUMBER),
            Self::IssuingState => f.write_str(keys::ISSUING_STATE),
            Self::Address => f.write_str(keys::ADDRESS),
            Self::SignatureDate => f.write_str(keys::SIGNATURE_DATE),
            Self::AgeConfirmation => f.write_str("age_confirmed"),
            Self::ClauseInitials(id) => write!(f, "initials[{id}]"),
        }
    }
}

/// One rejected field and why.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    /// The offending field.
    pub field: Field,
    /// Message suitable for showing next to the field.
    pub message: String,
}

/// Every problem found in a rejected form.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("form is incomplete: {}", self.summary())]
pub struct ValidationReport {
    /// Field errors in form order.
    pub errors: Vec<FieldError>,
}

impl ValidationReport {
    /// Whether the given field was rejected.
    #[must_use]
    pub fn has_error(&self, field: &Field) -> bool {
        self.errors.iter().any(|e| &e.field == field)
    }

    /// Comma separated list of the offending field names.
    #[must_use]
    pub fn summary(&self) -> String {
        self.errors
            .iter()
            .map(|e| e.field.to_string())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// Validates forms against a waiver template's clauses.
#[derive(Debug, Clone)]
pub struct Validator {
    clause_ids: Vec<String>,
    license_pattern: Regex,
}

impl Validator {
    /// Create a validator for the clauses of `template`.
    #[must_use]
    pub fn for_template(template: &WaiverTemplate) -> Self {
        Self::new(template.clauses.iter().map(|c| c.id.clone()).collect())
    }

    /// Create a validator for the given clause ids.
    ///
    /// # Panics
    ///
    /// Panics only if [`LICENSE_PATTERN`] stops compiling.
    #[must_use]
    pub fn new(clause_ids: Vec<String>) -> Self {
        Self {
            clause_ids,
            license_pattern: Regex::new(LICENSE_PATTERN).expect("license pattern compiles"),
        }
    }

    /// Validate and normalize a form.
    ///
    /// # Errors
    ///
    /// Returns a [`ValidationReport`] listing every missing or malformed
    /// field when the form cannot be accepted.
    pub fn validate(&self, form: &FormInput) -> Result<SubmissionFields, ValidationReport> {
        let mut errors = Vec::new();

        let guest_name = required(form, keys::GUEST_NAME, Field::GuestName, &mut errors)
            .and_then(|s| printable(s, Field::GuestName, &mut errors));
        let license_number =
            required(form, keys::LICENSE_NUMBER, Field::LicenseNumber, &mut errors);
        let issuing_state =
            required(form, keys::ISSUING_STATE, Field::IssuingState, &mut errors)
                .and_then(|s| printable(s, Field::IssuingState, &mut errors))
                .map(|s| s.to_uppercase());
        let address = required(form, keys::ADDRESS, Field::Address, &mut errors)
            .and_then(|s| printable(s, Field::Address, &mut errors));
        let signature_date = required(
            form,
            keys::SIGNATURE_DATE,
            Field::SignatureDate,
            &mut errors,
        )
        .and_then(|raw| match NaiveDate::parse_from_str(&raw, "%Y-%m-%d") {
            Ok(date) => Some(date),
            Err(_) => {
                errors.push(FieldError {
                    field: Field::SignatureDate,
                    message: format!("'{raw}' is not a date in YYYY-MM-DD form"),
                });
                None
            }
        });

        if let Some(license) = &license_number {
            if !self.license_pattern.is_match(license) {
                errors.push(FieldError {
                    field: Field::LicenseNumber,
                    message: "may only contain letters, digits, spaces and dashes".to_string(),
                });
            }
        }

        if !form.age_confirmed {
            errors.push(FieldError {
                field: Field::AgeConfirmation,
                message: "you must confirm you are at least 18 years old".to_string(),
            });
        }

        let default_initials = guest_name.as_deref().map(initials_of);
        let mut clause_initials = Vec::with_capacity(self.clause_ids.len());
        for clause_id in &self.clause_ids {
            match form.initials.get(clause_id) {
                Some(raw) if raw.trim().is_empty() => errors.push(FieldError {
                    field: Field::ClauseInitials(clause_id.clone()),
                    message: "initials are required".to_string(),
                }),
                Some(raw) => {
                    let field = Field::ClauseInitials(clause_id.clone());
                    let entered = raw.trim().to_string();
                    if let Some(initials) = printable(entered, field, &mut errors) {
                        clause_initials.push(ClauseInitials {
                            clause_id: clause_id.clone(),
                            initials,
                        });
                    }
                }
                None => {
                    if let Some(initials) = &default_initials {
                        clause_initials.push(ClauseInitials {
                            clause_id: clause_id.clone(),
                            initials: initials.clone(),
                        });
                    }
                }
            }
        }

        match (guest_name, license_number, issuing_state, address, signature_date) {
            (
                Some(guest_name),
                Some(license_number),
                Some(issuing_state),
                Some(address),
                Some(signature_date),
            ) if errors.is_empty() => {
                Ok(SubmissionFields {
                    guest_name,
                    license_number,
                    issuing_state,
                    address,
                    signature_date,
                    clause_initials,
                })
            }
            _ => {
                let report = ValidationReport { errors };
                debug!(fields = %report.summary(), "Form rejected");
                Err(report)
            }
        }
    }
}

/// Fetch a trimmed, non-empty field or record an error for it.
fn required(
    form: &FormInput,
    key: &str,
    field: Field,
    errors: &mut Vec<FieldError>,
) -> Option<String> {
    match form.field(key).map(str::trim) {
        Some(value) if !value.is_empty() => Some(value.to_string()),
        _ => {
            errors.push(FieldError {
                field,
                message: "this field is required".to_string(),
            });
            None
        }
    }
}

/// Keep `value` only if every character can be printed on the waiver.
fn printable(value: String, field: Field, errors: &mut Vec<FieldError>) -> Option<String> {
    match first_unrenderable(&value) {
        None => Some(value),
        Some(c) => {
            errors.push(FieldError {
                field,
                message: format!("'{c}' cannot be printed on the waiver"),
            });
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn validator() -> Validator {
        Validator::new(vec!["risk".to_string(), "release".to_string()])
    }

    fn complete_form() -> FormInput {
        FormInput::new()
            .with_field(keys::GUEST_NAME, " Jane Doe ")
            .with_field(keys::LICENSE_NUMBER, "X123")
            .with_field(keys::ISSUING_STATE, "ca")
            .with_field(keys::ADDRESS, "1 Main St")
            .with_field(keys::SIGNATURE_DATE, "2026-10-19")
            .with_age_confirmed(true)
    }

    #[test]
    fn test_complete_form_is_normalized() {
        let fields = validator().validate(&complete_form()).unwrap();

        assert_eq!(fields.guest_name, "Jane Doe");
        assert_eq!(fields.issuing_state, "CA");
        assert_eq!(
            fields.signature_date,
            NaiveDate::from_ymd_opt(2026, 10, 19).unwrap()
        );
    }

    #[test]
    fn test_missing_initials_default_to_guest_initials() {
        let form = complete_form().with_initials("release", "jd ");
        let fields = validator().validate(&form).unwrap();

        assert_eq!(fields.clause_initials.len(), 2);
        assert_eq!(fields.clause_initials[0].clause_id, "risk");
        assert_eq!(fields.clause_initials[0].initials, "JD");
        assert_eq!(fields.clause_initials[1].initials, "jd");
    }

    #[test]
    fn test_entered_initials_keep_their_case() {
        let form = complete_form()
            .with_initials("risk", " jD ")
            .with_initials("release", "McK");
        let fields = validator().validate(&form).unwrap();

        assert_eq!(fields.clause_initials[0].initials, "jD");
        assert_eq!(fields.clause_initials[1].initials, "McK");
    }

    #[test]
    fn test_unprintable_characters_rejected() {
        let form = complete_form()
            .with_field(keys::GUEST_NAME, "Łukasz Kowalski")
            .with_field(keys::ADDRESS, "1 Main St 🏠")
            .with_initials("risk", "漢");
        let report = validator().validate(&form).unwrap_err();

        assert!(report.has_error(&Field::GuestName));
        assert!(report.has_error(&Field::Address));
        assert!(report.has_error(&Field::ClauseInitials("risk".to_string())));
        assert_eq!(report.errors.len(), 3);
        assert!(report.errors[0].message.contains('Ł'));
    }

    #[test]
    fn test_latin_names_accepted() {
        let form = complete_form()
            .with_field(keys::GUEST_NAME, "Zoë O’Neil")
            .with_initials("risk", "ZÖ");
        let fields = validator().validate(&form).unwrap();

        assert_eq!(fields.guest_name, "Zoë O’Neil");
        assert_eq!(fields.clause_initials[0].initials, "ZÖ");
    }

    #[test]
    fn test_blank_initials_rejected() {
        let form = complete_form().with_initials("risk", "  ");
        let report = validator().validate(&form).unwrap_err();

        assert!(report.has_error(&Field::ClauseInitials("risk".to_string())));
        assert_eq!(report.errors.len(), 1);
    }

    #[test]
    fn test_every_missing_field_reported() {
        let report = validator().validate(&FormInput::new()).unwrap_err();

        for field in [
            Field::GuestName,
            Field::LicenseNumber,
            Field::IssuingState,
            Field::Address,
            Field::SignatureDate,
            Field::AgeConfirmation,
        ] {
            assert!(report.has_error(&field), "expected error for {field}");
        }
    }

    #[test]
    fn test_each_single_missing_field_rejects() {
        for key in [
            keys::GUEST_NAME,
            keys::LICENSE_NUMBER,
            keys::ISSUING_STATE,
            keys::ADDRESS,
            keys::SIGNATURE_DATE,
        ] {
            let mut form = complete_form();
            form.fields.insert(key.to_string(), "   ".to_string());
            let report = validator().validate(&form).unwrap_err();
            assert_eq!(report.errors.len(), 1, "only {key} should be flagged");
            assert_eq!(report.errors[0].field.to_string(), key);
        }
    }

    #[test]
    fn test_age_confirmation_required() {
        let form = complete_form().with_age_confirmed(false);
        let report = validator().validate(&form).unwrap_err();
        assert!(report.has_error(&Field::AgeConfirmation));
    }

    #[test]
    fn test_bad_date_rejected() {
        let form = complete_form().with_field(keys::SIGNATURE_DATE, "10/19/2026");
        let report = validator().validate(&form).unwrap_err();

        assert!(report.has_error(&Field::SignatureDate));
        assert!(report.errors[0].message.contains("YYYY-MM-DD"));
    }

    #[test]
    fn test_bad_license_rejected() {
        let form = complete_form().with_field(keys::LICENSE_NUMBER, "X12;DROP");
        let report = validator().validate(&form).unwrap_err();
        assert!(report.has_error(&Field::LicenseNumber));
    }

    #[test]
    fn test_report_display() {
        let report = validator().validate(&FormInput::new()).unwrap_err();
        let msg = report.to_string();
        assert!(msg.starts_with("form is incomplete:"));
        assert!(msg.contains("guest_name"));
        assert!(msg.contains("age_confirmed"));
    }

    #[test]
    fn test_for_template_uses_clause_ids() {
        let template = WaiverTemplate::default();
        let fields = Validator::for_template(&template)
            .validate(&complete_form())
            .unwrap();
        assert_eq!(fields.clause_initials.len(), template.clauses.len());
    }
}
