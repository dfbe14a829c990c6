//! Submission validation.
//!
//! # Responsibilities
//! - Check presence and shape of every harvest field
//! - Turn an untyped [`SubmissionRequest`] into a typed [`ValidatedSubmission`]
//!
//! # Design Decisions
//! - Returns all validation errors, not just the first
//! - Runs before any cryptographic or chain work
//! - Pluggable through [`RecordValidator`]

use chrono::DateTime;
use serde::{Deserialize, Serialize};

use crate::record::types::{HarvestRecord, WeightInput, WeightKg};

/// Minimum hex length of a farmer public key.
pub const MIN_PUBLIC_KEY_HEX_LEN: usize = 64;

/// Raw submission body. Every field is optional so that missing fields are
/// reported as validation errors rather than deserialization failures.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionRequest {
    pub farmer_id: Option<String>,
    pub phone_number: Option<String>,
    pub plot_location: Option<String>,
    pub crop_type: Option<String>,
    pub weight_kg: Option<WeightInput>,
    pub timestamp: Option<String>,
    pub public_key: Option<String>,
    pub signature: Option<String>,
}

/// A submission whose fields passed validation.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedSubmission {
    pub record: HarvestRecord,
    pub public_key: String,
    pub signature: Option<String>,
}

/// Validation collaborator.
pub trait RecordValidator: Send + Sync {
    fn validate(&self, request: &SubmissionRequest) -> Result<ValidatedSubmission, Vec<String>>;
}

/// Default validator enforcing the field rules agents are held to.
#[derive(Debug, Clone, Copy, Default)]
pub struct StrictValidator;

impl RecordValidator for StrictValidator {
    fn validate(&self, request: &SubmissionRequest) -> Result<ValidatedSubmission, Vec<String>> {
        let mut errors = Vec::new();

        let farmer_id = non_empty(&request.farmer_id, "farmerId", &mut errors);

        let phone_number = match request.phone_number.as_deref() {
            None | Some("") => {
                errors.push("phoneNumber is required".to_string());
                None
            }
            Some(p) if !is_phone_number(p) => {
                errors.push("phoneNumber format is invalid".to_string());
                None
            }
            Some(p) => Some(p.to_string()),
        };

        let plot_location = non_empty(&request.plot_location, "plotLocation", &mut errors);
        let crop_type = non_empty(&request.crop_type, "cropType", &mut errors);

        let weight_kg = match &request.weight_kg {
            None => {
                errors.push("weightKg must be a positive number".to_string());
                None
            }
            Some(input) => match WeightKg::try_from(input) {
                Ok(w) => Some(w),
                Err(e) => {
                    errors.push(e);
                    None
                }
            },
        };

        let timestamp = match request.timestamp.as_deref() {
            None | Some("") => {
                errors.push("timestamp is required".to_string());
                None
            }
            Some(t) if DateTime::parse_from_rfc3339(t).is_err() => {
                errors.push("timestamp must be a valid ISO 8601 date string".to_string());
                None
            }
            Some(t) => Some(t.to_string()),
        };

        let public_key = match request.public_key.as_deref() {
            None | Some("") => {
                errors.push("publicKey is required".to_string());
                None
            }
            Some(k) if !is_hex_key(k) => {
                errors.push(format!(
                    "publicKey must be a valid hexadecimal string (minimum {} characters)",
                    MIN_PUBLIC_KEY_HEX_LEN
                ));
                None
            }
            Some(k) => Some(k.to_string()),
        };

        let signature = request
            .signature
            .as_deref()
            .filter(|s| !s.is_empty())
            .map(str::to_string);

        match (farmer_id, phone_number, plot_location, crop_type, weight_kg, timestamp, public_key) {
            (Some(farmer_id), Some(phone_number), Some(plot_location), Some(crop_type), Some(weight_kg), Some(timestamp), Some(public_key))
                if errors.is_empty() =>
            {
                Ok(ValidatedSubmission {
                    record: HarvestRecord {
                        farmer_id,
                        phone_number,
                        plot_location,
                        crop_type,
                        weight_kg,
                        timestamp,
                    },
                    public_key,
                    signature,
                })
            }
            _ => Err(errors),
        }
    }
}

fn non_empty(value: &Option<String>, name: &str, errors: &mut Vec<String>) -> Option<String> {
    match value.as_deref() {
        Some(v) if !v.trim().is_empty() => Some(v.to_string()),
        _ => {
            errors.push(format!("{} is required and must be a non-empty string", name));
            None
        }
    }
}

fn is_phone_number(s: &str) -> bool {
    let digits = s.strip_prefix('+').unwrap_or(s);
    !digits.is_empty()
        && digits
            .chars()
            .all(|c| c.is_ascii_digit() || matches!(c, ' ' | '-' | '(' | ')'))
}

fn is_hex_key(s: &str) -> bool {
    s.len() >= MIN_PUBLIC_KEY_HEX_LEN && s.chars().all(|c| c.is_ascii_hexdigit())
}
