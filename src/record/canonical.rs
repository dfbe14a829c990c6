//! Canonical byte form of a harvest record.
//!
//! The canonical payload is a compact JSON object whose keys are always
//! written in the order of [`CANONICAL_FIELDS`]. It is the exact byte string a
//! farmer signs and a verifier recomputes.

use serde_json::Value;

use crate::record::types::HarvestRecord;

/// Keys of the canonical payload, in signing order.
pub const CANONICAL_FIELDS: [&str; 6] = [
    "farmerId",
    "phoneNumber",
    "plotLocation",
    "cropType",
    "weightKg",
    "timestamp",
];

/// Produce the canonical payload for `record`.
pub fn canonicalize(record: &HarvestRecord) -> Vec<u8> {
    canonical_string(record).into_bytes()
}

/// Same as [`canonicalize`], as text.
pub fn canonical_string(record: &HarvestRecord) -> String {
    let values = [
        quoted(&record.farmer_id),
        quoted(&record.phone_number),
        quoted(&record.plot_location),
        quoted(&record.crop_type),
        record.weight_kg.canonical(),
        quoted(&record.timestamp),
    ];

    let mut out = String::with_capacity(128);
    out.push('{');
    for (i, (key, value)) in CANONICAL_FIELDS.iter().zip(values.iter()).enumerate() {
        if i > 0 {
            out.push(',');
        }
        out.push('"');
        out.push_str(key);
        out.push_str("\":");
        out.push_str(value);
    }
    out.push('}');
    out
}

fn quoted(s: &str) -> String {
    Value::String(s.to_owned()).to_string()
}
