//! Harvest record types.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// Upper bound matching a `DECIMAL(10,2)` weight column.
pub const MAX_WEIGHT_KG: f64 = 99_999_999.99;

/// A harvest record as submitted by a field agent.
///
/// Never mutated after construction. Only these six fields are signed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HarvestRecord {
    /// Opaque farmer identifier.
    pub farmer_id: String,
    pub phone_number: String,
    pub plot_location: String,
    pub crop_type: String,
    pub weight_kg: WeightKg,
    /// RFC 3339 instant, kept exactly as submitted.
    pub timestamp: String,
}

/// Positive harvest weight in kilograms.
///
/// Displays as the shortest decimal that round-trips (`120.5`, `120`), which
/// is the only representation used in signed and anchored payloads.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct WeightKg(f64);

impl WeightKg {
    /// Accept a weight if it is finite, positive, within column range and has
    /// at most two fractional digits.
    pub fn new(value: f64) -> Result<Self, String> {
        if !value.is_finite() || value <= 0.0 {
            return Err("weightKg must be a positive number".to_string());
        }
        if value > MAX_WEIGHT_KG {
            return Err(format!("weightKg must not exceed {}", MAX_WEIGHT_KG));
        }
        // Exact: n / 100 rounds to the same double a two-digit decimal parses to.
        if (value * 100.0).round() / 100.0 != value {
            return Err("weightKg must have at most two decimal places".to_string());
        }
        Ok(Self(value))
    }

    pub fn value(self) -> f64 {
        self.0
    }

    /// Canonical decimal text.
    pub fn canonical(self) -> String {
        self.to_string()
    }
}

impl fmt::Display for WeightKg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<&WeightInput> for WeightKg {
    type Error = String;

    fn try_from(input: &WeightInput) -> Result<Self, Self::Error> {
        match input {
            WeightInput::Number(n) => WeightKg::new(*n),
            WeightInput::Text(s) => s
                .trim()
                .parse::<f64>()
                .map_err(|_| "weightKg must be a positive number".to_string())
                .and_then(WeightKg::new),
        }
    }
}

impl Serialize for WeightKg {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(self.0)
    }
}

impl<'de> Deserialize<'de> for WeightKg {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let input = WeightInput::deserialize(deserializer)?;
        WeightKg::try_from(&input).map_err(serde::de::Error::custom)
    }
}

/// Weight as it arrives on the wire: agents send either a JSON number or a
/// decimal string.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum WeightInput {
    Number(f64),
    Text(String),
}
