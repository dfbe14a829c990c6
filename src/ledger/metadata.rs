//! Transaction metadata model for anchored harvest records.
//!
//! # Layout
//! ```text
//! 721 → { "agridatum": { "harvest": {
//!     farmerId, phoneNumber, plotLocation, cropType,
//!     weightKg (canonical decimal string), timestamp, publicKey } } }
//! ```
//!
//! Ledger metadata strings are capped at 64 bytes. Longer values become an
//! ordered list of chunks, split on UTF-8 character boundaries.

use minicbor::data::Type;
use minicbor::{Decoder, Encoder};
use serde_json::{Map, Value};

use crate::ledger::types::{TxBuildError, TxBuildResult};
use crate::record::HarvestRecord;

/// Metadata label under which harvest records are anchored.
pub const HARVEST_METADATA_LABEL: u64 = 721;

/// Maximum byte length of a single metadata string.
pub const METADATA_CHUNK_SIZE: usize = 64;

const ROOT_KEY: &str = "agridatum";
const HARVEST_KEY: &str = "harvest";

/// Field order inside the `harvest` map.
pub const PAYLOAD_FIELDS: [&str; 7] = [
    "farmerId",
    "phoneNumber",
    "plotLocation",
    "cropType",
    "weightKg",
    "timestamp",
    "publicKey",
];

/// Split `s` into pieces of at most `max_bytes`, never inside a character.
pub fn chunk_str(s: &str, max_bytes: usize) -> Vec<String> {
    if s.is_empty() {
        return vec![String::new()];
    }

    let mut chunks = Vec::new();
    let mut start = 0;
    while start < s.len() {
        let mut end = (start + max_bytes).min(s.len());
        while !s.is_char_boundary(end) {
            end -= 1;
        }
        // a single character wider than max_bytes still has to go somewhere
        if end == start {
            end = start + s[start..].chars().next().map_or(1, char::len_utf8);
        }
        chunks.push(s[start..end].to_string());
        start = end;
    }
    chunks
}

/// Transaction metadatum value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Metadatum {
    Int(i64),
    Bytes(Vec<u8>),
    Text(String),
    List(Vec<Metadatum>),
    /// Ordered key/value pairs.
    Map(Vec<(Metadatum, Metadatum)>),
}

impl Metadatum {
    /// Text value, chunked into a list when over the ledger string limit.
    pub fn chunked_text(s: &str) -> Self {
        if s.len() <= METADATA_CHUNK_SIZE {
            Metadatum::Text(s.to_string())
        } else {
            Metadatum::List(
                chunk_str(s, METADATA_CHUNK_SIZE)
                    .into_iter()
                    .map(Metadatum::Text)
                    .collect(),
            )
        }
    }

    /// Look up a text key in a map.
    pub fn get(&self, key: &str) -> Option<&Metadatum> {
        match self {
            Metadatum::Map(entries) => entries.iter().find_map(|(k, v)| match k {
                Metadatum::Text(t) if t == key => Some(v),
                _ => None,
            }),
            _ => None,
        }
    }

    pub fn encode<W: minicbor::encode::Write>(
        &self,
        e: &mut Encoder<W>,
    ) -> Result<(), minicbor::encode::Error<W::Error>> {
        match self {
            Metadatum::Int(i) => {
                e.i64(*i)?;
            }
            Metadatum::Bytes(b) => {
                e.bytes(b)?;
            }
            Metadatum::Text(t) => {
                e.str(t)?;
            }
            Metadatum::List(items) => {
                e.array(items.len() as u64)?;
                for item in items {
                    item.encode(e)?;
                }
            }
            Metadatum::Map(entries) => {
                e.map(entries.len() as u64)?;
                for (k, v) in entries {
                    k.encode(e)?;
                    v.encode(e)?;
                }
            }
        }
        Ok(())
    }

    pub fn decode(d: &mut Decoder<'_>) -> Result<Self, minicbor::decode::Error> {
        match d.datatype()? {
            Type::U8 | Type::U16 | Type::U32 | Type::U64 | Type::I8 | Type::I16 | Type::I32
            | Type::I64 | Type::Int => Ok(Metadatum::Int(d.i64()?)),
            Type::Bytes => Ok(Metadatum::Bytes(d.bytes()?.to_vec())),
            Type::String => Ok(Metadatum::Text(d.str()?.to_string())),
            Type::Array => {
                let len = d
                    .array()?
                    .ok_or_else(|| minicbor::decode::Error::message("indefinite metadata list"))?;
                let mut items = Vec::with_capacity(len as usize);
                for _ in 0..len {
                    items.push(Metadatum::decode(d)?);
                }
                Ok(Metadatum::List(items))
            }
            Type::Map => {
                let len = d
                    .map()?
                    .ok_or_else(|| minicbor::decode::Error::message("indefinite metadata map"))?;
                let mut entries = Vec::with_capacity(len as usize);
                for _ in 0..len {
                    let k = Metadatum::decode(d)?;
                    let v = Metadatum::decode(d)?;
                    entries.push((k, v));
                }
                Ok(Metadatum::Map(entries))
            }
            other => Err(minicbor::decode::Error::message(format!(
                "unsupported metadatum type {:?}",
                other
            ))),
        }
    }

    /// JSON rendering as served by chain indexers: maps become objects,
    /// bytes become `0x`-prefixed hex.
    pub fn to_json(&self) -> Value {
        match self {
            Metadatum::Int(i) => Value::from(*i),
            Metadatum::Bytes(b) => Value::String(format!("0x{}", hex::encode(b))),
            Metadatum::Text(t) => Value::String(t.clone()),
            Metadatum::List(items) => Value::Array(items.iter().map(Metadatum::to_json).collect()),
            Metadatum::Map(entries) => {
                let mut object = Map::new();
                for (k, v) in entries {
                    let key = match k {
                        Metadatum::Text(t) => t.clone(),
                        other => other.to_json().to_string(),
                    };
                    object.insert(key, v.to_json());
                }
                Value::Object(object)
            }
        }
    }
}

/// The anchored form of a harvest record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetadataPayload {
    /// Values in [`PAYLOAD_FIELDS`] order.
    values: [String; 7],
}

impl MetadataPayload {
    pub fn from_record(record: &HarvestRecord, public_key: &str) -> Self {
        Self {
            values: [
                record.farmer_id.clone(),
                record.phone_number.clone(),
                record.plot_location.clone(),
                record.crop_type.clone(),
                record.weight_kg.canonical(),
                record.timestamp.clone(),
                public_key.to_string(),
            ],
        }
    }

    /// Value of a payload field by its wire name.
    pub fn field(&self, name: &str) -> Option<&str> {
        PAYLOAD_FIELDS
            .iter()
            .position(|f| *f == name)
            .map(|i| self.values[i].as_str())
    }

    /// `{"agridatum": {"harvest": {...}}}` with long strings chunked.
    pub fn to_metadatum(&self) -> Metadatum {
        let harvest = PAYLOAD_FIELDS
            .iter()
            .zip(self.values.iter())
            .map(|(k, v)| (Metadatum::Text((*k).to_string()), Metadatum::chunked_text(v)))
            .collect();

        Metadatum::Map(vec![(
            Metadatum::Text(ROOT_KEY.to_string()),
            Metadatum::Map(vec![(
                Metadatum::Text(HARVEST_KEY.to_string()),
                Metadatum::Map(harvest),
            )]),
        )])
    }

    pub fn to_json(&self) -> Value {
        self.to_metadatum().to_json()
    }

    /// Parse the JSON form of the label's metadata. Chunk lists are joined.
    pub fn from_json(value: &Value) -> Option<Self> {
        let harvest = value.get(ROOT_KEY)?.get(HARVEST_KEY)?;

        let mut values: [String; 7] = Default::default();
        for (slot, field) in values.iter_mut().zip(PAYLOAD_FIELDS.iter()) {
            *slot = match harvest.get(*field)? {
                Value::String(s) => s.clone(),
                Value::Array(parts) => {
                    let mut joined = String::new();
                    for part in parts {
                        joined.push_str(part.as_str()?);
                    }
                    joined
                }
                Value::Number(n) => n.to_string(),
                _ => return None,
            };
        }
        Some(Self { values })
    }

    pub fn from_metadatum(metadatum: &Metadatum) -> Option<Self> {
        Self::from_json(&metadatum.to_json())
    }

    /// Names of fields whose anchored value differs from the stored record.
    pub fn mismatches(&self, record: &HarvestRecord, public_key: &str) -> Vec<String> {
        let expected = Self::from_record(record, public_key);
        PAYLOAD_FIELDS
            .iter()
            .zip(self.values.iter().zip(expected.values.iter()))
            .filter(|(_, (anchored, stored))| !values_match(anchored, stored))
            .map(|(name, _)| (*name).to_string())
            .collect()
    }
}

/// Weights may come back from an indexer as a JSON number; compare those
/// numerically, everything else by text.
fn values_match(anchored: &str, stored: &str) -> bool {
    if anchored == stored {
        return true;
    }
    match (anchored.parse::<f64>(), stored.parse::<f64>()) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

/// Encode auxiliary data: `{label: metadatum}`.
pub fn encode_auxiliary_data(label: u64, metadatum: &Metadatum) -> TxBuildResult<Vec<u8>> {
    let mut e = Encoder::new(Vec::new());
    e.map(1)
        .and_then(|e| e.u64(label))
        .map_err(|e| TxBuildError::MetadataEncoding(e.to_string()))?;
    metadatum
        .encode(&mut e)
        .map_err(|e| TxBuildError::MetadataEncoding(e.to_string()))?;
    Ok(e.into_writer())
}

/// Extract the metadatum stored under `label` from a serialized transaction
/// `[body, witnesses, valid, auxiliary_data]`.
pub fn metadata_from_transaction(tx_cbor: &[u8], label: u64) -> TxBuildResult<Option<Metadatum>> {
    let malformed = |e: minicbor::decode::Error| TxBuildError::MetadataEncoding(e.to_string());

    let mut d = Decoder::new(tx_cbor);
    match d.array().map_err(malformed)? {
        Some(4) => {}
        other => {
            return Err(TxBuildError::MetadataEncoding(format!(
                "expected 4-element transaction, got {:?}",
                other
            )))
        }
    }
    d.skip().map_err(malformed)?;
    d.skip().map_err(malformed)?;
    d.skip().map_err(malformed)?;

    if d.datatype().map_err(malformed)? == Type::Null {
        return Ok(None);
    }

    let len = d
        .map()
        .map_err(malformed)?
        .ok_or_else(|| TxBuildError::MetadataEncoding("indefinite auxiliary data".to_string()))?;
    for _ in 0..len {
        let key = d.u64().map_err(malformed)?;
        if key == label {
            return Metadatum::decode(&mut d).map(Some).map_err(malformed);
        }
        d.skip().map_err(malformed)?;
    }
    Ok(None)
}
