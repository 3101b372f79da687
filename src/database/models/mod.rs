pub mod role;
pub mod test_entry;
pub mod user;

pub use role::Role;
pub use test_entry::TestEntry;
pub use user::{User, UserProfile};

use chrono::{DateTime, SecondsFormat, TimeZone, Utc};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use thiserror::Error;

use super::store::CollectionSpec;

/// Field-level validation failures raised while preparing a document
#[derive(Debug, Error, PartialEq)]
pub enum ModelError {
    #[error("Path `{0}` is required.")]
    Required(String),

    #[error("Cast to string failed for value {value} at path \"{field}\"")]
    InvalidString { field: String, value: String },

    #[error("Cast to date failed for value {value} at path \"{field}\"")]
    InvalidTimestamp { field: String, value: String },

    #[error("Cast to id failed for value {value} at path \"{field}\"")]
    InvalidId { field: String, value: String },
}

/// A fixed-schema document type stored in its own collection.
pub trait Entity: Serialize + DeserializeOwned + Send + Sync {
    const COLLECTION: &'static str;
    const UNIQUE: &'static [&'static str] = &[];

    fn spec() -> CollectionSpec {
        Self::UNIQUE
            .iter()
            .fold(CollectionSpec::new(Self::COLLECTION), |spec, field| spec.unique(*field))
    }
}

/// Every fixed collection provisioned when the store connects.
pub fn fixed_collections() -> Vec<CollectionSpec> {
    vec![User::spec(), Role::spec(), TestEntry::spec()]
}

/// Scalars become strings; objects and arrays are rejected. Null passes through.
pub fn cast_string(field: &str, value: Value) -> Result<Value, ModelError> {
    match value {
        Value::Null | Value::String(_) => Ok(value),
        Value::Number(n) => Ok(Value::String(n.to_string())),
        Value::Bool(b) => Ok(Value::String(b.to_string())),
        other => Err(ModelError::InvalidString {
            field: field.to_string(),
            value: other.to_string(),
        }),
    }
}

/// Like [`cast_string`] but trims and refuses null or blank values.
pub fn cast_required_string(field: &str, value: Value) -> Result<String, ModelError> {
    match cast_string(field, value)? {
        Value::String(s) if !s.trim().is_empty() => Ok(s.trim().to_string()),
        _ => Err(ModelError::Required(field.to_string())),
    }
}

/// RFC 3339 strings and epoch milliseconds are accepted; output is normalized
/// to an RFC 3339 UTC string.
pub fn cast_timestamp(field: &str, value: Value) -> Result<Value, ModelError> {
    let invalid = |v: &Value| ModelError::InvalidTimestamp {
        field: field.to_string(),
        value: v.to_string(),
    };

    let parsed = match &value {
        Value::Null => return Ok(Value::Null),
        Value::String(s) => DateTime::parse_from_rfc3339(s)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|_| invalid(&value))?,
        Value::Number(n) => n
            .as_i64()
            .and_then(|ms| Utc.timestamp_millis_opt(ms).single())
            .ok_or_else(|| invalid(&value))?,
        _ => return Err(invalid(&value)),
    };
    Ok(Value::String(timestamp(parsed)))
}

pub fn timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

pub fn now() -> String {
    timestamp(Utc::now())
}
