//! Raw documents as the store hands them out, and the store's value ordering.

use std::cmp::Ordering;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A document: store-assigned id plus an opaque field map.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub id: String,
    pub fields: Map<String, Value>,
}

impl Record {
    pub fn new(id: impl Into<String>, fields: Map<String, Value>) -> Self {
        Self {
            id: id.into(),
            fields,
        }
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }
}

/// The store's native instant, encoded as `{"seconds": i64, "nanos": u32}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct StoreTimestamp {
    pub seconds: i64,
    pub nanos: u32,
}

impl StoreTimestamp {
    const NANOS_PER_SEC: u32 = 1_000_000_000;

    pub fn from_datetime(at: DateTime<Utc>) -> Self {
        Self {
            seconds: at.timestamp(),
            nanos: at.timestamp_subsec_nanos().min(Self::NANOS_PER_SEC - 1),
        }
    }

    /// `None` when the instant is outside chrono's representable range.
    pub fn to_datetime(self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.seconds, self.nanos)
    }

    pub fn to_value(self) -> Value {
        serde_json::json!({ "seconds": self.seconds, "nanos": self.nanos })
    }

    /// Recognise the encoded form; anything else is not a timestamp.
    pub fn from_value(value: &Value) -> Option<Self> {
        let obj = value.as_object()?;
        if obj.len() != 2 {
            return None;
        }
        let seconds = obj.get("seconds")?.as_i64()?;
        let nanos = u32::try_from(obj.get("nanos")?.as_u64()?).ok()?;
        if nanos >= Self::NANOS_PER_SEC {
            return None;
        }
        Some(Self { seconds, nanos })
    }
}

fn type_rank(value: &Value) -> u8 {
    match value {
        Value::Null => 0,
        Value::Bool(_) => 1,
        Value::Number(_) => 2,
        Value::Object(_) if StoreTimestamp::from_value(value).is_some() => 3,
        Value::String(_) => 4,
        Value::Array(_) => 5,
        Value::Object(_) => 6,
    }
}

/// Total order over field values used for `order_by`.
///
/// Values of different types order by type: null, booleans, numbers,
/// timestamps, strings, arrays, maps.
pub fn compare_values(a: &Value, b: &Value) -> Ordering {
    let by_type = type_rank(a).cmp(&type_rank(b));
    if by_type != Ordering::Equal {
        return by_type;
    }
    match (a, b) {
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        (Value::Number(x), Value::Number(y)) => {
            let (x, y) = (x.as_f64().unwrap_or(0.0), y.as_f64().unwrap_or(0.0));
            x.partial_cmp(&y).unwrap_or(Ordering::Equal)
        }
        (Value::String(x), Value::String(y)) => x.cmp(y),
        (Value::Object(_), Value::Object(_)) => {
            match (StoreTimestamp::from_value(a), StoreTimestamp::from_value(b)) {
                (Some(x), Some(y)) => x.cmp(&y),
                _ => Ordering::Equal,
            }
        }
        _ => Ordering::Equal,
    }
}
