//! Conversion between store records and [`Message`]s.

use chrono::{DateTime, Utc};
use serde_json::{json, Map, Value};

use chorus_shared::constants::{FIELD_ID, FIELD_IMAGE, FIELD_TEXT, FIELD_TIMESTAMP, FIELD_USER};
use chorus_shared::{Author, DecodeError, DeliveryStatus, Message, MessageId, ShardId};
use chorus_store::{Record, StoreTimestamp};

/// String field of `fields`; absent, null or non-string values read as `None`.
fn optional_str<'a>(fields: &'a Map<String, Value>, key: &str) -> Option<&'a str> {
    fields.get(key).and_then(Value::as_str)
}

/// Parse the `timestamp` field of a record into an instant.
pub fn decode_timestamp(value: Option<&Value>) -> Result<DateTime<Utc>, DecodeError> {
    match value {
        None => Err(DecodeError::MissingField(FIELD_TIMESTAMP)),
        Some(Value::Null) => Err(DecodeError::NullTimestamp),
        Some(Value::String(s)) => DateTime::parse_from_rfc3339(s)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|e| DecodeError::InvalidTimestamp(e.to_string())),
        Some(other) => StoreTimestamp::from_value(other)
            .and_then(StoreTimestamp::to_datetime)
            .ok_or_else(|| DecodeError::InvalidTimestamp(other.to_string())),
    }
}

/// Decode a record read from `shard`.  The message id is the document id.
pub fn decode_record(shard: &ShardId, record: &Record) -> Result<Message, DecodeError> {
    let created_at = decode_timestamp(record.get(FIELD_TIMESTAMP))?;

    let user = match record.get(FIELD_USER) {
        None | Some(Value::Null) => return Err(DecodeError::MissingField(FIELD_USER)),
        Some(Value::Object(user)) => user,
        Some(_) => return Err(DecodeError::Malformed(FIELD_USER)),
    };
    let author_id = optional_str(user, "_id")
        .or_else(|| optional_str(user, "id"))
        .ok_or(DecodeError::MissingField("user._id"))?;

    Ok(Message {
        id: MessageId::new(record.id.clone()),
        shard: Some(shard.clone()),
        text: optional_str(&record.fields, FIELD_TEXT).unwrap_or_default().to_string(),
        created_at,
        author: Author {
            id: author_id.to_string(),
            display_name: optional_str(user, "name").unwrap_or_default().to_string(),
            avatar_url: optional_str(user, "avatar").unwrap_or_default().to_string(),
        },
        image_ref: optional_str(&record.fields, FIELD_IMAGE)
            .filter(|i| !i.is_empty())
            .map(str::to_string),
        status: DeliveryStatus::Confirmed,
    })
}

/// Field map written for a new message.  A missing image is stored as `""`.
pub fn encode_message(message: &Message) -> Map<String, Value> {
    let mut fields = Map::new();
    fields.insert(FIELD_ID.into(), json!(message.id.as_str()));
    fields.insert(
        FIELD_TIMESTAMP.into(),
        StoreTimestamp::from_datetime(message.created_at).to_value(),
    );
    fields.insert(FIELD_TEXT.into(), json!(message.text));
    fields.insert(
        FIELD_USER.into(),
        json!({
            "_id": message.author.id,
            "name": message.author.display_name,
            "avatar": message.author.avatar_url,
        }),
    );
    fields.insert(
        FIELD_IMAGE.into(),
        json!(message.image_ref.as_deref().unwrap_or("")),
    );
    fields
}
