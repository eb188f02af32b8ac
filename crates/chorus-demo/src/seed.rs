use chrono::{Duration, Utc};
use serde_json::{json, Value};

use chorus_shared::{RoomId, ShardId};
use chorus_store::{CollectionPath, InMemoryDocumentStore, Record, StoreTimestamp};

/// Fill every shard of `room` with messages at shard-specific intervals, plus
/// one record with a null timestamp that the reader must skip.
pub fn seed_room(
    store: &InMemoryDocumentStore,
    rooms: &CollectionPath,
    room: &RoomId,
    shards: &[ShardId],
) -> anyhow::Result<usize> {
    let now = Utc::now();
    let mut count = 0;

    for (n, shard) in shards.iter().enumerate() {
        let collection = rooms.child(room.as_str(), shard.as_str())?;
        // Busier shards first: 120, 60, 40, ... messages.
        let total = 120 / (n + 1);
        let spacing = Duration::minutes(3 * (n as i64 + 1));

        for i in 0..total {
            let at = now - spacing * (i as i32 + 1);
            let fields = json!({
                "_id": format!("{shard}-{i}"),
                "text": format!("message {i} in {shard}"),
                "timestamp": StoreTimestamp::from_datetime(at).to_value(),
                "user": {
                    "_id": format!("user-{}", i % 3),
                    "name": format!("User {}", i % 3),
                    "avatar": "https://i.pravatar.cc/300",
                },
                "image": "",
            });
            if let Value::Object(map) = fields {
                store.insert(&collection, Record::new(format!("{shard}-{i:04}"), map))?;
                count += 1;
            }
        }

        if n == 0 {
            let mut broken = serde_json::Map::new();
            broken.insert("timestamp".into(), Value::Null);
            broken.insert("text".into(), json!("no timestamp"));
            store.insert(&collection, Record::new("broken", broken))?;
            count += 1;
        }
    }

    Ok(count)
}
