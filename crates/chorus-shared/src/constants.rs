/// Top-level collection that holds one document per chat room
pub const DEFAULT_ROOT_COLLECTION: &str = "chatRoomsCollection";

/// Default number of records requested per shard page
pub const DEFAULT_PAGE_SIZE: usize = 50;

/// Shard sub-collections of the shipped deployment, in fetch order
pub const DEFAULT_SHARDS: [&str; 2] = ["messageCollection", "messageCollectionTwo"];

/// Room -> shard routes of the shipped deployment
pub const DEFAULT_ROUTES: [(&str, &str); 2] = [
    ("LkJC4Dkq3mFK6o3XTRWx", "messageCollection"),
    ("r9YzxiuAMFErs0eitK1Z", "messageCollectionTwo"),
];

/// Record field names
pub const FIELD_ID: &str = "_id";
pub const FIELD_TEXT: &str = "text";
pub const FIELD_TIMESTAMP: &str = "timestamp";
pub const FIELD_USER: &str = "user";
pub const FIELD_IMAGE: &str = "image";

/// Folder prefix for uploaded attachments
pub const IMAGE_FOLDER: &str = "images";
