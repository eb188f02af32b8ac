//! # chorus-store
//!
//! Narrow client-side view of the document store that holds chat history,
//! plus the attachment upload capability.
//!
//! The store is addressed by hierarchical [`CollectionPath`]s
//! (`rooms/{room}/{shard}`), read through ordered, cursor-paginated
//! [`Query`]s and written append-only.  [`InMemoryDocumentStore`] implements
//! the same ordering rules as the hosted store and backs tests and the demo.

pub mod document_store;
pub mod in_memory;
pub mod path;
pub mod query;
pub mod record;
pub mod upload;

mod error;

pub use document_store::DocumentStore;
pub use error::{Result, StoreError, UploadError};
pub use in_memory::InMemoryDocumentStore;
pub use path::CollectionPath;
pub use query::{Direction, Query};
pub use record::{compare_values, Record, StoreTimestamp};
pub use upload::{attachment_name, BlobUploader, LocalImage, Uploader};
