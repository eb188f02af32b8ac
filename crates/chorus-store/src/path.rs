use crate::error::{Result, StoreError};

/// Slash separated path to a collection, e.g. `chatRoomsCollection/R1/messageCollection`.
///
/// Collections sit at odd depths: `collection/doc/collection/...`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CollectionPath(String);

impl CollectionPath {
    /// A top-level collection.
    pub fn root(name: &str) -> Result<Self> {
        validate_segment(name)?;
        Ok(Self(name.to_string()))
    }

    /// A sub-collection of the document `doc` inside this collection.
    pub fn child(&self, doc: &str, collection: &str) -> Result<Self> {
        validate_segment(doc)?;
        validate_segment(collection)?;
        Ok(Self(format!("{}/{}/{}", self.0, doc, collection)))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for CollectionPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

fn validate_segment(segment: &str) -> Result<()> {
    if segment.is_empty() || segment.contains('/') || segment == "." || segment == ".." {
        return Err(StoreError::InvalidPath(format!(
            "bad path segment {segment:?}"
        )));
    }
    Ok(())
}
