use std::cmp::Ordering;

use crate::path::CollectionPath;
use crate::record::Record;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Ascending,
    Descending,
}

impl Direction {
    /// Orient an ascending comparison for this direction.
    pub fn apply(self, ordering: Ordering) -> Ordering {
        match self {
            Direction::Ascending => ordering,
            Direction::Descending => ordering.reverse(),
        }
    }
}

/// An ordered, limited read of one collection.
///
/// `start_after` holds the last record of the previous page; the next page
/// begins strictly after that record's position in the ordering.
#[derive(Debug, Clone)]
pub struct Query {
    pub collection: CollectionPath,
    pub order_by: String,
    pub direction: Direction,
    pub limit: usize,
    pub start_after: Option<Record>,
}

impl Query {
    pub fn new(collection: CollectionPath, order_by: impl Into<String>) -> Self {
        Self {
            collection,
            order_by: order_by.into(),
            direction: Direction::Ascending,
            limit: usize::MAX,
            start_after: None,
        }
    }

    pub fn direction(mut self, direction: Direction) -> Self {
        self.direction = direction;
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    pub fn start_after(mut self, record: Option<Record>) -> Self {
        self.start_after = record;
        self
    }
}
