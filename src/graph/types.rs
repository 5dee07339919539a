//! Core ID types for the viewpoint graph.

/// Handle to a committed viewpoint entry.
///
/// Indices are assigned sequentially by the entry store, starting at zero,
/// and are never reused while the store lives. "No index" is expressed as
/// `Option<ViewpointEntryIndex>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ViewpointEntryIndex(pub usize);

impl ViewpointEntryIndex {
    pub fn new(index: usize) -> Self {
        Self(index)
    }

    #[inline]
    pub fn as_usize(self) -> usize {
        self.0
    }
}

impl std::fmt::Display for ViewpointEntryIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "VP{}", self.0)
    }
}

impl From<usize> for ViewpointEntryIndex {
    fn from(index: usize) -> Self {
        Self(index)
    }
}
