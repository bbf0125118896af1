//! Change events for the element tree store.

use std::sync::Arc;

/// Kind of structural change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeEventKind {
    /// Element was created
    Created,
    /// Element was updated in place
    Updated,
    /// Element was deleted
    Deleted,
}

impl ChangeEventKind {
    /// Topic suffix for this event kind.
    #[must_use]
    pub fn suffix(self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Updated => "updated",
            Self::Deleted => "deleted",
        }
    }

    /// Parse an event kind from a topic suffix.
    #[must_use]
    pub fn from_suffix(suffix: &str) -> Option<Self> {
        match suffix {
            "created" => Some(Self::Created),
            "updated" => Some(Self::Updated),
            "deleted" => Some(Self::Deleted),
            _ => None,
        }
    }
}

/// A change notification fired by a container.
///
/// Deletions carry the removed `id_short` but no element; creates and
/// updates carry the element that was written.
#[derive(Debug, Clone)]
pub struct ChangeEvent<T> {
    /// What happened
    pub kind: ChangeEventKind,
    /// Path of the affected node
    pub path: String,
    /// `idShort` of the affected node
    pub id_short: String,
    /// The written element, absent for deletions
    pub element: Option<T>,
}

/// A subscriber callback invoked synchronously for every change.
pub type Subscriber<T> = Arc<dyn Fn(&ChangeEvent<T>) + Send + Sync>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn suffix_roundtrip() {
        for kind in [
            ChangeEventKind::Created,
            ChangeEventKind::Updated,
            ChangeEventKind::Deleted,
        ] {
            assert_eq!(ChangeEventKind::from_suffix(kind.suffix()), Some(kind));
        }
        assert_eq!(ChangeEventKind::from_suffix("patched"), None);
    }
}
