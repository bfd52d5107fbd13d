use std::collections::HashMap;

use uuid::Uuid;

/// Mint a fresh stable identifier for a row the legacy store never assigned one.
pub fn new_stable_id() -> Uuid {
    Uuid::new_v4()
}

/// Parse a legacy-carried identifier, minting a replacement when the stored
/// text is absent or malformed. Malformed ids are replaced rather than
/// propagated so the target store only ever holds syntactically valid ids.
pub fn stable_id_from_legacy(raw: Option<&str>) -> Uuid {
    raw.and_then(|s| Uuid::parse_str(s.trim()).ok())
        .unwrap_or_else(new_stable_id)
}

/// Per-entity lookup from legacy integer row id to stable identifier.
///
/// Built once by each entity reader and handed to the relationship resolver;
/// never shared mutable state.
#[derive(Debug, Default, Clone)]
pub struct IdentifierMap {
    inner: HashMap<i64, Uuid>,
}

impl IdentifierMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, legacy_id: i64, stable: Uuid) {
        self.inner.insert(legacy_id, stable);
    }

    pub fn get(&self, legacy_id: i64) -> Option<Uuid> {
        self.inner.get(&legacy_id).copied()
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}
