//! # Inheritance Projection
//!
//! `list_visible(owner)` returns the owner's own options at level 0 and,
//! for each ancestor in its nearest-first ancestor chain, that ancestor's
//! options at the ancestor's 1-based position in the chain.
//!
//! Nothing is deduplicated. A child and its parent may both hold the same
//! key; both records come back, the child's first. [`closest_per_key`]
//! gives the "closest wins" view for callers that want it.
//!
//! ## Ancestor chain trust boundary
//!
//! The chain comes from an [`AncestorSource`] owned by the entity
//! lifecycle, which is expected to keep it acyclic and correctly ordered.
//! The projection still guards it: entries equal to the queried owner and
//! repeated entries are skipped, and the chain is cut at
//! `max_ancestor_depth`. Skipped entries keep their position, so levels
//! always match the chain as supplied.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use opts_core::OwnerId;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::probe::ExistenceProbe;
use crate::record::OptionRecord;
use crate::storage::MemoryStorage;

/// Supplies an owner's ancestor chain, nearest first.
pub trait AncestorSource: Send + Sync {
    /// Ancestors of `owner`; empty for roots and unknown owners.
    fn ancestors(&self, owner: OwnerId) -> Vec<OwnerId>;
}

/// Every owner is a root.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoAncestors;

impl AncestorSource for NoAncestors {
    fn ancestors(&self, _owner: OwnerId) -> Vec<OwnerId> {
        Vec::new()
    }
}

/// An owner entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Entity {
    pub id: OwnerId,
    pub parent_id: Option<OwnerId>,
    /// Ancestor chain, nearest first.
    pub parents_ids: Vec<OwnerId>,
}

/// In-memory entity hierarchy. Clones share state.
#[derive(Debug, Clone, Default)]
pub struct EntityTree {
    entities: Arc<RwLock<HashMap<OwnerId, Entity>>>,
}

impl EntityTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an entity under `parent`, deriving its chain from the
    /// parent's. An unknown parent contributes only itself.
    pub fn insert(&self, id: OwnerId, parent: Option<OwnerId>) -> Entity {
        let mut entities = self.entities.write();
        let parents_ids = match parent {
            Some(p) => {
                let mut chain = vec![p];
                if let Some(parent_entity) = entities.get(&p) {
                    chain.extend(parent_entity.parents_ids.iter().copied());
                }
                chain
            }
            None => Vec::new(),
        };
        let entity = Entity {
            id,
            parent_id: parent,
            parents_ids,
        };
        entities.insert(id, entity.clone());
        entity
    }

    /// Insert an entity with an externally maintained chain, taken as is.
    pub fn insert_with_chain(&self, id: OwnerId, parents_ids: Vec<OwnerId>) -> Entity {
        let entity = Entity {
            id,
            parent_id: parents_ids.first().copied(),
            parents_ids,
        };
        self.entities.write().insert(id, entity.clone());
        entity
    }

    pub fn get(&self, id: OwnerId) -> Option<Entity> {
        self.entities.read().get(&id).cloned()
    }

    pub fn len(&self) -> usize {
        self.entities.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl ExistenceProbe for EntityTree {
    fn exists(&self, id: Uuid) -> bool {
        self.entities.read().contains_key(&OwnerId(id))
    }
}

impl AncestorSource for EntityTree {
    fn ancestors(&self, owner: OwnerId) -> Vec<OwnerId> {
        self.entities
            .read()
            .get(&owner)
            .map(|e| e.parents_ids.clone())
            .unwrap_or_default()
    }
}

/// An option as seen from a queried owner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VisibleOption {
    /// The owner the listing was requested for.
    pub queried_owner_id: OwnerId,
    /// The owner that actually holds the record.
    pub source_owner_id: OwnerId,
    /// 0 for the queried owner, n for its n-th ancestor.
    pub inheritance_level: u32,
    #[serde(flatten)]
    pub record: OptionRecord,
}

impl VisibleOption {
    /// Whether the record is held by an ancestor.
    pub fn is_inherited(&self) -> bool {
        self.inheritance_level > 0
    }
}

/// Apply the chain guard, pairing each kept ancestor with its level.
pub(crate) fn guard_chain(
    queried: OwnerId,
    chain: Vec<OwnerId>,
    max_depth: usize,
) -> Vec<(u32, OwnerId)> {
    if chain.len() > max_depth {
        tracing::warn!(
            owner = %queried,
            depth = chain.len(),
            max_depth,
            "ancestor chain truncated"
        );
    }
    let mut seen = HashSet::new();
    let mut levels = Vec::new();
    for (position, ancestor) in chain.into_iter().take(max_depth).enumerate() {
        if ancestor == queried {
            tracing::warn!(owner = %queried, position, "owner appears in its own ancestor chain");
            continue;
        }
        if !seen.insert(ancestor) {
            tracing::warn!(owner = %queried, %ancestor, position, "repeated ancestor skipped");
            continue;
        }
        let level = u32::try_from(position + 1).unwrap_or(u32::MAX);
        levels.push((level, ancestor));
    }
    levels
}

/// Collect own and inherited options under one read lock. Output is
/// ordered by level, then creation time, then insertion order.
pub(crate) fn project(
    storage: &MemoryStorage,
    queried: OwnerId,
    ancestors: &[(u32, OwnerId)],
) -> Vec<VisibleOption> {
    let reader = storage.read();
    std::iter::once((0, queried))
        .chain(ancestors.iter().copied())
        .flat_map(|(level, source)| {
            reader
                .owned_by(Some(source))
                .into_iter()
                .map(move |record| VisibleOption {
                    queried_owner_id: queried,
                    source_owner_id: source,
                    inheritance_level: level,
                    record,
                })
        })
        .collect()
}

/// The "closest wins" view: for each key, only the records at the
/// smallest inheritance level holding that key. Single-valued keys yield
/// one record; multi-valued keys yield every record from that level.
/// Relative order of the input is preserved.
pub fn closest_per_key(visible: &[VisibleOption]) -> Vec<VisibleOption> {
    let mut closest: HashMap<&str, u32> = HashMap::new();
    for option in visible {
        closest
            .entry(option.record.key.as_str())
            .and_modify(|level| *level = (*level).min(option.inheritance_level))
            .or_insert(option.inheritance_level);
    }
    visible
        .iter()
        .filter(|o| closest.get(o.record.key.as_str()) == Some(&o.inheritance_level))
        .cloned()
        .collect()
}
