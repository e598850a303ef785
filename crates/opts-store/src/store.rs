//! # Option Store
//!
//! Write path and read path over [`MemoryStorage`]. See the crate docs for
//! the gate order on [`OptionStore::put`].
//!
//! Probes for owner kinds and reference tables run before the transaction
//! opens since they call into tables the store does not own. Everything
//! that depends on the store's own contents (uniqueness, the record being
//! updated) is checked under the transaction's write lock.

use std::sync::Arc;

use opts_core::{OptionId, OwnerId, Timestamp};
use opts_schema::{validate, OwnerGroup, SchemaCatalog, SchemaFragment, SchemaSnapshot};

use crate::auth::{AllowAll, Authorizer, CallerContext, WriteAction};
use crate::config::StoreConfig;
use crate::error::OptionError;
use crate::probe::ProbeRegistry;
use crate::projection::{guard_chain, project, AncestorSource, NoAncestors, VisibleOption};
use crate::record::{OptionInput, OptionRecord, OptionValue};
use crate::storage::MemoryStorage;

/// Schema-validated option store. Clones share all state.
#[derive(Clone)]
pub struct OptionStore {
    catalog: SchemaCatalog,
    probes: Arc<ProbeRegistry>,
    storage: MemoryStorage,
    authorizer: Arc<dyn Authorizer>,
    ancestors: Arc<dyn AncestorSource>,
    config: StoreConfig,
}

impl std::fmt::Debug for OptionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OptionStore")
            .field("catalog", &self.catalog)
            .field("probes", &self.probes)
            .field("records", &self.storage.len())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl OptionStore {
    /// A store with an empty catalog, no authorization, and no ancestors.
    pub fn new(config: StoreConfig, probes: ProbeRegistry) -> Self {
        let catalog = SchemaCatalog::new(config.default_schema_set.clone());
        Self::with_catalog(config, catalog, probes)
    }

    /// A store over an existing catalog.
    pub fn with_catalog(config: StoreConfig, catalog: SchemaCatalog, probes: ProbeRegistry) -> Self {
        Self {
            catalog,
            probes: Arc::new(probes),
            storage: MemoryStorage::new(),
            authorizer: Arc::new(AllowAll),
            ancestors: Arc::new(NoAncestors),
            config,
        }
    }

    /// Replace the authorization gate.
    pub fn with_authorizer(mut self, authorizer: impl Authorizer + 'static) -> Self {
        self.authorizer = Arc::new(authorizer);
        self
    }

    /// Replace the ancestor source used by [`Self::list_visible`].
    pub fn with_ancestors(mut self, ancestors: impl AncestorSource + 'static) -> Self {
        self.ancestors = Arc::new(ancestors);
        self
    }

    pub fn catalog(&self) -> &SchemaCatalog {
        &self.catalog
    }

    pub fn probes(&self) -> &ProbeRegistry {
        &self.probes
    }

    pub fn storage(&self) -> &MemoryStorage {
        &self.storage
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    // ── Write path ──────────────────────────────────────────────────────

    /// Insert or update an option.
    ///
    /// When `input.id` names an existing record it is updated in place and
    /// keeps its `createdAt`; an unknown id is inserted under that id.
    /// Updates are validated exactly like inserts.
    pub fn put(&self, ctx: &CallerContext, input: OptionInput) -> Result<OptionId, OptionError> {
        self.authorizer.authorize(
            ctx,
            &WriteAction::Put {
                key: input.key.clone(),
                owner_id: input.owner_id,
            },
        )?;

        if input.key.trim().is_empty() {
            return Err(OptionError::EmptyKey);
        }

        let snapshot = self.catalog.registry().snapshot();
        let fragment = self.key_fragment(&snapshot, &input.key, input.owner_id)?;
        let value = self.checked_value(&input, &fragment)?;
        let json = value.to_json().ok_or_else(|| OptionError::ValueShape {
            key: input.key.clone(),
            reason: "numberValue must be a finite number".to_string(),
        })?;

        let mut tx = self.storage.begin();

        if !fragment.meta().multiple {
            if let Some(existing) = tx.find_other(&input.key, input.owner_id, input.id) {
                return Err(OptionError::DuplicateKey {
                    key: input.key,
                    owner_id: input.owner_id,
                    existing,
                });
            }
        }

        let violations = validate(&json, &fragment);
        if !violations.is_empty() {
            return Err(OptionError::Validation {
                key: input.key,
                violations,
            });
        }

        let now = Timestamp::now();
        let previous = input.id.and_then(|id| tx.get(id));
        let id = input.id.unwrap_or_default();
        let record = OptionRecord::from_value(
            id,
            input.key,
            input.owner_id,
            input.user_id.or(ctx.user_id),
            value,
            previous.as_ref().map_or(now, |p| p.created_at),
            now,
        );
        tracing::debug!(
            %id,
            key = %record.key,
            owner = ?record.owner_id,
            updated = previous.is_some(),
            "option written"
        );
        tx.upsert(record);
        tx.commit();
        Ok(id)
    }

    /// Delete an option, returning the removed record.
    pub fn delete(&self, ctx: &CallerContext, id: OptionId) -> Result<OptionRecord, OptionError> {
        self.authorizer.authorize(ctx, &WriteAction::Delete { id })?;
        let mut tx = self.storage.begin();
        let removed = tx.remove(id).ok_or(OptionError::RecordNotFound(id))?;
        tx.commit();
        tracing::debug!(%id, key = %removed.key, "option deleted");
        Ok(removed)
    }

    /// Governing fragment for `key`: the global group for ownerless
    /// writes, else the owner's kind with the wildcard group as fallback.
    fn key_fragment(
        &self,
        snapshot: &SchemaSnapshot,
        key: &str,
        owner: Option<OwnerId>,
    ) -> Result<Arc<SchemaFragment>, OptionError> {
        let Some(owner) = owner else {
            return self
                .catalog
                .key_fragment_in(snapshot, &OwnerGroup::Global, key)?
                .ok_or_else(|| OptionError::OwnerRequired {
                    key: key.to_string(),
                });
        };

        let kind = self.probes.resolve_owner_kind(owner)?;
        let group = OwnerGroup::Kind(kind.to_string());
        if let Some(fragment) = self.catalog.key_fragment_in(snapshot, &group, key)? {
            return Ok(fragment);
        }
        if let Some(fragment) = self.catalog.key_fragment_in(snapshot, &OwnerGroup::Any, key)? {
            tracing::debug!(key, owner_kind = kind, "key resolved through wildcard group");
            return Ok(fragment);
        }
        Err(OptionError::UnknownKey {
            key: key.to_string(),
            owner_kind: kind.to_string(),
        })
    }

    /// Enforce one-value-field-per-record and the reference/scalar split,
    /// probing reference tables for reference keys.
    fn checked_value(
        &self,
        input: &OptionInput,
        fragment: &SchemaFragment,
    ) -> Result<OptionValue, OptionError> {
        let shape_error = |reason: String| OptionError::ValueShape {
            key: input.key.clone(),
            reason,
        };
        let fields = input.value_fields();

        if let Some(tables) = &fragment.meta().tables {
            return match fields.as_slice() {
                [OptionValue::Reference(id)] => {
                    if self.probes.reference_exists(tables, *id) {
                        Ok(OptionValue::Reference(*id))
                    } else {
                        Err(OptionError::ReferenceNotFound {
                            key: input.key.clone(),
                            reference_id: *id,
                            tables: tables.clone(),
                        })
                    }
                }
                [] => Err(shape_error("reference key requires referenceId".to_string())),
                _ => Err(shape_error(format!(
                    "reference key accepts only referenceId, got {}",
                    field_names(&fields)
                ))),
            };
        }

        match fields.as_slice() {
            [OptionValue::Reference(_)] => Err(shape_error(
                "referenceId is only allowed for reference keys".to_string(),
            )),
            [single] => Ok(single.clone()),
            [] => Err(shape_error("exactly one value field must be set, got none".to_string())),
            _ => Err(shape_error(format!(
                "exactly one value field must be set, got {}",
                field_names(&fields)
            ))),
        }
    }

    // ── Read path ───────────────────────────────────────────────────────

    /// A record by id.
    pub fn get(&self, id: OptionId) -> Option<OptionRecord> {
        self.storage.get(id)
    }

    /// Records held directly by `owner` (`None` for global options).
    pub fn list_own(&self, owner: Option<OwnerId>) -> Vec<OptionRecord> {
        self.storage.list_by_owner(owner)
    }

    /// Own and inherited options of `owner`, ordered by inheritance level,
    /// then creation time, then insertion order.
    pub fn list_visible(&self, owner: OwnerId) -> Vec<VisibleOption> {
        let chain = guard_chain(
            owner,
            self.ancestors.ancestors(owner),
            self.config.max_ancestor_depth,
        );
        project(&self.storage, owner, &chain)
    }
}

fn field_names(fields: &[OptionValue]) -> String {
    fields
        .iter()
        .map(OptionValue::field)
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{RequireRole, Role};
    use crate::probe::MemoryTable;
    use opts_core::UserId;
    use serde_json::json;
    use uuid::Uuid;

    struct Fixture {
        store: OptionStore,
        teams: MemoryTable,
        files: MemoryTable,
    }

    fn fixture() -> Fixture {
        let teams = MemoryTable::new();
        let files = MemoryTable::new();
        let mut probes = ProbeRegistry::new();
        probes.register_owner_kind("teams", teams.clone()).unwrap();
        probes.register_table("files", files.clone()).unwrap();
        let store = OptionStore::new(StoreConfig::default(), probes);
        store
            .catalog()
            .registry()
            .replace_schema_set(
                "project",
                json!({
                    "teams": { "properties": {
                        "region": { "type": "string", "enum": ["eu", "us"] },
                        "seats": { "type": "integer", "minimum": 1 },
                        "logo": { "type": "string", "meta": { "tables": ["files"] } },
                        "tag": { "type": "string", "meta": { "multiple": true } }
                    }},
                    "any": { "properties": { "color": { "type": "string" } } },
                    "global": { "properties": { "motd": { "type": "string" } } }
                }),
            )
            .unwrap();
        Fixture { store, teams, files }
    }

    fn team(f: &Fixture) -> OwnerId {
        let id = OwnerId::new();
        f.teams.insert(id.0);
        id
    }

    fn system() -> CallerContext {
        CallerContext::system()
    }

    #[test]
    fn put_and_get() {
        let f = fixture();
        let owner = team(&f);
        let id = f
            .store
            .put(&system(), OptionInput::new("region").owner(owner).string("eu"))
            .unwrap();
        let record = f.store.get(id).unwrap();
        assert_eq!(record.string_value.as_deref(), Some("eu"));
        assert_eq!(record.owner_id, Some(owner));
        assert_eq!(f.store.list_own(Some(owner)).len(), 1);
    }

    #[test]
    fn empty_key_rejected() {
        let f = fixture();
        let err = f
            .store
            .put(&system(), OptionInput::new("  ").string("x"))
            .unwrap_err();
        assert_eq!(err, OptionError::EmptyKey);
    }

    #[test]
    fn wildcard_group_fallback() {
        let f = fixture();
        let owner = team(&f);
        assert!(f
            .store
            .put(&system(), OptionInput::new("color").owner(owner).string("red"))
            .is_ok());
        let err = f
            .store
            .put(&system(), OptionInput::new("nope").owner(owner).string("x"))
            .unwrap_err();
        assert!(matches!(err, OptionError::UnknownKey { ref owner_kind, .. } if owner_kind == "teams"));
    }

    #[test]
    fn unknown_owner_rejected() {
        let f = fixture();
        let err = f
            .store
            .put(&system(), OptionInput::new("region").owner(OwnerId::new()).string("eu"))
            .unwrap_err();
        assert_eq!(err.code(), "OWNER_NOT_FOUND");
    }

    #[test]
    fn missing_schema_set_is_schema_not_found() {
        let mut probes = ProbeRegistry::new();
        probes.register_owner_kind("teams", |_: Uuid| true).unwrap();
        let store = OptionStore::new(StoreConfig::default(), probes);
        let err = store
            .put(&system(), OptionInput::new("region").owner(OwnerId::new()).string("eu"))
            .unwrap_err();
        assert_eq!(err.code(), "SCHEMA_NOT_FOUND");
    }

    #[test]
    fn validation_errors_are_aggregated() {
        let f = fixture();
        let owner = team(&f);
        let err = f
            .store
            .put(&system(), OptionInput::new("seats").owner(owner).number(0.5))
            .unwrap_err();
        match err {
            OptionError::Validation { key, violations } => {
                assert_eq!(key, "seats");
                assert_eq!(violations.len(), 2);
            }
            other => panic!("expected Validation, got {other:?}"),
        }
        assert!(f.store.storage().is_empty());
    }

    #[test]
    fn non_finite_number_is_shape_error() {
        let f = fixture();
        let owner = team(&f);
        let err = f
            .store
            .put(&system(), OptionInput::new("seats").owner(owner).number(f64::INFINITY))
            .unwrap_err();
        assert_eq!(err.code(), "VALUE_SHAPE");
    }

    #[test]
    fn reference_key_requires_reference() {
        let f = fixture();
        let owner = team(&f);
        let err = f
            .store
            .put(&system(), OptionInput::new("logo").owner(owner).string("x"))
            .unwrap_err();
        assert_eq!(err.code(), "VALUE_SHAPE");

        let file = Uuid::new_v4();
        f.files.insert(file);
        let id = f
            .store
            .put(&system(), OptionInput::new("logo").owner(owner).reference(file))
            .unwrap();
        assert_eq!(f.store.get(id).unwrap().reference_id, Some(file));
    }

    #[test]
    fn scalar_key_rejects_reference() {
        let f = fixture();
        let owner = team(&f);
        let err = f
            .store
            .put(&system(), OptionInput::new("region").owner(owner).reference(Uuid::new_v4()))
            .unwrap_err();
        assert_eq!(err.code(), "VALUE_SHAPE");
    }

    #[test]
    fn update_keeps_created_at_and_skips_self_in_uniqueness() {
        let f = fixture();
        let owner = team(&f);
        let id = f
            .store
            .put(&system(), OptionInput::new("region").owner(owner).string("eu"))
            .unwrap();
        let created = f.store.get(id).unwrap().created_at;
        let same = f
            .store
            .put(
                &system(),
                OptionInput::new("region").owner(owner).string("us").with_id(id),
            )
            .unwrap();
        assert_eq!(same, id);
        let record = f.store.get(id).unwrap();
        assert_eq!(record.string_value.as_deref(), Some("us"));
        assert_eq!(record.created_at, created);
        assert_eq!(f.store.storage().len(), 1);
    }

    #[test]
    fn user_defaults_from_caller() {
        let f = fixture();
        let user = UserId::new();
        let ctx = CallerContext::user(user, Role::Editor);
        let id = f.store.put(&ctx, OptionInput::new("motd").string("hi")).unwrap();
        assert_eq!(f.store.get(id).unwrap().user_id, Some(user));

        let other = UserId::new();
        let id = f
            .store
            .put(&ctx, OptionInput::new("motd").string("hey").user(other).with_id(id))
            .unwrap();
        assert_eq!(f.store.get(id).unwrap().user_id, Some(other));
    }

    #[test]
    fn delete_removes_or_reports_missing() {
        let f = fixture();
        let id = f
            .store
            .put(&system(), OptionInput::new("motd").string("hi"))
            .unwrap();
        let removed = f.store.delete(&system(), id).unwrap();
        assert_eq!(removed.key, "motd");
        assert!(f.store.get(id).is_none());
        assert_eq!(
            f.store.delete(&system(), id).unwrap_err(),
            OptionError::RecordNotFound(id)
        );
    }

    #[test]
    fn authorization_runs_before_everything() {
        let f = fixture();
        let store = f.store.clone().with_authorizer(RequireRole::default());
        let viewer = CallerContext::user(UserId::new(), Role::Viewer);
        let err = store.put(&viewer, OptionInput::new("")).unwrap_err();
        assert!(err.is_authorization());

        let editor = CallerContext::user(UserId::new(), Role::Editor);
        let err = store.delete(&editor, OptionId::new()).unwrap_err();
        assert_eq!(err.code(), "FORBIDDEN");
    }
}
