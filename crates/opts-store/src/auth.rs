//! # Authorization Gate
//!
//! The first interceptor on every write. The store asks the configured
//! [`Authorizer`] before touching schemas or storage; a denial aborts the
//! write and surfaces as [`crate::OptionError::Authorization`], distinct
//! from every validation failure.
//!
//! The caller's identity also feeds the write itself: a record written
//! without an explicit `userId` is attributed to `CallerContext::user_id`.

use opts_core::{OptionId, OwnerId, UserId};
use serde::{Deserialize, Serialize};
use thiserror::Error;

// ── Role ────────────────────────────────────────────────────────────────────

/// Caller roles, ordered by privilege: `Viewer < Editor < Admin`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Read-only access.
    Viewer,
    /// May write options.
    Editor,
    /// Full access, including deletes.
    Admin,
}

impl Role {
    /// String form of the role.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Viewer => "viewer",
            Self::Editor => "editor",
            Self::Admin => "admin",
        }
    }
}

// ── CallerContext ───────────────────────────────────────────────────────────

/// Identity of whoever is performing the operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallerContext {
    /// The authenticated user, `None` for internal/system writes.
    pub user_id: Option<UserId>,
    /// The caller's role.
    pub role: Role,
}

impl CallerContext {
    /// An authenticated user with a role.
    pub fn user(user_id: UserId, role: Role) -> Self {
        Self {
            user_id: Some(user_id),
            role,
        }
    }

    /// Internal caller with full privileges and no user attribution.
    pub fn system() -> Self {
        Self {
            user_id: None,
            role: Role::Admin,
        }
    }

    /// Whether the caller has at least `minimum`.
    pub fn has_role(&self, minimum: Role) -> bool {
        self.role >= minimum
    }
}

// ── Actions ─────────────────────────────────────────────────────────────────

/// The write being authorized.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteAction {
    /// Insert or update an option.
    Put {
        /// Option key.
        key: String,
        /// Owner, `None` for a global option.
        owner_id: Option<OwnerId>,
    },
    /// Delete an option.
    Delete {
        /// The record being deleted.
        id: OptionId,
    },
}

impl WriteAction {
    fn name(&self) -> &'static str {
        match self {
            Self::Put { .. } => "put",
            Self::Delete { .. } => "delete",
        }
    }
}

/// Rejection from the authorization gate.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("forbidden: {reason}")]
pub struct AuthorizationDenied {
    /// Why the caller was rejected.
    pub reason: String,
}

impl AuthorizationDenied {
    /// A denial with the given reason.
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

/// Decides whether a caller may perform a write.
pub trait Authorizer: Send + Sync {
    /// `Ok(())` to let the write proceed.
    fn authorize(&self, ctx: &CallerContext, action: &WriteAction) -> Result<(), AuthorizationDenied>;
}

/// Permits every write. For embedders that authorize upstream.
#[derive(Debug, Clone, Copy, Default)]
pub struct AllowAll;

impl Authorizer for AllowAll {
    fn authorize(&self, _ctx: &CallerContext, _action: &WriteAction) -> Result<(), AuthorizationDenied> {
        Ok(())
    }
}

/// Role thresholds for puts and deletes.
#[derive(Debug, Clone, Copy)]
pub struct RequireRole {
    /// Minimum role to insert or update.
    pub put: Role,
    /// Minimum role to delete.
    pub delete: Role,
}

impl Default for RequireRole {
    fn default() -> Self {
        Self {
            put: Role::Editor,
            delete: Role::Admin,
        }
    }
}

impl Authorizer for RequireRole {
    fn authorize(&self, ctx: &CallerContext, action: &WriteAction) -> Result<(), AuthorizationDenied> {
        let minimum = match action {
            WriteAction::Put { .. } => self.put,
            WriteAction::Delete { .. } => self.delete,
        };
        if ctx.has_role(minimum) {
            Ok(())
        } else {
            Err(AuthorizationDenied::new(format!(
                "role '{}' required to {}, caller has '{}'",
                minimum.as_str(),
                action.name(),
                ctx.role.as_str()
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn put() -> WriteAction {
        WriteAction::Put {
            key: "region".into(),
            owner_id: None,
        }
    }

    #[test]
    fn roles_are_ordered() {
        assert!(Role::Viewer < Role::Editor);
        assert!(Role::Editor < Role::Admin);
        assert!(CallerContext::system().has_role(Role::Admin));
    }

    #[test]
    fn require_role_defaults() {
        let gate = RequireRole::default();
        let editor = CallerContext::user(UserId::new(), Role::Editor);
        assert!(gate.authorize(&editor, &put()).is_ok());
        let err = gate
            .authorize(&editor, &WriteAction::Delete { id: OptionId::new() })
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "forbidden: role 'admin' required to delete, caller has 'editor'"
        );
    }

    #[test]
    fn viewer_cannot_put() {
        let viewer = CallerContext::user(UserId::new(), Role::Viewer);
        assert!(RequireRole::default().authorize(&viewer, &put()).is_err());
        assert!(AllowAll.authorize(&viewer, &put()).is_ok());
    }
}
