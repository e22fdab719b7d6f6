/*!
 * # Role-Based Location Access
 *
 * The scoping core of the API. Maps an authenticated user's role and
 * assigned location anchor to:
 *
 * - a permission set ([`role_permissions`]),
 * - a resolved scope ([`resolve_scope`]),
 * - a scoped database constraint ([`scoped_condition`]),
 * - a client-side visibility decision ([`is_accessible`] / [`filter_accessible`]).
 *
 * Everything here is a pure, synchronous function of its inputs; the
 * asynchronous database query issued with the built constraint lives in
 * the service layer.
 */

use thiserror::Error;

mod constraint;
mod role;
mod scope;
mod visibility;

pub use constraint::{level_column, scope_condition, scoped_condition};
pub use role::{role_permissions, Capability, PermissionSet, Role};
pub use scope::{resolve_scope, verify_scope_consistency, AccessScope, ResolvedScope};
pub use visibility::{filter_accessible, is_accessible, Located};

use crate::locations::LocationLevel;

/// Failures of the access core. All of these signal broken user data and
/// are surfaced to the caller; none are recovered from internally.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AccessError {
    /// Role string outside the closed set of six. A well-formed user
    /// record can never produce this, so it means corrupted storage.
    #[error("unknown role '{0}'")]
    UnknownRole(String),

    /// The role requires a location anchor and none is assigned. Comes
    /// back as access denied, and is logged as a data-integrity signal:
    /// a properly approved user always has a complete scope.
    #[error("role '{role}' requires a {level} anchor but the access scope has none")]
    MissingScope { role: Role, level: LocationLevel },

    /// The assigned scope contradicts the location tree. Refuse rather
    /// than fall back to unrestricted (privilege escalation) or to no
    /// access (silent lockout masking the corruption).
    #[error("access scope for role '{role}' is inconsistent: {detail}")]
    InconsistentScope { role: Role, detail: String },
}
