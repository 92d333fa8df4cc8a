/// Engine error taxonomy
///
/// `NotFound`, `Forbidden`, `ValidationFailed` and `AlreadyExists` are the
/// caller-visible contract violations and are always returned. Side-effect
/// failures (notifications, activity, counters) are logged where they happen
/// and never surface through this type.

use uuid::Uuid;

use crate::auth::authorization::AuthzError;
use crate::models::EntityKind;
use crate::store::StoreError;

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("{kind} {id} not found")]
    NotFound { kind: EntityKind, id: Uuid },

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Validation failed: {0}")]
    ValidationFailed(String),

    #[error("Already exists: {0}")]
    AlreadyExists(String),

    /// A best-effort side effect failed; caught and logged by the dispatcher
    #[error("{effect} failed: {source}")]
    DependencyFailure {
        effect: &'static str,
        #[source]
        source: StoreError,
    },

    /// Primary write failed in a way that is not the caller's fault
    #[error("Storage failure: {0}")]
    Store(#[from] StoreError),
}

impl CoreError {
    pub fn not_found(kind: EntityKind, id: Uuid) -> Self {
        CoreError::NotFound { kind, id }
    }

    pub fn dependency(effect: &'static str) -> impl FnOnce(StoreError) -> Self {
        move |source| CoreError::DependencyFailure { effect, source }
    }
}

impl From<AuthzError> for CoreError {
    fn from(err: AuthzError) -> Self {
        match err {
            AuthzError::NotFound { kind, id } => CoreError::NotFound { kind, id },
            AuthzError::NotOwner | AuthzError::NoAccess => CoreError::Forbidden(err.to_string()),
        }
    }
}

pub type CoreResult<T> = Result<T, CoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_authz_errors_stay_distinct() {
        let id = Uuid::new_v4();
        let err: CoreError = AuthzError::NotFound {
            kind: EntityKind::Project,
            id,
        }
        .into();
        assert!(matches!(err, CoreError::NotFound { id: found, .. } if found == id));

        let err: CoreError = AuthzError::NotOwner.into();
        assert!(matches!(err, CoreError::Forbidden(_)));
    }
}
