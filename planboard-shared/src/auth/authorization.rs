/// Ownership-based authorization
///
/// # Permission Model
///
/// 1. **Existence**: a missing entity is reported as `NotFound` before any
///    permission is evaluated.
/// 2. **Ownership**: create/update/delete on a project or task require the
///    requester to be the entity's `owner_id`. Collaborators do not pass.
/// 3. **Visibility**: reads are allowed for the project owner and its
///    collaborators; for tasks also for the task owner and its assignees.
///
/// # Example
///
/// ```
/// use planboard_shared::auth::authorization::{authorize_owner, AuthzError};
/// use planboard_shared::models::{EntityKind, Project};
/// use uuid::Uuid;
///
/// fn check(requester: Uuid, id: Uuid, found: Option<Project>) -> Result<Project, AuthzError> {
///     authorize_owner(requester, EntityKind::Project, id, found)
/// }
/// ```

use uuid::Uuid;

use crate::models::{EntityKind, Project, Task};

/// Error type for authorization checks
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthzError {
    /// The entity id does not resolve
    #[error("{kind} {id} not found")]
    NotFound { kind: EntityKind, id: Uuid },

    /// Requester is not the entity owner
    #[error("Only the owner can perform this action")]
    NotOwner,

    /// Requester cannot see the entity
    #[error("Not authorized to access this resource")]
    NoAccess,
}

/// Entities carrying an owner for authorization purposes
pub trait Owned {
    fn owner_id(&self) -> Uuid;
}

impl Owned for Project {
    fn owner_id(&self) -> Uuid {
        self.owner_id
    }
}

impl Owned for Task {
    fn owner_id(&self) -> Uuid {
        self.owner_id
    }
}

/// Unwraps a lookup result, reporting a missing entity as `NotFound`
pub fn require_found<E>(kind: EntityKind, id: Uuid, entity: Option<E>) -> Result<E, AuthzError> {
    entity.ok_or(AuthzError::NotFound { kind, id })
}

/// Strict equality between requester and owner
pub fn require_ownership<E: Owned>(requester_id: Uuid, entity: &E) -> Result<(), AuthzError> {
    if entity.owner_id() != requester_id {
        return Err(AuthzError::NotOwner);
    }

    Ok(())
}

/// Existence check followed by ownership check
pub fn authorize_owner<E: Owned>(
    requester_id: Uuid,
    kind: EntityKind,
    id: Uuid,
    entity: Option<E>,
) -> Result<E, AuthzError> {
    let entity = require_found(kind, id, entity)?;
    require_ownership(requester_id, &entity)?;
    Ok(entity)
}

/// Project owner or collaborator
pub fn require_project_access(requester_id: Uuid, project: &Project) -> Result<(), AuthzError> {
    if !project.has_access(requester_id) {
        return Err(AuthzError::NoAccess);
    }

    Ok(())
}

/// Task owner, task assignee, or anyone with access to the task's project
///
/// `project` is `None` when the task points at a project that no longer
/// exists; only the task owner and assignees keep access then.
pub fn require_task_access(
    requester_id: Uuid,
    task: &Task,
    project: Option<&Project>,
) -> Result<(), AuthzError> {
    let allowed = task.owner_id == requester_id
        || task.is_assignee(requester_id)
        || project.map(|p| p.has_access(requester_id)).unwrap_or(false);

    if !allowed {
        return Err(AuthzError::NoAccess);
    }

    Ok(())
}
