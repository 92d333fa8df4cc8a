/// Database models for Planboard
///
/// Each model carries its own SQL as associated functions taking a `&PgPool`.
/// The engine never calls them directly; it goes through `crate::store::Store`,
/// whose Postgres backend delegates here.
///
/// # Models
///
/// - `user`: user accounts, referenced by id everywhere else
/// - `project`: projects with embedded collaborators and derived task counters
/// - `task`: tasks belonging to exactly one project
/// - `comment`: task comments with mentions
/// - `notification`: per-recipient notifications
/// - `activity`: append-only activity log
/// - `common`: value types shared by several models

pub mod activity;
pub mod comment;
pub mod common;
pub mod notification;
pub mod project;
pub mod task;
pub mod user;

pub use activity::{Activity, ActivityAction, NewActivity};
pub use comment::{Comment, NewComment};
pub use common::{EntityKind, Priority};
pub use notification::{NewNotification, Notification, NotificationType, RelatedEntity};
pub use project::{Collaborator, CollaboratorRole, NewProject, Project, ProjectPatch, ProjectStatus};
pub use task::{NewTask, Task, TaskCounts, TaskPatch, TaskStatus};
pub use user::{CreateUser, User, UserSummary};
