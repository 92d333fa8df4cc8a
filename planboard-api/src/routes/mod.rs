/// API route handlers
///
/// This module contains all route handlers organized by resource:
///
/// - `health`: Health check endpoint
/// - `projects`: Projects and their collaborators
/// - `tasks`: Tasks, task stats and comments
/// - `notifications`: The caller's notification inbox
/// - `activities`: Project and personal activity feeds

pub mod activities;
pub mod health;
pub mod notifications;
pub mod projects;
pub mod tasks;

use serde::{Deserialize, Deserializer};

/// Distinguishes an absent field (`None`) from an explicit `null` (`Some(None)`)
///
/// Use with `#[serde(default, deserialize_with = "double_option")]` on
/// patch fields that can be cleared.
pub fn double_option<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}
