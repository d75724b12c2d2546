// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Offline actions: recorded intents to mutate remote state.
//!
//! Every local mutation made by the app is captured as an [`OfflineAction`]
//! whose [`ActionPayload`] names the entity it targets and carries the
//! entity document as opaque JSON. The sync engine never looks inside the
//! document; it only needs the kind (to pick a remote operation) and the
//! [`EntityKey`] (to keep per-entity ordering).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

use crate::action_id::ActionId;
use crate::error::{Error, Result};
use crate::resolve::ConflictStrategy;

/// Key id used for the singleton profile entity.
pub const PROFILE_ENTITY_ID: &str = "profile";

/// A cached collection of domain records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Collection {
    Workouts,
    Exercises,
    Progress,
    Profile,
}

impl Collection {
    /// All collections, in display order.
    pub const ALL: [Collection; 4] =
        [Collection::Workouts, Collection::Exercises, Collection::Progress, Collection::Profile];

    /// Returns the storage key for this collection.
    pub fn as_str(&self) -> &'static str {
        match self {
            Collection::Workouts => "workouts",
            Collection::Exercises => "exercises",
            Collection::Progress => "progress",
            Collection::Profile => "profile",
        }
    }

    /// Returns true if the collection holds a list of records with ids.
    pub fn is_list(&self) -> bool {
        !matches!(self, Collection::Profile)
    }

    /// The value read back for a collection that was never cached.
    pub fn empty_value(&self) -> Value {
        if self.is_list() {
            Value::Array(Vec::new())
        } else {
            Value::Null
        }
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Collection {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "workouts" => Ok(Collection::Workouts),
            "exercises" => Ok(Collection::Exercises),
            "progress" => Ok(Collection::Progress),
            "profile" => Ok(Collection::Profile),
            _ => Err(Error::InvalidCollection(s.to_string())),
        }
    }
}

/// Identifies the logical entity an action targets.
///
/// Two actions with equal keys must reach the remote in creation order.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EntityKey {
    pub collection: Collection,
    pub id: String,
}

impl EntityKey {
    pub fn new(collection: Collection, id: impl Into<String>) -> Self {
        EntityKey { collection, id: id.into() }
    }

    /// The key of the singleton profile entity.
    pub fn profile() -> Self {
        EntityKey::new(Collection::Profile, PROFILE_ENTITY_ID)
    }
}

impl fmt::Display for EntityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.collection, self.id)
    }
}

/// The kind of an action, without its payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActionKind {
    CreateWorkout,
    UpdateWorkout,
    CreateExercise,
    UpdateProgress,
    UpdateProfile,
}

impl ActionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActionKind::CreateWorkout => "create_workout",
            ActionKind::UpdateWorkout => "update_workout",
            ActionKind::CreateExercise => "create_exercise",
            ActionKind::UpdateProgress => "update_progress",
            ActionKind::UpdateProfile => "update_profile",
        }
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ActionKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "create_workout" => Ok(ActionKind::CreateWorkout),
            "update_workout" => Ok(ActionKind::UpdateWorkout),
            "create_exercise" => Ok(ActionKind::CreateExercise),
            "update_progress" => Ok(ActionKind::UpdateProgress),
            "update_profile" => Ok(ActionKind::UpdateProfile),
            _ => Err(Error::InvalidActionKind(s.to_string())),
        }
    }
}

/// Payload describing the specific mutation being recorded.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ActionPayload {
    /// Create a workout; `local_id` is the temporary id used in the cache.
    CreateWorkout { local_id: String, workout: Value },

    /// Update fields of an existing workout.
    UpdateWorkout { workout_id: String, changes: Value },

    /// Create a custom exercise; `local_id` is the temporary cache id.
    CreateExercise { local_id: String, exercise: Value },

    /// Update a progress entry (body weight, measurements, ...).
    UpdateProgress { entry_id: String, changes: Value },

    /// Replace or patch the user profile.
    UpdateProfile { profile: Value },
}

impl ActionPayload {
    /// Creates a CreateWorkout payload.
    pub fn create_workout(local_id: impl Into<String>, workout: Value) -> Self {
        ActionPayload::CreateWorkout { local_id: local_id.into(), workout }
    }

    /// Creates an UpdateWorkout payload.
    pub fn update_workout(workout_id: impl Into<String>, changes: Value) -> Self {
        ActionPayload::UpdateWorkout { workout_id: workout_id.into(), changes }
    }

    /// Creates a CreateExercise payload.
    pub fn create_exercise(local_id: impl Into<String>, exercise: Value) -> Self {
        ActionPayload::CreateExercise { local_id: local_id.into(), exercise }
    }

    /// Creates an UpdateProgress payload.
    pub fn update_progress(entry_id: impl Into<String>, changes: Value) -> Self {
        ActionPayload::UpdateProgress { entry_id: entry_id.into(), changes }
    }

    /// Creates an UpdateProfile payload.
    pub fn update_profile(profile: Value) -> Self {
        ActionPayload::UpdateProfile { profile }
    }

    pub fn kind(&self) -> ActionKind {
        match self {
            ActionPayload::CreateWorkout { .. } => ActionKind::CreateWorkout,
            ActionPayload::UpdateWorkout { .. } => ActionKind::UpdateWorkout,
            ActionPayload::CreateExercise { .. } => ActionKind::CreateExercise,
            ActionPayload::UpdateProgress { .. } => ActionKind::UpdateProgress,
            ActionPayload::UpdateProfile { .. } => ActionKind::UpdateProfile,
        }
    }

    /// Returns the entity this payload targets.
    pub fn entity(&self) -> EntityKey {
        match self {
            ActionPayload::CreateWorkout { local_id, .. } => {
                EntityKey::new(Collection::Workouts, local_id.as_str())
            }
            ActionPayload::UpdateWorkout { workout_id, .. } => {
                EntityKey::new(Collection::Workouts, workout_id.as_str())
            }
            ActionPayload::CreateExercise { local_id, .. } => {
                EntityKey::new(Collection::Exercises, local_id.as_str())
            }
            ActionPayload::UpdateProgress { entry_id, .. } => {
                EntityKey::new(Collection::Progress, entry_id.as_str())
            }
            ActionPayload::UpdateProfile { .. } => EntityKey::profile(),
        }
    }

    /// Returns the entity document carried by the payload.
    pub fn document(&self) -> &Value {
        match self {
            ActionPayload::CreateWorkout { workout, .. } => workout,
            ActionPayload::UpdateWorkout { changes, .. } => changes,
            ActionPayload::CreateExercise { exercise, .. } => exercise,
            ActionPayload::UpdateProgress { changes, .. } => changes,
            ActionPayload::UpdateProfile { profile } => profile,
        }
    }

    /// Returns true for payloads that create a new entity under a temporary
    /// local id.
    pub fn is_create(&self) -> bool {
        matches!(self, ActionPayload::CreateWorkout { .. } | ActionPayload::CreateExercise { .. })
    }

    /// Points the payload at `new_id` if it currently targets `entity`.
    ///
    /// Returns true if the payload was rewritten.
    pub fn remap_entity(&mut self, entity: &EntityKey, new_id: &str) -> bool {
        if self.entity() != *entity {
            return false;
        }
        match self {
            ActionPayload::CreateWorkout { local_id: id, .. }
            | ActionPayload::UpdateWorkout { workout_id: id, .. }
            | ActionPayload::CreateExercise { local_id: id, .. }
            | ActionPayload::UpdateProgress { entry_id: id, .. } => {
                *id = new_id.to_string();
                true
            }
            // The profile is a singleton; its key never changes
            ActionPayload::UpdateProfile { .. } => false,
        }
    }
}

/// Whether an action is still eligible for automatic sync.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum ActionStatus {
    /// Waiting to be sent on the next drain.
    #[default]
    Pending,
    /// Excluded from automatic drains until manually retried or discarded.
    DeadLettered { reason: String, at: DateTime<Utc> },
}

/// A queued mutation that has not yet been confirmed by the remote.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OfflineAction {
    /// Unique identifier, assigned at enqueue time.
    pub id: ActionId,
    /// When the action was recorded.
    pub created_at: DateTime<Utc>,
    /// The mutation itself.
    pub payload: ActionPayload,
    /// Set once the remote has acknowledged the action; safe to purge.
    #[serde(default)]
    pub synced: bool,
    /// Number of times the remote rejected the action.
    #[serde(default)]
    pub attempts: u32,
    #[serde(default)]
    pub status: ActionStatus,
    /// The most recent failure, kept for display.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
    /// Conflict strategy override for reconciling the server response.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub strategy: Option<ConflictStrategy>,
}

impl OfflineAction {
    /// Creates a new pending action; `created_at` is taken from the id.
    pub fn new(id: ActionId, payload: ActionPayload) -> Self {
        OfflineAction {
            id,
            created_at: id.timestamp(),
            payload,
            synced: false,
            attempts: 0,
            status: ActionStatus::Pending,
            last_error: None,
            strategy: None,
        }
    }

    /// Sets a conflict strategy override.
    pub fn with_strategy(mut self, strategy: Option<ConflictStrategy>) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn kind(&self) -> ActionKind {
        self.payload.kind()
    }

    pub fn entity(&self) -> EntityKey {
        self.payload.entity()
    }

    /// Returns true if the action should be sent by the next drain.
    pub fn is_pending(&self) -> bool {
        !self.synced && self.status == ActionStatus::Pending
    }

    pub fn is_dead_lettered(&self) -> bool {
        matches!(self.status, ActionStatus::DeadLettered { .. })
    }
}

#[cfg(test)]
#[path = "action_tests.rs"]
mod tests;
