// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

use serde_json::Value;

use fitsync_core::{ActionKind, Collection, EntityKey};

use crate::error::{Error, Result};
use crate::sync::{Remote, SyncEngine};

/// Applies a change to the cache and queues it, syncing if online.
pub async fn run<R: Remote>(
    engine: &SyncEngine<R>,
    kind: ActionKind,
    id: Option<&str>,
    document: &str,
) -> Result<String> {
    let document = parse_document(document)?;
    let target = || id.ok_or(Error::IdRequired { kind: kind.as_str() });
    if id.is_some() && !needs_id(kind) {
        return Err(Error::InvalidInput(format!(
            "--id is not used by {}\n  hint: new records get a temporary id until the server assigns one",
            kind
        )));
    }

    let action = match kind {
        ActionKind::CreateWorkout => {
            let local_id = engine.create_workout(document).await?;
            return Ok(created(engine, Collection::Workouts, &local_id));
        }
        ActionKind::CreateExercise => {
            let local_id = engine.create_exercise(document).await?;
            return Ok(created(engine, Collection::Exercises, &local_id));
        }
        ActionKind::UpdateWorkout => engine.update_workout(target()?, document).await?,
        ActionKind::UpdateProgress => engine.update_progress(target()?, document).await?,
        ActionKind::UpdateProfile => engine.update_profile(document).await?,
    };

    let queued = engine.pending().iter().any(|entry| entry.id() == action.id);
    let outcome = if queued { "queued" } else { "synced" };
    Ok(format!("{} {} {} ({})", outcome, action.kind(), action.id, action.entity()))
}

fn needs_id(kind: ActionKind) -> bool {
    matches!(kind, ActionKind::UpdateWorkout | ActionKind::UpdateProgress)
}

/// Parses the record or changed fields; only JSON objects are accepted.
pub fn parse_document(text: &str) -> Result<Value> {
    let value: Value =
        serde_json::from_str(text).map_err(|e| Error::InvalidDocument(e.to_string()))?;
    if !value.is_object() {
        return Err(Error::InvalidDocument("expected a JSON object".to_string()));
    }
    Ok(value)
}

/// Reports the id the record is known by now: the server id once the
/// create was acknowledged, else the temporary one.
fn created<R: Remote>(engine: &SyncEngine<R>, collection: Collection, local_id: &str) -> String {
    let queued = engine.pending().iter().any(|entry| {
        entry.entity().is_some_and(|entity: EntityKey| entity.id == local_id)
    });
    if queued {
        return format!("created {} (queued)", local_id);
    }
    match engine.settled_id(collection, local_id) {
        Some(id) => format!("created {} (synced)", id),
        None => format!("created {} (synced)", local_id),
    }
}

#[cfg(test)]
#[path = "record_tests.rs"]
mod tests;
