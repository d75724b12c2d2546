// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Remote API abstraction.
//!
//! Provides a trait-based seam over the fitness API so that:
//! - [`HttpRemote`] talks to the real REST server
//! - tests substitute an in-memory mock
//!
//! Each action kind maps to exactly one HTTP operation. Failures are split
//! into transient ones, which are retried on the next drain, and rejections,
//! which count toward dead-lettering.

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use reqwest::Client;
use serde_json::Value;
use tracing::debug;

use fitsync_core::{ActionPayload, Collection};

/// Error type for remote operations.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RemoteError {
    /// Connection failure, timeout, or a server-side error. Retryable.
    #[error("transient failure: {0}")]
    Transient(String),

    /// The remote refused the request. Retrying the same payload will not help.
    #[error("rejected with status {status}: {message}")]
    Rejected { status: u16, message: String },
}

impl RemoteError {
    /// Classifies a non-success HTTP status.
    pub fn from_status(status: u16, message: impl Into<String>) -> Self {
        let message = message.into();
        match status {
            408 | 429 => RemoteError::Transient(format!("status {status}: {message}")),
            400..=499 => RemoteError::Rejected { status, message },
            _ => RemoteError::Transient(format!("status {status}: {message}")),
        }
    }

    pub fn is_transient(&self) -> bool {
        matches!(self, RemoteError::Transient(_))
    }
}

/// Result type for remote operations.
pub type RemoteResult<T> = Result<T, RemoteError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
    Put,
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
        })
    }
}

/// A single call against the remote API.
#[derive(Debug, Clone, PartialEq)]
pub struct RemoteRequest {
    pub method: Method,
    /// Path relative to the API base URL, starting with `/`. Entity ids
    /// are percent-encoded.
    pub path: String,
    pub body: Option<Value>,
}

impl RemoteRequest {
    /// The request that replays an offline action.
    pub fn for_action(payload: &ActionPayload) -> Self {
        match payload {
            ActionPayload::CreateWorkout { workout, .. } => {
                Self::send(Method::Post, "/workouts".to_string(), workout)
            }
            ActionPayload::UpdateWorkout { workout_id, changes } => {
                let path = format!("/workouts/{}", urlencoding::encode(workout_id));
                Self::send(Method::Put, path, changes)
            }
            ActionPayload::CreateExercise { exercise, .. } => {
                Self::send(Method::Post, "/exercises".to_string(), exercise)
            }
            ActionPayload::UpdateProgress { entry_id, changes } => {
                let path = format!("/progress/{}", urlencoding::encode(entry_id));
                Self::send(Method::Put, path, changes)
            }
            ActionPayload::UpdateProfile { profile } => {
                Self::send(Method::Put, "/profile".to_string(), profile)
            }
        }
    }

    /// The request that fetches a collection for preloading.
    pub fn fetch(collection: Collection) -> Self {
        let path = match collection {
            Collection::Workouts => "/workouts/recent",
            Collection::Exercises => "/exercises",
            Collection::Progress => "/progress",
            Collection::Profile => "/profile",
        };
        RemoteRequest { method: Method::Get, path: path.to_string(), body: None }
    }

    fn send(method: Method, path: String, body: &Value) -> Self {
        RemoteRequest { method, path, body: Some(body.clone()) }
    }
}

impl fmt::Display for RemoteRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.method, self.path)
    }
}

/// The remote API the engine replays actions against.
pub trait Remote: Send + Sync {
    /// Executes a request, returning the server's representation of the
    /// affected entity (`null` when the response has no body).
    fn execute(
        &self,
        request: RemoteRequest,
    ) -> Pin<Box<dyn Future<Output = RemoteResult<Value>> + Send + '_>>;
}

impl<R: Remote + ?Sized> Remote for Arc<R> {
    fn execute(
        &self,
        request: RemoteRequest,
    ) -> Pin<Box<dyn Future<Output = RemoteResult<Value>> + Send + '_>> {
        (**self).execute(request)
    }
}

/// REST implementation using reqwest.
pub struct HttpRemote {
    client: Client,
    base_url: String,
    auth_token: Option<String>,
}

impl HttpRemote {
    /// Creates a client for the API at `base_url`.
    pub fn new(
        base_url: impl Into<String>,
        timeout: Duration,
        auth_token: Option<String>,
    ) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(HttpRemote { client, base_url: base_url.into(), auth_token })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), path)
    }
}

impl Remote for HttpRemote {
    fn execute(
        &self,
        request: RemoteRequest,
    ) -> Pin<Box<dyn Future<Output = RemoteResult<Value>> + Send + '_>> {
        Box::pin(async move {
            let url = self.url(&request.path);
            let mut builder = match request.method {
                Method::Get => self.client.get(&url),
                Method::Post => self.client.post(&url),
                Method::Put => self.client.put(&url),
            };
            if let Some(token) = &self.auth_token {
                builder = builder.bearer_auth(token);
            }
            if let Some(body) = &request.body {
                builder = builder.json(body);
            }

            let response =
                builder.send().await.map_err(|e| RemoteError::Transient(e.to_string()))?;
            let status = response.status();
            let bytes = response.bytes().await.map_err(|e| RemoteError::Transient(e.to_string()))?;
            debug!(%request, status = status.as_u16(), "remote responded");

            if !status.is_success() {
                let message = String::from_utf8_lossy(&bytes).trim().to_string();
                return Err(RemoteError::from_status(status.as_u16(), message));
            }
            if bytes.iter().all(u8::is_ascii_whitespace) {
                return Ok(Value::Null);
            }
            serde_json::from_slice(&bytes)
                .map_err(|e| RemoteError::Transient(format!("malformed response body: {e}")))
        })
    }
}
