//! Uniform JSON response envelope.
//!
//! Every endpoint answers with the same outer shape. Nothing in it varies per
//! request, so two identical failures render byte-identical bodies.

use std::sync::Arc;

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{ApiError, AppError};

/// Value of `service_name` in every envelope.
pub const SERVICE_NAME: &str = "crux-backend";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Success,
    Error,
}

/// `error` member of a failed envelope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Envelope<T> {
    pub service_name: String,
    pub version: String,
    pub environment: String,
    pub api_name: String,
    pub status: Status,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorBody>,
}

/// Deployment facts stamped onto every envelope.
#[derive(Debug, Clone)]
pub struct EnvelopeMeta {
    version: Arc<str>,
    environment: Arc<str>,
}

impl EnvelopeMeta {
    pub fn new(version: &str, environment: &str) -> Self {
        Self {
            version: Arc::from(version),
            environment: Arc::from(environment),
        }
    }

    /// Scope responses to one named API.
    pub fn api(&self, name: &'static str) -> Api {
        Api {
            meta: self.clone(),
            name,
        }
    }
}

/// Response builder for a single named API (`login`, `create_user`, ...).
#[derive(Debug, Clone)]
pub struct Api {
    meta: EnvelopeMeta,
    name: &'static str,
}

impl Api {
    pub fn name(&self) -> &'static str {
        self.name
    }

    pub(crate) fn envelope<T>(
        &self,
        status: Status,
        message: &str,
        data: Option<T>,
        error: Option<ErrorBody>,
    ) -> Envelope<T> {
        Envelope {
            service_name: SERVICE_NAME.to_string(),
            version: self.meta.version.to_string(),
            environment: self.meta.environment.to_string(),
            api_name: self.name.to_string(),
            status,
            message: message.to_string(),
            data,
            error,
        }
    }

    /// Successful envelope carrying `data`.
    pub fn success<T: Serialize>(&self, status: StatusCode, message: &str, data: T) -> Response {
        info!(api = self.name, status = status.as_u16(), "API response success");
        (status, Json(self.envelope(Status::Success, message, Some(data), None))).into_response()
    }

    /// Attach this API's name to an error so it renders as an envelope.
    pub fn fail(&self, error: impl Into<AppError>) -> ApiError {
        ApiError {
            api: self.clone(),
            error: error.into(),
        }
    }
}
