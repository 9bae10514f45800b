//! Error types for the relay's HTTP handlers
// Copyright 2025 Francisco F. Pinochet
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.


use crate::email::TemplateError;
use crate::schemas::ErrorResponse;
use crate::sender::MailError;
use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

/// Errors that terminate a relay request
#[derive(Error, Debug)]
pub enum RelayError {
    #[error("Forbidden")]
    Forbidden,

    #[error("Missing params")]
    MissingParams,

    #[error("Invalid template")]
    InvalidTemplate,

    #[error("tokens must be a non-empty array")]
    MissingTokens,

    /// Request body was not a JSON document of the expected shape
    #[error("{0}")]
    MalformedBody(String),

    #[error(transparent)]
    Template(#[from] TemplateError),

    #[error(transparent)]
    Mail(#[from] MailError),
}

impl RelayError {
    /// HTTP status reported to the caller
    pub fn status_code(&self) -> StatusCode {
        match self {
            RelayError::Forbidden => StatusCode::FORBIDDEN,
            RelayError::MissingParams | RelayError::InvalidTemplate => StatusCode::BAD_REQUEST,
            // Push validation failures have always surfaced as 500
            RelayError::MissingTokens => StatusCode::INTERNAL_SERVER_ERROR,
            RelayError::MalformedBody(_) | RelayError::Template(_) | RelayError::Mail(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl From<JsonRejection> for RelayError {
    fn from(rejection: JsonRejection) -> Self {
        RelayError::MalformedBody(rejection.body_text())
    }
}

impl IntoResponse for RelayError {
    fn into_response(self) -> Response {
        let body = ErrorResponse {
            error: self.to_string(),
        };
        (self.status_code(), Json(body)).into_response()
    }
}
