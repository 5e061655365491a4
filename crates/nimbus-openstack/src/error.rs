// Copyright (C) 2026  winnyboy5
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program.  If not, see <https://www.gnu.org/licenses/>.

//! OpenStack API error types

use thiserror::Error;

/// Result type alias for OpenStack API calls
pub type ApiResult<T> = Result<T, ApiError>;

/// Errors that can occur while talking to OpenStack
#[derive(Error, Debug)]
pub enum ApiError {
    /// Keystone rejected the credentials or returned no token
    #[error("authentication failed: {0}")]
    Auth(String),

    /// Transport level failure
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Non-success status other than 404
    #[error("unexpected status {status} from {url}")]
    Status { status: u16, url: String },

    /// Response body did not match the expected shape
    #[error("failed to decode response from {url}: {source}")]
    Decode {
        url: String,
        #[source]
        source: serde_json::Error,
    },

    /// Service type not present in the token catalog for the region
    #[error("no public {0} endpoint in the service catalog")]
    MissingEndpoint(String),

    /// Requested resource does not exist
    #[error("resource not found: {0}")]
    NotFound(String),
}

impl ApiError {
    /// Create an Auth error with context
    pub fn auth<S: Into<String>>(msg: S) -> Self {
        ApiError::Auth(msg.into())
    }

    /// Create a NotFound error for the given URL or id
    pub fn not_found<S: Into<String>>(what: S) -> Self {
        ApiError::NotFound(what.into())
    }

    /// Create a Decode error for a body received from `url`
    pub fn decode<S: Into<String>>(url: S, source: serde_json::Error) -> Self {
        ApiError::Decode {
            url: url.into(),
            source,
        }
    }

    /// Check if this is a NotFound error
    pub fn is_not_found(&self) -> bool {
        matches!(self, ApiError::NotFound(_))
    }

    /// Check if the server answered 401
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, ApiError::Status { status: 401, .. })
    }
}
