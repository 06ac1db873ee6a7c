// SPDX-License-Identifier: MIT

//! The JSON error envelope every non-2xx response uses, and the
//! kind-to-status mapping table from SPEC_FULL.md §6:
//!
//! | kind                 | status |
//! |-----------------------|--------|
//! | not_found              | 404    |
//! | conflict               | 409    |
//! | invalid_argument       | 400    |
//! | unauthorized           | 401    |
//! | rate_limited           | 429    |
//! | backend_unavailable    | 500    |
//! | internal               | 500    |
//!
//! Kept here rather than in `hearth-daemon` so the mapping is defined once
//! and the same crate that names the `kind` strings (by re-exporting
//! `hearth_core::CoreError::kind()`'s contract) owns the table.

use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct ErrorBody {
    pub kind: String,
    pub message: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    pub error: ErrorBody,
}

impl ErrorResponse {
    pub fn new(kind: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: ErrorBody {
                kind: kind.into(),
                message: message.into(),
            },
        }
    }

    pub fn from_core_error(err: &hearth_core::CoreError) -> Self {
        Self::new(err.kind(), err.to_string())
    }
}

/// HTTP status code for a `CoreError::kind()` string. Unknown kinds fall
/// back to 500 rather than panicking, since new kinds may be added upstream
/// without every caller of this table being updated in lockstep.
pub fn status_code_for_kind(kind: &str) -> u16 {
    match kind {
        "not_found" => 404,
        "conflict" => 409,
        "invalid_argument" => 400,
        "unauthorized" => 401,
        "rate_limited" => 429,
        "backend_unavailable" | "internal" => 500,
        _ => 500,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_known_kinds_to_spec_status_codes() {
        assert_eq!(status_code_for_kind("not_found"), 404);
        assert_eq!(status_code_for_kind("conflict"), 409);
        assert_eq!(status_code_for_kind("invalid_argument"), 400);
        assert_eq!(status_code_for_kind("unauthorized"), 401);
        assert_eq!(status_code_for_kind("rate_limited"), 429);
        assert_eq!(status_code_for_kind("backend_unavailable"), 500);
        assert_eq!(status_code_for_kind("internal"), 500);
    }

    #[test]
    fn unknown_kind_falls_back_to_internal_error() {
        assert_eq!(status_code_for_kind("something_new"), 500);
    }

    #[test]
    fn from_core_error_preserves_kind_and_message() {
        let err = hearth_core::CoreError::not_found("automation aut_x");
        let body = ErrorResponse::from_core_error(&err);
        assert_eq!(body.error.kind, "not_found");
        assert!(body.error.message.contains("aut_x"));
    }
}
