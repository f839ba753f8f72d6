//! Common types used throughout tap-insightly
//!
//! This module contains shared type definitions and type aliases
//! used across multiple modules.

use serde::{Deserialize, Serialize};

// ============================================================================
// Type Aliases
// ============================================================================

/// JSON value type (re-exported from serde_json)
pub type JsonValue = serde_json::Value;

/// JSON object type
pub type JsonObject = serde_json::Map<String, JsonValue>;

/// A single record of a resource, keyed by field name
pub type Row = JsonObject;

/// One page of rows as returned by a single API call
pub type Page = Vec<Row>;

// ============================================================================
// Failure Policy
// ============================================================================

/// How the orchestrator reacts when one resource's primary sync fails
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// Let sibling resource workers run to completion, then report the failure
    #[default]
    WaitAll,
    /// Cancel sibling resource workers as soon as one fails
    FailFast,
}
