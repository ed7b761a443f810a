//! Fault taxonomy for swap admission
//!
//! Three kinds of failure leave this layer:
//! - business faults with a stable numeric code (expected in normal operation)
//! - backend faults from a chain node, Lightning node or signer
//! - cancellation observed at a checkpoint
//!
//! Malformed input is not represented here: schema validation returns `None`
//! and the caller answers with a generic 4xx.

use std::fmt;
use std::sync::Arc;

use serde::Serialize;
use thiserror::Error;

// ============================================================================
// BUSINESS FAULT CODES
// ============================================================================

/// A payment with the same hash was already seen by the Lightning backend.
pub const DUPLICATE_PAYMENT: u32 = 20010;

/// Outbound channel balance cannot cover the requested amount.
pub const NOT_ENOUGH_LIQUIDITY: u32 = 20002;

/// No single channel has enough remote-side balance for the requested amount.
pub const NOT_ENOUGH_INBOUND_LIQUIDITY: u32 = 20050;

// ============================================================================
// ERROR TYPES
// ============================================================================

/// Business-rule fault surfaced to the client with its code and message.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BusinessFault {
    /// Stable numeric code, part of the wire contract
    pub code: u32,
    /// Human readable message
    pub msg: String,
    /// Optional structured detail
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

impl BusinessFault {
    pub fn new(code: u32, msg: impl Into<String>) -> Self {
        Self {
            code,
            msg: msg.into(),
            data: None,
        }
    }

    pub fn with_data(mut self, data: serde_json::Value) -> Self {
        self.data = Some(data);
        self
    }
}

impl fmt::Display for BusinessFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (code {})", self.msg, self.code)
    }
}

/// Error returned by every precondition check and by the info endpoint.
///
/// Cloneable so an abort cause can be stored once in the controller and
/// re-raised unchanged at every checkpoint that observes it.
#[derive(Debug, Clone, Error)]
pub enum SwapError {
    #[error("{0}")]
    Business(BusinessFault),
    #[error("backend failure: {0:#}")]
    Backend(Arc<anyhow::Error>),
    #[error("operation cancelled")]
    Cancelled,
}

impl SwapError {
    pub fn business(code: u32, msg: impl Into<String>) -> Self {
        SwapError::Business(BusinessFault::new(code, msg))
    }

    /// Returns the business code, if this is a business fault.
    pub fn code(&self) -> Option<u32> {
        match self {
            SwapError::Business(fault) => Some(fault.code),
            _ => None,
        }
    }

    pub fn is_business(&self) -> bool {
        matches!(self, SwapError::Business(_))
    }
}

impl From<anyhow::Error> for SwapError {
    fn from(err: anyhow::Error) -> Self {
        SwapError::Backend(Arc::new(err))
    }
}

impl From<BusinessFault> for SwapError {
    fn from(fault: BusinessFault) -> Self {
        SwapError::Business(fault)
    }
}
