//! Error types for manager operations.
//!
//! This module defines the error types used throughout the manager crates.
//! All errors implement `std::error::Error` via `thiserror`.

use std::io;
use thiserror::Error;

/// Result type alias for manager operations.
pub type RouteMgrResult<T> = Result<T, RouteMgrError>;

/// Errors that can occur during manager operations.
#[derive(Debug, Error)]
pub enum RouteMgrError {
    /// Failed to execute a shell command (spawn error).
    #[error("Failed to execute shell command '{command}': {source}")]
    ShellExec {
        /// The command that failed to execute.
        command: String,
        /// The underlying IO error.
        #[source]
        source: io::Error,
    },

    /// Shell command returned non-zero exit code.
    #[error("Shell command failed: '{command}' (exit code {exit_code}): {output}")]
    ShellCommandFailed {
        /// The command that failed.
        command: String,
        /// The exit code.
        exit_code: i32,
        /// Combined stdout/stderr output.
        output: String,
    },

    /// Egress NAT rule installation failed. Without the rule, outbound
    /// traffic from pods leaves the node untranslated.
    #[error("Failed to install egress NAT rule in chain '{chain}': {reason}. External connectivity from pods will not work")]
    EgressInstall {
        /// The chain the rule was being appended to.
        chain: String,
        /// The underlying cause.
        reason: String,
    },

    /// Egress NAT rule existence check failed.
    #[error("Failed to look up egress NAT rule in chain '{chain}': {reason}")]
    EgressLookup {
        /// The chain that was being queried.
        chain: String,
        /// The underlying cause.
        reason: String,
    },

    /// Egress NAT rule deletion failed. The stale rule is left behind but
    /// current traffic is not necessarily affected.
    #[error("Failed to delete egress NAT rule from chain '{chain}': {reason}. Pod egress might still work")]
    EgressDelete {
        /// The chain the rule was being removed from.
        chain: String,
        /// The underlying cause.
        reason: String,
    },

    /// Configuration validation error.
    #[error("Invalid configuration for {field}: {message}")]
    InvalidConfig {
        /// The field that failed validation.
        field: String,
        /// Error message.
        message: String,
    },

    /// Internal error (unexpected state).
    #[error("Internal error: {message}")]
    Internal {
        /// Error message.
        message: String,
    },
}

impl RouteMgrError {
    /// Creates an egress rule installation error.
    pub fn egress_install(chain: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::EgressInstall {
            chain: chain.into(),
            reason: reason.into(),
        }
    }

    /// Creates an egress rule lookup error.
    pub fn egress_lookup(chain: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::EgressLookup {
            chain: chain.into(),
            reason: reason.into(),
        }
    }

    /// Creates an egress rule deletion error.
    pub fn egress_delete(chain: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::EgressDelete {
            chain: chain.into(),
            reason: reason.into(),
        }
    }

    /// Creates an invalid configuration error.
    pub fn invalid_config(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidConfig {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Creates an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Returns true if this error indicates a transient condition
    /// that may succeed on the next reconciliation tick.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            RouteMgrError::ShellCommandFailed { .. }
                | RouteMgrError::EgressInstall { .. }
                | RouteMgrError::EgressLookup { .. }
                | RouteMgrError::EgressDelete { .. }
        )
    }
}
