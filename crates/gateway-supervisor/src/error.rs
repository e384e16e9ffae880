//! SPDX-FileCopyrightText: © 2025 Cory Parent <goedelsoup+palisade@goedelsoup.io>
//! SPDX-License-Identifier: Apache-2.0
//!

//! Supervisor error types

use thiserror::Error;

/// Supervisor result type
pub type SupervisorResult<T> = Result<T, SupervisorError>;

/// Supervisor error
#[derive(Error, Debug)]
pub enum SupervisorError {
    #[error("Failed to spawn worker: {0}")]
    Spawn(String),

    #[error("Worker probe failed: {0}")]
    Probe(String),

    #[error("Failed to signal worker: {0}")]
    Signal(String),

    #[error("Invalid supervisor configuration: {0}")]
    Config(String),
}

impl SupervisorError {
    pub fn spawn(msg: String) -> Self {
        Self::Spawn(msg)
    }

    pub fn probe(msg: String) -> Self {
        Self::Probe(msg)
    }

    pub fn signal(msg: String) -> Self {
        Self::Signal(msg)
    }

    pub fn config(msg: String) -> Self {
        Self::Config(msg)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = SupervisorError::spawn("no such file".to_string());
        assert_eq!(err.to_string(), "Failed to spawn worker: no such file");
    }
}
