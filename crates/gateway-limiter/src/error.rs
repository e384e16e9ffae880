//! SPDX-FileCopyrightText: © 2025 Cory Parent <goedelsoup+palisade@goedelsoup.io>
//! SPDX-License-Identifier: Apache-2.0
//!

//! Rate limiter error types

use thiserror::Error;

/// Rate limiter result type
pub type LimiterResult<T> = Result<T, LimiterError>;

/// Rate limiter error
#[derive(Error, Debug)]
pub enum LimiterError {
    #[error("Counter store error: {0}")]
    Store(String),

    #[error("Invalid limiter configuration: {0}")]
    Config(String),
}

impl LimiterError {
    pub fn store(msg: String) -> Self {
        Self::Store(msg)
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
        let err = LimiterError::store("connection refused".to_string());
        assert_eq!(err.to_string(), "Counter store error: connection refused");
    }
}
