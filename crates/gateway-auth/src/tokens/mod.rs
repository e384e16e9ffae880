//! SPDX-FileCopyrightText: © 2025 Cory Parent <goedelsoup+palisade@goedelsoup.io>
//! SPDX-License-Identifier: Apache-2.0
//!

//! Token issuance and validation

pub mod claims;
pub mod manager;
pub mod stats;

// Re-export commonly used types
pub use claims::{TokenClaims, TokenType};
pub use manager::{TokenManager, TokenPair};
pub use stats::TokenStats;
