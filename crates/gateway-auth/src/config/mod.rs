//! SPDX-FileCopyrightText: © 2025 Cory Parent <goedelsoup+palisade@goedelsoup.io>
//! SPDX-License-Identifier: Apache-2.0
//!

//! Authentication configuration module

pub mod auth;
pub mod jwt;
pub mod rbac;
pub mod session;
pub mod users;

// Re-export commonly used types
pub use auth::AuthConfig;
pub use jwt::JwtConfig;
pub use rbac::RbacConfig;
pub use session::SessionConfig;
pub use users::{PasswordComplexity, UserConfig};
