//! SPDX-FileCopyrightText: © 2025 Cory Parent <goedelsoup+palisade@goedelsoup.io>
//! SPDX-License-Identifier: Apache-2.0
//!

//! Security context passed into permission evaluation

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The requesting user, as resolved by authentication
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserRef {
    /// User id
    pub id: String,

    /// Role name the user holds
    pub role: String,
}

/// The resource a request operates on, when one is in scope
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceRef {
    /// Resource id
    pub id: String,

    /// Id of the user owning the resource
    pub owner_id: String,
}

/// Everything condition evaluation may consult about a request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityContext {
    /// Requesting user
    pub user: UserRef,

    /// Resource under test, if the route resolved one
    pub resource: Option<ResourceRef>,

    /// Client IP address
    pub ip_address: String,

    /// Client user agent
    pub user_agent: String,

    /// When the context was captured
    pub timestamp: DateTime<Utc>,
}

impl SecurityContext {
    /// Create a context for a request without a resolved resource
    pub fn new(user_id: &str, role: &str, ip_address: &str, user_agent: &str) -> Self {
        Self {
            user: UserRef {
                id: user_id.to_string(),
                role: role.to_string(),
            },
            resource: None,
            ip_address: ip_address.to_string(),
            user_agent: user_agent.to_string(),
            timestamp: Utc::now(),
        }
    }

    /// Attach the resource under test
    pub fn with_resource(mut self, resource: ResourceRef) -> Self {
        self.resource = Some(resource);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_context_construction() {
        let ctx = SecurityContext::new("u-1", "student", "10.0.0.1", "test-agent");
        assert_eq!(ctx.user.id, "u-1");
        assert_eq!(ctx.user.role, "student");
        assert!(ctx.resource.is_none());

        let ctx = ctx.with_resource(ResourceRef {
            id: "doc-9".to_string(),
            owner_id: "u-1".to_string(),
        });
        assert_eq!(ctx.resource.unwrap().owner_id, "u-1");
    }
}
