//! Request and response shapes of the remote analytics API

use serde::{Deserialize, Serialize};

use crate::permissions::PermissionSet;

/// Body of `GET /api/users/me/permissions`
#[derive(Debug, Clone, Deserialize)]
pub struct UserPermissions {
    pub permissions: PermissionSet,
}

/// Body of `POST /api/sysql/v2/query`
#[derive(Debug, Clone, Serialize)]
pub struct SysqlQuery {
    pub q: String,
}

/// Query parameters of `GET /secure/events/v1/events`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct EventsQuery {
    /// Range start, nanoseconds since the epoch
    #[serde(skip_serializing_if = "Option::is_none")]
    pub from: Option<i64>,
    /// Range end, nanoseconds since the epoch
    #[serde(skip_serializing_if = "Option::is_none")]
    pub to: Option<i64>,
    /// Opaque pagination cursor; replaces the time range when set
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cursor: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filter: Option<String>,
    pub limit: u32,
}

/// Query parameters of `GET /prometheus/api/v1/query`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PromQuery {
    pub query: String,
    pub limit: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_permissions_body_decodes() {
        let body: UserPermissions =
            serde_json::from_str(r#"{"permissions": ["a.read", "b.exec"]}"#).unwrap();
        assert!(body.permissions.contains("a.read"));
        assert_eq!(body.permissions.len(), 2);
    }

    #[test]
    fn test_permissions_field_is_required() {
        assert!(serde_json::from_str::<UserPermissions>("{}").is_err());
    }
}
