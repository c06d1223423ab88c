//! Tool trait definition
//!
//! All tools implement this trait to provide a consistent interface, and
//! each registered tool gets an immutable [`ToolDescriptor`] recording the
//! permissions it needs.

use std::collections::BTreeSet;

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::auth::CallContext;
use crate::permissions::PermissionSet;

/// Content type for tool results
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ToolResultData {
    /// Text content
    Text(String),
    /// Structured JSON returned by the remote API
    Json(Value),
}

/// Result of executing a tool
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolResult {
    /// The content of the tool result
    pub content: ToolResultData,
    /// Whether the tool execution resulted in an error
    pub is_error: bool,
}

impl ToolResult {
    /// Create a successful tool result with text content
    pub fn success(output: impl Into<String>) -> Self {
        Self {
            content: ToolResultData::Text(output.into()),
            is_error: false,
        }
    }

    /// Create a successful tool result carrying JSON
    pub fn json(value: Value) -> Self {
        Self {
            content: ToolResultData::Json(value),
            is_error: false,
        }
    }

    /// Create an error tool result
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            content: ToolResultData::Text(message.into()),
            is_error: true,
        }
    }

    /// Render the content as text for the calling protocol
    pub fn to_text(&self) -> String {
        match &self.content {
            ToolResultData::Text(text) => text.clone(),
            ToolResultData::Json(value) => {
                serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
            }
        }
    }
}

/// Permissions a tool needs before a caller may see or use it
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequiredPermissions {
    /// Every permission in the set must be granted; empty means unrestricted
    Set(BTreeSet<String>),
    /// The permission metadata could not be read; never satisfiable
    Malformed(String),
}

impl RequiredPermissions {
    /// No permissions required
    pub fn none() -> Self {
        Self::Set(BTreeSet::new())
    }

    pub fn of<I, S>(permissions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Set(permissions.into_iter().map(Into::into).collect())
    }

    /// Read requirements from loosely typed metadata
    ///
    /// `null` means none; an array of non-empty strings is a requirement
    /// set; anything else is malformed.
    pub fn from_metadata(value: &Value) -> Self {
        match value {
            Value::Null => Self::none(),
            Value::Array(items) => {
                let mut permissions = BTreeSet::new();
                for item in items {
                    match item.as_str() {
                        Some(permission) if !permission.is_empty() => {
                            permissions.insert(permission.to_string());
                        }
                        _ => {
                            return Self::Malformed(format!(
                                "expected a non-empty string, found {}",
                                item
                            ))
                        }
                    }
                }
                Self::Set(permissions)
            }
            other => Self::Malformed(format!("expected an array of strings, found {}", other)),
        }
    }

    /// Whether `granted` covers every requirement
    pub fn is_satisfied_by(&self, granted: &PermissionSet) -> bool {
        match self {
            Self::Set(required) => granted.contains_all(required),
            Self::Malformed(_) => false,
        }
    }

    pub fn is_malformed(&self) -> bool {
        matches!(self, Self::Malformed(_))
    }
}

/// Registration-time record of a tool's name and requirements
///
/// Fields are private and there are no setters: requirements cannot change
/// after registration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolDescriptor {
    name: String,
    required_permissions: RequiredPermissions,
}

impl ToolDescriptor {
    pub fn new(name: impl Into<String>, required_permissions: RequiredPermissions) -> Self {
        Self {
            name: name.into(),
            required_permissions,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn required_permissions(&self) -> &RequiredPermissions {
        &self.required_permissions
    }
}

/// Trait for tools exposed to the calling protocol
#[async_trait]
pub trait Tool: Send + Sync {
    /// Get the name of this tool
    fn name(&self) -> &str;

    /// Get a description of this tool
    fn description(&self) -> &str;

    /// JSON schema of the tool's input object
    fn input_schema(&self) -> Value;

    /// Permissions the caller must hold to see and use this tool
    fn required_permissions(&self) -> RequiredPermissions {
        RequiredPermissions::none()
    }

    /// Execute the tool with the given input
    ///
    /// Remote calls made here must be authenticated with `ctx`.
    async fn execute(&self, ctx: &CallContext, input: &Value) -> Result<ToolResult>;
}
