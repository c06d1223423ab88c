//! Runtime security event tools

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde::Deserialize;
use serde_json::{json, Value};

use super::tool::{RequiredPermissions, Tool, ToolResult};
use crate::auth::CallContext;
use crate::remote::{EventsQuery, RemoteClient};

/// Filter always applied to runtime event listings
const BASE_FILTER: &str = r#"source != "audittrail" and not originator in ("benchmarks","compliance","cloudsec","scanning","hostscanning")"#;
const DEFAULT_SCOPE_HOURS: i64 = 1;
const DEFAULT_LIMIT: u32 = 50;
const EVENTS_PERMISSION: &str = "policy-events.read";

/// Fetches a single event by id
pub struct GetEventInfoTool {
    client: Arc<RemoteClient>,
}

#[derive(Debug, Deserialize)]
struct GetEventInfoInput {
    #[serde(default)]
    event_id: String,
}

impl GetEventInfoTool {
    pub fn new(client: Arc<RemoteClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Tool for GetEventInfoTool {
    fn name(&self) -> &str {
        "get_event_info"
    }

    fn description(&self) -> &str {
        "Retrieve detailed information for a specific security event by its ID"
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "event_id": {
                    "type": "string",
                    "description": "The unique identifier of the security event."
                }
            },
            "required": ["event_id"]
        })
    }

    fn required_permissions(&self) -> RequiredPermissions {
        RequiredPermissions::of([EVENTS_PERMISSION])
    }

    async fn execute(&self, ctx: &CallContext, input: &Value) -> Result<ToolResult> {
        let input: GetEventInfoInput = serde_json::from_value(input.clone())?;
        if input.event_id.is_empty() {
            return Ok(ToolResult::error("event_id is required"));
        }

        match self.client.get_event(ctx, &input.event_id).await {
            Ok(event) => Ok(ToolResult::json(event)),
            Err(e) => Ok(ToolResult::error(format!("error retrieving event: {}", e))),
        }
    }
}

/// Fetches the process tree behind an event
pub struct GetEventProcessTreeTool {
    client: Arc<RemoteClient>,
}

impl GetEventProcessTreeTool {
    pub fn new(client: Arc<RemoteClient>) -> Self {
        Self { client }
    }
}

/// Combine branches and tree; either one missing means no tree at all
fn process_tree_body(branches: Option<Value>, tree: Option<Value>) -> Value {
    match (branches, tree) {
        (Some(branches), Some(tree)) => json!({ "branches": branches, "tree": tree }),
        _ => json!({
            "branches": {},
            "tree": {},
            "metadata": { "note": "Process tree not available for this event" }
        }),
    }
}

#[async_trait]
impl Tool for GetEventProcessTreeTool {
    fn name(&self) -> &str {
        "get_event_process_tree"
    }

    fn description(&self) -> &str {
        "Retrieves the process tree for a specific security event. Not every event has a process tree, so this may return an empty tree."
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "event_id": {
                    "type": "string",
                    "description": "The unique identifier of the security event."
                }
            },
            "required": ["event_id"]
        })
    }

    fn required_permissions(&self) -> RequiredPermissions {
        RequiredPermissions::none()
    }

    async fn execute(&self, ctx: &CallContext, input: &Value) -> Result<ToolResult> {
        let input: GetEventInfoInput = serde_json::from_value(input.clone())?;
        if input.event_id.is_empty() {
            return Ok(ToolResult::error("event_id is required"));
        }

        let (branches, tree) = tokio::join!(
            self.client.get_process_branches(ctx, &input.event_id),
            self.client.get_process_tree(ctx, &input.event_id)
        );
        let branches = match branches {
            Ok(branches) => branches,
            Err(e) => return Ok(ToolResult::error(format!("error getting process branches: {}", e))),
        };
        let tree = match tree {
            Ok(tree) => tree,
            Err(e) => return Ok(ToolResult::error(format!("error getting process tree: {}", e))),
        };

        Ok(ToolResult::json(process_tree_body(branches, tree)))
    }
}

/// Lists runtime events over a recent time window
pub struct ListRuntimeEventsTool {
    client: Arc<RemoteClient>,
}

#[derive(Debug, Default, Deserialize)]
struct ListRuntimeEventsInput {
    cursor: Option<String>,
    scope_hours: Option<i64>,
    limit: Option<u32>,
    filter_expr: Option<String>,
}

impl ListRuntimeEventsTool {
    pub fn new(client: Arc<RemoteClient>) -> Self {
        Self { client }
    }
}

/// Build the listing query; a cursor replaces the time window
fn events_query(input: &ListRuntimeEventsInput, now: DateTime<Utc>) -> Result<EventsQuery, String> {
    let mut query = EventsQuery {
        limit: input.limit.unwrap_or(DEFAULT_LIMIT),
        ..Default::default()
    };

    match input.cursor.as_deref().filter(|c| !c.is_empty()) {
        Some(cursor) => query.cursor = Some(cursor.to_string()),
        None => {
            let hours = input.scope_hours.unwrap_or(DEFAULT_SCOPE_HOURS).max(1);
            let from = Duration::try_hours(hours)
                .and_then(|scope| now.checked_sub_signed(scope))
                .and_then(|from| from.timestamp_nanos_opt())
                .ok_or_else(|| format!("scope_hours {} is out of range", hours))?;
            query.to = now.timestamp_nanos_opt();
            query.from = Some(from);
        }
    }

    query.filter = Some(match input.filter_expr.as_deref().filter(|f| !f.is_empty()) {
        Some(expr) => format!("{} and {}", BASE_FILTER, expr),
        None => BASE_FILTER.to_string(),
    });

    Ok(query)
}

#[async_trait]
impl Tool for ListRuntimeEventsTool {
    fn name(&self) -> &str {
        "list_runtime_events"
    }

    fn description(&self) -> &str {
        "List runtime security events from the last given hours, optionally filtered by an expression."
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "cursor": {
                    "type": "string",
                    "description": "Cursor for pagination."
                },
                "scope_hours": {
                    "type": "integer",
                    "description": "Number of hours back from now to include events.",
                    "default": DEFAULT_SCOPE_HOURS
                },
                "limit": {
                    "type": "integer",
                    "description": "Maximum number of events to return.",
                    "default": DEFAULT_LIMIT
                },
                "filter_expr": {
                    "type": "string",
                    "description": "Logical filter expression, e.g. severity in (\"0\",\"1\",\"2\",\"3\") or ruleName contains \"Login\"."
                }
            }
        })
    }

    fn required_permissions(&self) -> RequiredPermissions {
        RequiredPermissions::of([EVENTS_PERMISSION])
    }

    async fn execute(&self, ctx: &CallContext, input: &Value) -> Result<ToolResult> {
        let input: ListRuntimeEventsInput = if input.is_null() {
            ListRuntimeEventsInput::default()
        } else {
            serde_json::from_value(input.clone())?
        };
        let query = match events_query(&input, Utc::now()) {
            Ok(query) => query,
            Err(message) => return Ok(ToolResult::error(message)),
        };

        match self.client.list_events(ctx, &query).await {
            Ok(events) => Ok(ToolResult::json(events)),
            Err(e) => Ok(ToolResult::error(format!("error retrieving events: {}", e))),
        }
    }
}
