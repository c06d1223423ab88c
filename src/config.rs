//! Environment-driven configuration
//!
//! Every setting comes from a `PERMGATE_`-prefixed environment variable.
//! [`Config::from_lookup`] accepts any key lookup so tests never touch the
//! process environment.

use std::collections::HashMap;
use std::path::PathBuf;
use std::str::FromStr;

use serde_json::Value;

use crate::error::ConfigError;
use crate::logging::LoggingConfig;
use crate::tools::RequiredPermissions;

const PREFIX: &str = "PERMGATE_";

/// How the gateway is exposed to MCP clients
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Transport {
    /// One client over stdin/stdout, one configured identity
    #[default]
    Stdio,
    /// Many clients over HTTP, identity taken from each request's headers
    StreamableHttp,
}

impl FromStr for Transport {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "stdio" => Ok(Transport::Stdio),
            "streamable-http" => Ok(Transport::StreamableHttp),
            other => Err(ConfigError::UnknownTransport(other.to_string())),
        }
    }
}

/// Gateway configuration
#[derive(Clone)]
pub struct Config {
    pub api_host: Option<String>,
    pub api_token: Option<String>,
    pub skip_tls_verification: bool,
    pub transport: Transport,
    pub listening_host: String,
    pub listening_port: u16,
    pub mount_path: String,
    pub logging: LoggingConfig,
    /// Per-tool required permission overrides
    pub tool_permissions: HashMap<String, RequiredPermissions>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_host: None,
            api_token: None,
            skip_tls_verification: false,
            transport: Transport::Stdio,
            listening_host: "localhost".to_string(),
            listening_port: 8080,
            mount_path: "/permgate".to_string(),
            logging: LoggingConfig::default(),
            tool_permissions: HashMap::new(),
        }
    }
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("api_host", &self.api_host)
            .field("api_token", &self.api_token.as_ref().map(|_| "<redacted>"))
            .field("skip_tls_verification", &self.skip_tls_verification)
            .field("transport", &self.transport)
            .field("listening_host", &self.listening_host)
            .field("listening_port", &self.listening_port)
            .field("mount_path", &self.mount_path)
            .field("logging", &self.logging)
            .field("tool_permissions", &self.tool_permissions)
            .finish()
    }
}

impl Config {
    /// Load from the process environment
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load using `lookup` to read each fully prefixed key
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| {
            lookup(&format!("{}{}", PREFIX, name))
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        let defaults = Config::default();

        let transport = match get("TRANSPORT") {
            Some(value) => value.parse()?,
            None => defaults.transport,
        };

        let listening_port = match get("LISTENING_PORT") {
            Some(value) => value.parse().map_err(|e| ConfigError::Invalid {
                key: "PERMGATE_LISTENING_PORT",
                reason: format!("{}", e),
            })?,
            None => defaults.listening_port,
        };

        let mut mount_path = get("MOUNT_PATH").unwrap_or(defaults.mount_path);
        if !mount_path.starts_with('/') {
            mount_path.insert(0, '/');
        }

        let tool_permissions = match get("TOOL_PERMISSIONS") {
            Some(raw) => parse_tool_permissions(&raw)?,
            None => HashMap::new(),
        };

        let config = Config {
            api_host: get("API_HOST"),
            api_token: get("API_TOKEN"),
            skip_tls_verification: parse_bool(get("SKIP_TLS_VERIFICATION"), false),
            transport,
            listening_host: get("LISTENING_HOST").unwrap_or(defaults.listening_host),
            listening_port,
            mount_path,
            logging: LoggingConfig {
                level: get("LOG_LEVEL").unwrap_or(defaults.logging.level),
                log_dir: get("LOG_DIR").map(PathBuf::from),
            },
            tool_permissions,
        };
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        // axum cannot nest a service at the root or under a trailing slash
        if self.mount_path == "/" || self.mount_path.ends_with('/') {
            return Err(ConfigError::Invalid {
                key: "PERMGATE_MOUNT_PATH",
                reason: format!(
                    "'{}' must name a path below the root without a trailing slash",
                    self.mount_path
                ),
            });
        }
        if self.transport == Transport::Stdio {
            if self.api_host.is_none() {
                return Err(ConfigError::Missing("PERMGATE_API_HOST"));
            }
            if self.api_token.is_none() {
                return Err(ConfigError::Missing("PERMGATE_API_TOKEN"));
            }
        }
        Ok(())
    }

    /// Address the HTTP transport binds to
    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.listening_host, self.listening_port)
    }
}

/// Blank or unparseable values fall back to `default`
fn parse_bool(value: Option<String>, default: bool) -> bool {
    match value.as_deref().map(str::to_ascii_lowercase).as_deref() {
        Some("true" | "1" | "yes" | "on") => true,
        Some("false" | "0" | "no" | "off") => false,
        _ => default,
    }
}

fn parse_tool_permissions(raw: &str) -> Result<HashMap<String, RequiredPermissions>, ConfigError> {
    let invalid = |reason: String| ConfigError::Invalid {
        key: "PERMGATE_TOOL_PERMISSIONS",
        reason,
    };
    let value: Value = serde_json::from_str(raw).map_err(|e| invalid(e.to_string()))?;
    let Value::Object(entries) = value else {
        return Err(invalid("expected a JSON object keyed by tool name".to_string()));
    };

    Ok(entries
        .into_iter()
        .map(|(tool, metadata)| (tool, RequiredPermissions::from_metadata(&metadata)))
        .collect())
}
