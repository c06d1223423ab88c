//! MCP server surface

mod handler;
mod transport;

pub use handler::{AccessMode, GatewayHandler};
pub use transport::{serve_stdio, serve_streamable_http, streamable_http_router};
