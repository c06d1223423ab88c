//! Remote analytics API access

mod client;
pub mod types;

pub use client::{ClientOptions, RemoteClient};
pub use types::{EventsQuery, PromQuery, SysqlQuery, UserPermissions};
