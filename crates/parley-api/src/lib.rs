//! parley-api: wire layer for the parley chat widget
//!
//! Message and conversation types, the REST client for history and edits,
//! and the event protocol spoken over the push channel.

pub mod client;
pub mod error;
pub mod protocol;
pub mod types;

pub use client::ApiClient;
pub use error::{Error, ErrorKind, Result};
pub use protocol::{ClientEvent, ServerEvent};
pub use reqwest::Url;
pub use types::*;
