//! # formrelay
//!
//! A static site whose forms end up in a document store, by way of UDP.
//!
//! ```text
//! browser ──HTTP──▶ Site ──datagram──▶ Consumer ──insert──▶ document store
//! ```
//!
//! The HTTP worker serves files from a content directory and turns every POST
//! into a single fire-and-forget datagram, then redirects the browser to `/`.
//! The persistence worker decodes each datagram as a form body, stamps it with
//! a `date`, and inserts it. Nothing flows back: a lost datagram, a malformed
//! body, or a failed insert is logged on the consumer side and the browser
//! never learns about it.
//!
//! What this crate intentionally ignores:
//!
//! - **TLS and authentication**: put a proxy in front
//! - **Delivery guarantees**: the channel is UDP, loss is expected
//! - **Record schemas**: any well-formed `key=value&...` body is stored as is
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use formrelay::{Relay, RelayConfig, SqliteStore};
//! use tokio_util::sync::CancellationToken;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), formrelay::Error> {
//!     let config = RelayConfig::from_env()?;
//!     let store = SqliteStore::new(config.store_uri.clone());
//!     let relay = Relay::bind(&config, store).await?;
//!
//!     let shutdown = CancellationToken::new();
//!     relay.run(shutdown).await
//! }
//! ```

mod config;
mod endpoint;
mod error;
mod method;
mod request;
mod response;
mod router;
mod server;
mod status;

pub mod consumer;
pub mod datagram;
pub mod form;
pub mod relay;
pub mod shutdown;
pub mod site;
pub mod store;
pub mod telemetry;

pub use crate::config::RelayConfig;
pub use consumer::Consumer;
pub use endpoint::Endpoint;
pub use datagram::{DatagramReceiver, DatagramSender};
pub use error::Error;
pub use method::Method;
pub use relay::Relay;
pub use request::Request;
pub use response::{ContentType, Response};
pub use router::Router;
pub use server::Server;
pub use site::Site;
pub use status::Status;
pub use store::{DocumentStore, MemoryStore, Record, SqliteStore, StoreError};
