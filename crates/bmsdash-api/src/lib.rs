// bmsdash-api: Async Rust client for building-management telemetry backends
//
// Bearer-token auth with transparent refresh, the `{success, message, data,
// errors, meta}` envelope, and the listing / identity / trend / log endpoints
// for the electrical and temperature device domains.

pub mod auth;
pub mod client;
pub mod domain;
pub mod envelope;
pub mod error;
pub mod session;
pub mod store;
pub mod telemetry;
pub mod token;
pub mod transport;

pub use auth::LoginOutcome;
pub use client::ApiClient;
pub use domain::Domain;
pub use envelope::{Envelope, Items};
pub use error::Error;
pub use session::{Session, SessionEvent};
pub use store::{CredentialStore, MemoryStore};
pub use telemetry::{LogQuery, TimeWindow, TrendQuery};
pub use token::{TokenPair, TokenStore};
pub use transport::{TlsMode, TransportConfig};
