//! Data layer between `bmsdash-api` and presentation consumers (CLI, web).
//!
//! - **[`Dashboard`]**: Facade over one authenticated session. Fetches the
//!   primary listing and identity listing of a device domain concurrently,
//!   waits for both, and reconciles them. Also forwards trend and log queries
//!   and login / logout.
//!
//! - **[`reconcile`]**: Pure join / enrichment of the two listings into
//!   [`EnrichedMachine`] records. Tolerates several response shapes via the
//!   ordered matchers in [`shape`]; a shape surprise degrades to an empty
//!   section, never to an error.
//!
//! - **Domain model** ([`model`]): [`EnrichedMachine`] with a
//!   [`MachineReading`] that is either electrical or environmental, plus
//!   [`FleetSummary`] for dashboard cards.

pub mod config;
pub mod dashboard;
pub mod error;
pub mod model;
pub mod reconcile;
pub mod shape;

// ── Primary re-exports ──────────────────────────────────────────────
pub use config::{DashboardConfig, TlsVerification};
pub use dashboard::Dashboard;
pub use error::CoreError;
pub use model::{
    ElectricalReading, EnergySummary, EnrichedMachine, EnvironmentalReading, FleetSummary,
    MachineId, MachineReading, MachineStatus,
};
pub use reconcile::{MachineEnvelope, reconcile, summarize};

// Types consumers need without depending on the api crate directly.
pub use bmsdash_api::{
    CredentialStore, Domain, Envelope, Items, LogQuery, LoginOutcome, MemoryStore, Session,
    SessionEvent, TimeWindow, TrendQuery,
};
