// ── Dashboard facade ──
//
// One authenticated session against one backend. Fetches the two listings
// of a domain concurrently, waits for both, then reconciles. Any failing
// member fails the whole group; nothing partial is returned.

use std::sync::Arc;

use bmsdash_api::{
    ApiClient, Domain, Envelope, LogQuery, LoginOutcome, Session, SessionEvent, TrendQuery,
};
use secrecy::SecretString;
use serde_json::Value;
use tokio::sync::broadcast;
use tracing::{debug, info};

use crate::config::DashboardConfig;
use crate::error::CoreError;
use crate::model::FleetSummary;
use crate::reconcile::{MachineEnvelope, reconcile, summarize};

/// Entry point for consumers.
///
/// Cheaply cloneable; clones share the HTTP client, token state and
/// session.
#[derive(Clone)]
pub struct Dashboard {
    inner: Arc<DashboardInner>,
}

struct DashboardInner {
    config: DashboardConfig,
    client: ApiClient,
}

impl std::fmt::Debug for Dashboard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dashboard")
            .field("url", &self.inner.config.url.as_str())
            .finish_non_exhaustive()
    }
}

impl Dashboard {
    /// Build the HTTP client from `config` and bind it to `session`.
    pub fn new(config: DashboardConfig, session: Arc<Session>) -> Result<Self, CoreError> {
        let client = ApiClient::new(config.url.as_str(), session, &config.transport())?;
        Ok(Self::from_client(config, client))
    }

    /// Wrap an already-built client.
    pub fn from_client(config: DashboardConfig, client: ApiClient) -> Self {
        Self {
            inner: Arc::new(DashboardInner { config, client }),
        }
    }

    pub fn config(&self) -> &DashboardConfig {
        &self.inner.config
    }

    pub fn client(&self) -> &ApiClient {
        &self.inner.client
    }

    pub fn session(&self) -> &Arc<Session> {
        self.inner.client.session()
    }

    /// Session lifecycle events (login, refresh, logout, invalidation).
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.session().subscribe()
    }

    // ── Session ──────────────────────────────────────────────────────

    pub async fn login(
        &self,
        username: &str,
        password: &SecretString,
    ) -> Result<LoginOutcome, CoreError> {
        Ok(self.inner.client.login(username, password).await?)
    }

    pub async fn logout(&self) -> Result<(), CoreError> {
        Ok(self.inner.client.logout().await?)
    }

    // ── Machines ─────────────────────────────────────────────────────

    /// Reconciled machine list for a domain.
    ///
    /// Both listings are requested concurrently. Arrival order does not
    /// matter; the first failure is returned and the other result dropped.
    pub async fn machines(&self, domain: Domain) -> Result<MachineEnvelope, CoreError> {
        let client = &self.inner.client;
        debug!(%domain, "fetching listing and identities");

        let (listing, identities) = tokio::try_join!(
            client.list_machines(domain),
            client.list_identities(domain),
        )?;

        let envelope = reconcile(domain, &listing, &identities);
        info!(
            %domain,
            count = envelope.data.items.len(),
            success = envelope.success,
            "machines reconciled"
        );
        Ok(envelope)
    }

    /// Counts and energy totals for a domain.
    pub async fn summary(&self, domain: Domain) -> Result<FleetSummary, CoreError> {
        let envelope = self.machines(domain).await?;
        Ok(summarize(&envelope.data.items))
    }

    // ── Telemetry ────────────────────────────────────────────────────

    pub async fn trend(
        &self,
        domain: Domain,
        machine_id: &str,
        query: &TrendQuery,
    ) -> Result<Envelope<Value>, CoreError> {
        Ok(self.inner.client.trend(domain, machine_id, query).await?)
    }

    pub async fn logs(
        &self,
        domain: Domain,
        machine_id: &str,
        query: &LogQuery,
    ) -> Result<Envelope<Value>, CoreError> {
        Ok(self.inner.client.logs(domain, machine_id, query).await?)
    }
}
