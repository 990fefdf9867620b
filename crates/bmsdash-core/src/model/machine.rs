// ── Machine identity and view model ──

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use strum::Display;

use super::reading::{EnergySummary, MachineReading};

// ── MachineId ───────────────────────────────────────────────────────

/// Identifier shared by the listing and identity endpoints.
///
/// The backend sends it as a JSON number on some endpoints and as a string
/// on others; both normalize to the same textual form so `7` joins `"7"`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "Value", into = "String")]
pub struct MachineId(String);

impl MachineId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MachineId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<MachineId> for String {
    fn from(id: MachineId) -> Self {
        id.0
    }
}

impl TryFrom<Value> for MachineId {
    type Error = String;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match value {
            Value::String(s) => {
                let trimmed = s.trim();
                if trimmed.is_empty() {
                    Err("empty machine id".into())
                } else {
                    Ok(Self(trimmed.to_owned()))
                }
            }
            Value::Number(n) => Ok(Self(normalize_number(&n))),
            other => Err(format!("machine id must be a string or number, got {other}")),
        }
    }
}

/// Integral values print without a fraction so `7.0` joins `7`.
fn normalize_number(n: &serde_json::Number) -> String {
    if let Some(u) = n.as_u64() {
        return u.to_string();
    }
    if let Some(i) = n.as_i64() {
        return i.to_string();
    }
    match n.as_f64() {
        Some(f) if f.is_finite() && f.fract() == 0.0 => format!("{f:.0}"),
        _ => n.to_string(),
    }
}

// ── MachineStatus ───────────────────────────────────────────────────

/// Operational state reported by the listing endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
#[non_exhaustive]
pub enum MachineStatus {
    Online,
    Offline,
    Alarm,
    Unknown,
}

impl MachineStatus {
    /// Lenient parse of the backend's free-form status string.
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "online" | "active" | "on" | "running" | "normal" => Self::Online,
            "offline" | "inactive" | "off" | "disconnected" => Self::Offline,
            "alarm" | "fault" | "error" | "warning" | "critical" => Self::Alarm,
            _ => Self::Unknown,
        }
    }

    pub fn is_online(self) -> bool {
        matches!(self, Self::Online)
    }
}

// ── EnrichedMachine ─────────────────────────────────────────────────

/// One machine as the dashboard renders it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrichedMachine {
    pub id: MachineId,
    pub name: String,
    pub status: MachineStatus,
    pub reading: MachineReading,
    pub energy: EnergySummary,
    pub last_seen_at: Option<DateTime<Utc>>,
}

// ── FleetSummary ────────────────────────────────────────────────────

/// Aggregate counts for dashboard cards.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FleetSummary {
    pub total: usize,
    pub online: usize,
    pub offline: usize,
    pub alarm: usize,
    /// Sum over machines that report it; `None` when none do.
    pub energy_today: Option<f64>,
    pub energy_month_to_date: Option<f64>,
}
