// ── Record reconciliation ──
//
// Joins the primary machine listing with the identity listing of the same
// domain. Pure: no I/O, no clock, output depends only on the two inputs.
//
// Electrical: inner join, a machine is kept only if its id is registered.
// Temperature: every machine is kept; the identity listing only supplies a
// display name.

use std::collections::{HashMap, HashSet};

use bmsdash_api::{Domain, Envelope, Items};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::debug;

use crate::model::{
    ElectricalReading, EnergySummary, EnrichedMachine, EnvironmentalReading, FleetSummary,
    MachineId, MachineReading, MachineStatus,
};
use crate::shape::{IDENTITY_SHAPES, LISTING_SHAPES, normalize_items};

/// Reconciled listing: the primary envelope's metadata with enriched items.
pub type MachineEnvelope = Envelope<Items<EnrichedMachine>>;

// ── Raw records ─────────────────────────────────────────────────────

/// Item of the primary listing.
///
/// Only `id` can reject a record; every other field is kept as raw JSON and
/// read leniently, so an odd type degrades that field alone.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DeviceRecord {
    id: MachineId,
    #[serde(default)]
    name: Option<Value>,
    #[serde(default)]
    status: Option<Value>,
    #[serde(default)]
    metrics: Value,
    #[serde(default)]
    last_seen_at: Option<Value>,
    /// Channels some backends put at the top level instead of under `metrics`.
    #[serde(flatten)]
    extra: Map<String, Value>,
}

/// Item of the identity listing.
#[derive(Debug, Deserialize)]
struct DeviceIdentity {
    id: MachineId,
    #[serde(default, alias = "deviceName", alias = "machineName")]
    name: Option<Value>,
}

fn parse_items<T: serde::de::DeserializeOwned>(items: &[Value], section: &str) -> Vec<T> {
    items
        .iter()
        .filter_map(|item| match T::deserialize(item) {
            Ok(record) => Some(record),
            Err(e) => {
                debug!(section, error = %e, "skipping unparseable record");
                None
            }
        })
        .collect()
}

// ── Channel mapping ─────────────────────────────────────────────────
//
// Backend field names per display channel, first present wins.

const VOLTAGE: &[&str] = &["voltage", "avgVoltage"];
const CURRENT: &[&str] = &["current", "avgCurrent"];
const ACTIVE_POWER: &[&str] = &["activePower", "power", "totalPower"];
const POWER_FACTOR: &[&str] = &["powerFactor", "pf"];
const FREQUENCY: &[&str] = &["frequency"];
const ENERGY_TODAY: &[&str] = &["energyToday", "todayEnergy"];
const ENERGY_MONTH: &[&str] = &["energyMonthToDate", "monthEnergy", "energyMonth"];
const TEMPERATURE: &[&str] = &["temperature", "temp"];
const HUMIDITY: &[&str] = &["humidity", "hum"];
const BATTERY: &[&str] = &["battery", "batteryLevel"];

impl DeviceRecord {
    fn metric(&self, names: &[&str]) -> Option<f64> {
        names.iter().find_map(|name| {
            self.metrics
                .get(*name)
                .or_else(|| self.extra.get(*name))
                .and_then(as_number)
        })
    }

    fn energy(&self) -> EnergySummary {
        let nested = self.extra.get("energy");
        EnergySummary {
            today: self
                .metric(ENERGY_TODAY)
                .or_else(|| nested.and_then(|e| e.get("today")).and_then(as_number)),
            month_to_date: self
                .metric(ENERGY_MONTH)
                .or_else(|| nested.and_then(|e| e.get("monthToDate")).and_then(as_number)),
        }
    }

    fn electrical(&self) -> MachineReading {
        MachineReading::Electrical(ElectricalReading {
            voltage: self.metric(VOLTAGE),
            current: self.metric(CURRENT),
            active_power: self.metric(ACTIVE_POWER),
            power_factor: self.metric(POWER_FACTOR),
            frequency: self.metric(FREQUENCY),
        })
    }

    fn environmental(&self) -> MachineReading {
        MachineReading::Environmental(EnvironmentalReading {
            temperature: self.metric(TEMPERATURE),
            humidity: self.metric(HUMIDITY),
            battery: self.metric(BATTERY),
        })
    }

    fn display_name(&self) -> Option<String> {
        self.name.as_ref().and_then(as_text)
    }

    fn into_machine(
        self,
        name: String,
        reading: MachineReading,
        energy: EnergySummary,
    ) -> EnrichedMachine {
        EnrichedMachine {
            status: self
                .status
                .as_ref()
                .and_then(Value::as_str)
                .map_or(MachineStatus::Unknown, MachineStatus::parse),
            last_seen_at: self.last_seen_at.as_ref().and_then(parse_timestamp),
            id: self.id,
            name,
            reading,
            energy,
        }
    }
}

/// Numbers may arrive as JSON numbers or numeric strings.
fn as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// RFC 3339 strings or epoch milliseconds.
fn parse_timestamp(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::String(s) => DateTime::parse_from_rfc3339(s)
            .ok()
            .map(|ts| ts.with_timezone(&Utc)),
        Value::Number(n) => n.as_i64().and_then(DateTime::from_timestamp_millis),
        _ => None,
    }
}

/// Non-blank strings as-is, numbers in their JSON form, anything else absent.
fn as_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

// ── Reconciliation ──────────────────────────────────────────────────

/// Reconcile a domain's primary listing with its identity listing.
pub fn reconcile(domain: Domain, listing: &Value, identities: &Value) -> MachineEnvelope {
    match domain {
        Domain::Electrical => reconcile_electrical(listing, identities),
        Domain::Temperature => reconcile_temperature(listing, identities),
    }
}

/// Inner join on machine id.
pub fn reconcile_electrical(listing: &Value, identities: &Value) -> MachineEnvelope {
    let registered: HashSet<MachineId> = identity_records(identities)
        .into_iter()
        .map(|identity| identity.id)
        .collect();

    let machines = primary_records(listing)
        .into_iter()
        .filter(|record| registered.contains(&record.id))
        .map(|record| {
            let name = record
                .display_name()
                .unwrap_or_else(|| record.id.to_string());
            let reading = record.electrical();
            let energy = record.energy();
            record.into_machine(name, reading, energy)
        })
        .collect();

    wrap(listing, machines)
}

/// Left join on machine id, identity supplies the display name.
pub fn reconcile_temperature(listing: &Value, identities: &Value) -> MachineEnvelope {
    let names: HashMap<MachineId, String> = identity_records(identities)
        .into_iter()
        .filter_map(|identity| {
            let name = identity.name.as_ref().and_then(as_text)?;
            Some((identity.id, name))
        })
        .collect();

    let machines = primary_records(listing)
        .into_iter()
        .map(|record| {
            let name = names
                .get(&record.id)
                .cloned()
                .or_else(|| record.display_name())
                .unwrap_or_else(|| record.id.to_string());
            let reading = record.environmental();
            record.into_machine(name, reading, EnergySummary::default())
        })
        .collect();

    wrap(listing, machines)
}

fn identity_records(identities: &Value) -> Vec<DeviceIdentity> {
    parse_items(
        normalize_items(identities, IDENTITY_SHAPES, "identity"),
        "identity",
    )
}

fn primary_records(listing: &Value) -> Vec<DeviceRecord> {
    parse_items(normalize_items(listing, LISTING_SHAPES, "listing"), "listing")
}

/// Mirror the primary envelope's metadata around the enriched items.
fn wrap(listing: &Value, machines: Vec<EnrichedMachine>) -> MachineEnvelope {
    let meta: Envelope<Value> = if listing.is_object() {
        Envelope::deserialize(listing).unwrap_or_default()
    } else {
        Envelope::default()
    };
    meta.map(|_| Items { items: machines })
}

// ── Summary ─────────────────────────────────────────────────────────

/// Counts and energy totals across a reconciled collection.
pub fn summarize(machines: &[EnrichedMachine]) -> FleetSummary {
    fn sum(values: impl Iterator<Item = Option<f64>>) -> Option<f64> {
        values.flatten().fold(None, |acc, v| Some(acc.unwrap_or(0.0) + v))
    }

    FleetSummary {
        total: machines.len(),
        online: machines.iter().filter(|m| m.status == MachineStatus::Online).count(),
        offline: machines.iter().filter(|m| m.status == MachineStatus::Offline).count(),
        alarm: machines.iter().filter(|m| m.status == MachineStatus::Alarm).count(),
        energy_today: sum(machines.iter().map(|m| m.energy.today)),
        energy_month_to_date: sum(machines.iter().map(|m| m.energy.month_to_date)),
    }
}
