// ── Readings ──
//
// Electrical panels and environmental sensors report different channels, so
// the latest reading is a tagged union rather than one electrical-shaped
// struct. Renderers pick a layout per variant.

use serde::{Deserialize, Serialize};

/// Latest channel values for a machine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum MachineReading {
    Electrical(ElectricalReading),
    Environmental(EnvironmentalReading),
}

impl MachineReading {
    /// `(label, value, unit)` for every channel present, in display order.
    pub fn channels(&self) -> Vec<(&'static str, f64, &'static str)> {
        let raw: Vec<(&'static str, Option<f64>, &'static str)> = match self {
            Self::Electrical(r) => vec![
                ("voltage", r.voltage, "V"),
                ("current", r.current, "A"),
                ("power", r.active_power, "kW"),
                ("pf", r.power_factor, ""),
                ("frequency", r.frequency, "Hz"),
            ],
            Self::Environmental(r) => vec![
                ("temperature", r.temperature, "°C"),
                ("humidity", r.humidity, "%"),
                ("battery", r.battery, "%"),
            ],
        };
        raw.into_iter()
            .filter_map(|(label, value, unit)| value.map(|v| (label, v, unit)))
            .collect()
    }
}

/// Electrical panel channels.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ElectricalReading {
    pub voltage: Option<f64>,
    pub current: Option<f64>,
    pub active_power: Option<f64>,
    pub power_factor: Option<f64>,
    pub frequency: Option<f64>,
}

/// Temperature / humidity sensor channels.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnvironmentalReading {
    pub temperature: Option<f64>,
    pub humidity: Option<f64>,
    pub battery: Option<f64>,
}

/// Energy counters in kWh. Environmental sensors leave both empty.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnergySummary {
    pub today: Option<f64>,
    pub month_to_date: Option<f64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn channels_skip_missing_values() {
        let reading = MachineReading::Environmental(EnvironmentalReading {
            temperature: Some(21.5),
            humidity: None,
            battery: Some(88.0),
        });
        let labels: Vec<_> = reading.channels().into_iter().map(|(l, _, _)| l).collect();
        assert_eq!(labels, vec!["temperature", "battery"]);
    }

    #[test]
    fn reading_serializes_with_kind_tag() {
        let reading = MachineReading::Electrical(ElectricalReading {
            voltage: Some(230.0),
            ..ElectricalReading::default()
        });
        let json = serde_json::to_value(&reading).unwrap();
        assert_eq!(json["kind"], "electrical");
        assert_eq!(json["voltage"], 230.0);
    }
}
