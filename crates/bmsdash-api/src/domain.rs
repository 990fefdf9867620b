// Device domains and their endpoint paths.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};

/// A family of devices served by its own listing / identity / series endpoints.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, EnumIter,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum Domain {
    /// Electrical panels and meters.
    Electrical,
    /// Temperature / humidity sensors with battery telemetry.
    Temperature,
}

impl Domain {
    /// Primary listing: machines with their latest metrics.
    pub fn listing_path(self) -> String {
        format!("{self}/machines")
    }

    /// Identity listing: which machine identifiers are registered.
    pub fn identity_path(self) -> String {
        format!("{self}/devices")
    }

    /// Path segments of the trend series for one machine.
    ///
    /// The machine id stays a single segment; the client percent-encodes it
    /// when appending, so `/`, `?` and `#` inside an id never reroute the call.
    pub fn trend_segments(self, machine_id: &str) -> [String; 4] {
        self.series_segments(machine_id, "trend")
    }

    /// Path segments of the raw reading log for one machine.
    pub fn logs_segments(self, machine_id: &str) -> [String; 4] {
        self.series_segments(machine_id, "logs")
    }

    fn series_segments(self, machine_id: &str, series: &str) -> [String; 4] {
        [
            self.to_string(),
            "machines".to_owned(),
            machine_id.to_owned(),
            series.to_owned(),
        ]
    }
}
