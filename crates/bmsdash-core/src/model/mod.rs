// ── Domain model ──
//
// Presentation-ready types produced by the reconciler.

pub mod machine;
pub mod reading;

pub use machine::{EnrichedMachine, FleetSummary, MachineId, MachineStatus};
pub use reading::{ElectricalReading, EnergySummary, EnvironmentalReading, MachineReading};
