//! Small-fleet correction.
//!
//! The charging model is unreliable below a minimum fleet size, so such scenarios are run
//! at a nominal size and their results rescaled linearly afterwards. This assumes demand is
//! proportional to fleet size; it is an approximation, not an equivalence.
//!
//! Fleet sizes are whole vehicles: projected counts are rounded when the vehicle table is
//! read, so the scale factor is `round(projected) / nominal`, within 0.5 / nominal of the
//! unrounded ratio.

use crate::models::{ModelResult, ScenarioRecord};
use tracing::warn;

pub const DEFAULT_FLEET_FLOOR: u64 = 10_000;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FleetFloor {
    /// Fleets strictly below this are substituted.
    pub threshold: u64,
    /// Size sent to the model in their place.
    pub nominal: u64,
}

impl Default for FleetFloor {
    fn default() -> Self {
        Self::new(DEFAULT_FLEET_FLOOR)
    }
}

impl FleetFloor {
    pub fn new(floor: u64) -> Self {
        Self {
            threshold: floor,
            nominal: floor,
        }
    }

    /// Returns the record to send and its scale factor (1.0 when untouched).
    pub fn apply(&self, record: &ScenarioRecord) -> (ScenarioRecord, f64) {
        if record.fleet_size >= self.threshold || self.nominal == 0 {
            return (record.clone(), 1.0);
        }
        let factor = record.fleet_size as f64 / self.nominal as f64;
        let substituted = ScenarioRecord {
            fleet_size: self.nominal,
            ..record.clone()
        };
        (substituted, factor)
    }
}

/// Scenario table as sent to the model, with one scale factor per scenario index.
#[derive(Clone, Debug, PartialEq)]
pub struct CorrectedScenarios {
    pub scenarios: Vec<ScenarioRecord>,
    pub scale_factors: Vec<f64>,
}

impl CorrectedScenarios {
    pub fn is_identity(&self) -> bool {
        self.scale_factors.iter().all(|f| *f == 1.0)
    }
}

/// Builds a new corrected table; the input is not modified.
pub fn correct(county: &str, scenarios: &[ScenarioRecord], floor: FleetFloor) -> CorrectedScenarios {
    let mut out = Vec::with_capacity(scenarios.len());
    let mut scale_factors = Vec::with_capacity(scenarios.len());
    for (idx, record) in scenarios.iter().enumerate() {
        let (sent, factor) = floor.apply(record);
        if factor != 1.0 {
            warn!(
                county,
                scenario = idx,
                fleet_size = record.fleet_size,
                nominal = floor.nominal,
                scale_factor = factor,
                "fleet size below floor; running at nominal size and rescaling"
            );
        }
        out.push(sent);
        scale_factors.push(factor);
    }
    CorrectedScenarios {
        scenarios: out,
        scale_factors,
    }
}

/// Multiplies each affected scenario's power columns by its factor.
pub fn rescale(result: &mut ModelResult, scale_factors: &[f64]) {
    for (idx, factor) in scale_factors.iter().enumerate() {
        if *factor == 1.0 {
            continue;
        }
        if let Some(profile) = result.scenarios.get_mut(&idx) {
            profile.scale(*factor);
        }
    }
}
