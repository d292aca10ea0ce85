use crate::models::{
    ChargingCircuit, Credential, LoadProfile, LoadRow, ModelResult, ScenarioRecord,
    TemperatureRecord,
};
use crate::pipeline::traits::{ChargingModel, LoadPlotter};
use async_trait::async_trait;
use chrono::Duration as ChronoDuration;
use std::path::Path;
use std::time::Duration;

/// Offline stand-in for the charging model. Load is proportional to fleet size, which
/// makes fleet rescaling observable without network access.
#[derive(Clone, Debug, Default)]
pub struct DummyChargingModel {
    pub delay: Duration,
}

impl DummyChargingModel {
    pub fn with_delay(delay: Duration) -> Self {
        Self { delay }
    }

    pub fn profile(scenario: &ScenarioRecord, temperatures: &[TemperatureRecord]) -> LoadProfile {
        let per_vehicle = 0.001 * scenario.fleet_size as f64;
        let mut profile = LoadProfile::default();
        for day in temperatures {
            let Some(midnight) = day.date.and_hms_opt(0, 0, 0) else {
                continue;
            };
            let day_factor = if day.is_weekday() { 1.0 } else { 0.8 };
            for step in day.steps() {
                let w = |c: ChargingCircuit| {
                    let rank = ChargingCircuit::ALL.iter().position(|x| *x == c).unwrap_or(0);
                    per_vehicle * day_factor * (rank + 1) as f64
                };
                profile.push(LoadRow {
                    time: midnight + ChronoDuration::minutes(15 * step as i64),
                    home_l1: w(ChargingCircuit::HomeL1),
                    home_l2: w(ChargingCircuit::HomeL2),
                    work_l1: w(ChargingCircuit::WorkL1),
                    work_l2: w(ChargingCircuit::WorkL2),
                    public_l2: w(ChargingCircuit::PublicL2),
                    public_l3: w(ChargingCircuit::PublicL3),
                });
            }
        }
        profile
    }
}

#[async_trait]
impl ChargingModel for DummyChargingModel {
    async fn run(
        &self,
        scenarios: &[ScenarioRecord],
        temperatures: &[TemperatureRecord],
        _credential: &Credential,
        _county: &str,
    ) -> anyhow::Result<ModelResult> {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        let mut result = ModelResult::default();
        for (idx, scenario) in scenarios.iter().enumerate() {
            result.insert(idx, Self::profile(scenario, temperatures));
        }
        Ok(result)
    }
}

/// Plotter that writes nothing.
pub struct DummyPlotter;

impl LoadPlotter for DummyPlotter {
    fn plot(&self, _result: &ModelResult, _scenario: usize, _path: &Path) -> anyhow::Result<()> {
        Ok(())
    }

    fn extension(&self) -> &'static str {
        "png"
    }
}
