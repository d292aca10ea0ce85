use crate::models::{Credential, ModelResult, ScenarioRecord, TemperatureRecord};
use async_trait::async_trait;
use std::path::Path;

/// The external charging demand model.
#[async_trait]
pub trait ChargingModel: Send + Sync {
    /// Runs every scenario against the temperature series. The result holds one profile
    /// per scenario index, in the order of `scenarios`.
    async fn run(
        &self,
        scenarios: &[ScenarioRecord],
        temperatures: &[TemperatureRecord],
        credential: &Credential,
        county: &str,
    ) -> anyhow::Result<ModelResult>;
}

/// Renders one scenario of a result to an image file.
pub trait LoadPlotter: Send + Sync {
    fn plot(&self, result: &ModelResult, scenario: usize, path: &Path) -> anyhow::Result<()>;

    /// File extension of the images this plotter writes.
    fn extension(&self) -> &'static str;
}
