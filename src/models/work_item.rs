use crate::models::{ScenarioRecord, TemperatureRecord, WorkItemId};
use serde::{Deserialize, Serialize};

/// One county's input bundle, dispatched as a single charging model call.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WorkItem {
    pub id: WorkItemId,
    pub county: String,
    /// Sub-period label used in artifact names, e.g. `month12`.
    pub tag: Option<String>,
    pub temperatures: Vec<TemperatureRecord>,
    pub scenarios: Vec<ScenarioRecord>,
}

impl WorkItem {
    /// `{county}_{tag}_scen{idx}_temp_gridLoad` with spaces replaced by underscores.
    pub fn artifact_stem(&self, scenario: usize) -> String {
        artifact_stem(&self.county, self.tag.as_deref(), scenario)
    }
}

pub fn artifact_stem(county: &str, tag: Option<&str>, scenario: usize) -> String {
    let raw = match tag {
        Some(tag) => format!("{county}_{tag}_scen{scenario}_temp_gridLoad"),
        None => format!("{county}_scen{scenario}_temp_gridLoad"),
    };
    raw.replace(' ', "_")
}

pub fn scenario_table_name(county: &str, tag: Option<&str>) -> String {
    let raw = match tag {
        Some(tag) => format!("{county}_{tag}_scenarios.csv"),
        None => format!("{county}_scenarios.csv"),
    };
    raw.replace(' ', "_")
}
