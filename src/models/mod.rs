pub mod credential;
pub mod ids;
pub mod profile;
pub mod scenario;
pub mod temperature;
pub mod work_item;

pub use credential::{Credential, CREDENTIAL_LEN, DEMO_CREDENTIAL};
pub use ids::{RunId, WorkItemId};
pub use profile::{ChargingCircuit, LoadProfile, LoadRow, ModelResult};
pub use scenario::{
    ClassDist, HomeAccessDist, PevDist, PevType, PowerDist, PrefDist, ResCharging,
    ScenarioBase, ScenarioOverride, ScenarioRecord, ScenarioTemplate, WorkCharging,
};
pub use temperature::{mean_temperature, TemperatureRecord, STEPS_PER_DAY};
pub use work_item::{artifact_stem, scenario_table_name, WorkItem};
