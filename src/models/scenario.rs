use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum PevType {
    #[serde(rename = "PHEV20")]
    Phev20,
    #[serde(rename = "PHEV50")]
    Phev50,
    #[serde(rename = "BEV100")]
    Bev100,
    #[serde(rename = "BEV250")]
    Bev250,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum PevDist {
    #[serde(rename = "BEV")]
    Bev,
    #[serde(rename = "PHEV")]
    Phev,
    #[serde(rename = "EQUAL")]
    Equal,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum ClassDist {
    Sedan,
    #[serde(rename = "SUV")]
    Suv,
    Equal,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum HomeAccessDist {
    #[serde(rename = "HA100")]
    Ha100,
    #[serde(rename = "HA75")]
    Ha75,
    #[serde(rename = "HA50")]
    Ha50,
}

/// Split of charger power levels at home or at work.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum PowerDist {
    MostL1,
    MostL2,
    Equal,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum PrefDist {
    Home60,
    Home80,
    Home100,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResCharging {
    MinDelay,
    MaxDelay,
    MidnightCharge,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkCharging {
    MinDelay,
    MaxDelay,
}

/// One parameter set for the charging model. Field names are the column names of the
/// scenario table and the query parameters of the API.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ScenarioRecord {
    pub fleet_size: u64,
    pub mean_dvmt: f64,
    pub temp_c: f64,
    pub pev_type: PevType,
    pub pev_dist: PevDist,
    pub class_dist: ClassDist,
    pub home_access_dist: HomeAccessDist,
    pub home_power_dist: PowerDist,
    pub work_power_dist: PowerDist,
    pub pref_dist: PrefDist,
    pub res_charging: ResCharging,
    pub work_charging: WorkCharging,
}

/// Fields an individual scenario may change relative to the template base.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScenarioOverride {
    pub mean_dvmt: Option<f64>,
    pub pev_type: Option<PevType>,
    pub pev_dist: Option<PevDist>,
    pub class_dist: Option<ClassDist>,
    pub home_access_dist: Option<HomeAccessDist>,
    pub home_power_dist: Option<PowerDist>,
    pub work_power_dist: Option<PowerDist>,
    pub pref_dist: Option<PrefDist>,
    pub res_charging: Option<ResCharging>,
    pub work_charging: Option<WorkCharging>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ScenarioBase {
    pub mean_dvmt: f64,
    pub pev_type: PevType,
    pub pev_dist: PevDist,
    pub class_dist: ClassDist,
    pub home_access_dist: HomeAccessDist,
    pub home_power_dist: PowerDist,
    pub work_power_dist: PowerDist,
    pub pref_dist: PrefDist,
    pub res_charging: ResCharging,
    pub work_charging: WorkCharging,
}

/// Caller-supplied shape of a county's scenario table. Fleet size and temperature come
/// from the input tables; everything else comes from `base`, patched per variant.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ScenarioTemplate {
    pub base: ScenarioBase,
    #[serde(default)]
    pub variants: Vec<ScenarioOverride>,
}

impl Default for ScenarioTemplate {
    /// Two PHEV50 scenarios differing only in residential charging delay.
    fn default() -> Self {
        Self {
            base: ScenarioBase {
                mean_dvmt: 35.0,
                pev_type: PevType::Phev50,
                pev_dist: PevDist::Equal,
                class_dist: ClassDist::Equal,
                home_access_dist: HomeAccessDist::Ha75,
                home_power_dist: PowerDist::MostL1,
                work_power_dist: PowerDist::MostL2,
                pref_dist: PrefDist::Home60,
                res_charging: ResCharging::MinDelay,
                work_charging: WorkCharging::MinDelay,
            },
            variants: vec![
                ScenarioOverride {
                    res_charging: Some(ResCharging::MinDelay),
                    ..ScenarioOverride::default()
                },
                ScenarioOverride {
                    res_charging: Some(ResCharging::MaxDelay),
                    ..ScenarioOverride::default()
                },
            ],
        }
    }
}

impl ScenarioTemplate {
    pub fn from_json(raw: &str) -> serde_json::Result<Self> {
        serde_json::from_str(raw)
    }

    /// Builds the scenario table for one county. An empty variant list yields the base alone.
    pub fn instantiate(&self, fleet_size: u64, temp_c: f64) -> Vec<ScenarioRecord> {
        let base = ScenarioOverride::default();
        let variants: Vec<&ScenarioOverride> = if self.variants.is_empty() {
            vec![&base]
        } else {
            self.variants.iter().collect()
        };
        variants
            .into_iter()
            .map(|v| {
                let b = &self.base;
                ScenarioRecord {
                    fleet_size,
                    mean_dvmt: v.mean_dvmt.unwrap_or(b.mean_dvmt),
                    temp_c,
                    pev_type: v.pev_type.unwrap_or(b.pev_type),
                    pev_dist: v.pev_dist.unwrap_or(b.pev_dist),
                    class_dist: v.class_dist.unwrap_or(b.class_dist),
                    home_access_dist: v.home_access_dist.unwrap_or(b.home_access_dist),
                    home_power_dist: v.home_power_dist.unwrap_or(b.home_power_dist),
                    work_power_dist: v.work_power_dist.unwrap_or(b.work_power_dist),
                    pref_dist: v.pref_dist.unwrap_or(b.pref_dist),
                    res_charging: v.res_charging.unwrap_or(b.res_charging),
                    work_charging: v.work_charging.unwrap_or(b.work_charging),
                }
            })
            .collect()
    }
}
