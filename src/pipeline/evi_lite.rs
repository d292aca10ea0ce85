use crate::models::{
    ChargingCircuit, ClassDist, Credential, HomeAccessDist, LoadProfile, LoadRow, ModelResult,
    PevDist, PevType, PowerDist, PrefDist, ResCharging, ScenarioRecord, TemperatureRecord,
    WorkCharging, STEPS_PER_DAY,
};
use crate::pipeline::traits::ChargingModel;
use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use chrono::Duration as ChronoDuration;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, warn};
use url::Url;

pub const DEFAULT_API_BASE: &str =
    "https://developer.nrel.gov/api/evi-pro-lite/v1/daily-load-profile";

const TEMP_BIN_MIN: i32 = -20;
const TEMP_BIN_MAX: i32 = 40;

/// Nearest 10 °C step the API accepts, clamped to its supported range.
pub fn temperature_bin(temp_c: f64) -> i32 {
    let bin = (temp_c / 10.0).round() as i32 * 10;
    bin.clamp(TEMP_BIN_MIN, TEMP_BIN_MAX)
}

#[derive(Serialize)]
struct ProfileQuery<'a> {
    api_key: &'a str,
    fleet_size: u64,
    mean_dvmt: f64,
    temp_c: i32,
    pev_type: PevType,
    pev_dist: PevDist,
    class_dist: ClassDist,
    home_access_dist: HomeAccessDist,
    home_power_dist: PowerDist,
    work_power_dist: PowerDist,
    pref_dist: PrefDist,
    res_charging: ResCharging,
    work_charging: WorkCharging,
}

impl<'a> ProfileQuery<'a> {
    fn new(api_key: &'a str, s: &ScenarioRecord, temp_c: i32) -> Self {
        Self {
            api_key,
            fleet_size: s.fleet_size,
            mean_dvmt: s.mean_dvmt,
            temp_c,
            pev_type: s.pev_type,
            pev_dist: s.pev_dist,
            class_dist: s.class_dist,
            home_access_dist: s.home_access_dist,
            home_power_dist: s.home_power_dist,
            work_power_dist: s.work_power_dist,
            pref_dist: s.pref_dist,
            res_charging: s.res_charging,
            work_charging: s.work_charging,
        }
    }
}

#[derive(Clone, Debug, Deserialize)]
pub struct CircuitProfile {
    pub weekday_load_profile: Vec<f64>,
    pub weekend_load_profile: Vec<f64>,
}

impl CircuitProfile {
    fn day(&self, weekday: bool) -> &[f64] {
        if weekday {
            &self.weekday_load_profile
        } else {
            &self.weekend_load_profile
        }
    }
}

#[derive(Clone, Debug, Deserialize)]
pub struct DailyProfiles {
    pub home_l1: CircuitProfile,
    pub home_l2: CircuitProfile,
    pub work_l1: CircuitProfile,
    pub work_l2: CircuitProfile,
    pub public_l2: CircuitProfile,
    pub public_l3: CircuitProfile,
}

impl DailyProfiles {
    fn circuit(&self, circuit: ChargingCircuit) -> &CircuitProfile {
        match circuit {
            ChargingCircuit::HomeL1 => &self.home_l1,
            ChargingCircuit::HomeL2 => &self.home_l2,
            ChargingCircuit::WorkL1 => &self.work_l1,
            ChargingCircuit::WorkL2 => &self.work_l2,
            ChargingCircuit::PublicL2 => &self.public_l2,
            ChargingCircuit::PublicL3 => &self.public_l3,
        }
    }

    fn validate(&self) -> Result<()> {
        for circuit in ChargingCircuit::ALL {
            let p = self.circuit(circuit);
            if p.weekday_load_profile.len() != STEPS_PER_DAY
                || p.weekend_load_profile.len() != STEPS_PER_DAY
            {
                bail!(
                    "{} profile has {}/{} points, expected {}",
                    circuit.column(),
                    p.weekday_load_profile.len(),
                    p.weekend_load_profile.len(),
                    STEPS_PER_DAY
                );
            }
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
struct ProfileResponse {
    #[serde(default)]
    errors: Vec<String>,
    #[serde(default)]
    warnings: Vec<String>,
    results: Option<DailyProfiles>,
}

/// Concatenates the steps each temperature record covers (a whole day, or one hour of an
/// hourly series), taken from the day profile for its temperature bin and day type.
pub fn stitch_profile(
    temperatures: &[TemperatureRecord],
    profiles: &BTreeMap<i32, DailyProfiles>,
) -> Result<LoadProfile> {
    let mut out = LoadProfile::default();
    for day in temperatures {
        let bin = temperature_bin(day.temp_c);
        let daily = profiles
            .get(&bin)
            .with_context(|| format!("no profile fetched for {bin} °C"))?;
        let midnight = day
            .date
            .and_hms_opt(0, 0, 0)
            .with_context(|| format!("invalid date {}", day.date))?;
        let weekday = day.is_weekday();
        for step in day.steps() {
            let at = |c: ChargingCircuit| daily.circuit(c).day(weekday)[step];
            out.push(LoadRow {
                time: midnight + ChronoDuration::minutes(15 * step as i64),
                home_l1: at(ChargingCircuit::HomeL1),
                home_l2: at(ChargingCircuit::HomeL2),
                work_l1: at(ChargingCircuit::WorkL1),
                work_l2: at(ChargingCircuit::WorkL2),
                public_l2: at(ChargingCircuit::PublicL2),
                public_l3: at(ChargingCircuit::PublicL3),
            });
        }
    }
    Ok(out)
}

/// HTTP client for the EVI-Pro Lite daily load profile API.
pub struct EviProLiteClient {
    base_url: Url,
    min_call_interval: Duration,
}

impl EviProLiteClient {
    pub fn new(base_url: Url, min_call_interval: Duration) -> Self {
        Self {
            base_url,
            min_call_interval,
        }
    }

    async fn fetch(
        &self,
        client: &Client,
        credential: &Credential,
        scenario: &ScenarioRecord,
        temp_c: i32,
    ) -> Result<DailyProfiles> {
        let query = ProfileQuery::new(credential.expose(), scenario, temp_c);
        let response = client
            .get(self.base_url.clone())
            .query(&query)
            .send()
            .await?
            .error_for_status()?;
        let body: ProfileResponse = response.json().await?;
        for w in &body.warnings {
            warn!(temp_c, warning = %w, "charging model warning");
        }
        if !body.errors.is_empty() {
            bail!("charging model rejected request: {}", body.errors.join("; "));
        }
        let profiles = body.results.context("response missing results")?;
        profiles.validate()?;
        Ok(profiles)
    }
}

#[async_trait]
impl ChargingModel for EviProLiteClient {
    async fn run(
        &self,
        scenarios: &[ScenarioRecord],
        temperatures: &[TemperatureRecord],
        credential: &Credential,
        county: &str,
    ) -> Result<ModelResult> {
        // One session per task; connections are not shared across work items.
        let client = Client::builder()
            .user_agent(concat!("ny-ev-proj/", env!("CARGO_PKG_VERSION")))
            .build()?;
        let bins: BTreeSet<i32> = temperatures
            .iter()
            .map(|r| temperature_bin(r.temp_c))
            .collect();

        let mut last_call: Option<Instant> = None;
        let mut result = ModelResult::default();
        for (idx, scenario) in scenarios.iter().enumerate() {
            let mut profiles = BTreeMap::new();
            for bin in &bins {
                if let Some(at) = last_call {
                    let wait = self.min_call_interval.saturating_sub(at.elapsed());
                    if !wait.is_zero() {
                        tokio::time::sleep(wait).await;
                    }
                }
                last_call = Some(Instant::now());
                debug!(county, scenario = idx, temp_c = *bin, "requesting daily profile");
                let daily = self
                    .fetch(&client, credential, scenario, *bin)
                    .await
                    .with_context(|| format!("scenario {idx} at {bin} °C"))?;
                profiles.insert(*bin, daily);
            }
            result.insert(idx, stitch_profile(temperatures, &profiles)?);
        }
        Ok(result)
    }
}
