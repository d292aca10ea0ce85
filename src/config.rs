//! Run settings, read from the environment (a `.env` file is loaded first by the binaries).

use crate::assemble::{Period, Resolution};
use crate::credentials::CredentialSource;
use crate::error::ConfigurationError;
use crate::fleet::{FleetFloor, DEFAULT_FLEET_FLOOR};
use crate::pipeline::evi_lite::DEFAULT_API_BASE;
use crate::pipeline::DispatchConfig;
use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use url::Url;

pub const DEFAULT_POPULATION_BASE_URL: &str =
    "https://pad.human.cornell.edu/counties/expprojdata.cfm?";

fn var(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn parse<T: FromStr>(key: &str, raw: &str) -> Result<T, ConfigurationError> {
    raw.parse().map_err(|_| ConfigurationError::InvalidValue {
        key: key.to_string(),
        value: raw.to_string(),
    })
}

fn var_or<T: FromStr>(key: &str, default: T) -> Result<T, ConfigurationError> {
    match var(key) {
        Some(raw) => parse(key, &raw),
        None => Ok(default),
    }
}

fn var_opt<T: FromStr>(key: &str) -> Result<Option<T>, ConfigurationError> {
    var(key).map(|raw| parse(key, &raw)).transpose()
}

fn flag(key: &str, default: bool) -> Result<bool, ConfigurationError> {
    match var(key).map(|v| v.to_ascii_lowercase()) {
        None => Ok(default),
        Some(v) if matches!(v.as_str(), "1" | "true" | "yes" | "on") => Ok(true),
        Some(v) if matches!(v.as_str(), "0" | "false" | "no" | "off") => Ok(false),
        Some(v) => Err(ConfigurationError::InvalidValue {
            key: key.to_string(),
            value: v,
        }),
    }
}

fn url(key: &str, default: &str) -> Result<Url, ConfigurationError> {
    let raw = var(key).unwrap_or_else(|| default.to_string());
    Url::parse(&raw).map_err(|_| ConfigurationError::InvalidValue {
        key: key.to_string(),
        value: raw,
    })
}

/// `12`, `1,4,7`, `1-12` or `all`. Each entry becomes one batch.
pub fn parse_months(raw: &str) -> Result<Vec<Period>, ConfigurationError> {
    let invalid = || ConfigurationError::InvalidValue {
        key: "RUN_MONTHS".to_string(),
        value: raw.to_string(),
    };
    let raw = raw.trim();
    if raw.eq_ignore_ascii_case("all") {
        return Ok(vec![Period::All]);
    }
    let mut months = Vec::new();
    for part in raw.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        match part.split_once('-') {
            Some((lo, hi)) => {
                let lo: u32 = lo.trim().parse().map_err(|_| invalid())?;
                let hi: u32 = hi.trim().parse().map_err(|_| invalid())?;
                if lo > hi {
                    return Err(invalid());
                }
                months.extend(lo..=hi);
            }
            None => months.push(part.parse().map_err(|_| invalid())?),
        }
    }
    if months.is_empty() || months.iter().any(|m| !(1..=12).contains(m)) {
        return Err(invalid());
    }
    Ok(months.into_iter().map(Period::Month).collect())
}

#[derive(Clone, Debug)]
pub struct RunConfig {
    pub input_dir: PathBuf,
    pub output_dir: PathBuf,
    pub figure_dir: PathBuf,
    pub temperature_file: String,
    pub vehicle_file: String,
    pub credentials: CredentialSource,
    pub year: i32,
    pub periods: Vec<Period>,
    pub resolution: Resolution,
    pub counties: Option<Vec<String>>,
    pub dispatch: DispatchConfig,
    pub run_deadline: Option<Duration>,
    pub scenario_template: Option<PathBuf>,
    pub api_base: Url,
    pub min_call_interval: Duration,
}

impl RunConfig {
    pub fn from_env() -> Result<Self, ConfigurationError> {
        let floor: u64 = var_or("FLEET_FLOOR", DEFAULT_FLEET_FLOOR)?;
        let threshold: u64 = var_or("FLEET_THRESHOLD", floor)?;

        let mut periods = parse_months(&var("RUN_MONTHS").unwrap_or_else(|| "12".to_string()))?;
        if let Some(days) = var_opt::<usize>("RUN_DAYS")? {
            periods = vec![Period::FirstDays(days)];
        }

        let counties = var("COUNTIES").map(|raw| {
            raw.split(',')
                .map(|c| c.trim().to_string())
                .filter(|c| !c.is_empty())
                .collect::<Vec<_>>()
        });

        let resolution = match var("TEMPERATURE_RESOLUTION").as_deref() {
            None | Some("daily") => Resolution::Daily,
            Some("hourly") => Resolution::Hourly,
            Some(other) => {
                return Err(ConfigurationError::InvalidValue {
                    key: "TEMPERATURE_RESOLUTION".to_string(),
                    value: other.to_string(),
                })
            }
        };

        Ok(Self {
            input_dir: var_or("INPUT_DIR", PathBuf::from("InputData"))?,
            output_dir: var_or("OUTPUT_DIR", PathBuf::from("OutputData"))?,
            figure_dir: var_or("FIGURE_DIR", PathBuf::from("Figures"))?,
            temperature_file: var("TEMPERATURE_FILE")
                .unwrap_or_else(|| "resstock_amy2018_temp.csv".to_string()),
            vehicle_file: var("VEHICLE_FILE")
                .unwrap_or_else(|| "vehicle_by_county_proj.csv".to_string()),
            credentials: CredentialSource {
                file: var_or("API_KEY_FILE", PathBuf::from("nrel_api_key.txt"))?,
                prompt: flag("PROMPT_FOR_KEY", true)?,
                allow_demo: flag("ALLOW_DEMO_KEY", false)?,
            },
            year: var_or("PROJECTION_YEAR", 2035)?,
            periods,
            resolution,
            counties,
            dispatch: DispatchConfig {
                concurrency: var_or("MAX_CONCURRENCY", 10)?,
                call_timeout: Duration::from_secs(var_or("CALL_TIMEOUT_SECS", 600)?),
                floor: FleetFloor {
                    threshold,
                    nominal: floor,
                },
            },
            run_deadline: var_opt::<u64>("RUN_DEADLINE_SECS")?.map(Duration::from_secs),
            scenario_template: var_opt("SCENARIO_TEMPLATE")?,
            api_base: url("EVI_API_BASE", DEFAULT_API_BASE)?,
            min_call_interval: Duration::from_millis(var_or("EVI_MIN_CALL_INTERVAL_MS", 1000)?),
        })
    }

    /// Fails when the input directory is missing.
    pub fn check_input_dir(&self) -> Result<(), ConfigurationError> {
        if self.input_dir.is_dir() {
            Ok(())
        } else {
            Err(ConfigurationError::MissingInputDir(self.input_dir.clone()))
        }
    }

    pub fn temperature_path(&self) -> PathBuf {
        self.input_dir.join(&self.temperature_file)
    }

    pub fn vehicle_path(&self) -> PathBuf {
        self.input_dir.join(&self.vehicle_file)
    }
}

#[derive(Clone, Debug)]
pub struct DownloadConfig {
    pub base_url: String,
    pub data_dir: PathBuf,
    pub workers: usize,
}

impl DownloadConfig {
    pub fn from_env() -> Result<Self, ConfigurationError> {
        let base_url = var("POPULATION_BASE_URL")
            .unwrap_or_else(|| DEFAULT_POPULATION_BASE_URL.to_string());
        Url::parse(&base_url).map_err(|_| ConfigurationError::InvalidValue {
            key: "POPULATION_BASE_URL".to_string(),
            value: base_url.clone(),
        })?;
        Ok(Self {
            base_url,
            data_dir: var_or("POPULATION_DATA_DIR", PathBuf::from("Population_Data"))?,
            workers: var_or("DOWNLOAD_WORKERS", 5)?,
        })
    }
}
