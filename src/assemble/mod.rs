//! Builds one [`WorkItem`] per county from the raw temperature and vehicle tables.

pub mod tables;

pub use tables::{county_from_header, TemperatureTable, VehicleTable};

use crate::error::ConfigurationError;
use crate::models::{
    mean_temperature, scenario_table_name, ScenarioRecord, ScenarioTemplate, TemperatureRecord,
    WorkItem, WorkItemId,
};
use chrono::Datelike;
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Resolution {
    Hourly,
    Daily,
}

/// Portion of the temperature series handed to the model.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Period {
    All,
    /// Calendar month, 1..=12.
    Month(u32),
    FirstDays(usize),
}

impl Period {
    /// Label carried into artifact names.
    pub fn tag(&self) -> Option<String> {
        match self {
            Period::Month(m) => Some(format!("month{m}")),
            Period::All | Period::FirstDays(_) => None,
        }
    }
}

pub struct InputAssembler {
    pub temperatures: TemperatureTable,
    pub vehicles: VehicleTable,
    pub template: ScenarioTemplate,
    pub year: i32,
    pub resolution: Resolution,
    /// Where scenario tables are written for audit. `None` skips the write.
    pub audit_dir: Option<PathBuf>,
}

impl InputAssembler {
    /// Work items for `counties` in the given order, ids assigned by position.
    pub fn assemble(
        &self,
        counties: &[String],
        period: Period,
    ) -> Result<Vec<WorkItem>, ConfigurationError> {
        if !self.vehicles.years().contains(&self.year) {
            return Err(ConfigurationError::UnknownYear { year: self.year });
        }
        let table = match self.resolution {
            Resolution::Daily => self.temperatures.daily_mean(),
            Resolution::Hourly => self.temperatures.clone(),
        };
        let tag = period.tag();

        let mut items = Vec::with_capacity(counties.len());
        for (idx, county) in counties.iter().enumerate() {
            let temperatures = county_series(&table, county, period, self.resolution)?;
            let temp_c = mean_temperature(&temperatures).ok_or_else(|| {
                ConfigurationError::EmptySeries {
                    county: county.clone(),
                }
            })?;
            let fleet_size = self.vehicles.fleet_size(county, self.year)?;
            let scenarios = self.template.instantiate(fleet_size, temp_c);

            if let Some(dir) = &self.audit_dir {
                let path = dir.join(scenario_table_name(county, tag.as_deref()));
                write_scenario_table(&path, &scenarios)?;
                debug!(county = %county, path = %path.display(), "scenario table written");
            }

            items.push(WorkItem {
                id: WorkItemId(idx),
                county: county.clone(),
                tag: tag.clone(),
                temperatures,
                scenarios,
            });
        }
        info!(
            count = items.len(),
            year = self.year,
            period = ?period,
            "work items assembled"
        );
        Ok(items)
    }
}

fn county_series(
    table: &TemperatureTable,
    county: &str,
    period: Period,
    resolution: Resolution,
) -> Result<Vec<TemperatureRecord>, ConfigurationError> {
    let column = table
        .column(county)
        .ok_or_else(|| ConfigurationError::UnknownCounty {
            county: county.to_string(),
            table: "temperature table",
        })?;
    let rows = table
        .index
        .iter()
        .zip(column.iter())
        .filter(|(_, v)| !v.is_nan())
        .map(|(ts, v)| match resolution {
            Resolution::Daily => TemperatureRecord::new(ts.date(), *v),
            Resolution::Hourly => TemperatureRecord::hourly(*ts, *v),
        });

    let series: Vec<TemperatureRecord> = match period {
        Period::All => rows.collect(),
        Period::Month(m) => rows.filter(|r| r.date.month() == m).collect(),
        Period::FirstDays(n) => {
            let mut days = Vec::new();
            rows.take_while(|r| {
                if !days.contains(&r.date) {
                    days.push(r.date);
                }
                days.len() <= n
            })
            .collect()
        }
    };
    if series.is_empty() {
        return Err(ConfigurationError::EmptySeries {
            county: county.to_string(),
        });
    }
    Ok(series)
}

pub fn write_scenario_table(
    path: impl AsRef<Path>,
    scenarios: &[ScenarioRecord],
) -> Result<(), ConfigurationError> {
    let path = path.as_ref();
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let mut writer = csv::Writer::from_writer(File::create(path)?);
    for record in scenarios {
        writer.serialize(record)?;
    }
    writer.flush()?;
    Ok(())
}

pub fn read_scenario_table(path: impl AsRef<Path>) -> Result<Vec<ScenarioRecord>, ConfigurationError> {
    let path = path.as_ref();
    if !path.is_file() {
        return Err(ConfigurationError::MissingFile(path.to_path_buf()));
    }
    let mut reader = csv::Reader::from_path(path)?;
    let records = reader
        .deserialize()
        .collect::<Result<Vec<ScenarioRecord>, csv::Error>>()?;
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn fixture(dir: &Path) -> InputAssembler {
        let temp = dir.join("temp.csv");
        let mut body = String::from("timestamp,\"NY, Albany\",\"NY, St Lawrence\"\n");
        // 2018-11-29 .. 2018-12-03, two readings a day.
        for day in ["2018-11-29", "2018-11-30", "2018-12-01", "2018-12-02", "2018-12-03"] {
            body.push_str(&format!("{day} 00:00:00,0.0,-10.0\n"));
            body.push_str(&format!("{day} 12:00:00,4.0,-6.0\n"));
        }
        fs::write(&temp, body).unwrap();
        let vehicles = dir.join("vehicles.csv");
        fs::write(&vehicles, "county,2035\nAlbany,220000\nSt Lawrence,8000\n").unwrap();

        InputAssembler {
            temperatures: TemperatureTable::from_csv(&temp).unwrap(),
            vehicles: VehicleTable::from_csv(&vehicles).unwrap(),
            template: ScenarioTemplate::default(),
            year: 2035,
            resolution: Resolution::Daily,
            audit_dir: Some(dir.join("out")),
        }
    }

    #[test]
    fn assembles_month_restricted_items() {
        let dir = tempdir().unwrap();
        let assembler = fixture(dir.path());
        let counties = vec!["Albany".to_string(), "St Lawrence".to_string()];
        let items = assembler.assemble(&counties, Period::Month(12)).unwrap();

        assert_eq!(items.len(), 2);
        assert_eq!(items[1].id, WorkItemId(1));
        assert_eq!(items[1].county, "St Lawrence");
        assert_eq!(items[1].tag.as_deref(), Some("month12"));
        assert_eq!(items[0].temperatures.len(), 3);
        assert_eq!(items[0].temperatures[0].temp_c, 2.0);
        // 2018-12-01 is a Saturday.
        assert_eq!(items[0].temperatures[0].weekday, 5);
        assert_eq!(items[1].scenarios[0].fleet_size, 8000);
        assert_eq!(items[1].scenarios[0].temp_c, -8.0);

        let audit = dir.path().join("out").join("St_Lawrence_month12_scenarios.csv");
        assert_eq!(read_scenario_table(&audit).unwrap(), items[1].scenarios);
    }

    #[test]
    fn first_days_keeps_leading_days() {
        let dir = tempdir().unwrap();
        let mut assembler = fixture(dir.path());
        assembler.resolution = Resolution::Hourly;
        assembler.audit_dir = None;
        let items = assembler
            .assemble(&["Albany".to_string()], Period::FirstDays(2))
            .unwrap();
        assert_eq!(items[0].temperatures.len(), 4);
        assert_eq!(items[0].tag, None);
    }

    #[test]
    fn hourly_series_keeps_hour_of_each_reading() {
        let dir = tempdir().unwrap();
        let mut assembler = fixture(dir.path());
        assembler.resolution = Resolution::Hourly;
        assembler.audit_dir = None;
        let items = assembler
            .assemble(&["St Lawrence".to_string()], Period::FirstDays(1))
            .unwrap();
        let series = &items[0].temperatures;
        assert_eq!(series.len(), 2);
        assert_eq!(series[0].hour, Some(0));
        assert_eq!(series[1].hour, Some(12));
        assert_eq!(series[1].steps(), 48..52);
    }

    #[test]
    fn unknown_county_or_year_fails() {
        let dir = tempdir().unwrap();
        let mut assembler = fixture(dir.path());
        assert!(matches!(
            assembler.assemble(&["Queens".to_string()], Period::All),
            Err(ConfigurationError::UnknownCounty { .. })
        ));
        assembler.year = 2040;
        assert!(matches!(
            assembler.assemble(&["Albany".to_string()], Period::All),
            Err(ConfigurationError::UnknownYear { year: 2040 })
        ));
    }

    #[test]
    fn scenario_table_round_trips() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("scen.csv");
        let mut rows = ScenarioTemplate::default().instantiate(12_345, -3.25);
        rows[1].mean_dvmt = 41.5;
        write_scenario_table(&path, &rows).unwrap();

        let header = fs::read_to_string(&path).unwrap();
        assert!(header.starts_with(
            "fleet_size,mean_dvmt,temp_c,pev_type,pev_dist,class_dist,home_access_dist,\
             home_power_dist,work_power_dist,pref_dist,res_charging,work_charging\n"
        ));
        assert!(header.contains("PHEV50,EQUAL,Equal,HA75,MostL1,MostL2,Home60,max_delay,min_delay"));
        assert_eq!(read_scenario_table(&path).unwrap(), rows);
    }
}
