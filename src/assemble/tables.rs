use crate::error::ConfigurationError;
use chrono::{NaiveDate, NaiveDateTime};
use std::collections::BTreeMap;
use std::fs::File;
use std::path::Path;

const TIMESTAMP_FORMATS: [&str; 2] = ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"];

fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    for fmt in TIMESTAMP_FORMATS {
        if let Ok(ts) = NaiveDateTime::parse_from_str(raw, fmt) {
            return Some(ts);
        }
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
}

/// `"NY, Albany County"` -> `"Albany County"`; headers without a comma are kept whole.
pub fn county_from_header(header: &str) -> String {
    match header.split(',').nth(1) {
        Some(name) => name.trim().to_string(),
        None => header.trim().to_string(),
    }
}

fn open(path: &Path) -> Result<csv::Reader<File>, ConfigurationError> {
    if !path.is_file() {
        return Err(ConfigurationError::MissingFile(path.to_path_buf()));
    }
    let file = File::open(path)?;
    Ok(csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(file))
}

fn malformed(path: &Path, reason: impl Into<String>) -> ConfigurationError {
    ConfigurationError::MalformedTable {
        path: path.to_path_buf(),
        reason: reason.into(),
    }
}

/// Time-indexed temperatures, one column per county.
#[derive(Clone, Debug, PartialEq)]
pub struct TemperatureTable {
    pub index: Vec<NaiveDateTime>,
    pub counties: Vec<String>,
    /// Column-major: `values[county][row]`.
    pub values: Vec<Vec<f64>>,
}

impl TemperatureTable {
    pub fn from_csv(path: impl AsRef<Path>) -> Result<Self, ConfigurationError> {
        let path = path.as_ref();
        let mut reader = open(path)?;
        let headers = reader.headers()?.clone();
        if headers.len() < 2 {
            return Err(malformed(path, "expected a timestamp column and county columns"));
        }
        let counties: Vec<String> = headers.iter().skip(1).map(county_from_header).collect();
        let mut index = Vec::new();
        let mut values = vec![Vec::new(); counties.len()];

        for (idx, record) in reader.records().enumerate() {
            let record = record?;
            let line = idx + 2;
            let ts = record
                .get(0)
                .and_then(parse_timestamp)
                .ok_or_else(|| malformed(path, format!("line {line}: bad timestamp")))?;
            index.push(ts);
            for (col, column) in values.iter_mut().enumerate() {
                let raw = record.get(col + 1).unwrap_or("");
                let v = if raw.is_empty() {
                    f64::NAN
                } else {
                    raw.parse::<f64>().map_err(|_| {
                        malformed(path, format!("line {line}: bad temperature '{raw}'"))
                    })?
                };
                column.push(v);
            }
        }
        Ok(Self {
            index,
            counties,
            values,
        })
    }

    pub fn column(&self, county: &str) -> Option<&[f64]> {
        self.counties
            .iter()
            .position(|c| c == county)
            .map(|i| self.values[i].as_slice())
    }

    /// Calendar-day means; missing values are left out of each mean.
    pub fn daily_mean(&self) -> Self {
        let mut days: BTreeMap<NaiveDate, Vec<usize>> = BTreeMap::new();
        for (row, ts) in self.index.iter().enumerate() {
            days.entry(ts.date()).or_default().push(row);
        }
        let index = days
            .keys()
            .filter_map(|d| d.and_hms_opt(0, 0, 0))
            .collect();
        let values = self
            .values
            .iter()
            .map(|column| {
                days.values()
                    .map(|rows| {
                        let present: Vec<f64> = rows
                            .iter()
                            .map(|r| column[*r])
                            .filter(|v| !v.is_nan())
                            .collect();
                        if present.is_empty() {
                            f64::NAN
                        } else {
                            present.iter().sum::<f64>() / present.len() as f64
                        }
                    })
                    .collect()
            })
            .collect();
        Self {
            index,
            counties: self.counties.clone(),
            values,
        }
    }
}

/// Projected vehicle counts, one row per county and one column per year.
#[derive(Clone, Debug, PartialEq)]
pub struct VehicleTable {
    years: Vec<i32>,
    rows: BTreeMap<String, Vec<f64>>,
}

impl VehicleTable {
    pub fn from_csv(path: impl AsRef<Path>) -> Result<Self, ConfigurationError> {
        let path = path.as_ref();
        let mut reader = open(path)?;
        let headers = reader.headers()?.clone();
        let years = headers
            .iter()
            .skip(1)
            .map(|h| {
                h.parse::<i32>()
                    .map_err(|_| malformed(path, format!("year header '{h}' is not a year")))
            })
            .collect::<Result<Vec<_>, _>>()?;

        let mut rows = BTreeMap::new();
        for record in reader.records() {
            let record = record?;
            let county = record.get(0).unwrap_or("").to_string();
            let counts = record
                .iter()
                .skip(1)
                .map(|v| {
                    v.parse::<f64>()
                        .map_err(|_| malformed(path, format!("{county}: bad count '{v}'")))
                })
                .collect::<Result<Vec<_>, _>>()?;
            rows.insert(county, counts);
        }
        Ok(Self { years, rows })
    }

    pub fn years(&self) -> &[i32] {
        &self.years
    }

    /// Counties in alphabetical order.
    pub fn counties(&self) -> impl Iterator<Item = &str> {
        self.rows.keys().map(String::as_str)
    }

    /// Projected fleet for a county and year, rounded to whole vehicles since the charging
    /// model takes an integer fleet size.
    pub fn fleet_size(&self, county: &str, year: i32) -> Result<u64, ConfigurationError> {
        let col = self
            .years
            .iter()
            .position(|y| *y == year)
            .ok_or(ConfigurationError::UnknownYear { year })?;
        let row = self
            .rows
            .get(county)
            .ok_or_else(|| ConfigurationError::UnknownCounty {
                county: county.to_string(),
                table: "vehicle table",
            })?;
        let count = row.get(col).copied().unwrap_or(f64::NAN);
        if !count.is_finite() || count < 0.0 {
            return Err(ConfigurationError::InvalidValue {
                key: format!("vehicles[{county}][{year}]"),
                value: count.to_string(),
            });
        }
        Ok(count.round() as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn county_header_takes_second_field() {
        assert_eq!(county_from_header("NY, Albany County"), "Albany County");
        assert_eq!(county_from_header("Albany"), "Albany");
    }

    #[test]
    fn temperature_table_resamples_to_days() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("temp.csv");
        fs::write(
            &path,
            "timestamp,\"NY, Albany\",\"NY, Kings\"\n\
             2018-01-01 00:00:00,1.0,10.0\n\
             2018-01-01 12:00:00,3.0,12.0\n\
             2018-01-02 00:00:00,-2.0,\n",
        )
        .unwrap();
        let table = TemperatureTable::from_csv(&path).unwrap();
        assert_eq!(table.counties, vec!["Albany", "Kings"]);
        let daily = table.daily_mean();
        assert_eq!(daily.index.len(), 2);
        assert_eq!(daily.column("Albany").unwrap(), &[2.0, -2.0]);
        assert_eq!(daily.column("Kings").unwrap()[0], 11.0);
        assert!(daily.column("Kings").unwrap()[1].is_nan());
    }

    #[test]
    fn vehicle_table_lookups() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("vehicles.csv");
        fs::write(&path, "county,2030,2035\nKings,900000.4,1000000.6\nAlbany,5000,7000\n").unwrap();
        let table = VehicleTable::from_csv(&path).unwrap();
        assert_eq!(table.fleet_size("Kings", 2035).unwrap(), 1_000_001);
        assert_eq!(table.counties().collect::<Vec<_>>(), vec!["Albany", "Kings"]);
        assert!(matches!(
            table.fleet_size("Kings", 2050),
            Err(ConfigurationError::UnknownYear { year: 2050 })
        ));
        assert!(matches!(
            table.fleet_size("Queens", 2035),
            Err(ConfigurationError::UnknownCounty { .. })
        ));
    }

    #[test]
    fn missing_file_is_configuration_error() {
        let dir = tempdir().unwrap();
        assert!(matches!(
            VehicleTable::from_csv(dir.path().join("nope.csv")),
            Err(ConfigurationError::MissingFile(_))
        ));
    }
}
