use chrono::{Datelike, NaiveDate, NaiveDateTime, Timelike};
use serde::{Deserialize, Serialize};
use std::ops::Range;

/// 15-minute resolution.
pub const STEPS_PER_DAY: usize = 96;

const STEPS_PER_HOUR: usize = STEPS_PER_DAY / 24;

/// One row of a county temperature series as the charging model consumes it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TemperatureRecord {
    pub date: NaiveDate,
    /// Hour of day for hourly series; `None` when the record covers the whole day.
    #[serde(default)]
    pub hour: Option<u32>,
    /// 0 = Monday .. 6 = Sunday.
    pub weekday: u8,
    pub temp_c: f64,
}

impl TemperatureRecord {
    /// A whole-day record.
    pub fn new(date: NaiveDate, temp_c: f64) -> Self {
        Self {
            date,
            hour: None,
            weekday: date.weekday().num_days_from_monday() as u8,
            temp_c,
        }
    }

    /// A record covering the hour starting at `ts`.
    pub fn hourly(ts: NaiveDateTime, temp_c: f64) -> Self {
        Self {
            hour: Some(ts.hour()),
            ..Self::new(ts.date(), temp_c)
        }
    }

    /// Quarter-hour steps of the day this record covers.
    pub fn steps(&self) -> Range<usize> {
        match self.hour {
            None => 0..STEPS_PER_DAY,
            Some(h) => {
                let start = h as usize * STEPS_PER_HOUR;
                start..start + STEPS_PER_HOUR
            }
        }
    }

    pub fn is_weekday(&self) -> bool {
        self.weekday < 5
    }
}

pub fn mean_temperature(series: &[TemperatureRecord]) -> Option<f64> {
    if series.is_empty() {
        return None;
    }
    Some(series.iter().map(|r| r.temp_c).sum::<f64>() / series.len() as f64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn weekday_indicator_follows_monday_zero() {
        // 2018-12-01 was a Saturday.
        let sat = TemperatureRecord::new(NaiveDate::from_ymd_opt(2018, 12, 1).unwrap(), 1.0);
        let mon = TemperatureRecord::new(NaiveDate::from_ymd_opt(2018, 12, 3).unwrap(), 1.0);
        assert_eq!(sat.weekday, 5);
        assert!(!sat.is_weekday());
        assert_eq!(mon.weekday, 0);
        assert!(mon.is_weekday());
    }

    #[test]
    fn hourly_record_covers_four_steps() {
        let ts = NaiveDate::from_ymd_opt(2018, 12, 3)
            .unwrap()
            .and_hms_opt(13, 0, 0)
            .unwrap();
        let r = TemperatureRecord::hourly(ts, -2.0);
        assert_eq!(r.hour, Some(13));
        assert_eq!(r.steps(), 52..56);
        assert_eq!(TemperatureRecord::new(ts.date(), 0.0).steps(), 0..STEPS_PER_DAY);
    }

    #[test]
    fn mean_of_empty_series_is_none() {
        assert_eq!(mean_temperature(&[]), None);
    }
}
