use crate::models::{RunId, WorkItemId};
use crate::pipeline::dispatch::CompletedTask;
use crate::pipeline::traits::LoadPlotter;
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Artifacts written for one completed work item.
#[derive(Clone, Debug, Serialize)]
pub struct PersistedCounty {
    pub work_item: WorkItemId,
    pub county: String,
    pub figures: Vec<PathBuf>,
    pub tables: Vec<PathBuf>,
}

#[derive(Clone, Debug, Serialize)]
pub struct FailedCounty {
    pub work_item: WorkItemId,
    pub county: String,
    pub reason: String,
}

/// Summary of one dispatch batch, written next to its outputs.
#[derive(Clone, Debug, Serialize)]
pub struct RunManifest {
    pub run_id: RunId,
    pub tag: Option<String>,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub succeeded: Vec<PersistedCounty>,
    pub failed: Vec<FailedCounty>,
}

impl RunManifest {
    pub fn new(run_id: RunId, tag: Option<String>) -> Self {
        Self {
            run_id,
            tag,
            started_at: Utc::now(),
            finished_at: None,
            succeeded: Vec::new(),
            failed: Vec::new(),
        }
    }

    pub fn file_name(&self) -> String {
        format!("run_{}_manifest.json", self.tag.as_deref().unwrap_or("all"))
    }
}

pub struct ResultSink<P: LoadPlotter> {
    plotter: P,
    output_dir: PathBuf,
    figure_dir: PathBuf,
}

fn ensure_dir(dir: &Path) -> std::io::Result<()> {
    if !dir.exists() {
        fs::create_dir_all(dir)?;
        info!(dir = %dir.display(), "created directory");
    }
    Ok(())
}

impl<P: LoadPlotter> ResultSink<P> {
    pub fn new(plotter: P, output_dir: PathBuf, figure_dir: PathBuf) -> std::io::Result<Self> {
        ensure_dir(&output_dir)?;
        ensure_dir(&figure_dir)?;
        Ok(Self {
            plotter,
            output_dir,
            figure_dir,
        })
    }

    /// Plots and writes every scenario of the task, in scenario-table order. On failure the
    /// artifacts already written for this task are removed, so a county is either complete
    /// on disk or absent.
    pub fn persist(&self, task: &CompletedTask) -> Result<PersistedCounty> {
        let mut persisted = PersistedCounty {
            work_item: task.id,
            county: task.county.clone(),
            figures: Vec::new(),
            tables: Vec::new(),
        };
        if let Err(e) = self.write_scenarios(task, &mut persisted) {
            for path in persisted.figures.iter().chain(&persisted.tables) {
                if !path.exists() {
                    continue;
                }
                if let Err(rm) = fs::remove_file(path) {
                    warn!(path = %path.display(), error = %rm, "failed to remove partial artifact");
                }
            }
            return Err(e);
        }
        Ok(persisted)
    }

    fn write_scenarios(&self, task: &CompletedTask, persisted: &mut PersistedCounty) -> Result<()> {
        for idx in 0..task.scenarios.len() {
            let stem = crate::models::artifact_stem(&task.county, task.tag.as_deref(), idx);
            let profile = task
                .result
                .get(idx)
                .with_context(|| format!("{}: model returned no scenario {idx}", task.county))?;

            let figure = self
                .figure_dir
                .join(format!("{stem}.{}", self.plotter.extension()));
            self.plotter.plot(&task.result, idx, &figure)?;
            persisted.figures.push(figure);

            let table = self.output_dir.join(format!("{stem}.csv"));
            let file = File::create(&table)
                .with_context(|| format!("creating {}", table.display()))?;
            persisted.tables.push(table.clone());
            let mut writer = csv::Writer::from_writer(file);
            for row in profile.rows() {
                writer.serialize(row)?;
            }
            writer.flush()?;
        }
        Ok(())
    }

    pub fn write_manifest(&self, manifest: &RunManifest) -> Result<PathBuf> {
        let path = self.output_dir.join(manifest.file_name());
        let body = serde_json::to_string_pretty(manifest)?;
        fs::write(&path, body).with_context(|| format!("writing {}", path.display()))?;
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{LoadRow, ModelResult, ScenarioTemplate, TemperatureRecord};
    use crate::pipeline::mock::{DummyChargingModel, DummyPlotter};
    use crate::pipeline::plot::SvgLoadPlotter;
    use chrono::NaiveDate;
    use std::sync::Mutex;
    use tempfile::tempdir;

    #[derive(Default)]
    struct RecordingPlotter {
        calls: Mutex<Vec<(usize, PathBuf)>>,
    }

    impl LoadPlotter for RecordingPlotter {
        fn plot(&self, _result: &ModelResult, scenario: usize, path: &Path) -> Result<()> {
            self.calls.lock().unwrap().push((scenario, path.to_path_buf()));
            Ok(())
        }

        fn extension(&self) -> &'static str {
            "png"
        }
    }

    fn task(county: &str) -> CompletedTask {
        let day = NaiveDate::from_ymd_opt(2018, 12, 3).unwrap();
        let temps = vec![TemperatureRecord::new(day, 0.0)];
        let scenarios = ScenarioTemplate::default().instantiate(30_000, 0.0);
        let mut result = ModelResult::default();
        for (i, s) in scenarios.iter().enumerate() {
            result.insert(i, DummyChargingModel::profile(s, &temps));
        }
        CompletedTask {
            id: WorkItemId(4),
            county: county.to_string(),
            tag: Some("month12".to_string()),
            scale_factors: vec![1.0; scenarios.len()],
            scenarios,
            result,
        }
    }

    #[test]
    fn persists_plot_and_table_per_scenario() {
        let dir = tempdir().unwrap();
        let sink = ResultSink::new(
            RecordingPlotter::default(),
            dir.path().join("out"),
            dir.path().join("fig"),
        )
        .unwrap();
        let persisted = sink.persist(&task("St Lawrence")).unwrap();

        let calls = sink.plotter.calls.lock().unwrap().clone();
        assert_eq!(calls.len(), 2);
        assert_eq!(
            calls[1].1,
            dir.path().join("fig").join("St_Lawrence_month12_scen1_temp_gridLoad.png")
        );
        assert_eq!(
            persisted.tables[0],
            dir.path().join("out").join("St_Lawrence_month12_scen0_temp_gridLoad.csv")
        );

        let mut reader = csv::Reader::from_path(&persisted.tables[0]).unwrap();
        let headers = reader.headers().unwrap().clone();
        assert_eq!(
            headers.iter().collect::<Vec<_>>(),
            vec!["time", "home_l1", "home_l2", "work_l1", "work_l2", "public_l2", "public_l3"]
        );
        let rows: Vec<LoadRow> = reader.deserialize().map(|r| r.unwrap()).collect();
        let expected: Vec<LoadRow> = task("x").result.get(0).unwrap().rows().collect();
        assert_eq!(rows, expected);
    }

    #[test]
    fn missing_scenario_in_result_fails() {
        let dir = tempdir().unwrap();
        let sink = ResultSink::new(DummyPlotter, dir.path().join("o"), dir.path().join("f")).unwrap();
        let mut t = task("Kings");
        t.result.scenarios.remove(&1);
        assert!(sink.persist(&t).is_err());
    }

    #[test]
    fn failed_persist_leaves_no_partial_artifacts() {
        let dir = tempdir().unwrap();
        let sink = ResultSink::new(
            SvgLoadPlotter::default(),
            dir.path().join("o"),
            dir.path().join("f"),
        )
        .unwrap();
        let mut t = task("Kings");
        t.result.scenarios.remove(&1);
        assert!(sink.persist(&t).is_err());

        assert_eq!(fs::read_dir(dir.path().join("o")).unwrap().count(), 0);
        assert_eq!(fs::read_dir(dir.path().join("f")).unwrap().count(), 0);
    }

    #[test]
    fn manifest_is_named_by_tag() {
        let dir = tempdir().unwrap();
        let sink = ResultSink::new(DummyPlotter, dir.path().join("o"), dir.path().join("f")).unwrap();
        let manifest = RunManifest::new(RunId::new(), Some("month1".to_string()));
        let path = sink.write_manifest(&manifest).unwrap();
        assert!(path.ends_with("run_month1_manifest.json"));
        let raw: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(path).unwrap()).unwrap();
        assert_eq!(raw["tag"], "month1");
    }
}
