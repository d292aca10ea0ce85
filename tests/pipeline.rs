//! End-to-end runs from input tables to persisted artifacts with offline collaborators.

use async_trait::async_trait;
use ny_ev_proj::assemble::{
    read_scenario_table, InputAssembler, Period, Resolution, TemperatureTable, VehicleTable,
};
use ny_ev_proj::credentials::CredentialPool;
use ny_ev_proj::error::RunError;
use ny_ev_proj::models::{
    Credential, ModelResult, ScenarioRecord, ScenarioTemplate, TemperatureRecord, CREDENTIAL_LEN,
};
use ny_ev_proj::pipeline::{
    ChargingModel, DispatchConfig, Dispatcher, DummyChargingModel, LoadPlotter,
    ProjectionPipeline, ResultSink, SvgLoadPlotter,
};
use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tempfile::tempdir;

const COUNTIES: [&str; 3] = ["Albany", "Hamilton", "St Lawrence"];

fn write_inputs(dir: &Path) -> InputAssembler {
    let mut temp = String::from("timestamp");
    for c in COUNTIES {
        temp.push_str(&format!(",\"NY, {c}\""));
    }
    temp.push('\n');
    for day in 1..=4 {
        for hour in [0, 6, 12, 18] {
            temp.push_str(&format!("2018-12-{day:02} {hour:02}:00:00,1.5,-7.0,-3.0\n"));
        }
    }
    fs::write(dir.join("temp.csv"), temp).unwrap();
    fs::write(
        dir.join("vehicles.csv"),
        "county,2030,2035\nAlbany,200000,220000\nHamilton,4000,4000\nSt Lawrence,60000,65000\n",
    )
    .unwrap();

    InputAssembler {
        temperatures: TemperatureTable::from_csv(dir.join("temp.csv")).unwrap(),
        vehicles: VehicleTable::from_csv(dir.join("vehicles.csv")).unwrap(),
        template: ScenarioTemplate::default(),
        year: 2035,
        resolution: Resolution::Daily,
        audit_dir: Some(dir.join("OutputData")),
    }
}

fn pool() -> CredentialPool {
    let keys: Vec<String> = ['A', 'B']
        .iter()
        .map(|c| std::iter::repeat(*c).take(CREDENTIAL_LEN).collect())
        .collect();
    CredentialPool::from_candidates(keys).unwrap()
}

fn counties() -> Vec<String> {
    COUNTIES.iter().map(|c| c.to_string()).collect()
}

struct FailsFor(&'static str);

#[async_trait]
impl ChargingModel for FailsFor {
    async fn run(
        &self,
        scenarios: &[ScenarioRecord],
        temperatures: &[TemperatureRecord],
        credential: &Credential,
        county: &str,
    ) -> anyhow::Result<ModelResult> {
        if county == self.0 {
            anyhow::bail!("connection reset");
        }
        DummyChargingModel::default()
            .run(scenarios, temperatures, credential, county)
            .await
    }
}

#[tokio::test]
async fn full_batch_writes_every_artifact() {
    let dir = tempdir().unwrap();
    let assembler = write_inputs(dir.path());
    let items = assembler.assemble(&counties(), Period::Month(12)).unwrap();

    let sink = ResultSink::new(
        SvgLoadPlotter::default(),
        dir.path().join("OutputData"),
        dir.path().join("Figures"),
    )
    .unwrap();
    let pipeline = ProjectionPipeline::new(
        Dispatcher::new(Arc::new(DummyChargingModel::default()), DispatchConfig::default()),
        sink,
    );
    let manifest = pipeline
        .run_batch(items, &pool(), Some("month12".to_string()))
        .await
        .unwrap();

    assert_eq!(manifest.succeeded.len(), 3);
    assert!(manifest.failed.is_empty());
    let out = dir.path().join("OutputData");
    for stem in [
        "Albany_month12_scen0_temp_gridLoad",
        "Hamilton_month12_scen1_temp_gridLoad",
        "St_Lawrence_month12_scen1_temp_gridLoad",
    ] {
        assert!(out.join(format!("{stem}.csv")).is_file(), "{stem}.csv");
        assert!(dir.path().join("Figures").join(format!("{stem}.svg")).is_file());
    }
    assert!(out.join("run_month12_manifest.json").is_file());

    // Audit table keeps the projected fleet, not the substituted one.
    let hamilton = read_scenario_table(out.join("Hamilton_month12_scenarios.csv")).unwrap();
    assert_eq!(hamilton[0].fleet_size, 4000);

    let mut reader =
        csv::Reader::from_path(out.join("Hamilton_month12_scen0_temp_gridLoad.csv")).unwrap();
    let first: Vec<String> = reader
        .records()
        .next()
        .unwrap()
        .unwrap()
        .iter()
        .map(str::to_string)
        .collect();
    assert_eq!(first[0], "2018-12-01T00:00:00");
    // 4000 vehicles on a Saturday: 0.001 * 4000 * 0.8, rescaled from the 10,000 floor.
    let home_l1: f64 = first[1].parse().unwrap();
    assert!((home_l1 - 3.2).abs() < 1e-9);
}

#[tokio::test]
async fn failed_county_is_reported_and_skipped() {
    let dir = tempdir().unwrap();
    let assembler = write_inputs(dir.path());
    let items = assembler.assemble(&counties(), Period::Month(12)).unwrap();

    let sink = ResultSink::new(
        SvgLoadPlotter::default(),
        dir.path().join("OutputData"),
        dir.path().join("Figures"),
    )
    .unwrap();
    let pipeline = ProjectionPipeline::new(
        Dispatcher::new(Arc::new(FailsFor("Hamilton")), DispatchConfig::default()),
        sink,
    );
    let manifest = pipeline
        .run_batch(items, &pool(), Some("month12".to_string()))
        .await
        .unwrap();

    assert_eq!(manifest.succeeded.len(), 2);
    assert_eq!(manifest.failed.len(), 1);
    assert_eq!(manifest.failed[0].county, "Hamilton");
    assert!(manifest.failed[0].reason.contains("connection reset"));
    let out = dir.path().join("OutputData");
    assert!(!out.join("Hamilton_month12_scen0_temp_gridLoad.csv").exists());
    assert!(out.join("Albany_month12_scen0_temp_gridLoad.csv").is_file());
}

#[tokio::test]
async fn run_deadline_aborts_outstanding_work() {
    let dir = tempdir().unwrap();
    let assembler = write_inputs(dir.path());
    let items = assembler.assemble(&counties(), Period::All).unwrap();

    let sink = ResultSink::new(
        SvgLoadPlotter::default(),
        dir.path().join("OutputData"),
        dir.path().join("Figures"),
    )
    .unwrap();
    let model = DummyChargingModel::with_delay(Duration::from_secs(5));
    let pipeline = ProjectionPipeline::new(
        Dispatcher::new(Arc::new(model), DispatchConfig::default()),
        sink,
    )
    .with_deadline(Duration::from_millis(50));

    let err = pipeline.run_batch(items, &pool(), None).await.unwrap_err();
    assert!(matches!(err, RunError::DeadlineExceeded { pending: 3, .. }));
}

#[tokio::test]
async fn hourly_series_writes_each_hour_once() {
    let dir = tempdir().unwrap();
    let mut assembler = write_inputs(dir.path());
    assembler.resolution = Resolution::Hourly;
    let items = assembler.assemble(&counties(), Period::Month(12)).unwrap();
    assert_eq!(items[0].temperatures.len(), 16);

    let sink = ResultSink::new(
        SvgLoadPlotter::default(),
        dir.path().join("OutputData"),
        dir.path().join("Figures"),
    )
    .unwrap();
    let pipeline = ProjectionPipeline::new(
        Dispatcher::new(Arc::new(DummyChargingModel::default()), DispatchConfig::default()),
        sink,
    );
    let manifest = pipeline
        .run_batch(items, &pool(), Some("month12".to_string()))
        .await
        .unwrap();
    assert_eq!(manifest.succeeded.len(), 3);

    let path = dir
        .path()
        .join("OutputData")
        .join("Albany_month12_scen0_temp_gridLoad.csv");
    let times: Vec<String> = csv::Reader::from_path(path)
        .unwrap()
        .records()
        .map(|r| r.unwrap()[0].to_string())
        .collect();
    // Four readings a day, four quarter-hour steps per reading.
    assert_eq!(times.len(), 4 * 4 * 4);
    let unique: std::collections::BTreeSet<&String> = times.iter().collect();
    assert_eq!(unique.len(), times.len());
    assert_eq!(times[1], "2018-12-01T00:15:00");
    assert_eq!(times[4], "2018-12-01T06:00:00");
}

/// Blocks on the runtime while plotting, which is only allowed off the async workers.
struct BlockingPlotter;

impl LoadPlotter for BlockingPlotter {
    fn plot(&self, _result: &ModelResult, _scenario: usize, _path: &Path) -> anyhow::Result<()> {
        tokio::runtime::Handle::current().block_on(std::future::ready(()));
        Ok(())
    }

    fn extension(&self) -> &'static str {
        "png"
    }
}

#[tokio::test]
async fn persistence_runs_on_blocking_threads() {
    let dir = tempdir().unwrap();
    let assembler = write_inputs(dir.path());
    let items = assembler.assemble(&counties(), Period::Month(12)).unwrap();

    let sink = ResultSink::new(
        BlockingPlotter,
        dir.path().join("OutputData"),
        dir.path().join("Figures"),
    )
    .unwrap();
    let pipeline = ProjectionPipeline::new(
        Dispatcher::new(Arc::new(DummyChargingModel::default()), DispatchConfig::default()),
        sink,
    );
    let manifest = pipeline
        .run_batch(items, &pool(), Some("month12".to_string()))
        .await
        .unwrap();

    assert!(manifest.failed.is_empty(), "{:?}", manifest.failed);
    assert_eq!(manifest.succeeded.len(), 3);
}
