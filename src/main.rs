use anyhow::Context;
use dotenv::dotenv;
use ny_ev_proj::assemble::{InputAssembler, TemperatureTable, VehicleTable};
use ny_ev_proj::config::RunConfig;
use ny_ev_proj::credentials;
use ny_ev_proj::models::ScenarioTemplate;
use ny_ev_proj::pipeline::{
    Dispatcher, EviProLiteClient, ProjectionPipeline, ResultSink, SvgLoadPlotter,
};
use std::fs;
use std::io::{self, BufRead, Write};
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info};

fn prompt_for_key() -> io::Result<String> {
    print!("Enter API key: ");
    io::stdout().flush()?;
    let mut line = String::new();
    io::stdin().lock().read_line(&mut line)?;
    Ok(line)
}

async fn run() -> anyhow::Result<()> {
    let config = RunConfig::from_env()?;
    config.check_input_dir()?;
    info!(input = %config.input_dir.display(), "input directory");
    info!(output = %config.output_dir.display(), figures = %config.figure_dir.display(), "output directories");

    let pool = credentials::resolve(&config.credentials, prompt_for_key)?;
    info!(credentials = pool.len(), "credential pool ready");

    let template = match &config.scenario_template {
        Some(path) => {
            let raw = fs::read_to_string(path)
                .with_context(|| format!("reading scenario template {}", path.display()))?;
            ScenarioTemplate::from_json(&raw)
                .with_context(|| format!("parsing scenario template {}", path.display()))?
        }
        None => ScenarioTemplate::default(),
    };

    let temperatures = TemperatureTable::from_csv(config.temperature_path())?;
    let vehicles = VehicleTable::from_csv(config.vehicle_path())?;
    let counties = match &config.counties {
        Some(list) => list.clone(),
        None => {
            let mut all = temperatures.counties.clone();
            all.sort();
            all
        }
    };

    let assembler = InputAssembler {
        temperatures,
        vehicles,
        template,
        year: config.year,
        resolution: config.resolution,
        audit_dir: Some(config.output_dir.clone()),
    };

    let model = EviProLiteClient::new(config.api_base.clone(), config.min_call_interval);
    let sink = ResultSink::new(
        SvgLoadPlotter::default(),
        config.output_dir.clone(),
        config.figure_dir.clone(),
    )?;
    let mut pipeline = ProjectionPipeline::new(Dispatcher::new(Arc::new(model), config.dispatch), sink);
    if let Some(limit) = config.run_deadline {
        pipeline = pipeline.with_deadline(limit);
    }
    info!(run_id = %pipeline.run_id, "run started");

    for period in &config.periods {
        let items = assembler.assemble(&counties, *period)?;
        let manifest = pipeline.run_batch(items, &pool, period.tag()).await?;
        info!(period = ?period, failed = manifest.failed.len(), "finished period");
    }
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenv().ok();
    ny_ev_proj::telemetry::init();

    let start = Instant::now();
    match run().await {
        Ok(()) => {
            info!(elapsed_secs = start.elapsed().as_secs_f64(), "finished running the model");
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!(error = %format!("{e:#}"), "fatal");
            ExitCode::FAILURE
        }
    }
}
