use dotenv::dotenv;
use ny_ev_proj::config::DownloadConfig;
use ny_ev_proj::population::{county_ids, PopulationDownloader};
use std::process::ExitCode;
use std::time::Instant;
use tracing::{error, info};

async fn run() -> anyhow::Result<()> {
    let config = DownloadConfig::from_env()?;
    let ids = county_ids();
    let total = ids.len();
    let start = Instant::now();
    let report = PopulationDownloader::new(&config).download_all(ids).await?;
    info!(
        requested = total,
        saved = report.saved.len(),
        elapsed_secs = start.elapsed().as_secs_f64(),
        dir = %config.data_dir.display(),
        "download complete"
    );
    for (id, reason) in &report.failed {
        error!(id, reason = %reason, "county not downloaded");
    }
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenv().ok();
    ny_ev_proj::telemetry::init();
    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %format!("{e:#}"), "fatal");
            ExitCode::FAILURE
        }
    }
}
