//! Bulk download of county population projection spreadsheets.

use crate::config::DownloadConfig;
use anyhow::{Context, Result};
use futures_util::future::join_all;
use reqwest::Client;
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// County identifiers served by the endpoint: odd numbers 1..=123.
pub fn county_ids() -> Vec<u32> {
    (1..=123).step_by(2).collect()
}

pub fn county_url(base_url: &str, id: u32) -> String {
    format!("{base_url}+county={id}")
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SavedFile {
    pub id: u32,
    pub path: PathBuf,
    pub bytes: usize,
    pub sha256_hex: String,
}

#[derive(Clone, Debug, Default)]
pub struct DownloadReport {
    pub saved: Vec<SavedFile>,
    pub failed: Vec<(u32, String)>,
}

/// Fixed set of workers, each owning its own HTTP client, draining a shared id queue.
pub struct PopulationDownloader {
    base_url: String,
    data_dir: PathBuf,
    workers: usize,
}

impl PopulationDownloader {
    pub fn new(config: &DownloadConfig) -> Self {
        Self {
            base_url: config.base_url.clone(),
            data_dir: config.data_dir.clone(),
            workers: config.workers.max(1),
        }
    }

    pub async fn download_all(&self, ids: Vec<u32>) -> Result<DownloadReport> {
        tokio::fs::create_dir_all(&self.data_dir)
            .await
            .with_context(|| format!("creating {}", self.data_dir.display()))?;

        let queue = Arc::new(Mutex::new(ids.into_iter()));
        let workers = (0..self.workers).map(|worker| {
            let queue = Arc::clone(&queue);
            async move {
                let client = Client::builder()
                    .user_agent(concat!("ny-ev-proj/", env!("CARGO_PKG_VERSION")))
                    .build()?;
                let mut report = DownloadReport::default();
                loop {
                    let next = queue.lock().await.next();
                    let Some(id) = next else {
                        break;
                    };
                    match self.download_one(&client, id).await {
                        Ok(saved) => {
                            debug!(worker, id, bytes = saved.bytes, "saved");
                            report.saved.push(saved);
                        }
                        Err(e) => {
                            warn!(worker, id, error = %format!("{e:#}"), "download failed");
                            report.failed.push((id, format!("{e:#}")));
                        }
                    }
                }
                Ok::<_, anyhow::Error>(report)
            }
        });

        let mut merged = DownloadReport::default();
        for report in join_all(workers).await {
            let report = report?;
            merged.saved.extend(report.saved);
            merged.failed.extend(report.failed);
        }
        merged.saved.sort_by_key(|s| s.id);
        merged.failed.sort_by_key(|(id, _)| *id);
        info!(
            saved = merged.saved.len(),
            failed = merged.failed.len(),
            "population download finished"
        );
        Ok(merged)
    }

    async fn download_one(&self, client: &Client, id: u32) -> Result<SavedFile> {
        let url = county_url(&self.base_url, id);
        let body = client
            .get(&url)
            .send()
            .await?
            .error_for_status()?
            .bytes()
            .await?;
        let path = spreadsheet_path(&self.data_dir, id);
        tokio::fs::write(&path, &body)
            .await
            .with_context(|| format!("writing {}", path.display()))?;
        Ok(SavedFile {
            id,
            path,
            bytes: body.len(),
            sha256_hex: hex::encode(Sha256::digest(&body)),
        })
    }
}

pub fn spreadsheet_path(data_dir: &Path, id: u32) -> PathBuf {
    data_dir.join(format!("{id}.xlsx"))
}
