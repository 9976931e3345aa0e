//! `beltmon ingest`: feed detector output through the detection listener.
//!
//! Input is newline-delimited JSON, one detection per line:
//!
//! ```text
//! {"defect_type":"tear","box_width_mm":40,"box_length_mm":120,
//!  "longitudinal_position_mm":5000,"transverse_position_mm":-300,
//!  "probability":87,"is_critical":true,"photo_base64":"..."}
//! ```
//!
//! A line carries either `photo_base64` (a new capture) or `photo_id` (an
//! already stored one). Bad lines are reported and skipped.

use std::sync::Arc;

use anyhow::{Context, Result};
use base64::Engine;
use chrono::{DateTime, Utc};
use clap::Args;
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing::warn;

use crate::cli::commands::status::StatusOutput;
use crate::cli::context::AppContext;
use crate::cli::output::{output, CommandOutput};
use crate::domain::models::{DefectGeometry, DefectId, DefectType, NewDefect, PhotoId, SeverityFlags};
use crate::services::{DetectionEvent, DetectionListener, ListenerEvent, RetryPolicy};

#[derive(Args, Debug)]
pub struct IngestArgs {
    /// NDJSON file with detections, or "-" for stdin
    #[arg(default_value = "-")]
    pub input: String,
}

/// One detector output line.
#[derive(Debug, Deserialize)]
struct DetectionLine {
    defect_type: DefectType,
    #[serde(flatten)]
    geometry: DefectGeometry,
    #[serde(default = "full_probability")]
    probability: u8,
    #[serde(default)]
    is_extreme: bool,
    #[serde(default)]
    is_critical: bool,
    #[serde(default)]
    photo_id: Option<PhotoId>,
    #[serde(default)]
    photo_base64: Option<String>,
    #[serde(default)]
    detected_at: Option<DateTime<Utc>>,
}

const fn full_probability() -> u8 {
    100
}

#[derive(Debug, Serialize)]
pub struct RejectedLine {
    pub line: usize,
    pub error: String,
}

#[derive(Debug, Serialize)]
pub struct FailedDetection {
    pub defect_id: DefectId,
    pub error: String,
}

#[derive(Debug, Default, Serialize)]
pub struct IngestOutput {
    pub recorded: u64,
    pub processed: u64,
    pub failed: Vec<FailedDetection>,
    pub rejected: Vec<RejectedLine>,
    pub status: Option<StatusOutput>,
}

impl CommandOutput for IngestOutput {
    fn to_human(&self) -> String {
        let mut lines = vec![format!(
            "Recorded {} detections, processed {}, failed {}, rejected {} lines",
            self.recorded,
            self.processed,
            self.failed.len(),
            self.rejected.len()
        )];
        for rejected in &self.rejected {
            lines.push(format!("  line {}: {}", rejected.line, rejected.error));
        }
        for failed in &self.failed {
            lines.push(format!("  defect {}: {}", failed.defect_id, failed.error));
        }
        if let Some(status) = &self.status {
            lines.push(status.to_human());
        }
        lines.join("\n")
    }
}

fn decode_photo(encoded: &str) -> Result<Vec<u8>> {
    base64::engine::general_purpose::STANDARD
        .decode(encoded.trim())
        .context("photo_base64 is not valid base64")
}

async fn open_input(input: &str) -> Result<Box<dyn AsyncBufRead + Unpin + Send>> {
    if input == "-" {
        return Ok(Box::new(BufReader::new(tokio::io::stdin())));
    }
    let file = tokio::fs::File::open(input)
        .await
        .with_context(|| format!("Failed to open {input}"))?;
    Ok(Box::new(BufReader::new(file)))
}

pub async fn execute(args: IngestArgs, ctx: &AppContext, json_mode: bool) -> Result<()> {
    let service = Arc::clone(&ctx.defects);
    let capacity = ctx.config.listener.channel_capacity;

    let (detections, receiver) = mpsc::channel(capacity);
    let listener = DetectionListener::new(
        Arc::clone(&service),
        RetryPolicy::from(&ctx.config.retry),
        capacity,
    );
    let mut events = listener.run(receiver);

    // Drain events concurrently so a full event channel never blocks the listener.
    let collector = tokio::spawn(async move {
        let mut processed: u64 = 0;
        let mut failed = Vec::new();
        while let Some(event) = events.recv().await {
            match event {
                ListenerEvent::Processed { .. } => processed += 1,
                ListenerEvent::Failed { defect_id, error } => failed.push(FailedDetection { defect_id, error }),
                ListenerEvent::Stopped { .. } => break,
                ListenerEvent::Started => {}
            }
        }
        (processed, failed)
    });

    let mut summary = IngestOutput::default();
    let mut lines = open_input(&args.input).await?.lines();
    let mut number: usize = 0;

    while let Some(raw) = lines.next_line().await.context("Failed to read input")? {
        number += 1;
        if raw.trim().is_empty() {
            continue;
        }

        let defect = match ingest_line(&ctx.defects, &raw).await {
            Ok(defect) => defect,
            Err(err) => {
                warn!(line = number, error = %err, "rejected detection line");
                summary.rejected.push(RejectedLine { line: number, error: format!("{err:#}") });
                continue;
            }
        };
        summary.recorded += 1;

        if detections.send(DetectionEvent { defect_id: defect }).await.is_err() {
            anyhow::bail!("Detection listener stopped unexpectedly");
        }
    }

    drop(detections);
    let (processed, failed) = collector.await.context("Detection listener task panicked")?;
    summary.processed = processed;
    summary.failed = failed;

    if summary.recorded > 0 {
        summary.status = Some(StatusOutput::from(&service.current_conveyor_status().await?));
    }

    output(&summary, json_mode);
    Ok(())
}

async fn ingest_line(service: &crate::cli::context::SqliteDefectService, raw: &str) -> Result<DefectId> {
    let line: DetectionLine = serde_json::from_str(raw).context("Invalid detection JSON")?;

    let photo_id = match (line.photo_base64, line.photo_id) {
        (Some(encoded), None) => service.store_photo(decode_photo(&encoded)?).await?.id,
        (None, Some(id)) => id,
        (Some(_), Some(_)) => anyhow::bail!("Give either photo_base64 or photo_id, not both"),
        (None, None) => anyhow::bail!("Missing photo_base64 or photo_id"),
    };

    let mut defect = NewDefect::new(line.defect_type, line.geometry, photo_id)
        .with_probability(line.probability)
        .with_severity(SeverityFlags::new(line.is_extreme, line.is_critical));
    if let Some(at) = line.detected_at {
        defect = defect.detected_at(at);
    }

    Ok(service.record_detection(defect).await?.id)
}
