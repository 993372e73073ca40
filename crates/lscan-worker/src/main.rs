//! Video analysis worker binary.
//!
//! Usage: `lscan-worker <video_id> <file_path>`
//!
//! The upload layer invokes this once per uploaded video. Model-load
//! failures abort before the record is touched; anything escaping the
//! analysis core after that is recorded as `status=error` best-effort.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use tracing::{error, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use lscan_firestore::{FirestoreClient, VideoRepository};
use lscan_media::{AnalysisContext, AnalysisReport, OnnxCropClassifier, OnnxLarvaDetector};
use lscan_models::VideoId;
use lscan_worker::{FirestoreResultSink, WorkerConfig};

#[tokio::main]
async fn main() -> ExitCode {
    // Install rustls crypto provider (required for TLS/HTTPS)
    rustls::crypto::ring::default_provider()
        .install_default()
        .expect("Failed to install rustls crypto provider");

    // Load environment variables
    dotenvy::dotenv().ok();

    init_tracing();

    info!("Starting lscan-worker");

    let mut args = std::env::args().skip(1);
    let (video_id, file_path) = match (args.next(), args.next()) {
        (Some(id), Some(path)) => (VideoId::from(id), PathBuf::from(path)),
        _ => {
            error!("usage: lscan-worker <video_id> <file_path>");
            return ExitCode::from(2);
        }
    };

    let config = WorkerConfig::from_env();
    info!("Worker config: {:?}", config);

    // Startup failures are loud: nothing is written to the record until the
    // serving capability is actually there.
    let repo = match FirestoreClient::from_env().await {
        Ok(client) => VideoRepository::new(client),
        Err(e) => {
            error!("Failed to create Firestore client: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let detector = match OnnxLarvaDetector::new(config.detector()) {
        Ok(d) => d,
        Err(e) => {
            error!("Failed to load detector model: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let classifier = match OnnxCropClassifier::new(config.classifier()) {
        Ok(c) => c,
        Err(e) => {
            error!("Failed to load classifier model: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let ctx = AnalysisContext::new(
        Arc::new(detector),
        Arc::new(classifier),
        Arc::new(FirestoreResultSink::new(repo.clone())),
        config.keyframes(),
    );

    match ctx.run_analysis(&video_id, &file_path).await {
        Ok(AnalysisReport::Done(outcome)) => {
            info!(
                video_id = %video_id,
                final_label = %outcome.final_label,
                total_count = outcome.summary.total_count,
                "analysis recorded"
            );
            ExitCode::SUCCESS
        }
        Ok(AnalysisReport::Failed { reason }) => {
            warn!(video_id = %video_id, reason = %reason, "analysis failed and was recorded");
            ExitCode::SUCCESS
        }
        Err(e) => {
            // The record may not reflect the run; try to say so durably.
            error!(video_id = %video_id, "analysis escaped the core: {}", e);
            if let Err(write_err) = repo.mark_failed(&video_id, &e.to_string()).await {
                error!(video_id = %video_id, "failed to record error status: {}", write_err);
            }
            ExitCode::FAILURE
        }
    }
}

/// Initialize tracing with colored output for dev, JSON for production.
fn init_tracing() {
    let use_json = std::env::var("LOG_FORMAT")
        .map(|v| v.to_lowercase() == "json")
        .unwrap_or(false);

    let env_filter = EnvFilter::from_default_env()
        .add_directive("lscan=info".parse().unwrap())
        .add_directive("ort=warn".parse().unwrap())
        .add_directive("onnxruntime=warn".parse().unwrap());

    if use_json {
        tracing_subscriber::registry()
            .with(fmt::layer().json())
            .with(env_filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(
                fmt::layer()
                    .with_ansi(true)
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_file(false)
                    .with_line_number(false),
            )
            .with(env_filter)
            .init();
    }
}
