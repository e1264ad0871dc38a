//! packcam: terminal capture screen.
//!
//! Each stdin line is one barcode decoder read. `stop` ends the current recording,
//! `status` prints the queue indicator, `quit` (or EOF) unmounts the screen after the
//! queue has drained. Endpoints come from PACKCAM_UPLOAD_URL and PACKCAM_NOTIFY_URL.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use packcam_api_client::{HttpNotifier, HttpUploadClient};
use packcam_capture::TerminalBell;
use packcam_cli::{Collaborators, FixtureCamera, Pipeline, TerminalConsole};
use packcam_core::models::DeliveryOutcome;
use packcam_core::PipelineConfig;
use packcam_infra::{init_telemetry, LogFormat};
use packcam_storage::{DirectoryFolderAccess, JsonFileHandleStore, LocalFallbackStore};
use tokio::io::{AsyncBufReadExt, BufReader};

#[derive(Parser)]
#[command(name = "packcam", about = "Barcode-triggered packing camera")]
struct Cli {
    /// Folder offered for local clip copies (declined when unset)
    #[arg(long)]
    fallback_dir: Option<PathBuf>,
    /// Directory receiving one-shot downloads
    #[arg(long)]
    download_dir: Option<PathBuf>,
    /// Video file replayed as every recording
    #[arg(long)]
    fixture: Option<PathBuf>,
    /// Confirm ambiguous closes without asking
    #[arg(long)]
    assume_yes: bool,
    /// Skip the local copy of each clip
    #[arg(long)]
    no_local_copy: bool,
    /// Log as JSON lines
    #[arg(long)]
    json_logs: bool,
}

fn print_outcome(outcome: &DeliveryOutcome) {
    match outcome {
        DeliveryOutcome::Delivered {
            shipment_code,
            reference_url,
            ..
        } => println!("Delivered {}: {}", shipment_code, reference_url),
        DeliveryOutcome::Failed {
            shipment_code,
            step,
            ..
        } => println!("Failed {} at {}", shipment_code, step),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let format = if cli.json_logs {
        LogFormat::Json
    } else {
        LogFormat::Pretty
    };
    init_telemetry(format).map_err(|e| anyhow::anyhow!("Failed to initialize tracing: {}", e))?;

    let mut config = PipelineConfig::from_env().context("Failed to load configuration")?;
    if cli.fallback_dir.is_some() {
        config.fallback.folder = cli.fallback_dir;
    }
    if let Some(dir) = cli.download_dir {
        config.fallback.download_dir = dir;
    }
    if cli.no_local_copy {
        config.fallback.local_copy_enabled = false;
    }
    config.validate()?;

    let camera = match &cli.fixture {
        Some(path) => FixtureCamera::from_file(path).await?,
        None => FixtureCamera::synthetic(),
    };
    let console = Arc::new(TerminalConsole::new(cli.assume_yes));

    let fallback = if config.fallback.local_copy_enabled {
        Some(Arc::new(LocalFallbackStore::new(
            Arc::new(DirectoryFolderAccess::from_config(&config.fallback)),
            Arc::new(JsonFileHandleStore::new(
                config.fallback.handle_store_path.clone(),
            )),
        )))
    } else {
        None
    };

    let pipeline = Pipeline::mount(
        &config,
        Collaborators {
            camera: Arc::new(camera),
            tone: Arc::new(TerminalBell),
            console: console.clone(),
            uploader: Arc::new(HttpUploadClient::from_config(&config.delivery)?),
            notifier: Arc::new(HttpNotifier::from_config(&config.delivery)?),
            fallback,
        },
    );

    let mut outcomes = pipeline.subscribe_outcomes();
    let printer = tokio::spawn(async move {
        while let Ok(outcome) = outcomes.recv().await {
            print_outcome(&outcome);
        }
    });

    println!("{}", pipeline.indicator());
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        let line = tokio::select! {
            line = lines.next_line() => line.context("Failed to read stdin")?,
            _ = tokio::signal::ctrl_c() => None,
        };
        let Some(line) = line else { break };

        if console.answer(&line) {
            continue;
        }
        match line.trim() {
            "" => {}
            "stop" => pipeline.stop_recording().await?,
            "status" => println!("{}", pipeline.indicator()),
            "quit" | "exit" => break,
            code => pipeline.scan(code).await?,
        }
    }

    pipeline.shutdown(true).await?;
    // the feed closes once the pool and its last attempt are gone
    let _ = printer.await;
    Ok(())
}
