//! Wires configuration, clients and the mirror pipeline together.

use std::future::Future;

use anyhow::Context;
use drivegram_drive::ServiceAccountAuth;
use drivegram_mirror::{MirrorPipeline, PipelineOptions, RunSummary, enumerate_all};
use drivegram_transfer::format_mib;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::bridge::{DriveSource, TelegramSink};
use crate::config::Config;

/// Exit status after a forced stop (128 + SIGINT).
const INTERRUPTED_EXIT_CODE: i32 = 130;

/// Runs one mirror pass.
///
/// Returns `Ok(None)` for a dry run, which only prints what would be sent.
pub async fn run(config: Config, dry_run: bool) -> anyhow::Result<Option<RunSummary>> {
    let source = drive_source(&config)?;

    if dry_run {
        list_only(&source).await?;
        return Ok(None);
    }

    if config.exceeds_public_upload_limit() {
        warn!(
            max_part_size = %format_mib(config.max_part_size),
            "parts may exceed the 50 MB limit of the public Bot API server; \
             set telegram.api_url to a local Bot API server or lower max_part_size"
        );
    }

    std::fs::create_dir_all(&config.scratch_dir).with_context(|| {
        format!("cannot create scratch dir {}", config.scratch_dir.display())
    })?;

    let telegram = drivegram_telegram::Client::new(
        config.telegram.bot_token.clone(),
        config.telegram.channel_id.clone(),
    )?
    .with_api_url(config.telegram.api_url.clone())
    .with_max_flood_waits(config.telegram.max_flood_waits);
    let sink = TelegramSink::new(telegram);

    let options = PipelineOptions {
        scratch_dir: config.scratch_dir.clone(),
        max_part_size: config.max_part_size,
        part_failure_policy: config.part_failure_policy,
    };
    info!(
        scratch_dir = %options.scratch_dir.display(),
        max_part_size = %format_mib(options.max_part_size),
        policy = %options.part_failure_policy,
        channel = %config.telegram.channel_id,
        "starting mirror"
    );

    let pipeline = MirrorPipeline::new(&source, &sink, options);

    let cancel = pipeline.cancel_token();
    tokio::spawn(async move {
        if watch_interrupts(tokio::signal::ctrl_c, cancel).await {
            std::process::exit(INTERRUPTED_EXIT_CODE);
        }
    });

    let summary = pipeline.run().await.context("enumeration failed")?;
    summary.log();
    Ok(Some(summary))
}

fn drive_source(config: &Config) -> anyhow::Result<DriveSource> {
    let key_file = &config.drive.service_account_file;
    let auth = ServiceAccountAuth::from_file(key_file)
        .with_context(|| format!("cannot load service account key {}", key_file.display()))?;
    info!(account = %auth.client_email(), "authenticating with service account");
    Ok(DriveSource::new(drivegram_drive::Client::new(auth)?))
}

async fn list_only(source: &DriveSource) -> anyhow::Result<()> {
    let descriptors = enumerate_all(source).await.context("enumeration failed")?;
    let mut total = 0u64;

    for d in &descriptors {
        let size = d.size.map(format_mib).unwrap_or_else(|| "?".into());
        total += d.size.unwrap_or(0);
        println!("{}\t{}\t{}\t{}", d.origin, d.id, size, d.name);
    }

    info!(
        files = descriptors.len(),
        known_size = %format_mib(total),
        "dry run, nothing sent"
    );
    Ok(())
}

/// Cancels `cancel` on the first interrupt. Returns `true` on a second one,
/// meaning the caller should stop immediately; `false` if listening fails.
async fn watch_interrupts<F, Fut>(mut interrupt: F, cancel: CancellationToken) -> bool
where
    F: FnMut() -> Fut,
    Fut: Future<Output = std::io::Result<()>>,
{
    if let Err(e) = interrupt().await {
        warn!(error = %e, "cannot listen for interrupts");
        return false;
    }
    warn!("interrupt received, stopping after the current file (press Ctrl-C again to quit now)");
    cancel.cancel();

    if interrupt().await.is_err() {
        return false;
    }
    warn!("second interrupt, exiting; scratch files may be left behind");
    true
}
