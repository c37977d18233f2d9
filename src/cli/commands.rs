//! Command implementations

use std::path::Path;

use anyhow::{Context, Result};
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::app::{AppContainer, JobOutcome, ProcessingInteractor};
use crate::adapters::StudioConfig;
use crate::cli::args::{InspectArgs, MergeArgs, PreviewArgs, ScrubArgs, TrimArgs};
use crate::domain::model::{JobStatus, MediaSource, MergeSequence, TimeSpec, TrimRange};
use crate::utils::format_file_size;
use crate::utils::frames::{contact_sheet, save_png};
use crate::utils::logging::ProgressReporter;
use crate::utils::time::format_clock;

/// Execute the trim command
pub async fn trim(container: &dyn AppContainer, args: TrimArgs) -> Result<()> {
    let start = TimeSpec::parse(&args.start)
        .with_context(|| format!("Invalid start time '{}'", args.start))?;
    let end = args
        .end
        .as_deref()
        .map(|end| TimeSpec::parse(end).with_context(|| format!("Invalid end time '{}'", end)))
        .transpose()?;

    let source = open_single(container, &args.input).await?;
    let duration = probe_duration(container, &source).await?;

    let range = explicit_range(duration, start.seconds, end.map(|end| end.seconds))?;
    info!(
        "Trimming {} from {} to {} (starts at the nearest keyframe)",
        source.name(),
        format_clock(range.start()),
        format_clock(range.end())
    );

    load_engine(container).await?;
    let interactor = container.processing_interactor();
    let watcher = watch_progress(&interactor, "Trim");
    let result = interactor.commit_trim(&source, &range).await;
    finish(watcher, result).await
}

/// Execute the merge command
pub async fn merge(container: &dyn AppContainer, args: MergeArgs) -> Result<()> {
    let sources = container
        .upload_collector(true)
        .collect(&args.inputs)
        .await
        .context("Failed to collect clips")?;
    let mut sequence = MergeSequence::from_sources(sources)?;

    for (from, to) in &args.moves {
        sequence = sequence.moved(*from, *to)?;
    }
    let mut removals = args.removals.clone();
    removals.sort_unstable_by(|a, b| b.cmp(a));
    removals.dedup();
    for position in removals {
        if position == 0 {
            anyhow::bail!("Clip positions start at 1");
        }
        sequence = sequence
            .removed(position - 1)?
            .context("Every clip was removed; nothing left to merge")?;
    }

    for (position, source) in sequence.sources().iter().enumerate() {
        info!(
            "{:>3}. {} ({:.1} MB)",
            position + 1,
            source.name(),
            source.size_mib()
        );
    }

    load_engine(container).await?;
    let interactor = container.processing_interactor();
    let watcher = watch_progress(&interactor, "Merge");
    let result = interactor.commit_merge(&sequence).await;
    finish(watcher, result).await
}

/// Execute the preview command
pub async fn preview(container: &dyn AppContainer, config: &StudioConfig, args: PreviewArgs) -> Result<()> {
    let source = open_single(container, &args.input).await?;
    let duration = probe_duration(container, &source).await?;
    let count = args.count.unwrap_or(config.thumbnail_count);

    let previewer = container.frame_previewer();
    let sequence = previewer.timeline(&source, duration, count)?;
    info!(
        "Capturing {} frames of {} ({})",
        sequence.timestamps().len(),
        source.name(),
        format_clock(duration)
    );
    let frames = sequence
        .collect()
        .await
        .context("Failed to capture preview frames")?;

    tokio::fs::create_dir_all(&args.output)
        .await
        .with_context(|| format!("Cannot create {}", args.output.display()))?;
    for frame in &frames {
        let path = args.output.join(format!("frame-{:02}.png", frame.index + 1));
        save_png(&frame.image, &path)?;
        info!("{} at {}", path.display(), format_clock(frame.timestamp));
    }
    if let Some(sheet) = contact_sheet(&frames) {
        let path = args.output.join("strip.png");
        save_png(&sheet, &path)?;
        println!("{}", path.display());
    }
    previewer.release().await;
    Ok(())
}

/// Execute the scrub command
pub async fn scrub(container: &dyn AppContainer, args: ScrubArgs) -> Result<()> {
    let at = TimeSpec::parse(&args.at).with_context(|| format!("Invalid position '{}'", args.at))?;
    let source = open_single(container, &args.input).await?;
    let duration = probe_duration(container, &source).await?;

    let previewer = container.frame_previewer();
    let frame = previewer
        .scrub(&source, duration, at.seconds)
        .await
        .context("Failed to capture frame")?;
    save_png(&frame.image, &args.output)?;
    previewer.release().await;

    info!("Frame at {} of {}", format_clock(frame.timestamp), format_clock(duration));
    println!("{}", args.output.display());
    Ok(())
}

/// Execute the inspect command
pub async fn inspect(container: &dyn AppContainer, args: InspectArgs) -> Result<()> {
    let source = open_single(container, &args.input).await?;
    let probe = container
        .probe_port()
        .probe_media(&source)
        .await
        .context("Failed to probe input")?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&probe)?);
        return Ok(());
    }

    println!("File:      {}", source.name());
    println!("Size:      {}", format_file_size(source.size()));
    println!("Type:      {}", source.content_type());
    println!("Container: {}", probe.container);
    println!("Duration:  {} ({:.3}s)", format_clock(probe.duration), probe.duration);
    match &probe.video {
        Some(video) => println!("Video:     {} {}x{}", video.codec, video.width, video.height),
        None => println!("Video:     none"),
    }
    match &probe.audio {
        Some(audio) => println!(
            "Audio:     {} {} Hz, {} ch",
            audio.codec, audio.sample_rate, audio.channels
        ),
        None => println!("Audio:     none"),
    }
    Ok(())
}

/// Typed bounds are taken as given; out-of-range values are rejected
fn explicit_range(duration: f64, start: f64, end: Option<f64>) -> Result<TrimRange> {
    let end = end.unwrap_or(duration);
    TrimRange::from_bounds(duration, start, end).with_context(|| {
        format!(
            "Cannot trim {} - {} from a {} video",
            format_clock(start),
            format_clock(end),
            format_clock(duration)
        )
    })
}

async fn open_single(container: &dyn AppContainer, path: &Path) -> Result<MediaSource> {
    container
        .upload_collector(false)
        .collect(&[path.to_path_buf()])
        .await?
        .into_iter()
        .next()
        .with_context(|| format!("Not a video file: {}", path.display()))
}

async fn probe_duration(container: &dyn AppContainer, source: &MediaSource) -> Result<f64> {
    let probe = container
        .probe_port()
        .probe_media(source)
        .await
        .with_context(|| format!("Failed to read the duration of {}", source.name()))?;
    Ok(probe.duration)
}

async fn load_engine(container: &dyn AppContainer) -> Result<()> {
    container
        .processing_interactor()
        .load_engine()
        .await
        .context("Transcoding engine failed to load")
}

/// Log job progress until the job leaves `Processing`
fn watch_progress(interactor: &ProcessingInteractor, operation: &str) -> JoinHandle<()> {
    let mut rx = interactor.subscribe();
    let mut reporter = ProgressReporter::new(operation, 10.0);
    tokio::spawn(async move {
        while rx.changed().await.is_ok() {
            let job = rx.borrow_and_update().clone();
            match job.status {
                JobStatus::Processing => reporter.update(job.progress),
                JobStatus::Completed => {
                    reporter.update(100.0);
                    reporter.finish(true);
                    return;
                }
                JobStatus::Error => {
                    reporter.finish(false);
                    return;
                }
                JobStatus::Idle => {}
            }
        }
    })
}

async fn finish(
    watcher: JoinHandle<()>,
    result: std::result::Result<JobOutcome, crate::domain::errors::DomainError>,
) -> Result<()> {
    match result {
        Ok(outcome) => {
            let _ = watcher.await;
            info!(
                "Saved {} ({})",
                outcome.artifact_name,
                format_file_size(outcome.size)
            );
            println!("{}", outcome.receipt.location);
            Ok(())
        }
        Err(e) => {
            // A job rejected before it started never wakes the watcher
            watcher.abort();
            if let Some(diagnostics) = e.diagnostics().filter(|d| !d.is_empty()) {
                let tail: Vec<&str> = diagnostics.lines().rev().take(5).collect();
                for line in tail.into_iter().rev() {
                    warn!("engine: {}", line);
                }
            }
            Err(e.into())
        }
    }
}
