use std::time::Duration;

use anyhow::{Context, Result};
use clap::Args;
use mood_bridge::{
    EmotionSource, HttpPlaybackSink, LoggingPlaybackSink, MoodBridge, PlaybackSink,
    SimulatedEmotionSource, TickOutcome,
};
use serde::Serialize;
use tracing::{info, warn};

use crate::cli::context::CliContext;
use crate::cli::output::OutputFormat;

#[derive(Args, Clone, Debug)]
pub struct MoodArgs {
    /// Number of emotion events to process
    #[arg(long, default_value_t = 10)]
    pub ticks: usize,

    /// Seed for the simulated emotion source
    #[arg(long, default_value_t = 7)]
    pub seed: u64,

    /// Pause between events in milliseconds (defaults to mood.tick_interval)
    #[arg(long, value_name = "MS")]
    pub interval_ms: Option<u64>,

    /// Log playback requests instead of sending them
    #[arg(long)]
    pub dry_run: bool,
}

#[derive(Serialize)]
struct TickLine {
    tick: usize,
    #[serde(flatten)]
    outcome: Option<TickOutcome>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

pub async fn cmd_mood(args: MoodArgs, ctx: &CliContext) -> Result<()> {
    let mood = &ctx.config().mood;
    let interval = match args.interval_ms {
        Some(ms) => Duration::from_millis(ms),
        None => mood.tick_interval()?,
    };
    let source = SimulatedEmotionSource::new(args.seed, interval);
    let table = mood.playlists.clone();
    let settings = mood.bridge_settings();

    let http = if args.dry_run {
        None
    } else {
        mood.playback.http_config()?
    };
    match http {
        Some(config) => {
            let sink =
                HttpPlaybackSink::new(config).context("Failed to build playback client")?;
            info!(endpoint = %sink.endpoint(), "sending playback requests");
            let bridge = MoodBridge::new(source, sink, table, settings);
            run_ticks(bridge, args.ticks, ctx.output()).await
        }
        None => {
            info!("no playback token configured; logging playback requests");
            let bridge = MoodBridge::new(source, LoggingPlaybackSink::new(), table, settings);
            run_ticks(bridge, args.ticks, ctx.output()).await
        }
    }
}

/// Tick errors are reported and the loop moves on; a closed source ends it early.
async fn run_ticks<S, K>(
    mut bridge: MoodBridge<S, K>,
    ticks: usize,
    output: OutputFormat,
) -> Result<()>
where
    S: EmotionSource,
    K: PlaybackSink,
{
    let mut changes = 0usize;
    for tick in 1..=ticks {
        let line = match bridge.tick().await {
            Ok(outcome) => {
                if matches!(outcome, TickOutcome::Changed { .. }) {
                    changes += 1;
                }
                TickLine {
                    tick,
                    outcome: Some(outcome),
                    error: None,
                }
            }
            Err(err) => {
                warn!(tick, error = %err, "mood tick failed");
                let closed = matches!(err, mood_bridge::MoodError::SourceClosed);
                print_line(
                    &TickLine {
                        tick,
                        outcome: None,
                        error: Some(err.to_string()),
                    },
                    output,
                )?;
                if closed {
                    break;
                }
                continue;
            }
        };
        print_line(&line, output)?;
    }
    if output == OutputFormat::Human {
        println!(
            "{} mood change(s); current mood: {}",
            changes,
            bridge
                .mood()
                .map_or_else(|| "none".to_string(), |mood| mood.to_string())
        );
    }
    Ok(())
}

fn print_line(line: &TickLine, output: OutputFormat) -> Result<()> {
    match output {
        OutputFormat::Json => println!("{}", serde_json::to_string(line)?),
        OutputFormat::Human => match (&line.outcome, &line.error) {
            (Some(TickOutcome::Changed { mood, previous, .. }), _) => println!(
                "#{:<3} {} -> {}",
                line.tick,
                previous.map_or_else(|| "none".to_string(), |mood| mood.to_string()),
                mood
            ),
            (Some(TickOutcome::Unchanged { mood, .. }), _) => println!(
                "#{:<3} {}",
                line.tick,
                mood.map_or_else(|| "none".to_string(), |mood| mood.to_string())
            ),
            (None, Some(error)) => println!("#{:<3} error: {}", line.tick, error),
            (None, None) => {}
        },
    }
    Ok(())
}
