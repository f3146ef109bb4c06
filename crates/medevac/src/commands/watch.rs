//! `medevac watch`: follow one emergency until it closes.
//!
//! With `--stdin`, each input line is a distance in km and is fed to the
//! proximity policy through an [`EmergencyMonitor`].

use std::future;

use chrono::Utc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio_stream::StreamExt;
use tokio_stream::wrappers::LinesStream;
use tracing::{debug, warn};

use medevac_core::{DistanceSample, EmergencyId, EmergencyMonitor, EmergencySnapshot};

use crate::cli::{OutputFormat, WatchArgs};
use crate::config::Context;
use crate::error::CliError;
use crate::output;

use super::util::{self, StatusView};

/// Parse one feed line. Blank lines and comments are skipped.
fn parse_sample(id: &EmergencyId, line: &str) -> Option<DistanceSample> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return None;
    }
    match line.parse::<f64>() {
        Ok(distance_km) => Some(DistanceSample {
            emergency_id: id.clone(),
            distance_km,
            location: None,
        }),
        Err(_) => {
            warn!(line, "ignoring unreadable distance");
            None
        }
    }
}

fn print_change(ctx: &Context, snapshot: &EmergencySnapshot) -> Result<(), CliError> {
    let line = match ctx.output {
        // One JSON document per line.
        OutputFormat::Json | OutputFormat::JsonCompact => {
            serde_json::to_string(&StatusView::new(snapshot, Utc::now())).map_err(|e| {
                CliError::Render {
                    format: "json",
                    reason: e.to_string(),
                }
            })?
        }
        OutputFormat::Plain => snapshot.status.to_string(),
        OutputFormat::Table | OutputFormat::Yaml => {
            let at = snapshot
                .history
                .last()
                .map(|c| util::format_time(c.timestamp()))
                .unwrap_or_default();
            format!("{at}  {}", output::paint_status(snapshot.status, ctx.color))
        }
    };
    output::print_output(&line, ctx.quiet);
    Ok(())
}

pub async fn handle(ctx: &Context, args: WatchArgs) -> Result<(), CliError> {
    util::load_existing(ctx, &args.id).await?;
    let updates = ctx
        .engine
        .subscribe(&args.id)
        .ok_or_else(|| CliError::NotFound {
            id: args.id.to_string(),
        })?;
    print_change(ctx, updates.current())?;
    if updates.current().status.is_terminal() {
        return Ok(());
    }
    let mut changes = updates.into_stream();

    let monitor = if args.stdin {
        let id = args.id.clone();
        let lines = LinesStream::new(BufReader::new(tokio::io::stdin()).lines());
        let feed = lines.filter_map(move |line| parse_sample(&id, &line.ok()?));
        EmergencyMonitor::spawn_with_feed(&ctx.engine, args.id.clone(), feed)?
    } else {
        EmergencyMonitor::spawn(&ctx.engine, args.id.clone())?
    };
    let mut elapsed = monitor.elapsed();
    let mut ticking = true;

    let deadline = async {
        match args.duration {
            Some(limit) => tokio::time::sleep(limit).await,
            None => future::pending().await,
        }
    };
    tokio::pin!(deadline);
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        tokio::select! {
            _ = &mut ctrl_c => break,
            () = &mut deadline => {
                debug!(id = %args.id, "watch duration reached");
                break;
            }
            next = changes.next() => {
                let Some(snapshot) = next else { break };
                print_change(ctx, &snapshot)?;
                if snapshot.status.is_terminal() {
                    break;
                }
            }
            tick = elapsed.changed(), if ticking => match tick {
                Ok(()) => {
                    let in_status = *elapsed.borrow_and_update();
                    debug!(id = %args.id, elapsed = %output::format_elapsed(in_status), "tick");
                }
                Err(_) => ticking = false,
            },
        }
    }

    monitor.shutdown().await;
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn feed_lines() {
        let id = EmergencyId::new("E1").unwrap();
        let sample = parse_sample(&id, " 0.42 ").unwrap();
        assert_eq!(sample.emergency_id, id);
        assert!((sample.distance_km - 0.42).abs() < f64::EPSILON);

        assert!(parse_sample(&id, "").is_none());
        assert!(parse_sample(&id, "# header").is_none());
        assert!(parse_sample(&id, "near").is_none());
    }
}
