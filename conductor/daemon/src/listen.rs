//! Stdin listener
//!
//! Feeds JSON-lines host events into the controller's inbound queue until
//! stdin closes or a termination signal arrives.

use anyhow::{Context, Result};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::signal::unix::{signal, SignalKind};
use tokio_stream::wrappers::LinesStream;
use tokio_stream::StreamExt;
use tracing::{debug, info, warn};

use nyan_core::{HostEvent, InboundEvent, LoadedConfig, NyanHost, SharedSettings};

/// Parse one input line; blank lines and `#` comments are skipped
pub fn parse_line(line: &str) -> Option<HostEvent> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return None;
    }
    match HostEvent::from_json(line) {
        Ok(event) => Some(event),
        Err(e) => {
            warn!(error = %e, line, "Ignoring malformed host event");
            None
        }
    }
}

/// Run the listener until EOF or a signal
///
/// `reload` is called on `SIGHUP`; changed settings are pushed through the
/// queue like any other event.
pub async fn run<F>(host: &NyanHost, settings: &SharedSettings, reload: F) -> Result<()>
where
    F: Fn() -> Result<LoadedConfig>,
{
    let (tx, dispatcher) = host.spawn_dispatcher()?;
    let mut lines = LinesStream::new(BufReader::new(tokio::io::stdin()).lines());

    let mut sigterm =
        signal(SignalKind::terminate()).context("Failed to install SIGTERM handler")?;
    let mut sigint = signal(SignalKind::interrupt()).context("Failed to install SIGINT handler")?;
    let mut sighup = signal(SignalKind::hangup()).context("Failed to install SIGHUP handler")?;

    info!("Listening for host events on stdin");

    loop {
        tokio::select! {
            line = lines.next() => match line {
                Some(Ok(line)) => {
                    let Some(event) = parse_line(&line) else {
                        continue;
                    };
                    debug!(kind = event.kind(), "Host event received");
                    if tx.send(event.into()).await.is_err() {
                        warn!("Inbound queue closed");
                        break;
                    }
                }
                Some(Err(e)) => {
                    warn!(error = %e, "Failed to read stdin");
                    break;
                }
                None => {
                    info!("Stdin closed, shutting down");
                    break;
                }
            },
            _ = sigterm.recv() => {
                info!("Received SIGTERM, initiating shutdown");
                break;
            }
            _ = sigint.recv() => {
                info!("Received SIGINT, initiating shutdown");
                break;
            }
            _ = sighup.recv() => {
                info!("Received SIGHUP, reloading configuration");
                match reload() {
                    Ok(loaded) => {
                        let changed = settings.replace(loaded.snapshot);
                        if !changed.is_empty()
                            && tx.send(InboundEvent::SettingsChanged(changed)).await.is_err()
                        {
                            warn!("Inbound queue closed");
                            break;
                        }
                    }
                    Err(e) => warn!(error = %e, "Reload failed, keeping current settings"),
                }
            }
        }
    }

    drop(tx);
    if let Err(e) = dispatcher.await {
        warn!(error = %e, "Dispatcher task failed");
    }
    host.api().stop_all(None)?;
    Ok(())
}
