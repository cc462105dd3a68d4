//! Process stop signals

use std::future::Future;

/// Install Ctrl-C (and SIGTERM on Unix) handlers and return a future that
/// resolves on the first signal
///
/// Handlers are installed before this returns, so a signal that arrives
/// while the monitor is still starting up is held for the future instead of
/// killing the process. Must be called from inside a Tokio runtime.
#[cfg(unix)]
pub fn listen() -> impl Future<Output = ()> + Send + 'static {
    use tokio::signal::unix::{SignalKind, signal};

    let interrupt = installed(signal(SignalKind::interrupt()), "SIGINT");
    let terminate = installed(signal(SignalKind::terminate()), "SIGTERM");
    if interrupt.is_none() && terminate.is_none() {
        tracing::error!("No stop signal handler could be installed");
    }

    async move {
        tokio::select! {
            _ = recv(interrupt) => {}
            _ = recv(terminate) => {}
        }
        tracing::info!("Monitor interrupted by user. Exiting.");
    }
}

#[cfg(unix)]
fn installed(
    result: std::io::Result<tokio::signal::unix::Signal>,
    name: &'static str,
) -> Option<tokio::signal::unix::Signal> {
    result
        .map_err(|e| tracing::warn!(signal = name, error = %e, "Signal handler unavailable"))
        .ok()
}

#[cfg(unix)]
async fn recv(signal: Option<tokio::signal::unix::Signal>) {
    match signal {
        Some(mut signal) => {
            signal.recv().await;
        }
        None => std::future::pending().await,
    }
}

#[cfg(windows)]
pub fn listen() -> impl Future<Output = ()> + Send + 'static {
    let ctrl_c = tokio::signal::windows::ctrl_c();

    async move {
        match ctrl_c {
            Ok(mut ctrl_c) => {
                ctrl_c.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Ctrl-C handler unavailable");
                std::future::pending::<()>().await;
            }
        }
        tracing::info!("Monitor interrupted by user. Exiting.");
    }
}

