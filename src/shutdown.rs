use tokio::signal;
use tokio_util::sync::CancellationToken;

/// Wait for a shutdown signal (SIGINT or SIGTERM).
pub async fn wait_for_shutdown() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, finishing in-flight tasks...");
        }
        _ = terminate => {
            tracing::info!("Received SIGTERM, finishing in-flight tasks...");
        }
    }
}

/// Cancel `token` when the process is asked to stop.
///
/// Returns the listener task so the caller can abort it once the work is done.
pub fn cancel_on_shutdown(token: CancellationToken) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        tokio::select! {
            _ = wait_for_shutdown() => token.cancel(),
            _ = token.cancelled() => {}
        }
    })
}
