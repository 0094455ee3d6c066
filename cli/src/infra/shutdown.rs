//! Operator interrupt handling.

use std::future::Future;

use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::instrument::WithSubscriber as _;
use tracing::{info, warn};

/// Cancels `token` on the first Ctrl-C or SIGTERM.
///
/// The spawned task logs through the dispatcher current at the call site,
/// so call this from inside the workflow's scoped future. The returned
/// task runs until a signal arrives; abort it once the workflow is done.
pub fn cancel_on_interrupt(token: CancellationToken) -> tokio::task::JoinHandle<()> {
    cancel_on(interrupt(), token)
}

/// Cancels `token` once `signal` resolves, logging the signal's name.
pub fn cancel_on<F>(signal: F, token: CancellationToken) -> tokio::task::JoinHandle<()>
where
    F: Future<Output = &'static str> + Send + 'static,
{
    tokio::spawn(
        async move {
            let name = signal.await;
            info!("received {name}");
            token.cancel();
        }
        .with_current_subscriber(),
    )
}

async fn interrupt() -> &'static str {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!(error = %e, "failed to install Ctrl-C handler");
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
                warn!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        biased;
        () = ctrl_c => "Ctrl-C",
        () = terminate => "SIGTERM",
    }
}
