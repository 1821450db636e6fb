//! Shutdown signalling for the reader loop

use std::future::Future;
use tokio::sync::watch;
use tracing::{error, info};

/// Send shutdown once `signal` resolves
///
/// If the signal can't be awaited (handler registration failed) nothing is
/// sent and the sender is held forever: a dropped sender also stops the reader.
pub async fn shutdown_on<F>(signal: F, shutdown: watch::Sender<bool>)
where
    F: Future<Output = std::io::Result<()>>,
{
    match signal.await {
        Ok(()) => {
            info!("shutdown_signal_received");
            let _ = shutdown.send(true);
        }
        Err(e) => {
            error!(error = %e, "shutdown_signal_unavailable");
            std::future::pending::<()>().await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_signal_sends_shutdown() {
        let (tx, mut rx) = watch::channel(false);
        tokio::spawn(shutdown_on(async { Ok(()) }, tx));

        rx.changed().await.unwrap();
        assert!(*rx.borrow());
    }

    #[tokio::test]
    async fn test_failed_signal_keeps_reader_running() {
        let (tx, mut rx) = watch::channel(false);
        let task = tokio::spawn(shutdown_on(
            async { Err(std::io::Error::other("signal handler unavailable")) },
            tx,
        ));

        let waited = tokio::time::timeout(Duration::from_millis(50), rx.changed()).await;
        assert!(waited.is_err(), "no shutdown and no closed channel expected");
        assert!(!*rx.borrow());
        assert!(!task.is_finished());
        task.abort();
    }
}
