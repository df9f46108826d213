use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Turns SIGINT/SIGTERM into cancellation of the running poll step.
///
/// The first signal cancels the token and lets the step stop its reader.
/// A second signal exits immediately.
#[derive(Clone)]
pub struct SignalShutdown {
    token: CancellationToken,
    signalled: Arc<AtomicBool>,
}

impl SignalShutdown {
    /// Spawns the signal listener. Must be called inside the runtime.
    pub fn install() -> Self {
        let shutdown = SignalShutdown {
            token: CancellationToken::new(),
            signalled: Arc::new(AtomicBool::new(false)),
        };

        let listener = shutdown.clone();
        tokio::spawn(async move {
            let name = next_signal().await;
            info!(signal = name, "Stopping poll step");
            listener.signalled.store(true, Ordering::SeqCst);
            listener.token.cancel();

            let name = next_signal().await;
            warn!(signal = name, "Second signal received, exiting without cleanup");
            std::process::exit(Exit::Interrupted.code());
        });

        shutdown
    }

    pub fn token(&self) -> CancellationToken {
        self.token.clone()
    }

    pub fn signalled(&self) -> bool {
        self.signalled.load(Ordering::SeqCst)
    }
}

/// Waits for SIGINT or SIGTERM. A handler that cannot be installed never
/// fires.
async fn next_signal() -> &'static str {
    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            warn!(%err, "SIGINT handler unavailable");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(err) => {
                warn!(%err, "SIGTERM handler unavailable");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => "SIGINT",
        _ = terminate => "SIGTERM",
    }
}

/// Process exit status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Exit {
    Ok,
    Failed,
    /// Stopped by a signal (128 + SIGINT).
    Interrupted,
}

impl Exit {
    pub fn code(self) -> i32 {
        match self {
            Exit::Ok => 0,
            Exit::Failed => 1,
            Exit::Interrupted => 130,
        }
    }
}

impl From<Exit> for std::process::ExitCode {
    fn from(exit: Exit) -> Self {
        std::process::ExitCode::from(exit.code() as u8)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes() {
        assert_eq!(Exit::Ok.code(), 0);
        assert_eq!(Exit::Failed.code(), 1);
        assert_eq!(Exit::Interrupted.code(), 130);
    }
}
