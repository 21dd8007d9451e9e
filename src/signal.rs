//! Signal handling for graceful stops.
//!
//! * Unix: SIGTERM and Ctrl-C (SIGINT)
//! * Windows: Ctrl-C only
//!
//! A received signal sets the run's cancel flag. The track being streamed
//! stops at its next chunk and all remaining items are reported as
//! canceled.

use std::fmt;

use tokio_util::sync::CancellationToken;

use crate::error::Result;

#[cfg(unix)]
use tokio::signal::unix::{signal, Signal, SignalKind};

#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
#[expect(clippy::module_name_repetitions)]
pub enum ShutdownSignal {
    /// Ctrl-C/SIGINT
    Interrupt,
    /// SIGTERM
    Terminate,
}

pub struct Handler {
    #[cfg(unix)]
    sigterm: Signal,
}

impl Handler {
    /// Registers the signal handlers.
    ///
    /// # Errors
    ///
    /// Returns an error if the handlers cannot be registered.
    pub fn new() -> Result<Self> {
        #[cfg(unix)]
        {
            Ok(Self {
                sigterm: signal(SignalKind::terminate())?,
            })
        }

        #[cfg(not(unix))]
        Ok(Self {})
    }

    /// Waits for the next signal.
    pub async fn recv(&mut self) -> ShutdownSignal {
        #[cfg(unix)]
        {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => ShutdownSignal::Interrupt,
                _ = self.sigterm.recv() => ShutdownSignal::Terminate,
            }
        }

        #[cfg(not(unix))]
        {
            let _ = tokio::signal::ctrl_c().await;
            ShutdownSignal::Interrupt
        }
    }

    /// Cancels `cancel` on the first signal, in the background.
    pub fn cancel_on_signal(mut self, cancel: CancellationToken) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            tokio::select! {
                signal = self.recv() => {
                    info!("received {signal}, stopping");
                    cancel.cancel();
                }
                () = cancel.cancelled() => {}
            }
        })
    }
}

impl fmt::Display for ShutdownSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShutdownSignal::Interrupt => write!(f, "Ctrl+C"),
            ShutdownSignal::Terminate => write!(f, "SIGTERM"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn handler_exits_with_the_run() {
        let cancel = CancellationToken::new();
        let handle = Handler::new().unwrap().cancel_on_signal(cancel.clone());

        cancel.cancel();
        handle.await.unwrap();
    }
}
