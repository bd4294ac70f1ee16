use anyhow::{Context, Result};
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

#[cfg(unix)]
use signal::unix::{signal, SignalKind};

/// Signal types that can trigger shutdown
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownSignal {
    /// SIGTERM - Docker/Kubernetes graceful shutdown
    Terminate,
    /// SIGINT - Ctrl+C interactive shutdown
    Interrupt,
    /// SIGQUIT - Quit signal
    Quit,
}

impl std::fmt::Display for ShutdownSignal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ShutdownSignal::Terminate => write!(f, "SIGTERM"),
            ShutdownSignal::Interrupt => write!(f, "SIGINT"),
            ShutdownSignal::Quit => write!(f, "SIGQUIT"),
        }
    }
}

/// Turns process signals into cancellation of a shared token.
///
/// The first signal cancels the token. Later signals are logged and ignored,
/// the running work unwinds on its own at its next safe point.
pub struct SignalHandler {
    token: CancellationToken,
}

impl SignalHandler {
    pub fn new(token: CancellationToken) -> Self {
        Self { token }
    }

    /// Cancel the token on behalf of `signal`. Returns `false` if it was already cancelled.
    pub fn trigger(&self, signal: ShutdownSignal) -> bool {
        if self.token.is_cancelled() {
            warn!("Received {} while already shutting down, ignoring", signal);
            return false;
        }
        info!("🛑 Received shutdown signal: {}, finishing current unit and checkpointing", signal);
        self.token.cancel();
        true
    }

    /// Spawn the listener task. It lives until the process exits.
    pub fn spawn(self) -> Result<tokio::task::JoinHandle<()>> {
        let mut listener = SignalListener::new()?;
        Ok(tokio::spawn(async move {
            loop {
                let signal = listener.recv().await;
                self.trigger(signal);
            }
        }))
    }
}

#[cfg(unix)]
struct SignalListener {
    sigterm: signal::unix::Signal,
    sigint: signal::unix::Signal,
    sigquit: signal::unix::Signal,
}

#[cfg(unix)]
impl SignalListener {
    fn new() -> Result<Self> {
        let listener = Self {
            sigterm: signal(SignalKind::terminate()).context("Failed to create SIGTERM handler")?,
            sigint: signal(SignalKind::interrupt()).context("Failed to create SIGINT handler")?,
            sigquit: signal(SignalKind::quit()).context("Failed to create SIGQUIT handler")?,
        };
        info!("📡 Signal handler initialized, listening for SIGTERM, SIGINT and SIGQUIT");
        Ok(listener)
    }

    async fn recv(&mut self) -> ShutdownSignal {
        tokio::select! {
            _ = self.sigterm.recv() => ShutdownSignal::Terminate,
            _ = self.sigint.recv() => ShutdownSignal::Interrupt,
            _ = self.sigquit.recv() => ShutdownSignal::Quit,
        }
    }
}

#[cfg(not(unix))]
struct SignalListener;

#[cfg(not(unix))]
impl SignalListener {
    fn new() -> Result<Self> {
        info!("Signal handler initialized, listening for Ctrl+C");
        Ok(Self)
    }

    async fn recv(&mut self) -> ShutdownSignal {
        if signal::ctrl_c().await.is_err() {
            // Without a working listener there is nothing left to wait for.
            std::future::pending::<()>().await;
        }
        ShutdownSignal::Interrupt
    }
}
