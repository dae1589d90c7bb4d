use std::io;
use tokio::signal::unix::{SignalKind, signal};
use tokio::sync::watch;
use tracing::info;

/// Resolves for every holder once the daemon is asked to stop.
#[derive(Clone, Debug)]
pub struct Shutdown {
    rx: watch::Receiver<bool>,
}

impl Shutdown {
    /// Stops on SIGINT, SIGTERM, SIGHUP, SIGUSR1 or SIGUSR2.
    pub fn listen() -> io::Result<Self> {
        let signals = [
            (SignalKind::interrupt(), "SIGINT"),
            (SignalKind::terminate(), "SIGTERM"),
            (SignalKind::hangup(), "SIGHUP"),
            (SignalKind::user_defined1(), "SIGUSR1"),
            (SignalKind::user_defined2(), "SIGUSR2"),
        ];
        let (tx, shutdown) = Shutdown::channel();

        for (kind, name) in signals {
            let mut received = signal(kind)?;
            let tx = tx.clone();

            tokio::spawn(async move {
                if received.recv().await.is_some() {
                    info!("🛑 {} received", name);
                    let _ = tx.send(true);
                }
            });
        }

        Ok(shutdown)
    }

    pub fn channel() -> (watch::Sender<bool>, Self) {
        let (tx, rx) = watch::channel(false);
        (tx, Shutdown { rx })
    }

    pub async fn wait(mut self) {
        // A dropped sender can never request a stop.
        if self.rx.wait_for(|stop| *stop).await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}
