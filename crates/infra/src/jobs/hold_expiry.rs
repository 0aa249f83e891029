//! Hold-expiry sweep worker.
//!
//! The system's only time-driven cancellation mechanism: a background
//! thread that periodically releases placed holds past their expiration.
//! A tick that loses an optimistic-concurrency race simply logs and lets
//! the next tick pick the holds up with fresh state.

use std::sync::{Arc, Mutex, mpsc};
use std::thread;
use std::time::Duration;

use chrono::Utc;
use tracing::{info, warn};

use tally_core::DomainError;

use crate::platform::Platform;

/// Sweep worker configuration.
#[derive(Debug, Clone)]
pub struct SweeperConfig {
    /// Time between sweeps.
    pub poll_interval: Duration,
    /// Name for logging and the thread.
    pub name: String,
}

impl Default for SweeperConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(60),
            name: "hold-expiry-sweeper".to_string(),
        }
    }
}

/// Sweep runtime statistics.
#[derive(Debug, Clone, Default, serde::Serialize)]
pub struct SweeperStats {
    pub sweeps_run: u64,
    pub holds_released: u64,
    pub conflicts: u64,
}

/// Handle to control a running sweeper.
#[derive(Debug)]
pub struct SweeperHandle {
    shutdown: mpsc::Sender<()>,
    join: Option<thread::JoinHandle<()>>,
    stats: Arc<Mutex<SweeperStats>>,
}

impl SweeperHandle {
    /// Request graceful shutdown and wait for the thread to finish.
    pub fn shutdown(mut self) {
        let _ = self.shutdown.send(());
        if let Some(join) = self.join.take() {
            let _ = join.join();
        }
    }

    pub fn stats(&self) -> SweeperStats {
        self.stats.lock().unwrap().clone()
    }
}

/// Spawn the sweep worker on a background thread.
pub fn spawn_hold_expiry_sweeper(platform: Arc<Platform>, config: SweeperConfig) -> SweeperHandle {
    let (shutdown_tx, shutdown_rx) = mpsc::channel::<()>();
    let stats = Arc::new(Mutex::new(SweeperStats::default()));
    let stats_clone = stats.clone();

    let name = config.name.clone();
    let join = thread::Builder::new()
        .name(name.clone())
        .spawn(move || sweeper_loop(platform, config, shutdown_rx, stats_clone))
        .expect("failed to spawn hold expiry sweeper thread");

    SweeperHandle {
        shutdown: shutdown_tx,
        join: Some(join),
        stats,
    }
}

fn sweeper_loop(
    platform: Arc<Platform>,
    config: SweeperConfig,
    shutdown_rx: mpsc::Receiver<()>,
    stats: Arc<Mutex<SweeperStats>>,
) {
    info!(sweeper = %config.name, "hold expiry sweeper started");

    loop {
        match shutdown_rx.recv_timeout(config.poll_interval) {
            Ok(()) | Err(mpsc::RecvTimeoutError::Disconnected) => break,
            Err(mpsc::RecvTimeoutError::Timeout) => {}
        }

        match platform.run_hold_expiry_sweep(Utc::now()) {
            Ok(released) => {
                let mut s = stats.lock().unwrap();
                s.sweeps_run += 1;
                s.holds_released += released as u64;
            }
            Err(DomainError::Conflict(reason)) => {
                // A concurrent writer won; next tick retries with fresh state.
                warn!(sweeper = %config.name, %reason, "sweep lost a concurrency race");
                let mut s = stats.lock().unwrap();
                s.sweeps_run += 1;
                s.conflicts += 1;
            }
            Err(error) => {
                warn!(sweeper = %config.name, %error, "sweep failed");
                let mut s = stats.lock().unwrap();
                s.sweeps_run += 1;
            }
        }
    }

    info!(sweeper = %config.name, "hold expiry sweeper stopped");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sweeper_starts_and_shuts_down() {
        let platform = Arc::new(Platform::new());
        let handle = spawn_hold_expiry_sweeper(
            platform,
            SweeperConfig {
                poll_interval: Duration::from_millis(10),
                name: "test-sweeper".to_string(),
            },
        );
        std::thread::sleep(Duration::from_millis(50));
        let stats = handle.stats();
        handle.shutdown();
        assert!(stats.sweeps_run >= 1);
    }
}
