//! Background cache trimming.

use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{RecvTimeoutError, Sender, bounded};
use parking_lot::RwLock;
use tracing::{debug, warn};

use crate::{EngineResult, ZoneSystem};

/// Handle to the thread that trims every domain's query cache on a fixed
/// interval. Stopping or dropping the handle ends the thread.
#[derive(Debug)]
pub struct CacheMaintenance {
    stop_tx: Sender<()>,
    handle: Option<JoinHandle<()>>,
}

impl CacheMaintenance {
    /// Start trimming every domain cache of `system` once per `interval`.
    pub fn spawn(system: Arc<RwLock<ZoneSystem>>, interval: Duration) -> EngineResult<Self> {
        let (stop_tx, stop_rx) = bounded::<()>(1);

        let handle = thread::Builder::new()
            .name("zone-cache-trim".to_owned())
            .spawn(move || {
                loop {
                    match stop_rx.recv_timeout(interval) {
                        Err(RecvTimeoutError::Timeout) => {
                            system.read().trim_caches();
                        }
                        Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                    }
                }
                debug!("cache maintenance stopped");
            })?;

        debug!(?interval, "cache maintenance started");
        Ok(Self {
            stop_tx,
            handle: Some(handle),
        })
    }

    /// Stop the thread and wait for it to exit.
    pub fn stop(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        let Some(handle) = self.handle.take() else {
            return;
        };
        // A full channel or a gone receiver both mean the thread is exiting.
        let _ = self.stop_tx.try_send(());
        if handle.join().is_err() {
            warn!("cache maintenance thread panicked");
        }
    }
}

impl Drop for CacheMaintenance {
    fn drop(&mut self) {
        self.shutdown();
    }
}
