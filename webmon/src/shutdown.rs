//! Cooperative stop controller.
//!
//! `main.rs` waits on this until the operator presses enter, stdin reaches
//! EOF, or Ctrl-C arrives, then stops every Monitor.

use std::io::BufRead;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use tokio::sync::Notify;
use tracing::{debug, warn};

/// Prompt printed before waiting for the operator.
pub const STOP_PROMPT: &str = "Press enter to stop";

/// Cooperative stop signal shared between the input listeners and `main`.
#[derive(Clone, Debug, Default)]
pub struct StopController {
    inner: Arc<Inner>,
}

#[derive(Debug, Default)]
struct Inner {
    requested: AtomicBool,
    notify: Notify,
}

impl StopController {
    /// Returns true if a stop has been requested.
    pub fn is_stop_requested(&self) -> bool {
        self.inner.requested.load(Ordering::Relaxed)
    }

    /// Request a stop and wake all waiters.
    pub fn request_stop(&self) {
        self.inner.requested.store(true, Ordering::SeqCst);
        self.inner.notify.notify_waiters();
    }

    /// Wait until a stop is requested.
    pub async fn wait(&self) {
        let notified = self.inner.notify.notified();
        tokio::pin!(notified);
        notified.as_mut().enable();
        if self.is_stop_requested() {
            return;
        }
        notified.await;
    }

    /// Block until `reader` yields a line or ends, then request a stop.
    pub fn stop_on_line<R: BufRead>(&self, mut reader: R) {
        let mut line = String::new();
        match reader.read_line(&mut line) {
            Ok(0) => debug!("Input closed"),
            Ok(_) => debug!("Stop requested from input"),
            Err(e) => warn!(error = %e, "Failed to read input"),
        }
        self.request_stop();
    }

    /// Watch stdin on a detached thread.
    ///
    /// A blocking read cannot be cancelled, so the thread is never joined and
    /// does not hold the process open once `main` returns.
    pub fn listen_stdin(&self) -> std::io::Result<()> {
        let controller = self.clone();
        std::thread::Builder::new()
            .name("webmon-stdin".to_string())
            .spawn(move || controller.stop_on_line(std::io::stdin().lock()))?;
        Ok(())
    }

    /// Request a stop on Ctrl-C.
    pub fn listen_ctrl_c(&self) {
        let controller = self.clone();
        tokio::spawn(async move {
            match tokio::signal::ctrl_c().await {
                Ok(()) => {
                    debug!("Received Ctrl-C");
                    controller.request_stop();
                }
                Err(e) => warn!(error = %e, "Failed to listen for Ctrl-C"),
            }
        });
    }
}
