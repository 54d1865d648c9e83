use super::{Lifecycle, PhoneHomeConfig, PhoneHomeTask};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

pub const THREAD_NAME: &str = "PhoneHomeThread";

/// A running schedule. Dropping the sender also stops the thread.
struct Schedule {
    cancel: Sender<()>,
    // never joined: cancellation does not wait for an in-flight run
    _handle: JoinHandle<()>,
}

/// Fixed-rate phone-home scheduler.
///
/// Only the domain administration server reports; every other process
/// starts disabled. The first run happens as soon as the schedule starts,
/// later runs at `start + n * interval`.
pub struct PhoneHomeCore {
    enabled: AtomicBool,
    interval: Duration,
    task: Arc<dyn PhoneHomeTask>,
    schedule: Mutex<Option<Schedule>>,
}

impl PhoneHomeCore {
    pub fn new(config: &PhoneHomeConfig, is_das: bool, task: Arc<dyn PhoneHomeTask>) -> Self {
        Self {
            enabled: AtomicBool::new(is_das && config.enabled),
            interval: config.interval(),
            task,
            schedule: Mutex::new(None),
        }
    }

    pub fn enable(&self) {
        self.set_enabled(true);
    }

    pub fn disable(&self) {
        self.set_enabled(false);
    }

    /// Change the flag only; a running schedule is left alone.
    pub fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::Release);
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Acquire)
    }

    pub fn is_running(&self) -> bool {
        self.schedule.lock().is_some()
    }

    /// (Re)start the schedule, enabling the core first if needed.
    pub fn start(&self) {
        if self.is_enabled() {
            self.cancel();
        } else {
            self.enable();
        }
        self.bootstrap();
    }

    /// Disable and cancel. No-op when already disabled.
    pub fn stop(&self) {
        if self.enabled.swap(false, Ordering::AcqRel) {
            self.cancel();
        }
    }

    fn bootstrap(&self) {
        if !self.is_enabled() {
            debug!("phone home disabled, not scheduling");
            return;
        }
        let mut schedule = self.schedule.lock();
        if let Some(previous) = schedule.take() {
            let _ = previous.cancel.send(());
        }

        let (cancel, cancelled) = mpsc::channel::<()>();
        let task = Arc::clone(&self.task);
        let interval = self.interval;
        let spawned = thread::Builder::new()
            .name(THREAD_NAME.to_string())
            .spawn(move || {
                let start = Instant::now();
                let mut runs: u32 = 0;
                loop {
                    task.run();
                    runs = runs.saturating_add(1);
                    let next = interval
                        .checked_mul(runs)
                        .and_then(|offset| start.checked_add(offset));
                    let Some(next) = next else {
                        break;
                    };
                    let wait = next.saturating_duration_since(Instant::now());
                    match cancelled.recv_timeout(wait) {
                        Err(RecvTimeoutError::Timeout) => continue,
                        Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                    }
                }
                debug!("phone home schedule finished");
            });

        match spawned {
            Ok(handle) => {
                info!(interval_secs = interval.as_secs(), "phone home scheduled");
                *schedule = Some(Schedule {
                    cancel,
                    _handle: handle,
                });
            }
            Err(e) => warn!(error = %e, "failed to spawn phone home thread"),
        }
    }

    fn cancel(&self) {
        if let Some(schedule) = self.schedule.lock().take() {
            let _ = schedule.cancel.send(());
            debug!("phone home schedule cancelled");
        }
    }
}

impl Lifecycle for PhoneHomeCore {
    fn on_start(&self) {
        self.bootstrap();
    }

    fn on_stop(&self) {
        self.cancel();
    }
}

impl Drop for PhoneHomeCore {
    fn drop(&mut self) {
        self.cancel();
    }
}

impl std::fmt::Debug for PhoneHomeCore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PhoneHomeCore")
            .field("enabled", &self.is_enabled())
            .field("interval", &self.interval)
            .field("running", &self.is_running())
            .finish()
    }
}
