//! Simulated test run for demos: no backend, fixed timeline.

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::app::TestUpdate;
use crate::phase::Phase;

/// Phases entered after the start of a simulated run, by offset.
pub const TIMELINE: [(Duration, Phase); 3] = [
    (Duration::from_secs(2), Phase::Upload),
    (Duration::from_secs(4), Phase::Download),
    (Duration::from_secs(6), Phase::Results),
];

/// Delay before the welcome page appears in simulate mode.
pub const STARTUP_DELAY: Duration = Duration::from_secs(1);

pub struct SimulationHandle {
    task: JoinHandle<()>,
}

impl SimulationHandle {
    /// Send each `(offset, phase)` step once its offset has elapsed.
    pub fn spawn(steps: &[(Duration, Phase)], update_tx: mpsc::Sender<TestUpdate>) -> Self {
        let steps = steps.to_vec();
        let task = tokio::spawn(async move {
            let start = tokio::time::Instant::now();
            for (offset, phase) in steps {
                tokio::time::sleep_until(start + offset).await;
                if update_tx.send(TestUpdate::Phase(phase)).await.is_err() {
                    break;
                }
            }
        });
        Self { task }
    }

    pub fn run(update_tx: mpsc::Sender<TestUpdate>) -> Self {
        Self::spawn(&TIMELINE, update_tx)
    }

    pub fn startup(update_tx: mpsc::Sender<TestUpdate>) -> Self {
        Self::spawn(&[(STARTUP_DELAY, Phase::Welcome)], update_tx)
    }
}

impl Drop for SimulationHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}
