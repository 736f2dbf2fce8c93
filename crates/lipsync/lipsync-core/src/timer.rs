//! One-shot deferred jobs, used for the wall-clock deactivation of triggered visemes.

use std::thread;
use std::time::Duration;

pub type Job = Box<dyn FnOnce() + Send + 'static>;

/// Runs a job once after `delay`, independently of the tick loop.
pub trait DeferredRunner: Send + Sync {
    fn run_after(&self, delay: Duration, job: Job);
}

/// Spawns a sleeping thread per job.
#[derive(Debug, Default, Clone, Copy)]
pub struct ThreadTimer;

impl DeferredRunner for ThreadTimer {
    fn run_after(&self, delay: Duration, job: Job) {
        // Never due.
        if delay == Duration::MAX {
            return;
        }
        let spawned = thread::Builder::new()
            .name("lipsync-deferred".into())
            .spawn(move || {
                thread::sleep(delay);
                job();
            });
        if let Err(err) = spawned {
            log::warn!("failed to spawn deferred job thread: {err}");
        }
    }
}
