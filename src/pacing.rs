//! Settle pauses between device actions.

use std::thread;
use std::time::Duration;

/// Blocks the run while the UI finishes a transition
pub trait Pacer {
    fn pause(&mut self, duration: Duration);
}

/// Sleeps the current thread
#[derive(Debug, Default, Clone, Copy)]
pub struct ThreadPacer;

impl Pacer for ThreadPacer {
    fn pause(&mut self, duration: Duration) {
        if !duration.is_zero() {
            thread::sleep(duration);
        }
    }
}

/// Records requested pauses without sleeping
#[derive(Debug, Default, Clone)]
pub struct RecordingPacer {
    pub pauses: Vec<Duration>,
}

impl RecordingPacer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn total(&self) -> Duration {
        self.pauses.iter().sum()
    }
}

impl Pacer for RecordingPacer {
    fn pause(&mut self, duration: Duration) {
        self.pauses.push(duration);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recording_pacer_sums() {
        let mut pacer = RecordingPacer::new();
        pacer.pause(Duration::from_secs(2));
        pacer.pause(Duration::from_secs(1));
        assert_eq!(pacer.pauses.len(), 2);
        assert_eq!(pacer.total(), Duration::from_secs(3));
    }
}
