//! Cooperative shutdown flag shared by all worker loops

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Set once by the controller, polled by every worker loop. Never reset.
#[derive(Debug, Clone, Default)]
pub struct ShutdownSignal {
    flag: Arc<AtomicBool>,
}

impl ShutdownSignal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Raise the flag. Returns true only for the call that raised it.
    pub fn trigger(&self) -> bool {
        !self.flag.swap(true, Ordering::SeqCst)
    }

    #[inline]
    pub fn is_triggered(&self) -> bool {
        self.flag.load(Ordering::Acquire)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trigger_once() {
        let signal = ShutdownSignal::new();
        let observer = signal.clone();
        assert!(!observer.is_triggered());

        assert!(signal.trigger());
        assert!(observer.is_triggered());

        // Second trigger is a no-op
        assert!(!observer.trigger());
        assert!(signal.is_triggered());
    }

    #[test]
    fn test_instances_are_independent() {
        let a = ShutdownSignal::new();
        let b = ShutdownSignal::new();
        a.trigger();
        assert!(!b.is_triggered());
    }
}
