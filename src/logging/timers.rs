use std::collections::HashMap;
use std::time::Instant;

/// Result of stopping a named timer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TimerStop {
    /// Performance monitoring is off.
    Disabled,
    /// No mark exists for the label.
    Missing,
    /// Elapsed milliseconds since the matching start.
    Elapsed(f64),
}

/// Named start marks on the monotonic clock.
#[derive(Debug, Default)]
pub struct TimerRegistry {
    enabled: bool,
    marks: HashMap<String, Instant>,
}

impl TimerRegistry {
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled,
            marks: HashMap::new(),
        }
    }

    /// Records a mark for `label`, replacing any earlier one.
    ///
    /// Returns `false` when timers are disabled.
    pub fn start(&mut self, label: &str) -> bool {
        if !self.enabled {
            return false;
        }
        self.marks.insert(label.to_string(), Instant::now());
        true
    }

    /// Removes the mark for `label` and reports the elapsed time.
    pub fn stop(&mut self, label: &str) -> TimerStop {
        if !self.enabled {
            return TimerStop::Disabled;
        }
        match self.marks.remove(label) {
            Some(started) => TimerStop::Elapsed(started.elapsed().as_secs_f64() * 1000.0),
            None => TimerStop::Missing,
        }
    }

    pub fn pending(&self) -> usize {
        self.marks.len()
    }
}

/// Formats a duration in milliseconds as `12.34ms`.
pub fn format_millis(millis: f64) -> String {
    format!("{:.2}ms", millis)
}
