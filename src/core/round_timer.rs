//! Round timer - cancellable per-question countdown
//!
//! The timer does not own a clock. The caller feeds it one `tick()` per
//! elapsed second, which lets tests drive virtual time. Expiry is reported
//! exactly once per `start()`, and never after `cancel()`.

use crate::core::constants::{TIMER_CRITICAL_SECS, TIMER_WARNING_SECS};

/// Display urgency of the remaining time
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerUrgency {
    Normal,
    /// Time is running low
    Warning,
    /// Last few seconds
    Critical,
}

impl TimerUrgency {
    pub fn for_remaining(seconds_remaining: u32) -> Self {
        if seconds_remaining <= TIMER_CRITICAL_SECS {
            TimerUrgency::Critical
        } else if seconds_remaining <= TIMER_WARNING_SECS {
            TimerUrgency::Warning
        } else {
            TimerUrgency::Normal
        }
    }
}

/// Observable state of the timer
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TimerState {
    pub seconds_remaining: u32,
    pub running: bool,
}

/// What a single tick produced
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerTick {
    /// No countdown is running
    Idle,
    /// Still counting
    Running {
        seconds_remaining: u32,
        urgency: TimerUrgency,
    },
    /// Reached zero on this tick
    Expired,
}

#[derive(Debug, Default)]
pub struct RoundTimer {
    state: TimerState,
}

impl RoundTimer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a fresh countdown, superseding any running one.
    ///
    /// Returns the initial display tick.
    pub fn start(&mut self, duration_secs: u32) -> TimerTick {
        self.state = TimerState {
            seconds_remaining: duration_secs,
            running: true,
        };
        TimerTick::Running {
            seconds_remaining: duration_secs,
            urgency: TimerUrgency::for_remaining(duration_secs),
        }
    }

    /// Stop without firing. Returns whether a countdown was running.
    pub fn cancel(&mut self) -> bool {
        let was_running = self.state.running;
        self.state.running = false;
        was_running
    }

    /// Advance by one second
    pub fn tick(&mut self) -> TimerTick {
        if !self.state.running {
            return TimerTick::Idle;
        }

        self.state.seconds_remaining = self.state.seconds_remaining.saturating_sub(1);
        if self.state.seconds_remaining == 0 {
            self.state.running = false;
            return TimerTick::Expired;
        }

        TimerTick::Running {
            seconds_remaining: self.state.seconds_remaining,
            urgency: TimerUrgency::for_remaining(self.state.seconds_remaining),
        }
    }

    pub fn is_running(&self) -> bool {
        self.state.running
    }

    pub fn state(&self) -> TimerState {
        self.state
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_idle_timer_ticks_idle() {
        let mut timer = RoundTimer::new();
        assert_eq!(timer.tick(), TimerTick::Idle);
        assert!(!timer.is_running());
    }

    #[test]
    fn test_start_reports_initial_tick() {
        let mut timer = RoundTimer::new();
        assert_eq!(
            timer.start(15),
            TimerTick::Running {
                seconds_remaining: 15,
                urgency: TimerUrgency::Normal
            }
        );
        assert!(timer.is_running());
    }

    #[test]
    fn test_expires_exactly_once() {
        let mut timer = RoundTimer::new();
        timer.start(3);
        assert!(matches!(
            timer.tick(),
            TimerTick::Running {
                seconds_remaining: 2,
                ..
            }
        ));
        assert!(matches!(
            timer.tick(),
            TimerTick::Running {
                seconds_remaining: 1,
                ..
            }
        ));
        assert_eq!(timer.tick(), TimerTick::Expired);
        assert_eq!(timer.tick(), TimerTick::Idle);
        assert_eq!(timer.tick(), TimerTick::Idle);
    }

    #[test]
    fn test_fifteen_second_round_expires_on_fifteenth_tick() {
        let mut timer = RoundTimer::new();
        timer.start(15);
        for _ in 0..14 {
            assert!(matches!(timer.tick(), TimerTick::Running { .. }));
        }
        assert_eq!(timer.tick(), TimerTick::Expired);
    }

    #[test]
    fn test_cancel_prevents_expiry() {
        let mut timer = RoundTimer::new();
        timer.start(2);
        timer.tick();
        assert!(timer.cancel());
        assert_eq!(timer.tick(), TimerTick::Idle);
        assert_eq!(timer.tick(), TimerTick::Idle);
        assert!(!timer.cancel());
    }

    #[test]
    fn test_restart_supersedes_running_instance() {
        let mut timer = RoundTimer::new();
        timer.start(2);
        timer.tick();
        timer.start(15);
        // The first instance would have expired here
        assert!(matches!(
            timer.tick(),
            TimerTick::Running {
                seconds_remaining: 14,
                ..
            }
        ));
    }

    #[test]
    fn test_zero_duration_expires_on_first_tick() {
        let mut timer = RoundTimer::new();
        timer.start(0);
        assert_eq!(timer.tick(), TimerTick::Expired);
    }

    #[test]
    fn test_urgency_thresholds() {
        assert_eq!(TimerUrgency::for_remaining(15), TimerUrgency::Normal);
        assert_eq!(TimerUrgency::for_remaining(11), TimerUrgency::Normal);
        assert_eq!(TimerUrgency::for_remaining(10), TimerUrgency::Warning);
        assert_eq!(TimerUrgency::for_remaining(6), TimerUrgency::Warning);
        assert_eq!(TimerUrgency::for_remaining(5), TimerUrgency::Critical);
        assert_eq!(TimerUrgency::for_remaining(0), TimerUrgency::Critical);
    }
}
