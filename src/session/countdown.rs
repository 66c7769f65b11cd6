// src/session/countdown.rs

/// Lifecycle of one session countdown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub enum CountdownState {
    /// Created but not started yet (assessment still loading).
    Idle,
    /// Ticking, one decrement per second.
    Running,
    /// Reached zero. Terminal.
    Expired,
    /// Torn down before expiry. Terminal, no submission.
    Cancelled,
}

/// Result of a single tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// Decremented by one, still running.
    Ticked,
    /// This tick crossed zero. Reported exactly once per countdown;
    /// any further ticks are `Noop`.
    Expired,
    /// The countdown is not running; nothing happened.
    Noop,
}

/// Single-session countdown: `Idle -> Running -> {Expired, Cancelled}`.
///
/// The expiry edge is the state transition itself, so duplicate tick
/// sources cannot observe it twice.
#[derive(Debug, Clone)]
pub struct Countdown {
    state: CountdownState,
    total_seconds: u64,
    remaining_seconds: u64,
}

impl Countdown {
    pub fn new(total_seconds: u64) -> Self {
        Self {
            state: CountdownState::Idle,
            total_seconds,
            remaining_seconds: total_seconds,
        }
    }

    /// Starts ticking. Only meaningful from `Idle`.
    pub fn start(&mut self) {
        if self.state == CountdownState::Idle {
            self.state = CountdownState::Running;
        }
    }

    /// Advances the countdown by one second.
    pub fn tick(&mut self) -> TickOutcome {
        if self.state != CountdownState::Running {
            return TickOutcome::Noop;
        }

        self.remaining_seconds = self.remaining_seconds.saturating_sub(1);

        if self.remaining_seconds == 0 {
            self.state = CountdownState::Expired;
            TickOutcome::Expired
        } else {
            TickOutcome::Ticked
        }
    }

    /// Stops ticking without expiry. No-op once terminal.
    pub fn cancel(&mut self) {
        if matches!(self.state, CountdownState::Idle | CountdownState::Running) {
            self.state = CountdownState::Cancelled;
        }
    }

    pub fn state(&self) -> CountdownState {
        self.state
    }

    pub fn is_running(&self) -> bool {
        self.state == CountdownState::Running
    }

    pub fn is_expired(&self) -> bool {
        self.state == CountdownState::Expired
    }

    pub fn remaining_seconds(&self) -> u64 {
        self.remaining_seconds
    }

    pub fn elapsed_seconds(&self) -> u64 {
        self.total_seconds - self.remaining_seconds
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn idle_does_not_tick() {
        let mut c = Countdown::new(10);
        assert_eq!(c.tick(), TickOutcome::Noop);
        assert_eq!(c.remaining_seconds(), 10);
    }

    #[test]
    fn ticks_decrement_by_one() {
        let mut c = Countdown::new(10);
        c.start();
        assert_eq!(c.tick(), TickOutcome::Ticked);
        assert_eq!(c.tick(), TickOutcome::Ticked);
        assert_eq!(c.remaining_seconds(), 8);
        assert_eq!(c.elapsed_seconds(), 2);
    }

    #[test]
    fn expiry_fires_exactly_once() {
        let t = 5;
        let mut c = Countdown::new(t);
        c.start();

        let mut expiries = 0;
        // Plenty of extra ticks past the limit.
        for _ in 0..(t * 3) {
            if c.tick() == TickOutcome::Expired {
                expiries += 1;
            }
        }

        assert_eq!(expiries, 1);
        assert_eq!(c.remaining_seconds(), 0);
        assert_eq!(c.state(), CountdownState::Expired);
    }

    #[test]
    fn expires_on_the_exact_tick() {
        let mut c = Countdown::new(3);
        c.start();
        assert_eq!(c.tick(), TickOutcome::Ticked);
        assert_eq!(c.tick(), TickOutcome::Ticked);
        assert_eq!(c.tick(), TickOutcome::Expired);
    }

    #[test]
    fn cancel_stops_ticking() {
        let mut c = Countdown::new(10);
        c.start();
        c.tick();
        c.cancel();
        assert_eq!(c.state(), CountdownState::Cancelled);
        assert_eq!(c.tick(), TickOutcome::Noop);
        assert_eq!(c.remaining_seconds(), 9);
    }

    #[test]
    fn cancel_after_expiry_is_a_noop() {
        let mut c = Countdown::new(1);
        c.start();
        assert_eq!(c.tick(), TickOutcome::Expired);
        c.cancel();
        assert_eq!(c.state(), CountdownState::Expired);
    }
}
