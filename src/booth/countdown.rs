use std::time::{Duration, Instant};

const TICK: Duration = Duration::from_millis(500);
const FIRE_DELAY: Duration = Duration::from_millis(200);

/// Pre-capture delay choices offered by the booth.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum TimerDelay {
    #[default]
    Off,
    Short,
    Medium,
    Long,
}

impl TimerDelay {
    pub fn seconds(self) -> u32 {
        match self {
            TimerDelay::Off => 0,
            TimerDelay::Short => 3,
            TimerDelay::Medium => 5,
            TimerDelay::Long => 10,
        }
    }

    pub fn next(self) -> Self {
        match self {
            TimerDelay::Off => TimerDelay::Short,
            TimerDelay::Short => TimerDelay::Medium,
            TimerDelay::Medium => TimerDelay::Long,
            TimerDelay::Long => TimerDelay::Off,
        }
    }
}

/// What a countdown advance produced.
#[derive(Debug, PartialEq, Eq)]
pub enum CountdownEvent {
    /// Nothing changed this cycle.
    Idle,
    /// The visible count stepped down to `remaining`.
    Tick(u32),
    /// Time to capture.
    Fire,
}

enum State {
    Idle,
    Counting { remaining: u32, next_tick: Instant },
    /// The count hit zero; the shutter fires a beat later so the last
    /// step is actually visible.
    Armed { fire_at: Instant },
}

/// Half-second countdown that arms the shutter.
pub struct Countdown {
    state: State,
}

impl Countdown {
    pub fn new() -> Self {
        Self { state: State::Idle }
    }

    /// True while a countdown holds the capture control inert.
    pub fn running(&self) -> bool {
        !matches!(self.state, State::Idle)
    }

    /// Remaining count to display, when one is showing.
    pub fn display(&self) -> Option<u32> {
        match self.state {
            State::Counting { remaining, .. } => Some(remaining),
            _ => None,
        }
    }

    /// Begin a countdown. A zero delay fires immediately.
    pub fn start(&mut self, delay: TimerDelay, now: Instant) -> CountdownEvent {
        if self.running() {
            return CountdownEvent::Idle;
        }
        let seconds = delay.seconds();
        if seconds == 0 {
            return CountdownEvent::Fire;
        }
        self.state = State::Counting {
            remaining: seconds,
            next_tick: now + TICK,
        };
        CountdownEvent::Tick(seconds)
    }

    /// Advance the timer; call once per loop iteration.
    pub fn advance(&mut self, now: Instant) -> CountdownEvent {
        match self.state {
            State::Idle => CountdownEvent::Idle,
            State::Counting {
                remaining,
                next_tick,
            } if now >= next_tick => {
                let remaining = remaining - 1;
                tracing::debug!("Countdown tick: {remaining}");
                if remaining == 0 {
                    self.state = State::Armed {
                        fire_at: now + FIRE_DELAY,
                    };
                } else {
                    self.state = State::Counting {
                        remaining,
                        next_tick: next_tick + TICK,
                    };
                }
                CountdownEvent::Tick(remaining)
            }
            State::Counting { .. } => CountdownEvent::Idle,
            State::Armed { fire_at } if now >= fire_at => {
                self.state = State::Idle;
                CountdownEvent::Fire
            }
            State::Armed { .. } => CountdownEvent::Idle,
        }
    }
}
