//! Momentary-button (PTT) debouncer.
//!
//! Edge-timestamped debounce: a raw change records an edge, and the
//! debounced state adopts the raw value only after it has been stable for
//! the full window, firing exactly one event. `resync` forces the state to
//! match the raw input without an event — the cycle uses it whenever the
//! safety core disallows PTT, so edges accumulated during fault/e-stop/
//! maintenance never surface as spurious events on recovery.

use rig_common::state::PttEvent;
use rig_common::time::elapsed;

/// Debouncer state for one momentary input.
#[derive(Debug, Clone, Copy)]
pub struct PttDebouncer {
    pressed: bool,
    raw_state: bool,
    debounce_ms: u32,
    last_edge_ms: u32,
}

impl PttDebouncer {
    /// Create with a known initial level. `debounce_ms == 0` accepts edges
    /// immediately.
    pub const fn new(debounce_ms: u32, initial_pressed: bool) -> Self {
        Self {
            pressed: initial_pressed,
            raw_state: initial_pressed,
            debounce_ms,
            last_edge_ms: 0,
        }
    }

    /// Force the debounced state to the raw level without emitting an event.
    pub fn resync(&mut self, raw_pressed: bool, now_ms: u32) {
        self.pressed = raw_pressed;
        self.raw_state = raw_pressed;
        self.last_edge_ms = now_ms;
    }

    /// Sample the raw input; returns the debounced edge event, if any.
    pub fn update(&mut self, raw_pressed: bool, now_ms: u32) -> PttEvent {
        if raw_pressed != self.raw_state {
            self.raw_state = raw_pressed;
            self.last_edge_ms = now_ms;
        }

        if self.raw_state == self.pressed {
            return PttEvent::None;
        }

        if self.debounce_ms > 0 && elapsed(now_ms, self.last_edge_ms) < self.debounce_ms {
            return PttEvent::None;
        }

        self.pressed = self.raw_state;
        if self.pressed {
            PttEvent::Down
        } else {
            PttEvent::Up
        }
    }

    /// Current debounced level.
    #[inline]
    pub const fn is_pressed(&self) -> bool {
        self.pressed
    }
}
