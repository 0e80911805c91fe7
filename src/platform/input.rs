//! Discrete input queue
//!
//! Host key/pointer handlers push events as they arrive; the session drains
//! the queue once per tick so every tick sees a fixed, ordered input set.

use std::collections::VecDeque;

use crate::sim::{Direction, TickInput};

/// One discrete player action
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputEvent {
    Turn(Direction),
    Flap,
    TogglePause,
}

impl InputEvent {
    /// Map a DOM `KeyboardEvent.key` value
    pub fn from_key(key: &str) -> Option<Self> {
        match key {
            "ArrowUp" | "w" | "W" => Some(InputEvent::Turn(Direction::Up)),
            "ArrowDown" | "s" | "S" => Some(InputEvent::Turn(Direction::Down)),
            "ArrowLeft" | "a" | "A" => Some(InputEvent::Turn(Direction::Left)),
            "ArrowRight" | "d" | "D" => Some(InputEvent::Turn(Direction::Right)),
            " " => Some(InputEvent::Flap),
            "p" | "P" | "Escape" => Some(InputEvent::TogglePause),
            _ => None,
        }
    }
}

#[derive(Debug, Default)]
pub struct InputQueue {
    events: VecDeque<InputEvent>,
}

impl InputQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, event: InputEvent) {
        self.events.push_back(event);
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Pull pause toggles out of the queue, leaving gameplay input in place
    pub fn take_toggles(&mut self) -> usize {
        let before = self.events.len();
        self.events.retain(|e| *e != InputEvent::TogglePause);
        before - self.events.len()
    }

    /// Drain everything queued into the next tick's input
    pub fn drain_tick(&mut self) -> TickInput {
        let mut input = TickInput::default();
        for event in self.events.drain(..) {
            match event {
                InputEvent::Turn(dir) => input.turns.push(dir),
                InputEvent::Flap => input.flap = true,
                InputEvent::TogglePause => {}
            }
        }
        input
    }

    pub fn clear(&mut self) {
        self.events.clear();
    }
}
