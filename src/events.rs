//! Notifications from the rules engine to whoever draws and plays sound
//!
//! The engine never waits on a listener. Events are fire-and-forget.

use crate::block::Charge;
use std::sync::mpsc::Sender;

/// Everything the engine tells the outside world
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GameEvent {
    /// A block was removed; pixel centre of its cell
    Explosion { x: f64, y: f64, charge: Charge },
    /// One removal pass finished
    BlocksRemoved { count: usize },
    /// A placed block touched down; pixel bottom-centre of its cell
    Dust { x: f64, y: f64 },
    /// A piece was hard dropped this many rows
    HardDrop { height: i32 },
}

/// Listener with one hook per event. Every hook defaults to doing nothing.
pub trait EventSink {
    fn explosion(&mut self, _x: f64, _y: f64, _charge: Charge) {}
    fn blocks_removed(&mut self, _count: usize) {}
    fn dust(&mut self, _x: f64, _y: f64) {}
    fn hard_drop(&mut self, _height: i32) {}

    /// Route an event to its hook
    fn emit(&mut self, event: GameEvent) {
        match event {
            GameEvent::Explosion { x, y, charge } => self.explosion(x, y, charge),
            GameEvent::BlocksRemoved { count } => self.blocks_removed(count),
            GameEvent::Dust { x, y } => self.dust(x, y),
            GameEvent::HardDrop { height } => self.hard_drop(height),
        }
    }
}

/// Discards everything
impl EventSink for () {}

/// Queue events for the frame loop to drain
impl EventSink for Sender<GameEvent> {
    fn emit(&mut self, event: GameEvent) {
        // A dropped receiver just means nobody is listening anymore
        let _ = self.send(event);
    }
}

/// Collects events in order, handy for inspecting what the engine did
impl EventSink for Vec<GameEvent> {
    fn emit(&mut self, event: GameEvent) {
        self.push(event);
    }
}
