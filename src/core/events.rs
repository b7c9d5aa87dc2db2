//! Window Event Queue
//!
//! The platform layer translates OS callbacks into [`WindowEvent`]s and
//! pushes them here. The engine drains the queue once per outer loop
//! iteration, strictly in arrival order, before any simulation or rendering
//! happens for that iteration.
//!
//! # Example
//!
//! ```ignore
//! // Platform callback
//! engine.events_mut().push(WindowEvent::Resize { width: 800, height: 600 });
//!
//! // Start of the next iteration
//! while let Some(event) = queue.pop() {
//!     apply(event);
//! }
//! ```

use std::collections::VecDeque;

use winit::keyboard::KeyCode;

// ============================================================================
// Event Types
// ============================================================================

/// Discrete input/window events consumed by the engine state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowEvent {
    /// The user asked to close the window
    Close,
    /// The drawable area changed size
    Resize {
        /// New width in physical pixels
        width: u32,
        /// New height in physical pixels
        height: u32,
    },
    /// The window lost input focus
    FocusLost,
    /// The window regained input focus
    FocusGained,
    /// A key was pressed (repeats are filtered out by the platform layer)
    KeyDown(KeyCode),
    /// A key was released
    KeyUp(KeyCode),
}

// ============================================================================
// Event Queue
// ============================================================================

/// FIFO queue of window events.
///
/// Each event is consumed exactly once. Events pushed while a drain is in
/// progress are still delivered in order by the same drain.
#[derive(Debug)]
pub struct EventQueue {
    events: VecDeque<WindowEvent>,
}

impl EventQueue {
    /// Default initial capacity for the queue.
    const DEFAULT_CAPACITY: usize = 32;

    /// Create an empty queue.
    #[must_use]
    pub fn new() -> Self {
        Self {
            events: VecDeque::with_capacity(Self::DEFAULT_CAPACITY),
        }
    }

    /// Append an event at the back of the queue.
    #[inline]
    pub fn push(&mut self, event: WindowEvent) {
        self.events.push_back(event);
    }

    /// Remove and return the oldest event.
    #[inline]
    pub fn pop(&mut self) -> Option<WindowEvent> {
        self.events.pop_front()
    }

    /// Check whether any events are waiting.
    #[must_use]
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Number of queued events.
    #[must_use]
    #[inline]
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// Drop every queued event.
    pub fn clear(&mut self) {
        self.events.clear();
    }
}

impl Default for EventQueue {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_queue_is_fifo() {
        let mut queue = EventQueue::new();

        queue.push(WindowEvent::Resize {
            width: 400,
            height: 300,
        });
        queue.push(WindowEvent::Close);
        queue.push(WindowEvent::KeyDown(KeyCode::KeyP));

        assert_eq!(queue.len(), 3);
        assert_eq!(
            queue.pop(),
            Some(WindowEvent::Resize {
                width: 400,
                height: 300
            })
        );
        assert_eq!(queue.pop(), Some(WindowEvent::Close));
        assert_eq!(queue.pop(), Some(WindowEvent::KeyDown(KeyCode::KeyP)));
        assert_eq!(queue.pop(), None);
    }

    #[test]
    fn test_event_consumed_once() {
        let mut queue = EventQueue::new();
        queue.push(WindowEvent::FocusLost);

        assert!(queue.pop().is_some());
        assert!(queue.is_empty());
        assert!(queue.pop().is_none());
    }

    #[test]
    fn test_event_queue_clear() {
        let mut queue = EventQueue::new();
        queue.push(WindowEvent::FocusGained);
        queue.push(WindowEvent::KeyUp(KeyCode::KeyW));

        queue.clear();

        assert!(queue.is_empty());
        assert_eq!(queue.len(), 0);
    }
}
