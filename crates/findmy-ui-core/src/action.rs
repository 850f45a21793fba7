//! Interaction types and their log records.
//!
//! An [`Action`] is what the [`Dispatcher`](crate::dispatch::Dispatcher) does
//! to a resolved element. Every dispatch produces an [`ActionRecord`] that
//! ends up in the [`Report`](crate::report::Report).
//!
//! # Example
//!
//! ```
//! use findmy_ui_core::action::{Action, ActionOutcome, ActionRecord, SwipeDirection};
//!
//! let action = Action::Swipe { direction: SwipeDirection::Left };
//! let record = ActionRecord::new(action, "label=\"Laptop\"", ActionOutcome::Performed, 12);
//! println!("Action {} at {}", record.id, record.timestamp);
//! ```

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::SuiteConfig;
use crate::element::ElementFrame;

/// Direction of a swipe gesture, named after the finger's movement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SwipeDirection {
    Up,
    Down,
    Left,
    Right,
}

impl SwipeDirection {
    /// Start and end points of the swipe inside `frame`.
    ///
    /// The gesture covers the middle 60% of the frame along its axis.
    pub fn endpoints(self, frame: &ElementFrame) -> ((i32, i32), (i32, i32)) {
        let (from, to) = match self {
            SwipeDirection::Up => ((0.5, 0.8), (0.5, 0.2)),
            SwipeDirection::Down => ((0.5, 0.2), (0.5, 0.8)),
            SwipeDirection::Left => ((0.8, 0.5), (0.2, 0.5)),
            SwipeDirection::Right => ((0.2, 0.5), (0.8, 0.5)),
        };
        (frame.point_at(from.0, from.1), frame.point_at(to.0, to.1))
    }
}

impl fmt::Display for SwipeDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SwipeDirection::Up => "up",
            SwipeDirection::Down => "down",
            SwipeDirection::Left => "left",
            SwipeDirection::Right => "right",
        };
        f.write_str(s)
    }
}

/// An interaction with a single element.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Action {
    Tap,
    DoubleTap,
    LongPress {
        duration_ms: u64,
    },
    Swipe {
        direction: SwipeDirection,
    },
    /// Tap to focus, then type.
    TypeText {
        text: String,
    },
    /// Empty a text field.
    ClearText,
}

impl Action {
    /// Returns a short, static name for this action suitable for use in
    /// tracing span metadata.
    pub fn name(&self) -> &'static str {
        match self {
            Action::Tap => "tap",
            Action::DoubleTap => "double_tap",
            Action::LongPress { .. } => "long_press",
            Action::Swipe { .. } => "swipe",
            Action::TypeText { .. } => "type_text",
            Action::ClearText => "clear_text",
        }
    }

    /// Settle delay after this action, in milliseconds.
    pub fn settle_ms(&self, config: &SuiteConfig) -> u64 {
        let settle = &config.settle;
        match self {
            Action::Tap => settle.tap_ms,
            Action::DoubleTap => settle.double_tap_ms,
            Action::LongPress { .. } => settle.long_press_ms,
            Action::Swipe { .. } => settle.swipe_ms,
            Action::TypeText { .. } => settle.type_text_ms,
            Action::ClearText => settle.clear_text_ms,
        }
    }
}

/// How a dispatched action ended.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", content = "detail", rename_all = "snake_case")]
pub enum ActionOutcome {
    /// The action was delivered (and any post-condition held).
    Performed,
    /// The action was delivered but its post-condition did not hold.
    PostConditionMissed,
    /// The element was gone when re-resolved; nothing was sent.
    NotFound,
    /// The backend rejected the action.
    Failed(String),
}

impl ActionOutcome {
    pub fn is_delivered(&self) -> bool {
        matches!(self, ActionOutcome::Performed | ActionOutcome::PostConditionMissed)
    }
}

/// A logged action with metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionRecord {
    /// Unique identifier for this log entry.
    pub id: Uuid,

    /// When the action was dispatched.
    pub timestamp: DateTime<Utc>,

    pub action: Action,

    /// Human-readable form of the target descriptor.
    pub target: String,

    pub outcome: ActionOutcome,

    /// Time from re-resolution to the end of the settle delay.
    pub duration_ms: u64,
}

impl ActionRecord {
    pub fn new(action: Action, target: impl Into<String>, outcome: ActionOutcome, duration_ms: u64) -> Self {
        Self {
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            action,
            target: target.into(),
            outcome,
            duration_ms,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_are_stable() {
        assert_eq!(Action::Tap.name(), "tap");
        assert_eq!(Action::LongPress { duration_ms: 1000 }.name(), "long_press");
        assert_eq!(Action::TypeText { text: "x".into() }.name(), "type_text");
        assert_eq!(Action::ClearText.name(), "clear_text");
    }

    #[test]
    fn settle_follows_config() {
        let config = SuiteConfig::default();
        assert_eq!(Action::Tap.settle_ms(&config), 500);
        assert_eq!(Action::LongPress { duration_ms: 1 }.settle_ms(&config), 1000);
        assert_eq!(Action::Swipe { direction: SwipeDirection::Up }.settle_ms(&config), 1000);
    }

    #[test]
    fn swipe_endpoints_stay_inside_frame() {
        let frame = ElementFrame::new(0.0, 100.0, 200.0, 100.0);
        let (from, to) = SwipeDirection::Left.endpoints(&frame);
        assert_eq!(from, (160, 150));
        assert_eq!(to, (40, 150));
        let (from, to) = SwipeDirection::Down.endpoints(&frame);
        assert!(from.1 < to.1);
    }

    #[test]
    fn record_serializes_with_tags() {
        let record = ActionRecord::new(
            Action::Swipe { direction: SwipeDirection::Left },
            "id=\"cell\"",
            ActionOutcome::Failed("busy".into()),
            3,
        );
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["action"]["type"], "swipe");
        assert_eq!(json["action"]["direction"], "left");
        assert_eq!(json["outcome"]["status"], "failed");
        assert_eq!(json["outcome"]["detail"], "busy");
        assert!(!record.outcome.is_delivered());
    }
}
