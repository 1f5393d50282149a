//! Per-session turn state machine
//!
//! Implements the Elm Architecture pattern with pure state transitions:
//! `transition` decides, `Session::execute` applies the resulting effects.

mod effect;
pub mod event;
pub mod state;
pub(crate) mod transition;

#[cfg(test)]
mod proptests;

pub use effect::Effect;
pub use event::{SessionEvent, Submission, ValidationError, IMAGE_ONLY_PLACEHOLDER};
pub use state::{Message, Role, Session, SessionChange, SessionStatus, TurnState};
pub use transition::{transition, TransitionError, TransitionResult};
