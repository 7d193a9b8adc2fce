//! Turn graph
//!
//! A turn walks `intent_router → {contextualize | rewrite | answer}`, then
//! `retrieve → grade` with a bounded rewrite loop, an optional fallback, and
//! finally `answer`.

mod orchestrator;
pub mod stages;
mod state;
mod transition;

pub use orchestrator::{Orchestrator, TurnOutcome};
pub use stages::FALLBACK_CONTEXT;
pub use state::{render_history, Grade, Role, Route, TurnState, Utterance};
pub use transition::{next, GraphNode};
