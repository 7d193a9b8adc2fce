//! Conditional edges of the turn graph
//!
//! The edge logic is a pure function of the node just run and the state it
//! produced, so it can be exercised without any model calls.

use super::state::{Grade, Route, TurnState};
use serde::Serialize;
use std::fmt;

/// Nodes of the turn graph
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GraphNode {
    IntentRouter,
    Contextualize,
    Rewrite,
    Retrieve,
    Grade,
    Fallback,
    Answer,
    End,
}

impl GraphNode {
    pub const ENTRY: GraphNode = GraphNode::IntentRouter;
}

impl fmt::Display for GraphNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            GraphNode::IntentRouter => "intent_router",
            GraphNode::Contextualize => "contextualize",
            GraphNode::Rewrite => "rewrite",
            GraphNode::Retrieve => "retrieve",
            GraphNode::Grade => "grade",
            GraphNode::Fallback => "fallback",
            GraphNode::Answer => "answer",
            GraphNode::End => "end",
        };
        write!(f, "{}", name)
    }
}

/// Node to run after `node`, given the state it left behind.
///
/// A hyde route with no retry budget goes straight to retrieval; otherwise
/// every rewrite is bounded by `max_retries`.
pub fn next(node: GraphNode, state: &TurnState, max_retries: u32) -> GraphNode {
    match node {
        GraphNode::IntentRouter => match state.route {
            Some(Route::Contextualize) => GraphNode::Contextualize,
            Some(Route::Hyde) if state.loop_step < max_retries => GraphNode::Rewrite,
            Some(Route::Hyde) => GraphNode::Retrieve,
            Some(Route::Direct) | None => GraphNode::Answer,
        },
        GraphNode::Contextualize | GraphNode::Rewrite => GraphNode::Retrieve,
        GraphNode::Retrieve => GraphNode::Grade,
        GraphNode::Grade => match state.grade {
            Some(Grade::Yes) => GraphNode::Answer,
            _ if state.loop_step < max_retries => GraphNode::Rewrite,
            _ => GraphNode::Fallback,
        },
        GraphNode::Fallback => GraphNode::Answer,
        GraphNode::Answer | GraphNode::End => GraphNode::End,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn state(route: Option<Route>, grade: Option<Grade>, loop_step: u32) -> TurnState {
        TurnState {
            route,
            grade,
            loop_step,
            ..Default::default()
        }
    }

    #[test]
    fn test_router_edges() {
        assert_eq!(
            next(GraphNode::IntentRouter, &state(Some(Route::Contextualize), None, 0), 3),
            GraphNode::Contextualize
        );
        assert_eq!(
            next(GraphNode::IntentRouter, &state(Some(Route::Hyde), None, 0), 3),
            GraphNode::Rewrite
        );
        assert_eq!(
            next(GraphNode::IntentRouter, &state(Some(Route::Direct), None, 0), 3),
            GraphNode::Answer
        );
    }

    #[test]
    fn test_zero_retries_skips_rewrite() {
        assert_eq!(
            next(GraphNode::IntentRouter, &state(Some(Route::Hyde), None, 0), 0),
            GraphNode::Retrieve
        );
        assert_eq!(
            next(GraphNode::Grade, &state(None, Some(Grade::No), 0), 0),
            GraphNode::Fallback
        );
    }

    #[test]
    fn test_grade_edges() {
        assert_eq!(
            next(GraphNode::Grade, &state(None, Some(Grade::Yes), 3), 3),
            GraphNode::Answer
        );
        assert_eq!(
            next(GraphNode::Grade, &state(None, Some(Grade::No), 2), 3),
            GraphNode::Rewrite
        );
        assert_eq!(
            next(GraphNode::Grade, &state(None, Some(Grade::No), 3), 3),
            GraphNode::Fallback
        );
    }

    fn arb_route() -> impl Strategy<Value = Option<Route>> {
        prop_oneof![
            Just(None),
            Just(Some(Route::Contextualize)),
            Just(Some(Route::Hyde)),
            Just(Some(Route::Direct)),
        ]
    }

    fn arb_grade() -> impl Strategy<Value = Grade> {
        prop_oneof![Just(Grade::Yes), Just(Grade::No)]
    }

    proptest! {
        /// Walking the graph with arbitrary grader verdicts always terminates,
        /// visits answer exactly once and rewrites at most `max_retries` times.
        #[test]
        fn prop_walk_is_bounded(
            route in arb_route(),
            grades in proptest::collection::vec(arb_grade(), 0..16),
            max_retries in 0u32..6,
        ) {
            let mut s = state(route, None, 0);
            let mut node = GraphNode::ENTRY;
            let mut grades = grades.into_iter();
            let mut answers = 0;
            let mut fallbacks = 0;
            let mut steps = 0;

            while node != GraphNode::End {
                match node {
                    GraphNode::Rewrite => s.loop_step += 1,
                    GraphNode::Grade => s.grade = Some(grades.next().unwrap_or(Grade::No)),
                    GraphNode::Answer => answers += 1,
                    GraphNode::Fallback => fallbacks += 1,
                    _ => {}
                }
                node = next(node, &s, max_retries);
                steps += 1;
                prop_assert!(steps < 64);
            }

            prop_assert_eq!(answers, 1);
            prop_assert!(fallbacks <= 1);
            prop_assert!(s.loop_step <= max_retries);
        }

        #[test]
        fn prop_fallback_only_after_exhausted_retries(
            loop_step in 0u32..10,
            max_retries in 0u32..10,
        ) {
            let s = state(Some(Route::Hyde), Some(Grade::No), loop_step);
            let target = next(GraphNode::Grade, &s, max_retries);
            if loop_step < max_retries {
                prop_assert_eq!(target, GraphNode::Rewrite);
            } else {
                prop_assert_eq!(target, GraphNode::Fallback);
            }
        }
    }
}
