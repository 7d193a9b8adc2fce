//! Per-turn working state shared by the graph stages

use serde::{Deserialize, Serialize};
use std::fmt;

/// Routing decision made by the intent router
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Route {
    /// Follow-up that must be rewritten into a standalone question
    Contextualize,
    /// Self-contained question answered from retrieved scripture
    Hyde,
    /// Small talk answered without retrieval
    Direct,
}

impl Route {
    /// Parse free-form model output. "contextualize" wins over "hyde"; anything
    /// else is treated as small talk.
    pub fn from_model_output(output: &str) -> Self {
        let lower = output.to_lowercase();
        if lower.contains("contextualize") {
            Route::Contextualize
        } else if lower.contains("hyde") {
            Route::Hyde
        } else {
            Route::Direct
        }
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Route::Contextualize => write!(f, "contextualize"),
            Route::Hyde => write!(f, "hyde"),
            Route::Direct => write!(f, "direct"),
        }
    }
}

/// Relevance verdict on retrieved context
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Grade {
    Yes,
    No,
}

impl Grade {
    pub fn from_model_output(output: &str) -> Self {
        if output.to_lowercase().contains("yes") {
            Grade::Yes
        } else {
            Grade::No
        }
    }
}

/// Speaker of an utterance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    /// Label used when history is rendered into prompts
    pub fn label(&self) -> &'static str {
        match self {
            Role::User => "信众",
            Role::Assistant => "法师",
        }
    }
}

/// One entry of the conversation history
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Utterance {
    pub role: Role,
    pub content: String,
}

impl Utterance {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

impl fmt::Display for Utterance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.role.label(), self.content)
    }
}

/// Render the last `n` utterances, one per line
pub fn render_history(history: &[Utterance], n: usize) -> String {
    let start = history.len().saturating_sub(n);
    history[start..]
        .iter()
        .map(|u| u.to_string())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Working record for one user turn
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TurnState {
    /// The user's raw input for this turn
    pub query: String,
    /// Rewritten query used for retrieval, if any stage produced one
    #[serde(default)]
    pub standalone_query: Option<String>,
    #[serde(default)]
    pub route: Option<Route>,
    #[serde(default)]
    pub retrieved_context: String,
    #[serde(default)]
    pub grade: Option<Grade>,
    /// Number of HyDE rewrites performed this turn
    #[serde(default)]
    pub loop_step: u32,
    #[serde(default)]
    pub final_answer: Option<String>,
    /// Full history, oldest first; carried across turns
    #[serde(default)]
    pub chat_history: Vec<Utterance>,
}

impl TurnState {
    /// Fresh turn with per-turn fields cleared and history carried over
    pub fn new_turn(query: impl Into<String>, chat_history: Vec<Utterance>) -> Self {
        Self {
            query: query.into(),
            chat_history,
            ..Default::default()
        }
    }

    /// Query the retriever should use
    pub fn active_query(&self) -> &str {
        self.standalone_query.as_deref().unwrap_or(&self.query)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_route_parsing() {
        assert_eq!(Route::from_model_output("contextualize"), Route::Contextualize);
        assert_eq!(Route::from_model_output("  HyDE\n"), Route::Hyde);
        assert_eq!(
            Route::from_model_output("hyde or contextualize?"),
            Route::Contextualize
        );
        assert_eq!(Route::from_model_output("direct"), Route::Direct);
        assert_eq!(Route::from_model_output("不知道"), Route::Direct);
    }

    #[test]
    fn test_grade_parsing() {
        assert_eq!(Grade::from_model_output("Yes."), Grade::Yes);
        assert_eq!(Grade::from_model_output("no"), Grade::No);
        assert_eq!(Grade::from_model_output("相关"), Grade::No);
    }

    #[test]
    fn test_render_history() {
        let history = vec![
            Utterance::user("什么是四谛？"),
            Utterance::assistant("苦集灭道。"),
            Utterance::user("第一个呢？"),
        ];
        assert_eq!(render_history(&history, 2), "法师: 苦集灭道。\n信众: 第一个呢？");
        assert_eq!(render_history(&history, 10).lines().count(), 3);
        assert_eq!(render_history(&[], 2), "");
    }

    #[test]
    fn test_new_turn_clears_per_turn_fields() {
        let history = vec![Utterance::user("a"), Utterance::assistant("b")];
        let state = TurnState::new_turn("c", history.clone());
        assert_eq!(state.chat_history, history);
        assert_eq!(state.loop_step, 0);
        assert!(state.route.is_none());
        assert!(state.retrieved_context.is_empty());
        assert_eq!(state.active_query(), "c");
    }

    #[test]
    fn test_snapshot_json_shape() {
        let mut state = TurnState::new_turn("q", vec![Utterance::user("q")]);
        state.route = Some(Route::Hyde);
        let json = serde_json::to_value(&state).unwrap();
        assert_eq!(json["route"], "hyde");
        assert_eq!(json["chat_history"][0]["role"], "user");

        let back: TurnState = serde_json::from_value(json).unwrap();
        assert_eq!(back, state);
    }
}
