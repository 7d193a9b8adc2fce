//! Relevance grading of retrieved context

use super::{ask, CLASSIFY_TEMPERATURE};
use crate::graph::state::{Grade, TurnState};
use crate::llm::{CompletionOptions, LLMClient};
use std::sync::Arc;

/// Judges whether retrieved context can support an answer
pub struct RelevanceGrader {
    client: Arc<dyn LLMClient>,
}

impl RelevanceGrader {
    pub fn new(client: Arc<dyn LLMClient>) -> Self {
        Self { client }
    }

    pub async fn run(&self, state: &mut TurnState) {
        let grade = self.grade(&state.query, &state.retrieved_context).await;
        tracing::info!(grade = ?grade, step = state.loop_step, "Context graded");
        state.grade = Some(grade);
    }

    /// Empty context is never relevant; any failure counts as not relevant
    async fn grade(&self, query: &str, context: &str) -> Grade {
        if context.trim().is_empty() {
            return Grade::No;
        }

        match ask(
            self.client.as_ref(),
            build_grader_prompt(query, context),
            CompletionOptions::new(CLASSIFY_TEMPERATURE, 8),
        )
        .await
        {
            Ok(reply) => Grade::from_model_output(&reply),
            Err(e) => {
                tracing::warn!("Grader call failed, treating context as irrelevant: {}", e);
                Grade::No
            }
        }
    }
}

fn build_grader_prompt(query: &str, context: &str) -> String {
    format!(
        r#"你是一名严格的阅卷员。你需要评估检索到的【经文片段】是否能够回答【用户问题】。
用户问题: {}

检索到的经文片段: {}

请判断：经文内容是否与问题存在语义关联，或者能否为回答提供事实依据？
【严格要求】
1. 仅输出 'yes' 或 'no'。
2. 不要包含任何解释、标点符号或其他文字。"#,
        query, context
    )
}
