//! HyDE query rewriting

use super::ask;
use crate::graph::state::TurnState;
use crate::llm::{CompletionOptions, LLMClient};
use std::sync::Arc;

/// Temperature for hypothetical passages; retries should produce new passages
const HYDE_TEMPERATURE: f32 = 0.8;

/// Generates a hypothetical scripture-style answer used as the retrieval query
pub struct HydeRewriter {
    client: Arc<dyn LLMClient>,
}

impl HydeRewriter {
    pub fn new(client: Arc<dyn LLMClient>) -> Self {
        Self { client }
    }

    /// Always advances `loop_step`, including when the model call fails
    pub async fn run(&self, state: &mut TurnState) {
        state.loop_step += 1;

        let prompt = build_hyde_prompt(&state.query);
        match ask(
            self.client.as_ref(),
            prompt,
            CompletionOptions::new(HYDE_TEMPERATURE, 256),
        )
        .await
        {
            Ok(passage) if !passage.is_empty() => {
                tracing::info!(step = state.loop_step, "HyDE passage generated");
                tracing::debug!("HyDE passage: {}", passage);
                state.standalone_query = Some(passage);
            }
            Ok(_) => {
                tracing::warn!("HyDE returned nothing, using original query");
                state.standalone_query = Some(state.query.clone());
            }
            Err(e) => {
                tracing::warn!("HyDE failed, using original query: {}", e);
                state.standalone_query = Some(state.query.clone());
            }
        }
    }
}

fn build_hyde_prompt(query: &str) -> String {
    format!(
        "请你扮演一位得道高僧。针对以下问题，写一段简短的、充满禅意的回答（100字以内）。\
         这段回答将被用于在经文数据库中进行相似性检索，所以请务必包含核心佛学概念（如因果、无常、般若等）。\
         请直接输出回答内容，不要包含'好的'或'如下'等引语。\n\n信众问题：{}",
        query
    )
}
