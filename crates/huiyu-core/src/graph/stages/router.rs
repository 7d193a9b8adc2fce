//! Intent routing

use super::{ask, CLASSIFY_TEMPERATURE};
use crate::graph::state::{render_history, Route, TurnState};
use crate::llm::{CompletionOptions, LLMClient};
use std::sync::Arc;

/// Picks contextualize, hyde or direct for the current query
pub struct IntentRouter {
    client: Arc<dyn LLMClient>,
    history_window: usize,
}

impl IntentRouter {
    pub fn new(client: Arc<dyn LLMClient>, history_window: usize) -> Self {
        Self {
            client,
            history_window,
        }
    }

    pub async fn run(&self, state: &mut TurnState) {
        let route = self.classify(state).await;
        tracing::info!(route = %route, "Intent routed");
        state.route = Some(route);
    }

    async fn classify(&self, state: &TurnState) -> Route {
        // A first turn has nothing to resolve against
        if state.chat_history.is_empty() {
            return Route::Hyde;
        }

        let prompt = build_router_prompt(
            &state.query,
            &render_history(&state.chat_history, self.history_window),
        );

        match ask(
            self.client.as_ref(),
            prompt,
            CompletionOptions::new(CLASSIFY_TEMPERATURE, 16),
        )
        .await
        {
            Ok(reply) => Route::from_model_output(&reply),
            Err(e) => {
                tracing::warn!("Router call failed, answering directly: {}", e);
                Route::Direct
            }
        }
    }
}

fn build_router_prompt(query: &str, history: &str) -> String {
    format!(
        r#"之前的对话历史：
{}

用户当前输入：'{}'

请分析用户输入的意图，并严格从以下三个选项中选择一个返回：
1. 'contextualize': 用户在追问之前的话题，包含代词（如'它'、'那个'）或省略主语（如'怎么做'），需要结合上下文补全。
2. 'hyde': 用户开启了一个新的佛学话题，且问题比较抽象，需要生成假设性文档来辅助检索。
3. 'direct': 只是简单的闲聊（如'谢谢'、'你好'），或者是极其精准的搜索词，不需要任何处理。
【只输出选项单词，不要解释】"#,
        history, query
    )
}
