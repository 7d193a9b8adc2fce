//! Follow-up question contextualization

use super::{ask, CLASSIFY_TEMPERATURE};
use crate::graph::state::{render_history, TurnState};
use crate::llm::{CompletionOptions, LLMClient};
use crate::text::to_simplified;
use lazy_static::lazy_static;
use regex::Regex;
use std::sync::Arc;

lazy_static! {
    /// A short leading label such as "重写后的句子是：" or "Output:"
    static ref LABEL_PREFIX: Regex = Regex::new(r"^[^:：\n]{1,20}[:：]\s*").unwrap();
}

/// Rewrites an elliptical follow-up into a standalone question
pub struct Contextualizer {
    client: Arc<dyn LLMClient>,
    history_window: usize,
}

impl Contextualizer {
    pub fn new(client: Arc<dyn LLMClient>, history_window: usize) -> Self {
        Self {
            client,
            history_window,
        }
    }

    pub async fn run(&self, state: &mut TurnState) {
        let history = if state.chat_history.is_empty() {
            "无".to_string()
        } else {
            render_history(&state.chat_history, self.history_window)
        };
        let prompt = build_contextualize_prompt(&to_simplified(&state.query), &history);

        let standalone = match ask(
            self.client.as_ref(),
            prompt,
            CompletionOptions::new(CLASSIFY_TEMPERATURE, 128),
        )
        .await
        {
            Ok(reply) => {
                let cleaned = clean_rewrite(&reply);
                if cleaned.is_empty() {
                    state.query.clone()
                } else {
                    cleaned
                }
            }
            Err(e) => {
                tracing::warn!("Contextualize failed, keeping original query: {}", e);
                state.query.clone()
            }
        };

        tracing::info!(query = %state.query, standalone = %standalone, "Contextualized");
        state.standalone_query = Some(standalone);
    }
}

/// Strip a leading label and wrapping quotes from a rewritten sentence
pub fn clean_rewrite(reply: &str) -> String {
    let trimmed = reply.trim();
    let unlabeled = LABEL_PREFIX.replace(trimmed, "");
    unlabeled
        .trim()
        .trim_matches(|c: char| matches!(c, '\'' | '"' | '‘' | '’' | '“' | '”' | '「' | '」'))
        .trim()
        .to_string()
}

fn build_contextualize_prompt(query: &str, history: &str) -> String {
    format!(
        r#"你是一个专业的语言助手。你的唯一任务是根据【对话历史】，将用户的【最新问题】重写为一个独立、完整的问句。

--- 对话历史 ---
{}

--- 用户最新问题 ---
{}

--- 严格约束 (必须遵守) ---
1. 核心任务：消解指代词（把'它'、'那'替换为具体名词），补全省略的主语。
2. ❌ 严禁回答问题：不要输出任何答案。
3. ❌ 严禁发挥想象：不要添加任何原本不存在的形容词、成语、佛学术语（如'明镜'、'菩提'等）。
4. ✅ 保持原意：只做语法层面的修正，不要改变用户的情感色彩。

--- 示例 ---
例1：
历史：'我很焦虑。'
用户：'怎么做？'
输出：'如何克服焦虑？'

例2：
历史：'什么是缘起性空？'
用户：'它和唯识有什么区别？'
输出：'缘起性空和唯识有什么区别？'

请直接输出重写后的句子："#,
        history, query
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_rewrite_strips_label() {
        assert_eq!(clean_rewrite("重写后的句子是：如何克服焦虑？"), "如何克服焦虑？");
        assert_eq!(clean_rewrite("输出: '如何克服焦虑？'"), "如何克服焦虑？");
        assert_eq!(clean_rewrite("“缘起性空和唯识有什么区别？”"), "缘起性空和唯识有什么区别？");
    }

    #[test]
    fn test_clean_rewrite_keeps_plain_sentence() {
        assert_eq!(clean_rewrite("  如何克服焦虑？ \n"), "如何克服焦虑？");
    }

    #[test]
    fn test_prompt_has_examples_and_constraints() {
        let prompt = build_contextualize_prompt("怎么做？", "信众: 我很焦虑");
        assert!(prompt.contains("严禁回答问题"));
        assert!(prompt.contains("如何克服焦虑"));
        assert!(prompt.contains("信众: 我很焦虑"));
    }
}
