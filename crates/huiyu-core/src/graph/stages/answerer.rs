//! Persona answer synthesis

use crate::error::{HuiyuError, Result};
use crate::graph::state::{render_history, TurnState, Utterance};
use crate::llm::{ChatMessage, CompletionOptions, LLMClient};
use std::sync::Arc;

const ANSWER_TEMPERATURE: f32 = 0.6;

/// Reply used when the model returns nothing
pub const SILENT_ANSWER: &str = "法师正在入定，未给予言语回应。";

/// Role-play scaffolding some models echo back
const FRAMING_TOKENS: &[&str] = &["Solution:", "Next request."];

const SENTENCE_ENDS: &[char] = &['。', '！', '？'];

/// Produces the persona reply and is the only stage that appends to history
pub struct Answerer {
    client: Arc<dyn LLMClient>,
    char_limit: Option<usize>,
}

impl Answerer {
    pub fn new(client: Arc<dyn LLMClient>, char_limit: Option<usize>) -> Self {
        Self { client, char_limit }
    }

    pub async fn run(&self, state: &mut TurnState) -> Result<()> {
        let answer = self
            .generate(&state.query, &state.retrieved_context, &state.chat_history)
            .await?;

        state
            .chat_history
            .push(Utterance::user(state.query.clone()));
        state.chat_history.push(Utterance::assistant(answer.clone()));
        state.final_answer = Some(answer);
        Ok(())
    }

    /// Answer one question against the given context and history.
    ///
    /// Model failures are logged and surface as [`HuiyuError::AnswerUnavailable`].
    pub async fn generate(
        &self,
        question: &str,
        context: &str,
        history: &[Utterance],
    ) -> Result<String> {
        let messages = vec![
            ChatMessage::system(build_answer_prompt(
                question,
                context,
                &render_history(history, history.len()),
            )),
            ChatMessage::user("请法师慈悲指点迷津。"),
        ];

        let reply = self
            .client
            .chat_completion(messages, &CompletionOptions::new(ANSWER_TEMPERATURE, 512))
            .await
            .map_err(|e| {
                tracing::error!("Answer generation failed: {}", e);
                HuiyuError::AnswerUnavailable
            })?;

        let cleaned = strip_framing(&reply);
        if cleaned.is_empty() {
            return Ok(SILENT_ANSWER.to_string());
        }

        let answer = match self.char_limit {
            Some(limit) => truncate_answer(&cleaned, limit),
            None => cleaned,
        };
        tracing::debug!(chars = answer.chars().count(), "Answer generated");
        Ok(answer)
    }
}

/// Remove echoed role-play tokens and surrounding whitespace
pub fn strip_framing(reply: &str) -> String {
    FRAMING_TOKENS
        .iter()
        .fold(reply.to_string(), |acc, token| acc.replace(token, ""))
        .trim()
        .to_string()
}

/// Cap an answer at `limit` characters, ending on a full sentence when one
/// fits inside the limit
pub fn truncate_answer(answer: &str, limit: usize) -> String {
    let chars: Vec<char> = answer.chars().collect();
    if chars.len() <= limit {
        return answer.to_string();
    }

    let head = &chars[..limit];
    let end = head
        .iter()
        .rposition(|c| SENTENCE_ENDS.contains(c))
        .map(|pos| pos + 1)
        .unwrap_or(limit);
    head[..end].iter().collect()
}

fn build_answer_prompt(question: &str, context: &str, history: &str) -> String {
    format!(
        r#"你是一位得道高僧，法号‘慧语’。面前是一位迷茫的信众。
以下是你们之前的对话记录（作为参考，帮助你理解上下文）：
'''
{}
'''

请你根据心中的经文义理（即以下内容）：
'''{}'''
来回答信众的疑惑：'{}'。

【要求】
1. 语气要慈悲、平和，多用‘阿弥陀佛’、‘施主’等佛家用语。
2. 不要说‘根据提供的段落’，要把它内化为你自己的智慧, 并且简要提炼经文中的关键点（不要大段复制原文）
3. 不要像写论文一样列‘1.2.3.’，要像聊天一样娓娓道来，可以用比喻。
4. 整个回复严格控制在 150字以内
5. 严禁输出 'Solution:' 或 'Next request' 这种机器语言。"#,
        history, context, question
    )
}
