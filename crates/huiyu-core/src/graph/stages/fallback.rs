//! Decline path once retrieval retries are exhausted

use crate::graph::state::{Grade, TurnState};

/// Instruction handed to the answerer in place of scripture context
pub const FALLBACK_CONTEXT: &str = "【系统提示】：经过仔细检索，经文数据库中完全没有找到与用户问题相关的内容。\
请你无视之前的指令，直接用慈悲、遗憾的语气告知用户：\
贫僧才疏学浅，在现有的经律论中未曾读到与此相关的记载，无法强行解答。\
请不要编造内容，直接实话实说。";

pub fn apply_fallback(state: &mut TurnState) {
    tracing::info!(step = state.loop_step, "Retries exhausted, declining");
    state.retrieved_context = FALLBACK_CONTEXT.to_string();
    state.grade = Some(Grade::No);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fallback_replaces_context() {
        let mut state = TurnState::new_turn("q", vec![]);
        state.retrieved_context = "irrelevant".to_string();
        state.grade = Some(Grade::Yes);

        apply_fallback(&mut state);
        assert_eq!(state.retrieved_context, FALLBACK_CONTEXT);
        assert_eq!(state.grade, Some(Grade::No));
        assert!(FALLBACK_CONTEXT.ends_with("请不要编造内容，直接实话实说。"));
    }
}
