//! Turn orchestration over the stage graph

use super::stages::{
    apply_fallback, Answerer, Contextualizer, HydeRewriter, IntentRouter, RelevanceGrader,
};
use super::state::{Route, TurnState, Utterance};
use super::transition::{next, GraphNode};
use crate::config::GraphConfig;
use crate::error::{HuiyuError, Result};
use crate::llm::LLMClient;
use crate::memory::MemoryStore;
use crate::retrieval::Retriever;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// Result of one conversational turn
#[derive(Debug, Clone, Serialize)]
pub struct TurnOutcome {
    pub final_answer: String,
    pub chat_history: Vec<Utterance>,
    pub route: Option<Route>,
    pub loop_step: u32,
    /// Nodes visited, in order
    pub path: Vec<GraphNode>,
}

/// Drives a turn through router, retrieval loop and answerer, and persists
/// the result per thread
pub struct Orchestrator {
    router: IntentRouter,
    contextualizer: Contextualizer,
    rewriter: HydeRewriter,
    grader: RelevanceGrader,
    answerer: Answerer,
    retriever: Arc<dyn Retriever>,
    memory: Arc<dyn MemoryStore>,
    config: GraphConfig,
    thread_locks: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
}

impl Orchestrator {
    pub fn new(
        client: Arc<dyn LLMClient>,
        retriever: Arc<dyn Retriever>,
        memory: Arc<dyn MemoryStore>,
        config: GraphConfig,
    ) -> Self {
        Self {
            router: IntentRouter::new(client.clone(), config.router_history),
            contextualizer: Contextualizer::new(client.clone(), config.contextualize_history),
            rewriter: HydeRewriter::new(client.clone()),
            grader: RelevanceGrader::new(client.clone()),
            answerer: Answerer::new(client, config.answer_char_limit),
            retriever,
            memory,
            config,
            thread_locks: Mutex::new(HashMap::new()),
        }
    }

    pub fn memory(&self) -> &Arc<dyn MemoryStore> {
        &self.memory
    }

    /// Run one turn to completion without touching memory
    pub async fn run_turn(&self, mut state: TurnState) -> Result<(TurnState, Vec<GraphNode>)> {
        let mut node = GraphNode::ENTRY;
        let mut path = Vec::new();

        while node != GraphNode::End {
            tracing::debug!(node = %node, step = state.loop_step, "Entering node");
            path.push(node);

            match node {
                GraphNode::IntentRouter => self.router.run(&mut state).await,
                GraphNode::Contextualize => self.contextualizer.run(&mut state).await,
                GraphNode::Rewrite => self.rewriter.run(&mut state).await,
                GraphNode::Retrieve => self.retrieve(&mut state).await,
                GraphNode::Grade => self.grader.run(&mut state).await,
                GraphNode::Fallback => apply_fallback(&mut state),
                GraphNode::Answer => self.answerer.run(&mut state).await?,
                GraphNode::End => {}
            }

            node = next(node, &state, self.config.max_retries);
        }

        Ok((state, path))
    }

    async fn retrieve(&self, state: &mut TurnState) {
        state.retrieved_context = self.retrieve_context(state.active_query()).await;
    }

    /// Context for `query`. Index failures are not fatal; they yield an
    /// empty context, which the grader rejects.
    pub async fn retrieve_context(&self, query: &str) -> String {
        match self.retriever.retrieve(query).await {
            Ok(context) => context,
            Err(e) => {
                tracing::warn!("Retrieval failed, continuing with empty context: {}", e);
                String::new()
            }
        }
    }

    fn thread_lock(&self, thread_id: &str) -> Result<Arc<tokio::sync::Mutex<()>>> {
        let mut locks = self
            .thread_locks
            .lock()
            .map_err(|_| HuiyuError::Memory("Thread lock table poisoned".to_string()))?;
        Ok(locks
            .entry(thread_id.to_string())
            .or_insert_with(|| Arc::new(tokio::sync::Mutex::new(())))
            .clone())
    }

    /// Drop the thread's entry once no other turn holds or awaits it
    fn release_thread_lock(&self, thread_id: &str, lock: Arc<tokio::sync::Mutex<()>>) {
        if let Ok(mut locks) = self.thread_locks.lock() {
            // One reference in the table, one here
            if Arc::strong_count(&lock) <= 2 {
                locks.remove(thread_id);
            }
        }
    }

    /// Answer `query` within a conversation thread.
    ///
    /// `initial_history` seeds a thread that has no stored record and is
    /// ignored otherwise. Turns on the same thread run one at a time; distinct
    /// threads never share state.
    pub async fn invoke(
        &self,
        thread_id: &str,
        query: &str,
        initial_history: Option<Vec<Utterance>>,
    ) -> Result<TurnOutcome> {
        if thread_id.trim().is_empty() {
            return Err(HuiyuError::InvalidInput("Thread id must not be empty".to_string()));
        }
        if query.trim().is_empty() {
            return Err(HuiyuError::InvalidInput("Query must not be empty".to_string()));
        }

        let lock = self.thread_lock(thread_id)?;
        let result = {
            let _guard = lock.lock().await;
            self.invoke_locked(thread_id, query, initial_history).await
        };
        self.release_thread_lock(thread_id, lock);
        result
    }

    async fn invoke_locked(
        &self,
        thread_id: &str,
        query: &str,
        initial_history: Option<Vec<Utterance>>,
    ) -> Result<TurnOutcome> {
        let history = match self.memory.load(thread_id)? {
            Some(record) => record.snapshot.chat_history,
            None => initial_history.unwrap_or_default(),
        };

        tracing::info!(thread = thread_id, history = history.len(), "Starting turn");

        let (state, path) = self.run_turn(TurnState::new_turn(query, history)).await?;
        self.memory.save(thread_id, &state)?;

        Ok(TurnOutcome {
            final_answer: state.final_answer.unwrap_or_default(),
            chat_history: state.chat_history,
            route: state.route,
            loop_step: state.loop_step,
            path,
        })
    }

    /// Single-shot answer against supplied context, bypassing routing,
    /// retrieval and memory
    pub async fn answer(
        &self,
        question: &str,
        context: &str,
        history: &[Utterance],
    ) -> Result<String> {
        self.answerer.generate(question, context, history).await
    }
}
