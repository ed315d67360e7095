use futures::StreamExt;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{instrument, Instrument};
use uuid::Uuid;

use crate::application::RagService;
use crate::domain::{
    ports::{ChatModel, ChatModelRequest, MemoryStore, TokenStream},
    ChatTurn, DomainError, SearchResult,
};
use crate::infrastructure::config::AppConfig;
use crate::infrastructure::llm::receiver_stream;

const RELAY_BUFFER: usize = 64;

/// One streaming answer. `tokens` yields reply fragments; the reply keeps
/// generating and is saved to memory even if `tokens` is dropped early.
pub struct ChatRun {
    pub session_id: String,
    pub new_session: bool,
    pub context: Vec<SearchResult>,
    pub tokens: TokenStream,
}

impl std::fmt::Debug for ChatRun {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChatRun")
            .field("session_id", &self.session_id)
            .field("new_session", &self.new_session)
            .field("context", &self.context.len())
            .finish_non_exhaustive()
    }
}

/// Question answering over the uploaded documents with per-session memory.
pub struct ChatAgent {
    model: Arc<dyn ChatModel>,
    memory: Arc<dyn MemoryStore>,
    rag: Arc<RagService>,
    system_prompt: String,
    history_limit: usize,
}

impl ChatAgent {
    pub fn new(
        model: Arc<dyn ChatModel>,
        memory: Arc<dyn MemoryStore>,
        rag: Arc<RagService>,
        config: &AppConfig,
    ) -> Self {
        Self {
            model,
            memory,
            rag,
            system_prompt: config.prompts.agent.system.clone(),
            history_limit: config.config.memory.history_limit,
        }
    }

    #[instrument(skip(self, message, session_id))]
    pub async fn run_stream(
        &self,
        message: &str,
        session_id: Option<String>,
    ) -> Result<ChatRun, DomainError> {
        let message = message.trim();
        if message.is_empty() {
            return Err(DomainError::validation("message must not be empty"));
        }

        let session_id = session_id
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| Uuid::new_v4().to_string());

        let new_session = self.memory.ensure_session(&session_id).await?;
        let history = self
            .memory
            .recent_turns(&session_id, self.history_limit)
            .await?;
        let context = self.rag.retrieve(message).await?;

        tracing::info!(
            session_id = %session_id,
            new_session,
            history = history.len(),
            context = context.len(),
            "running agent"
        );

        self.memory
            .append_turn(&session_id, &ChatTurn::user(message))
            .await?;

        let request = ChatModelRequest::new(&self.system_prompt, message)
            .with_history(history)
            .with_context(context.clone());
        let upstream = self.model.stream_reply(request).await?;

        let tokens = relay(upstream, self.memory.clone(), session_id.clone());

        Ok(ChatRun {
            session_id,
            new_session,
            context,
            tokens,
        })
    }
}

/// Drives `upstream` to completion on its own task, forwarding fragments
/// while a receiver is listening, and stores the full reply once the model
/// finishes without error.
fn relay(mut upstream: TokenStream, memory: Arc<dyn MemoryStore>, session_id: String) -> TokenStream {
    let (tx, rx) = mpsc::channel(RELAY_BUFFER);
    let span = tracing::info_span!("relay", session_id = %session_id);

    tokio::spawn(
        async move {
            let mut reply = String::new();
            let mut listening = true;
            let mut failed = false;

            while let Some(item) = upstream.next().await {
                match &item {
                    Ok(fragment) => reply.push_str(fragment),
                    Err(e) => {
                        tracing::error!(error = %e, "agent stream failed");
                        failed = true;
                    }
                }

                if listening && tx.send(item).await.is_err() {
                    tracing::debug!("client went away, finishing reply without a listener");
                    listening = false;
                }

                if failed {
                    break;
                }
            }

            if failed {
                return;
            }

            if let Err(e) = memory
                .append_turn(&session_id, &ChatTurn::assistant(reply.as_str()))
                .await
            {
                tracing::error!(error = %e, "failed to store assistant reply");
            }
            tracing::info!(chars = reply.len(), "reply completed");
        }
        .instrument(span),
    );

    receiver_stream(rx)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{chunk_content, Document, MessageRole};
    use crate::infrastructure::{InMemoryVectorStore, SqliteMemoryStore};
    use crate::test_utils::{test_app_config, KeywordEmbedding, ScriptedChatModel};
    use std::time::Duration;

    struct Harness {
        agent: ChatAgent,
        model: Arc<ScriptedChatModel>,
        memory: Arc<SqliteMemoryStore>,
        rag: Arc<RagService>,
    }

    async fn harness(model: ScriptedChatModel) -> Harness {
        let model = Arc::new(model);
        let memory = Arc::new(SqliteMemoryStore::in_memory().await.unwrap());
        let rag = Arc::new(RagService::new(
            Arc::new(KeywordEmbedding::default()),
            Arc::new(InMemoryVectorStore::new()),
            3,
        ));
        let agent = ChatAgent::new(model.clone(), memory.clone(), rag.clone(), &test_app_config());
        Harness {
            agent,
            model,
            memory,
            rag,
        }
    }

    async fn collect(run: ChatRun) -> Vec<Result<String, DomainError>> {
        run.tokens.collect().await
    }

    async fn wait_for_turns(memory: &SqliteMemoryStore, session: &str, n: usize) -> Vec<ChatTurn> {
        for _ in 0..50 {
            let turns = memory.recent_turns(session, 100).await.unwrap();
            if turns.len() >= n {
                return turns;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        memory.recent_turns(session, 100).await.unwrap()
    }

    #[tokio::test]
    async fn test_new_session_has_no_history() {
        let h = harness(ScriptedChatModel::replying(&["Hel", "lo"])).await;

        let run = h.agent.run_stream("Hi there", None).await.unwrap();
        assert!(run.new_session);
        assert!(!run.session_id.is_empty());

        let fragments: Vec<_> = collect(run).await.into_iter().map(Result::unwrap).collect();
        assert_eq!(fragments, vec!["Hel", "lo"]);

        let requests = h.model.requests();
        assert_eq!(requests.len(), 1);
        assert!(requests[0].history.is_empty());
        assert_eq!(requests[0].render_prompt(), "Hi there");
    }

    #[tokio::test]
    async fn test_same_session_accumulates_history() {
        let h = harness(ScriptedChatModel::replying(&["Noted."])).await;

        let first = h
            .agent
            .run_stream("My name is Ada", Some("session-1".into()))
            .await
            .unwrap();
        assert!(first.new_session);
        collect(first).await;
        wait_for_turns(&h.memory, "session-1", 2).await;

        let second = h
            .agent
            .run_stream("What is my name?", Some("session-1".into()))
            .await
            .unwrap();
        assert!(!second.new_session);
        collect(second).await;

        let requests = h.model.requests();
        let history = &requests[1].history;
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].role, MessageRole::User);
        assert_eq!(history[0].content, "My name is Ada");
        assert_eq!(history[1].role, MessageRole::Assistant);
        assert_eq!(history[1].content, "Noted.");
    }

    #[tokio::test]
    async fn test_retrieves_uploaded_content() {
        let h = harness(ScriptedChatModel::replying(&["Two years."])).await;
        let doc = Document::new("warranty.pdf", "uploads/warranty.pdf");
        let text = "The warranty covers parts and labour for two years.\n\n\
                    Shipping is free for orders above fifty euros.";
        h.rag.index_chunks(&chunk_content(&doc, text, 60)).await.unwrap();

        let run = h
            .agent
            .run_stream("How long does the warranty last?", None)
            .await
            .unwrap();

        assert!(!run.context.is_empty());
        assert!(run.context[0].chunk.content.contains("warranty"));
        collect(run).await;

        let prompt = h.model.requests()[0].render_prompt();
        assert!(prompt.contains("(warranty.pdf) The warranty covers parts"));
    }

    #[tokio::test]
    async fn test_model_error_is_streamed_and_reply_not_stored() {
        let h = harness(ScriptedChatModel::failing_after(&["partial"], "rate limited")).await;

        let run = h.agent.run_stream("Hello", Some("s-err".into())).await.unwrap();
        let items = collect(run).await;

        assert_eq!(items.len(), 2);
        assert_eq!(items[0].as_deref().unwrap(), "partial");
        assert!(items[1].is_err());

        tokio::time::sleep(Duration::from_millis(50)).await;
        let turns = h.memory.recent_turns("s-err", 10).await.unwrap();
        assert_eq!(turns.len(), 1);
        assert_eq!(turns[0].role, MessageRole::User);
    }

    #[tokio::test]
    async fn test_dropped_listener_still_stores_reply() {
        let h = harness(ScriptedChatModel::replying(&["a", "b", "c"])).await;

        let run = h.agent.run_stream("Hello", Some("s-drop".into())).await.unwrap();
        drop(run);

        let turns = wait_for_turns(&h.memory, "s-drop", 2).await;
        assert_eq!(turns.len(), 2);
        assert_eq!(turns[1].content, "abc");
    }

    #[tokio::test]
    async fn test_blank_message_rejected() {
        let h = harness(ScriptedChatModel::replying(&["x"])).await;
        let err = h.agent.run_stream("   ", None).await.unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
        assert!(h.model.requests().is_empty());
    }
}
