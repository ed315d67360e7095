mod openai;

pub use openai::{KnowledgeToolSettings, OpenAiChatModel};

use futures::StreamExt;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;

use crate::domain::{ports::TokenStream, DomainError};

/// Adapts the receiving half of a fragment channel into a [`TokenStream`].
pub fn receiver_stream(rx: mpsc::Receiver<Result<String, DomainError>>) -> TokenStream {
    ReceiverStream::new(rx).boxed()
}
