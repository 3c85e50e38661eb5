pub mod chatbot;

use async_trait::async_trait;

/// Collaborator producing the reply text for a visitor message.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ReplyGenerator {
    async fn bot_reply(&self, text: &str) -> anyhow::Result<String>;
}

pub type ImplReplyGenerator = Box<dyn ReplyGenerator>;
