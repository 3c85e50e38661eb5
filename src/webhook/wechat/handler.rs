//! # Message router
//!
//! Decides what each decrypted message gets as an answer. Text messages are
//! forwarded to the reply-generation collaborator; every other message type
//! receives the fixed fallback reply. A collaborator fault is logged and
//! degrades to the fallback reply, it never aborts the request.

use super::message::{DecryptedMessage, ReplyEnvelope};
use crate::services;

/// Produces the reply for one inbound message, addressed to its sender
pub async fn route_message(
    msg: &DecryptedMessage,
    bot: &services::ImplReplyGenerator,
) -> ReplyEnvelope {
    let Some(content) = msg.content.as_deref().filter(|_| msg.is_text()) else {
        log::debug!("unhandled message type: {}", msg.msg_type);
        return ReplyEnvelope::fallback_for(msg);
    };

    log::debug!("msg.content: {}", content);

    match bot.bot_reply(content).await {
        Ok(reply) => ReplyEnvelope::for_message(msg, reply),
        Err(e) => {
            log::error!("reply generator failed: {:#}", e);
            ReplyEnvelope::fallback_for(msg)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consts;
    use crate::services::MockReplyGenerator;

    fn text_message(content: &str) -> DecryptedMessage {
        DecryptedMessage {
            to_user: "gh_7f083739789a".into(),
            from_user: "oia2Tjje".into(),
            msg_type: "text".into(),
            content: Some(content.into()),
        }
    }

    #[ntex::test]
    async fn test_text_message_is_answered_by_the_bot() {
        let mut bot = MockReplyGenerator::new();
        bot.expect_bot_reply()
            .withf(|text| text == "hello")
            .once()
            .returning(|_| Ok("hi".to_string()));
        let bot: services::ImplReplyGenerator = Box::new(bot);

        let msg = text_message("hello");
        let reply = route_message(&msg, &bot).await;

        assert_eq!(reply.content, "hi");
        assert_eq!(reply.to_user, msg.from_user);
        assert_eq!(reply.from_user, msg.to_user);
    }

    #[ntex::test]
    async fn test_non_text_message_gets_fallback() {
        let mut bot = MockReplyGenerator::new();
        bot.expect_bot_reply().never();
        let bot: services::ImplReplyGenerator = Box::new(bot);

        let msg = DecryptedMessage {
            msg_type: "image".into(),
            content: None,
            ..text_message("")
        };
        let reply = route_message(&msg, &bot).await;

        assert_eq!(reply.content, consts::FALLBACK_REPLY);
        assert_eq!(reply.to_user, msg.from_user);
    }

    #[ntex::test]
    async fn test_bot_failure_degrades_to_fallback() {
        let mut bot = MockReplyGenerator::new();
        bot.expect_bot_reply()
            .once()
            .returning(|_| Err(anyhow::anyhow!("bot is down")));
        let bot: services::ImplReplyGenerator = Box::new(bot);

        let reply = route_message(&text_message("hello"), &bot).await;

        assert_eq!(reply.content, consts::FALLBACK_REPLY);
    }
}
