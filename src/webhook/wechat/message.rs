//! Typed view of the decrypted message XML and the reply it produces
//!
//! The platform's message bodies are a fixed, flat XML vocabulary
//! (`ToUserName`, `FromUserName`, `MsgType`, `Content`, ...), usually with
//! CDATA-wrapped values. The scanner below covers exactly that shape.

use derive_more::{Display, Error};

use crate::consts;

#[derive(Debug, Display, Error)]
#[display("message XML is missing the {field} element")]
pub struct MalformedMessage {
    pub field: &'static str,
}

/// One inbound message, as decrypted by the envelope codec.
/// Consumed once by the router; never persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct DecryptedMessage {
    /// Account the message was sent to (`ToUserName`)
    pub to_user: String,
    /// Platform open id of the sender (`FromUserName`)
    pub from_user: String,
    /// Message type discriminator (`MsgType`: "text", "image", ...)
    pub msg_type: String,
    /// Text body, present iff `msg_type` is "text"
    pub content: Option<String>,
}

impl DecryptedMessage {
    pub fn parse(xml: &str) -> Result<Self, MalformedMessage> {
        Ok(Self {
            to_user: extract_tag(xml, "ToUserName")
                .ok_or(MalformedMessage { field: "ToUserName" })?,
            from_user: extract_tag(xml, "FromUserName")
                .ok_or(MalformedMessage { field: "FromUserName" })?,
            msg_type: extract_tag(xml, "MsgType").ok_or(MalformedMessage { field: "MsgType" })?,
            content: extract_tag(xml, "Content"),
        })
    }

    pub fn is_text(&self) -> bool {
        self.msg_type == "text"
    }
}

/// Reply payload plus addressing, always directed back at the sender of the
/// message that produced it.
#[derive(Debug, Clone, PartialEq)]
pub struct ReplyEnvelope {
    pub to_user: String,
    pub from_user: String,
    pub content: String,
}

impl ReplyEnvelope {
    /// Builds a text reply addressed back to the sender of `msg`
    pub fn for_message(msg: &DecryptedMessage, content: String) -> Self {
        Self {
            to_user: msg.from_user.clone(),
            from_user: msg.to_user.clone(),
            content,
        }
    }

    /// Fixed reply for message types the router does not handle
    pub fn fallback_for(msg: &DecryptedMessage) -> Self {
        Self::for_message(msg, consts::FALLBACK_REPLY.to_string())
    }

    /// Renders the plaintext reply XML the codec encrypts
    pub fn render(&self) -> String {
        format!(
            "<xml>\
             <ToUserName><![CDATA[{to}]]></ToUserName>\
             <FromUserName><![CDATA[{from}]]></FromUserName>\
             <CreateTime>{created}</CreateTime>\
             <MsgType><![CDATA[text]]></MsgType>\
             <Content><![CDATA[{content}]]></Content>\
             </xml>",
            to = self.to_user,
            from = self.from_user,
            created = chrono::Utc::now().timestamp(),
            content = self.content,
        )
    }
}

/// Extracts the text value of `<tag>` from a flat vendor XML document,
/// unwrapping one CDATA section when present. Returns `None` when the
/// element is absent.
pub fn extract_tag(xml: &str, tag: &str) -> Option<String> {
    let open = format!("<{}>", tag);
    let close = format!("</{}>", tag);

    let start = xml.find(&open)? + open.len();
    let end = xml[start..].find(&close)? + start;
    let value = &xml[start..end];

    let value = value
        .strip_prefix("<![CDATA[")
        .and_then(|rest| rest.strip_suffix("]]>"))
        .unwrap_or(value);

    Some(value.to_string())
}
