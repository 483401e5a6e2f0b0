//! Assistant chat transcript

use crate::api::SoarApi;
use crate::error::ConsoleResult;
use crate::models::{ChatMessage, ChatRequest, ChatRole};
use chrono::Utc;

/// Appended to the reply when the stream breaks
pub const CONNECTION_FAILED_MARKER: &str = "\n[Connection Failed]";

/// Conversation with the assistant, kept in display order
#[derive(Debug, Clone, Default)]
pub struct ChatTranscript {
    session_id: Option<i64>,
    messages: Vec<ChatMessage>,
}

impl ChatTranscript {
    pub fn new() -> Self {
        Self::default()
    }

    /// Continue an existing server-side session
    pub fn with_session(session_id: i64) -> Self {
        Self {
            session_id: Some(session_id),
            messages: Vec::new(),
        }
    }

    pub fn session_id(&self) -> Option<i64> {
        self.session_id
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn last_reply(&self) -> Option<&str> {
        self.messages
            .iter()
            .rev()
            .find(|m| m.role == ChatRole::Ai)
            .map(|m| m.content.as_str())
    }

    pub fn clear(&mut self) {
        self.session_id = None;
        self.messages.clear();
    }

    pub async fn send(&mut self, api: &dyn SoarApi, query: &str) -> ConsoleResult<()> {
        self.send_with(api, query, |_| {}).await
    }

    /// Send a query and stream the reply into the transcript.
    ///
    /// `on_text` sees every decoded fragment as it arrives. A failed stream
    /// keeps the partial reply, ends it with [`CONNECTION_FAILED_MARKER`] and
    /// returns the error.
    pub async fn send_with<F>(&mut self, api: &dyn SoarApi, query: &str, mut on_text: F) -> ConsoleResult<()>
    where
        F: FnMut(&str),
    {
        let query = query.trim();
        if query.is_empty() {
            return Ok(());
        }

        self.push(ChatRole::User, query.to_string());
        self.push(ChatRole::Ai, String::new());

        let request = ChatRequest {
            query: query.to_string(),
            session_id: self.session_id,
        };
        let result = self.stream_reply(api, &request, &mut on_text).await;
        if let Err(err) = &result {
            tracing::warn!(session = ?self.session_id, "chat stream failed: {}", err);
            self.append(CONNECTION_FAILED_MARKER);
            on_text(CONNECTION_FAILED_MARKER);
        }
        result
    }

    async fn stream_reply<F>(&mut self, api: &dyn SoarApi, request: &ChatRequest, on_text: &mut F) -> ConsoleResult<()>
    where
        F: FnMut(&str),
    {
        let mut stream = api.open_chat(request).await?;
        if let Some(id) = stream.session_id {
            self.session_id = Some(id);
        }

        let mut decoder = Utf8Accumulator::default();
        let outcome = loop {
            match stream.chunks.next_chunk().await {
                Ok(Some(chunk)) => {
                    let text = decoder.push(&chunk);
                    if !text.is_empty() {
                        self.append(&text);
                        on_text(&text);
                    }
                }
                Ok(None) => break Ok(()),
                Err(err) => break Err(err),
            }
        };

        let rest = decoder.finish();
        if !rest.is_empty() {
            self.append(&rest);
            on_text(&rest);
        }
        outcome
    }

    fn push(&mut self, role: ChatRole, content: String) {
        self.messages.push(ChatMessage {
            role,
            content,
            timestamp: Utc::now(),
        });
    }

    fn append(&mut self, text: &str) {
        if let Some(last) = self.messages.last_mut() {
            last.content.push_str(text);
        }
    }
}

/// Decodes UTF-8 across chunk boundaries
#[derive(Debug, Default)]
struct Utf8Accumulator {
    pending: Vec<u8>,
}

impl Utf8Accumulator {
    fn push(&mut self, chunk: &[u8]) -> String {
        self.pending.extend_from_slice(chunk);
        let mut out = String::new();
        loop {
            match std::str::from_utf8(&self.pending) {
                Ok(text) => {
                    out.push_str(text);
                    self.pending.clear();
                    return out;
                }
                Err(err) => {
                    let valid = err.valid_up_to();
                    out.push_str(&String::from_utf8_lossy(&self.pending[..valid]));
                    match err.error_len() {
                        Some(len) => {
                            out.push(char::REPLACEMENT_CHARACTER);
                            self.pending.drain(..valid + len);
                        }
                        // incomplete sequence, wait for the next chunk
                        None => {
                            self.pending.drain(..valid);
                            return out;
                        }
                    }
                }
            }
        }
    }

    fn finish(&mut self) -> String {
        let rest = String::from_utf8_lossy(&self.pending).into_owned();
        self.pending.clear();
        rest
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ConsoleError;
    use crate::testing::FakeApi;

    #[tokio::test]
    async fn test_reply_is_streamed_into_last_message() {
        let api = FakeApi::new();
        *api.chat_chunks.lock() = vec![Ok(b"Blocked ".to_vec()), Ok(b"3 hosts.".to_vec())];

        let mut transcript = ChatTranscript::new();
        let mut seen = Vec::new();
        transcript
            .send_with(&api, "  what happened?  ", |t| seen.push(t.to_string()))
            .await
            .unwrap();

        let messages = transcript.messages();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].role, ChatRole::User);
        assert_eq!(messages[0].content, "what happened?");
        assert_eq!(transcript.last_reply(), Some("Blocked 3 hosts."));
        assert_eq!(seen, vec!["Blocked ", "3 hosts."]);
        assert_eq!(transcript.session_id(), Some(3));
    }

    #[tokio::test]
    async fn test_broken_stream_keeps_partial_reply() {
        let api = FakeApi::new();
        *api.chat_chunks.lock() = vec![
            Ok(b"Partial".to_vec()),
            Err(ConsoleError::Network("connection reset".into())),
        ];

        let mut transcript = ChatTranscript::new();
        let err = transcript.send(&api, "status").await.unwrap_err();
        assert!(matches!(err, ConsoleError::Network(_)));
        assert_eq!(transcript.last_reply(), Some("Partial\n[Connection Failed]"));
    }

    #[tokio::test]
    async fn test_blank_query_is_ignored() {
        let api = FakeApi::new();
        let mut transcript = ChatTranscript::new();
        transcript.send(&api, "   ").await.unwrap();
        assert!(transcript.messages().is_empty());
        assert_eq!(api.calls("open_chat"), 0);
    }

    #[test]
    fn test_multibyte_split_across_chunks() {
        let bytes = "naïve → ok".as_bytes();
        let mut decoder = Utf8Accumulator::default();
        let mut out = String::new();
        for chunk in bytes.chunks(3) {
            out.push_str(&decoder.push(chunk));
        }
        out.push_str(&decoder.finish());
        assert_eq!(out, "naïve → ok");
    }

    #[test]
    fn test_invalid_bytes_are_replaced() {
        let mut decoder = Utf8Accumulator::default();
        assert_eq!(decoder.push(b"a\xffb"), "a\u{FFFD}b");
    }
}
