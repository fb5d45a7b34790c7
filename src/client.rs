//! HTTP client for the voice-agent server.
//!
//! Handles the chat upload (multipart WAV recording) and builds playback URLs
//! for synthesized replies. One client is constructed per run and owns the
//! session identifier for the conversation.

use serde::Deserialize;
use std::time::Duration;

use crate::session::SessionId;

/// Raw response envelope from the agent's chat endpoint.
///
/// A response either carries a structured `error` or the full reply. Fields
/// are optional on the wire so that both shapes parse; [`ChatResponse::into_reply`]
/// enforces the shape the client accepts.
#[derive(Debug, Deserialize)]
pub struct ChatResponse {
    /// Server-side failure description, present instead of the reply fields
    pub error: Option<String>,
    /// What the user said, as transcribed by the server
    pub transcript: Option<String>,
    /// The assistant's text reply
    pub assistant_text: Option<String>,
    /// Identifier of the synthesized reply audio, served under /files/
    pub audio_file: Option<String>,
}

/// A validated reply from the agent server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentReply {
    pub transcript: String,
    pub assistant_text: String,
    pub audio_file: String,
}

impl ChatResponse {
    /// Validates the response envelope into an [`AgentReply`].
    ///
    /// # Errors
    /// - If the server reported a structured `error`
    /// - If any of the reply fields is missing (malformed response)
    pub fn into_reply(self) -> anyhow::Result<AgentReply> {
        if let Some(error) = self.error {
            return Err(anyhow::anyhow!("Agent error: {error}"));
        }

        match (self.transcript, self.assistant_text, self.audio_file) {
            (Some(transcript), Some(assistant_text), Some(audio_file)) => Ok(AgentReply {
                transcript,
                assistant_text,
                audio_file,
            }),
            _ => Err(anyhow::anyhow!(
                "Malformed agent response: missing transcript, assistant_text, or audio_file"
            )),
        }
    }
}

/// Client for one conversation with the agent server.
#[derive(Clone)]
pub struct AgentClient {
    http: reqwest::Client,
    base_url: String,
    session_id: SessionId,
}

impl AgentClient {
    /// Creates a client for a new conversation.
    ///
    /// The base URL is normalized to have no trailing slash so that built
    /// URLs are stable regardless of how the config was written.
    ///
    /// # Errors
    /// - If the HTTP client cannot be constructed
    pub fn new(base_url: &str, request_timeout_secs: u64) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(request_timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| anyhow::anyhow!("Failed to create HTTP client: {e}"))?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            session_id: SessionId::generate(),
        })
    }

    /// Returns the session identifier for this conversation.
    pub fn session_id(&self) -> &SessionId {
        &self.session_id
    }

    /// URL of the chat endpoint for this session.
    pub fn chat_url(&self) -> String {
        format!("{}/agent/chat/{}", self.base_url, self.session_id)
    }

    /// URL of a synthesized reply audio file served by the agent.
    pub fn files_url(&self, audio_file: &str) -> String {
        format!(
            "{}/files/{}",
            self.base_url,
            urlencoding::encode(audio_file)
        )
    }

    /// Uploads a recorded WAV payload and returns the validated agent reply.
    ///
    /// The payload is sent as a multipart form with a single `file` field
    /// named `recording.wav`.
    ///
    /// # Errors
    /// - If the request fails due to network issues (connection, timeout)
    /// - If the server returns a non-success status
    /// - If the response body cannot be parsed or is malformed
    /// - If the server reports a structured `error`
    pub async fn send_recording(&self, wav_payload: Vec<u8>) -> anyhow::Result<AgentReply> {
        let url = self.chat_url();
        let payload_len = wav_payload.len();

        let file_part = reqwest::multipart::Part::bytes(wav_payload)
            .file_name("recording.wav")
            .mime_str("audio/wav")
            .map_err(|e| anyhow::anyhow!("Failed to create file part for upload: {e}"))?;

        let form = reqwest::multipart::Form::new().part("file", file_part);

        tracing::debug!("Uploading {payload_len} bytes to {url}");

        let response = match self.http.post(&url).multipart(form).send().await {
            Ok(resp) => resp,
            Err(e) => {
                let error_msg = if e.is_connect() {
                    format!(
                        "Failed to connect to agent server at {}. Is it running?",
                        self.base_url
                    )
                } else if e.is_timeout() {
                    "Request to the agent server timed out. The server is not responding."
                        .to_string()
                } else {
                    format!("Agent server network error: {e}")
                };
                return Err(anyhow::anyhow!(error_msg));
            }
        };

        if !response.status().is_success() {
            let status = response.status();
            let error_body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(anyhow::anyhow!(format_error(status.as_u16(), &error_body)));
        }

        let chat_response: ChatResponse = response
            .json()
            .await
            .map_err(|e| anyhow::anyhow!("Failed to parse agent response: {e}"))?;

        let reply = chat_response.into_reply()?;

        tracing::debug!(
            "Agent replied: transcript {} chars, assistant {} chars, audio '{}'",
            reply.transcript.len(),
            reply.assistant_text.len(),
            reply.audio_file
        );

        Ok(reply)
    }
}

/// Formats HTTP error codes into human-readable messages.
fn format_error(status: u16, error_body: &str) -> String {
    match status {
        404 => "Agent server returned 404. Check that the base URL points at a parley-compatible server.".to_string(),
        413 => "The recording was too large for the agent server to accept.".to_string(),
        500 | 502 | 503 | 504 => "The agent server is experiencing issues. Please try again later.".to_string(),
        _ => format!("Agent server error (status {status}): {error_body}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(base: &str) -> AgentClient {
        AgentClient::new(base, 60).unwrap()
    }

    #[test]
    fn test_chat_url_contains_session_id() {
        let client = client("http://localhost:8000");
        let url = client.chat_url();
        assert!(url.starts_with("http://localhost:8000/agent/chat/"));
        assert!(url.ends_with(client.session_id().as_str()));
    }

    #[test]
    fn test_files_url() {
        let client = client("http://localhost:8000");
        assert_eq!(
            client.files_url("a1.wav"),
            "http://localhost:8000/files/a1.wav"
        );
    }

    #[test]
    fn test_files_url_encodes_path_segment() {
        let client = client("http://localhost:8000");
        assert_eq!(
            client.files_url("chat one.mp3"),
            "http://localhost:8000/files/chat%20one.mp3"
        );
    }

    #[test]
    fn test_trailing_slash_is_normalized() {
        let client = client("http://localhost:8000/");
        assert_eq!(
            client.files_url("a1.wav"),
            "http://localhost:8000/files/a1.wav"
        );
    }

    #[test]
    fn test_full_response_parses_into_reply() {
        let response: ChatResponse = serde_json::from_str(
            r#"{"transcript": "hello", "assistant_text": "hi there", "audio_file": "a1.wav"}"#,
        )
        .unwrap();
        let reply = response.into_reply().unwrap();
        assert_eq!(reply.transcript, "hello");
        assert_eq!(reply.assistant_text, "hi there");
        assert_eq!(reply.audio_file, "a1.wav");
    }

    #[test]
    fn test_error_field_wins() {
        let response: ChatResponse = serde_json::from_str(
            r#"{"error": "no audio detected", "transcript": "hello"}"#,
        )
        .unwrap();
        let err = response.into_reply().unwrap_err();
        assert!(err.to_string().contains("no audio detected"));
    }

    #[test]
    fn test_missing_field_is_malformed() {
        let response: ChatResponse =
            serde_json::from_str(r#"{"transcript": "hello", "assistant_text": "hi"}"#).unwrap();
        let err = response.into_reply().unwrap_err();
        assert!(err.to_string().contains("Malformed"));
    }
}
