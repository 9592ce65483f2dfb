use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::merchant::MerchantId;

pub const VOICE_SOURCE: &str = "voice";

/// Equal to the transport conversation id; doubles as the ingestion idempotency key.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SessionId(pub String);

impl SessionId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// One speaker turn, serialized as `{"agent": "..."}` or `{"user": "..."}`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TranscriptTurn {
    Agent(String),
    User(String),
}

impl TranscriptTurn {
    pub fn text(&self) -> &str {
        match self {
            Self::Agent(text) | Self::User(text) => text,
        }
    }

    pub fn speaker(&self) -> &'static str {
        match self {
            Self::Agent(_) => "agent",
            Self::User(_) => "user",
        }
    }

    pub fn is_user(&self) -> bool {
        matches!(self, Self::User(_))
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub session_id: SessionId,
    pub merchant_id: MerchantId,
    pub agent_id: String,
    pub conversation_id: String,
    pub source: String,
    pub transcript: Vec<TranscriptTurn>,
    pub raw_text: String,
    pub timestamp: DateTime<Utc>,
}

impl Session {
    pub fn from_transcript(
        conversation_id: &str,
        merchant_id: MerchantId,
        agent_id: &str,
        transcript: Vec<TranscriptTurn>,
        timestamp: DateTime<Utc>,
    ) -> Self {
        let raw_text = user_text(&transcript);
        Self {
            session_id: SessionId(conversation_id.to_string()),
            merchant_id,
            agent_id: agent_id.to_string(),
            conversation_id: conversation_id.to_string(),
            source: VOICE_SOURCE.to_string(),
            transcript,
            raw_text,
            timestamp,
        }
    }
}

/// Concatenated user turns, `. `-separated.
pub fn user_text(transcript: &[TranscriptTurn]) -> String {
    transcript
        .iter()
        .filter(|turn| turn.is_user())
        .map(TranscriptTurn::text)
        .collect::<Vec<_>>()
        .join(". ")
}
