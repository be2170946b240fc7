use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Where the conversational step sits relative to summarization.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChatMode {
    /// Summarize only.
    #[default]
    None,
    /// Summarize, then chat over the summary.
    SumFirst,
    /// Chat over the extracted text, no summary.
    ChatOnly,
    /// Chat over the extracted text, then summarize.
    ChatFirst,
}

impl ChatMode {
    pub const ALL: [ChatMode; 4] = [
        ChatMode::None,
        ChatMode::SumFirst,
        ChatMode::ChatOnly,
        ChatMode::ChatFirst,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ChatMode::None => "none",
            ChatMode::SumFirst => "sum_first",
            ChatMode::ChatOnly => "chat_only",
            ChatMode::ChatFirst => "chat_first",
        }
    }
}

impl fmt::Display for ChatMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ChatMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "" | "none" => Ok(ChatMode::None),
            "sum_first" | "sum-first" => Ok(ChatMode::SumFirst),
            "chat_only" | "chat-only" => Ok(ChatMode::ChatOnly),
            "chat_first" | "chat-first" => Ok(ChatMode::ChatFirst),
            other => Err(format!(
                "unknown chat mode '{}' (expected sum_first, chat_only or chat_first)",
                other
            )),
        }
    }
}

/// Per-request switches that shape the chain topology.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainOptions {
    pub anonymize: bool,
    pub chat: ChatMode,
    /// Explicit step sequence replacing base and augmentation steps.
    pub custom: Option<Vec<String>>,
    /// Prompt template used by `prompt-build`.
    pub prompt_name: Option<String>,
}

impl ChainOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn anonymize(mut self, anonymize: bool) -> Self {
        self.anonymize = anonymize;
        self
    }

    pub fn chat(mut self, chat: ChatMode) -> Self {
        self.chat = chat;
        self
    }

    pub fn custom<I, S>(mut self, steps: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.custom = Some(steps.into_iter().map(Into::into).collect());
        self
    }

    pub fn prompt(mut self, prompt_name: impl Into<String>) -> Self {
        self.prompt_name = Some(prompt_name.into());
        self
    }
}
