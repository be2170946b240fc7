//! Symbolic names of the built-in steps.

pub const LOCAL_READ: &str = "local-read";
pub const PDF_EXTRACT: &str = "pdf-extract";
pub const WORD_EXTRACT: &str = "word-extract";
pub const SLIDES_EXTRACT: &str = "slides-extract";
pub const SPREADSHEET_READ: &str = "spreadsheet-read";
pub const HTTP_FETCH: &str = "http-fetch";
pub const HTML_CLEAN: &str = "html-clean";
pub const WIKI_READ: &str = "wiki-read";
pub const OBJECT_READ: &str = "object-read";
pub const ARCHIVE_UPLOAD: &str = "archive-upload";
pub const VIDEO_FETCH: &str = "video-fetch";
pub const AUDIO_EXTRACT: &str = "audio-extract";
pub const TRANSCRIBE: &str = "transcribe";
pub const OCR: &str = "ocr";
pub const PERSIST_LOCAL: &str = "persist-local";
pub const PII_DETECT: &str = "pii-detect";
pub const PII_TOKENIZE: &str = "pii-tokenize";
pub const PII_DETOKENIZE: &str = "pii-detokenize";
pub const PROMPT_BUILD: &str = "prompt-build";
pub const SUMMARIZE: &str = "summarize";
pub const CHAT: &str = "chat";
pub const CLIPBOARD_EXPORT: &str = "clipboard-export";
pub const RELEVANCE_GATE: &str = "relevance-gate";

/// Every built-in step, in catalogue order.
pub const BUILTIN: &[&str] = &[
    LOCAL_READ,
    PDF_EXTRACT,
    WORD_EXTRACT,
    SLIDES_EXTRACT,
    SPREADSHEET_READ,
    HTTP_FETCH,
    HTML_CLEAN,
    WIKI_READ,
    OBJECT_READ,
    ARCHIVE_UPLOAD,
    VIDEO_FETCH,
    AUDIO_EXTRACT,
    TRANSCRIBE,
    OCR,
    PERSIST_LOCAL,
    PII_DETECT,
    PII_TOKENIZE,
    PII_DETOKENIZE,
    PROMPT_BUILD,
    SUMMARIZE,
    CHAT,
    CLIPBOARD_EXPORT,
    RELEVANCE_GATE,
];
