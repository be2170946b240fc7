use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub version: String,
    /// Local directory for downloads, transcripts and persisted text.
    #[serde(default = "default_storage_dir")]
    pub storage_dir: String,
    /// Upper bound on concurrently processed inputs.
    #[serde(default = "default_max_parallel_processes")]
    pub max_parallel_processes: usize,
    #[serde(default)]
    pub clipboard_copy: bool,
    #[serde(default = "default_true")]
    pub anonymize: bool,
    #[serde(default = "default_true")]
    pub extract_media: bool,
    /// Directory holding `<name>.txt` prompt templates.
    #[serde(default)]
    pub prompt_dir: Option<String>,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub object_store: ObjectStoreConfig,
    #[serde(default)]
    pub datalake: DatalakeConfig,
    #[serde(default)]
    pub model: ModelConfig,
    #[serde(default)]
    pub wiki: WikiConfig,
    #[serde(default)]
    pub tools: ToolsConfig,
    #[serde(default)]
    pub chat: ChatConfig,
    /// Per-kind replacements of the base step sequence, keyed by kind tag.
    #[serde(default)]
    pub chains: BTreeMap<String, Vec<String>>,
}

fn default_storage_dir() -> String {
    "./downloads".to_string()
}

fn default_max_parallel_processes() -> usize {
    1
}

fn default_true() -> bool {
    true
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: "1.0".to_string(),
            storage_dir: default_storage_dir(),
            max_parallel_processes: default_max_parallel_processes(),
            clipboard_copy: false,
            anonymize: true,
            extract_media: true,
            prompt_dir: None,
            logging: LoggingConfig::default(),
            object_store: ObjectStoreConfig::default(),
            datalake: DatalakeConfig::default(),
            model: ModelConfig::default(),
            wiki: WikiConfig::default(),
            tools: ToolsConfig::default(),
            chat: ChatConfig::default(),
            chains: BTreeMap::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// `EnvFilter` directive used when `RUST_LOG` is unset.
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default)]
    pub format: LogFormat,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObjectStoreConfig {
    /// Filesystem root backing `s3://bucket/key` URIs.
    #[serde(default = "default_object_store_root")]
    pub root: String,
}

fn default_object_store_root() -> String {
    "./object-store".to_string()
}

impl Default for ObjectStoreConfig {
    fn default() -> Self {
        Self {
            root: default_object_store_root(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatalakeConfig {
    #[serde(default)]
    pub bucket: Option<String>,
    #[serde(default)]
    pub prefix: String,
    #[serde(default = "default_metadata_prefix")]
    pub metadata_prefix: String,
    /// JSON-lines file the catalog registrations are appended to.
    #[serde(default = "default_catalog_path")]
    pub catalog_path: String,
}

fn default_metadata_prefix() -> String {
    "metadata".to_string()
}

fn default_catalog_path() -> String {
    "./catalog.jsonl".to_string()
}

impl Default for DatalakeConfig {
    fn default() -> Self {
        Self {
            bucket: None,
            prefix: String::new(),
            metadata_prefix: default_metadata_prefix(),
            catalog_path: default_catalog_path(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    #[serde(default = "default_model_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_model_name")]
    pub model: String,
    #[serde(default = "default_model_timeout")]
    pub timeout_secs: u64,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
}

fn default_model_endpoint() -> String {
    "http://localhost:11434".to_string()
}

fn default_model_name() -> String {
    "llama3".to_string()
}

fn default_model_timeout() -> u64 {
    120
}

fn default_temperature() -> f32 {
    0.2
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            endpoint: default_model_endpoint(),
            model: default_model_name(),
            timeout_secs: default_model_timeout(),
            temperature: default_temperature(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WikiConfig {
    #[serde(default = "default_wiki_base_url")]
    pub base_url: String,
    #[serde(default)]
    pub token: Option<String>,
    /// File holding the token (Docker secrets).
    #[serde(default)]
    pub token_file: Option<String>,
    /// Environment variable holding the token.
    #[serde(default)]
    pub token_env: Option<String>,
    #[serde(default = "default_http_timeout")]
    pub timeout_secs: u64,
}

fn default_wiki_base_url() -> String {
    "https://platform.quip.com".to_string()
}

fn default_http_timeout() -> u64 {
    30
}

impl Default for WikiConfig {
    fn default() -> Self {
        Self {
            base_url: default_wiki_base_url(),
            token: None,
            token_file: None,
            token_env: None,
            timeout_secs: default_http_timeout(),
        }
    }
}

/// External program invocation. `{input}` and `{output}` in `args` are
/// replaced at run time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandTemplate {
    pub program: String,
    #[serde(default)]
    pub args: Vec<String>,
}

impl CommandTemplate {
    pub fn new(program: &str, args: &[&str]) -> Self {
        Self {
            program: program.to_string(),
            args: args.iter().map(|a| a.to_string()).collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolsConfig {
    #[serde(default = "default_video_download")]
    pub video_download: CommandTemplate,
    #[serde(default = "default_audio_extract")]
    pub audio_extract: CommandTemplate,
    #[serde(default = "default_transcribe")]
    pub transcribe: CommandTemplate,
    #[serde(default = "default_ocr")]
    pub ocr: CommandTemplate,
    #[serde(default = "default_clipboard")]
    pub clipboard: CommandTemplate,
    #[serde(default = "default_http_timeout")]
    pub http_timeout_secs: u64,
}

fn default_video_download() -> CommandTemplate {
    CommandTemplate::new(
        "yt-dlp",
        &["-f", "bestaudio", "--no-playlist", "-o", "{output}", "{input}"],
    )
}

fn default_audio_extract() -> CommandTemplate {
    CommandTemplate::new(
        "ffmpeg",
        &["-y", "-i", "{input}", "-vn", "-acodec", "libmp3lame", "{output}"],
    )
}

fn default_transcribe() -> CommandTemplate {
    CommandTemplate::new("whisper-cli", &["-nt", "-f", "{input}"])
}

fn default_ocr() -> CommandTemplate {
    CommandTemplate::new("tesseract", &["{input}", "stdout", "-l", "eng"])
}

#[cfg(target_os = "macos")]
fn default_clipboard() -> CommandTemplate {
    CommandTemplate::new("pbcopy", &[])
}

#[cfg(not(target_os = "macos"))]
fn default_clipboard() -> CommandTemplate {
    CommandTemplate::new("xclip", &["-selection", "clipboard"])
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            video_download: default_video_download(),
            audio_extract: default_audio_extract(),
            transcribe: default_transcribe(),
            ocr: default_ocr(),
            clipboard: default_clipboard(),
            http_timeout_secs: default_http_timeout(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChatConfig {
    /// Questions asked of the model, in order, by the chat step.
    #[serde(default)]
    pub questions: Vec<String>,
    /// Read further questions from stdin until an empty line.
    #[serde(default)]
    pub interactive: bool,
}
