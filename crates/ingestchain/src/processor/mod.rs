//! Built-in steps and their discovery.

pub mod clipboard;
pub mod gate;
pub mod media;
pub mod model;
pub mod ocr;
pub mod office;
pub mod pdf;
pub mod persist;
pub mod pii;
pub mod text;
pub mod web;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use secrecy::SecretString;

use crate::config::{ChatConfig, Config, ToolsConfig};
use crate::error::StepError;
use crate::providers::{CommandRunner, LocalObjectStore, ObjectStore, OllamaModel, TextModel};
use crate::secrets::{SecretError, SecretSource};
use crate::step::{names, StepRegistry};

/// Read-only settings the built-in steps are constructed from.
#[derive(Clone)]
pub struct StepSettings {
    pub storage_dir: PathBuf,
    pub prompt_dir: Option<PathBuf>,
    pub tools: ToolsConfig,
    pub http_timeout: Duration,
    pub wiki_base_url: String,
    pub wiki_timeout: Duration,
    pub wiki_token: Option<Arc<SecretString>>,
    pub chat: ChatConfig,
    pub archive_bucket: Option<String>,
    pub archive_prefix: String,
}

impl StepSettings {
    pub fn from_config(config: &Config) -> Result<Self, SecretError> {
        let wiki_token = SecretSource::for_wiki(&config.wiki)
            .resolve()?
            .map(Arc::new);

        Ok(Self {
            storage_dir: PathBuf::from(&config.storage_dir),
            prompt_dir: config.prompt_dir.as_ref().map(PathBuf::from),
            tools: config.tools.clone(),
            http_timeout: Duration::from_secs(config.tools.http_timeout_secs),
            wiki_base_url: config.wiki.base_url.clone(),
            wiki_timeout: Duration::from_secs(config.wiki.timeout_secs),
            wiki_token,
            chat: config.chat.clone(),
            archive_bucket: config.datalake.bucket.clone(),
            archive_prefix: config.datalake.prefix.clone(),
        })
    }
}

/// Shared collaborators handed to the steps that need them.
#[derive(Clone)]
pub struct Collaborators {
    pub model: Arc<dyn TextModel>,
    pub object_store: Arc<dyn ObjectStore>,
}

impl Collaborators {
    pub fn from_config(config: &Config) -> Result<Self, StepError> {
        Ok(Self {
            model: Arc::new(OllamaModel::new(&config.model)?),
            object_store: Arc::new(LocalObjectStore::new(&config.object_store.root)),
        })
    }
}

/// Builds and seals a registry holding every built-in step.
pub fn discover(settings: &StepSettings, collaborators: &Collaborators) -> StepRegistry {
    let mut registry = StepRegistry::new();
    register_builtin(&mut registry, settings, collaborators);
    registry.seal();
    registry
}

/// Registers the built-in steps without sealing, so callers can add or
/// replace entries first.
pub fn register_builtin(
    registry: &mut StepRegistry,
    settings: &StepSettings,
    collaborators: &Collaborators,
) {
    registry.register(names::LOCAL_READ, || text::LocalRead);
    registry.register(names::PDF_EXTRACT, || pdf::PdfExtract);
    registry.register(names::WORD_EXTRACT, || office::WordExtract);
    registry.register(names::SLIDES_EXTRACT, || office::SlidesExtract);
    registry.register(names::SPREADSHEET_READ, || office::SpreadsheetRead);
    registry.register(names::HTML_CLEAN, || web::HtmlClean);
    registry.register(names::RELEVANCE_GATE, || gate::RelevanceGate);
    registry.register(names::PII_DETECT, || pii::PiiDetect);
    registry.register(names::PII_TOKENIZE, || pii::PiiTokenize);
    registry.register(names::PII_DETOKENIZE, || pii::PiiDetokenize);

    let timeout = settings.http_timeout;
    registry.register(names::HTTP_FETCH, move || web::HttpFetch::new(timeout));

    let (base_url, wiki_timeout, token) = (
        settings.wiki_base_url.clone(),
        settings.wiki_timeout,
        settings.wiki_token.clone(),
    );
    registry.register(names::WIKI_READ, move || {
        web::WikiRead::new(base_url.clone(), token.clone(), wiki_timeout)
    });

    let store = Arc::clone(&collaborators.object_store);
    registry.register(names::OBJECT_READ, move || {
        persist::ObjectRead::new(Arc::clone(&store))
    });

    let (store, bucket, prefix) = (
        Arc::clone(&collaborators.object_store),
        settings.archive_bucket.clone(),
        settings.archive_prefix.clone(),
    );
    registry.register(names::ARCHIVE_UPLOAD, move || {
        persist::ArchiveUpload::new(Arc::clone(&store), bucket.clone(), prefix.clone())
    });

    registry.register(names::PERSIST_LOCAL, || persist::PersistLocal);

    let (tool, dir) = (settings.tools.video_download.clone(), settings.storage_dir.clone());
    registry.register(names::VIDEO_FETCH, move || {
        media::VideoFetch::new(CommandRunner::new(tool.clone()), dir.clone())
    });

    let (tool, dir) = (settings.tools.audio_extract.clone(), settings.storage_dir.clone());
    registry.register(names::AUDIO_EXTRACT, move || {
        media::AudioExtract::new(CommandRunner::new(tool.clone()), dir.clone())
    });

    let tool = settings.tools.transcribe.clone();
    registry.register(names::TRANSCRIBE, move || {
        media::Transcribe::new(CommandRunner::new(tool.clone()))
    });

    let tool = settings.tools.ocr.clone();
    registry.register(names::OCR, move || ocr::Ocr::new(CommandRunner::new(tool.clone())));

    let tool = settings.tools.clipboard.clone();
    registry.register(names::CLIPBOARD_EXPORT, move || {
        clipboard::ClipboardExport::new(CommandRunner::new(tool.clone()))
    });

    let prompt_dir = settings.prompt_dir.clone();
    registry.register(names::PROMPT_BUILD, move || {
        model::PromptBuild::new(prompt_dir.clone())
    });

    let text_model = Arc::clone(&collaborators.model);
    registry.register(names::SUMMARIZE, move || {
        model::Summarize::new(Arc::clone(&text_model))
    });

    let (text_model, chat) = (Arc::clone(&collaborators.model), settings.chat.clone());
    registry.register(names::CHAT, move || {
        model::Chat::new(Arc::clone(&text_model), chat.clone())
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_discover_registers_every_builtin() {
        let config = Config::default();
        let settings = StepSettings::from_config(&config).unwrap();
        let collaborators = Collaborators::from_config(&config).unwrap();

        let registry = discover(&settings, &collaborators);
        assert!(registry.is_discovered());
        for name in names::BUILTIN {
            let step = registry.get(name).unwrap();
            assert_eq!(step.name(), *name);
        }
        assert_eq!(registry.len(), names::BUILTIN.len());
    }

    #[test]
    fn test_settings_carry_wiki_token() {
        let mut config = Config::default();
        config.wiki.token = Some("secret".to_string());
        let settings = StepSettings::from_config(&config).unwrap();
        assert!(settings.wiki_token.is_some());
    }
}
