use std::fmt;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::BuildError;

/// Classification of an input locator. Decides the base sequence of a chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum InputKind {
    RemoteVideo,
    LocalMedia,
    Image,
    Pdf,
    HttpPage,
    PlainTextOrJson,
    ObjectStoreReference,
    WikiDocument,
    OfficeDocument,
    Spreadsheet,
    SlideDeck,
}

const MEDIA_EXTENSIONS: &[&str] = &["mp3", "mp4", "m4a", "wav", "flac", "mov", "avi"];
const SPREADSHEET_EXTENSIONS: &[&str] = &["xlsx", "xlsm", "xltx", "xltm"];
const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "tiff"];
const TEXT_EXTENSIONS: &[&str] = &["txt", "json"];

impl InputKind {
    pub const ALL: [InputKind; 11] = [
        InputKind::RemoteVideo,
        InputKind::LocalMedia,
        InputKind::Image,
        InputKind::Pdf,
        InputKind::HttpPage,
        InputKind::PlainTextOrJson,
        InputKind::ObjectStoreReference,
        InputKind::WikiDocument,
        InputKind::OfficeDocument,
        InputKind::Spreadsheet,
        InputKind::SlideDeck,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            InputKind::RemoteVideo => "remote-video",
            InputKind::LocalMedia => "local-media",
            InputKind::Image => "image",
            InputKind::Pdf => "pdf",
            InputKind::HttpPage => "http-page",
            InputKind::PlainTextOrJson => "plain-text-or-json",
            InputKind::ObjectStoreReference => "object-store-reference",
            InputKind::WikiDocument => "wiki-document",
            InputKind::OfficeDocument => "office-document",
            InputKind::Spreadsheet => "spreadsheet",
            InputKind::SlideDeck => "slide-deck",
        }
    }

    /// Inputs whose original bytes live elsewhere; catalogue destinations are
    /// derived from the model-provided title rather than the file name.
    pub fn is_remote(&self) -> bool {
        matches!(
            self,
            InputKind::HttpPage | InputKind::WikiDocument | InputKind::ObjectStoreReference
        )
    }

    /// Classifies a locator. Unrecognised local files fall back to
    /// plain text, matching how list files are usually fed in.
    pub fn classify(locator: &str) -> InputKind {
        Self::classify_known(locator).unwrap_or(InputKind::PlainTextOrJson)
    }

    fn classify_known(locator: &str) -> Option<InputKind> {
        let lower = locator.trim().to_ascii_lowercase();

        if lower.contains("youtube") || lower.contains("youtu.be") {
            return Some(InputKind::RemoteVideo);
        }
        if lower.starts_with("http") {
            return Some(InputKind::HttpPage);
        }
        if lower.starts_with("s3://") {
            return Some(InputKind::ObjectStoreReference);
        }
        if lower.starts_with("quip://") || lower.starts_with("wiki://") {
            return Some(InputKind::WikiDocument);
        }

        let extension = Path::new(&lower)
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("");

        let by_extension = match extension {
            ext if MEDIA_EXTENSIONS.contains(&ext) => Some(InputKind::LocalMedia),
            "pdf" => Some(InputKind::Pdf),
            "docx" => Some(InputKind::OfficeDocument),
            ext if SPREADSHEET_EXTENSIONS.contains(&ext) => Some(InputKind::Spreadsheet),
            "pptx" => Some(InputKind::SlideDeck),
            ext if IMAGE_EXTENSIONS.contains(&ext) => Some(InputKind::Image),
            ext if TEXT_EXTENSIONS.contains(&ext) => Some(InputKind::PlainTextOrJson),
            _ => None,
        };

        by_extension.or_else(|| Self::classify_by_mime(&lower))
    }

    fn classify_by_mime(locator: &str) -> Option<InputKind> {
        let mime = mime_guess::from_path(locator).first()?;
        match mime.type_().as_str() {
            "audio" | "video" => Some(InputKind::LocalMedia),
            "image" => Some(InputKind::Image),
            "text" => Some(InputKind::PlainTextOrJson),
            _ => None,
        }
    }
}

impl fmt::Display for InputKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for InputKind {
    type Err = BuildError;

    /// Accepts the kebab-case tags as well as the legacy underscore names
    /// used by older list files and configs.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let kind = match s.trim() {
            "remote-video" | "youtube_url" => InputKind::RemoteVideo,
            "local-media" | "multimedia_file" => InputKind::LocalMedia,
            "image" | "image_file" => InputKind::Image,
            "pdf" => InputKind::Pdf,
            "http-page" | "http" => InputKind::HttpPage,
            "plain-text-or-json" | "text_or_json" => InputKind::PlainTextOrJson,
            "object-store-reference" | "s3" => InputKind::ObjectStoreReference,
            "wiki-document" | "quip" => InputKind::WikiDocument,
            "office-document" | "microsoft_word" => InputKind::OfficeDocument,
            "spreadsheet" | "microsoft_excel" => InputKind::Spreadsheet,
            "slide-deck" | "microsoft_pp" => InputKind::SlideDeck,
            other => return Err(BuildError::UnsupportedInputType(other.to_string())),
        };
        Ok(kind)
    }
}
