use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use crate::error::BuildError;
use crate::step::{names, Step, StepRegistry};

use super::kind::InputKind;
use super::options::{ChainOptions, ChatMode};

/// Ordered steps built for one input and dropped after execution.
#[derive(Clone)]
pub struct Chain {
    links: Vec<Link>,
}

#[derive(Clone)]
pub struct Link {
    pub name: String,
    pub step: Arc<dyn Step>,
}

impl Chain {
    pub fn new(links: Vec<Link>) -> Self {
        Self { links }
    }

    pub fn names(&self) -> Vec<&str> {
        self.links.iter().map(|l| l.name.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.links.len()
    }

    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Link> {
        self.links.iter()
    }
}

impl std::fmt::Debug for Chain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.names()).finish()
    }
}

/// Base step sequence per input kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainTable {
    sequences: BTreeMap<InputKind, Vec<String>>,
}

impl Default for ChainTable {
    fn default() -> Self {
        use names::*;

        let table: [(InputKind, &[&str]); 11] = [
            (
                InputKind::RemoteVideo,
                &[VIDEO_FETCH, AUDIO_EXTRACT, ARCHIVE_UPLOAD, TRANSCRIBE, PERSIST_LOCAL],
            ),
            (InputKind::LocalMedia, &[ARCHIVE_UPLOAD, TRANSCRIBE, PERSIST_LOCAL]),
            (InputKind::Image, &[LOCAL_READ, OCR, PERSIST_LOCAL]),
            (InputKind::Pdf, &[PDF_EXTRACT, PERSIST_LOCAL]),
            (InputKind::HttpPage, &[HTTP_FETCH, HTML_CLEAN, PERSIST_LOCAL]),
            (InputKind::PlainTextOrJson, &[LOCAL_READ]),
            (InputKind::ObjectStoreReference, &[OBJECT_READ, PERSIST_LOCAL]),
            (InputKind::WikiDocument, &[WIKI_READ, HTML_CLEAN, PERSIST_LOCAL]),
            (InputKind::OfficeDocument, &[WORD_EXTRACT, PERSIST_LOCAL]),
            (InputKind::Spreadsheet, &[SPREADSHEET_READ, PERSIST_LOCAL]),
            (InputKind::SlideDeck, &[SLIDES_EXTRACT, PERSIST_LOCAL]),
        ];

        let sequences = table
            .into_iter()
            .map(|(kind, steps)| (kind, steps.iter().map(|s| s.to_string()).collect()))
            .collect();

        Self { sequences }
    }
}

impl ChainTable {
    pub fn empty() -> Self {
        Self {
            sequences: BTreeMap::new(),
        }
    }

    /// The default table with per-kind replacements from configuration.
    /// Keys are kind tags (legacy names accepted).
    pub fn with_overrides(overrides: &BTreeMap<String, Vec<String>>) -> Result<Self, BuildError> {
        let mut table = Self::default();
        for (tag, steps) in overrides {
            let kind: InputKind = tag.parse()?;
            table.insert(kind, steps.clone());
        }
        Ok(table)
    }

    pub fn insert(&mut self, kind: InputKind, steps: Vec<String>) {
        self.sequences.insert(kind, steps);
    }

    pub fn remove(&mut self, kind: InputKind) -> Option<Vec<String>> {
        self.sequences.remove(&kind)
    }

    pub fn get(&self, kind: InputKind) -> Option<&[String]> {
        self.sequences.get(&kind).map(Vec::as_slice)
    }

    pub fn kinds(&self) -> impl Iterator<Item = InputKind> + '_ {
        self.sequences.keys().copied()
    }
}

/// Decides which steps run for an input, and in what order.
///
/// Planning is a pure function of the kind, the request options and the
/// read-only settings held here. Building resolves the planned names against
/// the registry.
pub struct ChainBuilder<'a> {
    registry: &'a StepRegistry,
    table: &'a ChainTable,
    clipboard: bool,
}

impl<'a> ChainBuilder<'a> {
    pub fn new(registry: &'a StepRegistry, table: &'a ChainTable, clipboard: bool) -> Self {
        Self {
            registry,
            table,
            clipboard,
        }
    }

    pub fn build(&self, kind: InputKind, options: &ChainOptions) -> Result<Chain, BuildError> {
        self.resolve(self.plan(kind, options)?)
    }

    /// The base sequence for `kind` without augmentation, or the custom chain
    /// when one is given.
    pub fn build_base(&self, kind: InputKind, options: &ChainOptions) -> Result<Chain, BuildError> {
        if options.custom.is_some() {
            return self.build(kind, options);
        }
        let base = self
            .table
            .get(kind)
            .ok_or_else(|| BuildError::UnsupportedInputType(kind.to_string()))?;
        self.resolve(base.to_vec())
    }

    /// A fixed sequence of named steps.
    pub fn build_named(&self, names: &[&str]) -> Result<Chain, BuildError> {
        if names.is_empty() {
            return Err(BuildError::EmptyCustomChain);
        }
        self.resolve(names.iter().map(|n| n.to_string()).collect())
    }

    fn resolve(&self, plan: Vec<String>) -> Result<Chain, BuildError> {
        let mut links = Vec::with_capacity(plan.len());
        for name in plan {
            let step = self.registry.get(&name)?;
            links.push(Link { name, step });
        }
        Ok(Chain::new(links))
    }

    /// Step names for `kind` under `options`, without touching the registry.
    pub fn plan(&self, kind: InputKind, options: &ChainOptions) -> Result<Vec<String>, BuildError> {
        if let Some(custom) = &options.custom {
            if custom.is_empty() {
                return Err(BuildError::EmptyCustomChain);
            }
            return Ok(custom.clone());
        }

        let base = self
            .table
            .get(kind)
            .ok_or_else(|| BuildError::UnsupportedInputType(kind.to_string()))?;

        let mut plan: Vec<String> = base.to_vec();
        plan.extend(augmentation(options, self.clipboard).into_iter().map(String::from));
        Ok(plan)
    }

    /// Every step name any kind in the table can produce under `options`.
    pub fn reachable_steps(&self, options: &ChainOptions) -> BTreeSet<String> {
        self.table
            .kinds()
            .filter_map(|kind| self.plan(kind, options).ok())
            .flatten()
            .collect()
    }
}

/// Steps appended after the base sequence. The order is fixed; options only
/// decide presence.
fn augmentation(options: &ChainOptions, clipboard: bool) -> Vec<&'static str> {
    let mut steps = Vec::new();

    if options.anonymize {
        steps.push(names::PII_TOKENIZE);
    }

    match options.chat {
        ChatMode::None => steps.extend([names::PROMPT_BUILD, names::SUMMARIZE]),
        ChatMode::SumFirst => steps.extend([names::PROMPT_BUILD, names::SUMMARIZE, names::CHAT]),
        ChatMode::ChatOnly => steps.push(names::CHAT),
        ChatMode::ChatFirst => steps.extend([names::CHAT, names::PROMPT_BUILD, names::SUMMARIZE]),
    }

    if options.anonymize {
        steps.push(names::PII_DETOKENIZE);
    }

    if clipboard {
        steps.push(names::CLIPBOARD_EXPORT);
    }

    steps
}
