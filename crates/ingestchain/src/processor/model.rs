//! Steps that talk to the language model.

use std::io::BufRead;
use std::path::PathBuf;
use std::sync::Arc;

use serde_json::json;
use tracing::{debug, info};

use crate::config::ChatConfig;
use crate::error::StepError;
use crate::pipeline::RequestContext;
use crate::providers::TextModel;
use crate::step::{names, Step};

pub const TEXT_PLACEHOLDER: &str = "{text}";

const DEFAULT_TEMPLATE: &str = "Summarize the following content in a few concise paragraphs. \
Keep names, figures and dates. Any [PII_...] placeholders must be copied unchanged.\n\n{text}";

const META_TEMPLATE: &str = "Read the following content and describe it for a data catalog. \
Answer with a single JSON object and nothing else, using the keys \
\"title\" (short human title), \"category\" (one lowercase word), \
\"description\" (one or two sentences) and \"keywords\" (list of strings). \
Any [PII_...] placeholders must be copied unchanged.\n\n{text}";

fn builtin_template(name: &str) -> Option<&'static str> {
    match name {
        "default_prompt" => Some(DEFAULT_TEMPLATE),
        "meta" => Some(META_TEMPLATE),
        _ => None,
    }
}

/// Renders the prompt named by `prompt_name` around `text`.
///
/// Templates are looked up as `<prompt_dir>/<name>.txt` first, then among the
/// built-in `default_prompt` and `meta` templates. A template without a
/// `{text}` placeholder gets the text appended.
pub struct PromptBuild {
    prompt_dir: Option<PathBuf>,
}

impl PromptBuild {
    pub fn new(prompt_dir: Option<PathBuf>) -> Self {
        Self { prompt_dir }
    }

    fn template(&self, name: &str) -> Result<String, StepError> {
        if let Some(dir) = &self.prompt_dir {
            let path = dir.join(format!("{}.txt", name));
            if path.is_file() {
                return std::fs::read_to_string(&path)
                    .map_err(|e| StepError::ReadInput { path, source: e });
            }
        }

        builtin_template(name)
            .map(str::to_string)
            .ok_or_else(|| StepError::MissingInput(format!("unknown prompt template '{}'", name)))
    }
}

pub fn render(template: &str, text: &str) -> String {
    if template.contains(TEXT_PLACEHOLDER) {
        template.replace(TEXT_PLACEHOLDER, text)
    } else {
        format!("{}\n\n{}", template.trim_end(), text)
    }
}

impl Step for PromptBuild {
    fn name(&self) -> &str {
        names::PROMPT_BUILD
    }

    fn handle(&self, ctx: &mut RequestContext) -> Result<(), StepError> {
        let template = self.template(&ctx.prompt_name)?;
        ctx.text = render(&template, &ctx.text);
        Ok(())
    }
}

/// Sends `text` to the model and replaces it with the response.
pub struct Summarize {
    model: Arc<dyn TextModel>,
}

impl Summarize {
    pub fn new(model: Arc<dyn TextModel>) -> Self {
        Self { model }
    }
}

impl Step for Summarize {
    fn name(&self) -> &str {
        names::SUMMARIZE
    }

    fn handle(&self, ctx: &mut RequestContext) -> Result<(), StepError> {
        let _span = tracing::info_span!("processor.summarize", model = self.model.model()).entered();

        let response = self.model.generate(&ctx.text)?;
        info!(
            "Model returned {} bytes for {} bytes of input",
            response.len(),
            ctx.text.len()
        );
        ctx.text = response.trim().to_string();
        Ok(())
    }
}

/// Asks the model questions about `text` and records the answers in
/// `chat_transcript`. `text` itself is left alone.
pub struct Chat {
    model: Arc<dyn TextModel>,
    config: ChatConfig,
}

impl Chat {
    pub fn new(model: Arc<dyn TextModel>, config: ChatConfig) -> Self {
        Self { model, config }
    }

    fn questions(&self) -> Vec<String> {
        let mut questions: Vec<String> = self
            .config
            .questions
            .iter()
            .map(|q| q.trim().to_string())
            .filter(|q| !q.is_empty())
            .collect();

        if self.config.interactive {
            let stdin = std::io::stdin();
            for line in stdin.lock().lines().map_while(Result::ok) {
                let question = line.trim();
                if question.is_empty() {
                    break;
                }
                questions.push(question.to_string());
            }
        }

        questions
    }
}

fn chat_prompt(context: &str, question: &str) -> String {
    format!(
        "Answer the question using only the content below.\n\n\
         Content:\n{}\n\nQuestion: {}\nAnswer:",
        context, question
    )
}

impl Step for Chat {
    fn name(&self) -> &str {
        names::CHAT
    }

    fn handle(&self, ctx: &mut RequestContext) -> Result<(), StepError> {
        let questions = self.questions();
        if questions.is_empty() {
            debug!("No chat questions configured");
            return Ok(());
        }

        let mut transcript = Vec::with_capacity(questions.len());
        for question in questions {
            let answer = self.model.generate(&chat_prompt(&ctx.text, &question))?;
            transcript.push(json!({ "question": question, "answer": answer.trim() }));
        }

        ctx.merge_metadata("chat_transcript", json!(transcript));
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::pipeline::InputKind;
    use std::sync::Mutex;
    use tempfile::TempDir;

    /// Model double that records prompts and replies from a script.
    pub(crate) struct ScriptedModel {
        replies: Mutex<Vec<String>>,
        pub(crate) prompts: Mutex<Vec<String>>,
    }

    impl ScriptedModel {
        pub(crate) fn new(replies: &[&str]) -> Self {
            Self {
                replies: Mutex::new(replies.iter().rev().map(|r| r.to_string()).collect()),
                prompts: Mutex::new(Vec::new()),
            }
        }
    }

    impl TextModel for ScriptedModel {
        fn generate(&self, prompt: &str) -> Result<String, StepError> {
            self.prompts.lock().unwrap().push(prompt.to_string());
            self.replies
                .lock()
                .unwrap()
                .pop()
                .ok_or_else(|| StepError::Model("no scripted reply left".into()))
        }

        fn model(&self) -> &str {
            "scripted"
        }
    }

    fn ctx_with(text: &str) -> RequestContext {
        let mut ctx = RequestContext::new(InputKind::PlainTextOrJson, "in.txt", PathBuf::from("o"));
        ctx.text = text.to_string();
        ctx
    }

    #[test]
    fn test_builtin_prompts() {
        let step = PromptBuild::new(None);

        let mut ctx = ctx_with("BODY");
        step.handle(&mut ctx).unwrap();
        assert!(ctx.text.starts_with("Summarize"));
        assert!(ctx.text.ends_with("BODY"));

        let mut ctx = ctx_with("BODY").with_prompt("meta");
        step.handle(&mut ctx).unwrap();
        assert!(ctx.text.contains("\"category\""));
    }

    #[test]
    fn test_prompt_dir_overrides_builtin() {
        let temp_dir = TempDir::new().unwrap();
        std::fs::write(temp_dir.path().join("meta.txt"), "Classify: {text}!").unwrap();
        std::fs::write(temp_dir.path().join("bare.txt"), "Just read this\n").unwrap();
        let step = PromptBuild::new(Some(temp_dir.path().to_path_buf()));

        let mut ctx = ctx_with("abc").with_prompt("meta");
        step.handle(&mut ctx).unwrap();
        assert_eq!(ctx.text, "Classify: abc!");

        let mut ctx = ctx_with("abc").with_prompt("bare");
        step.handle(&mut ctx).unwrap();
        assert_eq!(ctx.text, "Just read this\n\nabc");
    }

    #[test]
    fn test_unknown_prompt() {
        let mut ctx = ctx_with("abc").with_prompt("nope");
        assert!(matches!(
            PromptBuild::new(None).handle(&mut ctx),
            Err(StepError::MissingInput(_))
        ));
    }

    #[test]
    fn test_summarize_replaces_text() {
        let model = Arc::new(ScriptedModel::new(&["  short summary \n"]));
        let step = Summarize::new(model.clone());

        let mut ctx = ctx_with("long prompt");
        step.handle(&mut ctx).unwrap();

        assert_eq!(ctx.text, "short summary");
        assert_eq!(*model.prompts.lock().unwrap(), vec!["long prompt"]);
    }

    #[test]
    fn test_chat_records_answers_in_order() {
        let model = Arc::new(ScriptedModel::new(&["Alice", "Friday"]));
        let config = ChatConfig {
            questions: vec!["Who?".into(), " ".into(), "When?".into()],
            interactive: false,
        };
        let step = Chat::new(model.clone(), config);

        let mut ctx = ctx_with("Alice meets Bob on Friday.");
        step.handle(&mut ctx).unwrap();

        assert_eq!(ctx.text, "Alice meets Bob on Friday.");
        assert_eq!(
            ctx.metadata["chat_transcript"],
            json!([
                {"question": "Who?", "answer": "Alice"},
                {"question": "When?", "answer": "Friday"},
            ])
        );
        let prompts = model.prompts.lock().unwrap();
        assert!(prompts[0].contains("Alice meets Bob") && prompts[0].contains("Question: Who?"));
    }

    #[test]
    fn test_chat_without_questions() {
        let step = Chat::new(Arc::new(ScriptedModel::new(&[])), ChatConfig::default());
        let mut ctx = ctx_with("x");
        step.handle(&mut ctx).unwrap();
        assert!(ctx.metadata.is_empty());
    }

    #[test]
    fn test_model_failure_propagates() {
        let step = Summarize::new(Arc::new(ScriptedModel::new(&[])));
        let mut ctx = ctx_with("x");
        assert!(matches!(step.handle(&mut ctx), Err(StepError::Model(_))));
    }
}
