//! Deterministic stand-ins for the model and for steps.

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};

use ingestchain::error::StepError;
use ingestchain::pipeline::RequestContext;
use ingestchain::providers::TextModel;
use ingestchain::step::Step;

/// Answers every prompt with the same reply and counts calls.
pub struct FixedModel {
    reply: String,
    calls: AtomicUsize,
}

impl FixedModel {
    pub fn new(reply: &str) -> Self {
        Self {
            reply: reply.to_string(),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl TextModel for FixedModel {
    fn generate(&self, _prompt: &str) -> Result<String, StepError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.reply.clone())
    }

    fn model(&self) -> &str {
        "fixed"
    }
}

/// Copies the locator into `text`. Locators containing `fail` make it error.
pub struct EchoStep;

impl Step for EchoStep {
    fn name(&self) -> &str {
        "echo"
    }

    fn handle(&self, ctx: &mut RequestContext) -> Result<(), StepError> {
        if ctx.source_path.contains("fail") {
            return Err(StepError::Extraction(format!(
                "cannot echo {}",
                ctx.source_path
            )));
        }
        ctx.text = ctx.source_path.clone();
        Ok(())
    }
}
