//! Audio and video steps backed by external tools.

use std::path::{Path, PathBuf};

use serde_json::json;
use tracing::info;

use crate::error::StepError;
use crate::pipeline::RequestContext;
use crate::providers::CommandRunner;
use crate::storage::filesystem;
use crate::step::{names, Step};

fn require_output(runner: &CommandRunner, output: &Path) -> Result<(), StepError> {
    if output.is_file() {
        Ok(())
    } else {
        Err(StepError::Tool {
            tool: runner.program().to_string(),
            message: format!("expected output {} was not produced", output.display()),
        })
    }
}

/// Downloads the audio track of a remote video into the storage directory
/// and points `source_path` at it.
pub struct VideoFetch {
    runner: CommandRunner,
    storage_dir: PathBuf,
}

impl VideoFetch {
    pub fn new(runner: CommandRunner, storage_dir: PathBuf) -> Self {
        Self {
            runner,
            storage_dir,
        }
    }
}

impl Step for VideoFetch {
    fn name(&self) -> &str {
        names::VIDEO_FETCH
    }

    fn handle(&self, ctx: &mut RequestContext) -> Result<(), StepError> {
        filesystem::ensure_directory(&self.storage_dir)?;
        let output = self.storage_dir.join(format!("{}.m4a", ctx.id));

        self.runner
            .run(&ctx.source_path, &output.to_string_lossy())?;
        require_output(&self.runner, &output)?;

        info!("Downloaded media for job {}", ctx.id);
        ctx.merge_metadata("source_url", json!(ctx.source_path));
        ctx.source_path = output.to_string_lossy().to_string();
        Ok(())
    }
}

/// Converts the media at `source_path` to mp3 and points `source_path` at
/// the result.
pub struct AudioExtract {
    runner: CommandRunner,
    storage_dir: PathBuf,
}

impl AudioExtract {
    pub fn new(runner: CommandRunner, storage_dir: PathBuf) -> Self {
        Self {
            runner,
            storage_dir,
        }
    }
}

impl Step for AudioExtract {
    fn name(&self) -> &str {
        names::AUDIO_EXTRACT
    }

    fn handle(&self, ctx: &mut RequestContext) -> Result<(), StepError> {
        let input = Path::new(&ctx.source_path);
        if !input.is_file() {
            return Err(StepError::MissingInput(format!(
                "media file '{}' not found",
                ctx.file_name()
            )));
        }

        filesystem::ensure_directory(&self.storage_dir)?;
        let stem = input
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("audio");
        let output = self.storage_dir.join(format!("{}.mp3", stem));
        if output == input {
            return Ok(());
        }

        self.runner
            .run(&ctx.source_path, &output.to_string_lossy())?;
        require_output(&self.runner, &output)?;

        ctx.source_path = output.to_string_lossy().to_string();
        Ok(())
    }
}

/// Replaces `text` with the transcript of the audio at `source_path`.
pub struct Transcribe {
    runner: CommandRunner,
}

impl Transcribe {
    pub fn new(runner: CommandRunner) -> Self {
        Self { runner }
    }
}

impl Step for Transcribe {
    fn name(&self) -> &str {
        names::TRANSCRIBE
    }

    fn handle(&self, ctx: &mut RequestContext) -> Result<(), StepError> {
        let _span = tracing::info_span!("processor.transcribe", tool = self.runner.program()).entered();

        if !Path::new(&ctx.source_path).is_file() {
            return Err(StepError::MissingInput(format!(
                "audio '{}' not found",
                ctx.file_name()
            )));
        }

        let transcript = self.runner.run(&ctx.source_path, "")?;
        ctx.text = transcript.trim().to_string();
        Ok(())
    }
}
