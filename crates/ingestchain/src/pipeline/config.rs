use std::path::PathBuf;

use crate::config::{Config, DatalakeConfig};

/// The slice of [`Config`] the pipeline itself reads.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub storage_dir: PathBuf,
    pub max_parallel_processes: usize,
    pub clipboard_copy: bool,
    pub anonymize: bool,
    pub extract_media: bool,
    pub datalake: DatalakeConfig,
}

impl PipelineConfig {
    pub fn from_config(config: &Config) -> Self {
        Self {
            storage_dir: PathBuf::from(&config.storage_dir),
            max_parallel_processes: config.max_parallel_processes.max(1),
            clipboard_copy: config.clipboard_copy,
            anonymize: config.anonymize,
            extract_media: config.extract_media,
            datalake: config.datalake.clone(),
        }
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}
