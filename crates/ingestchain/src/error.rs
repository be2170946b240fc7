use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum IngestError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Registry error: {0}")]
    Registry(#[from] RegistryError),

    #[error("Chain construction failed: {0}")]
    Build(#[from] BuildError),

    #[error("Execution failed: {0}")]
    Execution(#[from] ExecutionError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Worker error: {0}")]
    Worker(#[from] WorkerError),

    #[error("Secret lookup failed: {0}")]
    Secret(#[from] crate::secrets::SecretError),

    #[error("Failed to set up collaborators: {0}")]
    Setup(#[from] StepError),
}

impl IngestError {
    /// Registry and discovery problems poison every input of a run.
    pub fn is_run_fatal(&self) -> bool {
        matches!(
            self,
            IngestError::Registry(_) | IngestError::Build(BuildError::Registry(_))
        )
    }
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Unsupported config file format: '{0}'")]
    UnsupportedFormat(String),

    #[error("Failed to parse config JSON: {0}")]
    ParseJson(#[from] serde_json::Error),

    #[error("Failed to parse config YAML: {0}")]
    ParseYaml(#[from] serde_yaml::Error),

    #[error("Config validation failed: {message}")]
    Validation { message: String },

    #[error("Schema validation failed: {errors}")]
    SchemaValidation { errors: String },

    #[error("Invalid environment override {name}='{value}'")]
    InvalidEnv { name: String, value: String },
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    #[error("Step registry used before discovery completed")]
    NotInitialized,

    #[error("Unknown step '{0}'")]
    UnknownStep(String),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BuildError {
    #[error("Unsupported input type: {0}")]
    UnsupportedInputType(String),

    #[error("Custom chain is empty")]
    EmptyCustomChain,

    #[error(transparent)]
    Registry(#[from] RegistryError),
}

/// Failure raised from inside a single step.
#[derive(Error, Debug)]
pub enum StepError {
    #[error("Failed to read '{path}': {source}")]
    ReadInput {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Missing input: {0}")]
    MissingInput(String),

    #[error("Extraction failed: {0}")]
    Extraction(String),

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("External tool '{tool}' failed: {message}")]
    Tool { tool: String, message: String },

    #[error("Model invocation failed: {0}")]
    Model(String),

    #[error("Storage failed: {0}")]
    Storage(#[from] StorageError),
}

#[derive(Error, Debug)]
pub enum ExecutionError {
    #[error("Step '{step}' failed: {source}")]
    StepExecution {
        step: String,
        #[source]
        source: StepError,
    },

    #[error("Chain is empty")]
    EmptyChain,
}

impl ExecutionError {
    pub fn step(&self) -> Option<&str> {
        match self {
            ExecutionError::StepExecution { step, .. } => Some(step),
            ExecutionError::EmptyChain => None,
        }
    }
}

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Failed to create directory '{path}': {source}")]
    CreateDirectory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write file '{path}': {source}")]
    WriteFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to read file '{path}': {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("No free file name near '{0}'")]
    FileExists(PathBuf),

    #[error("Invalid object URI '{0}'")]
    InvalidUri(String),

    #[error("Object not found: {0}")]
    NotFound(String),

    #[error("Failed to encode record: {0}")]
    Encode(#[from] serde_json::Error),
}

#[derive(Error, Debug)]
pub enum WorkerError {
    #[error("Worker count must be at least 1")]
    NoWorkers,

    #[error("Failed to spawn worker: {0}")]
    SpawnFailed(String),

    #[error("Worker channel closed unexpectedly")]
    ChannelClosed,

    #[error("Worker panicked while processing '{0}'")]
    Panicked(String),

    #[error("Directory scan failed for '{path}': {source}")]
    ScanFailed {
        path: PathBuf,
        #[source]
        source: walkdir::Error,
    },

    #[error("Failed to read input list '{path}': {source}")]
    ReadList {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

pub type Result<T> = std::result::Result<T, IngestError>;
