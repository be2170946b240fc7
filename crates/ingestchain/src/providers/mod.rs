//! Collaborators the built-in steps talk to: a text model, an object store,
//! a catalog and external command-line tools.

pub mod catalog;
pub mod command;
pub mod llm;
pub mod object_store;
pub mod ollama;

pub use catalog::{Catalog, JsonlCatalog};
pub use command::CommandRunner;
pub use llm::TextModel;
pub use object_store::{LocalObjectStore, ObjectStore, ObjectUri};
pub use ollama::OllamaModel;
