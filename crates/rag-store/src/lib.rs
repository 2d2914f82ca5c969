//! I/O adapters around `rag-core`: configuration, the directive and
//! template files, conversation history on disk and the SQLite passage
//! index.

pub mod assembler;
pub mod config;
pub mod directives;
pub mod error;
pub mod history;
pub mod index;
pub mod ingest;
pub mod schema;
pub mod search;
pub mod template;

pub use assembler::ContextAssembler;
pub use config::{AssemblerConfig, FileConfig, hours_to_window};
pub use directives::load_directives;
pub use error::{Result, StoreError};
pub use history::{SOURCES_FILE, list_history, list_history_between, load_history, save_exchange};
pub use index::PassageIndex;
pub use ingest::{IngestReport, index_documents};
pub use search::SimilaritySearch;
pub use template::load_template;
