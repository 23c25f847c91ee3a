pub mod cache;
pub mod config;
pub mod context;
pub mod error;
pub mod filesystem;
pub mod gather;
pub mod output_formats;
pub mod projects;
pub mod selection;
pub mod session;
pub mod tree;

pub use cache::{CacheStats, DirectoryStateCache};
pub use config::{Config, Tokenizer};
pub use context::{ContextFile, GeneratedContext, estimate_tokens, generate};
pub use error::{AppError, Result};
pub use filesystem::{DirEntry, EntryKind, FileSystem, MemoryFileSystem, RealFileSystem};
pub use gather::find_matching_files;
pub use output_formats::{OutputFormat, serialize_structured};
pub use projects::{Project, ProjectRegistry};
pub use selection::{SelectionStore, TriState};
pub use session::{Session, StaleEntry};
pub use tree::{TreeNode, TreeOptions, build_selection_tree};
