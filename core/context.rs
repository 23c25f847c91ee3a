use crate::filesystem::FileSystem;
use crate::selection::SelectionStore;
use log;
#[cfg(feature = "serde_support")]
use serde::Serialize;
use std::ops::Range;

/// Bytes per token in the size estimate. A fixed approximation, not a tokenizer.
pub const BYTES_PER_TOKEN: usize = 4;

pub fn estimate_tokens(byte_len: usize) -> usize {
    byte_len / BYTES_PER_TOKEN
}

#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde_support", derive(Serialize))]
#[cfg_attr(feature = "serde_support", serde(rename_all = "camelCase"))]
pub struct ContextFile {
    pub path: String,
    pub bytes: usize,
    pub token_estimate: usize,
    /// Byte range of the decoded content within [`GeneratedContext::text`].
    #[cfg_attr(feature = "serde_support", serde(skip))]
    pub content: Range<usize>,
}

/// The aggregated text of every selected file plus its size estimate.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde_support", derive(Serialize))]
#[cfg_attr(feature = "serde_support", serde(rename_all = "camelCase"))]
pub struct GeneratedContext {
    pub text: String,
    pub file_count: usize,
    pub token_estimate: usize,
    pub files: Vec<ContextFile>,
}

impl GeneratedContext {
    pub fn is_empty(&self) -> bool {
        self.file_count == 0
    }

    /// One-line summary in the form shown next to the generated text.
    pub fn summary(&self) -> String {
        format!(
            "Files: {} | Tokens: {}",
            self.file_count, self.token_estimate
        )
    }

    /// The decoded content `file` contributed to the text, without its header.
    pub fn content_of(&self, file: &ContextFile) -> &str {
        self.text.get(file.content.clone()).unwrap_or_default()
    }
}

/// Concatenates every selected regular file, in path order.
///
/// Each file contributes a `--- <path> ---` header line, its content decoded
/// as (lossy) UTF-8 and a trailing newline. Selected paths that are
/// directories, missing or unreadable are skipped without error. Neither the
/// store nor any cache is modified.
pub fn generate<F: FileSystem + ?Sized>(store: &SelectionStore, fs: &F) -> GeneratedContext {
    let mut context = GeneratedContext::default();
    for (path, selected) in store.iter() {
        if !selected {
            continue;
        }
        if !fs.is_file(path) {
            log::trace!("Skipping non-file selection: {}", path.display());
            continue;
        }
        let bytes = match fs.read(path) {
            Ok(bytes) => bytes,
            Err(e) => {
                log::debug!("Skipping unreadable file {}: {}", path.display(), e);
                continue;
            }
        };

        let path_str = path.display().to_string();
        context.text.push_str("--- ");
        context.text.push_str(&path_str);
        context.text.push_str(" ---\n");
        let start = context.text.len();
        context.text.push_str(&String::from_utf8_lossy(&bytes));
        let content = start..context.text.len();
        context.text.push('\n');

        let tokens = estimate_tokens(bytes.len());
        context.file_count += 1;
        context.token_estimate += tokens;
        context.files.push(ContextFile {
            path: path_str,
            bytes: bytes.len(),
            token_estimate: tokens,
            content,
        });
    }
    log::info!(
        "Generated context from {} files (~{} tokens)",
        context.file_count,
        context.token_estimate
    );
    context
}
