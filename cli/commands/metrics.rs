use crate::ProjectWorkspace;
use crate::cli_args::MetricsArgs;
use crate::output::{print_data_or_text, print_metrics_pretty_table};
use anyhow::Result;
use byte_unit::{Byte, UnitType};
use ctxbuilder_core::{AppError, Config, GeneratedContext, Tokenizer, estimate_tokens};
use log;
use serde::Serialize;
use std::path::Path;
use tiktoken_rs::{CoreBPE, cl100k_base};

#[derive(Debug, Serialize)]
pub struct SelectionMetrics {
    pub project_name: String,
    pub tokenizer: String,
    pub total_files: usize,
    pub total_lines: usize,
    pub total_bytes: u128,
    pub total_bytes_readable: String,
    pub total_tokens: usize,
    pub files: Vec<FileMetrics>,
}

#[derive(Debug, Serialize)]
pub struct FileMetrics {
    pub path: String,
    pub lines: usize,
    pub bytes: usize,
    pub bytes_readable: String,
    pub tokens: usize,
}

pub fn handle_metrics_command(args: MetricsArgs, quiet: bool) -> Result<()> {
    let workspace = ProjectWorkspace::open(&args.project_config, Some(&args.format_output))?;
    let exact = args.exact || workspace.config.metrics.tokenizer == Tokenizer::Cl100k;

    let context = workspace.session.generate();
    if context.is_empty() && !quiet {
        log::warn!("No files selected in project '{}'", workspace.name);
    }

    let bpe = if exact {
        log::debug!("Loading cl100k tokenizer...");
        Some(cl100k_base().map_err(|e| AppError::TikToken(e.to_string()))?)
    } else {
        None
    };
    let metrics = calculate_metrics(&workspace.name, &context, bpe.as_ref(), |path| {
        workspace.display_path(path)
    });

    if args.format_output.format.is_none() && is_text(&workspace.config) {
        print_metrics_pretty_table(&metrics)
    } else {
        print_data_or_text(&metrics, None, &workspace.config, "metrics")
    }
}

fn is_text(config: &Config) -> bool {
    config.output.format.eq_ignore_ascii_case("text")
}

/// Per-file numbers for the aggregated selection, taken from the content
/// `generate` already read. Without a tokenizer the token column is the same
/// bytes/4 estimate `generate` reports.
fn calculate_metrics(
    project_name: &str,
    context: &GeneratedContext,
    bpe: Option<&CoreBPE>,
    display_path: impl Fn(&Path) -> String,
) -> SelectionMetrics {
    let mut total_lines = 0;
    let mut total_bytes: u128 = 0;
    let mut total_tokens = 0;
    let mut files = Vec::with_capacity(context.files.len());

    for file in &context.files {
        let body = context.content_of(file);
        let lines = body.lines().count();
        let tokens = match bpe {
            Some(bpe) => bpe.encode_ordinary(body).len(),
            None => estimate_tokens(file.bytes),
        };

        total_lines += lines;
        total_bytes = total_bytes.saturating_add(file.bytes as u128);
        total_tokens += tokens;

        files.push(FileMetrics {
            path: display_path(Path::new(&file.path)),
            lines,
            bytes: file.bytes,
            bytes_readable: readable_size(file.bytes as u128),
            tokens,
        });
    }

    SelectionMetrics {
        project_name: project_name.to_string(),
        tokenizer: if bpe.is_some() { "cl100k" } else { "bytes/4" }.to_string(),
        total_files: files.len(),
        total_lines,
        total_bytes,
        total_bytes_readable: readable_size(total_bytes),
        total_tokens,
        files,
    }
}

fn readable_size(bytes: u128) -> String {
    Byte::from_u128(bytes)
        .unwrap_or_default()
        .get_appropriate_unit(UnitType::Binary)
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use ctxbuilder_core::{MemoryFileSystem, SelectionStore, generate};
    use pretty_assertions::assert_eq;

    #[test]
    fn metrics_come_from_the_generated_content() {
        let mut fs = MemoryFileSystem::new();
        fs.add_file("/p/a.rs", "one\ntwo\nthree")
            .add_file("/p/b.md", "12345678");
        let store = SelectionStore::from_selected(["/p/a.rs", "/p/b.md"]);
        let context = generate(&store, &fs);
        // Removing a file after generation must not change the numbers.
        fs.remove("/p/a.rs");

        let metrics = calculate_metrics("p", &context, None, |path| {
            path.strip_prefix("/p").unwrap().display().to_string()
        });
        assert_eq!(metrics.total_files, 2);
        assert_eq!(metrics.total_lines, 4);
        assert_eq!(metrics.total_bytes, 21);
        assert_eq!(metrics.total_tokens, 3 + 2);
        assert_eq!(metrics.files[0].path, "a.rs");
        assert_eq!(metrics.files[0].lines, 3);
        assert_eq!(metrics.tokenizer, "bytes/4");
    }

    #[test]
    fn sizes_are_human_readable() {
        assert_eq!(readable_size(0), "0 B");
        assert_eq!(readable_size(2048), "2 KiB");
    }
}
