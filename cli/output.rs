use anyhow::{Context, Result};
use colored::*;
use comfy_table::{Cell, CellAlignment, Color, ContentArrangement, Table, presets::UTF8_FULL};
use ctxbuilder_core::{
    Config, EntryKind, OutputFormat, TreeNode, TriState, output_formats, serialize_structured,
};
use serde::Serialize;
use std::fs::{self, File};
use std::io::{self, Write};
use std::path::Path;

use crate::commands::metrics::SelectionMetrics;

/// Renders `data` in the configured format. `Text` prints `plain_text` when
/// given and falls back to pretty JSON otherwise.
pub fn render_data_or_text<T: Serialize>(
    data: &T,
    plain_text: Option<String>,
    config: &Config,
    root_name: &str,
) -> Result<String> {
    let format = OutputFormat::parse(&config.output.format)?;
    match (format, plain_text) {
        (OutputFormat::Text, Some(text)) => Ok(text),
        (OutputFormat::Text, None) => {
            Ok(output_formats::serialize_context_to_json(data, true)?)
        }
        (structured, _) => Ok(serialize_structured(
            data,
            structured,
            root_name,
            config.output.json_minify,
            config.output.xml_pretty_print,
        )?),
    }
}

pub fn print_data_or_text<T: Serialize>(
    data: &T,
    plain_text: Option<String>,
    config: &Config,
    root_name: &str,
) -> Result<()> {
    let content = render_data_or_text(data, plain_text, config, root_name)?;
    write_to_stdout(&content)
}

pub fn write_to_file(path: &Path, content: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory {}", parent.display()))?;
    }
    let mut file =
        File::create(path).with_context(|| format!("Failed to create file {}", path.display()))?;
    file.write_all(content.as_bytes())
        .with_context(|| format!("Failed to write to file {}", path.display()))?;
    Ok(())
}

pub fn write_to_stdout(content: &str) -> Result<()> {
    let stdout = io::stdout();
    let mut handle = stdout.lock();
    handle
        .write_all(content.as_bytes())
        .context("Failed to write to stdout")?;
    if !content.ends_with('\n') {
        handle
            .write_all(b"\n")
            .context("Failed to write newline to stdout")?;
    }
    handle.flush().context("Failed to flush stdout")?;
    Ok(())
}

fn colored_marker(state: TriState) -> ColoredString {
    match state {
        TriState::FullySelected => state.marker().green().bold(),
        TriState::Partial => state.marker().yellow().bold(),
        TriState::NotSelected => state.marker().dimmed(),
    }
}

/// Draws the tree with one checkbox marker per node, like the picker's rows.
pub fn render_tree_text(root: &TreeNode) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "{} {}\n",
        colored_marker(root.state),
        root.name.blue().bold()
    ));
    if let Some(children) = &root.children {
        render_children(children, "", &mut out);
    }
    out
}

fn render_children(children: &[TreeNode], prefix: &str, out: &mut String) {
    for (idx, child) in children.iter().enumerate() {
        let last = idx + 1 == children.len();
        let branch = if last { "└── " } else { "├── " };
        let name = match child.kind {
            EntryKind::Directory if child.unreadable => {
                format!("{}/ (unreadable)", child.name).red().to_string()
            }
            EntryKind::Directory if child.children.is_none() => {
                format!("{}/ …", child.name).blue().to_string()
            }
            EntryKind::Directory => format!("{}/", child.name).blue().to_string(),
            EntryKind::File => child.name.clone(),
        };
        out.push_str(&format!(
            "{}{}{} {}\n",
            prefix,
            branch.dimmed(),
            colored_marker(child.state),
            name
        ));
        if let Some(grandchildren) = &child.children {
            let next_prefix = format!("{}{}", prefix, if last { "    " } else { "│   " });
            render_children(grandchildren, &next_prefix, out);
        }
    }
}

pub fn print_metrics_pretty_table(metrics: &SelectionMetrics) -> Result<()> {
    println!();
    println!("{}", " Selection Metrics ".green().bold().underline());
    println!(
        "{:<20} {}",
        "Project:".green(),
        metrics.project_name.cyan()
    );
    println!(
        "{:<20} {}",
        "Total Files:".green(),
        metrics.total_files.to_string().cyan()
    );
    println!(
        "{:<20} {}",
        "Total Lines:".green(),
        metrics.total_lines.to_string().cyan()
    );
    println!(
        "{:<20} {}",
        "Total Size:".green(),
        metrics.total_bytes_readable.cyan()
    );
    println!(
        "{:<20} {} ({})",
        "Tokens:".green(),
        metrics.total_tokens.to_string().cyan(),
        metrics.tokenizer.dimmed()
    );

    if metrics.files.is_empty() {
        println!("\n{}", "(No files selected)".yellow());
    } else {
        println!("\n{}", " File Details ".green().bold().underline());
        let mut table = Table::new();
        table
            .load_preset(UTF8_FULL)
            .set_content_arrangement(ContentArrangement::Dynamic);
        table.set_header(vec![
            Cell::new("Path").fg(Color::Green),
            Cell::new("Lines").fg(Color::Green),
            Cell::new("Size").fg(Color::Green),
            Cell::new("Tokens").fg(Color::Green),
        ]);
        for file in &metrics.files {
            table.add_row(vec![
                Cell::new(&file.path).fg(Color::Cyan),
                Cell::new(file.lines).set_alignment(CellAlignment::Right),
                Cell::new(&file.bytes_readable)
                    .set_alignment(CellAlignment::Right)
                    .fg(Color::DarkGrey),
                Cell::new(file.tokens).set_alignment(CellAlignment::Right),
            ]);
        }
        println!("{table}");
    }
    println!();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::path::PathBuf;

    fn node(name: &str, kind: EntryKind, state: TriState, children: Option<Vec<TreeNode>>) -> TreeNode {
        TreeNode {
            name: name.to_string(),
            path: PathBuf::from("/proj").join(name),
            kind,
            state,
            unreadable: false,
            children,
        }
    }

    #[test]
    fn tree_text_draws_markers_and_branches() {
        colored::control::set_override(false);
        let tree = node(
            "proj",
            EntryKind::Directory,
            TriState::Partial,
            Some(vec![
                node(
                    "src",
                    EntryKind::Directory,
                    TriState::FullySelected,
                    Some(vec![node("lib.rs", EntryKind::File, TriState::FullySelected, None)]),
                ),
                node("docs", EntryKind::Directory, TriState::NotSelected, None),
                node("README.md", EntryKind::File, TriState::NotSelected, None),
            ]),
        );
        assert_eq!(
            render_tree_text(&tree),
            "[-] proj\n\
             ├── [x] src/\n\
             │   └── [x] lib.rs\n\
             ├── [ ] docs/ …\n\
             └── [ ] README.md\n"
        );
    }

    #[test]
    fn text_format_prefers_plain_text() {
        let config = Config::default();
        let out = render_data_or_text(&vec![1, 2], Some("plain".into()), &config, "root").unwrap();
        assert_eq!(out, "plain");
        let out = render_data_or_text(&vec![1, 2], None, &config, "root").unwrap();
        assert_eq!(out, "[\n  1,\n  2\n]");
    }

    #[test]
    fn json_format_respects_minify() {
        let mut config = Config::default();
        config.output.format = "json".into();
        let out = render_data_or_text(&vec![1, 2], Some("plain".into()), &config, "root").unwrap();
        assert_eq!(out, "[1,2]");
    }
}
