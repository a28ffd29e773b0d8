//! Browsing commands: `tree`, `search` and `info`.

use console::style;
use jnuexam::format_size;
use jnuexam::manifest::{Catalog, DirNode, FileEntry};
use jnuexam::session::Session;

use super::common::load_catalog;
use crate::error::CliError;

/// Print the directory tree, optionally starting below `path`.
pub async fn run_tree(
    session: &Session,
    path: Option<&str>,
    max_depth: Option<usize>,
    show_files: bool,
) -> Result<(), CliError> {
    let catalog = load_catalog(session, true).await?;
    let start = find_start(&catalog, path)?;
    print!("{}", render_tree(start, max_depth, show_files));
    println!(
        "{} directories, {} files, {}",
        start.dir_count(),
        start.file_count(),
        format_size(start.total_size())
    );
    Ok(())
}

fn find_start<'a>(catalog: &'a Catalog, path: Option<&str>) -> Result<&'a DirNode, CliError> {
    let path = path.unwrap_or("").trim_matches('/');
    catalog
        .tree()
        .find_dir(path)
        .ok_or_else(|| CliError::Config(format!("No directory '{}' in the file list", path)))
}

/// Render `node` and its descendants as an indented listing.
pub fn render_tree(node: &DirNode, max_depth: Option<usize>, show_files: bool) -> String {
    let mut out = String::new();
    node.walk(|dir, depth| {
        if max_depth.is_some_and(|max| depth > max) {
            return;
        }
        let indent = "  ".repeat(depth);
        let label = if dir.full_path == node.full_path {
            if dir.is_root() {
                "/".to_string()
            } else {
                format!("{}/", dir.full_path)
            }
        } else {
            format!("{}/", dir.name)
        };
        out.push_str(&format!("{}{}\n", indent, label));

        if show_files && max_depth.map_or(true, |max| depth < max) {
            for file in &dir.files {
                out.push_str(&format!("{}  {}  ({})\n", indent, file.name, file.display_size()));
            }
        }
    });
    out
}

/// Print files whose name contains `query`.
pub async fn run_search(session: &Session, query: &str) -> Result<(), CliError> {
    load_catalog(session, true).await?;
    let results = session.search(query)?;

    if results.is_empty() {
        println!("No files match '{}'", query);
        return Ok(());
    }

    for entry in &results {
        println!("{:>10}  {}", entry.display_size(), entry.path);
    }
    println!();
    println!("{} match(es)", results.len());
    Ok(())
}

/// Print details for one file, including which sources host it.
pub async fn run_info(session: &Session, path: &str) -> Result<(), CliError> {
    load_catalog(session, true).await?;
    let entry = session.select(path)?;
    print!("{}", render_info(session, &entry));
    Ok(())
}

fn render_info(session: &Session, entry: &FileEntry) -> String {
    let current = session.current_source();
    let mut out = String::new();
    out.push_str(&format!("Name:  {}\n", entry.name));
    out.push_str(&format!("Path:  {}\n", entry.path));
    out.push_str(&format!("Size:  {} ({} bytes)\n", entry.display_size(), entry.size));
    out.push_str("Sources:\n");

    for source in session.sources().iter() {
        let marker = if source.id == current.id { "*" } else { " " };
        let url = match source.file_url(entry) {
            Some(url) => url.to_string(),
            None => style("not available").dim().to_string(),
        };
        out.push_str(&format!("  {} {:<11} {}\n", marker, source.id, url));
    }
    out
}
