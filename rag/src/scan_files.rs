use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;
use walkdir::WalkDir;

use crate::error::{RagError, Result};

const CORPUS_EXTS: &[&str] = &[".txt", ".md"];

/// Reads the corpus from a single file, or from every text file under a directory
/// (sorted by path, joined with a blank line so paragraph splitting keeps file boundaries).
pub fn load_corpus(path: &Path) -> Result<String> {
    let meta = fs::metadata(path).map_err(|e| RagError::io(path, e))?;
    if meta.is_file() {
        return fs::read_to_string(path).map_err(|e| RagError::io(path, e));
    }

    let files = scan_files(path);
    if files.is_empty() {
        return Err(RagError::Config(format!(
            "no corpus files found under {}",
            path.display()
        )));
    }

    let mut parts = Vec::with_capacity(files.len());
    for file in files {
        let text = fs::read_to_string(&file).map_err(|e| RagError::io(&file, e))?;
        if text.trim().is_empty() {
            continue;
        }
        debug!(path = %file.display(), bytes = text.len(), "loaded corpus file");
        parts.push(text.trim_end().to_string());
    }
    Ok(parts.join("\n\n"))
}

fn scan_files(base: &Path) -> Vec<PathBuf> {
    let mut results: Vec<PathBuf> = WalkDir::new(base)
        .into_iter()
        .filter_entry(|e| e.depth() == 0 || !e.file_name().to_string_lossy().starts_with('.'))
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file() && is_text_file(entry.path()))
        .map(|entry| entry.into_path())
        .collect();
    results.sort();
    results
}

fn is_text_file(path: &Path) -> bool {
    let lower = path.to_string_lossy().to_lowercase();
    CORPUS_EXTS.iter().any(|ext| lower.ends_with(ext))
}
