//! Input discovery for directory mode

use shapegate_core::RdfFormat;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DiscoveryError {
    #[error("cannot read directory {path}: {reason}")]
    Unreadable { path: PathBuf, reason: String },

    #[error("directory {0} contains no graph files")]
    Empty(PathBuf),
}

/// Regular files (or links to them) directly inside `dir` with a
/// graph-source extension, sorted by file name.
pub async fn discover_inputs(dir: &Path) -> Result<Vec<PathBuf>, DiscoveryError> {
    let unreadable = |e: std::io::Error| DiscoveryError::Unreadable {
        path: dir.to_path_buf(),
        reason: e.to_string(),
    };

    let mut entries = tokio::fs::read_dir(dir).await.map_err(unreadable)?;
    let mut files = Vec::new();
    while let Some(entry) = entries.next_entry().await.map_err(unreadable)? {
        let file_type = entry.file_type().await.map_err(unreadable)?;
        let path = entry.path();
        // リンクは辿る。切れたリンクは入力として残し読み込み時に失敗させる
        let is_file = match tokio::fs::metadata(&path).await {
            Ok(metadata) => metadata.is_file(),
            Err(_) => file_type.is_symlink(),
        };
        if is_file {
            files.push(path);
        }
    }

    let inputs = select_graph_files(files);
    debug!(dir = %dir.display(), inputs = inputs.len(), "inputs discovered");
    if inputs.is_empty() {
        return Err(DiscoveryError::Empty(dir.to_path_buf()));
    }
    Ok(inputs)
}

/// Keep graph sources and order them lexically by file name
pub fn select_graph_files(candidates: Vec<PathBuf>) -> Vec<PathBuf> {
    let mut selected: Vec<PathBuf> = candidates
        .into_iter()
        .filter(|path| is_graph_file(path))
        .collect();
    selected.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    selected
}

pub fn is_graph_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| RdfFormat::EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}
