use std::path::Path;

use tracing::{debug, info, warn};
use walkdir::{DirEntry, WalkDir};

use crate::error::ConfigError;
use crate::models::{Ecosystem, Manifest};

/// Directories that hold installed or generated code rather than manifests
/// the project itself declares.
const SKIPPED_DIRS: [&str; 9] = [
    ".git",
    "node_modules",
    "target",
    "vendor",
    ".venv",
    "venv",
    "__pycache__",
    "bin",
    "obj",
];

/// Map a file name to the ecosystem whose manifest it is.
pub fn ecosystem_for(file_name: &str) -> Option<Ecosystem> {
    match file_name {
        "package.json" => Some(Ecosystem::Npm),
        "Gemfile" => Some(Ecosystem::Gem),
        "composer.json" => Some(Ecosystem::Composer),
        "Cargo.toml" => Some(Ecosystem::Cargo),
        name if name.ends_with("requirements.txt") => Some(Ecosystem::Pip),
        name if [".csproj", ".fsproj", ".vbproj"]
            .iter()
            .any(|ext| name.ends_with(ext)) =>
        {
            Some(Ecosystem::NuGet)
        }
        _ => None,
    }
}

/// Recursively find manifest files under `root`, sorted by path.
///
/// A manifest that cannot be read is logged and left out. Only an unreadable
/// `root` is an error.
pub fn discover_manifests(root: &Path) -> Result<Vec<Manifest>, ConfigError> {
    std::fs::read_dir(root).map_err(|source| ConfigError::UnreadableTarget {
        path: root.to_path_buf(),
        source,
    })?;

    let mut manifests = Vec::new();
    let walker = WalkDir::new(root).sort_by_file_name().into_iter();

    for entry in walker.filter_entry(|e| e.depth() == 0 || !is_skipped(e)) {
        let entry = match entry {
            Ok(e) => e,
            Err(e) => {
                warn!("Cannot read {}: {}", e.path().unwrap_or(root).display(), e);
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }
        let Some(ecosystem) = ecosystem_for(&entry.file_name().to_string_lossy()) else {
            continue;
        };

        let path = entry.into_path();
        match std::fs::read_to_string(&path) {
            Ok(content) => {
                info!("Found {} manifest: {}", ecosystem, path.display());
                manifests.push(Manifest {
                    ecosystem,
                    path,
                    content,
                });
            }
            Err(e) => warn!("Cannot read manifest {}: {}", path.display(), e),
        }
    }
    manifests.sort_by(|a, b| a.path.cmp(&b.path));

    info!("Found {} manifest(s) under {}", manifests.len(), root.display());
    Ok(manifests)
}

fn is_skipped(entry: &DirEntry) -> bool {
    let skipped = entry.file_type().is_dir()
        && entry
            .file_name()
            .to_str()
            .is_some_and(|name| SKIPPED_DIRS.contains(&name));
    if skipped {
        debug!("Skipping {}", entry.path().display());
    }
    skipped
}
