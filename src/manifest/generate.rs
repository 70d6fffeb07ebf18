//! Manifest generation from a build output directory
//!
//! Walks the directory deterministically, fingerprints every servable file
//! and picks the shell files from the configured candidates.

use crate::config::schema::BuildConfig;
use crate::error::{SwsyncError, SwsyncResult};
use crate::manifest::{BuildManifest, ResourceManifest, ShellFiles, ROOT_KEY};
use sha2::{Digest, Sha256};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Document served for the root key
const ENTRY_DOCUMENT: &str = "index.html";

/// Fingerprint file contents: first 16 bytes of SHA256 as hex
pub fn fingerprint(contents: &[u8]) -> String {
    let digest = Sha256::digest(contents);
    hex::encode(&digest[..16])
}

/// Generate a build manifest for `build_dir`.
///
/// `progress` is called once per file with `(index, total, key)` before the
/// file is hashed.
pub fn generate(
    build_dir: &Path,
    config: &BuildConfig,
    progress: &dyn Fn(usize, usize, &str),
) -> SwsyncResult<BuildManifest> {
    if !build_dir.is_dir() {
        return Err(SwsyncError::PathNotFound(build_dir.to_path_buf()));
    }

    let files = collect_files(build_dir, config)?;
    let total = files.len();
    let mut resources = ResourceManifest::new();

    for (index, (key, path)) in files.iter().enumerate() {
        progress(index, total, key);
        let contents = fs::read(path)
            .map_err(|e| SwsyncError::io(format!("reading {}", path.display()), e))?;
        resources.insert(key.clone(), fingerprint(&contents));
    }

    if let Some(fp) = resources.get(ENTRY_DOCUMENT).map(str::to_string) {
        resources.insert(ROOT_KEY, fp);
    }

    let shell: Vec<String> = config
        .shell
        .iter()
        .filter(|candidate| resources.contains_key(candidate))
        .cloned()
        .collect();

    debug!(
        "Generated manifest with {} resources, {} shell files",
        resources.len(),
        shell.len()
    );

    let manifest = BuildManifest::new(resources, ShellFiles::new(shell));
    manifest.validate()?;
    Ok(manifest)
}

/// List servable files as `(key, path)`, sorted by key
fn collect_files(root: &Path, config: &BuildConfig) -> SwsyncResult<Vec<(String, PathBuf)>> {
    let mut files = Vec::new();
    let mut pending = vec![root.to_path_buf()];

    while let Some(dir) = pending.pop() {
        let entries = fs::read_dir(&dir)
            .map_err(|e| SwsyncError::io(format!("reading directory {}", dir.display()), e))?;

        for entry in entries {
            let entry = entry.map_err(|e| SwsyncError::io("reading directory entry", e))?;
            let path = entry.path();
            let key = relative_key(root, &path)?;

            if is_excluded(&key, config) {
                debug!("Skipping {}", key);
                continue;
            }

            let file_type = entry
                .file_type()
                .map_err(|e| SwsyncError::io(format!("inspecting {}", path.display()), e))?;
            if file_type.is_dir() {
                pending.push(path);
            } else if file_type.is_file() {
                files.push((key, path));
            }
        }
    }

    files.sort_by(|a, b| a.0.cmp(&b.0));
    Ok(files)
}

/// Forward-slash path of `path` relative to `root`
fn relative_key(root: &Path, path: &Path) -> SwsyncResult<String> {
    let relative = path
        .strip_prefix(root)
        .map_err(|_| SwsyncError::Internal(format!("{} escapes build dir", path.display())))?;

    let mut parts = Vec::new();
    for component in relative.components() {
        let part = component.as_os_str().to_str().ok_or_else(|| {
            SwsyncError::User(format!("Non UTF-8 file name in build: {}", path.display()))
        })?;
        parts.push(part);
    }
    Ok(parts.join("/"))
}

fn is_excluded(key: &str, config: &BuildConfig) -> bool {
    if !config.include_hidden && key.split('/').any(|part| part.starts_with('.')) {
        return true;
    }

    config.exclude.iter().any(|pattern| {
        let pattern = pattern.trim_matches('/');
        key == pattern || key.starts_with(&format!("{}/", pattern))
    })
}
