//! Extension installation.
//!
//! Three install sources are supported: a `.tar.gz` package, a single entry
//! file (script or native), and a plain directory. All of them converge on a
//! canonical extension directory under the store's installed root with a
//! `package.json` at its top; the manager then registers the result and loads
//! it if enabled.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use flate2::read::GzDecoder;
use tar::Archive;
use tracing::{debug, info};
use walkdir::WalkDir;

use super::error::{ExtensionError, ExtensionResult};
use super::manifest::{ExtensionManifest, MANIFEST_FILE};

/// Maximum length of a name synthesized from a single-file install.
const MAX_SYNTHESIZED_NAME: usize = 50;

/// Materializes install sources as canonical extension directories.
#[derive(Debug, Clone)]
pub struct Installer {
    installed_root: PathBuf,
}

impl Installer {
    pub fn new(installed_root: impl Into<PathBuf>) -> Self {
        Self {
            installed_root: installed_root.into(),
        }
    }

    /// Install from any supported source, dispatching on its shape.
    pub fn install(&self, source: &Path) -> ExtensionResult<ExtensionManifest> {
        if source.is_file() && is_archive(source) {
            self.install_from_archive(source)
        } else if source.is_file() {
            self.install_single_file(source)
        } else if source.is_dir() {
            self.install_from_directory(source)
        } else {
            Err(ExtensionError::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("invalid install source: {}", source.display()),
            )))
        }
    }

    /// Extract a `.tar.gz` package to scratch space and install the first
    /// directory containing a manifest.
    ///
    /// The scratch directory is removed when the `TempDir` drops, whatever
    /// the outcome.
    pub fn install_from_archive(&self, archive_path: &Path) -> ExtensionResult<ExtensionManifest> {
        let scratch = tempfile::tempdir()?;

        let file = fs::File::open(archive_path)?;
        let mut archive = Archive::new(GzDecoder::new(file));
        archive.unpack(scratch.path())?;

        let manifest_dir = find_manifest_dir(scratch.path())
            .ok_or_else(|| ExtensionError::NoManifestFound(archive_path.to_path_buf()))?;

        debug!(
            "found manifest in archive {} at {}",
            archive_path.display(),
            manifest_dir.display()
        );
        self.install_from_directory(&manifest_dir)
    }

    /// Install a lone entry file by synthesizing a minimal manifest around it.
    pub fn install_single_file(&self, file_path: &Path) -> ExtensionResult<ExtensionManifest> {
        let file_name = file_path
            .file_name()
            .map(|f| f.to_string_lossy().into_owned())
            .ok_or_else(|| {
                ExtensionError::Io(std::io::Error::new(
                    std::io::ErrorKind::InvalidInput,
                    format!("not a file: {}", file_path.display()),
                ))
            })?;

        let kind_label = if file_name.ends_with(".js") {
            "Script"
        } else if file_name.ends_with(".rhai") {
            "Native"
        } else {
            return Err(ExtensionError::UnsupportedKind(file_name));
        };

        let stem = file_path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let name = sanitize_name(&stem);

        let dest_dir = self.installed_root.join(&name);
        fs::create_dir_all(&dest_dir)?;
        fs::copy(file_path, dest_dir.join(&file_name))?;

        let mut contributes = BTreeMap::new();
        contributes.insert("commands".to_string(), serde_json::json!([]));
        contributes.insert("menus".to_string(), serde_json::json!({}));
        contributes.insert("views".to_string(), serde_json::json!({}));

        let manifest = ExtensionManifest {
            name: name.clone(),
            description: format!("{kind_label} extension: {name}"),
            main: file_name,
            contributes,
            manifest_path: dest_dir.join(MANIFEST_FILE),
            ..Default::default()
        };
        manifest.save()?;

        info!("installed single-file extension '{name}'");
        Ok(manifest)
    }

    /// Copy a whole extension directory into the store.
    ///
    /// An existing extension with the same name is deleted first; there is no
    /// in-place merging.
    pub fn install_from_directory(&self, source: &Path) -> ExtensionResult<ExtensionManifest> {
        let manifest_path = source.join(MANIFEST_FILE);
        if !manifest_path.exists() {
            return Err(ExtensionError::NoManifestFound(source.to_path_buf()));
        }

        // Read just enough to learn the name
        let raw: serde_json::Value = serde_json::from_str(&fs::read_to_string(&manifest_path)?)?;
        let name = raw
            .get("name")
            .and_then(|v| v.as_str())
            .map(str::to_string)
            .or_else(|| source.file_name().map(|f| f.to_string_lossy().into_owned()))
            .unwrap_or_else(|| "extension".to_string());

        let dest_dir = self.installed_root.join(sanitize_name(&name));
        if dest_dir.exists() {
            fs::remove_dir_all(&dest_dir)?;
        }
        copy_dir(source, &dest_dir)?;

        let manifest = ExtensionManifest::load(&dest_dir.join(MANIFEST_FILE));
        info!("installed extension '{}' v{}", manifest.name, manifest.version);
        Ok(manifest)
    }
}

/// Whether `path` names a supported extension package archive.
fn is_archive(path: &Path) -> bool {
    let name = path
        .file_name()
        .map(|f| f.to_string_lossy().into_owned())
        .unwrap_or_default();
    name.ends_with(".tar.gz") || name.ends_with(".tgz")
}

/// First directory under `root` containing a manifest file, depth-first.
fn find_manifest_dir(root: &Path) -> Option<PathBuf> {
    for entry in WalkDir::new(root).sort_by_file_name().into_iter().flatten() {
        if entry.file_type().is_file() && entry.file_name() == MANIFEST_FILE {
            return entry.path().parent().map(Path::to_path_buf);
        }
    }
    None
}

/// Recursively copy `source` into `dest`.
fn copy_dir(source: &Path, dest: &Path) -> ExtensionResult<()> {
    for entry in WalkDir::new(source) {
        let entry = entry.map_err(|e| {
            ExtensionError::Io(e.into_io_error().unwrap_or_else(|| {
                std::io::Error::new(std::io::ErrorKind::Other, "walk failed")
            }))
        })?;
        let rel = match entry.path().strip_prefix(source) {
            Ok(rel) => rel,
            Err(_) => continue,
        };
        let target = dest.join(rel);
        if entry.file_type().is_dir() {
            fs::create_dir_all(&target)?;
        } else {
            if let Some(parent) = target.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::copy(entry.path(), &target)?;
        }
    }
    Ok(())
}

/// Sanitize a free-form name into a storage-directory key: whitespace and
/// separators become underscores, bounded length.
fn sanitize_name(raw: &str) -> String {
    raw.chars()
        .map(|c| {
            if c.is_whitespace() || c == '.' || c == '/' || c == '\\' {
                '_'
            } else {
                c
            }
        })
        .take(MAX_SYNTHESIZED_NAME)
        .collect()
}
