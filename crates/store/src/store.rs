use std::path::{Component, Path, PathBuf};

use guidance_core::Document;
use walkdir::WalkDir;

use crate::codec::{decode, encode, LoadedDocument};
use crate::config::GuidanceConfig;
use crate::{Result, StoreError};

const GUIDANCE_EXTENSION: &str = "json";

/// Guidance files of one project, laid out as `<root>/<guidance_dir>/<source>.json`.
///
/// Writes to one path must be serialized by the caller; distinct sources can
/// be processed in parallel.
#[derive(Debug, Clone)]
pub struct GuidanceStore {
    root: PathBuf,
    config: GuidanceConfig,
}

impl GuidanceStore {
    pub fn new(root: impl Into<PathBuf>, config: GuidanceConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            root: root.into(),
            config,
        })
    }

    /// Open a store using the project's own config file (if any)
    pub fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        let config = GuidanceConfig::load(&root)?;
        Ok(Self { root, config })
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    #[must_use]
    pub const fn config(&self) -> &GuidanceConfig {
        &self.config
    }

    #[must_use]
    pub fn guidance_dir(&self) -> PathBuf {
        self.root.join(&self.config.guidance_dir)
    }

    /// Where the guidance for `source` lives
    pub fn path_for_source(&self, source: &str) -> Result<PathBuf> {
        let rel = normalize_source(source)?;
        Ok(self
            .guidance_dir()
            .join(format!("{rel}.{GUIDANCE_EXTENSION}")))
    }

    /// Load the stored guidance for `source`.
    ///
    /// A missing or undecodable file is `Ok(None)`; only real I/O failures are
    /// errors.
    pub fn load(&self, source: &str) -> Result<Option<LoadedDocument>> {
        let path = self.path_for_source(source)?;
        let bytes = match std::fs::read(&path) {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(err.into()),
        };

        let Some(loaded) = decode(&bytes) else {
            log::warn!(
                "ignoring unreadable guidance file {} (treated as absent)",
                path.display()
            );
            return Ok(None);
        };
        if loaded.leaked_prompt_detected {
            log::warn!("dropped leaked prompt text from {}", path.display());
        }
        Ok(Some(loaded))
    }

    /// Persist `document` atomically, creating directories as needed
    pub fn save(&self, document: &Document) -> Result<PathBuf> {
        let path = self.path_for_source(&document.source)?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let bytes = encode(document)?;
        let tmp = path.with_extension(format!("{GUIDANCE_EXTENSION}.tmp"));
        std::fs::write(&tmp, bytes)?;
        std::fs::rename(&tmp, &path)?;
        log::info!("wrote guidance {}", path.display());
        Ok(path)
    }

    /// Delete the guidance for `source`; returns whether a file existed
    pub fn remove(&self, source: &str) -> Result<bool> {
        let path = self.path_for_source(source)?;
        match std::fs::remove_file(&path) {
            Ok(()) => Ok(true),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(err) => Err(err.into()),
        }
    }

    /// Source paths of every stored guidance file, sorted
    pub fn list_sources(&self) -> Result<Vec<String>> {
        let dir = self.guidance_dir();
        if !dir.is_dir() {
            return Ok(Vec::new());
        }

        let mut sources = Vec::new();
        for entry in WalkDir::new(&dir).follow_links(false) {
            let entry = entry.map_err(|err| StoreError::IoError(err.into()))?;
            if !entry.file_type().is_file() {
                continue;
            }
            let Ok(rel) = entry.path().strip_prefix(&dir) else {
                continue;
            };
            let rel = rel.to_string_lossy().replace('\\', "/");
            if let Some(source) = rel.strip_suffix(".json") {
                sources.push(source.to_string());
            }
        }
        sources.sort();
        Ok(sources)
    }
}

/// Normalise a source path to a forward-slash relative path.
pub(crate) fn normalize_source(source: &str) -> Result<String> {
    let cleaned = source.replace('\\', "/");
    let mut parts = Vec::new();
    for component in Path::new(&cleaned).components() {
        match component {
            Component::Normal(part) => parts.push(part.to_string_lossy().into_owned()),
            Component::CurDir | Component::RootDir | Component::Prefix(_) => {}
            Component::ParentDir => {
                return Err(StoreError::InvalidPath(format!(
                    "source path escapes the project: {source}"
                )));
            }
        }
    }
    if parts.is_empty() {
        return Err(StoreError::InvalidPath(format!(
            "empty source path: {source:?}"
        )));
    }
    Ok(parts.join("/"))
}
