use std::path::{Component, Path};

use guidance_core::{FillOptions, MergeOptions};
use serde::{Deserialize, Serialize};

use crate::{Result, StoreError};

const CONFIG_FILE_NAMES: &[&str] = &["guidance.toml", "guidance.json"];
const GUIDANCE_DIR_ENV: &str = "GUIDANCE_DIR";

const KNOWN_KEYS: &[&str] = &[
    "guidance_dir",
    "preserve_existing_comments",
    "expect_comment_tag",
    "max_generate_per_file",
];

/// Project-level settings for the guidance store
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GuidanceConfig {
    /// Directory (relative to the project root) holding guidance files
    pub guidance_dir: String,

    /// Carry persisted comments over to members parsed without one
    pub preserve_existing_comments: bool,

    /// Generators are prompted to answer inside `<comment>` tags
    pub expect_comment_tag: bool,

    /// Upper bound on generator calls per file
    pub max_generate_per_file: usize,
}

impl Default for GuidanceConfig {
    fn default() -> Self {
        Self {
            guidance_dir: ".guidance".to_string(),
            preserve_existing_comments: true,
            expect_comment_tag: true,
            max_generate_per_file: 32,
        }
    }
}

impl GuidanceConfig {
    /// Load `guidance.toml` / `guidance.json` from `root`, or defaults.
    ///
    /// `GUIDANCE_DIR` in the environment overrides `guidance_dir`.
    pub fn load(root: &Path) -> Result<Self> {
        let mut config = Self::default();
        for name in CONFIG_FILE_NAMES {
            let path = root.join(name);
            if path.is_file() {
                let bytes = std::fs::read(&path)?;
                config = Self::from_bytes(&bytes).map_err(|err| match err {
                    StoreError::InvalidConfig(msg) => {
                        StoreError::InvalidConfig(format!("{}: {msg}", path.display()))
                    }
                    other => other,
                })?;
                log::debug!("loaded guidance config from {}", path.display());
                break;
            }
        }

        if let Ok(dir) = std::env::var(GUIDANCE_DIR_ENV) {
            if !dir.trim().is_empty() {
                config.guidance_dir = dir;
            }
        }

        config.validate()?;
        Ok(config)
    }

    /// Parse JSON, falling back to TOML.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let value: serde_json::Value = match serde_json::from_slice(bytes) {
            Ok(value) => value,
            Err(json_err) => {
                let text = std::str::from_utf8(bytes)
                    .map_err(|err| StoreError::InvalidConfig(format!("{json_err}; {err}")))?;
                let toml_value: toml::Value = toml::from_str(text).map_err(|toml_err| {
                    StoreError::InvalidConfig(format!(
                        "config is not valid JSON or TOML ({json_err}); TOML parse error: {toml_err}"
                    ))
                })?;
                serde_json::to_value(toml_value)?
            }
        };

        let Some(obj) = value.as_object() else {
            return Err(StoreError::InvalidConfig(
                "config must be a table/object".to_string(),
            ));
        };
        let unknown: Vec<&str> = obj
            .keys()
            .map(String::as_str)
            .filter(|key| !KNOWN_KEYS.contains(key))
            .collect();
        if !unknown.is_empty() {
            return Err(StoreError::InvalidConfig(format!(
                "unknown keys: {}",
                unknown.join(", ")
            )));
        }

        let config: Self = serde_json::from_value(value)
            .map_err(|err| StoreError::InvalidConfig(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        let dir = Path::new(&self.guidance_dir);
        if self.guidance_dir.trim().is_empty() {
            return Err(StoreError::InvalidConfig(
                "guidance_dir must not be empty".to_string(),
            ));
        }
        if dir.is_absolute() || dir.components().any(|c| matches!(c, Component::ParentDir)) {
            return Err(StoreError::InvalidConfig(format!(
                "guidance_dir must be a relative path inside the project: {}",
                self.guidance_dir
            )));
        }
        if self.max_generate_per_file == 0 {
            return Err(StoreError::InvalidConfig(
                "max_generate_per_file must be > 0".to_string(),
            ));
        }
        Ok(())
    }

    #[must_use]
    pub const fn merge_options(&self) -> MergeOptions {
        MergeOptions {
            preserve_existing_comments: self.preserve_existing_comments,
        }
    }

    #[must_use]
    pub const fn fill_options(&self) -> FillOptions {
        FillOptions {
            max_requests: self.max_generate_per_file,
            expect_comment_tag: self.expect_comment_tag,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn defaults_are_valid() {
        let config = GuidanceConfig::default();
        assert!(config.validate().is_ok());
        assert!(config.merge_options().preserve_existing_comments);
        assert_eq!(config.fill_options().max_requests, 32);
    }

    #[test]
    fn parses_toml_and_json() {
        let toml = b"guidance_dir = \"docs/guidance\"\npreserve_existing_comments = false\n";
        let config = GuidanceConfig::from_bytes(toml).unwrap();
        assert_eq!(config.guidance_dir, "docs/guidance");
        assert!(!config.preserve_existing_comments);
        assert!(config.expect_comment_tag);

        let json = br#"{"max_generate_per_file": 4}"#;
        let config = GuidanceConfig::from_bytes(json).unwrap();
        assert_eq!(config.max_generate_per_file, 4);
        assert_eq!(config.guidance_dir, ".guidance");
    }

    #[test]
    fn rejects_unknown_keys_by_name() {
        let err = GuidanceConfig::from_bytes(b"guidance_dri = \"x\"\nmystery = 1\n").unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("guidance_dri"), "{msg}");
        assert!(msg.contains("mystery"), "{msg}");
    }

    #[test]
    fn rejects_escaping_guidance_dir() {
        for bad in [r#"{"guidance_dir": "../elsewhere"}"#, r#"{"guidance_dir": ""}"#] {
            assert!(GuidanceConfig::from_bytes(bad.as_bytes()).is_err(), "{bad}");
        }
        assert!(GuidanceConfig::from_bytes(br#"{"max_generate_per_file": 0}"#).is_err());
        assert!(GuidanceConfig::from_bytes(b"[1, 2]").is_err());
    }

    #[test]
    fn load_reads_project_file() {
        let temp = tempfile::tempdir().unwrap();
        std::fs::write(
            temp.path().join("guidance.toml"),
            "expect_comment_tag = false\n",
        )
        .unwrap();
        let config = GuidanceConfig::load(temp.path()).unwrap();
        assert!(!config.expect_comment_tag);
    }
}
