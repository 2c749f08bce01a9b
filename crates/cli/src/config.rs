//! Optional `bindpath.toml` configuration.
//!
//! ```toml
//! [runner]
//! oracle = "builtin"        # or "tsc"
//! extensions = ["bind"]
//!
//! [tsc]
//! program = "node_modules/.bin/tsc"
//! project = "tsconfig.json"
//!
//! [limits]
//! max_union_members = 1000000
//! ```
//!
//! Every key is optional; command-line flags take precedence.

use std::path::{Path, PathBuf};

use clap::ValueEnum;
use serde::Deserialize;
use thiserror::Error;

pub const CONFIG_FILE_NAME: &str = "bindpath.toml";

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OracleKind {
    Builtin,
    Tsc,
}

impl OracleKind {
    pub fn default_extension(self) -> &'static str {
        match self {
            OracleKind::Builtin => "bind",
            OracleKind::Tsc => "ts",
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: toml::de::Error,
    },
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    pub runner: RunnerSection,
    pub tsc: TscSection,
    pub limits: LimitsSection,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RunnerSection {
    pub oracle: Option<OracleKind>,
    pub extensions: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TscSection {
    pub program: Option<String>,
    pub project: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LimitsSection {
    pub max_union_members: Option<u64>,
}

impl FileConfig {
    pub fn parse(path: &Path, text: &str) -> Result<FileConfig, ConfigError> {
        toml::from_str(text).map_err(|source| ConfigError::Parse {
            path: path.display().to_string(),
            source,
        })
    }

    /// Load `explicit` if given, otherwise `<dir>/bindpath.toml` when it
    /// exists. No file at all yields the defaults.
    pub fn load(explicit: Option<&Path>, dir: &Path) -> Result<FileConfig, ConfigError> {
        let path = match explicit {
            Some(p) => p.to_path_buf(),
            None => {
                let candidate = dir.join(CONFIG_FILE_NAME);
                if !candidate.is_file() {
                    return Ok(FileConfig::default());
                }
                candidate
            }
        };
        let text = std::fs::read_to_string(&path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        FileConfig::parse(&path, &text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_file_parses() {
        let cfg = FileConfig::parse(
            Path::new("bindpath.toml"),
            r#"
                [runner]
                oracle = "tsc"
                extensions = ["ts", "tsx"]

                [tsc]
                program = "node_modules/.bin/tsc"
                project = "tsconfig.json"

                [limits]
                max_union_members = 5000
            "#,
        )
        .unwrap();
        assert_eq!(cfg.runner.oracle, Some(OracleKind::Tsc));
        assert_eq!(cfg.runner.extensions.as_deref(), Some(&["ts".to_string(), "tsx".to_string()][..]));
        assert_eq!(cfg.tsc.program.as_deref(), Some("node_modules/.bin/tsc"));
        assert_eq!(cfg.tsc.project, Some(PathBuf::from("tsconfig.json")));
        assert_eq!(cfg.limits.max_union_members, Some(5000));
    }

    #[test]
    fn empty_file_is_all_defaults() {
        let cfg = FileConfig::parse(Path::new("x.toml"), "").unwrap();
        assert_eq!(cfg, FileConfig::default());
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let err = FileConfig::parse(Path::new("x.toml"), "[runner]\noracel = \"tsc\"\n").unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn missing_default_file_is_fine() {
        let cfg = FileConfig::load(None, Path::new("/definitely/not/here")).unwrap();
        assert_eq!(cfg, FileConfig::default());
        assert!(FileConfig::load(Some(Path::new("/definitely/not/here.toml")), Path::new(".")).is_err());
    }
}
