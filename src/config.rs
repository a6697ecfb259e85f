use std::io;
use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use thiserror::Error;
use tracing::debug;

use crate::version::error::FetchError;

// =============================================================================
// Constants
// =============================================================================

/// Timeout for a single target lookup in milliseconds (30 seconds)
pub const DEFAULT_FETCH_TIMEOUT_MS: u64 = 30_000;

/// User agent sent by the HTTP based fetchers
pub const USER_AGENT: &str = concat!("vercheck/", env!("CARGO_PKG_VERSION"));

/// Key naming the fetcher kind of a target
pub const SOURCE_KEY: &str = "source";

/// Section holding run-wide options instead of a target
pub const GLOBAL_SECTION: &str = "__config__";

/// Error raised while loading the target configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to parse {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("{}: section `{name}` is not a table", path.display())]
    InvalidSection { path: PathBuf, name: String },

    #[error("{target}: key `{key}` must be a scalar value, found {kind}")]
    InvalidValue {
        target: String,
        key: String,
        kind: &'static str,
    },

    #[error("invalid target name {name:?}: {reason}")]
    InvalidName { name: String, reason: &'static str },

    #[error("{0}: no `source` configured")]
    MissingSource(String),

    #[error("{target}: unknown source `{source_kind}`")]
    UnknownSource { target: String, source_kind: String },
}

/// Key/value options of one target, interpreted by its fetcher
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TargetConfig {
    values: IndexMap<String, String>,
}

impl TargetConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert, mostly for tests and programmatic setups
    pub fn with(mut self, key: &str, value: &str) -> Self {
        self.insert(key, value);
        self
    }

    pub fn insert(&mut self, key: &str, value: &str) {
        self.values.insert(key.to_string(), value.to_string());
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    /// Value of a key the fetcher cannot work without
    pub fn require(&self, key: &'static str) -> Result<&str, FetchError> {
        self.get(key)
            .filter(|v| !v.trim().is_empty())
            .ok_or(FetchError::MissingOption(key))
    }

    /// Boolean option; `true`, `yes`, `on` and `1` are truthy
    pub fn flag(&self, key: &str) -> bool {
        self.get(key).is_some_and(|v| {
            matches!(
                v.trim().to_ascii_lowercase().as_str(),
                "true" | "yes" | "on" | "1"
            )
        })
    }

    /// The fetcher kind this target asks for
    pub fn source(&self) -> Option<&str> {
        self.get(SOURCE_KEY)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

/// One named thing to check
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    pub name: String,
    pub config: TargetConfig,
}

impl Target {
    pub fn new(name: &str, config: TargetConfig) -> Self {
        Self {
            name: name.to_string(),
            config,
        }
    }
}

/// Run-wide options from the `[__config__]` section
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GlobalOptions {
    pub oldver: Option<PathBuf>,
    pub newver: Option<PathBuf>,
    pub notify: Option<bool>,
}

/// Everything loaded from the configuration files
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CheckConfig {
    pub targets: Vec<Target>,
    pub global: GlobalOptions,
}

/// Load and merge configuration files in order.
///
/// A section appearing in several files keeps its first position; keys from
/// later files override earlier ones.
pub fn load_config<P: AsRef<Path>>(paths: &[P]) -> Result<CheckConfig, ConfigError> {
    let mut sections: IndexMap<String, TargetConfig> = IndexMap::new();
    let mut global = GlobalOptions::default();

    for path in paths {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let base_dir = path.parent().unwrap_or_else(|| Path::new("."));

        for (name, config) in parse_sections(&content, path)? {
            if name == GLOBAL_SECTION {
                merge_global(&mut global, &config, base_dir);
                continue;
            }
            let entry = sections.entry(name).or_default();
            for (key, value) in config.iter() {
                entry.insert(key, value);
            }
        }
        debug!("Loaded configuration from {}", path.display());
    }

    let mut targets = Vec::with_capacity(sections.len());
    for (name, config) in sections {
        check_target_name(&name)?;
        if config.source().is_none_or(|s| s.trim().is_empty()) {
            return Err(ConfigError::MissingSource(name));
        }
        targets.push(Target { name, config });
    }

    Ok(CheckConfig { targets, global })
}

/// Target names must survive a round trip through a `name: version` line
fn check_target_name(name: &str) -> Result<(), ConfigError> {
    let reason = if name.is_empty() {
        "must not be empty"
    } else if name.contains(':') {
        "must not contain `:`"
    } else if name.contains(['\n', '\r']) {
        "must not contain line breaks"
    } else if name.trim() != name {
        "must not start or end with whitespace"
    } else {
        return Ok(());
    };

    Err(ConfigError::InvalidName {
        name: name.to_string(),
        reason,
    })
}

/// Parse one TOML document into its named sections
fn parse_sections(
    content: &str,
    path: &Path,
) -> Result<IndexMap<String, TargetConfig>, ConfigError> {
    let document: IndexMap<String, toml::Value> =
        toml::from_str(content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;

    let mut sections = IndexMap::with_capacity(document.len());
    for (name, value) in document {
        let toml::Value::Table(table) = value else {
            return Err(ConfigError::InvalidSection {
                path: path.to_path_buf(),
                name,
            });
        };

        let mut config = TargetConfig::new();
        for (key, value) in table {
            let value = scalar_to_string(&name, &key, value)?;
            config.insert(&key, &value);
        }
        sections.insert(name, config);
    }

    Ok(sections)
}

fn scalar_to_string(target: &str, key: &str, value: toml::Value) -> Result<String, ConfigError> {
    let kind = match value {
        toml::Value::String(s) => return Ok(s),
        toml::Value::Integer(i) => return Ok(i.to_string()),
        toml::Value::Float(f) => return Ok(f.to_string()),
        toml::Value::Boolean(b) => return Ok(b.to_string()),
        toml::Value::Datetime(d) => return Ok(d.to_string()),
        toml::Value::Array(_) => "array",
        toml::Value::Table(_) => "table",
    };
    Err(ConfigError::InvalidValue {
        target: target.to_string(),
        key: key.to_string(),
        kind,
    })
}

fn merge_global(global: &mut GlobalOptions, config: &TargetConfig, base_dir: &Path) {
    if let Some(oldver) = config.get("oldver") {
        global.oldver = Some(base_dir.join(oldver));
    }
    if let Some(newver) = config.get("newver") {
        global.newver = Some(base_dir.join(newver));
    }
    if config.get("notify").is_some() {
        global.notify = Some(config.flag("notify"));
    }
}
