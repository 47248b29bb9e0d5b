//! Process-wide recorder configuration.
//!
//! # Design
//! The configuration owns the matcher registry and every enumerated knob:
//! cassette root, enabled hooks, storage backend, mode, and the
//! whitelist/blacklist path lists that are surfaced untouched to whatever
//! external mechanism re-points client code at the hooks. Name-keyed lookups
//! (`"yaml"`, `"once"`, `"stream"`, matcher names) fail loudly at
//! configuration time, never at dispatch time.

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::str::FromStr;

use crate::error::{ConfigError, VcrError};
use crate::matchers::{self, Matcher};

/// Per-cassette policy for requests without a matching recording.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    /// Replay matches, record everything new.
    #[default]
    NewEpisodes,
    /// Replay matches; record only onto a cassette that was empty when
    /// inserted, fail otherwise.
    Once,
    /// Replay matches, never touch the network.
    None,
}

impl Mode {
    pub fn as_str(self) -> &'static str {
        match self {
            Mode::NewEpisodes => "new_episodes",
            Mode::Once => "once",
            Mode::None => "none",
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Mode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "new_episodes" => Ok(Mode::NewEpisodes),
            "once" => Ok(Mode::Once),
            "none" => Ok(Mode::None),
            other => Err(ConfigError::UnknownMode {
                name: other.to_string(),
            }),
        }
    }
}

/// On-disk encoding of cassettes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StorageBackend {
    #[default]
    Yaml,
    Json,
    Blackhole,
}

impl StorageBackend {
    pub fn as_str(self) -> &'static str {
        match self {
            StorageBackend::Yaml => "yaml",
            StorageBackend::Json => "json",
            StorageBackend::Blackhole => "blackhole",
        }
    }
}

impl fmt::Display for StorageBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StorageBackend {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "yaml" => Ok(StorageBackend::Yaml),
            "json" => Ok(StorageBackend::Json),
            "blackhole" => Ok(StorageBackend::Blackhole),
            other => Err(ConfigError::UnknownStorage {
                name: other.to_string(),
            }),
        }
    }
}

/// The three interception surfaces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookKind {
    Stream,
    Handle,
    Soap,
}

impl HookKind {
    /// Every hook, in registration order.
    pub const ALL: [HookKind; 3] = [HookKind::Stream, HookKind::Handle, HookKind::Soap];

    pub fn as_str(self) -> &'static str {
        match self {
            HookKind::Stream => "stream",
            HookKind::Handle => "handle",
            HookKind::Soap => "soap",
        }
    }
}

impl fmt::Display for HookKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HookKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "stream" => Ok(HookKind::Stream),
            "handle" => Ok(HookKind::Handle),
            "soap" => Ok(HookKind::Soap),
            other => Err(ConfigError::UnknownHook {
                name: other.to_string(),
            }),
        }
    }
}

/// Recorder configuration with the matcher registry.
pub struct Configuration {
    cassette_path: PathBuf,
    enabled_hooks: Option<Vec<HookKind>>,
    storage: StorageBackend,
    mode: Mode,
    available_matchers: BTreeMap<String, Matcher>,
    enabled_matchers: Vec<String>,
    white_list: Vec<String>,
    black_list: Vec<String>,
}

impl std::fmt::Debug for Configuration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Configuration")
            .field("cassette_path", &self.cassette_path)
            .field("enabled_hooks", &self.enabled_hooks)
            .field("storage", &self.storage)
            .field("mode", &self.mode)
            .field(
                "available_matchers",
                &self.available_matchers.keys().collect::<Vec<_>>(),
            )
            .field("enabled_matchers", &self.enabled_matchers)
            .field("white_list", &self.white_list)
            .field("black_list", &self.black_list)
            .finish()
    }
}

impl Default for Configuration {
    fn default() -> Self {
        let mut available_matchers: BTreeMap<String, Matcher> = BTreeMap::new();
        available_matchers.insert("method".to_string(), Rc::new(matchers::match_method));
        available_matchers.insert("url".to_string(), Rc::new(matchers::match_url));
        available_matchers.insert("host".to_string(), Rc::new(matchers::match_host));
        available_matchers.insert("headers".to_string(), Rc::new(matchers::match_headers));
        available_matchers.insert("body".to_string(), Rc::new(matchers::match_body));
        available_matchers.insert(
            "post_fields".to_string(),
            Rc::new(matchers::match_post_fields),
        );
        available_matchers.insert(
            "query_string".to_string(),
            Rc::new(matchers::match_query_string),
        );
        available_matchers.insert(
            "soap_operation".to_string(),
            Rc::new(matchers::match_soap_operation),
        );

        Configuration {
            cassette_path: PathBuf::from("tests/fixtures"),
            enabled_hooks: Option::None,
            storage: StorageBackend::default(),
            mode: Mode::default(),
            available_matchers,
            enabled_matchers: vec!["method".to_string(), "url".to_string()],
            white_list: Vec::new(),
            black_list: Vec::new(),
        }
    }
}

impl Configuration {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cassette_path(&self) -> &Path {
        &self.cassette_path
    }

    /// Sets the directory cassettes live in. The directory must exist.
    pub fn set_cassette_path(&mut self, dir: impl Into<PathBuf>) -> Result<&mut Self, VcrError> {
        let dir = dir.into();
        if !dir.is_dir() {
            return Err(ConfigError::CassettePath { path: dir }.into());
        }
        self.cassette_path = dir;
        Ok(self)
    }

    /// The hooks to install at turn-on: the enabled subset, or all of them
    /// when none were explicitly enabled.
    pub fn library_hooks(&self) -> Vec<HookKind> {
        match &self.enabled_hooks {
            Some(enabled) => enabled.clone(),
            Option::None => HookKind::ALL.to_vec(),
        }
    }

    pub fn enable_library_hooks(&mut self, hooks: &[HookKind]) -> &mut Self {
        self.enabled_hooks = Some(hooks.to_vec());
        self
    }

    pub fn storage_backend(&self) -> StorageBackend {
        self.storage
    }

    pub fn set_storage(&mut self, backend: StorageBackend) -> &mut Self {
        self.storage = backend;
        self
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn set_mode(&mut self, mode: Mode) -> &mut Self {
        self.mode = mode;
        self
    }

    /// Registers a custom matcher under `name`.
    pub fn add_request_matcher(
        &mut self,
        name: &str,
        matcher: Matcher,
    ) -> Result<&mut Self, VcrError> {
        if name.is_empty() {
            return Err(ConfigError::EmptyMatcherName.into());
        }
        self.available_matchers.insert(name.to_string(), matcher);
        Ok(self)
    }

    /// Reduces the active matcher set to `names`. Unknown names fail.
    pub fn enable_request_matchers(&mut self, names: &[&str]) -> Result<&mut Self, VcrError> {
        let unknown: Vec<&str> = names
            .iter()
            .copied()
            .filter(|name| !self.available_matchers.contains_key(*name))
            .collect();
        if !unknown.is_empty() {
            return Err(ConfigError::UnknownMatchers {
                names: unknown.join(", "),
            }
            .into());
        }
        self.enabled_matchers = names.iter().map(|s| s.to_string()).collect();
        Ok(self)
    }

    /// The enabled matcher callbacks, in enable order.
    pub fn request_matchers(&self) -> Vec<Matcher> {
        self.enabled_matchers
            .iter()
            .filter_map(|name| self.available_matchers.get(name))
            .map(Rc::clone)
            .collect()
    }

    pub fn enabled_matcher_names(&self) -> &[String] {
        &self.enabled_matchers
    }

    pub fn white_list(&self) -> &[String] {
        &self.white_list
    }

    /// Paths the external code-rewriting mechanism should restrict itself
    /// to. Opaque to the recorder core.
    pub fn set_white_list(&mut self, paths: Vec<String>) -> &mut Self {
        self.white_list = paths;
        self
    }

    pub fn black_list(&self) -> &[String] {
        &self.black_list
    }

    /// Paths the external code-rewriting mechanism must leave alone. Opaque
    /// to the recorder core.
    pub fn set_black_list(&mut self, paths: Vec<String>) -> &mut Self {
        self.black_list = paths;
        self
    }
}
