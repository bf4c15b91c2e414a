//! Decoder backend configuration.
//!
//! These settings only change how much CPU and memory the decode boundary
//! uses. They never change a hash value.

use crate::error::FingerprintError;
use serde::{Deserialize, Serialize};
use std::num::NonZeroUsize;
use std::path::Path;

/// Worker threads for batch decoding
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "CoresRepr", into = "CoresRepr")]
pub enum Cores {
    /// Pick from the machine: `min(8, max(2, available cores))`
    #[default]
    Auto,
    /// Exactly this many threads
    Fixed(NonZeroUsize),
}

#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum CoresRepr {
    Count(usize),
    Keyword(Option<String>),
}

impl TryFrom<CoresRepr> for Cores {
    type Error = String;

    fn try_from(repr: CoresRepr) -> Result<Self, Self::Error> {
        match repr {
            CoresRepr::Count(n) => NonZeroUsize::new(n)
                .map(Cores::Fixed)
                .ok_or_else(|| "cores must be at least 1".to_string()),
            CoresRepr::Keyword(None) => Ok(Cores::Auto),
            CoresRepr::Keyword(Some(word)) if word.eq_ignore_ascii_case("auto") => Ok(Cores::Auto),
            CoresRepr::Keyword(Some(word)) => Err(format!("invalid cores value: {word}")),
        }
    }
}

impl From<Cores> for CoresRepr {
    fn from(cores: Cores) -> Self {
        match cores {
            Cores::Auto => CoresRepr::Keyword(Some("auto".to_string())),
            Cores::Fixed(n) => CoresRepr::Count(n.get()),
        }
    }
}

impl Cores {
    /// Resolve to a concrete thread count
    pub fn resolve(self) -> usize {
        match self {
            Cores::Fixed(n) => n.get(),
            Cores::Auto => {
                let available = std::thread::available_parallelism()
                    .map(NonZeroUsize::get)
                    .unwrap_or(2);
                available.clamp(2, 8)
            }
        }
    }
}

/// Resource settings for the image preparation backend
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BackendConfig {
    /// Decoder thread pool size
    pub cores: Cores,
    /// Maximum number of decoded images kept in the cache
    pub max_cache_size: usize,
    /// Memory cap for the decode cache, in MiB
    pub max_memory: usize,
    /// Stream large files through a memory map instead of buffered reads
    pub sequential_access: bool,
    /// Turn the decode cache off entirely
    pub disable_cache: bool,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            cores: Cores::Auto,
            max_cache_size: 64,
            max_memory: 256,
            sequential_access: true,
            disable_cache: false,
        }
    }
}

impl BackendConfig {
    /// Create a configuration with defaults
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cores(mut self, cores: Cores) -> Self {
        self.cores = cores;
        self
    }

    pub fn max_cache_size(mut self, entries: usize) -> Self {
        self.max_cache_size = entries;
        self
    }

    /// Memory cap in MiB
    pub fn max_memory(mut self, mib: usize) -> Self {
        self.max_memory = mib;
        self
    }

    pub fn sequential_access(mut self, enabled: bool) -> Self {
        self.sequential_access = enabled;
        self
    }

    pub fn disable_cache(mut self, disabled: bool) -> Self {
        self.disable_cache = disabled;
        self
    }

    /// Whether the decode cache should exist at all
    pub fn cache_enabled(&self) -> bool {
        !self.disable_cache && self.max_cache_size > 0 && self.max_memory > 0
    }

    pub fn max_memory_bytes(&self) -> usize {
        self.max_memory.saturating_mul(1024 * 1024)
    }

    /// Load a configuration from a JSON file; missing keys keep their defaults
    pub fn from_json_file(path: &Path) -> Result<Self, FingerprintError> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            FingerprintError::Config(format!("cannot read {}: {}", path.display(), e))
        })?;
        serde_json::from_str(&contents).map_err(|e| {
            FingerprintError::Config(format!("invalid config {}: {}", path.display(), e))
        })
    }
}

/// Colour profile for decode import/export
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColorProfile {
    /// The only profile the decoders produce
    #[default]
    Srgb,
}

/// Per-call decode options
///
/// The sequential hint picks the read path for files (memory map or
/// buffered read). Buffers are already in memory, so it has no effect
/// there. sRGB is the only profile and is what every decoder produces,
/// so naming it changes nothing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DecodeOptions {
    /// Overrides `BackendConfig::sequential_access` for this call
    pub sequential_access: Option<bool>,
    pub import_profile: Option<ColorProfile>,
    pub export_profile: Option<ColorProfile>,
}

impl DecodeOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sequential_access(mut self, enabled: bool) -> Self {
        self.sequential_access = Some(enabled);
        self
    }

    /// The read path for a file: this call's hint, else the backend setting
    pub fn reads_sequentially(&self, backend: &BackendConfig) -> bool {
        self.sequential_access.unwrap_or(backend.sequential_access)
    }
}
