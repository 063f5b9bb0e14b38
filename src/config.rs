//! Shaper configuration structures and loading.

use serde::{Deserialize, Serialize};

use crate::shaper::DEFAULT_CACHE_CAPACITY;

/// Which shaping backend to construct at startup.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackendKind {
    /// Full shaping via rustybuzz: ligatures, marks, kerning.
    #[default]
    Harfbuzz,
    /// Manual grapheme clustering with charmap lookups.
    Direct,
    /// Passthrough: glyph index == codepoint.
    Noop,
}

/// Top-level shaper configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShaperConfig {
    /// Shaping backend selected at startup.
    pub backend: BackendKind,
    /// OpenType features to enable/disable during text shaping.
    ///
    /// Each string is a 4-character feature tag, optionally prefixed with `-`
    /// to disable. Examples: `"calt"`, `"liga"`, `"-dlig"`.
    /// Defaults to `["calt", "liga"]` (contextual alternates + standard ligatures).
    pub features: Vec<String>,
    /// Shape cache capacity in runs. Zero disables caching.
    pub cache_capacity: usize,
}

impl Default for ShaperConfig {
    fn default() -> Self {
        Self {
            backend: BackendKind::default(),
            features: vec!["calt".into(), "liga".into()],
            cache_capacity: DEFAULT_CACHE_CAPACITY,
        }
    }
}

impl ShaperConfig {
    /// Parses a configuration from TOML text.
    pub fn from_toml_str(text: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(text)
    }
}
