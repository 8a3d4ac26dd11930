use crate::error::ProxyError;
use crate::types::PreviewFlags;
use serde::{Deserialize, Serialize};

/// How deep template containment may go before a proxy is rejected.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NestingPolicy {
    /// Any proxy anywhere in the target template's subgraph rejects.
    #[default]
    Strict,
    /// Nested proxies are allowed as long as their own templates are proxy-free
    /// and no containment cycle exists.
    SingleLevel,
}

/// Runtime configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProxyConfig {
    pub nesting: NestingPolicy,
    /// Nudge sibling proxies to re-validate whenever one regenerates.
    pub bump_generation_on_regenerate: bool,
    /// Debug aid: list previews in the host's hierarchy view. Previews stay
    /// non-editable and editor-only regardless.
    pub show_previews_in_hierarchy: bool,
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            nesting: NestingPolicy::Strict,
            bump_generation_on_regenerate: true,
            show_previews_in_hierarchy: false,
        }
    }
}

impl ProxyConfig {
    /// Parse a TOML document; missing keys keep their defaults.
    pub fn from_toml_str(source: &str) -> Result<Self, ProxyError> {
        Ok(toml::from_str(source)?)
    }

    /// Flags every preview is tagged with.
    pub fn preview_flags(&self) -> PreviewFlags {
        PreviewFlags {
            hide_in_hierarchy: !self.show_previews_in_hierarchy,
            ..PreviewFlags::default()
        }
    }

    #[must_use]
    pub fn with_nesting(mut self, nesting: NestingPolicy) -> Self {
        self.nesting = nesting;
        self
    }
}
