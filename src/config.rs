use std::fs;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::domain::{PageSize, RegistryKind};
use crate::error::RailyardError;

pub const DEFAULT_REPOSITORY: &str = "Subway-Builder-Modded/The-Railyard";
pub const DEFAULT_BRANCH: &str = "main";
pub const RAW_HOST: &str = "https://raw.githubusercontent.com";
pub const CDN_HOST: &str = "https://cdn.jsdelivr.net/gh";
pub const DEFAULT_CONCURRENCY: usize = 16;
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub schema_version: Option<u32>,
    #[serde(default)]
    pub repository: Option<String>,
    #[serde(default)]
    pub branch: Option<String>,
    #[serde(default, alias = "originBase")]
    pub origin_base: Option<String>,
    #[serde(default, alias = "cdnBase")]
    pub cdn_base: Option<String>,
    #[serde(default)]
    pub maps: Option<SourceOverride>,
    #[serde(default)]
    pub mods: Option<SourceOverride>,
    #[serde(default)]
    pub concurrency: Option<usize>,
    #[serde(default, alias = "timeoutSecs")]
    pub timeout_secs: Option<u64>,
    #[serde(default, alias = "maxRetries")]
    pub max_retries: Option<usize>,
    #[serde(default, alias = "pageSize")]
    pub page_size: Option<PageSize>,
    #[serde(default)]
    pub placeholders: Option<PlaceholderConfig>,
}

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct SourceOverride {
    #[serde(default, alias = "indexUrl")]
    pub index_url: Option<String>,
    #[serde(default, alias = "itemBaseUrl")]
    pub item_base_url: Option<String>,
}

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct PlaceholderConfig {
    #[serde(default, alias = "noDescription")]
    pub no_description: Option<String>,
    #[serde(default, alias = "unknownAuthor")]
    pub unknown_author: Option<String>,
}

/// Where one registry kind lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistrySource {
    pub kind: RegistryKind,
    pub index_url: String,
    pub item_base_url: String,
    /// Repository root on the origin host, used for relative image paths.
    pub origin_base: String,
    /// Same tree on the CDN mirror.
    pub cdn_base: String,
}

impl RegistrySource {
    pub fn manifest_url(&self, id: &str) -> String {
        format!(
            "{}/{id}/manifest.json",
            self.item_base_url.trim_end_matches('/')
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Placeholders {
    pub no_description: String,
    pub unknown_author: String,
}

impl Default for Placeholders {
    fn default() -> Self {
        Self {
            no_description: "No description provided.".to_string(),
            unknown_author: "Unknown".to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub schema_version: u32,
    pub maps: RegistrySource,
    pub mods: RegistrySource,
    pub concurrency: usize,
    pub timeout_secs: u64,
    pub max_retries: usize,
    pub page_size: PageSize,
    pub placeholders: Placeholders,
}

impl ResolvedConfig {
    pub fn source(&self, kind: RegistryKind) -> &RegistrySource {
        match kind {
            RegistryKind::Maps => &self.maps,
            RegistryKind::Mods => &self.mods,
        }
    }
}

impl Default for ResolvedConfig {
    fn default() -> Self {
        ConfigLoader::resolve_config(Config::default())
    }
}

pub struct ConfigLoader;

impl ConfigLoader {
    /// An explicit path must exist; the implicit `railyard.json` is optional.
    pub fn resolve(path: Option<&str>) -> Result<ResolvedConfig, RailyardError> {
        let config_path = match path {
            Some(path) => PathBuf::from(path),
            None => PathBuf::from("railyard.json"),
        };

        if path.is_none() && !config_path.exists() {
            return Ok(ResolvedConfig::default());
        }

        let content = fs::read_to_string(&config_path)
            .map_err(|_| RailyardError::ConfigRead(config_path.clone()))?;
        let config: Config = serde_json::from_str(&content)
            .map_err(|err| RailyardError::ConfigParse(err.to_string()))?;

        Ok(Self::resolve_config(config))
    }

    pub fn resolve_config(config: Config) -> ResolvedConfig {
        let repository = config
            .repository
            .unwrap_or_else(|| DEFAULT_REPOSITORY.to_string());
        let branch = config.branch.unwrap_or_else(|| DEFAULT_BRANCH.to_string());
        let origin_base = config
            .origin_base
            .unwrap_or_else(|| format!("{RAW_HOST}/{repository}/{branch}"));
        let cdn_base = config
            .cdn_base
            .unwrap_or_else(|| format!("{CDN_HOST}/{repository}@{branch}"));

        let build_source = |kind: RegistryKind, overrides: Option<SourceOverride>| {
            let overrides = overrides.unwrap_or_default();
            let origin = origin_base.trim_end_matches('/');
            RegistrySource {
                kind,
                index_url: overrides
                    .index_url
                    .unwrap_or_else(|| format!("{origin}/{kind}/index.json")),
                item_base_url: overrides
                    .item_base_url
                    .unwrap_or_else(|| format!("{origin}/{kind}")),
                origin_base: origin.to_string(),
                cdn_base: cdn_base.trim_end_matches('/').to_string(),
            }
        };

        let maps = build_source(RegistryKind::Maps, config.maps);
        let mods = build_source(RegistryKind::Mods, config.mods);

        let defaults = Placeholders::default();
        let placeholders = match config.placeholders {
            Some(custom) => Placeholders {
                no_description: custom.no_description.unwrap_or(defaults.no_description),
                unknown_author: custom.unknown_author.unwrap_or(defaults.unknown_author),
            },
            None => defaults,
        };

        ResolvedConfig {
            schema_version: config.schema_version.unwrap_or(1),
            maps,
            mods,
            concurrency: config.concurrency.unwrap_or(DEFAULT_CONCURRENCY).max(1),
            timeout_secs: config.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS),
            max_retries: config.max_retries.unwrap_or(0),
            page_size: config.page_size.unwrap_or_default(),
            placeholders,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_point_at_the_railyard_repository() {
        let resolved = ConfigLoader::resolve_config(Config::default());
        assert_eq!(resolved.schema_version, 1);
        assert_eq!(
            resolved.maps.index_url,
            "https://raw.githubusercontent.com/Subway-Builder-Modded/The-Railyard/main/maps/index.json"
        );
        assert_eq!(
            resolved.mods.manifest_url("better-trains"),
            "https://raw.githubusercontent.com/Subway-Builder-Modded/The-Railyard/main/mods/better-trains/manifest.json"
        );
        assert_eq!(
            resolved.maps.cdn_base,
            "https://cdn.jsdelivr.net/gh/Subway-Builder-Modded/The-Railyard@main"
        );
        assert_eq!(resolved.max_retries, 0);
        assert_eq!(resolved.page_size, PageSize::Medium);
    }
}
