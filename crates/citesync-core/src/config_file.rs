use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// On-disk TOML configuration structure.
/// All fields are optional so partial configs work (merge with defaults).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConfigFile {
    pub author: Option<AuthorConfig>,
    pub source: Option<SourceConfig>,
    pub api_keys: Option<ApiKeysConfig>,
    pub matching: Option<MatchingConfig>,
    pub paths: Option<PathsConfig>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AuthorConfig {
    pub scholar_id: Option<String>,
    /// Website `config.json` to read the Scholar id from when `scholar_id` is unset.
    pub site_config: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SourceConfig {
    /// `serpapi`, `scholar` or `file`.
    pub provider: Option<String>,
    pub citations_file: Option<String>,
    pub max_pages: Option<usize>,
    pub timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ApiKeysConfig {
    pub serpapi_key: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MatchingConfig {
    pub threshold: Option<f64>,
    pub checked_field: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PathsConfig {
    pub publications: Option<String>,
}

/// Platform config directory path: `<config_dir>/citesync/config.toml`.
pub fn config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("citesync").join("config.toml"))
}

/// Load config by cascading CWD `.citesync.toml` over platform config.
/// CWD values override platform values.
pub fn load_config() -> ConfigFile {
    let platform = config_path().and_then(|p| load_from_path(&p));
    let cwd = load_from_path(Path::new(".citesync.toml"));

    match (platform, cwd) {
        (None, None) => ConfigFile::default(),
        (Some(p), None) => p,
        (None, Some(c)) => c,
        (Some(p), Some(c)) => merge(p, c),
    }
}

/// Load a config from a specific path. Returns `None` if the file doesn't
/// exist or can't be parsed.
pub fn load_from_path(path: &Path) -> Option<ConfigFile> {
    let content = std::fs::read_to_string(path).ok()?;
    match toml::from_str(&content) {
        Ok(config) => Some(config),
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "ignoring unparseable config file");
            None
        }
    }
}

/// Merge two configs: `overlay` values take precedence over `base`.
pub fn merge(base: ConfigFile, overlay: ConfigFile) -> ConfigFile {
    ConfigFile {
        author: Some(AuthorConfig {
            scholar_id: overlay
                .author
                .as_ref()
                .and_then(|a| a.scholar_id.clone())
                .or_else(|| base.author.as_ref().and_then(|a| a.scholar_id.clone())),
            site_config: overlay
                .author
                .as_ref()
                .and_then(|a| a.site_config.clone())
                .or_else(|| base.author.as_ref().and_then(|a| a.site_config.clone())),
        }),
        source: Some(SourceConfig {
            provider: overlay
                .source
                .as_ref()
                .and_then(|s| s.provider.clone())
                .or_else(|| base.source.as_ref().and_then(|s| s.provider.clone())),
            citations_file: overlay
                .source
                .as_ref()
                .and_then(|s| s.citations_file.clone())
                .or_else(|| base.source.as_ref().and_then(|s| s.citations_file.clone())),
            max_pages: overlay
                .source
                .as_ref()
                .and_then(|s| s.max_pages)
                .or_else(|| base.source.as_ref().and_then(|s| s.max_pages)),
            timeout_secs: overlay
                .source
                .as_ref()
                .and_then(|s| s.timeout_secs)
                .or_else(|| base.source.as_ref().and_then(|s| s.timeout_secs)),
        }),
        api_keys: Some(ApiKeysConfig {
            serpapi_key: overlay
                .api_keys
                .as_ref()
                .and_then(|a| a.serpapi_key.clone())
                .or_else(|| base.api_keys.as_ref().and_then(|a| a.serpapi_key.clone())),
        }),
        matching: Some(MatchingConfig {
            threshold: overlay
                .matching
                .as_ref()
                .and_then(|m| m.threshold)
                .or_else(|| base.matching.as_ref().and_then(|m| m.threshold)),
            checked_field: overlay
                .matching
                .as_ref()
                .and_then(|m| m.checked_field.clone())
                .or_else(|| base.matching.as_ref().and_then(|m| m.checked_field.clone())),
        }),
        paths: Some(PathsConfig {
            publications: overlay
                .paths
                .as_ref()
                .and_then(|p| p.publications.clone())
                .or_else(|| base.paths.as_ref().and_then(|p| p.publications.clone())),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_toml_parses() {
        let toml_str = "[author]\nscholar_id = \"abc\"\n\n[matching]\nthreshold = 0.9\n";
        let parsed: ConfigFile = toml::from_str(toml_str).unwrap();
        assert_eq!(parsed.author.unwrap().scholar_id.as_deref(), Some("abc"));
        assert_eq!(parsed.matching.unwrap().threshold, Some(0.9));
        assert!(parsed.source.is_none());
    }

    #[test]
    fn round_trip_toml() {
        let config = ConfigFile {
            source: Some(SourceConfig {
                provider: Some("scholar".to_string()),
                max_pages: Some(3),
                ..Default::default()
            }),
            ..Default::default()
        };
        let toml_str = toml::to_string_pretty(&config).unwrap();
        let parsed: ConfigFile = toml::from_str(&toml_str).unwrap();
        let source = parsed.source.unwrap();
        assert_eq!(source.provider.as_deref(), Some("scholar"));
        assert_eq!(source.max_pages, Some(3));
    }

    #[test]
    fn merge_overlay_wins() {
        let base = ConfigFile {
            author: Some(AuthorConfig {
                scholar_id: Some("base".to_string()),
                site_config: Some("site/config.json".to_string()),
            }),
            ..Default::default()
        };
        let overlay = ConfigFile {
            author: Some(AuthorConfig {
                scholar_id: Some("overlay".to_string()),
                site_config: None,
            }),
            ..Default::default()
        };
        let merged = merge(base, overlay);
        let author = merged.author.unwrap();
        assert_eq!(author.scholar_id.as_deref(), Some("overlay"));
        assert_eq!(author.site_config.as_deref(), Some("site/config.json"));
    }

    #[test]
    fn merge_base_preserved_when_overlay_absent() {
        let base = ConfigFile {
            paths: Some(PathsConfig {
                publications: Some("data/publications.json".to_string()),
            }),
            matching: Some(MatchingConfig {
                threshold: Some(0.95),
                checked_field: None,
            }),
            ..Default::default()
        };
        let merged = merge(base, ConfigFile::default());
        assert_eq!(
            merged.paths.unwrap().publications.as_deref(),
            Some("data/publications.json")
        );
        assert_eq!(merged.matching.unwrap().threshold, Some(0.95));
    }

    #[test]
    fn load_from_path_missing_or_invalid() {
        let dir = tempfile::tempdir().unwrap();
        assert!(load_from_path(&dir.path().join("absent.toml")).is_none());

        let bad = dir.path().join("bad.toml");
        std::fs::write(&bad, "[author\nscholar_id = 1").unwrap();
        assert!(load_from_path(&bad).is_none());
    }
}
