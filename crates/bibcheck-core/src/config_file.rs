use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::config::VerifyConfig;
use crate::rate_limit::SourcePacers;

/// On-disk TOML configuration structure.
/// All fields are optional so partial configs work (merge with defaults).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConfigFile {
    pub api: Option<ApiConfig>,
    pub matching: Option<MatchingConfig>,
    pub processing: Option<ProcessingConfig>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ApiConfig {
    pub crossref_mailto: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MatchingConfig {
    pub title_weight: Option<f64>,
    pub year_weight: Option<f64>,
    pub author_weight: Option<f64>,
    pub verified_threshold: Option<f64>,
    pub uncertain_threshold: Option<f64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProcessingConfig {
    pub request_delay_ms: Option<u64>,
    pub request_timeout_secs: Option<u64>,
    pub max_retries: Option<u32>,
    pub max_citations: Option<usize>,
}

/// Platform config directory path: `<config_dir>/bibcheck/config.toml`.
pub fn config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("bibcheck").join("config.toml"))
}

/// Load config by cascading CWD `.bibcheck.toml` over platform config.
/// CWD values override platform values.
pub fn load_config() -> ConfigFile {
    let platform = config_path().and_then(|p| load_from_path(&p));
    let cwd = load_from_path(&PathBuf::from(".bibcheck.toml"));

    match (platform, cwd) {
        (None, None) => ConfigFile::default(),
        (Some(p), None) => p,
        (None, Some(c)) => c,
        (Some(p), Some(c)) => merge(p, c),
    }
}

/// Load a config from a specific path. Returns `None` if the file doesn't
/// exist or can't be parsed.
pub fn load_from_path(path: &PathBuf) -> Option<ConfigFile> {
    let content = std::fs::read_to_string(path).ok()?;
    toml::from_str(&content).ok()
}

/// Merge two configs: `overlay` values take precedence over `base`.
pub fn merge(base: ConfigFile, overlay: ConfigFile) -> ConfigFile {
    ConfigFile {
        api: Some(ApiConfig {
            crossref_mailto: overlay
                .api
                .as_ref()
                .and_then(|a| a.crossref_mailto.clone())
                .or_else(|| base.api.as_ref().and_then(|a| a.crossref_mailto.clone())),
        }),
        matching: Some(MatchingConfig {
            title_weight: overlay
                .matching
                .as_ref()
                .and_then(|m| m.title_weight)
                .or_else(|| base.matching.as_ref().and_then(|m| m.title_weight)),
            year_weight: overlay
                .matching
                .as_ref()
                .and_then(|m| m.year_weight)
                .or_else(|| base.matching.as_ref().and_then(|m| m.year_weight)),
            author_weight: overlay
                .matching
                .as_ref()
                .and_then(|m| m.author_weight)
                .or_else(|| base.matching.as_ref().and_then(|m| m.author_weight)),
            verified_threshold: overlay
                .matching
                .as_ref()
                .and_then(|m| m.verified_threshold)
                .or_else(|| base.matching.as_ref().and_then(|m| m.verified_threshold)),
            uncertain_threshold: overlay
                .matching
                .as_ref()
                .and_then(|m| m.uncertain_threshold)
                .or_else(|| base.matching.as_ref().and_then(|m| m.uncertain_threshold)),
        }),
        processing: Some(ProcessingConfig {
            request_delay_ms: overlay
                .processing
                .as_ref()
                .and_then(|p| p.request_delay_ms)
                .or_else(|| base.processing.as_ref().and_then(|p| p.request_delay_ms)),
            request_timeout_secs: overlay
                .processing
                .as_ref()
                .and_then(|p| p.request_timeout_secs)
                .or_else(|| {
                    base.processing
                        .as_ref()
                        .and_then(|p| p.request_timeout_secs)
                }),
            max_retries: overlay
                .processing
                .as_ref()
                .and_then(|p| p.max_retries)
                .or_else(|| base.processing.as_ref().and_then(|p| p.max_retries)),
            max_citations: overlay
                .processing
                .as_ref()
                .and_then(|p| p.max_citations)
                .or_else(|| base.processing.as_ref().and_then(|p| p.max_citations)),
        }),
    }
}

impl ConfigFile {
    /// Overlay file values onto an in-process config. Values the file
    /// doesn't set are left alone; validation happens later, once, when
    /// the engine is built.
    pub fn apply_to(&self, config: &mut VerifyConfig) {
        if let Some(api) = &self.api {
            if let Some(mailto) = &api.crossref_mailto {
                config.crossref_mailto = Some(mailto.clone());
            }
        }

        if let Some(matching) = &self.matching {
            if let Some(w) = matching.title_weight {
                config.weights.title = w;
            }
            if let Some(w) = matching.year_weight {
                config.weights.year = w;
            }
            if let Some(w) = matching.author_weight {
                config.weights.authors = w;
            }
            if let Some(t) = matching.verified_threshold {
                config.thresholds.verified = t;
            }
            if let Some(t) = matching.uncertain_threshold {
                config.thresholds.uncertain = t;
            }
        }

        if let Some(processing) = &self.processing {
            if let Some(ms) = processing.request_delay_ms {
                config.pacers = Arc::new(SourcePacers::with_period(Duration::from_millis(ms)));
            }
            if let Some(secs) = processing.request_timeout_secs {
                config.request_timeout_secs = secs;
            }
            if let Some(retries) = processing.max_retries {
                config.max_retries = retries;
            }
        }
    }
}
