use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::Config;
use crate::orchestrator::MAX_RETRIES;
use crate::summary::SummaryHeaders;

/// On-disk TOML configuration structure.
/// All fields are optional so partial configs work (merge with defaults).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConfigFile {
    pub sealion: Option<BackendSection>,
    pub gemini: Option<BackendSection>,
    pub backends: Option<BackendsConfig>,
    pub timeouts: Option<TimeoutsConfig>,
    pub summary: Option<SummaryConfig>,
    pub extraction: Option<ExtractionConfig>,
    pub server: Option<ServerConfig>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BackendSection {
    pub api_key: Option<String>,
    pub base_url: Option<String>,
    pub model: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BackendsConfig {
    pub disabled: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TimeoutsConfig {
    pub adapt_secs: Option<u64>,
    pub summary_secs: Option<u64>,
    pub retry_delay_ms: Option<u64>,
    pub max_retries: Option<u32>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SummaryConfig {
    pub headers: Option<Vec<String>>,
    pub max_document_chars: Option<usize>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExtractionConfig {
    pub max_pages: Option<usize>,
    pub min_text_chars: Option<usize>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServerConfig {
    pub port: Option<u16>,
    pub max_upload_mb: Option<usize>,
}

/// Platform config directory path: `<config_dir>/meditalks/config.toml`.
pub fn config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("meditalks").join("config.toml"))
}

/// Load config by cascading CWD `.meditalks.toml` over platform config.
/// CWD values override platform values.
pub fn load_config() -> ConfigFile {
    let platform = config_path().and_then(|p| load_from_path(&p));
    let cwd = load_from_path(Path::new(".meditalks.toml"));

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
            warn!(path = %path.display(), error = %e, "ignoring unparseable config file");
            None
        }
    }
}

/// First `Some` from `overlay`, else from `base`.
fn pick<S, T>(overlay: &Option<S>, base: &Option<S>, field: impl Fn(&S) -> Option<T>) -> Option<T> {
    overlay
        .as_ref()
        .and_then(&field)
        .or_else(|| base.as_ref().and_then(&field))
}

fn merge_backend(base: &Option<BackendSection>, overlay: &Option<BackendSection>) -> BackendSection {
    BackendSection {
        api_key: pick(overlay, base, |b| b.api_key.clone()),
        base_url: pick(overlay, base, |b| b.base_url.clone()),
        model: pick(overlay, base, |b| b.model.clone()),
    }
}

/// Merge two configs: `overlay` values take precedence over `base`.
pub fn merge(base: ConfigFile, overlay: ConfigFile) -> ConfigFile {
    ConfigFile {
        sealion: Some(merge_backend(&base.sealion, &overlay.sealion)),
        gemini: Some(merge_backend(&base.gemini, &overlay.gemini)),
        backends: Some(BackendsConfig {
            disabled: pick(&overlay.backends, &base.backends, |b| b.disabled.clone()),
        }),
        timeouts: Some(TimeoutsConfig {
            adapt_secs: pick(&overlay.timeouts, &base.timeouts, |t| t.adapt_secs),
            summary_secs: pick(&overlay.timeouts, &base.timeouts, |t| t.summary_secs),
            retry_delay_ms: pick(&overlay.timeouts, &base.timeouts, |t| t.retry_delay_ms),
            max_retries: pick(&overlay.timeouts, &base.timeouts, |t| t.max_retries),
        }),
        summary: Some(SummaryConfig {
            headers: pick(&overlay.summary, &base.summary, |s| s.headers.clone()),
            max_document_chars: pick(&overlay.summary, &base.summary, |s| s.max_document_chars),
        }),
        extraction: Some(ExtractionConfig {
            max_pages: pick(&overlay.extraction, &base.extraction, |e| e.max_pages),
            min_text_chars: pick(&overlay.extraction, &base.extraction, |e| e.min_text_chars),
        }),
        server: Some(ServerConfig {
            port: pick(&overlay.server, &base.server, |s| s.port),
            max_upload_mb: pick(&overlay.server, &base.server, |s| s.max_upload_mb),
        }),
    }
}

/// Copy every value present in `file` onto `config`.
pub fn apply_file(config: &mut Config, file: &ConfigFile) {
    if let Some(s) = &file.sealion {
        set(&mut config.sealion_api_key, &s.api_key);
        set(&mut config.sealion_base_url, &s.base_url);
        set(&mut config.sealion_model, &s.model);
    }
    if let Some(g) = &file.gemini {
        set(&mut config.gemini_api_key, &g.api_key);
        set(&mut config.gemini_base_url, &g.base_url);
        set(&mut config.gemini_model, &g.model);
    }
    if let Some(disabled) = file.backends.as_ref().and_then(|b| b.disabled.clone()) {
        config.disabled_backends = disabled;
    }
    if let Some(t) = &file.timeouts {
        if let Some(secs) = nonzero_secs("adapt_secs", t.adapt_secs) {
            config.adapt_timeout_secs = secs;
        }
        if let Some(secs) = nonzero_secs("summary_secs", t.summary_secs) {
            config.summary_timeout_secs = secs;
        }
        config.retry_delay_ms = t.retry_delay_ms.unwrap_or(config.retry_delay_ms);
        if let Some(retries) = t.max_retries {
            if retries > MAX_RETRIES {
                warn!(max_retries = retries, cap = MAX_RETRIES, "capping retry budget");
            }
            config.max_retries = retries.min(MAX_RETRIES);
        }
    }
    if let Some(s) = &file.summary {
        if let Some(headers) = &s.headers {
            config.summary_headers = SummaryHeaders::new(headers.clone());
        }
        config.max_document_chars = s.max_document_chars.unwrap_or(config.max_document_chars);
    }
    if let Some(e) = &file.extraction {
        config.max_pages = e.max_pages.unwrap_or(config.max_pages);
        config.min_text_chars = e.min_text_chars.unwrap_or(config.min_text_chars);
    }
}

/// Apply environment overrides read through `lookup` (normally
/// `std::env::var(..).ok()`). Unparseable numbers are ignored.
pub fn apply_env(config: &mut Config, lookup: impl Fn(&str) -> Option<String>) {
    let var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

    set(&mut config.sealion_api_key, &var("SEALION_API_KEY"));
    set(&mut config.sealion_base_url, &var("SEALION_API_URL"));
    set(&mut config.sealion_model, &var("SEALION_MODEL"));
    set(&mut config.gemini_api_key, &var("GEMINI_API_KEY"));
    set(&mut config.gemini_base_url, &var("GEMINI_API_URL"));
    set(&mut config.gemini_model, &var("GEMINI_MODEL"));

    if let Some(secs) = nonzero_secs("ADAPT_TIMEOUT", parse_var("ADAPT_TIMEOUT", var("ADAPT_TIMEOUT"))) {
        config.adapt_timeout_secs = secs;
    }
    if let Some(secs) = nonzero_secs("SUMMARY_TIMEOUT", parse_var("SUMMARY_TIMEOUT", var("SUMMARY_TIMEOUT"))) {
        config.summary_timeout_secs = secs;
    }
}

fn set(target: &mut Option<String>, value: &Option<String>) {
    if value.is_some() {
        target.clone_from(value);
    }
}

/// A zero timeout would fail every call, so it is ignored.
fn nonzero_secs(name: &str, secs: Option<u64>) -> Option<u64> {
    match secs {
        Some(0) => {
            warn!(setting = name, "ignoring zero timeout");
            None
        }
        other => other,
    }
}

fn parse_var<T: std::str::FromStr>(name: &str, value: Option<String>) -> Option<T> {
    let value = value?;
    match value.trim().parse() {
        Ok(v) => Some(v),
        Err(_) => {
            warn!(var = name, value = %value, "ignoring invalid numeric setting");
            None
        }
    }
}
