use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Current config version. Bump this when adding fields or changing shape.
/// Each bump requires a corresponding entry in [`migrate`].
const CURRENT_VERSION: u32 = 1;

pub const DEFAULT_MODEL_ID: &str = "anthropic.claude-v2:1";
pub const DEFAULT_LANGUAGE: &str = "en";

pub const API_URL_ENV: &str = "DOCTALK_API_URL";
pub const AUTH_TOKEN_ENV: &str = "DOCTALK_AUTH_TOKEN";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DoctalkConfig {
    /// Schema version. Missing or 0 = pre-versioned config.
    #[serde(default)]
    pub config_version: u32,
    /// Base URL of the REST backend.
    pub api_url: String,
    /// Bearer token attached to JSON calls, never to storage transfers.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub auth_token: Option<String>,
    #[serde(default = "default_model_id")]
    pub default_model_id: String,
    /// Added in v1.
    pub default_language: String,
    pub created_at: jiff::Timestamp,
}

/// Redacted config info safe to print.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigInfo {
    pub api_url: String,
    pub default_model_id: String,
    pub default_language: String,
    pub created_at: String,
    pub auth_token_hint: Option<String>,
}

fn default_model_id() -> String {
    DEFAULT_MODEL_ID.to_string()
}

impl DoctalkConfig {
    pub fn new(api_url: impl Into<String>) -> Self {
        Self {
            config_version: CURRENT_VERSION,
            api_url: api_url.into(),
            auth_token: None,
            default_model_id: default_model_id(),
            default_language: DEFAULT_LANGUAGE.to_string(),
            created_at: jiff::Timestamp::now(),
        }
    }

    /// Apply `DOCTALK_API_URL` / `DOCTALK_AUTH_TOKEN` on top of the file.
    pub fn with_env_overrides(self) -> Self {
        self.with_overrides(
            std::env::var(API_URL_ENV).ok(),
            std::env::var(AUTH_TOKEN_ENV).ok(),
        )
    }

    /// Empty values are ignored.
    pub fn with_overrides(mut self, api_url: Option<String>, auth_token: Option<String>) -> Self {
        if let Some(url) = api_url.filter(|u| !u.trim().is_empty()) {
            self.api_url = url;
        }
        if let Some(token) = auth_token.filter(|t| !t.trim().is_empty()) {
            self.auth_token = Some(token);
        }
        self
    }
}

pub fn config_dir() -> eyre::Result<PathBuf> {
    let base = dirs::config_dir().ok_or_else(|| eyre::eyre!("no config directory found"))?;
    Ok(base.join("com.doctalk.cli"))
}

fn config_path() -> eyre::Result<PathBuf> {
    Ok(config_dir()?.join("config.json"))
}

pub fn has_config() -> bool {
    config_path().map(|p| p.exists()).unwrap_or(false)
}

pub fn load_config() -> eyre::Result<DoctalkConfig> {
    load_config_from(&config_path()?)
}

pub fn load_config_from(path: &Path) -> eyre::Result<DoctalkConfig> {
    let contents = std::fs::read_to_string(path)
        .map_err(|e| eyre::eyre!("failed to read config at {}: {e}", path.display()))?;

    // Parse as raw JSON so migrations run before deserializing.
    let json: serde_json::Value = serde_json::from_str(&contents)?;
    let on_disk_version = json
        .get("config_version")
        .and_then(|v| v.as_u64())
        .unwrap_or(0) as u32;

    let migrated = migrate(json, on_disk_version)?;
    let config: DoctalkConfig = serde_json::from_value(migrated)?;
    Ok(config)
}

/// Run sequential migrations from `from_version` up to [`CURRENT_VERSION`].
///
/// Each migration is a pure transform on the raw JSON value.
pub fn migrate(mut json: serde_json::Value, from_version: u32) -> eyre::Result<serde_json::Value> {
    if from_version > CURRENT_VERSION {
        return Err(eyre::eyre!(
            "config_version {from_version} is newer than this build supports ({CURRENT_VERSION}). \
             Please update doctalk."
        ));
    }

    // v0 → v1: add default_language
    if from_version < 1 {
        let obj = json
            .as_object_mut()
            .ok_or_else(|| eyre::eyre!("config is not a JSON object"))?;
        obj.entry("default_language")
            .or_insert(serde_json::Value::String(DEFAULT_LANGUAGE.to_string()));
        obj.insert(
            "config_version".to_string(),
            serde_json::Value::Number(1.into()),
        );
        tracing::info!("migrated config v0 → v1 (added default_language)");
    }

    Ok(json)
}

pub fn save_config(config: &DoctalkConfig) -> eyre::Result<PathBuf> {
    save_config_to(&config_dir()?, config)
}

/// Write `config.json` into `dir`, stamped with the current version.
pub fn save_config_to(dir: &Path, config: &DoctalkConfig) -> eyre::Result<PathBuf> {
    std::fs::create_dir_all(dir)?;

    let mut stamped = config.clone();
    stamped.config_version = CURRENT_VERSION;

    let path = dir.join("config.json");
    let json = serde_json::to_string_pretty(&stamped)?;

    let tmp_path = dir.join("config.json.tmp");
    std::fs::write(&tmp_path, json.as_bytes())?;

    // The file may hold a bearer token.
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(&tmp_path, std::fs::Permissions::from_mode(0o600))?;
    }

    std::fs::rename(&tmp_path, &path)?;

    tracing::info!(path = %path.display(), "config saved");
    Ok(path)
}

pub fn config_info(config: &DoctalkConfig) -> ConfigInfo {
    ConfigInfo {
        api_url: config.api_url.clone(),
        default_model_id: config.default_model_id.clone(),
        default_language: config.default_language.clone(),
        created_at: config.created_at.to_string(),
        auth_token_hint: config.auth_token.as_deref().map(redact_token),
    }
}

fn redact_token(token: &str) -> String {
    if token.len() <= 8 || !token.is_ascii() {
        return "****".to_string();
    }
    let prefix = &token[..4];
    let suffix = &token[token.len() - 4..];
    format!("{prefix}...{suffix}")
}
