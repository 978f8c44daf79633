//! Gateway configuration and per-host resolution.
//!
//! The configuration document is loaded once at start. Each request resolves
//! an effective [`Settings`] value by overlaying the profile registered for the
//! request host onto the defaults. The overlay is shallow: a key present in
//! the host profile replaces the default value wholesale, including map-valued
//! keys such as `uploadKeys`.

use crate::error::{CoreError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use jiff::Timestamp;
use std::fmt;
use tracing::debug;

/// Default alphabet: ASCII digits and letters.
pub const DEFAULT_CHARACTERS: &str =
    "0123456789abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ";
/// 2020-01-01T00:00:00Z in milliseconds.
pub const DEFAULT_DATE_OFFSET_MS: i64 = 1_577_836_800_000;
/// One week in milliseconds.
pub const DEFAULT_DATE_ROTATION_MS: i64 = 7 * 24 * 60 * 60 * 1_000;
pub const DEFAULT_ID_LEN: usize = 8;
pub const DEFAULT_PADDING_LEN: usize = 64;
pub const DEFAULT_STORE_URL: &str = "https://gitlab.com/api/v4";
pub const DEFAULT_BRANCH: &str = "main";

/// How a write endpoint treats its payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum EndpointMode {
    /// Text is stored as-is, binary bodies are base64-encoded by the gateway.
    Plain,
    /// The client sends content that is already base64 text.
    Base64,
    /// Requests are forwarded to the external link shortener.
    Shortener,
}

impl From<String> for EndpointMode {
    fn from(value: String) -> Self {
        match value.as_str() {
            "base64" => EndpointMode::Base64,
            "waaai" | "shortener" => EndpointMode::Shortener,
            _ => EndpointMode::Plain,
        }
    }
}

impl From<EndpointMode> for String {
    fn from(value: EndpointMode) -> Self {
        match value {
            EndpointMode::Plain => "plain".to_string(),
            EndpointMode::Base64 => "base64".to_string(),
            EndpointMode::Shortener => "waaai".to_string(),
        }
    }
}

/// Byte string mixed into the identifier checksum.
///
/// Accepts either a UTF-8 string or an array of byte values in the
/// configuration document.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "SecretRepr", into = "Vec<u8>")]
pub struct Secret(Vec<u8>);

#[derive(Deserialize)]
#[serde(untagged)]
enum SecretRepr {
    Text(String),
    Bytes(Vec<u8>),
}

impl From<SecretRepr> for Secret {
    fn from(value: SecretRepr) -> Self {
        match value {
            SecretRepr::Text(text) => Secret(text.into_bytes()),
            SecretRepr::Bytes(bytes) => Secret(bytes),
        }
    }
}

impl From<Secret> for Vec<u8> {
    fn from(value: Secret) -> Self {
        value.0
    }
}

impl Secret {
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self(bytes.into())
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Secret([{} bytes])", self.0.len())
    }
}

/// Object-store project reference, either a numeric id or a `group/name` path.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "ProjectRepr", into = "String")]
pub struct ProjectId(String);

#[derive(Deserialize)]
#[serde(untagged)]
enum ProjectRepr {
    Number(u64),
    Text(String),
}

impl From<ProjectRepr> for ProjectId {
    fn from(value: ProjectRepr) -> Self {
        match value {
            ProjectRepr::Number(n) => ProjectId(n.to_string()),
            ProjectRepr::Text(s) => ProjectId(s),
        }
    }
}

impl From<ProjectId> for String {
    fn from(value: ProjectId) -> Self {
        value.0
    }
}

impl ProjectId {
    pub fn new(project: impl Into<String>) -> Self {
        Self(project.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ProjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Target and credential of the delegated link shortener.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShortenerSettings {
    pub api: String,
    pub apikey: String,
}

impl fmt::Debug for ShortenerSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ShortenerSettings")
            .field("api", &self.api)
            .field("apikey", &"<redacted>")
            .finish()
    }
}

/// The effective configuration of one request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    pub characters: String,
    pub id_len: usize,
    pub date_offset: i64,
    pub date_rotation: i64,
    pub padding_len: usize,
    pub secret: Secret,
    pub project: ProjectId,
    pub branch: String,
    pub token: String,
    pub store_url: String,
    pub upload_keys: HashMap<String, EndpointMode>,
    pub upload_allow_insecure: bool,
    pub waaai: Option<ShortenerSettings>,
    pub cache_key_headers: Vec<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            characters: DEFAULT_CHARACTERS.to_string(),
            id_len: DEFAULT_ID_LEN,
            date_offset: DEFAULT_DATE_OFFSET_MS,
            date_rotation: DEFAULT_DATE_ROTATION_MS,
            padding_len: DEFAULT_PADDING_LEN,
            secret: Secret::default(),
            project: ProjectId::default(),
            branch: DEFAULT_BRANCH.to_string(),
            token: String::new(),
            store_url: DEFAULT_STORE_URL.to_string(),
            upload_keys: HashMap::new(),
            upload_allow_insecure: false,
            waaai: None,
            cache_key_headers: vec!["origin".to_string()],
        }
    }
}

impl Settings {
    /// Checks the invariants the identifier codec relies on.
    pub fn validate(&self) -> Result<()> {
        let char_len = self.characters.chars().count();
        if char_len == 0 {
            return Err(CoreError::InvalidConfig(
                "characters must not be empty".to_string(),
            ));
        }
        if self.id_len < 3 {
            return Err(CoreError::InvalidConfig(format!(
                "idLen must be at least 3, got {}",
                self.id_len
            )));
        }
        let representable = Timestamp::MIN.as_millisecond()..=Timestamp::MAX.as_millisecond();
        if !representable.contains(&self.date_offset) {
            return Err(CoreError::InvalidConfig(format!(
                "dateOffset {} is outside the representable time range",
                self.date_offset
            )));
        }
        if self.date_rotation <= 0 {
            return Err(CoreError::InvalidConfig(format!(
                "dateRotation must be positive, got {}",
                self.date_rotation
            )));
        }

        let widest = self
            .characters
            .chars()
            .map(char::len_utf8)
            .max()
            .unwrap_or(1);
        let needed = self.secret.len() + (self.id_len - 2) * widest;
        if self.padding_len < needed {
            return Err(CoreError::InvalidConfig(format!(
                "paddingLen {} is smaller than secret plus payload ({} bytes)",
                self.padding_len, needed
            )));
        }

        Ok(())
    }

    /// Endpoint mode registered for the first path segment, if any.
    pub fn endpoint_mode(&self, first_segment: &str) -> Option<EndpointMode> {
        self.upload_keys.get(first_segment).copied()
    }
}

/// A partial [`Settings`] registered for one host.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SettingsOverride {
    pub characters: Option<String>,
    pub id_len: Option<usize>,
    pub date_offset: Option<i64>,
    pub date_rotation: Option<i64>,
    pub padding_len: Option<usize>,
    pub secret: Option<Secret>,
    pub project: Option<ProjectId>,
    pub branch: Option<String>,
    pub token: Option<String>,
    pub store_url: Option<String>,
    pub upload_keys: Option<HashMap<String, EndpointMode>>,
    pub upload_allow_insecure: Option<bool>,
    pub waaai: Option<ShortenerSettings>,
    pub cache_key_headers: Option<Vec<String>>,
}

impl SettingsOverride {
    /// Overlays this profile onto `base`; present keys win.
    pub fn apply(&self, base: &Settings) -> Settings {
        Settings {
            characters: pick(&self.characters, &base.characters),
            id_len: self.id_len.unwrap_or(base.id_len),
            date_offset: self.date_offset.unwrap_or(base.date_offset),
            date_rotation: self.date_rotation.unwrap_or(base.date_rotation),
            padding_len: self.padding_len.unwrap_or(base.padding_len),
            secret: pick(&self.secret, &base.secret),
            project: pick(&self.project, &base.project),
            branch: pick(&self.branch, &base.branch),
            token: pick(&self.token, &base.token),
            store_url: pick(&self.store_url, &base.store_url),
            upload_keys: pick(&self.upload_keys, &base.upload_keys),
            upload_allow_insecure: self
                .upload_allow_insecure
                .unwrap_or(base.upload_allow_insecure),
            waaai: self.waaai.clone().or_else(|| base.waaai.clone()),
            cache_key_headers: pick(&self.cache_key_headers, &base.cache_key_headers),
        }
    }
}

fn pick<T: Clone>(over: &Option<T>, base: &T) -> T {
    over.clone().unwrap_or_else(|| base.clone())
}

/// The configuration document as stored on disk.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(flatten)]
    pub defaults: Settings,
    #[serde(default)]
    pub overrides: HashMap<String, SettingsOverride>,
}

impl GatewayConfig {
    /// Parses a JSON configuration document.
    pub fn from_json_str(raw: &str) -> Result<Self> {
        serde_json::from_str(raw).map_err(|e| CoreError::Parse(e.to_string()))
    }
}

/// Produces the effective settings of a request from its host.
#[derive(Debug, Clone)]
pub struct ConfigResolver {
    defaults: Settings,
    overrides: HashMap<String, SettingsOverride>,
}

impl ConfigResolver {
    /// Normalises host keys and validates the defaults and every host profile.
    pub fn new(config: GatewayConfig) -> Result<Self> {
        config.defaults.validate()?;

        let mut overrides = HashMap::with_capacity(config.overrides.len());
        for (host, profile) in config.overrides {
            profile.apply(&config.defaults).validate().map_err(|e| {
                CoreError::InvalidConfig(format!("override for host '{host}': {e}"))
            })?;
            overrides.insert(host.to_ascii_lowercase(), profile);
        }

        debug!(hosts = overrides.len(), "loaded gateway configuration");
        Ok(Self {
            defaults: config.defaults,
            overrides,
        })
    }

    /// Returns the settings for `host`, which falls back to the defaults when
    /// no profile is registered for it.
    pub fn resolve(&self, host: &str) -> Settings {
        match self.overrides.get(&host.to_ascii_lowercase()) {
            Some(profile) => profile.apply(&self.defaults),
            None => self.defaults.clone(),
        }
    }

    /// Hosts with a registered profile.
    pub fn hosts(&self) -> impl Iterator<Item = &str> {
        self.overrides.keys().map(String::as_str)
    }
}
