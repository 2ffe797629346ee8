//! CLI configuration.
//!
//! [`ConfigFile`] is the persisted `$CF_HOME/.cf/config.json`. It doubles as
//! the [`TokenStore`] of the authentication wrapper, so refreshed tokens are
//! written back to disk. [`CliConfig`] layers environment and flag overrides
//! on top of it and implements [`Config`], the view the pipeline assembler
//! reads.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};
use std::time::Duration;

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use cfkit_client::config::DEFAULT_DIAL_TIMEOUT;
use cfkit_client::{Credentials, StoreError, Token, TokenStore};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::ConfigError;

/// Directory under the home directory holding the configuration.
pub const CONFIG_DIR: &str = ".cf";

/// Configuration file name.
pub const CONFIG_FILE: &str = "config.json";

const CONFIG_VERSION: u32 = 3;

/// Prefix stored in front of access tokens.
const BEARER_PREFIX: &str = "bearer ";

/// What the pipeline assembler and commands need from the configuration.
pub trait Config: Send + Sync {
    fn binary_name(&self) -> &str;

    fn binary_version(&self) -> &str;

    /// The API URL, empty when no target is set.
    fn target(&self) -> String;

    fn skip_ssl_validation(&self) -> bool;

    fn dial_timeout(&self) -> Duration;

    /// Whether to trace to the terminal, and the file to trace to.
    fn verbose(&self) -> (bool, Option<PathBuf>);

    /// The shared token store.
    fn token_store(&self) -> Arc<dyn TokenStore>;

    /// Name of the logged in user, if known.
    fn current_user(&self) -> Option<String>;

    /// Whether a token or credentials to obtain one are available.
    fn is_logged_in(&self) -> bool {
        let store = self.token_store();
        let has_token = store
            .load_token()
            .is_some_and(|t| !t.access_token.is_empty() || !t.refresh_token.is_empty());
        has_token || store.credentials().is_some()
    }
}

/// Contents of `config.json`.
///
/// Keys this program does not know are kept and written back unchanged.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct ConfigData {
    pub config_version: u32,
    pub target: String,
    #[serde(rename = "APIVersion")]
    pub api_version: String,
    pub authorization_endpoint: String,
    pub uaa_endpoint: String,
    #[serde(rename = "SSLDisabled")]
    pub ssl_disabled: bool,
    pub access_token: String,
    pub refresh_token: String,
    pub token_expiry: Option<DateTime<Utc>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Default for ConfigData {
    fn default() -> Self {
        Self {
            config_version: CONFIG_VERSION,
            target: String::new(),
            api_version: String::new(),
            authorization_endpoint: String::new(),
            uaa_endpoint: String::new(),
            ssl_disabled: false,
            access_token: String::new(),
            refresh_token: String::new(),
            token_expiry: None,
            extra: Map::new(),
        }
    }
}

impl ConfigData {
    fn token(&self) -> Option<Token> {
        if self.access_token.is_empty() && self.refresh_token.is_empty() {
            return None;
        }
        let access_token = strip_bearer(&self.access_token).to_string();
        let mut token = Token::new(access_token, self.refresh_token.clone());
        token.expiry = self.token_expiry;
        Some(token)
    }

    fn set_token(&mut self, token: &Token) {
        self.access_token = if token.access_token.is_empty() {
            String::new()
        } else {
            format!("{}{}", BEARER_PREFIX, token.access_token)
        };
        self.refresh_token = token.refresh_token.clone();
        self.token_expiry = token.expiry;
    }
}

fn strip_bearer(token: &str) -> &str {
    match token.get(..BEARER_PREFIX.len()) {
        Some(prefix) if prefix.eq_ignore_ascii_case(BEARER_PREFIX) => &token[BEARER_PREFIX.len()..],
        _ => token,
    }
}

/// The `config.json` file and its in-memory contents.
#[derive(Debug)]
pub struct ConfigFile {
    path: PathBuf,
    data: RwLock<ConfigData>,
    credentials: Option<Credentials>,
}

impl ConfigFile {
    /// Path of the configuration file under `cf_home`, or the user's home
    /// directory when `cf_home` is `None`.
    pub fn default_path(cf_home: Option<&Path>) -> Result<PathBuf, ConfigError> {
        let home = match cf_home {
            Some(home) => home.to_path_buf(),
            None => dirs::home_dir().ok_or(ConfigError::NoHomeDir)?,
        };
        Ok(home.join(CONFIG_DIR).join(CONFIG_FILE))
    }

    /// Load `path`. A missing file yields an empty configuration.
    pub fn load(path: impl Into<PathBuf>) -> Result<Self, ConfigError> {
        let path = path.into();
        let data = match fs::read(&path) {
            Ok(bytes) if bytes.iter().all(u8::is_ascii_whitespace) => ConfigData::default(),
            Ok(bytes) => serde_json::from_slice(&bytes).map_err(|source| ConfigError::Parse {
                path: path.clone(),
                source,
            })?,
            Err(e) if e.kind() == io::ErrorKind::NotFound => ConfigData::default(),
            Err(source) => return Err(ConfigError::Read { path, source }),
        };

        tracing::debug!(path = %path.display(), target = %data.target, "loaded configuration");
        Ok(Self {
            path,
            data: RwLock::new(data),
            credentials: None,
        })
    }

    /// Offer `credentials` to the authentication wrapper when no token is stored.
    pub fn with_credentials(mut self, credentials: Option<Credentials>) -> Self {
        self.credentials = credentials;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// A copy of the current contents.
    pub fn data(&self) -> ConfigData {
        self.data
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// Modify the contents and write them to disk.
    pub fn update(&self, f: impl FnOnce(&mut ConfigData)) -> Result<(), ConfigError> {
        let mut data = self
            .data
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        f(&mut data);
        self.write(&data)
    }

    fn write(&self, data: &ConfigData) -> Result<(), ConfigError> {
        let write_err = |source| ConfigError::Write {
            path: self.path.clone(),
            source,
        };

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(write_err)?;
        }
        let json = serde_json::to_vec_pretty(data).map_err(|e| write_err(io::Error::other(e)))?;
        fs::write(&self.path, json).map_err(write_err)
    }
}

impl TokenStore for ConfigFile {
    fn load_token(&self) -> Option<Token> {
        self.data
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .token()
    }

    fn save_token(&self, token: &Token) -> Result<(), StoreError> {
        self.update(|data| data.set_token(token))
            .map_err(|e| StoreError(e.to_string()))
    }

    fn credentials(&self) -> Option<Credentials> {
        self.credentials.clone()
    }
}

/// Settings taken from the environment and command-line flags.
#[derive(Clone, Debug, Default)]
pub struct Overrides {
    /// `-v/--verbose`.
    pub verbose: bool,
    /// `CF_TRACE`: `true`, `false`, or a log file path.
    pub trace: Option<String>,
    /// `CF_DIAL_TIMEOUT`.
    pub dial_timeout: Option<Duration>,
}

/// The effective configuration of one invocation.
pub struct CliConfig {
    binary_name: String,
    binary_version: String,
    file: Arc<ConfigFile>,
    overrides: Overrides,
}

impl CliConfig {
    pub fn new(binary_name: impl Into<String>, file: Arc<ConfigFile>, overrides: Overrides) -> Self {
        Self {
            binary_name: binary_name.into(),
            binary_version: env!("CARGO_PKG_VERSION").to_string(),
            file,
            overrides,
        }
    }

    pub fn file(&self) -> &Arc<ConfigFile> {
        &self.file
    }
}

impl Config for CliConfig {
    fn binary_name(&self) -> &str {
        &self.binary_name
    }

    fn binary_version(&self) -> &str {
        &self.binary_version
    }

    fn target(&self) -> String {
        self.file.data().target
    }

    fn skip_ssl_validation(&self) -> bool {
        self.file.data().ssl_disabled
    }

    fn dial_timeout(&self) -> Duration {
        self.overrides.dial_timeout.unwrap_or(DEFAULT_DIAL_TIMEOUT)
    }

    fn verbose(&self) -> (bool, Option<PathBuf>) {
        let mut terminal = self.overrides.verbose;
        let mut file = None;

        match self.overrides.trace.as_deref().map(str::trim) {
            None | Some("") => {}
            Some(value) if value.eq_ignore_ascii_case("true") => terminal = true,
            Some(value) if value.eq_ignore_ascii_case("false") => {}
            Some(path) => file = Some(PathBuf::from(path)),
        }

        (terminal, file)
    }

    fn token_store(&self) -> Arc<dyn TokenStore> {
        self.file.clone()
    }

    fn current_user(&self) -> Option<String> {
        self.file
            .load_token()
            .and_then(|token| user_name_from_token(&token.access_token))
            .or_else(|| self.file.credentials().map(|c| c.username))
    }
}

/// Read the `user_name` claim of a JWT access token.
fn user_name_from_token(access_token: &str) -> Option<String> {
    let payload = access_token.split('.').nth(1)?;
    let decoded = URL_SAFE_NO_PAD.decode(payload.trim_end_matches('=')).ok()?;
    let claims: Value = serde_json::from_slice(&decoded).ok()?;
    claims
        .get("user_name")
        .and_then(Value::as_str)
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn jwt(claims: &str) -> String {
        format!(
            "{}.{}.signature",
            URL_SAFE_NO_PAD.encode(r#"{"alg":"RS256"}"#),
            URL_SAFE_NO_PAD.encode(claims)
        )
    }

    fn cli_config(file: ConfigFile, overrides: Overrides) -> CliConfig {
        CliConfig::new("cfkit", Arc::new(file), overrides)
    }

    #[test]
    fn test_default_path() {
        let path = ConfigFile::default_path(Some(Path::new("/home/me"))).unwrap();
        assert_eq!(path, PathBuf::from("/home/me/.cf/config.json"));
    }

    #[test]
    fn test_missing_file_is_empty_config() {
        let dir = tempfile::tempdir().unwrap();
        let file = ConfigFile::load(dir.path().join(".cf/config.json")).unwrap();
        assert_eq!(file.data(), ConfigData::default());
        assert!(file.load_token().is_none());
    }

    #[test]
    fn test_invalid_file_is_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, "{not json").unwrap();

        let err = ConfigFile::load(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn test_reads_cf_config_keys() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(
            &path,
            r#"{
                "ConfigVersion": 3,
                "Target": "https://api.example.com",
                "APIVersion": "2.150.0",
                "AuthorizationEndpoint": "https://login.example.com",
                "UaaEndpoint": "https://uaa.example.com",
                "SSLDisabled": true,
                "AccessToken": "bearer abc",
                "RefreshToken": "def",
                "OrganizationFields": {"Name": "org"}
            }"#,
        )
        .unwrap();

        let file = ConfigFile::load(&path).unwrap();
        let data = file.data();
        assert_eq!(data.target, "https://api.example.com");
        assert_eq!(data.api_version, "2.150.0");
        assert!(data.ssl_disabled);
        assert_eq!(file.load_token(), Some(Token::new("abc", "def")));
        assert!(data.extra.contains_key("OrganizationFields"));
    }

    #[test]
    fn test_save_token_persists_and_keeps_unknown_keys() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(".cf").join("config.json");
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(
            &path,
            r#"{"Target":"https://api.example.com","SpaceFields":{"Name":"dev"}}"#,
        )
        .unwrap();

        let file = ConfigFile::load(&path).unwrap();
        file.save_token(&Token::new("new-access", "new-refresh")).unwrap();

        let raw: Value = serde_json::from_slice(&fs::read(&path).unwrap()).unwrap();
        assert_eq!(raw["AccessToken"], "bearer new-access");
        assert_eq!(raw["RefreshToken"], "new-refresh");
        assert_eq!(raw["Target"], "https://api.example.com");
        assert_eq!(raw["SpaceFields"]["Name"], "dev");

        let reloaded = ConfigFile::load(&path).unwrap();
        assert_eq!(reloaded.load_token(), Some(Token::new("new-access", "new-refresh")));
    }

    #[test]
    fn test_save_token_creates_directories() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("home").join(".cf").join("config.json");

        let file = ConfigFile::load(&path).unwrap();
        file.save_token(&Token::new("a", "r")).unwrap();
        assert!(path.exists());
    }

    #[test]
    fn test_verbose_settings() {
        let dir = tempfile::tempdir().unwrap();
        let load = || ConfigFile::load(dir.path().join("config.json")).unwrap();

        let config = cli_config(load(), Overrides::default());
        assert_eq!(config.verbose(), (false, None));

        let config = cli_config(
            load(),
            Overrides {
                verbose: true,
                ..Default::default()
            },
        );
        assert_eq!(config.verbose(), (true, None));

        let config = cli_config(
            load(),
            Overrides {
                trace: Some("TRUE".into()),
                ..Default::default()
            },
        );
        assert_eq!(config.verbose(), (true, None));

        let config = cli_config(
            load(),
            Overrides {
                trace: Some("false".into()),
                ..Default::default()
            },
        );
        assert_eq!(config.verbose(), (false, None));

        let config = cli_config(
            load(),
            Overrides {
                verbose: true,
                trace: Some("/tmp/cf.log".into()),
                ..Default::default()
            },
        );
        assert_eq!(config.verbose(), (true, Some(PathBuf::from("/tmp/cf.log"))));
    }

    #[test]
    fn test_dial_timeout_default_and_override() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");

        let config = cli_config(ConfigFile::load(&path).unwrap(), Overrides::default());
        assert_eq!(config.dial_timeout(), DEFAULT_DIAL_TIMEOUT);

        let config = cli_config(
            ConfigFile::load(&path).unwrap(),
            Overrides {
                dial_timeout: Some(Duration::from_secs(30)),
                ..Default::default()
            },
        );
        assert_eq!(config.dial_timeout(), Duration::from_secs(30));
    }

    #[test]
    fn test_current_user_from_token() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        let file = ConfigFile::load(&path).unwrap();
        file.save_token(&Token::new(jwt(r#"{"user_name":"admin"}"#), "r"))
            .unwrap();

        let config = cli_config(file, Overrides::default());
        assert_eq!(config.current_user().as_deref(), Some("admin"));
        assert!(config.is_logged_in());
    }

    #[test]
    fn test_current_user_falls_back_to_credentials() {
        let dir = tempfile::tempdir().unwrap();
        let file = ConfigFile::load(dir.path().join("config.json"))
            .unwrap()
            .with_credentials(Some(Credentials::new("ci-user", "secret")));

        let config = cli_config(file, Overrides::default());
        assert_eq!(config.current_user().as_deref(), Some("ci-user"));
        assert!(config.is_logged_in());
    }

    #[test]
    fn test_not_logged_in() {
        let dir = tempfile::tempdir().unwrap();
        let file = ConfigFile::load(dir.path().join("config.json")).unwrap();
        let config = cli_config(file, Overrides::default());
        assert!(!config.is_logged_in());
        assert!(config.current_user().is_none());
    }

    #[test]
    fn test_user_name_from_opaque_token() {
        assert_eq!(user_name_from_token("opaque-token"), None);
        assert_eq!(user_name_from_token("a.!!!.c"), None);
    }
}
