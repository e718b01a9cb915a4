use crate::error::{GeonodeError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::env;
use std::fmt;
use std::fs;
use std::path::Path;
use url::Url;

/// Page size used when nothing else is configured
pub const DEFAULT_PAGE_SIZE: u32 = 10;

/// Configuration source for tracking where values come from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConfigSource {
    /// Default value
    Default,
    /// Loaded from config file
    File,
    /// Loaded from environment variable
    Environment,
    /// Provided via CLI argument
    Cli,
}

impl ConfigSource {
    /// Returns the precedence level (higher = higher priority)
    pub fn precedence(&self) -> u8 {
        match self {
            ConfigSource::Default => 0,
            ConfigSource::File => 1,
            ConfigSource::Environment => 2,
            ConfigSource::Cli => 3,
        }
    }
}

/// A configuration value with its source
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigValue<T> {
    pub value: T,
    pub source: ConfigSource,
}

impl<T> ConfigValue<T> {
    pub fn new(value: T, source: ConfigSource) -> Self {
        Self { value, source }
    }

    /// Update the value if the new source has higher precedence
    pub fn update(&mut self, value: T, source: ConfigSource) {
        if source.precedence() > self.source.precedence() {
            self.value = value;
            self.source = source;
        }
    }
}

/// Layered configuration for the catalogue client
#[derive(Debug, Clone)]
pub struct LayeredConfig {
    pub base_url: ConfigValue<Option<String>>,
    pub username: ConfigValue<Option<String>>,
    pub password: ConfigValue<Option<String>>,
    pub auth_config: ConfigValue<Option<String>>,
    pub page_size: ConfigValue<u32>,
}

impl LayeredConfig {
    /// Create a new configuration with default values
    pub fn with_defaults() -> Self {
        Self {
            base_url: ConfigValue::new(None, ConfigSource::Default),
            username: ConfigValue::new(None, ConfigSource::Default),
            password: ConfigValue::new(None, ConfigSource::Default),
            auth_config: ConfigValue::new(None, ConfigSource::Default),
            page_size: ConfigValue::new(DEFAULT_PAGE_SIZE, ConfigSource::Default),
        }
    }

    /// Load configuration from a TOML file
    pub fn load_from_file<P: AsRef<Path>>(mut self, path: P) -> Result<Self> {
        let content =
            fs::read_to_string(path.as_ref()).map_err(|e| GeonodeError::ConfigInvalid {
                key: "file".to_string(),
                reason: format!("Failed to read config file: {}", e),
            })?;

        let file_config: FileConfig =
            toml::from_str(&content).map_err(|e| GeonodeError::ConfigInvalid {
                key: "file".to_string(),
                reason: format!("Failed to parse TOML: {}", e),
            })?;

        if let Some(base_url) = file_config.base_url {
            self.base_url.update(Some(base_url), ConfigSource::File);
        }

        if let Some(username) = file_config.username {
            self.username.update(Some(username), ConfigSource::File);
        }

        if let Some(password) = file_config.password {
            self.password.update(Some(password), ConfigSource::File);
        }

        if let Some(auth_config) = file_config.auth_config {
            self.auth_config.update(Some(auth_config), ConfigSource::File);
        }

        if let Some(page_size) = file_config.page_size {
            self.page_size.update(page_size, ConfigSource::File);
        }

        Ok(self)
    }

    /// Load configuration from environment variables
    pub fn load_from_env(mut self) -> Self {
        // GEONODE_BASE_URL
        if let Ok(base_url) = env::var("GEONODE_BASE_URL") {
            match Url::parse(&base_url) {
                Ok(_) => self.base_url.update(Some(base_url), ConfigSource::Environment),
                Err(e) => tracing::warn!(
                    "Invalid GEONODE_BASE_URL value '{}': {}",
                    base_url,
                    e
                ),
            }
        }

        // GEONODE_USERNAME
        if let Ok(username) = env::var("GEONODE_USERNAME") {
            self.username.update(Some(username), ConfigSource::Environment);
        }

        // GEONODE_PASSWORD
        if let Ok(password) = env::var("GEONODE_PASSWORD") {
            self.password.update(Some(password), ConfigSource::Environment);
        }

        // GEONODE_AUTHCFG
        if let Ok(auth_config) = env::var("GEONODE_AUTHCFG") {
            self.auth_config.update(Some(auth_config), ConfigSource::Environment);
        }

        // GEONODE_PAGE_SIZE
        if let Ok(size_str) = env::var("GEONODE_PAGE_SIZE") {
            match parse_page_size(&size_str) {
                Ok(size) => self.page_size.update(size, ConfigSource::Environment),
                Err(_) => tracing::warn!(
                    "Invalid GEONODE_PAGE_SIZE value '{}': expected a positive integer",
                    size_str
                ),
            }
        }

        self
    }

    /// Update configuration from CLI arguments
    pub fn update_from_cli(&mut self, overrides: CliConfigOverrides) {
        if let Some(base_url) = overrides.base_url {
            self.base_url.update(Some(base_url), ConfigSource::Cli);
        }

        if let Some(username) = overrides.username {
            self.username.update(Some(username), ConfigSource::Cli);
        }

        if let Some(password) = overrides.password {
            self.password.update(Some(password), ConfigSource::Cli);
        }

        if let Some(auth_config) = overrides.auth_config {
            self.auth_config.update(Some(auth_config), ConfigSource::Cli);
        }

        if let Some(page_size) = overrides.page_size {
            self.page_size.update(page_size, ConfigSource::Cli);
        }
    }

    /// Get all configuration values as a map for inspection
    ///
    /// The password is never included in clear text.
    pub fn to_inspection_map(&self) -> HashMap<String, (String, ConfigSource)> {
        let mut map = HashMap::new();
        let unset = || "<unset>".to_string();

        map.insert(
            "base_url".to_string(),
            (self.base_url.value.clone().unwrap_or_else(unset), self.base_url.source),
        );

        map.insert(
            "username".to_string(),
            (self.username.value.clone().unwrap_or_else(unset), self.username.source),
        );

        let password = match self.password.value {
            Some(_) => "********".to_string(),
            None => unset(),
        };
        map.insert("password".to_string(), (password, self.password.source));

        map.insert(
            "auth_config".to_string(),
            (self.auth_config.value.clone().unwrap_or_else(unset), self.auth_config.source),
        );

        map.insert(
            "page_size".to_string(),
            (self.page_size.value.to_string(), self.page_size.source),
        );

        map
    }

    /// Validate the layered values into connection settings
    pub fn to_connection_settings(&self) -> Result<ConnectionSettings> {
        let raw_url = self
            .base_url
            .value
            .as_deref()
            .ok_or_else(|| GeonodeError::ConfigMissing { key: "base_url".to_string() })?;

        let credentials = match (&self.username.value, &self.password.value) {
            (Some(username), Some(password)) => {
                Some(Credentials::new(username.clone(), password.clone()))
            }
            (Some(_), None) => {
                tracing::warn!(
                    "A username is configured without a password; connecting anonymously"
                );
                None
            }
            _ => None,
        };

        let mut settings = ConnectionSettings::new(raw_url)?
            .with_page_size(self.page_size.value)?;
        settings.credentials = credentials;
        settings.auth_config = self.auth_config.value.clone();
        Ok(settings)
    }
}

/// Configuration loaded from TOML file
#[derive(Debug, Deserialize, Serialize)]
struct FileConfig {
    base_url: Option<String>,
    username: Option<String>,
    password: Option<String>,
    auth_config: Option<String>,
    page_size: Option<u32>,
}

/// CLI configuration overrides
#[derive(Debug, Default)]
pub struct CliConfigOverrides {
    pub base_url: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub auth_config: Option<String>,
    pub page_size: Option<u32>,
}

/// Login credentials for the catalogue web application
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self { username: username.into(), password: password.into() }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"********")
            .finish()
    }
}

/// Validated settings for one catalogue connection
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionSettings {
    pub base_url: Url,
    pub credentials: Option<Credentials>,

    /// Host auth-configuration reference embedded into service descriptors
    pub auth_config: Option<String>,

    pub page_size: u32,
}

impl ConnectionSettings {
    pub fn new(base_url: &str) -> Result<Self> {
        let parsed = Url::parse(base_url).map_err(|e| GeonodeError::ConfigInvalid {
            key: "base_url".to_string(),
            reason: format!("{}: {}", base_url, e),
        })?;

        if parsed.host_str().is_none() {
            return Err(GeonodeError::ConfigInvalid {
                key: "base_url".to_string(),
                reason: format!("{} has no host", base_url),
            });
        }

        Ok(Self {
            base_url: parsed,
            credentials: None,
            auth_config: None,
            page_size: DEFAULT_PAGE_SIZE,
        })
    }

    pub fn with_credentials(mut self, credentials: Credentials) -> Self {
        self.credentials = Some(credentials);
        self
    }

    pub fn with_auth_config(mut self, auth_config: impl Into<String>) -> Self {
        self.auth_config = Some(auth_config.into());
        self
    }

    pub fn with_page_size(mut self, page_size: u32) -> Result<Self> {
        if page_size == 0 {
            return Err(GeonodeError::ConfigInvalid {
                key: "page_size".to_string(),
                reason: "page size must be greater than zero".to_string(),
            });
        }
        self.page_size = page_size;
        Ok(self)
    }

    /// Base URL without a trailing slash, ready for path concatenation
    pub fn base(&self) -> &str {
        self.base_url.as_str().trim_end_matches('/')
    }

    /// Host the session cookies are scoped to
    pub fn host(&self) -> &str {
        self.base_url.host_str().unwrap_or_default()
    }

    pub fn catalogue_url(&self) -> String {
        format!("{}/catalogue/csw", self.base())
    }

    pub fn login_url(&self) -> String {
        format!("{}/account/login/", self.base())
    }
}

/// Parse a page size from string
pub fn parse_page_size(s: &str) -> Result<u32> {
    match s.trim().parse::<u32>() {
        Ok(size) if size > 0 => Ok(size),
        _ => Err(GeonodeError::ConfigInvalid {
            key: "page_size".to_string(),
            reason: format!("Invalid page size: {}. Use a positive integer", s),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_config() {
        let config = LayeredConfig::with_defaults();
        assert_eq!(config.base_url.value, None);
        assert_eq!(config.page_size.value, 10);
        assert_eq!(config.page_size.source, ConfigSource::Default);
    }

    #[test]
    fn test_config_precedence() {
        let mut value = ConfigValue::new(100, ConfigSource::Default);

        value.update(200, ConfigSource::File);
        assert_eq!(value.value, 200);
        assert_eq!(value.source, ConfigSource::File);

        value.update(300, ConfigSource::Environment);
        assert_eq!(value.value, 300);

        value.update(400, ConfigSource::Cli);
        assert_eq!(value.value, 400);
        assert_eq!(value.source, ConfigSource::Cli);

        // Lower precedence should not override
        value.update(500, ConfigSource::File);
        assert_eq!(value.value, 400);
    }

    #[test]
    fn test_load_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
base_url = "https://demo.geonode.org"
username = "admin"
password = "secret"
auth_config = "abc1234"
page_size = 25
"#
        )
        .unwrap();

        let config = LayeredConfig::with_defaults().load_from_file(file.path()).unwrap();

        assert_eq!(config.base_url.value.as_deref(), Some("https://demo.geonode.org"));
        assert_eq!(config.base_url.source, ConfigSource::File);
        assert_eq!(config.auth_config.value.as_deref(), Some("abc1234"));
        assert_eq!(config.page_size.value, 25);
    }

    #[test]
    fn test_connection_settings_require_base_url() {
        let err = LayeredConfig::with_defaults().to_connection_settings().unwrap_err();
        assert!(matches!(err, GeonodeError::ConfigMissing { ref key } if key == "base_url"));
    }

    #[test]
    fn test_connection_settings_endpoints() {
        let settings = ConnectionSettings::new("https://demo.geonode.org/").unwrap();

        assert_eq!(settings.base(), "https://demo.geonode.org");
        assert_eq!(settings.host(), "demo.geonode.org");
        assert_eq!(settings.catalogue_url(), "https://demo.geonode.org/catalogue/csw");
        assert_eq!(settings.login_url(), "https://demo.geonode.org/account/login/");
    }

    #[test]
    fn test_credentials_need_both_parts() {
        let mut config = LayeredConfig::with_defaults();
        config.update_from_cli(CliConfigOverrides {
            base_url: Some("http://localhost:8000".to_string()),
            username: Some("admin".to_string()),
            ..Default::default()
        });

        let settings = config.to_connection_settings().unwrap();
        assert!(settings.credentials.is_none());
    }

    #[test]
    fn test_zero_page_size_rejected() {
        let settings = ConnectionSettings::new("http://localhost:8000").unwrap();
        assert!(settings.with_page_size(0).is_err());
        assert!(parse_page_size("0").is_err());
        assert_eq!(parse_page_size(" 20 ").unwrap(), 20);
    }

    #[test]
    fn test_inspection_map_redacts_password() {
        let mut config = LayeredConfig::with_defaults();
        config.update_from_cli(CliConfigOverrides {
            password: Some("hunter2".to_string()),
            ..Default::default()
        });

        let map = config.to_inspection_map();
        let (password, source) = &map["password"];
        assert_eq!(password, "********");
        assert_eq!(*source, ConfigSource::Cli);
        assert!(!format!("{:?}", Credentials::new("a", "hunter2")).contains("hunter2"));
    }
}
