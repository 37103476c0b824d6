use config::{Config, ConfigError, File};
use secrecy::{ExposeSecret, Secret};
use serde_aux::field_attributes::deserialize_number_from_string;
use std::time;

const DEFAULT_TAB_NAME: &str = "Sheet1";

#[derive(Debug)]
pub enum Environment {
    Development,
    Production,
}

#[derive(serde::Deserialize, Clone)]
pub struct Settings {
    pub application: ApplicationSettings,
    pub google_sheets: GoogleSheetsSettings,
}

#[derive(serde::Deserialize, Clone)]
pub struct ApplicationSettings {
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub port: u16,
    pub host: String,
    // When set, subscribe requests must carry it as a bearer token
    pub api_token: Option<Secret<String>>,
}

#[derive(serde::Deserialize, Clone)]
pub struct GoogleSheetsSettings {
    pub client_email: Option<String>,
    // secrecy protects secret information and prevents them to be exposed (eg: via logs)
    pub private_key: Option<Secret<String>>,
    pub sheet_id: Option<String>,
    pub tab_name: Option<String>,
    pub token_url: String,
    pub api_base_url: String,
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub timeout_milliseconds: u64,
}

impl Settings {
    pub fn get_address(&self) -> String {
        format!(
            "{}:{}",
            self.application.get_host(),
            self.application.get_port()
        )
    }

    pub fn get_api_token(&self) -> Option<Secret<String>> {
        self.application
            .api_token
            .clone()
            .filter(|token| !token.expose_secret().is_empty())
    }

    pub fn set_app_port(&mut self, port: u16) {
        self.application.port = port;
    }
}

impl ApplicationSettings {
    pub fn get_port(&self) -> u16 {
        self.port
    }

    pub fn get_host(&self) -> String {
        self.host.clone()
    }
}

impl GoogleSheetsSettings {
    /// Spreadsheet identifier, `None` when unset or blank.
    pub fn get_sheet_id(&self) -> Option<&str> {
        self.sheet_id
            .as_deref()
            .map(str::trim)
            .filter(|sheet_id| !sheet_id.is_empty())
    }

    pub fn get_tab_name(&self) -> &str {
        self.tab_name
            .as_deref()
            .filter(|tab_name| !tab_name.is_empty())
            .unwrap_or(DEFAULT_TAB_NAME)
    }

    pub fn get_timeout(&self) -> time::Duration {
        time::Duration::from_millis(self.timeout_milliseconds)
    }

    pub fn set_base_urls(&mut self, token_url: String, api_base_url: String) {
        self.token_url = token_url;
        self.api_base_url = api_base_url;
    }
}

impl Environment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Development => "development",
            Environment::Production => "production",
        }
    }
}

impl TryFrom<String> for Environment {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        match value.to_lowercase().as_str() {
            "development" => Ok(Self::Development),
            "production" => Ok(Self::Production),
            unknown_env => Err(format!(
                "{} is not supported environment. Use either 'development' or 'production'.",
                unknown_env
            )),
        }
    }
}

pub fn get_configuration() -> Result<Settings, ConfigError> {
    let root_path = std::env::current_dir().map_err(|err| {
        ConfigError::Message(format!(
            "Failed to determine the current directory: {}",
            err
        ))
    })?;
    let config_directory = root_path.join("config");
    // Uses development environment by default
    let enviroment: Environment = std::env::var("APP_ENVIRONMENT")
        .unwrap_or_else(|_| "development".into())
        .try_into()
        .map_err(ConfigError::Message)?;
    let config_base_filepath = config_directory.join("base");
    let config_env_filepath = config_directory.join(enviroment.as_str());

    // It merges the base configuration file with the one from the specific environment (development or production)
    let settings = Config::builder()
        .add_source(File::from(config_base_filepath).required(true))
        .add_source(File::from(config_env_filepath).required(true))
        // Merge settings from environment variables with a prefix of APP and "__" separator
        // E.g APP_APPLICATION__PORT would set Settings.application.port
        .add_source(
            config::Environment::with_prefix("app")
                .prefix_separator("_")
                .separator("__"),
        )
        // The variables used by existing deployments win over everything else
        .set_override_option(
            "google_sheets.client_email",
            std::env::var("GOOGLE_SHEETS_CLIENT_EMAIL").ok(),
        )?
        .set_override_option(
            "google_sheets.private_key",
            std::env::var("GOOGLE_SHEETS_PRIVATE_KEY").ok(),
        )?
        .set_override_option(
            "google_sheets.sheet_id",
            std::env::var("GOOGLE_SHEETS_SHEET_ID").ok(),
        )?
        .set_override_option(
            "google_sheets.tab_name",
            std::env::var("GOOGLE_SHEETS_TAB_NAME").ok(),
        )?
        .build()?;

    tracing::info!("Application environment = {:?}", enviroment);

    // Try to convert the value from the configuration file into a Settings type
    settings.try_deserialize()
}
