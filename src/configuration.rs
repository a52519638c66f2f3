use std::{
    env::{self, VarError},
    fmt, fs,
    io::ErrorKind,
    ops::Deref,
    path::Path,
    sync::Arc,
};

use tracing::{debug, info};

use crate::{
    controller::version::{new_version_handler, VersionHandler},
    error::Error,
};

const CONFIG_FILE: &str = ".env";
const DEFAULT_SERVER_HOST: &str = "0.0.0.0";
const DEFAULT_PORT: u16 = 8080;
const ALLOW_ALL_ORIGINS: &str = "*";

/// Version baked in at build time, e.g. `API_VERSION=1.4.2 cargo build`.
const BUILD_API_VERSION: Option<&str> = option_env!("API_VERSION");

#[derive(Debug)]
pub struct AppState<T>(Arc<T>);

impl<T> AppState<T> {
    pub fn new(state: T) -> AppState<T> {
        AppState(Arc::new(state))
    }
}

impl<T> Clone for AppState<T> {
    fn clone(&self) -> AppState<T> {
        AppState(Arc::clone(&self.0))
    }
}

impl<T> Deref for AppState<T> {
    type Target = Arc<T>;

    fn deref(&self) -> &Arc<T> {
        &self.0
    }
}

#[derive(Debug)]
pub struct State {
    pub config: Config,
    pub version_handler: Arc<dyn VersionHandler>,
}

impl State {
    pub fn new(config: Config) -> State {
        let version_handler = new_version_handler(config.api_version.clone());
        Self {
            config,
            version_handler,
        }
    }
}

/// The API version reported by the service.
///
/// Resolved once during startup and never changed afterwards; clones share
/// the same allocation, so handing it to request handlers needs no locking.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiVersion(Arc<str>);

impl ApiVersion {
    pub fn new(value: impl Into<Arc<str>>) -> ApiVersion {
        ApiVersion(value.into())
    }

    /// A runtime value takes precedence over the build-time one. An unset
    /// version is an empty string, not an error.
    pub fn resolve(runtime: Option<String>) -> ApiVersion {
        match runtime {
            Some(value) => ApiVersion::new(value),
            None => ApiVersion::new(BUILD_API_VERSION.unwrap_or_default()),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ApiVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub server_host: String,
    pub port: u16,
    pub allowed_origins: Vec<String>,
    pub api_version: ApiVersion,
}

impl Config {
    pub fn allows_all_origins(&self) -> bool {
        self.allowed_origins
            .iter()
            .any(|origin| origin == ALLOW_ALL_ORIGINS)
    }
}

pub fn get_configuration() -> Result<Config, Error> {
    build_configuration(read_var)
}

fn read_var(key: &str) -> Result<Option<String>, Error> {
    match env::var(key) {
        Ok(value) => Ok(Some(value)),
        Err(VarError::NotPresent) => Ok(None),
        Err(e) => Err(Error::VAR(e)),
    }
}

fn build_configuration<F>(lookup: F) -> Result<Config, Error>
where
    F: Fn(&str) -> Result<Option<String>, Error>,
{
    let server_host = lookup("SERVER_HOST")?
        .unwrap_or_else(|| DEFAULT_SERVER_HOST.to_owned());

    let port = match lookup("PORT")? {
        Some(value) => value.trim().parse::<u16>().map_err(|e| {
            Error::ConfigurationError(format!("PORT {:?}: {}", value, e))
        })?,
        None => DEFAULT_PORT,
    };

    let mut allowed_origins = lookup("ALLOWED_ORIGINS")?
        .unwrap_or_default()
        .split(',')
        .map(|item| item.trim().to_owned())
        .filter(|item| !item.is_empty())
        .collect::<Vec<String>>();

    if allowed_origins.is_empty() {
        allowed_origins.push(ALLOW_ALL_ORIGINS.to_owned());
    }

    let api_version = ApiVersion::resolve(lookup("API_VERSION")?);

    let config = Config {
        server_host,
        port,
        allowed_origins,
        api_version,
    };

    Ok(config)
}

/// Loads `.env` from the working directory into the process environment.
/// Variables already present in the environment are left untouched.
pub fn set_configuration() -> Result<(), Error> {
    load_config_file(Path::new(CONFIG_FILE))
}

fn load_config_file(path: &Path) -> Result<(), Error> {
    let config_string = match fs::read_to_string(path) {
        Ok(data) => data,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            debug!("No {} file found, using environment only", path.display());
            return Ok(());
        },
        Err(e) => {
            return Err(Error::from(
                anyhow::Error::new(e)
                    .context(format!("could not read {}", path.display())),
            ));
        },
    };

    let mut loaded = 0;
    for (key, value) in parse_config_string(&config_string) {
        if env::var_os(&key).is_none() {
            env::set_var(&key, value);
            loaded += 1;
        }
    }

    info!("Loaded {} variables from {}", loaded, path.display());

    Ok(())
}

fn parse_config_string(config: &str) -> Vec<(String, String)> {
    config
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .filter_map(|line| line.split_once('='))
        .map(|(key, value)| (key.trim(), value.trim()))
        .filter(|(key, _)| !key.is_empty())
        .map(|(key, value)| (key.to_owned(), value.to_owned()))
        .collect()
}

/// Reads the `.env` file and the environment into a `Config`.
pub fn init_config() -> Result<Config, Error> {
    set_configuration()?;
    get_configuration()
}
