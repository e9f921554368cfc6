use std::time::Duration;
use url::Url;

static API_URL: Option<&'static str> = option_env!("CHAT_API_URL");
static POLL_MS: Option<&'static str> = option_env!("CHAT_POLL_MS");
static PAGE_SIZE: Option<&'static str> = option_env!("CHAT_PAGE_SIZE");
static TOKEN_KEY: Option<&'static str> = option_env!("CHAT_TOKEN_KEY");

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(3000);
pub const DEFAULT_PAGE_SIZE: u32 = 50;
pub const DEFAULT_TOKEN_KEY: &str = "token";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid api url {0}")]
    Url(#[from] url::ParseError),

    #[error("Api url {0} cannot be used as a base")]
    NotABase(String),

    #[error("Page origin is unavailable")]
    NoOrigin,
}

/// Client settings, fixed at build time through `CHAT_*` environment variables.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub api_base: Url,
    pub poll_interval: Duration,
    pub page_size: u32,
    pub token_key: String,
}

impl Config {
    /// Builds the config from the compile-time environment, falling back to the
    /// page origin when no api url was baked in.
    pub fn from_env() -> Result<Self, ConfigError> {
        let base = match API_URL {
            Some(url) => url.to_string(),
            None => leptos::window()
                .location()
                .origin()
                .map_err(|_| ConfigError::NoOrigin)?,
        };
        let mut config = Self::with_base(&base)?;
        config.poll_interval = parse_poll_interval(POLL_MS);
        config.page_size = parse_page_size(PAGE_SIZE);
        if let Some(key) = TOKEN_KEY.filter(|key| !key.is_empty()) {
            config.token_key = key.to_string();
        }
        Ok(config)
    }

    pub fn with_base(base: &str) -> Result<Self, ConfigError> {
        Ok(Self {
            api_base: normalize_base(base)?,
            poll_interval: DEFAULT_POLL_INTERVAL,
            page_size: DEFAULT_PAGE_SIZE,
            token_key: DEFAULT_TOKEN_KEY.to_string(),
        })
    }
}

// Endpoint paths are joined relative to the base, so it has to end in a slash
// or the last segment would be replaced.
fn normalize_base(base: &str) -> Result<Url, ConfigError> {
    let mut url = Url::parse(base.trim())?;
    if url.cannot_be_a_base() {
        return Err(ConfigError::NotABase(base.to_string()));
    }
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    url.set_query(None);
    url.set_fragment(None);
    Ok(url)
}

fn parse_poll_interval(raw: Option<&str>) -> Duration {
    raw.and_then(|value| value.trim().parse::<u64>().ok())
        .filter(|ms| *ms > 0)
        .map(Duration::from_millis)
        .unwrap_or(DEFAULT_POLL_INTERVAL)
}

fn parse_page_size(raw: Option<&str>) -> u32 {
    raw.and_then(|value| value.trim().parse::<u32>().ok())
        .filter(|size| *size > 0)
        .unwrap_or(DEFAULT_PAGE_SIZE)
}
