use std::net::SocketAddr;

use url::Url;

use crate::comment::MAX_THREAD_LEVEL;

#[derive(Clone, Debug, PartialEq)]
pub enum Env {
    Dev,
    Staging,
    Production,
}

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub listen_addr: SocketAddr,
    pub max_thread_level: usize,
    pub comments_api: Option<CommentsApi>,
}

#[derive(Clone, Debug)]
pub struct CommentsApi {
    pub url: Url,
    pub token: Option<String>,
    pub page_size: usize,
    pub max_pages: usize,
}

const DEFAULT_PORT: u16 = 3000;
pub const DEFAULT_PAGE_SIZE: usize = 50;
const DEFAULT_MAX_PAGES: usize = 20;
// every level is one more stack frame while building and flattening
const THREAD_LEVEL_CEILING: usize = 64;

fn var(key: &str) -> Result<Option<String>, String> {
    match std::env::var(key) {
        Ok(env) => Ok(Some(env)),
        Err(e) => {
            tracing::warn!("Missing environment variable `{key}`");
            match e {
                std::env::VarError::NotPresent => Ok(None),
                std::env::VarError::NotUnicode(_) => Err(format!(
                    "Could not get the environment variable `{key}` due to unicode error"
                )),
            }
        }
    }
}

/// Reads a numeric variable, falling back to `default` when it is missing or
/// cannot be parsed.
fn numeric_var<T: std::str::FromStr + Copy + std::fmt::Display>(key: &str, default: T) -> T {
    match var(key) {
        Ok(Some(val)) => parse_or(key, &val, default),
        Ok(None) => default,
        Err(e) => {
            tracing::error!("{e}, using default {default}");
            default
        }
    }
}

fn parse_or<T: std::str::FromStr + Copy + std::fmt::Display>(key: &str, val: &str, default: T) -> T {
    val.trim().parse().unwrap_or_else(|_| {
        tracing::error!("Environment variable `{key}` has invalid value `{val}`, using default {default}");
        default
    })
}

fn bounded_thread_level(level: usize) -> usize {
    if level > THREAD_LEVEL_CEILING {
        tracing::warn!("`MAX_THREAD_LEVEL` {level} is above {THREAD_LEVEL_CEILING}, clamping");
    }
    level.min(THREAD_LEVEL_CEILING)
}

impl Env {
    pub fn from_name(name: Option<&str>) -> Env {
        match name {
            Some("dev") => Env::Dev,
            Some("staging") => Env::Staging,
            Some("production") => Env::Production,
            _ => Env::Dev,
        }
    }
}

impl ServerConfig {
    pub fn new_from_env() -> Self {
        let comments_api = match var("COMMENTS_API_URL") {
            Ok(Some(raw)) => match Url::parse(&raw) {
                Ok(url) => Some(CommentsApi {
                    url,
                    token: var("COMMENTS_API_TOKEN").ok().flatten(),
                    page_size: numeric_var("COMMENTS_API_PAGE_SIZE", DEFAULT_PAGE_SIZE),
                    max_pages: numeric_var("COMMENTS_API_MAX_PAGES", DEFAULT_MAX_PAGES),
                }),
                Err(e) => {
                    tracing::error!("Environment variable `COMMENTS_API_URL` is not a valid URL: {e}");
                    std::process::exit(1)
                }
            },
            Ok(None) => None,
            Err(e) => {
                tracing::error!("{e}");
                std::process::exit(1)
            }
        };

        let port = numeric_var("PORT", DEFAULT_PORT);

        ServerConfig {
            listen_addr: SocketAddr::from(([0, 0, 0, 0], port)),
            max_thread_level: bounded_thread_level(numeric_var("MAX_THREAD_LEVEL", MAX_THREAD_LEVEL)),
            comments_api,
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            listen_addr: SocketAddr::from(([0, 0, 0, 0], DEFAULT_PORT)),
            max_thread_level: MAX_THREAD_LEVEL,
            comments_api: None,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_env_from_name() {
        assert_eq!(Env::from_name(Some("production")), Env::Production);
        assert_eq!(Env::from_name(Some("staging")), Env::Staging);
        assert_eq!(Env::from_name(Some("prod")), Env::Dev);
        assert_eq!(Env::from_name(None), Env::Dev);
    }

    #[test]
    fn test_parse_or_falls_back_on_garbage() {
        assert_eq!(parse_or("MAX_THREAD_LEVEL", " 5 ", MAX_THREAD_LEVEL), 5);
        assert_eq!(parse_or("MAX_THREAD_LEVEL", "deep", MAX_THREAD_LEVEL), MAX_THREAD_LEVEL);
        assert_eq!(parse_or("PORT", "-1", DEFAULT_PORT), DEFAULT_PORT);
    }

    #[test]
    fn test_thread_level_is_clamped() {
        assert_eq!(bounded_thread_level(12), 12);
        assert_eq!(bounded_thread_level(THREAD_LEVEL_CEILING), THREAD_LEVEL_CEILING);
        assert_eq!(bounded_thread_level(1_000_000), THREAD_LEVEL_CEILING);
    }

    #[test]
    fn test_default_config() {
        let config = ServerConfig::default();
        assert_eq!(config.max_thread_level, 8);
        assert_eq!(config.listen_addr.port(), 3000);
        assert!(config.comments_api.is_none());
    }
}
