use std::str::FromStr;

use tracing::warn;

use crate::preprocess::{PreprocessOptions, DEFAULT_MAX_DIMENSION, DEFAULT_QUALITY};

pub const DEFAULT_PORT: u16 = 8080;

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// Base URL of the analysis service. `None` runs the gateway in demo mode.
    pub analysis_url: Option<String>,
    pub preprocess: PreprocessOptions,
    pub port: u16,
}

impl Default for Config {
    fn default() -> Self {
        Self { analysis_url: None, preprocess: PreprocessOptions::default(), port: DEFAULT_PORT }
    }
}

fn parse_or<T: FromStr + Copy>(key: &str, raw: Option<String>, default: T, valid: impl Fn(T) -> bool) -> T {
    let Some(raw) = raw else { return default };
    match raw.trim().parse::<T>() {
        Ok(v) if valid(v) => v,
        _ => {
            warn!("Ignoring invalid {}={:?}, using default", key, raw);
            default
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let analysis_url = lookup("GLAMO_ANALYSIS_URL")
            .map(|u| u.trim().to_string())
            .filter(|u| !u.is_empty());
        let max_dimension = parse_or("GLAMO_MAX_DIMENSION", lookup("GLAMO_MAX_DIMENSION"), DEFAULT_MAX_DIMENSION, |v| v > 0);
        let quality = parse_or("GLAMO_QUALITY", lookup("GLAMO_QUALITY"), DEFAULT_QUALITY, |v: f32| v > 0.0 && v <= 1.0);
        let port = parse_or("PORT", lookup("PORT"), DEFAULT_PORT, |_| true);
        Self { analysis_url, preprocess: PreprocessOptions { max_dimension, quality }, port }
    }
}
