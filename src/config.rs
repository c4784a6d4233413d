//! Board and backend configuration parsed from environment variables.
//!
//! Every tunable has a compiled-in default from [`crate::consts`]; a missing
//! or unparseable variable falls back to it. Only the backend base URL is
//! required.

#[cfg(test)]
#[path = "config_test.rs"]
mod config_test;

use crate::backend::BackendError;
use crate::camera::ZoomLimits;
use crate::consts::{
    DEFAULT_NOTE_HEIGHT, DEFAULT_NOTE_WIDTH, HANDLE_RADIUS_PX, MAX_ZOOM, MIN_NOTE_HEIGHT, MIN_NOTE_WIDTH, MIN_ZOOM,
    WHEEL_ZOOM_STEP,
};
use crate::gesture::SizeLimits;

pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;

/// Interaction tuning for the board engine.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoardConfig {
    pub zoom: ZoomLimits,
    pub min_size: SizeLimits,
    pub default_width: f64,
    pub default_height: f64,
    /// Zoom change per wheel pixel.
    pub wheel_zoom_step: f64,
    /// Resize handle hit slop in screen pixels.
    pub handle_radius_px: f64,
}

impl Default for BoardConfig {
    fn default() -> Self {
        Self {
            zoom: ZoomLimits { min: MIN_ZOOM, max: MAX_ZOOM },
            min_size: SizeLimits { min_width: MIN_NOTE_WIDTH, min_height: MIN_NOTE_HEIGHT },
            default_width: DEFAULT_NOTE_WIDTH,
            default_height: DEFAULT_NOTE_HEIGHT,
            wheel_zoom_step: WHEEL_ZOOM_STEP,
            handle_radius_px: HANDLE_RADIUS_PX,
        }
    }
}

impl BoardConfig {
    /// Read overrides from the process environment.
    ///
    /// - `NOTEBOARD_MIN_ZOOM` / `NOTEBOARD_MAX_ZOOM`
    /// - `NOTEBOARD_MIN_NOTE_WIDTH` / `NOTEBOARD_MIN_NOTE_HEIGHT`
    /// - `NOTEBOARD_DEFAULT_NOTE_WIDTH` / `NOTEBOARD_DEFAULT_NOTE_HEIGHT`
    /// - `NOTEBOARD_WHEEL_ZOOM_STEP`
    /// - `NOTEBOARD_HANDLE_RADIUS_PX`
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(env_var)
    }

    /// Same as [`BoardConfig::from_env`], reading variables through `lookup`.
    #[must_use]
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let d = Self::default();
        let mut zoom = ZoomLimits {
            min: parse_positive(&lookup, "NOTEBOARD_MIN_ZOOM", d.zoom.min),
            max: parse_positive(&lookup, "NOTEBOARD_MAX_ZOOM", d.zoom.max),
        };
        if zoom.min > zoom.max {
            zoom = d.zoom;
        }
        Self {
            zoom,
            min_size: SizeLimits {
                min_width: parse_positive(&lookup, "NOTEBOARD_MIN_NOTE_WIDTH", d.min_size.min_width),
                min_height: parse_positive(&lookup, "NOTEBOARD_MIN_NOTE_HEIGHT", d.min_size.min_height),
            },
            default_width: parse_positive(&lookup, "NOTEBOARD_DEFAULT_NOTE_WIDTH", d.default_width),
            default_height: parse_positive(&lookup, "NOTEBOARD_DEFAULT_NOTE_HEIGHT", d.default_height),
            wheel_zoom_step: parse_positive(&lookup, "NOTEBOARD_WHEEL_ZOOM_STEP", d.wheel_zoom_step),
            handle_radius_px: parse_positive(&lookup, "NOTEBOARD_HANDLE_RADIUS_PX", d.handle_radius_px),
        }
    }
}

/// Connection settings for the REST backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendConfig {
    /// Base URL without a trailing slash, e.g. `http://localhost:8000/api`.
    pub base_url: String,
    /// Sent as a bearer token when present.
    pub token: Option<String>,
    pub request_timeout_secs: u64,
    pub connect_timeout_secs: u64,
}

impl BackendConfig {
    /// Read backend settings from the process environment.
    ///
    /// Required:
    /// - `NOTEBOARD_API_URL`
    ///
    /// Optional:
    /// - `NOTEBOARD_API_TOKEN`
    /// - `NOTEBOARD_REQUEST_TIMEOUT_SECS`: default 30
    /// - `NOTEBOARD_CONNECT_TIMEOUT_SECS`: default 10
    ///
    /// # Errors
    ///
    /// Returns [`BackendError::InvalidConfig`] if the base URL is missing or not http(s).
    pub fn from_env() -> Result<Self, BackendError> {
        Self::from_lookup(env_var)
    }

    /// Same as [`BackendConfig::from_env`], reading variables through `lookup`.
    ///
    /// # Errors
    ///
    /// Returns [`BackendError::InvalidConfig`] if the base URL is missing or not http(s).
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, BackendError> {
        let raw = lookup("NOTEBOARD_API_URL")
            .filter(|v| !v.trim().is_empty())
            .ok_or_else(|| BackendError::InvalidConfig("NOTEBOARD_API_URL is not set".into()))?;
        let base_url = normalize_base_url(&raw)?;
        let token = lookup("NOTEBOARD_API_TOKEN").map(|t| t.trim().to_owned()).filter(|t| !t.is_empty());
        Ok(Self {
            base_url,
            token,
            request_timeout_secs: parse_or(&lookup, "NOTEBOARD_REQUEST_TIMEOUT_SECS", DEFAULT_REQUEST_TIMEOUT_SECS),
            connect_timeout_secs: parse_or(&lookup, "NOTEBOARD_CONNECT_TIMEOUT_SECS", DEFAULT_CONNECT_TIMEOUT_SECS),
        })
    }
}

/// Trim whitespace and trailing slashes; reject anything that is not http(s).
///
/// # Errors
///
/// Returns [`BackendError::InvalidConfig`] for a non-http(s) URL.
pub fn normalize_base_url(raw: &str) -> Result<String, BackendError> {
    let url = raw.trim().trim_end_matches('/');
    if !(url.starts_with("http://") || url.starts_with("https://")) {
        return Err(BackendError::InvalidConfig(format!("unsupported base URL: {url}")));
    }
    Ok(url.to_owned())
}

fn env_var(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

fn parse_or<T: std::str::FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> T {
    lookup(key).and_then(|v| v.trim().parse::<T>().ok()).unwrap_or(default)
}

fn parse_positive(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: f64) -> f64 {
    let value = parse_or(lookup, key, default);
    if value.is_finite() && value > 0.0 { value } else { default }
}
