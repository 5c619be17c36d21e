//! Reelgen API client.
//!
//! This crate provides a lightweight client for the Reelgen generation
//! backend. It focuses on:
//!
//! - Constructing an HTTP client with sensible defaults
//! - Discovering credentials from `REELGEN_API_KEY`
//! - Validating `REELGEN_API_BASE` for safety
//! - Building requests with a consistent User-Agent and Accept headers
//!
//! The primary entry point is [`ReelgenClient`]. Create an instance via
//! [`ReelgenClient::new_from_env`], then use the typed endpoint wrappers in
//! [`generations`] or build raw requests with [`ReelgenClient::request`].

use std::env;
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use reqwest::{Client, RequestBuilder, Url, header};
use tracing::debug;

pub mod generations;

pub use generations::ApiError;

/// Environment variable overriding the API base URL.
pub const API_BASE_ENV: &str = "REELGEN_API_BASE";

/// Environment variable supplying the API key.
pub const API_KEY_ENV: &str = "REELGEN_API_KEY";

/// Default public API base.
pub const DEFAULT_API_BASE: &str = "https://api.reelgen.io";

/// Allowed base domains for non-local configurations of `REELGEN_API_BASE`.
/// Subdomains of these domains are also allowed.
const ALLOWED_API_DOMAINS: &[&str] = &["reelgen.io", "reelgen.dev"];
/// Hostnames allowed for local development regardless of scheme.
const LOCALHOST_DOMAINS: &[&str] = &["localhost", "127.0.0.1"];

/// Thin wrapper around a configured `reqwest::Client` for Reelgen API access.
///
/// The client pre-configures default headers and builds requests against a
/// validated base URL. Authentication is read from the environment.
#[derive(Debug, Clone)]
pub struct ReelgenClient {
    pub base_url: String,
    pub http: Client,
    pub user_agent: String,
}

impl ReelgenClient {
    /// Construct a [`ReelgenClient`] from environment variables.
    ///
    /// The base URL is taken from `REELGEN_API_BASE` (if set) or falls back
    /// to the default public API. Non-localhost hosts must use HTTPS and be
    /// within an allowed Reelgen domain. A bearer token is attached when
    /// `REELGEN_API_KEY` is present; unauthenticated clients can still reach
    /// local development backends.
    pub fn new_from_env() -> Result<Self> {
        let api_token = env::var(API_KEY_ENV).ok();

        let mut default_headers = header::HeaderMap::new();
        if let Some(api_token) = api_token {
            let authorization_header_value = format!("Bearer {}", api_token);
            default_headers.insert(
                header::AUTHORIZATION,
                header::HeaderValue::from_str(&authorization_header_value).context("invalid characters in API key")?,
            );
        }
        default_headers.insert(header::ACCEPT, header::HeaderValue::from_static("application/json"));

        let http = Client::builder()
            .default_headers(default_headers)
            .timeout(Duration::from_secs(30))
            .build()
            .context("build http client")?;

        let base_url = env::var(API_BASE_ENV).unwrap_or_else(|_| DEFAULT_API_BASE.into());
        validate_base_url(&base_url)?;

        Ok(Self {
            base_url,
            http,
            user_agent: format!("reelgen-cli/0.1; {}", env::consts::OS),
        })
    }

    /// Build a `reqwest::RequestBuilder` for a method and API-relative path.
    ///
    /// The resulting request includes the configured User-Agent and base
    /// headers, and is resolved relative to `self.base_url`.
    pub fn request(&self, method: reqwest::Method, path: &str) -> RequestBuilder {
        let url = format!("{}{}", self.base_url, path);
        debug!(%url, "building request");

        self.http
            .request(method, url)
            .header(header::USER_AGENT, &self.user_agent)
    }
}

/// Validate that a base URL is acceptable for use by the client.
///
/// Rules:
/// - `localhost` or `127.0.0.1`: any scheme is allowed
/// - otherwise: scheme must be HTTPS, and host must be one of the allowed
///   Reelgen domains or a subdomain thereof
fn validate_base_url(base: &str) -> Result<()> {
    let parsed_base_url = Url::parse(base).map_err(|e| anyhow!("Invalid {} URL '{}': {}", API_BASE_ENV, base, e))?;

    let host_name = parsed_base_url
        .host_str()
        .ok_or_else(|| anyhow!("{} must include a host", API_BASE_ENV))?;

    // Local development allowances: localhost/127.0.0.1 with any scheme.
    if LOCALHOST_DOMAINS
        .iter()
        .any(|&allowed| host_name.eq_ignore_ascii_case(allowed))
    {
        return Ok(());
    }

    // Production/staging: must be HTTPS and end with one of the allowed domains.
    if parsed_base_url.scheme() != "https" {
        return Err(anyhow!(
            "{} must use https for non-localhost hosts; got '{}://'",
            API_BASE_ENV,
            parsed_base_url.scheme()
        ));
    }

    let is_allowed_domain = ALLOWED_API_DOMAINS.iter().any(|&allowed_domain| {
        host_name.eq_ignore_ascii_case(allowed_domain) || host_name.ends_with(&format!(".{}", allowed_domain))
    });
    if !is_allowed_domain {
        return Err(anyhow!(
            "{} host '{}' is not allowed; must be one of {:?} or a subdomain, or localhost",
            API_BASE_ENV,
            host_name,
            ALLOWED_API_DOMAINS
        ));
    }

    Ok(())
}
