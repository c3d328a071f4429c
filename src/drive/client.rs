//! HTTP client construction for Drive traffic.
//!
//! One client is built per [`DriveFetcher`](super::DriveFetcher) and shared by
//! every operation it runs; per-operation state (cookies, tokens) travels in
//! explicit headers, never in a shared jar.

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::time::Duration;

use reqwest::{Client, ClientBuilder, Proxy, redirect};
use tracing::warn;

use super::constants::MAX_REDIRECTS;
use super::error::DriveError;
use crate::user_agent::{BROWSER_USER_AGENT, browser_headers};

/// Builds the shared Drive client.
///
/// Request-level timeouts are applied per call; only the connect timeout is
/// fixed here.
///
/// # Errors
///
/// Returns [`DriveError::TransportFailure`] when the client cannot be built.
pub fn build_drive_client(connect_timeout: Duration) -> Result<Client, DriveError> {
    match try_build_client(connect_timeout, false) {
        Ok(client) => Ok(client),
        Err(BuildClientFailure::Panic) => {
            // Some sandboxed environments panic when reading system proxy
            // settings; fall back to env proxies only.
            warn!("HTTP client builder panicked while loading system proxy settings; retrying with env-proxy fallback");
            match try_build_client(connect_timeout, true) {
                Ok(client) => Ok(client),
                Err(BuildClientFailure::Build(error)) => Err(build_failure(error)),
                Err(BuildClientFailure::Panic) => Err(DriveError::TransportFailure {
                    message: "HTTP client construction failed.",
                    url: String::new(),
                    source: None,
                }),
            }
        }
        Err(BuildClientFailure::Build(error)) => Err(build_failure(error)),
    }
}

fn build_failure(error: reqwest::Error) -> DriveError {
    DriveError::TransportFailure {
        message: "HTTP client construction failed.",
        url: String::new(),
        source: Some(error),
    }
}

enum BuildClientFailure {
    Panic,
    Build(reqwest::Error),
}

fn try_build_client(
    connect_timeout: Duration,
    disable_system_proxy_lookup: bool,
) -> Result<Client, BuildClientFailure> {
    catch_unwind(AssertUnwindSafe(move || {
        let mut builder = base_builder(connect_timeout);
        if disable_system_proxy_lookup {
            builder = apply_env_proxy_fallback(builder.no_proxy());
        }
        builder.build().map_err(BuildClientFailure::Build)
    }))
    .map_err(|_| BuildClientFailure::Panic)?
}

fn base_builder(connect_timeout: Duration) -> ClientBuilder {
    Client::builder()
        .connect_timeout(connect_timeout)
        .redirect(redirect::Policy::limited(MAX_REDIRECTS))
        .default_headers(browser_headers())
        .user_agent(BROWSER_USER_AGENT)
        .gzip(true)
}

fn apply_env_proxy_fallback(mut builder: ClientBuilder) -> ClientBuilder {
    if let Some(proxy) = env_proxy_for_scheme("https")
        && let Ok(resolved) = Proxy::https(&proxy)
    {
        builder = builder.proxy(resolved);
    }
    if let Some(proxy) = env_proxy_for_scheme("http")
        && let Ok(resolved) = Proxy::http(&proxy)
    {
        builder = builder.proxy(resolved);
    }
    builder
}

fn env_proxy_for_scheme(scheme: &str) -> Option<String> {
    match scheme {
        "https" => find_first_proxy_var(&["HTTPS_PROXY", "https_proxy", "ALL_PROXY", "all_proxy"]),
        "http" => find_first_proxy_var(&["HTTP_PROXY", "http_proxy", "ALL_PROXY", "all_proxy"]),
        _ => None,
    }
}

fn find_first_proxy_var(names: &[&str]) -> Option<String> {
    names.iter().find_map(|name| {
        std::env::var(name)
            .ok()
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
    })
}
