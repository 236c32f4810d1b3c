// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Vouch-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Vouch and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Remote avatar fetching.
//!
//! Avatars are fetched from an untrusted origin and re-encoded as `data:` URIs so the
//! badge is a self-contained document. Redirects are followed manually so the budget
//! is explicit; any failure is reported to the caller, which substitutes
//! [`DEFAULT_AVATAR_DATA_URI`] instead of aborting the render.

use std::fmt;
use std::time::Duration;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use reqwest::header::{HeaderValue, ACCEPT, CONTENT_TYPE, LOCATION, USER_AGENT};
use reqwest::redirect::Policy;
use reqwest::{StatusCode, Url};

/// Gray-circle placeholder embedded whenever an avatar cannot be fetched.
pub const DEFAULT_AVATAR_DATA_URI: &str = "data:image/svg+xml;base64,PHN2ZyB3aWR0aD0iMzAiIGhlaWdodD0iMzAiIHZpZXdCb3g9IjAgMCAzMCAzMCIgZmlsbD0ibm9uZSIgeG1sbnM9Imh0dHA6Ly93d3cudzMub3JnLzIwMDAvc3ZnIj4KPGNpcmNsZSBjeD0iMTUiIGN5PSIxNSIgcj0iMTUiIGZpbGw9IiNmMGYwZjAiLz4KPGNpcmNsZSBjeD0iMTUiIGN5PSIxNSIgcj0iMTIiIGZpbGw9IiNjY2MiLz4KPC9zdmc+";

const CLIENT_IDENT: &str = "Mozilla/5.0 (compatible; VouchBadgeBot/1.0)";
const MAX_REDIRECTS: usize = 5;
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);
const DEFAULT_CONTENT_TYPE: &str = "image/png";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AvatarFetchError {
    InvalidUrl(String),
    TooManyRedirects,
    FetchFailed(u16),
    FetchTimeout,
    Network(String),
}

impl fmt::Display for AvatarFetchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidUrl(url) => write!(f, "invalid avatar url: {url}"),
            Self::TooManyRedirects => write!(f, "too many redirects"),
            Self::FetchFailed(status) => write!(f, "failed to fetch avatar: {status}"),
            Self::FetchTimeout => write!(f, "avatar request timed out"),
            Self::Network(message) => write!(f, "avatar network error: {message}"),
        }
    }
}

impl std::error::Error for AvatarFetchError {}

/// HTTP client for avatar origins with a fixed redirect budget and per-request timeout.
#[derive(Debug, Clone)]
pub struct AvatarFetcher {
    client: reqwest::Client,
    origin: String,
}

impl AvatarFetcher {
    /// `origin` is the scheme+host prefix avatars live under, e.g. `https://github.com`;
    /// the per-username path is `/<username>.png`.
    ///
    /// Fails only if the TLS backend cannot be initialized.
    pub fn new(origin: impl Into<String>, timeout: Duration) -> Result<Self, AvatarFetchError> {
        let client = reqwest::Client::builder()
            .redirect(Policy::none())
            .timeout(timeout)
            .build()
            .map_err(|err| AvatarFetchError::Network(err.to_string()))?;

        Ok(Self {
            client,
            origin: origin.into().trim_end_matches('/').to_owned(),
        })
    }

    pub fn with_default_timeout(origin: impl Into<String>) -> Result<Self, AvatarFetchError> {
        Self::new(origin, DEFAULT_TIMEOUT)
    }

    pub fn avatar_url(&self, username: &str) -> String {
        format!("{}/{username}.png", self.origin)
    }

    /// Fetches `url` and returns it re-encoded as `data:<content-type>;base64,<payload>`.
    ///
    /// Follows up to five 3xx redirects (absolute or relative `Location`). A missing
    /// `Content-Type` defaults to `image/png`.
    pub async fn fetch_as_data_uri(&self, url: &str) -> Result<String, AvatarFetchError> {
        let mut url =
            Url::parse(url).map_err(|_| AvatarFetchError::InvalidUrl(url.to_owned()))?;

        for _ in 0..=MAX_REDIRECTS {
            let response = self
                .client
                .get(url.clone())
                .header(USER_AGENT, CLIENT_IDENT)
                .header(ACCEPT, "image/*")
                .send()
                .await
                .map_err(map_request_error)?;

            let status = response.status();
            if status.is_redirection() {
                url = redirect_target(&url, response.headers().get(LOCATION))?;
                continue;
            }

            if !status.is_success() {
                return Err(AvatarFetchError::FetchFailed(status.as_u16()));
            }

            let content_type = response
                .headers()
                .get(CONTENT_TYPE)
                .and_then(|value| value.to_str().ok())
                .unwrap_or(DEFAULT_CONTENT_TYPE)
                .to_owned();

            let body = response.bytes().await.map_err(map_request_error)?;
            return Ok(format!("data:{content_type};base64,{}", BASE64.encode(&body)));
        }

        Err(AvatarFetchError::TooManyRedirects)
    }
}

fn redirect_target(
    current: &Url,
    location: Option<&HeaderValue>,
) -> Result<Url, AvatarFetchError> {
    let location = location
        .and_then(|value| value.to_str().ok())
        .ok_or_else(|| AvatarFetchError::FetchFailed(StatusCode::FOUND.as_u16()))?;

    // `join` resolves both absolute and relative Location values against the current URL.
    current
        .join(location)
        .map_err(|_| AvatarFetchError::InvalidUrl(location.to_owned()))
}

fn map_request_error(error: reqwest::Error) -> AvatarFetchError {
    if error.is_timeout() {
        AvatarFetchError::FetchTimeout
    } else {
        AvatarFetchError::Network(error.to_string())
    }
}
