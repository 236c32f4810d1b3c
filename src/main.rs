// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Vouch-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Vouch and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Vouch service entrypoint.
//!
//! Serves the badge and recommendation API over HTTP. Flags win over environment
//! variables; both fall back to defaults suitable for local use.

use std::error::Error;
use std::sync::Arc;
use std::time::Duration;

use tracing_subscriber::EnvFilter;

use vouch::avatar::AvatarFetcher;
use vouch::cache::BadgeCache;
use vouch::store::SqliteStore;
use vouch::web::{router, AppState};

const DEFAULT_PORT: u16 = 3000;
const DEFAULT_DB_PATH: &str = "./vouch.db";
const DEFAULT_AVATAR_ORIGIN: &str = "https://github.com";
const DEFAULT_AVATAR_TIMEOUT_SECS: u64 = 10;

fn print_usage(program: &str) {
    eprintln!(
        "Usage:\n  {program} [--port <port>] [--db <path>] [--avatar-origin <url>] [--avatar-timeout-secs <secs>]\n\nEnvironment fallbacks: PORT, VOUCH_DB, AVATAR_ORIGIN, AVATAR_TIMEOUT_SECS.\nDefaults: port {DEFAULT_PORT}, db {DEFAULT_DB_PATH}, origin {DEFAULT_AVATAR_ORIGIN}, timeout {DEFAULT_AVATAR_TIMEOUT_SECS}s."
    );
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
struct CliOptions {
    port: Option<u16>,
    db_path: Option<String>,
    avatar_origin: Option<String>,
    avatar_timeout_secs: Option<u64>,
}

fn parse_options(mut args: impl Iterator<Item = String>) -> Result<CliOptions, ()> {
    let mut options = CliOptions::default();

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--port" => {
                if options.port.is_some() {
                    return Err(());
                }
                let raw = args.next().ok_or(())?;
                options.port = Some(raw.parse().map_err(|_| ())?);
            }
            "--db" => {
                if options.db_path.is_some() {
                    return Err(());
                }
                options.db_path = Some(args.next().ok_or(())?);
            }
            "--avatar-origin" => {
                if options.avatar_origin.is_some() {
                    return Err(());
                }
                options.avatar_origin = Some(args.next().ok_or(())?);
            }
            "--avatar-timeout-secs" => {
                if options.avatar_timeout_secs.is_some() {
                    return Err(());
                }
                let raw = args.next().ok_or(())?;
                options.avatar_timeout_secs = Some(raw.parse().map_err(|_| ())?);
            }
            _ => return Err(()),
        }
    }

    Ok(options)
}

fn env_string(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|value| !value.is_empty())
}

fn env_parsed<T: std::str::FromStr>(name: &str) -> Option<T> {
    env_string(name).and_then(|value| value.parse().ok())
}

fn main() {
    let result = (|| -> Result<(), Box<dyn Error>> {
        tracing_subscriber::fmt()
            .with_env_filter(
                EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
            )
            .init();

        let mut args = std::env::args();
        let program = args.next().unwrap_or_else(|| "vouch".to_owned());

        let options = match parse_options(args) {
            Ok(options) => options,
            Err(()) => {
                print_usage(&program);
                std::process::exit(2);
            }
        };

        let port = options.port.or_else(|| env_parsed("PORT")).unwrap_or(DEFAULT_PORT);
        let db_path = options
            .db_path
            .or_else(|| env_string("VOUCH_DB"))
            .unwrap_or_else(|| DEFAULT_DB_PATH.to_owned());
        let avatar_origin = options
            .avatar_origin
            .or_else(|| env_string("AVATAR_ORIGIN"))
            .unwrap_or_else(|| DEFAULT_AVATAR_ORIGIN.to_owned());
        let avatar_timeout = Duration::from_secs(
            options
                .avatar_timeout_secs
                .or_else(|| env_parsed("AVATAR_TIMEOUT_SECS"))
                .unwrap_or(DEFAULT_AVATAR_TIMEOUT_SECS),
        );

        let store = SqliteStore::open(&db_path)?;
        let fetcher = AvatarFetcher::new(avatar_origin, avatar_timeout)?;
        let cache = Arc::new(BadgeCache::new(fetcher));
        let app = router(AppState { store, cache });

        let runtime = tokio::runtime::Builder::new_current_thread().enable_all().build()?;

        runtime.block_on(async move {
            let listener = tokio::net::TcpListener::bind(("0.0.0.0", port)).await?;
            tracing::info!(port, db = %db_path, "vouch listening");

            axum::serve(listener, app)
                .with_graceful_shutdown(async {
                    if tokio::signal::ctrl_c().await.is_err() {
                        tracing::warn!("failed to install shutdown signal handler");
                    }
                    tracing::info!("shutting down");
                })
                .await?;

            Ok::<(), Box<dyn Error>>(())
        })?;

        Ok(())
    })();

    if let Err(err) = result {
        eprintln!("vouch: {err}");
        std::process::exit(1);
    }
}
