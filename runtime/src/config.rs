// Copyright 2026 Newsparse Contributors
// SPDX-License-Identifier: Apache-2.0

//! Environment-level configuration read at startup.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

const DEFAULT_MAX_CONCURRENT_RENDERS: usize = 2;
const DEFAULT_MAX_RETRIES: u32 = 3;
const DEFAULT_RENDER_RETRIES: u32 = 2;
const DEFAULT_BATCH_DELAY_MS: u64 = 2000;
const DEFAULT_PORT: u16 = 3000;
const DEFAULT_HOST: &str = "0.0.0.0";

/// Runtime knobs. Every field has a default; env values that fail to parse
/// are ignored.
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    /// Capacity of the render concurrency guard.
    pub max_concurrent_renders: usize,
    /// Default attempts for the lightweight pipeline.
    pub default_max_retries: u32,
    /// Attempts for the render pipeline.
    pub render_retries: u32,
    /// Inter-request delay advertised to batch callers.
    pub batch_delay: Duration,
    pub host: String,
    pub port: u16,
    /// JSON file replacing the built-in domain policy tables.
    pub policy_file: Option<PathBuf>,
    /// Explicit browser executable.
    pub chromium_path: Option<PathBuf>,
    /// Directory swept for stale browser files after teardown.
    pub temp_dir: PathBuf,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            max_concurrent_renders: DEFAULT_MAX_CONCURRENT_RENDERS,
            default_max_retries: DEFAULT_MAX_RETRIES,
            render_retries: DEFAULT_RENDER_RETRIES,
            batch_delay: Duration::from_millis(DEFAULT_BATCH_DELAY_MS),
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            policy_file: None,
            chromium_path: None,
            temp_dir: std::env::temp_dir(),
        }
    }
}

impl RuntimeConfig {
    /// Read configuration from the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Read configuration through an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let max_retries = read_parsed(&lookup, "NEWSPARSE_MAX_RETRIES")
            .or_else(|| read_parsed(&lookup, "MAX_RETRIES"))
            .unwrap_or(defaults.default_max_retries);

        Self {
            max_concurrent_renders: read_parsed(&lookup, "NEWSPARSE_MAX_CONCURRENT_RENDERS")
                .unwrap_or(defaults.max_concurrent_renders)
                .max(1),
            default_max_retries: max_retries.max(1),
            render_retries: read_parsed(&lookup, "NEWSPARSE_RENDER_RETRIES")
                .unwrap_or(defaults.render_retries)
                .max(1),
            batch_delay: Duration::from_millis(
                read_parsed(&lookup, "DELAY_MS").unwrap_or(DEFAULT_BATCH_DELAY_MS),
            ),
            host: read_string(&lookup, "NEWSPARSE_HOST").unwrap_or(defaults.host),
            port: read_parsed(&lookup, "PORT").unwrap_or(defaults.port),
            policy_file: read_string(&lookup, "NEWSPARSE_POLICY_FILE").map(PathBuf::from),
            chromium_path: read_string(&lookup, "NEWSPARSE_CHROMIUM_PATH").map(PathBuf::from),
            temp_dir: read_string(&lookup, "NEWSPARSE_TEMP_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.temp_dir),
        }
    }

    /// Socket address for the REST listener. Falls back to all interfaces
    /// when the host does not parse.
    pub fn bind_addr(&self) -> SocketAddr {
        format!("{}:{}", self.host, self.port)
            .parse()
            .unwrap_or_else(|_| SocketAddr::from(([0, 0, 0, 0], self.port)))
    }
}

fn read_string<F>(lookup: &F, name: &str) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(name)
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn read_parsed<F, T>(lookup: &F, name: &str) -> Option<T>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    read_string(lookup, name).and_then(|v| v.parse::<T>().ok())
}
