// Copyright 2026 U.S. Federal Government (in countries where recognized)
// SPDX-License-Identifier: Apache-2.0

//! Daemon configuration: defaults, file loading (INI, JSON, YAML) and validation.
//!
//! JSON and YAML map directly onto [`NtpdConfig`] through serde. INI files use
//! `[section]` headers and `key = value` lines; keys outside any section are
//! looked up in every section. Lists are comma-separated in INI.

use std::fmt;
use std::fs;
use std::io;
use std::net::{IpAddr, SocketAddr};
use std::path::{Path, PathBuf};

use ntp_server::protocol::{LeapIndicator, MAXPOLL, MINPOLL, PORT};
use ntp_server::server::{DEFAULT_MAX_CLIENTS, DEFAULT_WORKERS};
use ntp_server::server_common::{DEFAULT_POLL, DEFAULT_PRECISION, DEFAULT_REFERENCE_ID, IpNet};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[cfg(not(windows))]
const DEFAULT_LOG_FILE: &str = "/var/log/simple-ntpd/simple-ntpd.log";
#[cfg(windows)]
const DEFAULT_LOG_FILE: &str = "C:\\ProgramData\\simple-ntpd\\simple-ntpd.log";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("cannot tell config format of {}; expected .ini, .conf, .json, .yaml or .yml", .0.display())]
    UnknownFormat(PathBuf),
    #[error("invalid JSON config: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid YAML config: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("invalid INI config at line {line}: {message}")]
    Ini { line: usize, message: String },
    #[error("invalid configuration: {}", .0.join("; "))]
    Invalid(Vec<String>),
}

/// Supported configuration file formats.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ConfigFormat {
    Ini,
    Json,
    Yaml,
}

impl ConfigFormat {
    /// Pick the format from the file extension.
    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase());
        match ext.as_deref() {
            Some("ini" | "conf" | "cfg") => Ok(ConfigFormat::Ini),
            Some("json") => Ok(ConfigFormat::Json),
            Some("yaml" | "yml") => Ok(ConfigFormat::Yaml),
            _ => Err(ConfigError::UnknownFormat(path.to_path_buf())),
        }
    }
}

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(default)]
pub struct NetworkConfig {
    pub listen_address: String,
    pub listen_port: u16,
    pub enable_ipv6: bool,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        NetworkConfig {
            listen_address: "0.0.0.0".to_string(),
            listen_port: PORT,
            enable_ipv6: true,
        }
    }
}

/// Leap second warning advertised in responses.
#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LeapSetting {
    #[default]
    None,
    AddSecond,
    DeleteSecond,
    Unsynchronized,
}

impl From<LeapSetting> for LeapIndicator {
    fn from(leap: LeapSetting) -> Self {
        match leap {
            LeapSetting::None => LeapIndicator::NoWarning,
            LeapSetting::AddSecond => LeapIndicator::AddOne,
            LeapSetting::DeleteSecond => LeapIndicator::SubOne,
            LeapSetting::Unsynchronized => LeapIndicator::Unknown,
        }
    }
}

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(default)]
pub struct ServerConfig {
    pub stratum: u8,
    pub reference_id: String,
    pub poll: i8,
    pub precision: i8,
    pub leap_indicator: LeapSetting,
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            stratum: 2,
            reference_id: DEFAULT_REFERENCE_ID.to_string(),
            poll: DEFAULT_POLL,
            precision: DEFAULT_PRECISION,
            leap_indicator: LeapSetting::None,
        }
    }
}

#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
#[serde(default)]
pub struct SecurityConfig {
    /// Accepted for compatibility; packets are never authenticated.
    pub enable_authentication: bool,
    /// Enforce `allowed_clients`. The deny list always applies.
    pub restrict_queries: bool,
    pub allowed_clients: Vec<String>,
    pub denied_clients: Vec<String>,
    /// Requests per minute allowed from one client; 0 disables rate limiting.
    pub rate_limit: u32,
}

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(default)]
pub struct PerformanceConfig {
    pub worker_threads: usize,
    pub max_clients: usize,
    pub enable_statistics: bool,
    pub stats_interval_secs: u64,
}

impl Default for PerformanceConfig {
    fn default() -> Self {
        PerformanceConfig {
            worker_threads: DEFAULT_WORKERS,
            max_clients: DEFAULT_MAX_CLIENTS,
            enable_statistics: true,
            stats_interval_secs: 300,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    #[serde(alias = "warning")]
    Warn,
    Error,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogDestination {
    #[default]
    Console,
    File,
    Both,
}

impl LogDestination {
    pub fn to_console(&self) -> bool {
        matches!(self, LogDestination::Console | LogDestination::Both)
    }

    pub fn to_file(&self) -> bool {
        matches!(self, LogDestination::File | LogDestination::Both)
    }
}

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: LogLevel,
    pub destination: LogDestination,
    pub log_file: PathBuf,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        LoggingConfig {
            level: LogLevel::Info,
            destination: LogDestination::Console,
            log_file: PathBuf::from(DEFAULT_LOG_FILE),
        }
    }
}

#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
#[serde(default)]
pub struct NtpdConfig {
    pub network: NetworkConfig,
    pub server: ServerConfig,
    pub security: SecurityConfig,
    pub performance: PerformanceConfig,
    pub logging: LoggingConfig,
}

impl NtpdConfig {
    /// Load a configuration file, picking the format from its extension.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let format = ConfigFormat::from_path(path)?;
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&content, format)
    }

    /// Parse configuration text; unspecified settings keep their defaults.
    pub fn parse(content: &str, format: ConfigFormat) -> Result<Self, ConfigError> {
        match format {
            ConfigFormat::Json => Ok(serde_json::from_str(content)?),
            ConfigFormat::Yaml => {
                // An empty YAML document is a null, not an empty map.
                if content.trim().is_empty() {
                    return Ok(Self::default());
                }
                Ok(serde_yaml::from_str(content)?)
            }
            ConfigFormat::Ini => Self::parse_ini(content),
        }
    }

    fn parse_ini(content: &str) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let mut section = String::new();
        for (idx, raw) in content.lines().enumerate() {
            let line = raw.trim();
            if line.is_empty() || line.starts_with('#') || line.starts_with(';') {
                continue;
            }
            let ini_err = |message: String| ConfigError::Ini {
                line: idx + 1,
                message,
            };
            if let Some(name) = line.strip_prefix('[') {
                let name = name
                    .strip_suffix(']')
                    .ok_or_else(|| ini_err(format!("unterminated section header {line:?}")))?;
                section = name.trim().to_ascii_lowercase();
                continue;
            }
            let (key, value) = line
                .split_once('=')
                .ok_or_else(|| ini_err(format!("expected key = value, got {line:?}")))?;
            config
                .parse_key_value(&section, key.trim(), unquote(value.trim()))
                .map_err(ini_err)?;
        }
        Ok(config)
    }

    /// Apply one `key = value` setting from `section` (empty for no section).
    pub fn parse_key_value(&mut self, section: &str, key: &str, value: &str) -> Result<(), String> {
        let key = key.to_ascii_lowercase();
        let sections: &[&str] = match section {
            "" => &["network", "server", "security", "performance", "logging"],
            "network" => &["network"],
            "server" | "ntp_server" => &["server"],
            "security" => &["security"],
            "performance" => &["performance"],
            "logging" => &["logging"],
            other => return Err(format!("unknown section [{other}]")),
        };
        for &section in sections {
            if let Some(result) = self.set(section, &key, value) {
                return result.map_err(|e| format!("{key}: {e}"));
            }
        }
        Err(format!("unknown key {key:?}"))
    }

    // None if `key` does not belong to `section`.
    fn set(&mut self, section: &str, key: &str, value: &str) -> Option<Result<(), String>> {
        let result = match (section, key) {
            ("network", "listen_address") => {
                self.network.listen_address = value.to_string();
                Ok(())
            }
            ("network", "listen_port") => parse_num(value).map(|v| self.network.listen_port = v),
            ("network", "enable_ipv6") => parse_bool(value).map(|v| self.network.enable_ipv6 = v),
            ("server", "stratum") => parse_num(value).map(|v| self.server.stratum = v),
            ("server", "reference_id" | "reference_clock") => {
                self.server.reference_id = value.to_string();
                Ok(())
            }
            ("server", "poll" | "min_poll") => parse_num(value).map(|v| self.server.poll = v),
            ("server", "precision") => parse_num(value).map(|v| self.server.precision = v),
            ("server", "leap_indicator") => parse_enum(value).map(|v| self.server.leap_indicator = v),
            ("security", "enable_authentication") => {
                parse_bool(value).map(|v| self.security.enable_authentication = v)
            }
            ("security", "restrict_queries") => {
                parse_bool(value).map(|v| self.security.restrict_queries = v)
            }
            ("security", "allowed_clients") => {
                self.security.allowed_clients = parse_list(value);
                Ok(())
            }
            ("security", "denied_clients") => {
                self.security.denied_clients = parse_list(value);
                Ok(())
            }
            ("security", "rate_limit") => parse_num(value).map(|v| self.security.rate_limit = v),
            ("performance", "worker_threads") => {
                parse_num(value).map(|v| self.performance.worker_threads = v)
            }
            ("performance", "max_clients") => {
                parse_num(value).map(|v| self.performance.max_clients = v)
            }
            ("performance", "enable_statistics") => {
                parse_bool(value).map(|v| self.performance.enable_statistics = v)
            }
            ("performance", "stats_interval_secs" | "stats_interval") => {
                parse_num(value).map(|v| self.performance.stats_interval_secs = v)
            }
            ("logging", "level" | "log_level") => parse_enum(value).map(|v| self.logging.level = v),
            ("logging", "destination") => parse_enum(value).map(|v| self.logging.destination = v),
            ("logging", "log_file") => {
                self.logging.log_file = PathBuf::from(value);
                Ok(())
            }
            _ => return None,
        };
        Some(result)
    }

    /// Check every setting and report all problems at once.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut problems = Vec::new();

        match self.network.listen_address.parse::<IpAddr>() {
            Ok(ip) if ip.is_ipv6() && !self.network.enable_ipv6 => problems.push(format!(
                "listen_address {ip} is IPv6 but enable_ipv6 is false"
            )),
            Ok(_) => {}
            Err(e) => problems.push(format!(
                "listen_address {:?}: {e}",
                self.network.listen_address
            )),
        }
        if self.network.listen_port == 0 {
            problems.push("listen_port must not be 0".to_string());
        }

        if !(1..=15).contains(&self.server.stratum) {
            problems.push(format!(
                "stratum {} out of range 1-15",
                self.server.stratum
            ));
        }
        if self.server.reference_id.trim().is_empty() {
            problems.push("reference_id must not be empty".to_string());
        }
        if !(MINPOLL as i8..=MAXPOLL as i8).contains(&self.server.poll) {
            problems.push(format!(
                "poll {} out of range {MINPOLL}-{MAXPOLL}",
                self.server.poll
            ));
        }
        if self.server.precision > 0 {
            problems.push(format!(
                "precision {} must not be positive",
                self.server.precision
            ));
        }

        for (name, list) in [
            ("allowed_clients", &self.security.allowed_clients),
            ("denied_clients", &self.security.denied_clients),
        ] {
            for entry in list {
                if let Err(e) = entry.parse::<IpNet>() {
                    problems.push(format!("{name}: {e}"));
                }
            }
        }

        if self.performance.worker_threads == 0 {
            problems.push("worker_threads must be at least 1".to_string());
        }
        if self.performance.max_clients == 0 {
            problems.push("max_clients must be at least 1".to_string());
        }
        if self.performance.enable_statistics && self.performance.stats_interval_secs == 0 {
            problems.push("stats_interval_secs must be at least 1".to_string());
        }

        if self.logging.destination.to_file() && self.logging.log_file.as_os_str().is_empty() {
            problems.push("log_file must be set when logging to a file".to_string());
        }

        if problems.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Invalid(problems))
        }
    }

    /// The socket address to bind.
    pub fn listen_socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        let ip: IpAddr = self.network.listen_address.parse().map_err(|e| {
            ConfigError::Invalid(vec![format!(
                "listen_address {:?}: {e}",
                self.network.listen_address
            )])
        })?;
        Ok(SocketAddr::new(ip, self.network.listen_port))
    }
}

impl fmt::Display for NtpdConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "listen: {}:{} (ipv6 {})",
            self.network.listen_address,
            self.network.listen_port,
            if self.network.enable_ipv6 { "on" } else { "off" }
        )?;
        writeln!(
            f,
            "server: stratum {} reference {:?} poll {} precision {} leap {:?}",
            self.server.stratum,
            self.server.reference_id,
            self.server.poll,
            self.server.precision,
            self.server.leap_indicator
        )?;
        writeln!(
            f,
            "security: restrict {} allowed {:?} denied {:?} rate limit {}/min",
            self.security.restrict_queries,
            self.security.allowed_clients,
            self.security.denied_clients,
            self.security.rate_limit
        )?;
        writeln!(
            f,
            "performance: {} workers, {} max clients, statistics {} every {}s",
            self.performance.worker_threads,
            self.performance.max_clients,
            self.performance.enable_statistics,
            self.performance.stats_interval_secs
        )?;
        write!(
            f,
            "logging: {} to {:?} ({})",
            self.logging.level,
            self.logging.destination,
            self.logging.log_file.display()
        )
    }
}

fn unquote(value: &str) -> &str {
    value
        .strip_prefix('"')
        .and_then(|v| v.strip_suffix('"'))
        .unwrap_or(value)
}

fn parse_bool(value: &str) -> Result<bool, String> {
    match value.to_ascii_lowercase().as_str() {
        "true" | "yes" | "on" | "1" => Ok(true),
        "false" | "no" | "off" | "0" => Ok(false),
        _ => Err(format!("expected a boolean, got {value:?}")),
    }
}

fn parse_num<T>(value: &str) -> Result<T, String>
where
    T: std::str::FromStr,
    T::Err: fmt::Display,
{
    value.parse().map_err(|e| format!("{value:?}: {e}"))
}

// Reuses the serde names so INI accepts exactly what JSON/YAML accept.
fn parse_enum<T: serde::de::DeserializeOwned>(value: &str) -> Result<T, String> {
    serde_json::from_value(serde_json::Value::String(value.to_ascii_lowercase()))
        .map_err(|e| format!("{value:?}: {e}"))
}

fn parse_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}
