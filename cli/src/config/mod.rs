//! Configuration
//!
//! Built once at startup and passed by reference. Values come from, lowest
//! precedence first: defaults, a TOML file, `.env`, the process environment.

use chrono::Duration;
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::{debug, info};

use email_triage::TriageError;

/// Application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub account: AccountConfig,

    #[serde(default)]
    pub imap: ImapConfig,

    #[serde(default)]
    pub smtp: SmtpConfig,

    #[serde(default)]
    pub llm: LlmConfig,

    #[serde(default)]
    pub triage: TriageConfig,
}

/// Mailbox credentials
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AccountConfig {
    /// Login user, usually the email address
    pub user: Option<String>,

    pub password: Option<PasswordSource>,

    /// Display name for sent emails
    pub display_name: Option<String>,
}

/// Password source - can be raw value or command to execute
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PasswordSource {
    /// Raw password value
    Raw(String),
    /// Command to execute to get password
    Command { command: String },
}

/// IMAP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImapConfig {
    #[serde(default = "default_imap_host")]
    pub host: String,

    #[serde(default = "default_imap_port")]
    pub port: u16,

    #[serde(default = "default_sent_folder")]
    pub sent_folder: String,
}

/// SMTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SmtpConfig {
    #[serde(default = "default_smtp_host")]
    pub host: String,

    /// 465 uses implicit TLS, anything else STARTTLS
    #[serde(default = "default_smtp_port")]
    pub port: u16,
}

/// Chat-completions endpoint used for classification and drafting
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// Base URL of an OpenAI-compatible API (OpenAI, Ollama, ...)
    #[serde(default = "default_llm_url")]
    pub url: String,

    #[serde(default = "default_llm_model")]
    pub model: String,

    #[serde(default)]
    pub api_key: Option<String>,

    #[serde(default = "default_llm_timeout")]
    pub timeout_secs: u64,

    /// Name used to sign drafted replies
    #[serde(default)]
    pub signature: Option<String>,
}

/// Longest accepted inbox lookback, in hours
pub const MAX_INBOX_HOURS: i64 = 24 * 366;
/// Longest accepted sent-mail lookback, in days
pub const MAX_SENT_DAYS: i64 = 3660;

/// Lookback windows and output location
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TriageConfig {
    #[serde(default = "default_inbox_hours")]
    pub inbox_hours: i64,

    #[serde(default = "default_sent_days")]
    pub sent_days: i64,

    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
}

fn default_imap_host() -> String {
    "imap.gmail.com".to_string()
}

fn default_imap_port() -> u16 {
    993
}

fn default_sent_folder() -> String {
    "[Gmail]/Sent Mail".to_string()
}

fn default_smtp_host() -> String {
    "smtp.gmail.com".to_string()
}

fn default_smtp_port() -> u16 {
    465
}

fn default_llm_url() -> String {
    "https://api.openai.com".to_string()
}

fn default_llm_model() -> String {
    "gpt-4.1".to_string()
}

fn default_llm_timeout() -> u64 {
    30
}

fn default_inbox_hours() -> i64 {
    24
}

fn default_sent_days() -> i64 {
    7
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("output")
}

impl Default for ImapConfig {
    fn default() -> Self {
        Self {
            host: default_imap_host(),
            port: default_imap_port(),
            sent_folder: default_sent_folder(),
        }
    }
}

impl Default for SmtpConfig {
    fn default() -> Self {
        Self {
            host: default_smtp_host(),
            port: default_smtp_port(),
        }
    }
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            url: default_llm_url(),
            model: default_llm_model(),
            api_key: None,
            timeout_secs: default_llm_timeout(),
            signature: None,
        }
    }
}

impl Default for TriageConfig {
    fn default() -> Self {
        Self {
            inbox_hours: default_inbox_hours(),
            sent_days: default_sent_days(),
            output_dir: default_output_dir(),
        }
    }
}

/// Resolved login for the mail servers
#[derive(Debug, Clone)]
pub struct Credentials {
    pub user: String,
    pub password: String,
}

impl AppConfig {
    /// Load from `path` (or the default locations), then apply `.env` and
    /// environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self, TriageError> {
        let mut config = match path {
            Some(p) => Self::from_file(p)?,
            None => match default_config_paths().into_iter().find(|p| p.exists()) {
                Some(p) => Self::from_file(&p)?,
                None => {
                    info!("No config file found, using defaults and environment");
                    Self::default()
                }
            },
        };

        if let Ok(dotenv) = dotenvy::dotenv() {
            debug!(path = %dotenv.display(), "Loaded .env");
        }
        config.apply_env(|key| env::var(key).ok())?;
        config.triage.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, TriageError> {
        info!("Loading configuration from: {:?}", path);

        let content = fs::read_to_string(path)
            .map_err(|e| TriageError::Config(format!("Failed to read config: {}", e)))?;

        toml::from_str(&content).map_err(|e| TriageError::Config(format!("Failed to parse config: {}", e)))
    }

    /// Override fields from environment-style lookups.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), TriageError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(v) = get("EMAIL_USER") {
            self.account.user = Some(v);
        }
        if let Some(v) = get("EMAIL_PASSWORD") {
            self.account.password = Some(PasswordSource::Raw(v));
        }
        if let Some(v) = get("IMAP_SERVER") {
            self.imap.host = v;
        }
        if let Some(v) = get("IMAP_PORT") {
            self.imap.port = parse_number("IMAP_PORT", &v)?;
        }
        if let Some(v) = get("IMAP_SENT_FOLDER") {
            self.imap.sent_folder = v;
        }
        if let Some(v) = get("SMTP_SERVER") {
            self.smtp.host = v;
        }
        if let Some(v) = get("SMTP_PORT") {
            self.smtp.port = parse_number("SMTP_PORT", &v)?;
        }
        if let Some(v) = get("LLM_URL") {
            self.llm.url = v;
        }
        if let Some(v) = get("LLM_MODEL") {
            self.llm.model = v;
        }
        if let Some(v) = get("LLM_API_KEY").or_else(|| get("OPENAI_API_KEY")) {
            self.llm.api_key = Some(v);
        }
        if let Some(v) = get("TRIAGE_OUTPUT_DIR") {
            self.triage.output_dir = PathBuf::from(v);
        }
        if let Some(v) = get("INBOX_HOURS") {
            self.triage.inbox_hours = parse_number("INBOX_HOURS", &v)?;
        }
        if let Some(v) = get("SENT_DAYS") {
            self.triage.sent_days = parse_number("SENT_DAYS", &v)?;
        }
        Ok(())
    }

    /// Mailbox login. Missing values are a fatal configuration error.
    pub fn credentials(&self) -> Result<Credentials, TriageError> {
        let user = self
            .account
            .user
            .clone()
            .ok_or_else(|| TriageError::Config("EMAIL_USER and EMAIL_PASSWORD must be set".into()))?;
        let source = self
            .account
            .password
            .as_ref()
            .ok_or_else(|| TriageError::Config("EMAIL_USER and EMAIL_PASSWORD must be set".into()))?;

        Ok(Credentials {
            user,
            password: resolve_password(source)?,
        })
    }

    pub fn output_path(&self, file: &str) -> PathBuf {
        self.triage.output_dir.join(file)
    }
}

impl TriageConfig {
    pub fn validate(&self) -> Result<(), TriageError> {
        inbox_window(self.inbox_hours)?;
        sent_window(self.sent_days)?;
        Ok(())
    }
}

/// Inbox lookback, 1 to [`MAX_INBOX_HOURS`] hours.
pub fn inbox_window(hours: i64) -> Result<Duration, TriageError> {
    check_window("inbox lookback hours", hours, MAX_INBOX_HOURS)?;
    Duration::try_hours(hours)
        .ok_or_else(|| TriageError::Config(format!("inbox lookback of {} hours is out of range", hours)))
}

/// Sent-mail lookback, 1 to [`MAX_SENT_DAYS`] days.
pub fn sent_window(days: i64) -> Result<Duration, TriageError> {
    check_window("sent-mail lookback days", days, MAX_SENT_DAYS)?;
    Duration::try_days(days)
        .ok_or_else(|| TriageError::Config(format!("sent-mail lookback of {} days is out of range", days)))
}

fn check_window(what: &str, value: i64, max: i64) -> Result<(), TriageError> {
    if !(1..=max).contains(&value) {
        return Err(TriageError::Config(format!("{} must be between 1 and {}, got {}", what, max, value)));
    }
    Ok(())
}

fn parse_number<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, TriageError> {
    value
        .trim()
        .parse()
        .map_err(|_| TriageError::Config(format!("{} is not a valid number: {}", key, value)))
}

/// Get or resolve password from PasswordSource
fn resolve_password(source: &PasswordSource) -> Result<String, TriageError> {
    match source {
        PasswordSource::Raw(password) => Ok(password.clone()),
        PasswordSource::Command { command } => {
            info!("Executing password command");
            let output = Command::new("sh")
                .arg("-c")
                .arg(command)
                .output()
                .map_err(|e| TriageError::Config(format!("Failed to run password command: {}", e)))?;

            if !output.status.success() {
                return Err(TriageError::Config(format!(
                    "Password command exited with {}",
                    output.status
                )));
            }

            let password = String::from_utf8_lossy(&output.stdout).trim_end().to_string();
            if password.is_empty() {
                return Err(TriageError::Config("Password command printed nothing".into()));
            }
            Ok(password)
        }
    }
}

/// Get default config paths
pub fn default_config_paths() -> Vec<PathBuf> {
    let mut paths = Vec::new();

    // XDG config path
    if let Some(config_dir) = dirs::config_dir() {
        paths.push(config_dir.join("email-triage").join("config.toml"));
    }

    // Home directory fallback
    if let Some(home_dir) = dirs::home_dir() {
        paths.push(home_dir.join(".config").join("email-triage").join("config.toml"));
        paths.push(home_dir.join(".email-triage.toml"));
    }

    paths
}
