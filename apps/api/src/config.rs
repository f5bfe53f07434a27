use std::path::Path;

use anyhow::{bail, Context, Result};

const SUPABASE_URL_KEYS: &[&str] = &["VITE_SUPABASE_URL", "SUPABASE_URL"];
const SUPABASE_KEY_KEYS: &[&str] = &["VITE_SUPABASE_ANON_KEY", "SUPABASE_KEY"];
const DEFAULT_DATABASE_URL: &str = "sqlite://data/jobs.db";
const DEFAULT_SUPABASE_TIMEOUT_SECS: u64 = 30;

/// Loads `.env` variables. An explicit path must exist; without one, a
/// missing `.env` is ignored.
pub fn load_dotenv(path: Option<&Path>) -> Result<()> {
    match path {
        Some(path) => {
            dotenvy::from_path(path)
                .with_context(|| format!("Failed to load env file '{}'", path.display()))?;
        }
        None => {
            dotenvy::dotenv().ok();
        }
    }
    Ok(())
}

/// Supabase project credentials. Blank values count as missing.
#[derive(Debug, Clone)]
pub struct SupabaseConfig {
    pub url: String,
    pub api_key: String,
    pub timeout_secs: u64,
}

impl SupabaseConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let first_non_blank = |keys: &[&str]| {
            keys.iter()
                .filter_map(|k| lookup(*k))
                .map(|v| v.trim().to_string())
                .find(|v| !v.is_empty())
        };

        let (Some(url), Some(api_key)) = (
            first_non_blank(SUPABASE_URL_KEYS),
            first_non_blank(SUPABASE_KEY_KEYS),
        ) else {
            bail!(
                "Missing Supabase URL or Anon Key in environment variables (set {} and {})",
                SUPABASE_URL_KEYS.join("/"),
                SUPABASE_KEY_KEYS.join("/")
            );
        };

        let timeout_secs = match lookup("SUPABASE_TIMEOUT_SECS") {
            Some(raw) => raw
                .trim()
                .parse::<u64>()
                .context("SUPABASE_TIMEOUT_SECS must be a whole number of seconds")?,
            None => DEFAULT_SUPABASE_TIMEOUT_SECS,
        };

        Ok(Self {
            url,
            api_key,
            timeout_secs,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    Sqlite,
    Supabase,
}

/// Service configuration loaded from environment variables.
/// Fails at startup if the selected backend is missing its settings.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub backend: StoreBackend,
    pub supabase: Option<SupabaseConfig>,
    pub port: u16,
    pub rust_log: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        load_dotenv(None)?;
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let backend = match lookup("STORE_BACKEND")
            .map(|v| v.trim().to_lowercase())
            .as_deref()
        {
            None | Some("") | Some("sqlite") => StoreBackend::Sqlite,
            Some("supabase") => StoreBackend::Supabase,
            Some(other) => bail!("STORE_BACKEND must be 'sqlite' or 'supabase', got '{other}'"),
        };

        let supabase = match backend {
            StoreBackend::Supabase => Some(SupabaseConfig::from_lookup(&lookup)?),
            StoreBackend::Sqlite => None,
        };

        Ok(Config {
            database_url: lookup("DATABASE_URL")
                .unwrap_or_else(|| DEFAULT_DATABASE_URL.to_string()),
            backend,
            supabase,
            port: lookup("PORT")
                .unwrap_or_else(|| "8080".to_string())
                .parse::<u16>()
                .context("PORT must be a valid port number")?,
            rust_log: lookup("RUST_LOG").unwrap_or_else(|| "info".to_string()),
        })
    }
}
