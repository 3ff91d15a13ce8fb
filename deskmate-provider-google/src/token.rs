//! Access token for the Calendar API.
//!
//! The provider does not run an OAuth flow itself. It reads a token that
//! something else keeps fresh, from either:
//!   $DESKMATE_GOOGLE_ACCESS_TOKEN
//!   ~/.config/deskmate/providers/google/token.json

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::Deserialize;

pub const TOKEN_ENV: &str = "DESKMATE_GOOGLE_ACCESS_TOKEN";

#[derive(Debug, Clone, Deserialize)]
pub struct Token {
    pub access_token: String,
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
}

impl Token {
    pub fn is_expired(&self) -> bool {
        self.expires_at.is_some_and(|at| at <= Utc::now())
    }
}

pub fn base_dir() -> Result<PathBuf> {
    Ok(dirs::config_dir()
        .context("Could not determine config directory")?
        .join("deskmate")
        .join("providers")
        .join("google"))
}

/// The environment variable wins over the token file.
pub fn load() -> Result<Token> {
    if let Ok(access_token) = std::env::var(TOKEN_ENV)
        && !access_token.trim().is_empty()
    {
        return Ok(Token {
            access_token: access_token.trim().to_string(),
            expires_at: None,
        });
    }

    load_from(&base_dir()?.join("token.json"))
}

pub fn load_from(path: &Path) -> Result<Token> {
    if !path.exists() {
        anyhow::bail!(
            "Google access token not found.\n\n\
            Set {} or create {} with:\n\n\
            {{\"access_token\": \"ya29...\"}}",
            TOKEN_ENV,
            path.display()
        );
    }

    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read token from {}", path.display()))?;

    let token: Token = serde_json::from_str(&contents)
        .with_context(|| format!("Failed to parse token from {}", path.display()))?;

    if token.is_expired() {
        anyhow::bail!("Google access token in {} has expired", path.display());
    }

    Ok(token)
}
