//! Secret references in configuration values.
//!
//! `client_id`, `client_secret` and `api_key` in `config.toml` may point at a
//! secret kept elsewhere:
//!
//! - `pass::path/in/store` runs `pass show path/in/store` and takes the first line
//! - `env::VAR_NAME` reads `$VAR_NAME`
//! - anything else is the value itself

use std::process::Command;

/// A configuration value, parsed for a reference prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SecretRef<'a> {
    /// An entry in the `pass` password store.
    Pass(&'a str),
    /// An environment variable.
    Env(&'a str),
    /// A literal value.
    Plain(&'a str),
}

impl<'a> SecretRef<'a> {
    pub fn parse(value: &'a str) -> Self {
        if let Some(path) = value.strip_prefix("pass::") {
            Self::Pass(path)
        } else if let Some(var) = value.strip_prefix("env::") {
            Self::Env(var)
        } else {
            Self::Plain(value)
        }
    }

    /// Returns true unless the value is a literal.
    pub fn is_reference(&self) -> bool {
        !matches!(self, Self::Plain(_))
    }

    /// Looks the secret up.
    pub fn resolve(&self) -> Result<String, String> {
        match *self {
            Self::Pass(path) => resolve_pass(path),
            Self::Env(var) => {
                std::env::var(var).map_err(|_| format!("environment variable `{}` is not set", var))
            }
            Self::Plain(value) => Ok(value.to_string()),
        }
    }
}

/// Resolves a value that may be a secret reference.
pub fn resolve(value: &str) -> Result<String, String> {
    SecretRef::parse(value).resolve()
}

fn resolve_pass(path: &str) -> Result<String, String> {
    let output = Command::new("pass")
        .arg("show")
        .arg(path)
        .output()
        .map_err(|e| format!("failed to run `pass show {}`: {}", path, e))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(format!(
            "`pass show {}` failed ({}): {}",
            path,
            output.status,
            stderr.trim()
        ));
    }

    String::from_utf8_lossy(&output.stdout)
        .lines()
        .next()
        .map(str::to_string)
        .ok_or_else(|| format!("`pass show {}` produced no output", path))
}
