// src/config.rs
use anyhow::{Context, Result};
use std::env;
use std::path::{Path, PathBuf};

use crate::forecast::Signal;

/// Runtime settings, read once from the environment (and `.env`) at startup.
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    pub db_max_connections: u32,
    pub run_migrations: bool,
    pub pemasukan: ArtifactPaths,
    pub pengeluaran: ArtifactPaths,
}

/// Files that make up one forecast capability: the exported model and its two scalers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactPaths {
    pub model: PathBuf,
    pub scaler_x: PathBuf,
    pub scaler_y: PathBuf,
}

impl Config {
    /// Call after `.env` has been loaded.
    pub fn from_env() -> Result<Self> {
        let database_url = env::var("DATABASE_URL").context("DATABASE_URL must be set")?;
        let artifact_dir = PathBuf::from(var_or("ARTIFACT_DIR", "artifacts"));

        Ok(Self {
            host: var_or("HOST", "0.0.0.0"),
            port: parse_var("PORT", 5000)?,
            database_url,
            db_max_connections: parse_var("DB_MAX_CONNECTIONS", 5)?,
            run_migrations: parse_var("DB_RUN_MIGRATIONS", false)?,
            pemasukan: ArtifactPaths::from_env(&artifact_dir, Signal::Pemasukan),
            pengeluaran: ArtifactPaths::from_env(&artifact_dir, Signal::Pengeluaran),
        })
    }

    pub fn artifacts(&self, signal: Signal) -> &ArtifactPaths {
        match signal {
            Signal::Pemasukan => &self.pemasukan,
            Signal::Pengeluaran => &self.pengeluaran,
        }
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl ArtifactPaths {
    /// Default file names follow the exported training artifacts; each can be overridden.
    pub fn defaults(dir: &Path, signal: Signal) -> Self {
        let (model, scaler_x, scaler_y) = match signal {
            Signal::Pemasukan => ("model.json", "scaler_x.json", "scaler_y.json"),
            Signal::Pengeluaran => (
                "model2.json",
                "scaler_x_pengeluaran.json",
                "scaler_y_pengeluaran.json",
            ),
        };
        Self {
            model: dir.join(model),
            scaler_x: dir.join(scaler_x),
            scaler_y: dir.join(scaler_y),
        }
    }

    fn from_env(dir: &Path, signal: Signal) -> Self {
        let defaults = Self::defaults(dir, signal);
        let suffix = signal.as_str().to_uppercase();
        let path = |prefix: &str, fallback: PathBuf| {
            env::var(format!("{}_{}", prefix, suffix))
                .map(PathBuf::from)
                .unwrap_or(fallback)
        };

        Self {
            model: path("MODEL", defaults.model),
            scaler_x: path("SCALER_X", defaults.scaler_x),
            scaler_y: path("SCALER_Y", defaults.scaler_y),
        }
    }
}

fn var_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn parse_var<T>(key: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("{} has an invalid value: {:?}", key, raw)),
        Err(_) => Ok(default),
    }
}
