//! XDG-compliant path resolution for mpx-chunky.
//!
//! Config lives under `$XDG_CONFIG_HOME/mpx-chunky/`, chunk files under
//! `$XDG_DATA_HOME/mpx-chunky/chunks/`.

use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;

/// Errors from path resolution.
#[derive(Debug, Error, Diagnostic)]
pub enum PathError {
    #[error("cannot determine home directory")]
    #[diagnostic(
        code(chunky::paths::no_home),
        help("Set the HOME environment variable or pass explicit paths (`--config`, `--out`).")
    )]
    NoHome,

    #[error("failed to create directory: {path}")]
    #[diagnostic(
        code(chunky::paths::create_dir),
        help("Check that the parent directory exists and you have write permissions.")
    )]
    CreateDir {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

pub type PathResult<T> = std::result::Result<T, PathError>;

const APP_DIR: &str = "mpx-chunky";

/// Global directories for mpx-chunky.
#[derive(Debug, Clone)]
pub struct ChunkyPaths {
    /// `$XDG_CONFIG_HOME/mpx-chunky/`
    pub config_dir: PathBuf,
    /// `$XDG_DATA_HOME/mpx-chunky/`
    pub data_dir: PathBuf,
    /// `$XDG_CACHE_HOME/mpx-chunky/`
    pub cache_dir: PathBuf,
}

impl ChunkyPaths {
    /// Resolve XDG directories from environment variables with standard fallbacks.
    pub fn resolve() -> PathResult<Self> {
        let home = std::env::var("HOME")
            .map(PathBuf::from)
            .map_err(|_| PathError::NoHome)?;

        let xdg = |var: &str, fallback: &str| {
            std::env::var(var)
                .map(PathBuf::from)
                .unwrap_or_else(|_| home.join(fallback))
                .join(APP_DIR)
        };

        Ok(Self {
            config_dir: xdg("XDG_CONFIG_HOME", ".config"),
            data_dir: xdg("XDG_DATA_HOME", ".local/share"),
            cache_dir: xdg("XDG_CACHE_HOME", ".cache"),
        })
    }

    /// Default chunk directory.
    pub fn chunks_dir(&self) -> PathBuf {
        self.data_dir.join("chunks")
    }

    /// Path to the config file.
    pub fn config_file(&self) -> PathBuf {
        self.config_dir.join("chunky.toml")
    }

    /// Create all base directories. Idempotent.
    pub fn ensure_dirs(&self) -> PathResult<()> {
        for dir in [
            &self.config_dir,
            &self.data_dir,
            &self.cache_dir,
            &self.chunks_dir(),
        ] {
            std::fs::create_dir_all(dir).map_err(|e| PathError::CreateDir {
                path: dir.display().to_string(),
                source: e,
            })?;
        }
        Ok(())
    }
}
