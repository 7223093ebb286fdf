//! Log file setup.

use std::{
    fs::{self, OpenOptions},
    io::Write,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};

/// The process-wide log destination, created once in `main`.
pub struct LogContext {
    path: PathBuf,
}

impl LogContext {
    /// `~/.aws/mfa-token.log`
    pub fn default_path() -> Option<PathBuf> {
        dirs::home_dir().map(|d| d.join(".aws").join("mfa-token.log"))
    }

    /// Routes the `log` macros to `path` (or the default log file), appending
    /// `<timestamp> <LEVEL> <message>` lines. The level defaults to INFO and
    /// can be overridden with `RUST_LOG`.
    pub fn init(path: Option<PathBuf>) -> Result<Self> {
        let path = path
            .or_else(Self::default_path)
            .context("Could not determine home directory")?;
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
        }
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .with_context(|| format!("Failed to open log file {}", path.display()))?;

        env_logger::Builder::new()
            .filter_level(log::LevelFilter::Info)
            .parse_default_env()
            .target(env_logger::Target::Pipe(Box::new(file)))
            .format(|buf, record| {
                writeln!(buf, "{} {} {}", buf.timestamp(), record.level(), record.args())
            })
            .try_init()
            .context("Failed to initialize logging")?;

        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_path() {
        if let Some(path) = LogContext::default_path() {
            assert!(path.ends_with(".aws/mfa-token.log"));
        }
    }
}
