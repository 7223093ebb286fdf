//! Reader and writer for the AWS shared config and credentials files.
//!
//! Both files use the same flat dialect:
//!
//! ```ini
//! [default]
//! region = us-east-1
//!
//! [profile work]
//! region = eu-west-1
//! ```
//!
//! The config file prefixes every non-default section with `profile `, the
//! credentials file never does. In memory both are keyed by the bare profile
//! name and the prefix is only applied again when the file is written.
//!
//! Parsing is lenient on purpose: text before the first section header, lines
//! that do not start with a word character (comments, indented text) and
//! `key` lines without an `=` are skipped rather than reported.

use std::{
    collections::BTreeMap,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use log::{debug, warn};
use tokio::fs;

/// Key/value pairs of a single profile, kept sorted by key.
pub type ProfileRecord = BTreeMap<String, String>;

const CONFIG_SECTION_PREFIX: &str = "profile ";
const DEFAULT_PROFILE: &str = "default";

/// Which of the two AWS files a [`ProfileFile`] was read from.
///
/// The flavor only changes how section headers are spelled.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FileFlavor {
    /// `~/.aws/config`: `[default]` and `[profile <name>]`.
    Config,
    /// `~/.aws/credentials`: `[<name>]` for every profile.
    Credentials,
}

impl FileFlavor {
    fn header(self, profile: &str) -> String {
        match self {
            FileFlavor::Config if profile != DEFAULT_PROFILE => {
                format!("[{CONFIG_SECTION_PREFIX}{profile}]")
            }
            _ => format!("[{profile}]"),
        }
    }

    fn section_name(self, raw: &str) -> String {
        let raw = raw.trim();
        match self {
            FileFlavor::Config => raw
                .strip_prefix(CONFIG_SECTION_PREFIX)
                .map(str::trim)
                .unwrap_or(raw)
                .to_string(),
            FileFlavor::Credentials => raw.to_string(),
        }
    }
}

/// Locations of the shared config and credentials files used for a run.
///
/// The same pair is read and written by the updater and handed to the AWS
/// SDK, so profiles are always authenticated from the files they were
/// listed from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SharedFiles {
    pub config: PathBuf,
    pub credentials: PathBuf,
}

impl SharedFiles {
    /// Resolves the file locations, falling back to the AWS CLI defaults.
    ///
    /// # Arguments
    ///
    /// * `config` - Explicit config file, or `None` for `~/.aws/config`
    /// * `credentials` - Explicit credentials file, or `None` for
    ///   `~/.aws/credentials`
    ///
    /// # Errors
    ///
    /// Fails when a default is needed and the home directory is unknown.
    pub fn resolve(config: Option<PathBuf>, credentials: Option<PathBuf>) -> Result<Self> {
        let aws_dir = || dirs::home_dir().map(|d| d.join(".aws"));
        let config = config
            .or_else(|| aws_dir().map(|d| d.join("config")))
            .context("Could not determine home directory")?;
        let credentials = credentials
            .or_else(|| aws_dir().map(|d| d.join("credentials")))
            .context("Could not determine home directory")?;
        Ok(Self {
            config,
            credentials,
        })
    }
}

/// In-memory model of one AWS profile file.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProfileFile {
    flavor: FileFlavor,
    profiles: BTreeMap<String, ProfileRecord>,
}

impl ProfileFile {
    pub fn new(flavor: FileFlavor) -> Self {
        Self {
            flavor,
            profiles: BTreeMap::new(),
        }
    }

    /// Parses the text of a config or credentials file.
    ///
    /// A line starting with `[` opens a section; anything up to the closing
    /// `]` is the section name. Inside a section, every line starting with a
    /// word character and containing `=` is split on the first `=` into a
    /// trimmed key and a trimmed value.
    ///
    /// Repeating a header verbatim starts that section over, so the last
    /// occurrence wins. Two different headers naming the same profile, such
    /// as `[work]` and `[profile work]` in a config file, are merged into one
    /// record instead, later keys overriding earlier ones.
    pub fn parse(text: &str, flavor: FileFlavor) -> Self {
        let mut file = Self::new(flavor);
        let mut current: Option<String> = None;
        // profile name -> header spelling it was last opened with
        let mut headers: BTreeMap<String, String> = BTreeMap::new();

        for line in text.lines() {
            if let Some(rest) = line.strip_prefix('[') {
                let raw = rest.split(']').next().unwrap_or(rest).trim();
                let name = flavor.section_name(raw);
                match headers.insert(name.clone(), raw.to_string()) {
                    Some(previous) if previous != raw => {
                        warn!(
                            "Sections [{previous}] and [{raw}] both name profile {name}, merging their keys"
                        );
                    }
                    _ => {
                        file.profiles.insert(name.clone(), ProfileRecord::new());
                    }
                }
                current = Some(name);
                continue;
            }

            let starts_with_word = line
                .chars()
                .next()
                .is_some_and(|c| c.is_alphanumeric() || c == '_');
            if !starts_with_word {
                continue;
            }

            let (Some(section), Some((key, value))) = (&current, line.split_once('=')) else {
                debug!("Skipping line outside of a key/value context: {line:?}");
                continue;
            };
            if let Some(record) = file.profiles.get_mut(section) {
                record.insert(key.trim().to_string(), value.trim().to_string());
            }
        }

        file
    }

    /// Renders the file with profiles and keys in lexicographic order, one
    /// blank line after every section.
    pub fn serialize(&self) -> String {
        let mut out = String::new();
        for (profile, record) in &self.profiles {
            out.push_str(&self.flavor.header(profile));
            out.push('\n');
            for (key, value) in record {
                out.push_str(&format!("{key} = {value}\n"));
            }
            out.push('\n');
        }
        out
    }

    /// Reads and parses the file at `path`.
    pub async fn load(path: &Path, flavor: FileFlavor) -> Result<Self> {
        let text = fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let file = Self::parse(&text, flavor);
        debug!("Loaded {} profiles from {}", file.len(), path.display());
        Ok(file)
    }

    /// Writes the serialized file to `path`.
    ///
    /// The text goes to a sibling temporary file first which is then renamed
    /// over the target, so a failed write never leaves a truncated file
    /// behind. Credentials files are restricted to the owner on Unix.
    pub async fn save(&self, path: &Path) -> Result<()> {
        let tmp = sibling(path, ".tmp");
        fs::write(&tmp, self.serialize())
            .await
            .with_context(|| format!("Failed to write {}", tmp.display()))?;

        // Restrict before the rename so the secrets are never world-readable
        #[cfg(unix)]
        if self.flavor == FileFlavor::Credentials {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&tmp, std::fs::Permissions::from_mode(0o600))
                .await
                .with_context(|| format!("Failed to set permissions on {}", tmp.display()))?;
        }

        fs::rename(&tmp, path)
            .await
            .with_context(|| format!("Failed to replace {}", path.display()))?;
        debug!("Wrote {} profiles to {}", self.len(), path.display());
        Ok(())
    }

    pub fn get(&self, profile: &str) -> Option<&ProfileRecord> {
        self.profiles.get(profile)
    }

    /// Adds `profile`, replacing any record already stored under that name.
    pub fn insert(&mut self, profile: impl Into<String>, record: ProfileRecord) {
        self.profiles.insert(profile.into(), record);
    }

    /// Profile names in sorted order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.profiles.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }
}

/// Copies `path` to `<path>.bkp`, overwriting an older backup.
pub async fn backup(path: &Path) -> Result<PathBuf> {
    let target = sibling(path, ".bkp");
    fs::copy(path, &target).await.with_context(|| {
        format!("Failed to back up {} to {}", path.display(), target.display())
    })?;
    Ok(target)
}

fn sibling(path: &Path, suffix: &str) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(suffix);
    PathBuf::from(name)
}
