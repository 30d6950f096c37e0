use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tracing::debug;

use super::{CredentialError, CredentialSource, SecretBackend};

#[cfg(unix)]
const DIR_MODE: u32 = 0o700;
#[cfg(unix)]
const FILE_MODE: u32 = 0o600;

/// `key=value` credentials file, owner read/write only.
#[derive(Debug, Clone)]
pub struct FileBackend {
    path: PathBuf,
}

impl FileBackend {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    #[cfg(test)]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_lines(&self) -> io::Result<Option<Vec<String>>> {
        match fs::read_to_string(&self.path) {
            Ok(content) => Ok(Some(
                content
                    .lines()
                    .filter(|line| !line.trim().is_empty())
                    .map(ToOwned::to_owned)
                    .collect(),
            )),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err),
        }
    }

    fn write_lines(&self, lines: &[String]) -> io::Result<()> {
        if let Some(parent) = self.path.parent() {
            create_private_dir(parent)?;
        }

        let mut content = lines.join("\n");
        content.push('\n');

        let tmp_path = self.path.with_extension("tmp");
        // A leftover temp file keeps its old mode; only a fresh create applies ours.
        match fs::remove_file(&tmp_path) {
            Ok(()) => debug!("removed stale {}", tmp_path.display()),
            Err(err) if err.kind() == io::ErrorKind::NotFound => {}
            Err(err) => return Err(err),
        }
        {
            let mut file = private_file_options().open(&tmp_path)?;
            file.write_all(content.as_bytes())?;
            file.sync_all()?;
        }
        fs::rename(&tmp_path, &self.path)?;
        debug!("rewrote credentials file {}", self.path.display());
        Ok(())
    }
}

fn line_key(line: &str) -> Option<&str> {
    line.split_once('=').map(|(key, _)| key)
}

impl SecretBackend for FileBackend {
    fn source(&self) -> CredentialSource {
        CredentialSource::ConfigFile
    }

    fn location(&self) -> String {
        self.path.display().to_string()
    }

    fn read(&self, account: &str) -> Result<Option<String>, CredentialError> {
        let Some(lines) = self.read_lines()? else {
            return Ok(None);
        };
        Ok(lines.iter().find_map(|line| {
            line.split_once('=')
                .filter(|(key, _)| *key == account)
                .map(|(_, value)| value.to_string())
        }))
    }

    fn write(&self, account: &str, value: &str) -> Result<(), CredentialError> {
        let mut lines = self.read_lines()?.unwrap_or_default();
        let entry = format!("{account}={value}");

        match lines.iter_mut().find(|line| line_key(line) == Some(account)) {
            Some(line) => *line = entry,
            None => lines.push(entry),
        }

        self.write_lines(&lines)?;
        Ok(())
    }

    fn remove(&self, account: &str) -> Result<bool, CredentialError> {
        let Some(lines) = self.read_lines()? else {
            return Ok(false);
        };

        let before = lines.len();
        let remaining: Vec<String> = lines
            .into_iter()
            .filter(|line| line_key(line) != Some(account))
            .collect();
        if remaining.len() == before {
            return Ok(false);
        }

        if remaining.iter().any(|line| line_key(line).is_some()) {
            self.write_lines(&remaining)?;
        } else {
            fs::remove_file(&self.path)?;
            debug!("removed empty credentials file {}", self.path.display());
        }
        Ok(true)
    }
}

#[cfg(unix)]
fn create_private_dir(dir: &Path) -> io::Result<()> {
    use std::os::unix::fs::DirBuilderExt;

    if dir.exists() {
        return Ok(());
    }
    fs::DirBuilder::new()
        .recursive(true)
        .mode(DIR_MODE)
        .create(dir)
}

#[cfg(not(unix))]
fn create_private_dir(dir: &Path) -> io::Result<()> {
    fs::create_dir_all(dir)
}

#[cfg(unix)]
fn private_file_options() -> OpenOptions {
    use std::os::unix::fs::OpenOptionsExt;

    let mut options = OpenOptions::new();
    options.write(true).create_new(true).mode(FILE_MODE);
    options
}

#[cfg(not(unix))]
fn private_file_options() -> OpenOptions {
    let mut options = OpenOptions::new();
    options.write(true).create_new(true);
    options
}
