use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{SecondsFormat, Utc};
use tracing::{info, warn};

/// Human-readable log of one enrich run, `[<timestamp>] <message>` per line.
/// Recreated on every run; each line is mirrored to tracing.
pub struct RunLog {
    path: PathBuf,
    file: File,
}

impl RunLog {
    pub fn create(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create log directory {:?}", parent))?;
        }
        let file =
            File::create(path).with_context(|| format!("Failed to create run log {:?}", path))?;
        Ok(Self {
            path: path.to_path_buf(),
            file,
        })
    }

    pub fn info(&mut self, msg: impl AsRef<str>) {
        info!("{}", msg.as_ref());
        self.append(msg.as_ref());
    }

    pub fn warn(&mut self, msg: impl AsRef<str>) {
        warn!("{}", msg.as_ref());
        self.append(msg.as_ref());
    }

    /// A lost log line never stops a run.
    fn append(&mut self, msg: &str) {
        let ts = Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true);
        let line = format!("[{}] {}\n", ts, msg);
        if let Err(e) = self
            .file
            .write_all(line.as_bytes())
            .and_then(|_| self.file.flush())
        {
            warn!("Failed to write run log {:?}: {}", self.path, e);
        }
    }
}
