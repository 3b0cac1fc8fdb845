//! The on-disk proxy list: the only state carried between runs.

use std::collections::HashSet;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use thiserror::Error;

use crate::ingest::clean_link;
use crate::ingest::types::ProxyLink;

pub use crate::ingest::canonical_scheme;

/// Reply cap used by the command bot (Telegram allows 4096 chars per message).
pub const REPLY_MAX_CHARS: usize = 4000;
pub const REPLY_MISSING: &str = "No proxies found. Run the collection script first.";

#[derive(Debug, Error)]
pub enum PersistError {
    #[error("output path has no parent directory: {0}")]
    NoParent(String),
    #[error("io error: {0}")]
    Io(#[from] io::Error),
}

/// One canonical link per line, trailing newline, no header.
/// Links that become identical once cleaned are written once.
pub fn render_proxy_file<'a, I>(links: I) -> String
where
    I: IntoIterator<Item = &'a ProxyLink>,
{
    let mut seen = HashSet::new();
    let mut out = String::new();
    for link in links {
        let line = canonical_scheme(&clean_link(link.as_str()));
        if seen.insert(line.clone()) {
            out.push_str(&line);
            out.push('\n');
        }
    }
    out
}

/// Write `content` to `path` by writing a sibling temp file and renaming it over the target.
pub fn write_atomic(path: &Path, content: &str) -> Result<(), PersistError> {
    let dir = match path.parent() {
        Some(p) if p.as_os_str().is_empty() => Path::new("."),
        Some(p) => p,
        None => return Err(PersistError::NoParent(path.display().to_string())),
    };
    if !dir.exists() {
        fs::create_dir_all(dir)?;
    }

    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(content.as_bytes())?;
    tmp.flush()?;
    tmp.as_file_mut().sync_all()?;
    tmp.persist(path).map_err(|e| PersistError::Io(e.error))?;
    Ok(())
}

pub struct ProxyFileWriter {
    path: PathBuf,
}

impl ProxyFileWriter {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Replace the proxy file with `links`. Returns the number of lines written.
    pub fn write<'a, I>(&self, links: I) -> Result<usize, PersistError>
    where
        I: IntoIterator<Item = &'a ProxyLink>,
    {
        let content = render_proxy_file(links);
        let lines = content.lines().count();
        write_atomic(&self.path, &content)?;
        tracing::info!(path = %self.path.display(), count = lines, "saved proxies");
        Ok(lines)
    }

    /// Lines of the previous run's file; empty when it does not exist.
    pub fn read_previous(&self) -> io::Result<Vec<String>> {
        match fs::read_to_string(&self.path) {
            Ok(s) => Ok(s
                .lines()
                .map(str::trim)
                .filter(|l| !l.is_empty())
                .map(str::to_string)
                .collect()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(Vec::new()),
            Err(e) => Err(e),
        }
    }
}

/// Text the command bot sends for `/proxies`: the file verbatim, capped at `max_chars`.
pub fn reply_text(path: &Path, max_chars: usize) -> io::Result<String> {
    let content = match fs::read_to_string(path) {
        Ok(s) => s,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(REPLY_MISSING.to_string()),
        Err(e) => return Err(e),
    };
    let body = if content.chars().count() > max_chars {
        let head: String = content.chars().take(max_chars).collect();
        format!("{head}... (truncated)")
    } else {
        content
    };
    Ok(format!("Latest Proxies:\n```\n{body}\n```"))
}
