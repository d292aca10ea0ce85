//! Credential pool for the charging model API.
//!
//! The API allows roughly 1 call per second and 1,000 calls per hour per key. Spreading
//! tasks round-robin over several keys multiplies the usable throughput; the pool itself
//! does not pace calls, so concurrency × keys must stay within those limits in aggregate.

use crate::error::CredentialError;
use crate::models::credential::mask;
use crate::models::{Credential, CREDENTIAL_LEN};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Ordered, non-empty set of valid credentials. Read-only after construction.
#[derive(Clone, Debug)]
pub struct CredentialPool {
    keys: Vec<Credential>,
}

impl CredentialPool {
    /// Keeps candidates of the expected length; blank lines are skipped, anything else is
    /// rejected with a warning. Returns the pool (possibly empty) and the rejection count.
    fn filter<I, S>(candidates: I) -> (Vec<Credential>, usize)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut keys = Vec::new();
        let mut rejected = 0usize;
        for raw in candidates {
            let raw = raw.as_ref().trim();
            if raw.is_empty() {
                continue;
            }
            match Credential::parse(raw) {
                Some(key) => keys.push(key),
                None => {
                    rejected += 1;
                    warn!(
                        key = %mask(raw),
                        len = raw.chars().count(),
                        expected = CREDENTIAL_LEN,
                        "invalid API key rejected"
                    );
                }
            }
        }
        (keys, rejected)
    }

    pub fn from_candidates<I, S>(candidates: I) -> Option<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let (keys, _) = Self::filter(candidates);
        if keys.is_empty() {
            None
        } else {
            Some(Self { keys })
        }
    }

    /// Reads one key per line. A file with no valid key is an error.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, CredentialError> {
        let path = path.as_ref();
        if !path.is_file() {
            return Err(CredentialError::MissingFile(path.to_path_buf()));
        }
        let content = fs::read_to_string(path)?;
        let (keys, rejected) = Self::filter(content.lines());
        if keys.is_empty() {
            return Err(CredentialError::NoValidCredentials {
                path: path.to_path_buf(),
                rejected,
            });
        }
        info!(count = keys.len(), path = %path.display(), "API keys loaded");
        Ok(Self { keys })
    }

    pub fn single(candidate: &str) -> Result<Self, CredentialError> {
        let trimmed = candidate.trim();
        Credential::parse(trimmed)
            .map(|key| Self { keys: vec![key] })
            .ok_or(CredentialError::InvalidEntry {
                len: trimmed.chars().count(),
                expected: CREDENTIAL_LEN,
            })
    }

    pub fn demo() -> Self {
        Self {
            keys: vec![Credential::demo()],
        }
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// `pool[task_index mod len]`.
    pub fn assign(&self, task_index: usize) -> &Credential {
        &self.keys[task_index % self.keys.len()]
    }
}

/// Where a run may obtain its credentials from, in order of preference.
#[derive(Clone, Debug)]
pub struct CredentialSource {
    pub file: PathBuf,
    /// Ask on stdin when the file yields nothing.
    pub prompt: bool,
    /// Fall back to the demo key instead of aborting.
    pub allow_demo: bool,
}

/// Resolves the pool: file first, then the prompt, then the demo key if opted in.
/// Any other path to zero valid keys is an error.
pub fn resolve<F>(source: &CredentialSource, prompt: F) -> Result<CredentialPool, CredentialError>
where
    F: FnOnce() -> std::io::Result<String>,
{
    let file_err = match CredentialPool::from_file(&source.file) {
        Ok(pool) => return Ok(pool),
        Err(e) => e,
    };
    warn!(error = %file_err, "no usable API key file");

    let last_err = if source.prompt {
        match CredentialPool::single(&prompt()?) {
            Ok(pool) => return Ok(pool),
            Err(e) => e,
        }
    } else {
        file_err
    };

    if source.allow_demo {
        warn!(error = %last_err, "falling back to the demo API key");
        return Ok(CredentialPool::demo());
    }
    Err(last_err)
}
