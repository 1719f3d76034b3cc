//! Version reference resolution

use crate::error::{LineageError, Result};
use crate::hash::is_version_id;
use crate::repo::RepoStore;

/// Shortest id prefix accepted as a reference
pub const MIN_PREFIX_LEN: usize = 4;

/// Reference to a version as typed by a user
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VersionRef {
    /// `HEAD`, or `HEAD~n` for the n-th ancestor of HEAD
    Head { ancestor: usize },
    /// Full 64-character id
    Id(String),
    /// Unique id prefix
    Prefix(String),
}

impl VersionRef {
    pub fn parse(s: &str) -> Result<Self> {
        let s = s.trim();

        if s.eq_ignore_ascii_case("head") {
            return Ok(Self::Head { ancestor: 0 });
        }
        if let Some(rest) = s.strip_prefix("HEAD~").or_else(|| s.strip_prefix("head~")) {
            let ancestor = rest.parse::<usize>().map_err(|_| {
                LineageError::validation(format!("Invalid ancestor reference: '{}'", s))
            })?;
            return Ok(Self::Head { ancestor });
        }

        let lowered = s.to_lowercase();
        if is_version_id(&lowered) {
            return Ok(Self::Id(lowered));
        }
        if lowered.len() >= MIN_PREFIX_LEN && lowered.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Ok(Self::Prefix(lowered));
        }

        Err(LineageError::validation(format!(
            "Invalid version reference: '{}'. Use HEAD, HEAD~N, a full id or an id prefix of at least {} hex characters",
            s, MIN_PREFIX_LEN
        )))
    }
}

/// Resolves version references to full version ids
#[derive(Debug)]
pub struct VersionResolver<'a> {
    store: &'a RepoStore,
}

impl<'a> VersionResolver<'a> {
    pub fn new(store: &'a RepoStore) -> Self {
        Self { store }
    }

    /// Parse and resolve in one step
    pub fn resolve_str(&self, reference: &str) -> Result<String> {
        self.resolve(&VersionRef::parse(reference)?)
    }

    /// Resolve a reference to an existing version id
    pub fn resolve(&self, version_ref: &VersionRef) -> Result<String> {
        match version_ref {
            VersionRef::Head { ancestor } => self.resolve_head(*ancestor),
            VersionRef::Id(id) => {
                if self.store.version_exists(id) {
                    Ok(id.clone())
                } else {
                    Err(LineageError::version_not_found(id))
                }
            }
            VersionRef::Prefix(prefix) => self.resolve_prefix(prefix),
        }
    }

    fn resolve_head(&self, ancestor: usize) -> Result<String> {
        let mut current = self
            .store
            .get_head()?
            .ok_or_else(|| LineageError::validation("HEAD is not set"))?;

        for step in 0..ancestor {
            let record = self.store.find_record(&current)?;
            current = record.record.parent_id.ok_or_else(|| {
                LineageError::version_not_found(format!("HEAD~{} (history has {} ancestors)", ancestor, step))
            })?;
        }

        if !self.store.version_exists(&current) {
            return Err(LineageError::version_not_found(current));
        }
        Ok(current)
    }

    fn resolve_prefix(&self, prefix: &str) -> Result<String> {
        let mut matches: Vec<String> = self
            .store
            .list_version_ids()?
            .into_iter()
            .filter(|id| id.starts_with(prefix))
            .collect();

        match matches.len() {
            0 => Err(LineageError::version_not_found(prefix)),
            1 => Ok(matches.remove(0)),
            n => Err(LineageError::AmbiguousVersion {
                prefix: prefix.to_string(),
                matches: n,
            }),
        }
    }
}
