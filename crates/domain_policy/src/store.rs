//! Local declarations store
//!
//! # Architecture
//!
//! `DeclarationsPort` is the seam between the resolver and wherever the
//! declarations pages live locally. Two adapters ship with the crate:
//!
//! - **In-memory**: seeded programmatically, used by tests and embedders
//! - **Directory**: every `*.md` / `*.txt` file in a directory, parsed at
//!   load time and keyed by its `Policy Number:` line

use std::collections::HashMap;
use std::path::Path;

use async_trait::async_trait;
use tracing::{info, warn};

use core_kernel::{DomainPort, PolicyNumber, PortError};

use crate::declarations::PolicyDeclarations;
use crate::error::PolicyError;
use crate::parser::DeclarationsParser;

const DECLARATIONS_EXTENSIONS: &[&str] = &["md", "txt"];

/// Port for locally held declarations
#[async_trait]
pub trait DeclarationsPort: DomainPort {
    /// Looks up the declarations for a policy
    async fn find(
        &self,
        policy_number: &PolicyNumber,
    ) -> Result<Option<PolicyDeclarations>, PortError>;

    /// All policy numbers the store knows about, sorted
    async fn policy_numbers(&self) -> Result<Vec<PolicyNumber>, PortError>;
}

/// Declarations held in memory
#[derive(Debug, Clone, Default)]
pub struct InMemoryDeclarationsStore {
    declarations: HashMap<PolicyNumber, PolicyDeclarations>,
}

impl InMemoryDeclarationsStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces the declarations for their policy
    pub fn insert(&mut self, declarations: PolicyDeclarations) {
        if let Some(previous) = self
            .declarations
            .insert(declarations.policy_number.clone(), declarations)
        {
            warn!(policy_number = %previous.policy_number, "Replaced existing declarations");
        }
    }

    pub fn with(mut self, declarations: PolicyDeclarations) -> Self {
        self.insert(declarations);
        self
    }

    /// Parses each text and stores the result
    pub fn from_texts<I, S>(texts: I) -> Result<Self, PolicyError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut store = Self::new();
        for text in texts {
            store.insert(DeclarationsParser::parse(text.as_ref())?);
        }
        Ok(store)
    }

    pub fn len(&self) -> usize {
        self.declarations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.declarations.is_empty()
    }
}

impl DomainPort for InMemoryDeclarationsStore {}

#[async_trait]
impl DeclarationsPort for InMemoryDeclarationsStore {
    async fn find(
        &self,
        policy_number: &PolicyNumber,
    ) -> Result<Option<PolicyDeclarations>, PortError> {
        Ok(self.declarations.get(policy_number).cloned())
    }

    async fn policy_numbers(&self) -> Result<Vec<PolicyNumber>, PortError> {
        let mut numbers: Vec<PolicyNumber> = self.declarations.keys().cloned().collect();
        numbers.sort();
        Ok(numbers)
    }
}

/// Declarations loaded from a directory of text documents
#[derive(Debug, Clone)]
pub struct DirectoryDeclarationsStore {
    inner: InMemoryDeclarationsStore,
}

impl DirectoryDeclarationsStore {
    /// Reads and parses every declarations document in `dir`
    ///
    /// Documents that fail to parse are skipped with a warning; an unreadable
    /// directory is an error.
    pub fn load(dir: impl AsRef<Path>) -> Result<Self, PolicyError> {
        let dir = dir.as_ref();
        let entries = std::fs::read_dir(dir).map_err(|e| {
            PolicyError::Port(PortError::Connection {
                message: format!("cannot read declarations directory {}", dir.display()),
                source: Some(Box::new(e)),
            })
        })?;

        let mut paths: Vec<_> = entries
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| {
                path.extension()
                    .and_then(|ext| ext.to_str())
                    .map(|ext| DECLARATIONS_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
                    .unwrap_or(false)
            })
            .collect();
        paths.sort();

        let mut inner = InMemoryDeclarationsStore::new();
        for path in paths {
            let text = match std::fs::read_to_string(&path) {
                Ok(text) => text,
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Skipping unreadable declarations");
                    continue;
                }
            };
            match DeclarationsParser::parse(&text) {
                Ok(declarations) => inner.insert(declarations),
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Skipping malformed declarations");
                }
            }
        }

        info!(
            directory = %dir.display(),
            policies = inner.len(),
            "Loaded declarations directory"
        );

        Ok(Self { inner })
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

impl DomainPort for DirectoryDeclarationsStore {}

#[async_trait]
impl DeclarationsPort for DirectoryDeclarationsStore {
    async fn find(
        &self,
        policy_number: &PolicyNumber,
    ) -> Result<Option<PolicyDeclarations>, PortError> {
        self.inner.find(policy_number).await
    }

    async fn policy_numbers(&self) -> Result<Vec<PolicyNumber>, PortError> {
        self.inner.policy_numbers().await
    }
}
