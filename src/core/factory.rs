// src/core/factory.rs

use crate::core::value::Value;
use crate::models::ExecutionResult;
use std::fmt;
use std::sync::Arc;

/// The argument kinds a registered factory can draw from an execution result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArgType {
    /// The whole [`ExecutionResult`].
    Result,
    /// The standard output text.
    Text,
    /// The return code.
    Code,
}

/// Candidate signatures, most informative first. Resolution walks this list
/// and picks the first signature any registered entry matches.
pub const CANDIDATE_SIGNATURES: &[&[ArgType]] = &[
    &[ArgType::Result],
    &[ArgType::Text, ArgType::Text, ArgType::Code],
    &[ArgType::Text, ArgType::Text],
    &[ArgType::Text, ArgType::Code],
    &[ArgType::Code, ArgType::Text],
    &[ArgType::Text],
    &[ArgType::Code],
];

/// Well-known factory names, ranked. Names outside this list rank after it,
/// alphabetically.
const NAME_PRIORITY: &[&str] = &[
    "parse", "from", "of", "create", "build", "make", "value_of",
];

fn name_rank(name: &str) -> (usize, &str) {
    let position = NAME_PRIORITY
        .iter()
        .position(|known| *known == name)
        .unwrap_or(NAME_PRIORITY.len());
    (position, name)
}

type Builder = Arc<dyn Fn(&ExecutionResult) -> Value + Send + Sync>;

struct FactoryEntry {
    /// `None` for a constructor, `Some` for a named factory.
    name: Option<String>,
    signature: Vec<ArgType>,
    build: Builder,
}

impl fmt::Debug for FactoryEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FactoryEntry")
            .field("name", &self.name)
            .field("signature", &self.signature)
            .finish()
    }
}

/// The ways a type can be built from an [`ExecutionResult`], with the
/// selection rules that pick one of them.
///
/// Selection runs in two passes: constructors are tried against
/// [`CANDIDATE_SIGNATURES`] in order, then named factories, also walked by
/// signature order; well-known names only break ties within one signature.
#[derive(Debug, Default)]
pub struct FactorySet {
    entries: Vec<FactoryEntry>,
}

impl FactorySet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a constructor taking `signature`.
    pub fn constructor(
        mut self,
        signature: &[ArgType],
        build: impl Fn(&ExecutionResult) -> Value + Send + Sync + 'static,
    ) -> Self {
        self.entries.push(FactoryEntry {
            name: None,
            signature: signature.to_vec(),
            build: Arc::new(build),
        });
        self
    }

    /// Registers a named factory taking `signature`.
    pub fn factory(
        mut self,
        name: impl Into<String>,
        signature: &[ArgType],
        build: impl Fn(&ExecutionResult) -> Value + Send + Sync + 'static,
    ) -> Self {
        self.entries.push(FactoryEntry {
            name: Some(name.into()),
            signature: signature.to_vec(),
            build: Arc::new(build),
        });
        self
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Picks the entry the selection rules prefer, if any is registered.
    pub fn resolve(&self) -> Option<Builder> {
        for signature in CANDIDATE_SIGNATURES {
            if let Some(entry) = self
                .entries
                .iter()
                .find(|entry| entry.name.is_none() && entry.signature == *signature)
            {
                return Some(Arc::clone(&entry.build));
            }
        }
        let mut named: Vec<&FactoryEntry> = self
            .entries
            .iter()
            .filter(|entry| entry.name.is_some())
            .collect();
        named.sort_by_key(|entry| {
            let name = entry.name.as_deref().unwrap_or_default();
            let signature_rank = CANDIDATE_SIGNATURES
                .iter()
                .position(|candidate| entry.signature == *candidate)
                .unwrap_or(CANDIDATE_SIGNATURES.len());
            let (name_position, name) = name_rank(name);
            (signature_rank, name_position, name.to_string())
        });
        named.first().map(|entry| Arc::clone(&entry.build))
    }
}

// MARK: --- UNIT TESTS ---
