//! Scan orchestration: requests, strategy dispatch, entry points.
//!
//! Dispatch is a registered-strategy lookup rather than a conditional chain:
//! [`ScannerRegistry`] maps each canonical [`SourceType`] to a strategy
//! implementing [`SourceScanner`], selected once per invocation. The
//! registry is an explicit, caller-owned value; [`scan`] and
//! [`test_connection`] are conveniences over [`ScannerRegistry::builtin`].
//!
//! ```text
//!  ScanRequest ──> registry lookup ──> SourceScanner::scan ──> ScanResult
//!                      │
//!                      └─ miss: UnknownSourceType
//! ```
//!
//! # Example
//!
//! ```ignore
//! use metascan::scan::{scan, ScanRequest};
//! use metascan::source::SourceDescriptor;
//!
//! let source = SourceDescriptor::new("sqlite", "/var/lib/app/app.db")?;
//! let result = scan(&ScanRequest::new(source)).await?;
//! for obj in result.objects() {
//!     println!("{} {}", obj.object_type, obj.name);
//! }
//! ```

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::sync::Arc;

use crate::document::DocumentScanner;
use crate::error::ScanError;
use crate::file::FileScanner;
use crate::metadata::ScanResult;
use crate::source::{SourceDescriptor, SourceFamily, SourceType};
use crate::sql::RelationalScanner;

/// Default document-sampling bound when the request does not set one.
pub const DEFAULT_SAMPLE_SIZE: usize = 100;

/// One scan invocation's inputs.
///
/// Constructed by the caller, discarded after the call returns.
#[derive(Debug, Clone)]
pub struct ScanRequest {
    /// The source to scan.
    pub source: SourceDescriptor,
    /// Database/schema names to target. `None` means "use the dialect's
    /// resolution chain"; `Some` lists explicit targets in order.
    pub db_names: Option<Vec<String>>,
    /// Artifact names to retain, matched case-insensitively against
    /// enumerated table/view/procedure/collection names. `None` retains all.
    pub artifact_types: Option<Vec<String>>,
    /// File to read (file sources only).
    pub file_path: Option<PathBuf>,
    /// Per-collection document sampling bound (document sources only).
    pub sample_size: usize,
}

impl ScanRequest {
    /// Create a request with defaults: no filters, default sample bound.
    pub fn new(source: SourceDescriptor) -> Self {
        Self {
            source,
            db_names: None,
            artifact_types: None,
            file_path: None,
            sample_size: DEFAULT_SAMPLE_SIZE,
        }
    }

    /// Target explicit database/schema names.
    pub fn with_db_names(mut self, names: Vec<String>) -> Self {
        self.db_names = Some(names);
        self
    }

    /// Retain only the named artifacts (case-insensitive).
    pub fn with_artifact_types(mut self, names: Vec<String>) -> Self {
        self.artifact_types = Some(names);
        self
    }

    /// Set the file to read (file sources).
    pub fn with_file_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.file_path = Some(path.into());
        self
    }

    /// Set the document sampling bound (document sources).
    pub fn with_sample_size(mut self, n: usize) -> Self {
        self.sample_size = n;
        self
    }

    /// The name filter for this request.
    pub fn artifact_filter(&self) -> ArtifactFilter {
        ArtifactFilter::new(self.artifact_types.as_deref())
    }
}

/// Case-insensitive artifact-name filter.
///
/// Built from a request's `artifact_types`; an absent filter retains
/// everything. Applied independently to each enumerated name list so a
/// request can select specific artifacts of specific kinds.
#[derive(Debug, Clone, Default)]
pub struct ArtifactFilter {
    names: Option<HashSet<String>>,
}

impl ArtifactFilter {
    /// Build a filter from requested names, folding case.
    pub fn new(names: Option<&[String]>) -> Self {
        Self {
            names: names.map(|list| list.iter().map(|n| n.to_lowercase()).collect()),
        }
    }

    /// Whether a source-reported name survives the filter.
    pub fn matches(&self, name: &str) -> bool {
        match &self.names {
            None => true,
            Some(set) => set.contains(&name.to_lowercase()),
        }
    }

    /// Keep the matching names, preserving source order.
    pub fn retain(&self, names: Vec<String>) -> Vec<String> {
        match &self.names {
            None => names,
            Some(_) => names.into_iter().filter(|n| self.matches(n)).collect(),
        }
    }
}

/// Capability interface every scanning strategy implements.
///
/// One strategy handles one source family; the registry may map several
/// canonical types to the same strategy value. Strategies acquire their own
/// connection handle per invocation and release it on every exit path; they
/// hold no state between calls.
#[async_trait]
pub trait SourceScanner: Send + Sync {
    /// The family tag this strategy's results carry.
    fn family(&self) -> SourceFamily;

    /// Run the liveness probe: `SELECT 1` or the dialect's ping.
    ///
    /// Any failure — auth, network, malformed descriptor — is classified as
    /// [`ScanError::Connection`].
    async fn probe(&self, source: &SourceDescriptor) -> Result<(), ScanError>;

    /// Introspect the source and produce the normalized result.
    async fn scan(&self, request: &ScanRequest) -> Result<ScanResult, ScanError>;
}

/// Canonical type → scanning strategy.
///
/// No process-wide instance exists; callers construct a registry (usually
/// [`builtin`](Self::builtin)) and own it. Registration replaces any
/// previous strategy for the same type, which is how callers swap in custom
/// strategies for testing or new source kinds.
pub struct ScannerRegistry {
    strategies: HashMap<SourceType, Arc<dyn SourceScanner>>,
}

impl ScannerRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self {
            strategies: HashMap::new(),
        }
    }

    /// The built-in strategy set: relational, document, and file scanners
    /// wired to every canonical type.
    pub fn builtin() -> Self {
        let mut registry = Self::new();
        let relational = Arc::new(RelationalScanner::new());
        for ty in [
            SourceType::Postgres,
            SourceType::MySql,
            SourceType::SqlServer,
            SourceType::Sqlite,
        ] {
            registry.register(ty, relational.clone());
        }
        registry.register(SourceType::MongoDb, Arc::new(DocumentScanner::new()));
        let file = Arc::new(FileScanner::new());
        registry.register(SourceType::Csv, file.clone());
        registry.register(SourceType::Excel, file);
        registry
    }

    /// Register a strategy for a canonical type.
    pub fn register(&mut self, source_type: SourceType, strategy: Arc<dyn SourceScanner>) {
        self.strategies.insert(source_type, strategy);
    }

    /// Look up the strategy for a canonical type.
    pub fn get(&self, source_type: SourceType) -> Option<&Arc<dyn SourceScanner>> {
        self.strategies.get(&source_type)
    }

    fn strategy_for(&self, source: &SourceDescriptor) -> Result<&Arc<dyn SourceScanner>, ScanError> {
        self.get(source.source_type)
            .ok_or_else(|| ScanError::UnknownSourceType {
                raw: source.source_type.to_string(),
                canonical: source.source_type.to_string(),
            })
    }

    /// Run a scan through this registry's strategy set.
    pub async fn scan(&self, request: &ScanRequest) -> Result<ScanResult, ScanError> {
        let strategy = self.strategy_for(&request.source)?;
        tracing::debug!(
            source_type = request.source.source_type.as_str(),
            family = strategy.family().as_str(),
            "dispatching scan"
        );
        strategy.scan(request).await
    }

    /// Run the liveness probe through this registry's strategy set.
    pub async fn test_connection(&self, source: &SourceDescriptor) -> Result<(), ScanError> {
        let strategy = self.strategy_for(source)?;
        strategy.probe(source).await
    }
}

impl Default for ScannerRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

/// Scan one source with the built-in strategies.
///
/// Fails with [`ScanError::UnknownSourceType`] when no strategy is
/// registered for the source's type, [`ScanError::Connection`] when the
/// source cannot be reached, [`ScanError::FileRequired`] when a file-kind
/// source lacks a `file_path`, and [`ScanError::MissingDatabaseName`] when a
/// document-kind source resolves no target database.
pub async fn scan(request: &ScanRequest) -> Result<ScanResult, ScanError> {
    ScannerRegistry::builtin().scan(request).await
}

/// Probe one source with the built-in strategies. `Ok(())` is "ok".
pub async fn test_connection(source: &SourceDescriptor) -> Result<(), ScanError> {
    ScannerRegistry::builtin().test_connection(source).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_defaults() {
        let source = SourceDescriptor::new("sqlite", ":memory:").unwrap();
        let request = ScanRequest::new(source);
        assert!(request.db_names.is_none());
        assert!(request.artifact_types.is_none());
        assert!(request.file_path.is_none());
        assert_eq!(request.sample_size, DEFAULT_SAMPLE_SIZE);
    }

    #[test]
    fn test_filter_absent_retains_all() {
        let filter = ArtifactFilter::new(None);
        assert!(filter.matches("anything"));
        let names = vec!["a".to_string(), "b".to_string()];
        assert_eq!(filter.retain(names.clone()), names);
    }

    #[test]
    fn test_filter_is_case_insensitive_intersection() {
        let requested = vec!["Users".to_string(), "ORDERS".to_string()];
        let filter = ArtifactFilter::new(Some(&requested));
        assert!(filter.matches("users"));
        assert!(filter.matches("Orders"));
        assert!(!filter.matches("payments"));

        let kept = filter.retain(vec![
            "users".to_string(),
            "payments".to_string(),
            "orders".to_string(),
        ]);
        assert_eq!(kept, vec!["users".to_string(), "orders".to_string()]);
    }

    #[test]
    fn test_empty_filter_retains_nothing() {
        let filter = ArtifactFilter::new(Some(&[]));
        assert!(!filter.matches("users"));
        assert!(filter.retain(vec!["users".to_string()]).is_empty());
    }

    #[test]
    fn test_builtin_registry_covers_every_type() {
        let registry = ScannerRegistry::builtin();
        for ty in [
            SourceType::Postgres,
            SourceType::MySql,
            SourceType::SqlServer,
            SourceType::Sqlite,
            SourceType::MongoDb,
            SourceType::Csv,
            SourceType::Excel,
        ] {
            let strategy = registry.get(ty).unwrap_or_else(|| panic!("no strategy for {ty}"));
            assert_eq!(strategy.family(), ty.family());
        }
    }

    #[test]
    fn test_registry_miss_reports_unknown_type() {
        let registry = ScannerRegistry::new();
        let source = SourceDescriptor::new("mongodb", "mongodb://db/app").unwrap();
        let err = futures::executor::block_on(registry.test_connection(&source)).unwrap_err();
        assert!(matches!(err, ScanError::UnknownSourceType { .. }));
    }

    #[test]
    fn test_scanner_trait_is_object_safe_and_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<ScannerRegistry>();
        assert_send_sync::<Arc<dyn SourceScanner>>();
    }
}
