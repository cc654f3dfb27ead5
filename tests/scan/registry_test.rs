//! Dispatch tests: spelling normalization into the registry, registry
//! misses, and the strategy extension point.

use async_trait::async_trait;
use metascan::error::ScanError;
use metascan::metadata::{assemble, MetadataObject, ObjectType, ScanResult};
use metascan::scan::{ScanRequest, ScannerRegistry, SourceScanner};
use metascan::source::{normalize, SourceDescriptor, SourceFamily, SourceType};
use std::sync::Arc;

#[test]
fn test_azure_sql_normalizes_to_sqlserver() {
    assert_eq!(normalize("Azure SQL"), "sqlserver");
    assert_eq!(normalize("azure-sql"), "sqlserver");
    assert_eq!(normalize("AzureSQL"), "sqlserver");
}

#[test]
fn test_descriptor_construction_rejects_unknown_types() {
    let err = SourceDescriptor::new("cassandra", "cassandra://db").unwrap_err();
    assert!(matches!(err, ScanError::UnknownSourceType { .. }));
    assert_eq!(
        err.to_string(),
        "unknown source type: cassandra (normalized: cassandra)"
    );
}

#[test]
fn test_every_canonical_type_has_a_builtin_strategy() {
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
        assert!(registry.get(ty).is_some(), "no strategy for {ty}");
    }
}

#[tokio::test]
async fn test_empty_registry_reports_unknown_type() {
    let registry = ScannerRegistry::new();
    let source = SourceDescriptor::new("sqlite", ":memory:").unwrap();

    let err = registry.test_connection(&source).await.unwrap_err();
    assert!(matches!(err, ScanError::UnknownSourceType { .. }));

    let err = registry.scan(&ScanRequest::new(source)).await.unwrap_err();
    assert!(matches!(err, ScanError::UnknownSourceType { .. }));
}

/// Strategy stub standing in for a source kind the built-ins don't cover.
struct FixedScanner;

#[async_trait]
impl SourceScanner for FixedScanner {
    fn family(&self) -> SourceFamily {
        SourceFamily::Sql
    }

    async fn probe(&self, _source: &SourceDescriptor) -> Result<(), ScanError> {
        Ok(())
    }

    async fn scan(&self, _request: &ScanRequest) -> Result<ScanResult, ScanError> {
        let objects = vec![MetadataObject::container(ObjectType::Table, "fixed")];
        Ok(assemble(SourceFamily::Sql, objects)?)
    }
}

#[tokio::test]
async fn test_registered_strategy_replaces_builtin() {
    let mut registry = ScannerRegistry::builtin();
    registry.register(SourceType::Postgres, Arc::new(FixedScanner));

    let source = SourceDescriptor::new("pg", "postgres://nowhere/db").unwrap();
    registry.test_connection(&source).await.unwrap();

    let result = registry.scan(&ScanRequest::new(source)).await.unwrap();
    assert_eq!(result.object_count(), 1);
    assert_eq!(result.objects()[0].name, "fixed");
}
