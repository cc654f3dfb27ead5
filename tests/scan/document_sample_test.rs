//! Document-source request handling that needs no live server.
//!
//! Shape inference over sampled documents is covered by the unit tests in
//! `src/document`; these tests pin the request-level contract: database
//! resolution failures surface before any I/O, and unreachable servers
//! surface as typed connection failures.

use metascan::error::ScanError;
use metascan::scan::{scan, test_connection, ScanRequest};
use metascan::source::SourceDescriptor;

// Short driver timeouts keep the unreachable-server tests fast.
const UNREACHABLE: &str =
    "mongodb://127.0.0.1:9/?serverSelectionTimeoutMS=500&connectTimeoutMS=500";

#[tokio::test]
async fn test_all_blank_db_names_fail_before_io() {
    let source = SourceDescriptor::new("mongo", UNREACHABLE).unwrap();
    let request = ScanRequest::new(source)
        .with_db_names(vec!["".to_string(), "   ".to_string()]);

    // The server is unreachable, but resolution fails first, so the error is
    // the missing name rather than a connection failure.
    let err = scan(&request).await.unwrap_err();
    assert!(matches!(err, ScanError::MissingDatabaseName));
}

#[tokio::test]
async fn test_unreachable_server_probe_is_typed() {
    let source = SourceDescriptor::new("mongodb", UNREACHABLE).unwrap();
    let err = test_connection(&source).await.unwrap_err();
    assert!(matches!(err, ScanError::Connection { .. }));
}

#[tokio::test]
async fn test_unreachable_server_scan_is_typed() {
    let source = SourceDescriptor::new("mongodb", UNREACHABLE).unwrap();
    let request = ScanRequest::new(source).with_db_names(vec!["app".to_string()]);
    let err = scan(&request).await.unwrap_err();
    assert!(matches!(err, ScanError::Connection { .. }));
}

#[tokio::test]
async fn test_malformed_uri_is_typed() {
    let source = SourceDescriptor::new("mongo", "not a mongodb uri").unwrap();
    let err = test_connection(&source).await.unwrap_err();
    assert!(matches!(err, ScanError::Connection { .. }));
}
