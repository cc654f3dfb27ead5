//! End-to-end relational scans against real SQLite databases.

use metascan::error::ScanError;
use metascan::metadata::ObjectType;
use metascan::scan::{scan, test_connection, ScanRequest};
use metascan::source::{SourceDescriptor, SourceFamily};
use std::path::PathBuf;

fn fixture_db(name: &str, ddl: &str) -> (tempfile::TempDir, PathBuf) {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join(name);
    let conn = rusqlite::Connection::open(&path).unwrap();
    conn.execute_batch(ddl).unwrap();
    conn.close().unwrap();
    (dir, path)
}

fn descriptor(path: &PathBuf) -> SourceDescriptor {
    SourceDescriptor::new("sqlite", path.to_str().unwrap()).unwrap()
}

#[tokio::test]
async fn test_single_table_scan_shape() {
    let (_dir, path) = fixture_db("app.db", "CREATE TABLE t (a int, b text);");

    let request = ScanRequest::new(descriptor(&path))
        .with_artifact_types(vec!["t".to_string()]);
    let result = scan(&request).await.unwrap();

    assert_eq!(result.source_type(), SourceFamily::Sql);
    let rendered: Vec<String> = result
        .objects()
        .iter()
        .map(|o| {
            format!(
                "{} {}.{} types={:?} nullable={:?} pk={:?}",
                o.object_type, o.table, o.name, o.types, o.nullable, o.primary_key
            )
        })
        .collect();
    insta::assert_snapshot!(rendered.join("\n"), @r#"
    table t.t types=[] nullable=None pk=None
    table_column t.a types=["INTEGER"] nullable=Some(true) pk=Some(false)
    table_column t.b types=["TEXT"] nullable=Some(true) pk=Some(false)
    "#);
}

#[tokio::test]
async fn test_containers_precede_members_and_views_follow_tables() {
    let (_dir, path) = fixture_db(
        "app.db",
        "CREATE TABLE users (id integer PRIMARY KEY, email text NOT NULL);
         CREATE VIEW v_emails AS SELECT email FROM users;",
    );

    let result = scan(&ScanRequest::new(descriptor(&path))).await.unwrap();
    let objects = result.objects();

    let mut seen_containers = Vec::new();
    for obj in objects {
        if obj.is_container() {
            seen_containers.push(obj.name.clone());
        } else {
            assert!(
                seen_containers.contains(&obj.table),
                "member {} emitted before container {}",
                obj.name,
                obj.table
            );
        }
    }

    let users_id = objects
        .iter()
        .find(|o| o.table == "users" && o.name == "id")
        .unwrap();
    assert_eq!(users_id.object_type, ObjectType::TableColumn);
    assert_eq!(users_id.primary_key, Some(true));

    let view_email = objects
        .iter()
        .find(|o| o.table == "v_emails" && o.name == "email")
        .unwrap();
    assert_eq!(view_email.object_type, ObjectType::ViewColumn);
    assert_eq!(view_email.primary_key, Some(false));
}

#[tokio::test]
async fn test_artifact_filter_is_case_insensitive_intersection() {
    let (_dir, path) = fixture_db(
        "app.db",
        "CREATE TABLE orders (id int);
         CREATE TABLE audit_log (id int);
         CREATE VIEW orders_v AS SELECT id FROM orders;",
    );

    let request = ScanRequest::new(descriptor(&path))
        .with_artifact_types(vec!["ORDERS".to_string(), "orders_v".to_string()]);
    let result = scan(&request).await.unwrap();

    let containers: Vec<&str> = result.containers().map(|o| o.name.as_str()).collect();
    assert_eq!(containers, vec!["orders", "orders_v"]);
    assert!(!result.objects().iter().any(|o| o.table == "audit_log"));
}

#[tokio::test]
async fn test_empty_database_yields_empty_result() {
    let (_dir, path) = fixture_db("empty.db", "");
    let result = scan(&ScanRequest::new(descriptor(&path))).await.unwrap();
    assert_eq!(result.source_type(), SourceFamily::Sql);
    assert_eq!(result.object_count(), 0);
}

#[tokio::test]
async fn test_no_procedures_for_sqlite() {
    let (_dir, path) = fixture_db("app.db", "CREATE TABLE t (a int);");
    let result = scan(&ScanRequest::new(descriptor(&path))).await.unwrap();
    assert!(!result
        .objects()
        .iter()
        .any(|o| matches!(o.object_type, ObjectType::Procedure | ObjectType::ProcedureParam)));
}

#[tokio::test]
async fn test_probe_ok_on_existing_database() {
    let (_dir, path) = fixture_db("app.db", "CREATE TABLE t (a int);");
    test_connection(&descriptor(&path)).await.unwrap();
}

#[tokio::test]
async fn test_probe_fails_typed_on_missing_database() {
    let source = SourceDescriptor::new("sqlite", "/no/such/dir/app.db").unwrap();
    let err = test_connection(&source).await.unwrap_err();
    assert!(matches!(err, ScanError::Connection { .. }));
}
