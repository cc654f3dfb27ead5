//! End-to-end flat-file inference over generated CSV fixtures.

use metascan::error::ScanError;
use metascan::metadata::ObjectType;
use metascan::scan::{scan, test_connection, ScanRequest};
use metascan::source::{SourceDescriptor, SourceFamily};
use std::fmt::Write as _;
use std::path::{Path, PathBuf};

fn write_csv(dir: &tempfile::TempDir, name: &str, content: &str) -> PathBuf {
    let path = dir.path().join(name);
    std::fs::write(&path, content).unwrap();
    path
}

fn csv_request(path: &Path) -> ScanRequest {
    let source = SourceDescriptor::new("csv", path.to_str().unwrap()).unwrap();
    ScanRequest::new(source).with_file_path(path)
}

#[tokio::test]
async fn test_basic_csv_shape() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_csv(
        &dir,
        "people.csv",
        "id,name,score\n1,ada,9.5\n2,grace,8.25\n3,edsger,\n",
    );

    let result = scan(&csv_request(&path)).await.unwrap();
    assert_eq!(result.source_type(), SourceFamily::File);

    let objects = result.objects();
    assert_eq!(objects[0].object_type, ObjectType::Table);
    assert_eq!(objects[0].name, path.display().to_string());

    let fields: Vec<(&str, &str, Option<bool>)> = objects[1..]
        .iter()
        .map(|o| (o.name.as_str(), o.types[0].as_str(), o.nullable))
        .collect();
    assert_eq!(
        fields,
        vec![
            ("id", "int", Some(false)),
            ("name", "str", Some(false)),
            ("score", "float", Some(true)),
        ]
    );
    assert!(objects[1..].iter().all(|o| o.primary_key == Some(false)));
}

#[tokio::test]
async fn test_missing_tail_beyond_row_cap_is_not_observed() {
    // Column x is populated for the first 249 data rows and empty from row
    // 250 on; the scanner samples 200 rows, so the empty tail is invisible
    // and x reports non-nullable.
    let mut content = String::from("id,x\n");
    for i in 1..=300 {
        if i < 250 {
            writeln!(content, "{i},{i}").unwrap();
        } else {
            writeln!(content, "{i},").unwrap();
        }
    }
    let dir = tempfile::tempdir().unwrap();
    let path = write_csv(&dir, "tail.csv", &content);

    let result = scan(&csv_request(&path)).await.unwrap();
    let x = &result.objects()[2];
    assert_eq!(x.name, "x");
    assert_eq!(x.nullable, Some(false));
    assert_eq!(x.types, vec!["int".to_string()]);
}

#[tokio::test]
async fn test_gap_inside_row_cap_is_observed() {
    let mut content = String::from("id,x\n");
    for i in 1..=300 {
        if i == 100 {
            writeln!(content, "{i},").unwrap();
        } else {
            writeln!(content, "{i},{i}").unwrap();
        }
    }
    let dir = tempfile::tempdir().unwrap();
    let path = write_csv(&dir, "gap.csv", &content);

    let result = scan(&csv_request(&path)).await.unwrap();
    assert_eq!(result.objects()[2].nullable, Some(true));
}

#[tokio::test]
async fn test_dominant_type_wins_mixed_column() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_csv(&dir, "mixed.csv", "v\n1\n2\nthree\n4\n");

    let result = scan(&csv_request(&path)).await.unwrap();
    assert_eq!(result.objects()[1].types, vec!["int".to_string()]);
}

#[tokio::test]
async fn test_header_only_file_yields_all_unknown() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_csv(&dir, "empty.csv", "a,b\n");

    let result = scan(&csv_request(&path)).await.unwrap();
    let objects = result.objects();
    assert_eq!(objects.len(), 3);
    assert!(objects[1..]
        .iter()
        .all(|o| o.types == vec!["unknown".to_string()]));
}

#[tokio::test]
async fn test_missing_file_path_fails_before_io() {
    let source = SourceDescriptor::new("csv", "/tmp/people.csv").unwrap();
    let err = scan(&ScanRequest::new(source)).await.unwrap_err();
    assert!(matches!(err, ScanError::FileRequired));
}

#[tokio::test]
async fn test_unsupported_extension_is_typed() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_csv(&dir, "data.parquet", "not really parquet");

    let err = scan(&csv_request(&path)).await.unwrap_err();
    match err {
        ScanError::UnsupportedFormat { extension } => assert_eq!(extension, "parquet"),
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn test_probe_checks_readability() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_csv(&dir, "people.csv", "a\n1\n");

    let ok = SourceDescriptor::new("csv", path.to_str().unwrap()).unwrap();
    test_connection(&ok).await.unwrap();

    let missing = SourceDescriptor::new("csv", "/no/such/people.csv").unwrap();
    let err = test_connection(&missing).await.unwrap_err();
    assert!(matches!(err, ScanError::Connection { .. }));

    // An empty descriptor is a probe failure like any other, not a
    // missing-input error; FileRequired is reserved for scan requests.
    let blank = SourceDescriptor::new("csv", "  ").unwrap();
    let err = test_connection(&blank).await.unwrap_err();
    assert!(matches!(err, ScanError::Connection { .. }));
}
