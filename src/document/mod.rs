//! Document-store scanning by sampling.
//!
//! MongoDB keeps no schema catalog, so shape is inferred: read up to
//! `sample_size` documents per collection and union the field types seen
//! across them. Fields are reported in first-observation order, every field
//! is nullable (any document may omit it), and only `_id` counts as a key.
//!
//! Database resolution: explicit `db_names` win (blank entries dropped, and
//! all-blank is an error raised before any I/O); otherwise the database is
//! taken from the connection URI's path, falling back to `test` when the
//! path is empty.

use async_trait::async_trait;
use futures::TryStreamExt;
use mongodb::bson::{doc, Bson, Document};
use mongodb::{Client, Database};
use std::collections::HashMap;

use crate::error::{IntrospectResult, ScanError};
use crate::metadata::{assemble, MetadataObject, ObjectType, ScanResult};
use crate::scan::{ScanRequest, SourceScanner};
use crate::source::{SourceDescriptor, SourceFamily};

/// The scanning strategy for document stores.
#[derive(Debug, Default)]
pub struct DocumentScanner;

impl DocumentScanner {
    /// Create the strategy.
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl SourceScanner for DocumentScanner {
    fn family(&self) -> SourceFamily {
        SourceFamily::Mongo
    }

    async fn probe(&self, source: &SourceDescriptor) -> Result<(), ScanError> {
        let client = Client::with_uri_str(&source.connection_string)
            .await
            .map_err(ScanError::connection)?;
        let database =
            database_from_uri(&source.connection_string).unwrap_or_else(|| "test".to_string());
        ping(&client, &database).await.map_err(ScanError::connection)
    }

    async fn scan(&self, request: &ScanRequest) -> Result<ScanResult, ScanError> {
        let databases = resolve_database_names(
            &request.source.connection_string,
            request.db_names.as_deref(),
        )?;
        let filter = request.artifact_filter();

        // The client connects lazily; the ping is what surfaces an
        // unreachable or misconfigured server as a typed failure.
        let client = Client::with_uri_str(&request.source.connection_string)
            .await
            .map_err(ScanError::connection)?;
        if let Some(first) = databases.first() {
            ping(&client, first).await.map_err(ScanError::connection)?;
        }

        let mut objects = Vec::new();
        for db_name in &databases {
            let db = client.database(db_name);
            let collections = match db.list_collection_names().await {
                Ok(names) => filter.retain(names),
                Err(err) => {
                    tracing::warn!(database = %db_name, error = %err, "listing collections failed, skipping database");
                    continue;
                }
            };
            for collection in collections {
                objects.push(MetadataObject::container(ObjectType::Collection, &collection));
                match sample(&db, &collection, request.sample_size).await {
                    Ok(docs) => {
                        objects.extend(field_members(&collection, accumulate_fields(&docs)));
                    }
                    Err(err) => {
                        tracing::warn!(collection = %collection, error = %err, "sampling failed, reporting no fields");
                    }
                }
            }
        }
        Ok(assemble(SourceFamily::Mongo, objects)?)
    }
}

pub(crate) async fn ping(client: &Client, database: &str) -> IntrospectResult<()> {
    client.database(database).run_command(doc! { "ping": 1 }).await?;
    Ok(())
}

/// Read up to `sample_size` documents. A size of zero disables sampling
/// outright rather than passing 0 to the driver, where it means unlimited.
async fn sample(
    db: &Database,
    collection: &str,
    sample_size: usize,
) -> IntrospectResult<Vec<Document>> {
    if sample_size == 0 {
        return Ok(Vec::new());
    }
    let coll = db.collection::<Document>(collection);
    let mut cursor = coll.find(doc! {}).limit(sample_size as i64).await?;
    let mut docs = Vec::new();
    while let Some(document) = cursor.try_next().await? {
        docs.push(document);
    }
    Ok(docs)
}

/// Union the field types observed across a document sample.
///
/// Fields keep the order they were first seen in; each field's type list
/// keeps the order its types were first seen in, without duplicates.
fn accumulate_fields(docs: &[Document]) -> Vec<(String, Vec<String>)> {
    let mut order: Vec<String> = Vec::new();
    let mut types: HashMap<String, Vec<String>> = HashMap::new();
    for document in docs {
        for (field, value) in document {
            let type_name = bson_type_name(value);
            let entry = types.entry(field.clone()).or_insert_with(|| {
                order.push(field.clone());
                Vec::new()
            });
            if !entry.iter().any(|t| t == type_name) {
                entry.push(type_name.to_string());
            }
        }
    }
    order
        .into_iter()
        .map(|field| {
            let observed = types.remove(&field).unwrap_or_default();
            (field, observed)
        })
        .collect()
}

fn field_members(collection: &str, fields: Vec<(String, Vec<String>)>) -> Vec<MetadataObject> {
    fields
        .into_iter()
        .map(|(name, observed)| {
            let key = name == "_id";
            MetadataObject::member(
                ObjectType::Field,
                collection,
                name,
                observed,
                Some(true),
                Some(key),
            )
        })
        .collect()
}

/// Python-style type names for the BSON values a sample can contain.
fn bson_type_name(value: &Bson) -> &'static str {
    match value {
        Bson::Int32(_) | Bson::Int64(_) => "int",
        Bson::Double(_) => "float",
        Bson::String(_) => "str",
        Bson::Boolean(_) => "bool",
        Bson::Document(_) => "dict",
        Bson::Array(_) => "list",
        Bson::ObjectId(_) => "objectId",
        Bson::DateTime(_) => "datetime",
        Bson::Null => "none",
        Bson::Decimal128(_) => "decimal",
        Bson::Binary(_) => "bytes",
        Bson::Timestamp(_) => "timestamp",
        _ => "other",
    }
}

fn resolve_database_names(
    connection_string: &str,
    db_names: Option<&[String]>,
) -> Result<Vec<String>, ScanError> {
    match db_names {
        Some(names) => {
            let usable: Vec<String> = names
                .iter()
                .map(|s| s.trim())
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect();
            if usable.is_empty() {
                return Err(ScanError::MissingDatabaseName);
            }
            Ok(usable)
        }
        None => {
            let db =
                database_from_uri(connection_string).unwrap_or_else(|| "test".to_string());
            Ok(vec![db])
        }
    }
}

/// Extract the database segment of a MongoDB URI without parsing the whole
/// thing: everything between the first `/` after the host list and the
/// query string, if non-empty.
pub(crate) fn database_from_uri(uri: &str) -> Option<String> {
    let (_, rest) = uri.split_once("://")?;
    let (_, path_and_query) = rest.split_once('/')?;
    let path = match path_and_query.split_once('?') {
        Some((path, _)) => path,
        None => path_and_query,
    };
    let path = path.trim();
    if path.is_empty() {
        None
    } else {
        Some(path.to_string())
    }
}
