//! The normalized metadata model.
//!
//! Every scanning strategy flattens its source into the same shape: an
//! ordered sequence of [`MetadataObject`]s where containers (tables, views,
//! procedures, collections) appear before their members (columns, params,
//! fields). [`ScanResult`] carries that sequence plus the family tag and can
//! only be built through [`assemble`], which checks the ordering contract.
//!
//! ```text
//!   relational ─┐
//!   document  ──┼──> Vec<MetadataObject> ──> assemble() ──> ScanResult
//!   file      ──┘
//! ```

mod assemble;

pub use assemble::assemble;

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::source::SourceFamily;

/// Kinds of metadata objects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ObjectType {
    /// Relational table, or the container for a flat file.
    Table,
    /// Relational view.
    View,
    /// Stored procedure.
    Procedure,
    /// Column of a table.
    TableColumn,
    /// Column of a view.
    ViewColumn,
    /// Declared parameter of a stored procedure.
    ProcedureParam,
    /// Document-store collection.
    Collection,
    /// Sampled document key or inferred file column.
    Field,
}

impl ObjectType {
    /// The wire tag.
    pub fn as_str(&self) -> &'static str {
        match self {
            ObjectType::Table => "table",
            ObjectType::View => "view",
            ObjectType::Procedure => "procedure",
            ObjectType::TableColumn => "table_column",
            ObjectType::ViewColumn => "view_column",
            ObjectType::ProcedureParam => "procedure_param",
            ObjectType::Collection => "collection",
            ObjectType::Field => "field",
        }
    }

    /// Whether objects of this kind own members.
    pub fn is_container(&self) -> bool {
        matches!(
            self,
            ObjectType::Table | ObjectType::View | ObjectType::Procedure | ObjectType::Collection
        )
    }

    /// Whether this kind belongs to a family's output vocabulary.
    pub fn belongs_to(&self, family: SourceFamily) -> bool {
        match family {
            SourceFamily::Sql => matches!(
                self,
                ObjectType::Table
                    | ObjectType::View
                    | ObjectType::Procedure
                    | ObjectType::TableColumn
                    | ObjectType::ViewColumn
                    | ObjectType::ProcedureParam
            ),
            SourceFamily::Mongo => matches!(self, ObjectType::Collection | ObjectType::Field),
            SourceFamily::File => matches!(self, ObjectType::Table | ObjectType::Field),
        }
    }
}

impl fmt::Display for ObjectType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The atomic unit of scan output.
///
/// `table` names the owning container; containers name themselves. `types`
/// holds exactly one inferred type for relational and file sources, and the
/// full set of observed runtime types for document sources. `nullable` and
/// `primary_key` are `None` on containers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetadataObject {
    /// Owning container name (self for containers).
    pub table: String,
    /// Object's own name.
    pub name: String,
    /// Kind tag.
    pub object_type: ObjectType,
    /// Observed/inferred type names, source-reported order.
    pub types: Vec<String>,
    /// Nullability, when the source reports or implies one.
    pub nullable: Option<bool>,
    /// Primary-key membership, when meaningful for the kind.
    pub primary_key: Option<bool>,
}

impl MetadataObject {
    /// Build a container object. Containers own themselves: `table == name`.
    pub fn container(kind: ObjectType, name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            table: name.clone(),
            name,
            object_type: kind,
            types: Vec::new(),
            nullable: None,
            primary_key: None,
        }
    }

    /// Build a member object under a container emitted earlier.
    pub fn member(
        kind: ObjectType,
        container: impl Into<String>,
        name: impl Into<String>,
        types: Vec<String>,
        nullable: Option<bool>,
        primary_key: Option<bool>,
    ) -> Self {
        Self {
            table: container.into(),
            name: name.into(),
            object_type: kind,
            types,
            nullable,
            primary_key,
        }
    }

    /// Whether this object is a container.
    pub fn is_container(&self) -> bool {
        self.object_type.is_container()
    }
}

/// One scan's complete output: the family tag plus the ordered objects.
///
/// Constructed only by [`assemble`], so every value of this type satisfies
/// the container-before-member ordering and family-vocabulary contracts.
/// Opaque to the scanning core once built; downstream collaborators choose
/// serialization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanResult {
    source_type: SourceFamily,
    objects: Vec<MetadataObject>,
}

impl ScanResult {
    /// The family tag.
    pub fn source_type(&self) -> SourceFamily {
        self.source_type
    }

    /// The ordered object sequence.
    pub fn objects(&self) -> &[MetadataObject] {
        &self.objects
    }

    /// Consume the result, yielding the object sequence.
    pub fn into_objects(self) -> Vec<MetadataObject> {
        self.objects
    }

    /// Number of emitted objects.
    pub fn object_count(&self) -> usize {
        self.objects.len()
    }

    /// Member objects only (columns, params, fields).
    pub fn members(&self) -> impl Iterator<Item = &MetadataObject> {
        self.objects.iter().filter(|o| !o.is_container())
    }

    /// Container objects only.
    pub fn containers(&self) -> impl Iterator<Item = &MetadataObject> {
        self.objects.iter().filter(|o| o.is_container())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_container_owns_itself() {
        let obj = MetadataObject::container(ObjectType::Table, "users");
        assert_eq!(obj.table, "users");
        assert_eq!(obj.name, "users");
        assert!(obj.types.is_empty());
        assert_eq!(obj.nullable, None);
        assert_eq!(obj.primary_key, None);
        assert!(obj.is_container());
    }

    #[test]
    fn test_member_shape() {
        let obj = MetadataObject::member(
            ObjectType::TableColumn,
            "users",
            "email",
            vec!["TEXT".to_string()],
            Some(true),
            Some(false),
        );
        assert_eq!(obj.table, "users");
        assert_eq!(obj.name, "email");
        assert!(!obj.is_container());
    }

    #[test]
    fn test_family_vocabulary() {
        assert!(ObjectType::Procedure.belongs_to(SourceFamily::Sql));
        assert!(!ObjectType::Procedure.belongs_to(SourceFamily::Mongo));
        assert!(ObjectType::Field.belongs_to(SourceFamily::Mongo));
        assert!(ObjectType::Field.belongs_to(SourceFamily::File));
        assert!(!ObjectType::Field.belongs_to(SourceFamily::Sql));
        assert!(ObjectType::Table.belongs_to(SourceFamily::File));
        assert!(!ObjectType::Collection.belongs_to(SourceFamily::File));
    }

    #[test]
    fn test_wire_shape() {
        let obj = MetadataObject::member(
            ObjectType::ProcedureParam,
            "usp_report",
            "@year",
            vec!["int".to_string()],
            Some(true),
            Some(false),
        );
        let json = serde_json::to_value(&obj).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "table": "usp_report",
                "name": "@year",
                "object_type": "procedure_param",
                "types": ["int"],
                "nullable": true,
                "primary_key": false,
            })
        );
    }

    #[test]
    fn test_container_serializes_nulls() {
        let json = serde_json::to_value(MetadataObject::container(ObjectType::Collection, "users"))
            .unwrap();
        assert_eq!(json["nullable"], serde_json::Value::Null);
        assert_eq!(json["primary_key"], serde_json::Value::Null);
    }
}
