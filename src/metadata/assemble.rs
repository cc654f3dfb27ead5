//! Final merge/validation step for strategy output.
//!
//! Pure: no network or disk access. Strategies hand their flat object
//! sequence here; anything violating the output contract is a scanner bug
//! and is rejected rather than surfaced to downstream consumers.

use std::collections::HashSet;

use crate::error::AssemblyError;
use crate::metadata::{MetadataObject, ScanResult};
use crate::source::SourceFamily;

/// Build a [`ScanResult`], enforcing the output contract.
///
/// Checks, in sequence order:
/// - every object kind belongs to `family`'s vocabulary;
/// - every member references a container emitted earlier (matched on the
///   member's `table` against container names).
///
/// Member order within a container is preserved exactly as the strategy
/// emitted it.
pub fn assemble(
    family: SourceFamily,
    objects: Vec<MetadataObject>,
) -> Result<ScanResult, AssemblyError> {
    {
        let mut containers: HashSet<&str> = HashSet::new();
        for obj in &objects {
            if !obj.object_type.belongs_to(family) {
                return Err(AssemblyError::ForeignKind {
                    kind: obj.object_type.to_string(),
                    family: family.to_string(),
                });
            }
            if obj.is_container() {
                containers.insert(obj.name.as_str());
            } else if !containers.contains(obj.table.as_str()) {
                return Err(AssemblyError::OrphanedMember {
                    name: obj.name.clone(),
                    container: obj.table.clone(),
                });
            }
        }
    }
    Ok(ScanResult {
        source_type: family,
        objects,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::ObjectType;

    fn table(name: &str) -> MetadataObject {
        MetadataObject::container(ObjectType::Table, name)
    }

    fn column(table: &str, name: &str) -> MetadataObject {
        MetadataObject::member(
            ObjectType::TableColumn,
            table,
            name,
            vec!["INTEGER".to_string()],
            Some(true),
            Some(false),
        )
    }

    #[test]
    fn test_empty_result_is_valid() {
        let result = assemble(SourceFamily::Sql, Vec::new()).unwrap();
        assert_eq!(result.source_type(), SourceFamily::Sql);
        assert_eq!(result.object_count(), 0);
    }

    #[test]
    fn test_container_before_member_accepted() {
        let result = assemble(
            SourceFamily::Sql,
            vec![table("orders"), column("orders", "id"), column("orders", "total")],
        )
        .unwrap();
        assert_eq!(result.object_count(), 3);
        assert_eq!(result.containers().count(), 1);
        assert_eq!(result.members().count(), 2);
    }

    #[test]
    fn test_member_before_container_rejected() {
        let err = assemble(
            SourceFamily::Sql,
            vec![column("orders", "id"), table("orders")],
        )
        .unwrap_err();
        assert!(matches!(err, AssemblyError::OrphanedMember { .. }));
    }

    #[test]
    fn test_member_with_unknown_container_rejected() {
        let err = assemble(
            SourceFamily::Sql,
            vec![table("orders"), column("customers", "id")],
        )
        .unwrap_err();
        match err {
            AssemblyError::OrphanedMember { name, container } => {
                assert_eq!(name, "id");
                assert_eq!(container, "customers");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_foreign_kind_rejected() {
        let err = assemble(
            SourceFamily::Mongo,
            vec![table("orders"), column("orders", "id")],
        )
        .unwrap_err();
        assert!(matches!(err, AssemblyError::ForeignKind { .. }));
    }

    #[test]
    fn test_container_without_members_accepted() {
        let result = assemble(
            SourceFamily::Mongo,
            vec![MetadataObject::container(ObjectType::Collection, "events")],
        )
        .unwrap();
        assert_eq!(result.object_count(), 1);
    }

    #[test]
    fn test_members_may_follow_later_sibling_container() {
        // Container order and member order are independent as long as each
        // member's container was seen first.
        let result = assemble(
            SourceFamily::Sql,
            vec![
                table("a"),
                table("b"),
                column("a", "x"),
                column("b", "y"),
            ],
        )
        .unwrap();
        assert_eq!(result.object_count(), 4);
    }
}
