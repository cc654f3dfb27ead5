//! # Metascan
//!
//! A metadata scanning engine for heterogeneous data sources.
//!
//! ## Architecture
//!
//! One invocation flows top to bottom: normalize the caller's source-type
//! spelling, dispatch to the matching scanning strategy, assemble the flat
//! object sequence into a result.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │       Caller (type spelling + connection string)         │
//! └─────────────────────────────────────────────────────────┘
//!                          │
//!                          ▼ [source::normalize]
//! ┌─────────────────────────────────────────────────────────┐
//! │            SourceDescriptor (canonical type)             │
//! └─────────────────────────────────────────────────────────┘
//!                          │
//!                          ▼ [scan::ScannerRegistry]
//! ┌─────────────────────────────────────────────────────────┐
//! │    Scanning strategy, one per family:                    │
//! │    sql::RelationalScanner (catalog introspection)        │
//! │    document::DocumentScanner (sampling)                  │
//! │    file::FileScanner (bounded-prefix inference)          │
//! └─────────────────────────────────────────────────────────┘
//!                          │
//!                          ▼ [metadata::assemble]
//! ┌─────────────────────────────────────────────────────────┐
//! │      ScanResult (ordered MetadataObject sequence)        │
//! └─────────────────────────────────────────────────────────┘
//!                          │
//!                          ▼ downstream collaborators
//! ┌─────────────────────────────────────────────────────────┐
//! │    store::ScanStore (persist, export)                    │
//! │    pii::annotate (name-pattern findings)                 │
//! └─────────────────────────────────────────────────────────┘
//! ```

pub mod artifacts;
pub mod config;
pub mod document;
pub mod error;
pub mod file;
pub mod metadata;
pub mod pii;
pub mod scan;
pub mod source;
pub mod sql;
pub mod store;

/// Re-exports for convenient usage.
pub mod prelude {
    pub use crate::error::ScanError;
    pub use crate::metadata::{assemble, MetadataObject, ObjectType, ScanResult};
    pub use crate::scan::{scan, test_connection, ScanRequest, ScannerRegistry};
    pub use crate::source::{normalize, SourceDescriptor, SourceFamily, SourceType};
}

// Also export the invocation surface at crate root for convenience
pub use error::ScanError;
pub use metadata::{MetadataObject, ObjectType, ScanResult};
pub use scan::{scan, test_connection, ScanRequest, ScannerRegistry};
pub use source::{normalize, SourceDescriptor, SourceFamily, SourceType};
