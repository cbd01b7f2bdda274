//! Domain layer for Values Guard
//!
//! Architecture: Domain Model - Pure logic for data value validation
//! - Contains the value tree, paths, locations, violations and reports
//! - Independent of file systems, YAML parsing or terminal output
//! - Expresses the ubiquitous language of schemas, rules and violations

pub mod values;
pub mod violations;

// Re-export main domain types for convenience
pub use values::*;
pub use violations::*;
