/// Declaration arena and identity index.
pub mod table;

/// Caller/callee and dead-code queries over a linked table.
pub mod queries;

pub use queries::GraphQueries;
pub use table::DeclarationTable;
