pub mod analyzer;
pub mod config;
pub mod errors;
pub mod extraction;
pub mod graph;
pub mod report;
pub mod resolution;
pub mod syntax;
pub mod traversal;
pub mod types;
