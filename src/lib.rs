pub mod config;
pub mod diagnostics;
pub mod errors;
pub mod reference;
pub mod report;
pub mod resolution;
pub mod tree;
pub mod types;
