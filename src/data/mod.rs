//! Catalog data: file schema, loading and search

mod catalog;
mod loader;
mod search;

pub use catalog::*;
pub use loader::*;
pub use search::*;
