//! Entity sources that stand in for the remote data source

mod fixtures;
mod in_memory;

pub use fixtures::Fixtures;
pub use in_memory::InMemoryEntitySource;
