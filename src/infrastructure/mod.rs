//! Infrastructure layer - Loader machinery, scopes and entity sources

pub mod loader;
pub mod logging;
pub mod observability;
pub mod scope;
pub mod source;
