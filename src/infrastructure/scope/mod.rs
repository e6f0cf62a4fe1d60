//! Request scopes and the registry that creates them

mod operations;
mod registry;
mod request_scope;

pub use operations::{extract_loader, load_many, load_one, prime, prime_page};
pub use registry::{LoaderRegistry, LoaderRegistryBuilder};
pub use request_scope::RequestScope;
