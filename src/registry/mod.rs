//! Name registry collaborator

pub mod registry;

pub use registry::{calls, id_hex, namehash, parse_name, NameId, NameRegistry, RegistryError};
