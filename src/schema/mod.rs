pub mod aliases;
pub mod spec;

pub use aliases::normalize_key;
pub use spec::{EntitySpec, PropSpec, PropertySet, SchemaSpec, OTHERS_ENTITY};
