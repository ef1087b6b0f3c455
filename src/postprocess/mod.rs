pub mod keys;
pub mod numerics;

pub use keys::{camel_case_keys, to_camel_case};
pub use numerics::{coerce_numerics, parse_numeric};
