pub mod simulate;
pub mod std_types;
pub mod validate;
