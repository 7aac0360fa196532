pub mod generate;
pub mod hook;
pub mod properties;
