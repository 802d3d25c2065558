pub mod builder;
pub mod driver;
