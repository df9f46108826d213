pub mod error;
pub mod factory;
pub mod memory;
pub mod settings;
pub mod sql;
