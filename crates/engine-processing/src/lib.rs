pub mod converter;
pub mod error;
pub mod producer;
