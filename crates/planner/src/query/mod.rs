pub mod dialect;
pub mod error;
pub mod lexer;
pub mod locator;
pub mod placeholders;
pub mod statement;
