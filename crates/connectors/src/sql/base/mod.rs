pub mod connection;
pub mod row;
