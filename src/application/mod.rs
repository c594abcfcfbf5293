pub mod error;
pub mod reader;
pub mod repos;
pub mod resync;
pub mod writer;
