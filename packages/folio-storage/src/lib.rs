pub mod db;
pub mod entries;
pub mod models;
pub mod qdrant;
pub mod queries;
pub mod schema;
pub mod search;
pub mod tasks;
pub mod uploads;

mod error;

pub use error::Error;

pub type Result<T, E = Error> = std::result::Result<T, E>;
