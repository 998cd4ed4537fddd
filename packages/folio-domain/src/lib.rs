pub mod entry;
pub mod page;
pub mod prepare;
pub mod query;
pub mod ris;
pub mod task;
pub mod year;
