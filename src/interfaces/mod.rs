pub mod batch;
pub mod command;
pub mod csv;
pub mod report;
