pub mod employee;
pub mod material;
pub mod report;
pub mod supervisor;
pub mod time_record;
