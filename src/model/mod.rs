pub mod employee;
pub mod material;
pub mod role;
pub mod supervisor;
pub mod time_record;
