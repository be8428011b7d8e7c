pub mod job;
pub mod quota;
