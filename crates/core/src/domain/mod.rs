pub mod candidate;
pub mod task;
pub mod user;
