pub mod log_visit;
