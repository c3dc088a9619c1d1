// Presentation layer - delivery surface of the binary
pub mod log_sink;
