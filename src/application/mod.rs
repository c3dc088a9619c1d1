// Application layer - Use cases and trait seams
pub mod control_api;
pub mod render_sink;
pub mod status_service;
pub mod sync_service;
