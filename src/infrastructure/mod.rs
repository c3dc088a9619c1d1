// Infrastructure layer - External dependencies and adapters
pub mod config;
pub mod control_client;
pub mod decoder;
pub mod ws_client;
