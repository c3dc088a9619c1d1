// Domain layer - Pure data model, no I/O
pub mod channel;
pub mod series;
pub mod status;
