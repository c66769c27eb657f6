pub mod admin;
pub mod agents;
pub mod api;
pub mod intent;
pub mod speech;
