//! # Gatewayエンドポイント

pub mod health;
pub mod writes3;

pub use health::handle_health;
pub use writes3::handle_writes3;
