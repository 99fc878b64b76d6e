//! `SeaORM` Entity definitions

pub mod prelude;

pub mod consumer;
pub mod consumer_environment;
pub mod content_override;
pub mod environment;
pub mod owner;
