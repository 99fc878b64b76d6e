//! `SeaORM` Entity prelude

pub use super::consumer::Entity as Consumer;
pub use super::consumer_environment::Entity as ConsumerEnvironment;
pub use super::content_override::Entity as ContentOverride;
pub use super::environment::Entity as Environment;
pub use super::owner::Entity as Owner;
