// Core moderation module - keyword policy and enforcement.
// Following the same pattern as the other core modules.

pub mod moderation_models;
pub mod moderation_service;
pub mod policy;

pub use moderation_models::*;
pub use moderation_service::*;
pub use policy::*;
