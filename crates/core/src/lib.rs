//! `erpdesk-core`: domain foundation building blocks.
//!
//! This crate contains **pure domain** primitives (no IO, no transport):
//! identifiers, the domain error model and the field validation rules shared
//! by every form of the admin client.

pub mod entity;
pub mod error;
pub mod id;
pub mod validation;

pub use entity::Entity;
pub use error::{DomainError, DomainResult};
pub use id::UserId;
pub use validation::{Field, FieldErrors, FormMode, LoginInput, UserFormInput};
