//! `gatehouse-core` — directory foundation building blocks.
//!
//! This crate contains **pure** primitives shared by the engine and its
//! stores (no IO).

pub mod entity;
pub mod error;
pub mod id;
pub mod status;

pub use entity::Entity;
pub use error::DomainError;
pub use id::{BranchId, MenuId, PermissionId, RoleId, TenantId, UserId};
pub use status::{Lifecycle, RecordStatus};
