//! Salon Core - Shared domain types.
//!
//! This crate provides the types shared by every salon account component:
//! - `server` - HTTP service for registration, login and admin approval
//! - `cli` - Operator commands for bootstrapping admins and resolving approvals
//!
//! # Architecture
//!
//! The core crate contains only types and pure functions - no I/O, no store
//! access, no HTTP clients. This keeps it lightweight and allows it to be used anywhere.
//!
//! # Modules
//!
//! - [`types`] - Email addresses, roles, OTP codes and collision-safe storage keys

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
