//! Domain services used by the auth controller and HTTP routes.
//!
//! ARCHITECTURE
//! ============
//! Service modules own business logic and persistence concerns so route
//! handlers can stay focused on protocol translation and cookie plumbing.

pub mod profile;
pub mod schedule;
pub mod session;
