//! Directory domain module.
//!
//! Read models for the campus user directory: profiles, roles, and the
//! display-name rules used to label conversations.

mod profile;

pub use profile::{Profile, UserRole};
