//! Domain DTOs for the auth API.
//!
//! # Design
//! `User`, `Role` and `Token` are decoded from loosely-typed JSON with
//! `from_payload`, which names the offending field when a required one is
//! missing or has the wrong shape, and encoded back with `to_payload` using
//! the snake_case wire keys. Timestamps are emitted as `YYYY-MM-DD HH:MM:SS`
//! and left out entirely when absent. Their serde impls route through the
//! same pair of functions.

mod payload;
mod requests;
mod role;
mod token;
mod user;

pub use payload::{format_timestamp, parse_timestamp, TIMESTAMP_FORMAT};
pub use requests::{NewRole, Page, ProfileUpdate, RegisterUser, RoleUpdate};
pub use role::Role;
pub use token::Token;
pub use user::User;
