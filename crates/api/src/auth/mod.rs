//! Authentication primitives.
//!
//! Tokens are issued by the staff portal; this service only validates them.
//! [`jwt::generate_access_token`] exists for tooling and tests.

pub mod jwt;
