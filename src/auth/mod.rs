//! Authentication and authorization for Pasture
//!
//! Provides:
//! - JWT token generation and validation
//! - Password hashing with Argon2
//! - Visibility rules for reflections and herds

pub mod jwt;
pub mod password;
pub mod visibility;

pub use jwt::{extract_token_from_header, Claims, JwtValidator, TokenValidationResult};
pub use password::{hash_password, verify_password};
pub use visibility::{
    can_view_reflection, check_herd_member, check_herd_owner, check_member_removal,
    check_reflection_owner, check_view_reflection, OwnerAction,
};
