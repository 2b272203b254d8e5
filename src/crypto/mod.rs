//! Credential handling for the EduShare API
//!
//! - Bearer tokens: HS256 JWTs carrying the user id
//! - Passwords: Argon2id PHC strings, hashed off the async runtime

pub mod password;
pub mod token;

pub use password::PasswordHashing;
pub use token::{Claims, TokenError, TokenIssuer};
