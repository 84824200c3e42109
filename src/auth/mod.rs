//! Authentication
//!
//! Handles:
//! - Password hashing (Argon2id)
//! - Access token minting and verification (JWT)
//! - The bearer-token extractor for protected routes

mod middleware;
pub mod password;
pub mod token;

pub use middleware::CurrentUser;
pub use token::{Claims, mint_token, verify_token};
