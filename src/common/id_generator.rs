// src/common/id_generator.rs
//! Crockford Base32 ID Generator
//!
//! Generates human-readable, prefixed IDs using Crockford Base32 encoding.
//! Format: PREFIX_XXXXXX (e.g., P_K7NP3X for plans)
//!
//! The alphabet excludes I, L, O, U so ids can be read aloud or typed
//! without ambiguity.

use rand::Rng;

/// Crockford Base32 alphabet (excludes I, L, O, U to avoid confusion)
const CROCKFORD_ALPHABET: &[u8; 32] = b"0123456789ABCDEFGHJKMNPQRSTVWXYZ";

/// Entity type prefixes for ID generation
#[derive(Debug, Clone, Copy)]
pub enum EntityPrefix {
    /// User (U_)
    User,
    /// Plan (P_)
    Plan,
    /// Refresh or password reset token row (K_) - K for Key
    Token,
}

impl EntityPrefix {
    /// Get the string prefix for this entity type
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityPrefix::User => "U",
            EntityPrefix::Plan => "P",
            EntityPrefix::Token => "K",
        }
    }
}

fn generate_crockford_string(length: usize) -> String {
    let mut rng = rand::thread_rng();
    (0..length)
        .map(|_| {
            let idx = rng.gen_range(0..32);
            CROCKFORD_ALPHABET[idx] as char
        })
        .collect()
}

/// Generate a prefixed ID using Crockford Base32 encoding
///
/// ```ignore
/// let plan_id = generate_id(EntityPrefix::Plan);
/// // Returns something like "P_K7NP3X"
/// ```
pub fn generate_id(prefix: EntityPrefix) -> String {
    format!("{}_{}", prefix.as_str(), generate_crockford_string(6))
}

// ============================================================================
// Convenience functions for each entity type
// ============================================================================

/// Generate a User ID (U_XXXXXX)
pub fn generate_user_id() -> String {
    generate_id(EntityPrefix::User)
}

/// Generate a Plan ID (P_XXXXXX)
pub fn generate_plan_id() -> String {
    generate_id(EntityPrefix::Plan)
}

/// Generate a Token ID (K_XXXXXX)
pub fn generate_token_id() -> String {
    generate_id(EntityPrefix::Token)
}
