//! Kernel utilities shared by the namespace engine and the CLI.
//! Keep this crate lightweight: id generation and config loading only.
//!
//! ## ID generation
//! Entry ids use `safe_nanoid!`: URL-safe, unambiguous and valid as blob keys.
//! ```rust
//! # use loft_kernel::safe_nanoid;
//! let id = safe_nanoid!();
//! assert_eq!(id.len(), 21);
//! ```
//!
//! ## Config loading
//! ```rust,no_run
//! use loft_kernel::config::load_config;
//! use loft_kernel::domain::config::LoftConfig;
//!
//! let cfg: LoftConfig = load_config(Some("loft.toml")).unwrap();
//! ```
pub mod config;

/// Default entry id length. Long enough to keep collisions out of reach for
/// namespaces with billions of entries.
pub const ID_LENGTH: usize = 21;

// Alphabet excludes visually ambiguous characters (I, O, l, 0, 1).
pub const SAFE_ALPHABET: &[char; 55] = &[
    '2', '3', '4', '5', '6', '7', '8', '9', 'A', 'B', 'C', 'D', 'E', 'F', 'G', 'H', 'J', 'K', 'L',
    'M', 'N', 'P', 'Q', 'R', 'S', 'T', 'U', 'V', 'W', 'X', 'Y', 'Z', 'a', 'b', 'c', 'd', 'e', 'f',
    'g', 'h', 'j', 'k', 'm', 'n', 'p', 'q', 'r', 's', 't', 'u', 'v', 'w', 'x', 'y', 'z',
];

pub use loft_domain as domain;

/// An unambiguous `NanoID` of `size` characters.
#[must_use]
pub fn safe_id(size: usize) -> String {
    nanoid::format(nanoid::rngs::default, SAFE_ALPHABET, size)
}

/// Generates an unambiguous `NanoID` (no visually confusing characters).
#[macro_export]
macro_rules! safe_nanoid {
    () => {
        $crate::safe_id($crate::ID_LENGTH)
    };
    ($size:expr) => {
        $crate::safe_id($size)
    };
}
