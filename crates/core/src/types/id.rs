//! Newtype IDs for identity-provider object references.
//!
//! The identity provider hands out opaque string IDs with a per-object prefix
//! (`user_`, `sess_`, `idn_`). Use the `define_id!` macro to create wrappers
//! that check the prefix and keep IDs of different objects from being mixed.

use thiserror::Error;

/// Errors that can occur when parsing a provider ID.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum IdError {
    /// The input string is empty.
    #[error("{kind} cannot be empty")]
    Empty {
        /// Name of the ID type.
        kind: &'static str,
    },
    /// The input does not carry the expected prefix.
    #[error("{kind} must start with '{prefix}'")]
    WrongPrefix {
        /// Name of the ID type.
        kind: &'static str,
        /// Expected prefix.
        prefix: &'static str,
    },
}

/// Macro to define a prefixed, string-backed ID wrapper.
///
/// Creates a newtype wrapper around `String` with:
/// - `Serialize`/`Deserialize` with `#[serde(transparent)]`
/// - `Debug`, `Clone`, `PartialEq`, `Eq`, `Hash`
/// - `parse()` which checks the prefix, `as_str()`, `Display`
///
/// # Example
///
/// ```rust
/// # use alexandria_core::define_id;
/// define_id!(OrgId, "org_");
///
/// assert!(OrgId::parse("org_2abc").is_ok());
/// assert!(OrgId::parse("user_2abc").is_err());
/// ```
#[macro_export]
macro_rules! define_id {
    ($name:ident, $prefix:literal) => {
        #[derive(
            Debug,
            Clone,
            PartialEq,
            Eq,
            Hash,
            ::serde::Serialize,
            ::serde::Deserialize
        )]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Prefix every ID of this kind starts with.
            pub const PREFIX: &'static str = $prefix;

            /// Parse an ID, checking its prefix.
            ///
            /// # Errors
            ///
            /// Returns an error if the input is empty or lacks the prefix.
            pub fn parse(s: &str) -> ::core::result::Result<Self, $crate::types::id::IdError> {
                if s.is_empty() {
                    return Err($crate::types::id::IdError::Empty {
                        kind: stringify!($name),
                    });
                }
                if !s.starts_with($prefix) {
                    return Err($crate::types::id::IdError::WrongPrefix {
                        kind: stringify!($name),
                        prefix: $prefix,
                    });
                }
                Ok(Self(s.to_owned()))
            }

            /// Returns the ID as a string slice.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl ::core::fmt::Display for $name {
            fn fmt(&self, f: &mut ::core::fmt::Formatter<'_>) -> ::core::fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl ::core::str::FromStr for $name {
            type Err = $crate::types::id::IdError;

            fn from_str(s: &str) -> ::core::result::Result<Self, Self::Err> {
                Self::parse(s)
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

define_id!(UserId, "user_");
define_id!(SessionId, "sess_");
define_id!(EmailAddressId, "idn_");
