//! Identity state as seen by the rendering layer.

use serde::{Deserialize, Serialize};

use super::email::EmailAddress;
use super::id::UserId;

/// A signed-in user's profile.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct User {
    /// Provider user ID.
    pub id: UserId,
    /// First name, if the user has set one.
    #[serde(default)]
    pub first_name: Option<String>,
    /// Registered email addresses, in provider order.
    #[serde(default)]
    pub email_addresses: Vec<EmailAddress>,
}

impl User {
    /// Name to greet the user by.
    ///
    /// The first name when set and non-empty, otherwise the first registered
    /// email address. `None` if the user has neither.
    #[must_use]
    pub fn display_name(&self) -> Option<&str> {
        self.first_name
            .as_deref()
            .filter(|name| !name.is_empty())
            .or_else(|| {
                self.email_addresses
                    .first()
                    .map(|address| address.email_address.as_str())
            })
    }
}

/// The identity provider's view of the current visitor.
///
/// `Loading` means the provider cannot answer yet: the visitor holds a client
/// session but no usable session token, so the browser has to refresh it
/// before the server can tell who they are.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum IdentityState {
    /// Identity not yet resolved.
    Loading,
    /// Resolved, nobody signed in.
    #[default]
    SignedOut,
    /// Resolved to a signed-in user.
    SignedIn(User),
}

impl IdentityState {
    /// Whether the provider has resolved the visitor.
    #[must_use]
    pub const fn is_loaded(&self) -> bool {
        !matches!(self, Self::Loading)
    }

    /// Whether a user is signed in.
    #[must_use]
    pub const fn is_signed_in(&self) -> bool {
        matches!(self, Self::SignedIn(_))
    }

    /// The signed-in user, if any.
    #[must_use]
    pub const fn user(&self) -> Option<&User> {
        match self {
            Self::SignedIn(user) => Some(user),
            Self::Loading | Self::SignedOut => None,
        }
    }
}
