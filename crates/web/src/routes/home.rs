//! Home page route handler.

use askama::Template;
use askama_web::WebTemplate;
use axum::{extract::State, response::IntoResponse};
use tracing::instrument;

use alexandria_core::User;

use crate::error::Result;
use crate::filters;
use crate::middleware::{CspNonce, OptionalSession};
use crate::routes::layout::Layout;
use crate::state::AppState;

/// Home page template.
#[derive(Template, WebTemplate)]
#[template(path = "home.html")]
pub struct HomeTemplate {
    pub layout: Layout,
    /// Set when a user is signed in.
    pub greeting: Option<String>,
}

/// Greeting for a signed-in user: first name, else first email.
#[must_use]
pub fn greeting(user: &User) -> String {
    user.display_name()
        .map_or_else(|| "Welcome!".to_string(), |name| format!("Welcome, {name}!"))
}

/// Display the home page.
#[instrument(skip_all)]
pub async fn home(
    State(state): State<AppState>,
    nonce: CspNonce,
    OptionalSession(session): OptionalSession,
) -> Result<impl IntoResponse> {
    Ok(HomeTemplate {
        layout: Layout::new(&state, &nonce, &session.state),
        greeting: session.state.user().map(greeting),
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use alexandria_core::{Email, EmailAddress, UserId};

    use super::*;

    fn user(first_name: Option<&str>, email: Option<&str>) -> User {
        User {
            id: UserId::parse("user_2abc").unwrap(),
            first_name: first_name.map(String::from),
            email_addresses: email
                .map(|e| EmailAddress::new(Email::parse(e).unwrap()))
                .into_iter()
                .collect(),
        }
    }

    #[test]
    fn test_greeting_uses_first_name() {
        assert_eq!(greeting(&user(Some("Ada"), Some("ada@example.com"))), "Welcome, Ada!");
    }

    #[test]
    fn test_greeting_falls_back_to_email() {
        assert_eq!(
            greeting(&user(None, Some("ada@example.com"))),
            "Welcome, ada@example.com!"
        );
    }

    #[test]
    fn test_greeting_without_name_or_email() {
        assert_eq!(greeting(&user(None, None)), "Welcome!");
    }
}
