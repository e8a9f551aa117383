//! About page route handler.

use askama::Template;
use askama_web::WebTemplate;
use axum::{extract::State, response::IntoResponse};

use crate::error::Result;
use crate::filters;
use crate::middleware::{CspNonce, OptionalSession};
use crate::routes::layout::Layout;
use crate::state::AppState;

#[derive(Template, WebTemplate)]
#[template(path = "about.html")]
pub struct AboutTemplate {
    pub layout: Layout,
}

/// Display the about page.
pub async fn about(
    State(state): State<AppState>,
    nonce: CspNonce,
    OptionalSession(session): OptionalSession,
) -> Result<impl IntoResponse> {
    Ok(AboutTemplate {
        layout: Layout::new(&state, &nonce, &session.state),
    })
}
