//! Dashboard route handlers.
//!
//! The page itself renders one of three views depending on identity state.
//! Signed-in users also get the mutation endpoint and a live feed of the
//! example query.

use std::convert::Infallible;

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{
        IntoResponse, Redirect, Response,
        sse::{Event, KeepAlive, Sse},
    },
};
use futures::{Stream, StreamExt};
use tracing::instrument;

use alexandria_core::{CreateExampleArgs, IdentityState};

use crate::backend::api;
use crate::error::Result;
use crate::filters;
use crate::middleware::{CspNonce, CurrentSession, RequireUser};
use crate::routes::home::greeting;
use crate::routes::layout::Layout;
use crate::state::AppState;

/// Header set by the client script on background requests.
const REQUESTED_WITH: &str = "x-requested-with";

/// SSE event name for example query updates.
pub const EXAMPLE_EVENT: &str = "example";

/// What the dashboard shows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DashboardView {
    /// Identity not resolved yet; the client script reloads once it is.
    Loading,
    /// Nobody signed in.
    AccessDenied,
    Authenticated(DashboardData),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DashboardData {
    pub greeting: String,
    /// `message` of `example:getExample`, once the query has answered.
    pub example: Option<String>,
}

impl DashboardView {
    #[must_use]
    pub const fn is_loading(&self) -> bool {
        matches!(self, Self::Loading)
    }
}

/// Dashboard page template.
#[derive(Template, WebTemplate)]
#[template(path = "dashboard.html")]
pub struct DashboardTemplate {
    pub layout: Layout,
    pub view: DashboardView,
    /// Label of the mutation button.
    pub mutation_label: &'static str,
}

/// Display the dashboard.
#[instrument(skip_all)]
pub async fn dashboard(
    State(state): State<AppState>,
    nonce: CspNonce,
    CurrentSession(session): CurrentSession,
) -> Result<impl IntoResponse> {
    let view = match &session.state {
        IdentityState::Loading => DashboardView::Loading,
        IdentityState::SignedOut => DashboardView::AccessDenied,
        IdentityState::SignedIn(user) => {
            let example = match api::get_example(state.backend(), session.token()).await {
                Ok(example) => Some(example.message),
                Err(e) => {
                    tracing::warn!(error = %e, "Example query failed");
                    None
                }
            };
            DashboardView::Authenticated(DashboardData {
                greeting: greeting(user),
                example,
            })
        }
    };

    Ok(DashboardTemplate {
        layout: Layout::new(&state, &nonce, &session.state),
        view,
        mutation_label: "Test Convex Mutation",
    })
}

/// Run the example mutation for the signed-in user.
///
/// Failures are logged, never surfaced. Script-driven requests get a 204;
/// plain form posts are redirected back to the dashboard.
#[instrument(skip_all, fields(user_id = %user.user.id))]
pub async fn create_example(
    State(state): State<AppState>,
    headers: HeaderMap,
    user: RequireUser,
) -> Response {
    let args = CreateExampleArgs::dashboard();
    match api::create_example(state.backend(), user.token.as_deref(), &args).await {
        Ok(result) => tracing::info!(text = %result.text, "Example mutation succeeded"),
        Err(e) => tracing::warn!(error = %e, "Example mutation failed"),
    }

    if headers.contains_key(REQUESTED_WITH) {
        StatusCode::NO_CONTENT.into_response()
    } else {
        Redirect::to("/dashboard").into_response()
    }
}

/// Stream the live `example:getExample` result as server-sent events.
#[instrument(skip_all, fields(user_id = %user.user.id))]
pub async fn updates(
    State(state): State<AppState>,
    user: RequireUser,
) -> Result<Sse<impl Stream<Item = std::result::Result<Event, Infallible>>>> {
    let examples = api::subscribe_example(state.backend(), user.token.as_deref()).await?;

    let events = examples.filter_map(|example| async move {
        match example {
            Ok(example) => Some(Ok(Event::default()
                .event(EXAMPLE_EVENT)
                .data(example.message))),
            Err(e) => {
                tracing::warn!(error = %e, "Example subscription update failed");
                None
            }
        }
    });

    Ok(Sse::new(events).keep_alive(KeepAlive::default()))
}
