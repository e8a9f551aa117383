//! Integration tests for Alexandria.
//!
//! [`TestContext`] starts the backend and the web front-end on ephemeral
//! local ports, wired together the way the binaries are: the web server
//! resolves visitors from signed session cookies and calls the backend over
//! HTTP, forwarding the session token for verification.
//!
//! Session tokens are signed with the fixture key under
//! `crates/identity/src/testdata`; no identity provider instance is needed.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p alexandria-integration-tests
//! ```

#![allow(clippy::unwrap_used, clippy::missing_panics_doc)]

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use axum::Router;
use jsonwebtoken::jwk::JwkSet;
use jsonwebtoken::{Algorithm, EncodingKey, Header, encode};
use url::Url;

use alexandria_backend::{Backend, functions, routes as backend_routes};
use alexandria_identity::{
    ClerkIdentityProvider, JwksCache, SessionClaims, SessionCookies, SessionVerifier,
};
use alexandria_web::backend::HttpBackendClient;
use alexandria_web::{AppState, WebConfig};

/// Issuer matching [`PUBLISHABLE_KEY`].
pub const ISSUER: &str = "https://clerk.example.com";

/// Publishable key for `clerk.example.com`.
pub const PUBLISHABLE_KEY: &str = "pk_test_Y2xlcmsuZXhhbXBsZS5jb20k";

const KEY_ID: &str = "ins_test_key";
const SIGNING_KEY: &[u8] = include_bytes!(concat!(
    env!("CARGO_MANIFEST_DIR"),
    "/../identity/src/testdata/session_key.pem"
));
const JWKS: &str = include_str!(concat!(
    env!("CARGO_MANIFEST_DIR"),
    "/../identity/src/testdata/jwks.json"
));

/// Running backend and web servers.
pub struct TestContext {
    pub client: reqwest::Client,
    pub web_url: Url,
    pub backend_url: Url,
}

impl TestContext {
    /// Start both servers.
    pub async fn start() -> Self {
        let backend = Backend::new(functions::registry().unwrap(), Some(verifier()));
        let backend_addr = serve(backend_routes::app(backend)).await;
        let backend_url = Url::parse(&format!("http://{backend_addr}")).unwrap();

        let config = WebConfig::from_lookup(|name| match name {
            "ALEXANDRIA_BACKEND_URL" => Some(backend_url.to_string()),
            "CLERK_PUBLISHABLE_KEY" => Some(PUBLISHABLE_KEY.to_string()),
            _ => None,
        })
        .unwrap();
        let state = AppState::new(
            config,
            Arc::new(ClerkIdentityProvider::new(verifier(), None)),
            Arc::new(HttpBackendClient::new(backend_url.clone())),
        );
        let web_addr = serve(alexandria_web::app(state)).await;

        Self {
            client: reqwest::Client::new(),
            web_url: Url::parse(&format!("http://{web_addr}")).unwrap(),
            backend_url,
        }
    }

    /// URL of a web page.
    pub fn page(&self, path: &str) -> Url {
        self.web_url.join(path).unwrap()
    }

    /// URL of a backend endpoint.
    pub fn api(&self, path: &str) -> Url {
        self.backend_url.join(path).unwrap()
    }

    /// GET a page with the given cookie header.
    pub async fn get_page(&self, path: &str, cookies: Option<&str>) -> reqwest::Response {
        let mut request = self.client.get(self.page(path));
        if let Some(cookies) = cookies {
            request = request.header(reqwest::header::COOKIE, cookies);
        }
        request.send().await.unwrap()
    }
}

/// Verifier trusting the fixture key.
pub fn verifier() -> SessionVerifier {
    let keys: JwkSet = serde_json::from_str(JWKS).unwrap();
    SessionVerifier::new(ISSUER.to_owned(), JwksCache::fixed(keys), vec![])
}

pub fn now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_secs()
}

/// Claims for a session valid for the next minute.
pub fn claims(user_id: &str, first_name: Option<&str>, email: Option<&str>) -> SessionClaims {
    SessionClaims {
        sub: user_id.to_owned(),
        iss: ISSUER.to_owned(),
        exp: now() + 60,
        iat: Some(now()),
        nbf: Some(now() - 10),
        sid: Some("sess_2integration".to_owned()),
        azp: Some("http://localhost:3000".to_owned()),
        first_name: first_name.map(str::to_owned),
        email: email.map(str::to_owned),
    }
}

/// Sign `claims` with the fixture key.
pub fn sign(claims: &SessionClaims) -> String {
    let mut header = Header::new(Algorithm::RS256);
    header.kid = Some(KEY_ID.to_owned());
    let key = EncodingKey::from_rsa_pem(SIGNING_KEY).unwrap();
    encode(&header, claims, &key).unwrap()
}

/// Cookie header for a signed-in browser holding `token`.
pub fn session_cookies(token: &str) -> String {
    format!(
        "{}={token}; {}={}",
        SessionCookies::SESSION,
        SessionCookies::CLIENT_UAT,
        now() - 30
    )
}

/// Cookie header for a browser whose client session has no token yet.
pub fn pending_session_cookies() -> String {
    format!("{}={}", SessionCookies::CLIENT_UAT, now())
}

async fn serve(app: Router) -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}
