//! OpenAPI documentation configuration
//!
//! Generates OpenAPI 3.0 specification for the Passgate passkey API.

use utoipa::openapi::security::{Http, HttpAuthScheme, SecurityScheme};
use utoipa::{Modify, OpenApi};

use crate::handlers::{
    FinishCeremonyRequest, FinishLoginResponse, FinishRegisterResponse, HasPasskeyResponse,
    HealthResponse, LoginUser, ReadyResponse, SessionResponse, UsernameRequest,
};

/// Passgate passkey API - OpenAPI Documentation
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Passgate - Passkey API",
        version = "0.1.0",
        description = r#"
## Passwordless login for the school portal

Passgate runs the two WebAuthn ceremonies for existing portal users:

- **Registration** binds a new passkey to a user: `begin-register` returns
  creation options, `finish-register` verifies the attestation and stores the
  credential.
- **Login** proves possession of a registered passkey: `begin-login` returns
  request options, `finish-login` verifies the assertion, advances the sign
  counter and returns a session token.

Challenges are single use and expire after a few minutes. Any failed
verification is reported as `CEREMONY_FAILED`; start the ceremony again.
"#,
        license(name = "MIT OR Apache-2.0")
    ),
    servers(
        (url = "http://localhost:3000", description = "Local development server")
    ),
    tags(
        (name = "Passkey", description = "Passkey registration and login ceremonies"),
        (name = "Session", description = "Session tokens issued after login"),
        (name = "Health", description = "Service health and readiness endpoints")
    ),
    paths(
        crate::handlers::health::health,
        crate::handlers::health::ready,
        crate::handlers::passkey::begin_register,
        crate::handlers::passkey::finish_register,
        crate::handlers::passkey::begin_login,
        crate::handlers::passkey::finish_login,
        crate::handlers::passkey::has_passkey,
        crate::handlers::session::current_session,
    ),
    components(
        schemas(
            HealthResponse,
            ReadyResponse,
            UsernameRequest,
            FinishCeremonyRequest,
            FinishRegisterResponse,
            FinishLoginResponse,
            LoginUser,
            HasPasskeyResponse,
            SessionResponse,
        )
    ),
    modifiers(&BearerToken)
)]
pub struct ApiDoc;

/// Registers the `bearer_token` security scheme used by session endpoints
struct BearerToken;

impl Modify for BearerToken {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_token",
            SecurityScheme::Http(Http::new(HttpAuthScheme::Bearer)),
        );
    }
}
