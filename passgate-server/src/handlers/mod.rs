//! HTTP request handlers
//!
//! This module contains all the request handlers for the API endpoints.

pub mod health;
pub mod passkey;
pub mod session;

pub use crate::state::AppState;
pub use health::{health, ready, HealthResponse, ReadyResponse};
pub use passkey::{
    begin_login, begin_register, finish_login, finish_register, has_passkey,
    FinishCeremonyRequest, FinishLoginResponse, FinishRegisterResponse, HasPasskeyResponse,
    LoginUser, UsernameRequest,
};
pub use session::{current_session, SessionResponse};
