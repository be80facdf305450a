//! services/api/src/web/state.rs
//!
//! Defines the application's shared state.

use crate::config::Config;
use crate::web::token::TokenService;
use std::sync::Arc;
use study_helper_core::ports::{CompletionService, DatabaseService};

/// The shared application state, created once at startup and passed to all handlers.
///
/// Everything here is explicit constructor input - the signing secret, the
/// store connection, and the completion client are wired up in `main`, not
/// read from ambient globals.
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<dyn DatabaseService>,
    pub completion: Arc<dyn CompletionService>,
    pub tokens: TokenService,
    pub config: Arc<Config>,
}
