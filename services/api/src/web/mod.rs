pub mod ai;
pub mod auth;
pub mod error;
pub mod history;
pub mod middleware;
pub mod protocol;
pub mod ratelimit;
pub mod rest;
pub mod state;
pub mod token;

// Re-export the pieces the binary needs to assemble the router.
pub use middleware::require_auth;
pub use ratelimit::{throttle, RateLimiter};
pub use rest::{health_handler, root_handler, ApiDoc};
pub use state::AppState;
pub use token::TokenService;
