// Dashboard layer - the HTTP API the web front-end talks to.
// Handlers only parse requests and shape responses; every rule lives in core.

#[path = "app_state.rs"]
pub mod app_state;

#[path = "api_response.rs"]
pub mod api_response;

#[path = "actor.rs"]
pub mod actor;

#[path = "handlers/handler_catalog.rs"]
pub mod handlers;

#[path = "routes.rs"]
pub mod routes;

pub use app_state::AppState;
pub use routes::router;
