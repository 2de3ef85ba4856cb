// Route table for the dashboard API.

use axum::{
    routing::{get, post, put},
    Router,
};

use super::app_state::AppState;
use super::handlers::{disputes, metrics, offers, profiles, reviews, sales};

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .nest("/api", api_routes())
        .with_state(state)
}

async fn health() -> &'static str {
    "ok"
}

fn api_routes() -> Router<AppState> {
    Router::new()
        // Offers
        .route("/offers", get(offers::search_offers).post(offers::submit_offer))
        .route("/offers/admin", get(offers::list_offers))
        .route(
            "/offers/:id",
            put(offers::update_offer).delete(offers::delete_offer),
        )
        .route("/offers/:id/approve", post(offers::approve_offer))
        .route("/offers/:id/reject", post(offers::reject_offer))
        .route("/offers/:id/pause", post(offers::pause_offer))
        .route("/offers/:id/toggle", post(offers::toggle_offer))
        .route("/offers/:id/interest", post(offers::register_interest))
        .route("/offers/:id/reviews", get(offers::offer_reviews))
        // Sale reports
        .route(
            "/sales",
            get(sales::list_sale_reports).post(sales::submit_sale_report),
        )
        .route("/sales/:id/approve", post(sales::approve_sale_report))
        .route("/sales/:id/reject", post(sales::reject_sale_report))
        // Reviews
        .route("/reviews", post(reviews::submit_review))
        .route("/reviews/pending", get(reviews::pending_reviews))
        .route("/reviews/:id/approve", post(reviews::approve_review))
        .route("/reviews/:id/reject", post(reviews::reject_review))
        // Profiles
        .route(
            "/profiles",
            get(profiles::list_profiles).post(profiles::register_profile),
        )
        .route("/profiles/me", get(profiles::my_profile))
        .route("/profiles/:id/approve", post(profiles::approve_profile))
        .route("/profiles/:id/role", put(profiles::set_role))
        .route("/profiles/:id/status", put(profiles::set_account_status))
        .route("/profiles/:id/stats", get(metrics::seller_stats))
        // Disputes
        .route(
            "/disputes",
            get(disputes::list_disputes).post(disputes::open_dispute),
        )
        .route("/disputes/:id", get(disputes::dispute_thread))
        .route("/disputes/:id/messages", post(disputes::post_message))
        .route("/disputes/:id/resolve", post(disputes::resolve_dispute))
        // Metrics
        .route("/metrics", get(metrics::metrics_snapshot))
}
