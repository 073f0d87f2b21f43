//! Home and account pages

use axum::{
    Router,
    extract::State,
    middleware,
    response::Html,
    routing::get,
};
use minijinja::context;

use crate::AppState;
use crate::auth::{CurrentUser, MaybeUser, require_login};
use crate::error::AppError;
use crate::metrics::record_request;
use crate::views;

/// Create pages router
///
/// Routes:
/// - GET / - Home, with or without a signed-in user
/// - GET /account - Account details, behind the login gate
pub fn pages_router() -> Router<AppState> {
    let protected = Router::new()
        .route("/account", get(account))
        .route_layer(middleware::from_fn(require_login));

    Router::new().route("/", get(home)).merge(protected)
}

/// GET /
async fn home(
    State(state): State<AppState>,
    MaybeUser(user): MaybeUser,
) -> Result<Html<String>, AppError> {
    let name = user.as_ref().map(|user| user.profile.name().to_string());
    let page = state.views.render(
        views::HOME,
        context! { user => user.map(|user| user.profile), name },
    )?;
    record_request("GET", "/", 200);
    Ok(page)
}

/// GET /account
async fn account(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<Html<String>, AppError> {
    let page = state
        .views
        .render(views::ACCOUNT, context! { user => user.profile })?;
    record_request("GET", "/account", 200);
    Ok(page)
}
