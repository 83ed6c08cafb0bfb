use crate::config::AppState;
use crate::core::ctx::Ctx;
use crate::core::error::{Error, Result};
use axum::{
    extract::{Request, State},
    http::Method,
    middleware::Next,
    response::Response,
};
use tracing::{debug, warn};

/// Resolve the session cookie, if any, into a `Ctx` request extension.
///
/// Never rejects: routes that need a user sit behind `mw_require_auth`.
pub async fn mw_session(State(state): State<AppState>, mut req: Request, next: Next) -> Response {
    if let Some(token) = state.sessions.token_from_headers(req.headers()) {
        match state.sessions.load(&token).await {
            Ok(Some(session)) => {
                req.extensions_mut().insert(Ctx::new(session.token, session.user));
            }
            Ok(None) => debug!("[Session] Unknown or expired token"),
            Err(e) => warn!("[Session] Lookup failed: {}", e),
        }
    }

    next.run(req).await
}

pub async fn mw_require_auth(req: Request, next: Next) -> Result<Response> {
    debug!("MIDDLEWARE: require_auth");

    if req.extensions().get::<Ctx>().is_none() {
        return Err(if req.method() == Method::GET {
            Error::NotAuthenticated
        } else {
            Error::Unauthorized
        });
    }

    Ok(next.run(req).await)
}

pub async fn mw_require_admin(req: Request, next: Next) -> Result<Response> {
    debug!("MIDDLEWARE: require_admin");

    match req.extensions().get::<Ctx>() {
        Some(ctx) if ctx.is_admin() => Ok(next.run(req).await),
        Some(ctx) => {
            warn!("[Auth] User {} denied admin route {}", ctx.user_id(), req.uri());
            Err(Error::Forbidden)
        }
        None => Err(Error::NotAuthenticated),
    }
}
