//! Core Router
//!
//! Public auth pages, the authenticated app, and the admin area, wrapped in
//! the session resolver, request tracing, and security headers.

use crate::admin::handlers as admin_handlers;
use crate::catalog::handlers as catalog_handlers;
use crate::clients::handlers as client_handlers;
use crate::config::AppState;
use crate::core::auth::handlers as auth_handlers;
use crate::core::auth::middleware::{mw_require_admin, mw_require_auth, mw_session};
use crate::reports::handlers as report_handlers;
use crate::sales::handlers as sale_handlers;
use axum::{
    http::{header, HeaderValue},
    middleware::{from_fn, from_fn_with_state},
    routing::{get, post},
    Router,
};
use tower_http::{services::ServeDir, set_header::SetResponseHeaderLayer, trace::TraceLayer};

pub const CONTENT_SECURITY_POLICY: &str = "default-src 'self'; \
script-src 'self' 'unsafe-inline' https://cdn.jsdelivr.net https://cdnjs.cloudflare.com; \
style-src 'self' 'unsafe-inline' https://cdn.jsdelivr.net; \
font-src 'self' https://cdn.jsdelivr.net; \
img-src 'self' data: https:";

pub fn router(state: AppState) -> Router {
    let public = Router::new()
        .route("/", get(auth_handlers::root))
        .route(
            "/login",
            get(auth_handlers::login_page).post(auth_handlers::login),
        )
        .route(
            "/register",
            get(auth_handlers::register_page).post(auth_handlers::register),
        )
        .route("/logout", get(auth_handlers::logout))
        .route(
            "/forgot-password",
            get(auth_handlers::forgot_password_page).post(auth_handlers::forgot_password),
        )
        .route("/health", get(health_check));

    let app = Router::new()
        .route("/dashboard", get(report_handlers::dashboard))
        .route("/estatisticas", get(report_handlers::statistics))
        // Products
        .route("/produtos", get(catalog_handlers::list_produtos))
        .route(
            "/produtos/criar",
            get(catalog_handlers::new_produto_page).post(catalog_handlers::create_produto),
        )
        .route(
            "/produtos/alterar/{id}",
            get(catalog_handlers::edit_produto_page).post(catalog_handlers::update_produto),
        )
        .route(
            "/produtos/excluir/{id}",
            post(catalog_handlers::delete_produto),
        )
        // Clients
        .route("/clientes", get(client_handlers::list_clientes))
        .route(
            "/clientes/criar",
            get(client_handlers::new_cliente_page).post(client_handlers::create_cliente),
        )
        .route(
            "/clientes/alterar/{id}",
            get(client_handlers::edit_cliente_page).post(client_handlers::update_cliente),
        )
        .route(
            "/clientes/excluir/{id}",
            post(client_handlers::delete_cliente),
        )
        // Sales
        .route("/vendas", get(sale_handlers::sale_form))
        .route("/vendas/criar", post(sale_handlers::create_sale))
        .route("/vendas/{id}", get(sale_handlers::sale_detail))
        .route_layer(from_fn(mw_require_auth));

    let admin = Router::new()
        .route(
            "/admin/usuarios",
            get(admin_handlers::list_usuarios).post(admin_handlers::create_usuario),
        )
        .route("/admin/usuarios/novo", get(admin_handlers::new_usuario_page))
        .route(
            "/admin/usuarios/{id}/editar",
            get(admin_handlers::edit_usuario_page),
        )
        .route("/admin/usuarios/{id}", post(admin_handlers::update_usuario))
        .route(
            "/admin/usuarios/{id}/excluir",
            post(admin_handlers::delete_usuario),
        )
        .route(
            "/relatorios/auditoria",
            get(report_handlers::audit_report),
        )
        .route_layer(from_fn(mw_require_admin))
        .route_layer(from_fn(mw_require_auth));

    let public_dir = state.config.public_dir.clone();

    Router::new()
        .merge(public)
        .merge(app)
        .merge(admin)
        .fallback_service(ServeDir::new(public_dir))
        .layer(from_fn_with_state(state.clone(), mw_session))
        .layer(TraceLayer::new_for_http())
        .layer(SetResponseHeaderLayer::if_not_present(
            header::CONTENT_SECURITY_POLICY,
            HeaderValue::from_static(CONTENT_SECURITY_POLICY),
        ))
        .layer(SetResponseHeaderLayer::if_not_present(
            header::X_CONTENT_TYPE_OPTIONS,
            HeaderValue::from_static("nosniff"),
        ))
        .layer(SetResponseHeaderLayer::if_not_present(
            header::X_FRAME_OPTIONS,
            HeaderValue::from_static("SAMEORIGIN"),
        ))
        .layer(SetResponseHeaderLayer::if_not_present(
            header::REFERRER_POLICY,
            HeaderValue::from_static("no-referrer"),
        ))
        .with_state(state)
}

async fn health_check() -> &'static str {
    "OK"
}
