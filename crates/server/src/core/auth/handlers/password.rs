//! Self-service password reset

use crate::config::AppState;
use crate::core::audit::{self, AuditAction};
use crate::core::auth::AuthError;
use crate::core::error::Result;
use crate::templates::{render, ForgotPasswordTemplate};
use axum::{extract::State, response::Html, Form};
use serde::Deserialize;
use tracing::{error, info, warn};

#[derive(Debug, Deserialize)]
pub struct ForgotPasswordRequest {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub email: String,
    #[serde(default, rename = "newPassword")]
    pub new_password: String,
}

/// GET /forgot-password
pub async fn forgot_password_page() -> Result<Html<String>> {
    render(&ForgotPasswordTemplate {
        error: None,
        message: None,
    })
}

/// POST /forgot-password
pub async fn forgot_password(
    State(state): State<AppState>,
    Form(req): Form<ForgotPasswordRequest>,
) -> Result<Html<String>> {
    info!("POST /forgot-password - {}", req.username);

    let username = req.username.trim();
    let email = req.email.trim();
    if username.is_empty() || email.is_empty() || req.new_password.is_empty() {
        return page(Some("Preencha todos os campos"), None);
    }

    match state
        .auth
        .reset_password(username, email, &req.new_password)
        .await
    {
        Ok(id) => {
            if let Err(e) = state.sessions.destroy_for_user(id).await {
                warn!("Could not drop sessions of user {}: {}", id, e);
            }
            audit::record(
                &state.pool,
                Some(id),
                AuditAction::Update,
                "Usuarios",
                Some(id),
                "Senha redefinida",
            )
            .await;
            page(None, Some("Senha alterada com sucesso!"))
        }
        Err(AuthError::UserNotFound) => page(Some("Usuário não encontrado"), None),
        Err(e) => {
            error!("Password reset failed for {}: {}", username, e);
            page(Some("Erro ao alterar senha."), None)
        }
    }
}

fn page(error: Option<&str>, message: Option<&str>) -> Result<Html<String>> {
    render(&ForgotPasswordTemplate {
        error: error.map(str::to_string),
        message: message.map(str::to_string),
    })
}
