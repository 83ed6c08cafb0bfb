//! Login, registration and logout pages

use crate::config::AppState;
use crate::core::audit::{self, AuditAction};
use crate::core::auth::{AuthError, NewAccount};
use crate::core::ctx::Ctx;
use crate::core::error::Result;
use crate::core::forms::non_empty;
use crate::models::Role;
use crate::templates::{render, LoginTemplate, RegisterTemplate};
use axum::{
    extract::State,
    http::header,
    response::{Html, IntoResponse, Redirect, Response},
    Form,
};
use serde::Deserialize;
use tracing::{error, info, warn};

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    #[serde(default)]
    pub nome: String,
    #[serde(default)]
    pub cpf: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub telefone: String,
    #[serde(default)]
    pub usuario: String,
    #[serde(default)]
    pub senha: String,
    #[serde(default, rename = "confirmarSenha")]
    pub confirmar_senha: String,
}

/// GET /
pub async fn root(ctx: Option<Ctx>) -> Redirect {
    if ctx.is_some() {
        Redirect::to("/dashboard")
    } else {
        Redirect::to("/login")
    }
}

/// GET /login
pub async fn login_page(ctx: Option<Ctx>) -> Result<Response> {
    if ctx.is_some() {
        return Ok(Redirect::to("/dashboard").into_response());
    }
    Ok(render(&LoginTemplate { error: None })?.into_response())
}

/// POST /login
pub async fn login(State(state): State<AppState>, Form(req): Form<LoginRequest>) -> Result<Response> {
    info!("POST /login - {}", req.username);

    let username = req.username.trim();
    let user = match state.auth.login(username, &req.password).await {
        Ok(user) => user,
        Err(e @ (AuthError::UserNotFound | AuthError::WrongPassword)) => {
            warn!("Login failed for {}: {}", username, e);
            return login_error(e.to_string());
        }
        Err(e) => {
            error!("Login error for {}: {}", username, e);
            return login_error("Erro interno ao fazer login.".to_string());
        }
    };

    let session = match state.sessions.create(&user).await {
        Ok(session) => session,
        Err(e) => {
            error!("Could not start session for {}: {}", username, e);
            return login_error("Erro interno ao fazer login.".to_string());
        }
    };

    audit::record(
        &state.pool,
        Some(user.id),
        AuditAction::Login,
        "Usuarios",
        Some(user.id),
        &format!("Login de {}", user.nome_usuario),
    )
    .await;

    info!("User {} logged in successfully", user.nome_usuario);
    Ok((
        [(header::SET_COOKIE, state.sessions.set_cookie(&session))],
        Redirect::to("/dashboard"),
    )
        .into_response())
}

fn login_error(message: String) -> Result<Response> {
    Ok(render(&LoginTemplate {
        error: Some(message),
    })?
    .into_response())
}

/// GET /register
pub async fn register_page() -> Result<Html<String>> {
    render(&RegisterTemplate { error: None })
}

/// POST /register
pub async fn register(
    State(state): State<AppState>,
    Form(req): Form<RegisterRequest>,
) -> Result<Response> {
    info!("POST /register - {}", req.usuario);

    let (Some(nome), Some(usuario)) = (non_empty(&req.nome), non_empty(&req.usuario)) else {
        return register_error("Preencha todos os campos obrigatórios.");
    };
    if req.senha.is_empty() || req.confirmar_senha.is_empty() {
        return register_error("Preencha todos os campos obrigatórios.");
    }
    if req.senha != req.confirmar_senha {
        return register_error("As senhas não coincidem.");
    }

    let account = NewAccount {
        nome,
        cpf: non_empty(&req.cpf),
        email: non_empty(&req.email),
        telefone: non_empty(&req.telefone),
        nome_usuario: usuario,
        senha: req.senha,
        role: Role::User,
        ativo: true,
    };

    match state.auth.create_account(&account).await {
        Ok(id) => {
            audit::record(
                &state.pool,
                Some(id),
                AuditAction::Insert,
                "Usuarios",
                Some(id),
                &format!("Cadastro de {}", account.nome_usuario),
            )
            .await;
            Ok(Redirect::to("/login").into_response())
        }
        Err(AuthError::Duplicate) => register_error("Usuário ou CPF já cadastrado."),
        Err(e) => {
            error!("Signup failed for {}: {}", account.nome_usuario, e);
            register_error("Erro no registro. Tente novamente.")
        }
    }
}

fn register_error(message: &str) -> Result<Response> {
    Ok(render(&RegisterTemplate {
        error: Some(message.to_string()),
    })?
    .into_response())
}

/// GET /logout
pub async fn logout(State(state): State<AppState>, ctx: Option<Ctx>) -> Result<Response> {
    info!("GET /logout");

    if let Some(ctx) = ctx {
        // The cookie is cleared below even if the row could not be removed.
        if let Err(e) = state.sessions.destroy(ctx.token()).await {
            warn!("[Session] Could not destroy session of user {}: {}", ctx.user_id(), e);
        }

        audit::record(
            &state.pool,
            Some(ctx.user_id()),
            AuditAction::Logout,
            "Usuarios",
            Some(ctx.user_id()),
            &format!("Logout de {}", ctx.user().nome_usuario),
        )
        .await;
    }

    Ok((
        [(header::SET_COOKIE, state.sessions.clear_cookie())],
        Redirect::to("/login"),
    )
        .into_response())
}
