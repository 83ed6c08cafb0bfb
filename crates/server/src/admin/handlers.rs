//! Admin user pages

use crate::admin::{self, UsuarioForm};
use crate::config::AppState;
use crate::core::audit::{self, AuditAction};
use crate::core::auth::AuthError;
use crate::core::ctx::Ctx;
use crate::core::error::{is_foreign_key_violation, is_unique_violation, Error, Result};
use crate::templates::{render, AdminUsuarioFormTemplate, AdminUsuariosTemplate};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{Html, IntoResponse, Redirect, Response},
    Form,
};
use tracing::{error, info, warn};

const NOT_FOUND: &str = "Usuário não encontrado";
const DUPLICATE: &str = "Usuário ou CPF já cadastrado.";

/// GET /admin/usuarios
pub async fn list_usuarios(State(state): State<AppState>, ctx: Ctx) -> Result<Html<String>> {
    info!("GET /admin/usuarios");
    list_page(&state, &ctx, None).await
}

async fn list_page(state: &AppState, ctx: &Ctx, error: Option<String>) -> Result<Html<String>> {
    let usuarios = admin::list(&state.pool)
        .await
        .map_err(Error::db("Erro ao buscar usuários"))?;

    render(&AdminUsuariosTemplate {
        user: ctx.user().clone(),
        usuarios,
        error,
    })
}

/// GET /admin/usuarios/novo
pub async fn new_usuario_page(ctx: Ctx) -> Result<Html<String>> {
    render(&form_page(&ctx, None, UsuarioForm::blank(), None))
}

/// POST /admin/usuarios
pub async fn create_usuario(
    State(state): State<AppState>,
    ctx: Ctx,
    Form(form): Form<UsuarioForm>,
) -> Result<Response> {
    info!("POST /admin/usuarios - {}", form.nome_usuario);

    let account = match form.to_new_account() {
        Ok(account) => account,
        Err(message) => return form_error(&ctx, None, form, message, StatusCode::BAD_REQUEST),
    };

    let id = match state.auth.create_account(&account).await {
        Ok(id) => id,
        Err(AuthError::Duplicate) => {
            return form_error(&ctx, None, form, DUPLICATE.to_string(), StatusCode::BAD_REQUEST)
        }
        Err(e) => {
            error!("Admin could not create {}: {}", account.nome_usuario, e);
            return form_error(
                &ctx,
                None,
                form,
                "Erro ao criar usuário.".to_string(),
                StatusCode::INTERNAL_SERVER_ERROR,
            );
        }
    };

    audit::record(
        &state.pool,
        Some(ctx.user_id()),
        AuditAction::Insert,
        "Usuarios",
        Some(id),
        &format!(
            "Usuário criado: {} ({})",
            account.nome_usuario,
            account.role.as_str()
        ),
    )
    .await;

    Ok(Redirect::to("/admin/usuarios").into_response())
}

/// GET /admin/usuarios/{id}/editar
pub async fn edit_usuario_page(
    State(state): State<AppState>,
    ctx: Ctx,
    Path(id): Path<i64>,
) -> Result<Html<String>> {
    info!("GET /admin/usuarios/{}/editar", id);

    let usuario = admin::get(&state.pool, id)
        .await
        .map_err(Error::db("Erro ao buscar usuário"))?
        .ok_or_else(|| Error::NotFound(NOT_FOUND.to_string()))?;

    render(&form_page(
        &ctx,
        Some(id),
        UsuarioForm::from_usuario(&usuario),
        None,
    ))
}

/// POST /admin/usuarios/{id}
pub async fn update_usuario(
    State(state): State<AppState>,
    ctx: Ctx,
    Path(id): Path<i64>,
    Form(form): Form<UsuarioForm>,
) -> Result<Response> {
    info!("POST /admin/usuarios/{}", id);

    let update = match form.to_update() {
        Ok(update) => update,
        Err(message) => return form_error(&ctx, Some(id), form, message, StatusCode::BAD_REQUEST),
    };

    // Hash before writing so a failure leaves the account untouched.
    let senha_hash = match &update.nova_senha {
        Some(senha) => match state.auth.hash_password(senha).await {
            Ok(hash) => Some(hash),
            Err(e) => {
                error!("Admin could not hash new password of user {}: {}", id, e);
                return form_error(
                    &ctx,
                    Some(id),
                    form,
                    "Erro ao atualizar usuário.".to_string(),
                    StatusCode::INTERNAL_SERVER_ERROR,
                );
            }
        },
        None => None,
    };

    let updated = match admin::update(&state.pool, id, &update, senha_hash.as_deref()).await {
        Ok(updated) => updated,
        Err(e) if is_unique_violation(&e) => {
            return form_error(&ctx, Some(id), form, DUPLICATE.to_string(), StatusCode::BAD_REQUEST)
        }
        Err(e) => {
            error!("Admin could not update user {}: {}", id, e);
            return form_error(
                &ctx,
                Some(id),
                form,
                "Erro ao atualizar usuário.".to_string(),
                StatusCode::INTERNAL_SERVER_ERROR,
            );
        }
    };
    if !updated {
        return Err(Error::NotFound(NOT_FOUND.to_string()));
    }

    // Sessions carry a copy of name and role.
    if let Err(e) = state.sessions.destroy_for_user(id).await {
        warn!("Could not drop sessions of user {}: {}", id, e);
    }

    let senha_msg = if update.nova_senha.is_some() {
        ", senha alterada"
    } else {
        ""
    };
    audit::record(
        &state.pool,
        Some(ctx.user_id()),
        AuditAction::Update,
        "Usuarios",
        Some(id),
        &format!("Usuário alterado: {}{}", update.nome_usuario, senha_msg),
    )
    .await;

    Ok(Redirect::to("/admin/usuarios").into_response())
}

/// POST /admin/usuarios/{id}/excluir
pub async fn delete_usuario(
    State(state): State<AppState>,
    ctx: Ctx,
    Path(id): Path<i64>,
) -> Result<Response> {
    info!("POST /admin/usuarios/{}/excluir", id);

    if id == ctx.user_id() {
        warn!("Admin {} tried to delete their own account", id);
        let page = list_page(
            &state,
            &ctx,
            Some("Você não pode excluir a própria conta.".to_string()),
        )
        .await?;
        return Ok((StatusCode::BAD_REQUEST, page).into_response());
    }

    let deleted = match admin::delete(&state.pool, id).await {
        Ok(deleted) => deleted,
        Err(e) if is_foreign_key_violation(&e) => {
            let page = list_page(
                &state,
                &ctx,
                Some("Usuário possui vendas registradas e não pode ser excluído.".to_string()),
            )
            .await?;
            return Ok((StatusCode::BAD_REQUEST, page).into_response());
        }
        Err(e) => {
            error!("Admin could not delete user {}: {}", id, e);
            return Err(Error::Internal("Erro ao excluir usuário".to_string()));
        }
    };
    if !deleted {
        return Err(Error::NotFound(NOT_FOUND.to_string()));
    }

    if let Err(e) = state.sessions.destroy_for_user(id).await {
        warn!("Could not drop sessions of user {}: {}", id, e);
    }

    audit::record(
        &state.pool,
        Some(ctx.user_id()),
        AuditAction::Delete,
        "Usuarios",
        Some(id),
        &format!("Usuário excluído: {}", id),
    )
    .await;

    Ok(Redirect::to("/admin/usuarios").into_response())
}

fn form_page(
    ctx: &Ctx,
    id: Option<i64>,
    form: UsuarioForm,
    error: Option<String>,
) -> AdminUsuarioFormTemplate {
    let (title, action, is_new) = match id {
        Some(id) => (
            "Editar Usuário".to_string(),
            format!("/admin/usuarios/{}", id),
            false,
        ),
        None => ("Novo Usuário".to_string(), "/admin/usuarios".to_string(), true),
    };
    AdminUsuarioFormTemplate {
        user: ctx.user().clone(),
        title,
        action,
        is_new,
        form,
        error,
    }
}

fn form_error(
    ctx: &Ctx,
    id: Option<i64>,
    form: UsuarioForm,
    message: String,
    status: StatusCode,
) -> Result<Response> {
    let page = render(&form_page(ctx, id, form, Some(message)))?;
    Ok((status, page).into_response())
}
