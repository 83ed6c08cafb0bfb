//! Customer pages

use crate::clients::{self, ClienteForm};
use crate::config::AppState;
use crate::core::audit::{self, AuditAction};
use crate::core::ctx::Ctx;
use crate::core::error::{is_foreign_key_violation, is_unique_violation, Error, Result};
use crate::templates::{render, ClienteFormTemplate, ClientesTemplate};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{Html, IntoResponse, Redirect, Response},
    Form,
};
use tracing::{info, warn};

const NOT_FOUND: &str = "Cliente não encontrado";
const DUPLICATE: &str = "CPF/CNPJ já cadastrado.";

/// GET /clientes
pub async fn list_clientes(State(state): State<AppState>, ctx: Ctx) -> Result<Html<String>> {
    info!("GET /clientes");

    let clientes = clients::list(&state.pool)
        .await
        .map_err(Error::db("Erro ao buscar clientes"))?;

    render(&ClientesTemplate {
        user: ctx.user().clone(),
        clientes,
    })
}

/// GET /clientes/criar
pub async fn new_cliente_page(ctx: Ctx) -> Result<Html<String>> {
    render(&form_page(&ctx, None, ClienteForm::default(), None))
}

/// POST /clientes/criar
pub async fn create_cliente(
    State(state): State<AppState>,
    ctx: Ctx,
    Form(form): Form<ClienteForm>,
) -> Result<Response> {
    info!("POST /clientes/criar - {}", form.nome);

    let cliente = match form.validate() {
        Ok(cliente) => cliente,
        Err(message) => return invalid_form(&ctx, None, form, message),
    };

    let id = match clients::create(&state.pool, &cliente).await {
        Ok(id) => id,
        Err(e) if is_unique_violation(&e) => {
            return invalid_form(&ctx, None, form, DUPLICATE.to_string())
        }
        Err(e) => return Err(Error::db("Erro ao cadastrar cliente")(e)),
    };

    audit::record(
        &state.pool,
        Some(ctx.user_id()),
        AuditAction::Insert,
        "Cliente",
        Some(id),
        &format!("Cliente cadastrado: {}", cliente.nome),
    )
    .await;

    Ok(Redirect::to("/clientes").into_response())
}

/// GET /clientes/alterar/{id}
pub async fn edit_cliente_page(
    State(state): State<AppState>,
    ctx: Ctx,
    Path(id): Path<i64>,
) -> Result<Html<String>> {
    let cliente = clients::get(&state.pool, id)
        .await
        .map_err(Error::db("Erro ao buscar cliente"))?
        .ok_or_else(|| Error::NotFound(NOT_FOUND.to_string()))?;

    render(&form_page(
        &ctx,
        Some(id),
        ClienteForm::from_cliente(&cliente),
        None,
    ))
}

/// POST /clientes/alterar/{id}
pub async fn update_cliente(
    State(state): State<AppState>,
    ctx: Ctx,
    Path(id): Path<i64>,
    Form(form): Form<ClienteForm>,
) -> Result<Response> {
    info!("POST /clientes/alterar/{}", id);

    let cliente = match form.validate() {
        Ok(cliente) => cliente,
        Err(message) => return invalid_form(&ctx, Some(id), form, message),
    };

    let updated = match clients::update(&state.pool, id, &cliente).await {
        Ok(updated) => updated,
        Err(e) if is_unique_violation(&e) => {
            return invalid_form(&ctx, Some(id), form, DUPLICATE.to_string())
        }
        Err(e) => return Err(Error::db("Erro ao atualizar cliente")(e)),
    };
    if !updated {
        return Err(Error::NotFound(NOT_FOUND.to_string()));
    }

    audit::record(
        &state.pool,
        Some(ctx.user_id()),
        AuditAction::Update,
        "Cliente",
        Some(id),
        &format!("Cliente alterado: {}", cliente.nome),
    )
    .await;

    Ok(Redirect::to("/clientes").into_response())
}

/// POST /clientes/excluir/{id}
pub async fn delete_cliente(
    State(state): State<AppState>,
    ctx: Ctx,
    Path(id): Path<i64>,
) -> Result<Response> {
    info!("POST /clientes/excluir/{}", id);

    let deleted = match clients::delete(&state.pool, id).await {
        Ok(deleted) => deleted,
        Err(e) if is_foreign_key_violation(&e) => {
            warn!("Client {} has sales, not deleted", id);
            return Err(Error::BadRequest(
                "Cliente possui vendas registradas e não pode ser excluído.".to_string(),
            ));
        }
        Err(e) => return Err(Error::db("Erro ao excluir cliente")(e)),
    };
    if !deleted {
        return Err(Error::NotFound(NOT_FOUND.to_string()));
    }

    audit::record(
        &state.pool,
        Some(ctx.user_id()),
        AuditAction::Delete,
        "Cliente",
        Some(id),
        &format!("Cliente excluído: {}", id),
    )
    .await;

    Ok(Redirect::to("/clientes").into_response())
}

fn form_page(
    ctx: &Ctx,
    id: Option<i64>,
    form: ClienteForm,
    error: Option<String>,
) -> ClienteFormTemplate {
    let (title, action) = match id {
        Some(id) => ("Alterar Cliente".to_string(), format!("/clientes/alterar/{}", id)),
        None => ("Novo Cliente".to_string(), "/clientes/criar".to_string()),
    };
    ClienteFormTemplate {
        user: ctx.user().clone(),
        title,
        action,
        form,
        error,
    }
}

fn invalid_form(
    ctx: &Ctx,
    id: Option<i64>,
    form: ClienteForm,
    message: String,
) -> Result<Response> {
    let page = render(&form_page(ctx, id, form, Some(message)))?;
    Ok((StatusCode::BAD_REQUEST, page).into_response())
}
