//! Product pages

use crate::catalog::{self, ProdutoForm};
use crate::config::AppState;
use crate::core::audit::{self, AuditAction};
use crate::core::ctx::Ctx;
use crate::core::error::{is_foreign_key_violation, Error, Result};
use crate::templates::{render, ProdutoFormTemplate, ProdutosTemplate};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{Html, IntoResponse, Redirect, Response},
    Form,
};
use tracing::{info, warn};

const NOT_FOUND: &str = "Produto não encontrado";

/// GET /produtos
pub async fn list_produtos(State(state): State<AppState>, ctx: Ctx) -> Result<Html<String>> {
    info!("GET /produtos");

    let produtos = catalog::list(&state.pool)
        .await
        .map_err(Error::db("Erro ao buscar produtos"))?;

    render(&ProdutosTemplate {
        user: ctx.user().clone(),
        produtos,
    })
}

/// GET /produtos/criar
pub async fn new_produto_page(ctx: Ctx) -> Result<Html<String>> {
    render(&form_page(&ctx, None, ProdutoForm::blank(), None))
}

/// POST /produtos/criar
pub async fn create_produto(
    State(state): State<AppState>,
    ctx: Ctx,
    Form(form): Form<ProdutoForm>,
) -> Result<Response> {
    info!("POST /produtos/criar - {}", form.nome_produto);

    let produto = match form.validate() {
        Ok(produto) => produto,
        Err(message) => return invalid_form(&ctx, None, form, message),
    };

    let id = catalog::create(&state.pool, &produto)
        .await
        .map_err(Error::db("Erro ao cadastrar produto"))?;

    audit::record(
        &state.pool,
        Some(ctx.user_id()),
        AuditAction::Insert,
        "Produto",
        Some(id),
        &format!("Produto cadastrado: {}", produto.nome),
    )
    .await;

    Ok(Redirect::to("/produtos").into_response())
}

/// GET /produtos/alterar/{id}
pub async fn edit_produto_page(
    State(state): State<AppState>,
    ctx: Ctx,
    Path(id): Path<i64>,
) -> Result<Html<String>> {
    info!("GET /produtos/alterar/{}", id);

    let produto = catalog::get(&state.pool, id)
        .await
        .map_err(Error::db("Erro ao buscar produto"))?
        .ok_or_else(|| Error::NotFound(NOT_FOUND.to_string()))?;

    render(&form_page(
        &ctx,
        Some(id),
        ProdutoForm::from_produto(&produto),
        None,
    ))
}

/// POST /produtos/alterar/{id}
pub async fn update_produto(
    State(state): State<AppState>,
    ctx: Ctx,
    Path(id): Path<i64>,
    Form(form): Form<ProdutoForm>,
) -> Result<Response> {
    info!("POST /produtos/alterar/{}", id);

    let produto = match form.validate() {
        Ok(produto) => produto,
        Err(message) => return invalid_form(&ctx, Some(id), form, message),
    };

    let updated = catalog::update(&state.pool, id, &produto)
        .await
        .map_err(Error::db("Erro ao atualizar produto"))?;
    if !updated {
        return Err(Error::NotFound(NOT_FOUND.to_string()));
    }

    audit::record(
        &state.pool,
        Some(ctx.user_id()),
        AuditAction::Update,
        "Produto",
        Some(id),
        &format!("Produto alterado: {}", produto.nome),
    )
    .await;

    Ok(Redirect::to("/produtos").into_response())
}

/// POST /produtos/excluir/{id}
pub async fn delete_produto(
    State(state): State<AppState>,
    ctx: Ctx,
    Path(id): Path<i64>,
) -> Result<Response> {
    info!("POST /produtos/excluir/{}", id);

    let deleted = match catalog::delete(&state.pool, id).await {
        Ok(deleted) => deleted,
        Err(e) if is_foreign_key_violation(&e) => {
            warn!("Product {} is referenced by sales, not deleted", id);
            return Err(Error::BadRequest(
                "Produto possui vendas registradas e não pode ser excluído.".to_string(),
            ));
        }
        Err(e) => return Err(Error::db("Erro ao excluir produto")(e)),
    };
    if !deleted {
        return Err(Error::NotFound(NOT_FOUND.to_string()));
    }

    audit::record(
        &state.pool,
        Some(ctx.user_id()),
        AuditAction::Delete,
        "Produto",
        Some(id),
        &format!("Produto excluído: {}", id),
    )
    .await;

    Ok(Redirect::to("/produtos").into_response())
}

fn form_page(
    ctx: &Ctx,
    id: Option<i64>,
    form: ProdutoForm,
    error: Option<String>,
) -> ProdutoFormTemplate {
    let (title, action) = match id {
        Some(id) => ("Alterar Produto".to_string(), format!("/produtos/alterar/{}", id)),
        None => ("Novo Produto".to_string(), "/produtos/criar".to_string()),
    };
    ProdutoFormTemplate {
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
    form: ProdutoForm,
    message: String,
) -> Result<Response> {
    let page = render(&form_page(ctx, id, form, Some(message)))?;
    Ok((StatusCode::BAD_REQUEST, page).into_response())
}
