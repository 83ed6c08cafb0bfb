//! Sale pages

use crate::config::AppState;
use crate::core::ctx::Ctx;
use crate::core::error::{Error, Result};
use crate::sales::{self, SaleRequest};
use crate::templates::{render, VendaDetalheTemplate, VendasTemplate};
use axum::{
    extract::{Path, State},
    response::{Html, IntoResponse, Redirect, Response},
    Form,
};
use tracing::info;

/// GET /vendas
pub async fn sale_form(State(state): State<AppState>, ctx: Ctx) -> Result<Html<String>> {
    info!("GET /vendas");

    let data = sales::form_data(&state.pool)
        .await
        .map_err(Error::db("Erro ao carregar dados da venda"))?;

    render(&VendasTemplate {
        user: ctx.user().clone(),
        clientes: data.clientes,
        produtos: data.produtos,
        formas_pagamento: data.formas_pagamento,
    })
}

/// POST /vendas/criar
pub async fn create_sale(
    State(state): State<AppState>,
    ctx: Ctx,
    Form(pairs): Form<Vec<(String, String)>>,
) -> Result<Response> {
    info!("POST /vendas/criar - user {}", ctx.user_id());

    let outcome = match SaleRequest::from_form(&pairs) {
        Ok(request) => sales::create_sale(&state.pool, ctx.user_id(), &request).await,
        Err(e) => Err(e),
    };

    match outcome {
        Ok(_) => Ok(Redirect::to("/dashboard").into_response()),
        Err(e) if e.is_client_error() => {
            Err(Error::BadRequest(format!("Erro ao finalizar a venda: {}", e)))
        }
        Err(e) => Err(Error::Internal(format!("Erro ao finalizar a venda: {}", e))),
    }
}

/// GET /vendas/{id}
pub async fn sale_detail(
    State(state): State<AppState>,
    ctx: Ctx,
    Path(id): Path<i64>,
) -> Result<Html<String>> {
    info!("GET /vendas/{}", id);

    let (venda, itens) = sales::get_sale(&state.pool, id, ctx.sales_scope())
        .await
        .map_err(Error::db("Erro ao buscar venda"))?
        .ok_or_else(|| Error::NotFound("Venda não encontrada".to_string()))?;

    render(&VendaDetalheTemplate {
        user: ctx.user().clone(),
        venda,
        itens,
    })
}
