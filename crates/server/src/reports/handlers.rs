//! Report pages

use crate::clients;
use crate::config::AppState;
use crate::core::audit::{self, AuditFilter};
use crate::core::ctx::Ctx;
use crate::core::error::{Error, Result};
use crate::reports::{self, RECENT_SALES_LIMIT, TOP_PRODUCTS_LIMIT};
use crate::templates::{render, AuditoriaTemplate, DashboardTemplate, EstatisticasTemplate};
use axum::{
    extract::{Query, State},
    response::Html,
};
use tracing::info;

/// GET /dashboard
pub async fn dashboard(State(state): State<AppState>, ctx: Ctx) -> Result<Html<String>> {
    info!("GET /dashboard - {}", ctx.user().nome_usuario);

    let scope = ctx.sales_scope();
    let summary = reports::sales_summary(&state.pool, scope)
        .await
        .map_err(Error::db("Erro ao carregar o painel"))?;
    let vendas = reports::recent_sales(&state.pool, scope, RECENT_SALES_LIMIT)
        .await
        .map_err(Error::db("Erro ao carregar o painel"))?;
    let total_clientes = clients::count(&state.pool)
        .await
        .map_err(Error::db("Erro ao carregar o painel"))?;
    let estoque_baixo = reports::low_stock_count(&state.pool)
        .await
        .map_err(Error::db("Erro ao carregar o painel"))?;

    render(&DashboardTemplate {
        user: ctx.user().clone(),
        is_admin: ctx.is_admin(),
        total_vendas: summary.total_vendas,
        total_valor: summary.total_valor,
        total_clientes,
        estoque_baixo,
        vendas,
    })
}

/// GET /estatisticas
pub async fn statistics(State(state): State<AppState>, ctx: Ctx) -> Result<Html<String>> {
    info!("GET /estatisticas");

    let scope = ctx.sales_scope();
    let summary = reports::sales_summary(&state.pool, scope)
        .await
        .map_err(Error::db("Erro ao carregar estatísticas"))?;
    let top_produtos = reports::top_products(&state.pool, scope, TOP_PRODUCTS_LIMIT)
        .await
        .map_err(Error::db("Erro ao carregar estatísticas"))?;

    render(&EstatisticasTemplate {
        user: ctx.user().clone(),
        total_vendas: summary.total_vendas,
        total_valor: summary.total_valor,
        ticket_medio: summary.ticket_medio(),
        top_produtos,
    })
}

/// GET /relatorios/auditoria
pub async fn audit_report(
    State(state): State<AppState>,
    ctx: Ctx,
    Query(filtro): Query<AuditFilter>,
) -> Result<Html<String>> {
    info!("GET /relatorios/auditoria");

    let entries = audit::list(&state.pool, &filtro)
        .await
        .map_err(Error::db("Erro ao carregar auditoria"))?;
    let tabelas = audit::tables(&state.pool)
        .await
        .map_err(Error::db("Erro ao carregar auditoria"))?;

    render(&AuditoriaTemplate {
        user: ctx.user().clone(),
        entries,
        tabelas,
        filtro,
    })
}
