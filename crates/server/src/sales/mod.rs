//! Sales (`Venda` / `ItemVenda`)
//!
//! A sale is written in one transaction: header, items, stock decrement and
//! the audit row either all land or none do.

pub mod handlers;
pub mod pricing;

use chrono::{Local, Utc};
use sqlx::{Sqlite, SqlitePool, Transaction};
use thiserror::Error;
use tracing::{info, warn};

use crate::catalog;
use crate::clients;
use crate::core::audit::{self, AuditAction};
use crate::core::error::{is_foreign_key_violation, is_unique_violation};
use crate::core::forms::{non_empty, parse_decimal, parse_id};
use crate::models::{Cliente, FormaPagamento, ItemVendaDetalhe, Produto, VendaDetalhe};
use pricing::{normalize_discount, SaleLine, SaleTotals};

pub const STATUS_CONCLUIDA: &str = "Concluída";

/// Attempts at finding a free `NumeroPedido` after a unique clash.
const ORDER_NUMBER_ATTEMPTS: i64 = 5;

#[derive(Debug, Error)]
pub enum SaleError {
    #[error("{0}")]
    Invalid(String),
    #[error("produto {0} não encontrado ou inativo")]
    ProductUnavailable(i64),
    #[error("estoque insuficiente para {0}")]
    InsufficientStock(String),
    #[error("{0}")]
    Database(#[from] sqlx::Error),
}

impl SaleError {
    /// Whether the failure was caused by the submitted data.
    pub fn is_client_error(&self) -> bool {
        !matches!(self, SaleError::Database(_))
    }
}

/// A sale as submitted by the sale form
#[derive(Debug, Clone, PartialEq)]
pub struct SaleRequest {
    pub cliente_id: i64,
    pub forma_pagamento_id: i64,
    pub desconto_percentual: f64,
    pub observacoes: Option<String>,
    /// `(ProdutoID, quantidade)` in form order
    pub itens: Vec<(i64, f64)>,
}

impl SaleRequest {
    /// Parse urlencoded pairs. `produtos` and `quantidades` are repeated
    /// fields matched by position; the `[]` suffix is accepted.
    pub fn from_form(pairs: &[(String, String)]) -> Result<Self, SaleError> {
        let mut cliente_id = None;
        let mut forma_pagamento_id = None;
        let mut desconto = String::new();
        let mut observacoes = String::new();
        let mut produtos = Vec::new();
        let mut quantidades = Vec::new();

        for (key, value) in pairs {
            match key.trim_end_matches("[]") {
                "clienteId" => cliente_id = parse_id(value),
                "formaPagamentoId" => forma_pagamento_id = parse_id(value),
                "desconto" => desconto = value.clone(),
                "observacoes" => observacoes = value.clone(),
                "produtos" => produtos.push(value.as_str()),
                "quantidades" => quantidades.push(value.as_str()),
                _ => {}
            }
        }

        let cliente_id = cliente_id.ok_or_else(|| invalid("selecione um cliente"))?;
        let forma_pagamento_id =
            forma_pagamento_id.ok_or_else(|| invalid("selecione a forma de pagamento"))?;

        if produtos.is_empty() {
            return Err(invalid("adicione ao menos um produto"));
        }
        if produtos.len() != quantidades.len() {
            return Err(invalid("produtos e quantidades não conferem"));
        }

        let mut itens = Vec::with_capacity(produtos.len());
        for (produto, quantidade) in produtos.iter().zip(&quantidades) {
            let produto_id = parse_id(produto).ok_or_else(|| invalid("produto inválido"))?;
            let quantidade = parse_decimal(quantidade)
                .filter(|q| *q > 0.0)
                .ok_or_else(|| invalid("quantidade deve ser maior que zero"))?;
            itens.push((produto_id, quantidade));
        }

        Ok(Self {
            cliente_id,
            forma_pagamento_id,
            desconto_percentual: normalize_discount(&desconto),
            observacoes: non_empty(&observacoes),
            itens,
        })
    }
}

fn invalid(message: &str) -> SaleError {
    SaleError::Invalid(message.to_string())
}

/// A committed sale
#[derive(Debug, Clone)]
pub struct CreatedSale {
    pub id: i64,
    pub numero_pedido: String,
    pub totals: SaleTotals,
}

/// Record a sale for `user_id`, rolling back everything on failure.
pub async fn create_sale(
    pool: &SqlitePool,
    user_id: i64,
    request: &SaleRequest,
) -> Result<CreatedSale, SaleError> {
    // Take the write lock up front: a deferred transaction that reads
    // `Produto` first cannot upgrade once another sale has committed.
    let mut tx = pool.begin_with("BEGIN IMMEDIATE").await?;

    match write_sale(&mut tx, user_id, request).await {
        Ok(sale) => {
            tx.commit().await?;
            info!(
                "[Sales] {} recorded by user {}: {:.2}",
                sale.numero_pedido, user_id, sale.totals.valor_liquido
            );
            Ok(sale)
        }
        Err(e) => {
            if let Err(rollback) = tx.rollback().await {
                warn!("[Sales] Rollback failed: {}", rollback);
            }
            warn!("[Sales] Sale by user {} aborted: {}", user_id, e);
            Err(e)
        }
    }
}

async fn write_sale(
    tx: &mut Transaction<'_, Sqlite>,
    user_id: i64,
    request: &SaleRequest,
) -> Result<CreatedSale, SaleError> {
    let mut lines = Vec::with_capacity(request.itens.len());
    let mut nomes = Vec::with_capacity(request.itens.len());

    for &(produto_id, quantidade) in &request.itens {
        let row: Option<(String, f64)> =
            sqlx::query_as("SELECT Nome, PrecoVenda FROM Produto WHERE ProdutoID = ? AND Ativo = 1")
                .bind(produto_id)
                .fetch_optional(&mut **tx)
                .await?;
        let (nome, preco) = row.ok_or(SaleError::ProductUnavailable(produto_id))?;

        lines.push(SaleLine {
            produto_id,
            quantidade,
            preco_unitario: preco,
        });
        nomes.push(nome);
    }

    let totals = SaleTotals::compute(&lines, request.desconto_percentual);
    let (id, numero_pedido) = insert_header(tx, user_id, request, &totals).await?;

    for (line, nome) in lines.iter().zip(&nomes) {
        sqlx::query(
            "INSERT INTO ItemVenda (VendaID, ProdutoID, Quantidade, PrecoUnitario, TotalItem) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(id)
        .bind(line.produto_id)
        .bind(line.quantidade)
        .bind(line.preco_unitario)
        .bind(line.total())
        .execute(&mut **tx)
        .await?;

        let updated = sqlx::query(
            "UPDATE Produto SET EstoqueAtual = EstoqueAtual - ? WHERE ProdutoID = ? AND EstoqueAtual >= ?",
        )
        .bind(line.quantidade)
        .bind(line.produto_id)
        .bind(line.quantidade)
        .execute(&mut **tx)
        .await?;

        if updated.rows_affected() == 0 {
            return Err(SaleError::InsufficientStock(nome.clone()));
        }
    }

    audit::record(
        &mut **tx,
        Some(user_id),
        AuditAction::Insert,
        "Venda",
        Some(id),
        &format!(
            "Venda {} registrada: {} itens, total R$ {:.2}",
            numero_pedido,
            lines.len(),
            totals.valor_liquido
        ),
    )
    .await;

    Ok(CreatedSale {
        id,
        numero_pedido,
        totals,
    })
}

async fn insert_header(
    tx: &mut Transaction<'_, Sqlite>,
    user_id: i64,
    request: &SaleRequest,
    totals: &SaleTotals,
) -> Result<(i64, String), SaleError> {
    let millis = Utc::now().timestamp_millis();
    let data_venda = Local::now().naive_local();

    // The write lock is held, so the highest number on file is stable.
    let last: Option<i64> = sqlx::query_scalar(
        "SELECT MAX(CAST(SUBSTR(NumeroPedido, 7) AS INTEGER)) FROM Venda WHERE NumeroPedido LIKE 'VENDA-%'",
    )
    .fetch_one(&mut **tx)
    .await?;
    let base = last.map_or(millis, |n| millis.max(n + 1));

    for attempt in 0..ORDER_NUMBER_ATTEMPTS {
        let numero_pedido = format!("VENDA-{}", base + attempt);
        let result = sqlx::query(
            r#"
            INSERT INTO Venda (NumeroPedido, DataVenda, ClienteID, UsuarioID, FormaPagamentoID,
                               ValorBruto, Desconto, ValorLiquido, Frete, Observacoes, Status)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, 0, ?, ?)
            "#,
        )
        .bind(&numero_pedido)
        .bind(data_venda)
        .bind(request.cliente_id)
        .bind(user_id)
        .bind(request.forma_pagamento_id)
        .bind(totals.valor_bruto)
        .bind(totals.desconto)
        .bind(totals.valor_liquido)
        .bind(&request.observacoes)
        .bind(STATUS_CONCLUIDA)
        .execute(&mut **tx)
        .await;

        match result {
            Ok(done) => return Ok((done.last_insert_rowid(), numero_pedido)),
            Err(e) if is_unique_violation(&e) => continue,
            Err(e) if is_foreign_key_violation(&e) => {
                return Err(invalid("cliente ou forma de pagamento inválidos"))
            }
            Err(e) => return Err(e.into()),
        }
    }

    Err(invalid("não foi possível gerar o número do pedido"))
}

/// Data for the sale form
pub struct SaleFormData {
    pub clientes: Vec<Cliente>,
    pub produtos: Vec<Produto>,
    pub formas_pagamento: Vec<FormaPagamento>,
}

pub async fn form_data(pool: &SqlitePool) -> Result<SaleFormData, sqlx::Error> {
    let clientes = clients::list(pool).await?;
    let produtos = catalog::list_active(pool).await?;
    let formas_pagamento = sqlx::query_as::<_, FormaPagamento>(
        "SELECT PagamentoID, Nome FROM FormaPagamento ORDER BY Nome",
    )
    .fetch_all(pool)
    .await?;

    Ok(SaleFormData {
        clientes,
        produtos,
        formas_pagamento,
    })
}

/// A sale with its items. `scope` restricts the lookup to one seller.
pub async fn get_sale(
    pool: &SqlitePool,
    id: i64,
    scope: Option<i64>,
) -> Result<Option<(VendaDetalhe, Vec<ItemVendaDetalhe>)>, sqlx::Error> {
    let venda = sqlx::query_as::<_, VendaDetalhe>(
        r#"
        SELECT v.VendaID, v.NumeroPedido, v.DataVenda, v.UsuarioID, u.Nome AS VendedorNome,
               c.Nome AS ClienteNome, f.Nome AS FormaPagamento, v.ValorBruto, v.Desconto,
               v.ValorLiquido, v.Frete, v.Observacoes, v.Status
        FROM Venda v
        JOIN Usuarios u ON u.UsuarioID = v.UsuarioID
        JOIN Cliente c ON c.ClienteID = v.ClienteID
        JOIN FormaPagamento f ON f.PagamentoID = v.FormaPagamentoID
        WHERE v.VendaID = ? AND (? IS NULL OR v.UsuarioID = ?)
        "#,
    )
    .bind(id)
    .bind(scope)
    .bind(scope)
    .fetch_optional(pool)
    .await?;

    let Some(venda) = venda else {
        return Ok(None);
    };

    let itens = sqlx::query_as::<_, ItemVendaDetalhe>(
        r#"
        SELECT i.ProdutoID, p.Nome AS ProdutoNome, p.UnidadeMedida, i.Quantidade,
               i.PrecoUnitario, i.TotalItem
        FROM ItemVenda i
        JOIN Produto p ON p.ProdutoID = i.ProdutoID
        WHERE i.VendaID = ?
        ORDER BY i.ItemVendaID
        "#,
    )
    .bind(id)
    .fetch_all(pool)
    .await?;

    Ok(Some((venda, itens)))
}
