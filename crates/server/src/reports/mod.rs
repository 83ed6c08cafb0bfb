//! Dashboard and statistics queries
//!
//! Every query takes a seller scope: `None` covers all sales (admins),
//! `Some(id)` only that user's sales.

pub mod handlers;

use sqlx::SqlitePool;

use crate::models::{TopProduto, VendaResumo};
use crate::sales::pricing::round_cents;

pub const RECENT_SALES_LIMIT: i64 = 20;
pub const TOP_PRODUCTS_LIMIT: i64 = 5;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SalesSummary {
    pub total_vendas: i64,
    pub total_valor: f64,
}

impl SalesSummary {
    pub fn ticket_medio(&self) -> f64 {
        if self.total_vendas > 0 {
            round_cents(self.total_valor / self.total_vendas as f64)
        } else {
            0.0
        }
    }
}

pub async fn sales_summary(
    pool: &SqlitePool,
    scope: Option<i64>,
) -> Result<SalesSummary, sqlx::Error> {
    let (total_vendas, total_valor): (i64, f64) = sqlx::query_as(
        r#"
        SELECT COUNT(*), CAST(COALESCE(SUM(ValorLiquido), 0) AS REAL)
        FROM Venda
        WHERE (? IS NULL OR UsuarioID = ?)
        "#,
    )
    .bind(scope)
    .bind(scope)
    .fetch_one(pool)
    .await?;

    Ok(SalesSummary {
        total_vendas,
        total_valor,
    })
}

pub async fn recent_sales(
    pool: &SqlitePool,
    scope: Option<i64>,
    limit: i64,
) -> Result<Vec<VendaResumo>, sqlx::Error> {
    sqlx::query_as::<_, VendaResumo>(
        r#"
        SELECT v.VendaID, v.NumeroPedido, v.DataVenda, v.ValorBruto, v.Desconto,
               v.ValorLiquido, v.Status, u.Nome AS VendedorNome
        FROM Venda v
        JOIN Usuarios u ON u.UsuarioID = v.UsuarioID
        WHERE (? IS NULL OR v.UsuarioID = ?)
        ORDER BY v.DataVenda DESC, v.VendaID DESC
        LIMIT ?
        "#,
    )
    .bind(scope)
    .bind(scope)
    .bind(limit)
    .fetch_all(pool)
    .await
}

/// Products whose stock fell below the configured minimum.
pub async fn low_stock_count(pool: &SqlitePool) -> Result<i64, sqlx::Error> {
    let (total,): (i64,) =
        sqlx::query_as("SELECT COUNT(*) FROM Produto WHERE EstoqueAtual < EstoqueMinimo")
            .fetch_one(pool)
            .await?;
    Ok(total)
}

/// Best sellers by quantity, with the revenue they brought in.
pub async fn top_products(
    pool: &SqlitePool,
    scope: Option<i64>,
    limit: i64,
) -> Result<Vec<TopProduto>, sqlx::Error> {
    sqlx::query_as::<_, TopProduto>(
        r#"
        SELECT p.Nome AS nome_produto,
               CAST(SUM(i.Quantidade) AS REAL) AS qtd,
               CAST(SUM(i.TotalItem) AS REAL) AS receita
        FROM ItemVenda i
        JOIN Venda v ON v.VendaID = i.VendaID
        JOIN Produto p ON p.ProdutoID = i.ProdutoID
        WHERE (? IS NULL OR v.UsuarioID = ?)
        GROUP BY p.ProdutoID, p.Nome
        ORDER BY qtd DESC, receita DESC
        LIMIT ?
        "#,
    )
    .bind(scope)
    .bind(scope)
    .bind(limit)
    .fetch_all(pool)
    .await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ticket_medio() {
        let empty = SalesSummary {
            total_vendas: 0,
            total_valor: 0.0,
        };
        assert_eq!(empty.ticket_medio(), 0.0);

        let summary = SalesSummary {
            total_vendas: 3,
            total_valor: 100.0,
        };
        assert_eq!(summary.ticket_medio(), 33.33);
    }
}
