//! Product catalog (`Produto`)
//!
//! Prices are entered as cost plus margin; the sale price is derived on
//! every save and the margin is recomputed from the stored prices when a
//! product is edited.

pub mod handlers;

use serde::Deserialize;
use sqlx::SqlitePool;

use crate::core::forms::{non_empty, parse_decimal, parse_flag};
use crate::models::Produto;
use crate::sales::pricing::round_cents;

/// Markup applied to the cash price for payment on credit terms.
pub const TERM_PRICE_FACTOR: f64 = 1.10;

const PRODUTO_COLUMNS: &str = "ProdutoID, Codigo, Nome, Categoria, Subcategoria, PrecoCusto, PrecoVenda, UnidadeMedida, EstoqueAtual, EstoqueMinimo, FornecedorID, Ativo";

pub fn term_price(cash_price: f64) -> f64 {
    round_cents(cash_price * TERM_PRICE_FACTOR)
}

/// `custo * (1 + margem / 100)`, rounded to cents.
pub fn sale_price(cost: f64, margin_percent: f64) -> f64 {
    round_cents(cost * (1.0 + margin_percent / 100.0))
}

/// Margin in percent implied by a cost and a sale price. Zero without a cost.
pub fn margin_from_prices(cost: f64, sale: f64) -> f64 {
    if cost <= 0.0 {
        return 0.0;
    }
    round_cents((sale - cost) / cost * 100.0)
}

/// Product form exactly as the browser submits it
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ProdutoForm {
    pub codigo_externo: String,
    pub nome_produto: String,
    pub categoria: String,
    pub subcategoria: String,
    pub preco_custo: String,
    pub margem_lucro: String,
    pub unidade_medida: String,
    pub quantidade_estoque: String,
    pub estoque_minimo: String,
    pub fornecedor_id: String,
    pub ativo: String,
}

/// Validated product values ready to be written
#[derive(Debug, Clone, PartialEq)]
pub struct NovoProduto {
    pub codigo: Option<String>,
    pub nome: String,
    pub categoria: Option<String>,
    pub subcategoria: Option<String>,
    pub preco_custo: f64,
    pub preco_venda: f64,
    pub unidade_medida: Option<String>,
    pub estoque_atual: f64,
    pub estoque_minimo: f64,
    pub fornecedor_id: Option<i64>,
    pub ativo: bool,
}

impl ProdutoForm {
    /// Empty form for a new product.
    pub fn blank() -> Self {
        Self {
            ativo: "1".to_string(),
            ..Self::default()
        }
    }

    pub fn from_produto(produto: &Produto) -> Self {
        Self {
            codigo_externo: produto.codigo.clone().unwrap_or_default(),
            nome_produto: produto.nome.clone(),
            categoria: produto.categoria.clone().unwrap_or_default(),
            subcategoria: produto.subcategoria.clone().unwrap_or_default(),
            preco_custo: format!("{:.2}", produto.preco_custo),
            margem_lucro: format!(
                "{:.2}",
                margin_from_prices(produto.preco_custo, produto.preco_venda)
            ),
            unidade_medida: produto.unidade_medida.clone().unwrap_or_default(),
            quantidade_estoque: produto.estoque_atual.to_string(),
            estoque_minimo: produto.estoque_minimo.to_string(),
            fornecedor_id: produto
                .fornecedor_id
                .map(|id| id.to_string())
                .unwrap_or_default(),
            ativo: if produto.ativo { "1" } else { "0" }.to_string(),
        }
    }

    /// Check the submitted values and derive the sale price.
    pub fn validate(&self) -> Result<NovoProduto, String> {
        let nome = non_empty(&self.nome_produto).ok_or("Informe o nome do produto.")?;

        let preco_custo = parse_decimal(&self.preco_custo)
            .filter(|v| *v >= 0.0)
            .ok_or("Preço de custo inválido.")?;
        let margem = non_negative_or_zero(&self.margem_lucro, "Margem de lucro inválida.")?;
        let estoque_atual =
            non_negative_or_zero(&self.quantidade_estoque, "Quantidade em estoque inválida.")?;
        let estoque_minimo = non_negative_or_zero(&self.estoque_minimo, "Estoque mínimo inválido.")?;

        let fornecedor_id = match non_empty(&self.fornecedor_id) {
            None => None,
            Some(raw) => Some(
                raw.parse::<i64>()
                    .ok()
                    .filter(|id| *id > 0)
                    .ok_or("Fornecedor inválido.")?,
            ),
        };

        Ok(NovoProduto {
            codigo: non_empty(&self.codigo_externo),
            nome,
            categoria: non_empty(&self.categoria),
            subcategoria: non_empty(&self.subcategoria),
            preco_custo,
            preco_venda: sale_price(preco_custo, margem),
            unidade_medida: non_empty(&self.unidade_medida),
            estoque_atual,
            estoque_minimo,
            fornecedor_id,
            ativo: parse_flag(&self.ativo),
        })
    }
}

fn non_negative_or_zero(raw: &str, message: &str) -> Result<f64, String> {
    if raw.trim().is_empty() {
        return Ok(0.0);
    }
    parse_decimal(raw)
        .filter(|v| *v >= 0.0)
        .ok_or_else(|| message.to_string())
}

pub async fn list(pool: &SqlitePool) -> Result<Vec<Produto>, sqlx::Error> {
    sqlx::query_as::<_, Produto>(&format!(
        "SELECT {} FROM Produto ORDER BY Nome",
        PRODUTO_COLUMNS
    ))
    .fetch_all(pool)
    .await
}

/// Products that can be sold.
pub async fn list_active(pool: &SqlitePool) -> Result<Vec<Produto>, sqlx::Error> {
    sqlx::query_as::<_, Produto>(&format!(
        "SELECT {} FROM Produto WHERE Ativo = 1 ORDER BY Nome",
        PRODUTO_COLUMNS
    ))
    .fetch_all(pool)
    .await
}

pub async fn get(pool: &SqlitePool, id: i64) -> Result<Option<Produto>, sqlx::Error> {
    sqlx::query_as::<_, Produto>(&format!(
        "SELECT {} FROM Produto WHERE ProdutoID = ?",
        PRODUTO_COLUMNS
    ))
    .bind(id)
    .fetch_optional(pool)
    .await
}

pub async fn create(pool: &SqlitePool, produto: &NovoProduto) -> Result<i64, sqlx::Error> {
    let result = sqlx::query(
        r#"
        INSERT INTO Produto (Codigo, Nome, Categoria, Subcategoria, PrecoCusto, PrecoVenda,
                             UnidadeMedida, EstoqueAtual, EstoqueMinimo, FornecedorID, Ativo)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&produto.codigo)
    .bind(&produto.nome)
    .bind(&produto.categoria)
    .bind(&produto.subcategoria)
    .bind(produto.preco_custo)
    .bind(produto.preco_venda)
    .bind(&produto.unidade_medida)
    .bind(produto.estoque_atual)
    .bind(produto.estoque_minimo)
    .bind(produto.fornecedor_id)
    .bind(produto.ativo)
    .execute(pool)
    .await?;

    Ok(result.last_insert_rowid())
}

/// Returns `false` when no product has this id.
pub async fn update(pool: &SqlitePool, id: i64, produto: &NovoProduto) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        r#"
        UPDATE Produto
        SET Codigo = ?, Nome = ?, Categoria = ?, Subcategoria = ?, PrecoCusto = ?, PrecoVenda = ?,
            UnidadeMedida = ?, EstoqueAtual = ?, EstoqueMinimo = ?, FornecedorID = ?, Ativo = ?
        WHERE ProdutoID = ?
        "#,
    )
    .bind(&produto.codigo)
    .bind(&produto.nome)
    .bind(&produto.categoria)
    .bind(&produto.subcategoria)
    .bind(produto.preco_custo)
    .bind(produto.preco_venda)
    .bind(&produto.unidade_medida)
    .bind(produto.estoque_atual)
    .bind(produto.estoque_minimo)
    .bind(produto.fornecedor_id)
    .bind(produto.ativo)
    .bind(id)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

pub async fn delete(pool: &SqlitePool, id: i64) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM Produto WHERE ProdutoID = ?")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn form() -> ProdutoForm {
        ProdutoForm {
            nome_produto: "Semente de milho".into(),
            preco_custo: "100,00".into(),
            margem_lucro: "25".into(),
            quantidade_estoque: "40".into(),
            estoque_minimo: "10".into(),
            ..ProdutoForm::blank()
        }
    }

    #[test]
    fn test_pricing_helpers() {
        assert_eq!(sale_price(100.0, 25.0), 125.0);
        assert_eq!(sale_price(10.0, 0.0), 10.0);
        assert_eq!(term_price(100.0), 110.0);
        assert_eq!(term_price(9.99), 10.99);
        assert_eq!(margin_from_prices(100.0, 125.0), 25.0);
        assert_eq!(margin_from_prices(3.0, 4.0), 33.33);
        assert_eq!(margin_from_prices(0.0, 50.0), 0.0);
    }

    #[test]
    fn test_validate_derives_sale_price() {
        let produto = form().validate().unwrap();
        assert_eq!(produto.nome, "Semente de milho");
        assert_eq!(produto.preco_custo, 100.0);
        assert_eq!(produto.preco_venda, 125.0);
        assert_eq!(produto.estoque_atual, 40.0);
        assert_eq!(produto.codigo, None);
        assert!(produto.ativo);
    }

    #[test]
    fn test_validate_rejects_bad_input() {
        let mut bad = form();
        bad.nome_produto = "  ".into();
        assert_eq!(bad.validate().unwrap_err(), "Informe o nome do produto.");

        let mut bad = form();
        bad.preco_custo = "-1".into();
        assert_eq!(bad.validate().unwrap_err(), "Preço de custo inválido.");

        let mut bad = form();
        bad.margem_lucro = "muito".into();
        assert_eq!(bad.validate().unwrap_err(), "Margem de lucro inválida.");

        let mut bad = form();
        bad.fornecedor_id = "x".into();
        assert_eq!(bad.validate().unwrap_err(), "Fornecedor inválido.");
    }

    #[test]
    fn test_form_roundtrip_keeps_margin() {
        let produto = Produto {
            id: 1,
            codigo: Some("MIL-01".into()),
            nome: "Milho".into(),
            categoria: None,
            subcategoria: None,
            preco_custo: 80.0,
            preco_venda: 100.0,
            unidade_medida: Some("SC".into()),
            estoque_atual: 5.0,
            estoque_minimo: 10.0,
            fornecedor_id: None,
            ativo: false,
        };
        let form = ProdutoForm::from_produto(&produto);
        assert_eq!(form.margem_lucro, "25.00");
        assert_eq!(form.ativo, "0");
        let again = form.validate().unwrap();
        assert_eq!(again.preco_venda, 100.0);
        assert!(!again.ativo);
        assert!(produto.estoque_baixo());
        assert_eq!(produto.preco_prazo(), 110.0);
    }
}
