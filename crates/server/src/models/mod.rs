//! Data models for Agrovale
//!
//! Row types map the Portuguese column names of the schema onto Rust
//! field names.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Access level of a user account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum Role {
    Admin,
    User,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::User => "user",
        }
    }

    /// Form values other than `admin` fall back to a regular user.
    pub fn from_form(value: &str) -> Self {
        if value.trim().eq_ignore_ascii_case("admin") {
            Role::Admin
        } else {
            Role::User
        }
    }
}

/// The user snapshot kept in a login session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionUser {
    pub id: i64,
    pub nome: String,
    pub nome_usuario: String,
    pub email: Option<String>,
    pub role: Role,
}

impl SessionUser {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

/// User account as listed in the admin pages
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Usuario {
    #[sqlx(rename = "UsuarioID")]
    pub id: i64,
    #[sqlx(rename = "Nome")]
    pub nome: String,
    #[sqlx(rename = "CPF")]
    pub cpf: Option<String>,
    #[sqlx(rename = "Email")]
    pub email: Option<String>,
    #[sqlx(rename = "Telefone")]
    pub telefone: Option<String>,
    #[sqlx(rename = "NomeUsuario")]
    pub nome_usuario: String,
    #[sqlx(rename = "Role")]
    pub role: Role,
    #[sqlx(rename = "Ativo")]
    pub ativo: bool,
}

/// Catalog product
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Produto {
    #[sqlx(rename = "ProdutoID")]
    pub id: i64,
    #[sqlx(rename = "Codigo")]
    pub codigo: Option<String>,
    #[sqlx(rename = "Nome")]
    pub nome: String,
    #[sqlx(rename = "Categoria")]
    pub categoria: Option<String>,
    #[sqlx(rename = "Subcategoria")]
    pub subcategoria: Option<String>,
    #[sqlx(rename = "PrecoCusto")]
    pub preco_custo: f64,
    #[sqlx(rename = "PrecoVenda")]
    pub preco_venda: f64,
    #[sqlx(rename = "UnidadeMedida")]
    pub unidade_medida: Option<String>,
    #[sqlx(rename = "EstoqueAtual")]
    pub estoque_atual: f64,
    #[sqlx(rename = "EstoqueMinimo")]
    pub estoque_minimo: f64,
    #[sqlx(rename = "FornecedorID")]
    pub fornecedor_id: Option<i64>,
    #[sqlx(rename = "Ativo")]
    pub ativo: bool,
}

impl Produto {
    /// Price for payment on credit terms.
    pub fn preco_prazo(&self) -> f64 {
        crate::catalog::term_price(self.preco_venda)
    }

    pub fn estoque_baixo(&self) -> bool {
        self.estoque_atual < self.estoque_minimo
    }
}

/// Customer record
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Cliente {
    #[sqlx(rename = "ClienteID")]
    pub id: i64,
    #[sqlx(rename = "Nome")]
    pub nome: String,
    #[sqlx(rename = "CPF_CNPJ")]
    pub cpf_cnpj: Option<String>,
    #[sqlx(rename = "Email")]
    pub email: Option<String>,
    #[sqlx(rename = "Telefone")]
    pub telefone: Option<String>,
    #[sqlx(rename = "Endereco")]
    pub endereco: Option<String>,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct FormaPagamento {
    #[sqlx(rename = "PagamentoID")]
    pub id: i64,
    #[sqlx(rename = "Nome")]
    pub nome: String,
}

/// Sale header as shown in listings
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct VendaResumo {
    #[sqlx(rename = "VendaID")]
    pub id: i64,
    #[sqlx(rename = "NumeroPedido")]
    pub numero_pedido: String,
    #[sqlx(rename = "DataVenda")]
    pub data_venda: NaiveDateTime,
    #[sqlx(rename = "ValorBruto")]
    pub valor_bruto: f64,
    #[sqlx(rename = "Desconto")]
    pub desconto: f64,
    #[sqlx(rename = "ValorLiquido")]
    pub valor_liquido: f64,
    #[sqlx(rename = "Status")]
    pub status: String,
    #[sqlx(rename = "VendedorNome")]
    pub vendedor_nome: String,
}

/// Full sale header for the detail page
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct VendaDetalhe {
    #[sqlx(rename = "VendaID")]
    pub id: i64,
    #[sqlx(rename = "NumeroPedido")]
    pub numero_pedido: String,
    #[sqlx(rename = "DataVenda")]
    pub data_venda: NaiveDateTime,
    #[sqlx(rename = "UsuarioID")]
    pub usuario_id: i64,
    #[sqlx(rename = "VendedorNome")]
    pub vendedor_nome: String,
    #[sqlx(rename = "ClienteNome")]
    pub cliente_nome: String,
    #[sqlx(rename = "FormaPagamento")]
    pub forma_pagamento: String,
    #[sqlx(rename = "ValorBruto")]
    pub valor_bruto: f64,
    #[sqlx(rename = "Desconto")]
    pub desconto: f64,
    #[sqlx(rename = "ValorLiquido")]
    pub valor_liquido: f64,
    #[sqlx(rename = "Frete")]
    pub frete: f64,
    #[sqlx(rename = "Observacoes")]
    pub observacoes: Option<String>,
    #[sqlx(rename = "Status")]
    pub status: String,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ItemVendaDetalhe {
    #[sqlx(rename = "ProdutoID")]
    pub produto_id: i64,
    #[sqlx(rename = "ProdutoNome")]
    pub produto_nome: String,
    #[sqlx(rename = "UnidadeMedida")]
    pub unidade_medida: Option<String>,
    #[sqlx(rename = "Quantidade")]
    pub quantidade: f64,
    #[sqlx(rename = "PrecoUnitario")]
    pub preco_unitario: f64,
    #[sqlx(rename = "TotalItem")]
    pub total_item: f64,
}

/// Best-selling product row
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct TopProduto {
    #[sqlx(rename = "nome_produto")]
    pub nome: String,
    #[sqlx(rename = "qtd")]
    pub quantidade: f64,
    #[sqlx(rename = "receita")]
    pub receita: f64,
}

/// Audit trail row joined with the acting user's name
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct AuditEntry {
    #[sqlx(rename = "LogID")]
    pub id: i64,
    #[sqlx(rename = "UsuarioID")]
    pub usuario_id: Option<i64>,
    #[sqlx(rename = "UsuarioNome")]
    pub usuario_nome: Option<String>,
    #[sqlx(rename = "Acao")]
    pub acao: String,
    #[sqlx(rename = "TabelaAfetada")]
    pub tabela_afetada: String,
    #[sqlx(rename = "RegistroID")]
    pub registro_id: Option<i64>,
    #[sqlx(rename = "Descricao")]
    pub descricao: Option<String>,
    #[sqlx(rename = "DataHora")]
    pub data_hora: NaiveDateTime,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_from_form() {
        assert_eq!(Role::from_form("admin"), Role::Admin);
        assert_eq!(Role::from_form(" ADMIN "), Role::Admin);
        assert_eq!(Role::from_form("user"), Role::User);
        assert_eq!(Role::from_form("root"), Role::User);
    }

    #[test]
    fn test_session_user_serializes_camel_case() {
        let user = SessionUser {
            id: 7,
            nome: "Ana".into(),
            nome_usuario: "ana".into(),
            email: None,
            role: Role::Admin,
        };
        let json = serde_json::to_value(&user).unwrap();
        assert_eq!(json["nomeUsuario"], "ana");
        assert_eq!(json["role"], "admin");
    }
}
