use askama::Template;
use axum::response::Html;

use crate::admin::UsuarioForm;
use crate::catalog::ProdutoForm;
use crate::clients::ClienteForm;
use crate::core::audit::AuditFilter;
use crate::core::error::Result;
use crate::models::{
    AuditEntry, Cliente, FormaPagamento, ItemVendaDetalhe, Produto, SessionUser, TopProduto,
    Usuario, VendaDetalhe, VendaResumo,
};

/// Render a template into an HTML response body.
pub fn render<T: Template>(template: &T) -> Result<Html<String>> {
    Ok(Html(template.render()?))
}

#[derive(Template)]
#[template(path = "login.html")]
pub struct LoginTemplate {
    pub error: Option<String>,
}

#[derive(Template)]
#[template(path = "register.html")]
pub struct RegisterTemplate {
    pub error: Option<String>,
}

#[derive(Template)]
#[template(path = "forgot_password.html")]
pub struct ForgotPasswordTemplate {
    pub error: Option<String>,
    pub message: Option<String>,
}

#[derive(Template)]
#[template(path = "dashboard.html")]
pub struct DashboardTemplate {
    pub user: SessionUser,
    pub is_admin: bool,
    pub total_vendas: i64,
    pub total_valor: f64,
    pub total_clientes: i64,
    pub estoque_baixo: i64,
    pub vendas: Vec<VendaResumo>,
}

#[derive(Template)]
#[template(path = "produtos.html")]
pub struct ProdutosTemplate {
    pub user: SessionUser,
    pub produtos: Vec<Produto>,
}

#[derive(Template)]
#[template(path = "produto_form.html")]
pub struct ProdutoFormTemplate {
    pub user: SessionUser,
    pub title: String,
    pub action: String,
    pub form: ProdutoForm,
    pub error: Option<String>,
}

#[derive(Template)]
#[template(path = "clientes.html")]
pub struct ClientesTemplate {
    pub user: SessionUser,
    pub clientes: Vec<Cliente>,
}

#[derive(Template)]
#[template(path = "cliente_form.html")]
pub struct ClienteFormTemplate {
    pub user: SessionUser,
    pub title: String,
    pub action: String,
    pub form: ClienteForm,
    pub error: Option<String>,
}

#[derive(Template)]
#[template(path = "vendas.html")]
pub struct VendasTemplate {
    pub user: SessionUser,
    pub clientes: Vec<Cliente>,
    pub produtos: Vec<Produto>,
    pub formas_pagamento: Vec<FormaPagamento>,
}

#[derive(Template)]
#[template(path = "venda_detalhe.html")]
pub struct VendaDetalheTemplate {
    pub user: SessionUser,
    pub venda: VendaDetalhe,
    pub itens: Vec<ItemVendaDetalhe>,
}

#[derive(Template)]
#[template(path = "estatisticas.html")]
pub struct EstatisticasTemplate {
    pub user: SessionUser,
    pub total_vendas: i64,
    pub total_valor: f64,
    pub ticket_medio: f64,
    pub top_produtos: Vec<TopProduto>,
}

#[derive(Template)]
#[template(path = "admin_usuarios.html")]
pub struct AdminUsuariosTemplate {
    pub user: SessionUser,
    pub usuarios: Vec<Usuario>,
    pub error: Option<String>,
}

#[derive(Template)]
#[template(path = "admin_usuario_form.html")]
pub struct AdminUsuarioFormTemplate {
    pub user: SessionUser,
    pub title: String,
    pub action: String,
    pub is_new: bool,
    pub form: UsuarioForm,
    pub error: Option<String>,
}

#[derive(Template)]
#[template(path = "auditoria.html")]
pub struct AuditoriaTemplate {
    pub user: SessionUser,
    pub entries: Vec<AuditEntry>,
    pub tabelas: Vec<String>,
    pub filtro: AuditFilter,
}

/// Template filters
pub mod filters {
    use std::borrow::Borrow;

    use chrono::NaiveDateTime;

    /// `1234.5` -> `R$ 1.234,50`
    pub fn brl<T: Borrow<f64>>(value: T) -> ::askama::Result<String> {
        Ok(format!("R$ {}", format_decimal(*value.borrow(), 2)))
    }

    /// Quantity with up to three decimals, trailing zeros dropped.
    pub fn qtd<T: Borrow<f64>>(value: T) -> ::askama::Result<String> {
        let text = format_decimal(*value.borrow(), 3);
        let trimmed = if text.contains(',') {
            text.trim_end_matches('0').trim_end_matches(',').to_string()
        } else {
            text
        };
        Ok(trimmed)
    }

    pub fn datahora(value: &NaiveDateTime) -> ::askama::Result<String> {
        Ok(value.format("%d/%m/%Y %H:%M").to_string())
    }

    pub fn opt(value: &Option<String>) -> ::askama::Result<String> {
        Ok(value.clone().unwrap_or_default())
    }

    /// Brazilian number format: `.` for thousands, `,` for decimals.
    pub fn format_decimal(value: f64, decimals: usize) -> String {
        let formatted = format!("{:.*}", decimals, value.abs());
        let (int_part, frac_part) = match formatted.split_once('.') {
            Some((i, f)) => (i.to_string(), Some(f.to_string())),
            None => (formatted, None),
        };

        let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
        for (i, ch) in int_part.chars().enumerate() {
            if i > 0 && (int_part.len() - i) % 3 == 0 {
                grouped.push('.');
            }
            grouped.push(ch);
        }

        let negative = value < 0.0 && formatted_is_nonzero(&grouped, frac_part.as_deref());
        let mut out = String::new();
        if negative {
            out.push('-');
        }
        out.push_str(&grouped);
        if let Some(frac) = frac_part {
            out.push(',');
            out.push_str(&frac);
        }
        out
    }

    fn formatted_is_nonzero(int_part: &str, frac: Option<&str>) -> bool {
        int_part.chars().chain(frac.unwrap_or("").chars()).any(|c| c.is_ascii_digit() && c != '0')
    }

}
