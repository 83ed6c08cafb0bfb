//! Audit trail (`LogAuditoria`)
//!
//! Recording is best effort: a failed insert is logged and never fails the
//! request that triggered it.

use chrono::Local;
use serde::Deserialize;
use sqlx::{SqliteExecutor, SqlitePool};
use tracing::warn;

use crate::core::forms::{non_empty, parse_id};
use crate::models::AuditEntry;

pub const DEFAULT_REPORT_LIMIT: i64 = 200;
pub const MAX_REPORT_LIMIT: i64 = 1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuditAction {
    Login,
    Logout,
    Insert,
    Update,
    Delete,
}

impl AuditAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditAction::Login => "LOGIN",
            AuditAction::Logout => "LOGOUT",
            AuditAction::Insert => "INSERT",
            AuditAction::Update => "UPDATE",
            AuditAction::Delete => "DELETE",
        }
    }
}

/// Append one row to the audit trail.
pub async fn record<'e, E>(
    executor: E,
    user_id: Option<i64>,
    action: AuditAction,
    table: &str,
    record_id: Option<i64>,
    description: &str,
) where
    E: SqliteExecutor<'e>,
{
    let result = sqlx::query(
        "INSERT INTO LogAuditoria (UsuarioID, Acao, TabelaAfetada, RegistroID, Descricao, DataHora) VALUES (?, ?, ?, ?, ?, ?)",
    )
    .bind(user_id)
    .bind(action.as_str())
    .bind(table)
    .bind(record_id)
    .bind(description)
    .bind(Local::now().naive_local())
    .execute(executor)
    .await;

    if let Err(e) = result {
        warn!(
            "[Audit] Failed to record {} on {}: {}",
            action.as_str(),
            table,
            e
        );
    }
}

/// Report filter as submitted by the query string
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AuditFilter {
    pub tabela: String,
    pub usuario: String,
    pub limite: String,
}

impl AuditFilter {
    pub fn table(&self) -> Option<String> {
        non_empty(&self.tabela)
    }

    pub fn user_id(&self) -> Option<i64> {
        parse_id(&self.usuario)
    }

    pub fn limit(&self) -> i64 {
        parse_id(&self.limite)
            .filter(|n| *n > 0)
            .map(|n| n.min(MAX_REPORT_LIMIT))
            .unwrap_or(DEFAULT_REPORT_LIMIT)
    }
}

/// Latest audit rows, newest first.
pub async fn list(pool: &SqlitePool, filter: &AuditFilter) -> Result<Vec<AuditEntry>, sqlx::Error> {
    let table = filter.table();
    let user_id = filter.user_id();

    sqlx::query_as::<_, AuditEntry>(
        r#"
        SELECT l.LogID, l.UsuarioID, u.Nome AS UsuarioNome, l.Acao, l.TabelaAfetada,
               l.RegistroID, l.Descricao, l.DataHora
        FROM LogAuditoria l
        LEFT JOIN Usuarios u ON u.UsuarioID = l.UsuarioID
        WHERE (? IS NULL OR l.TabelaAfetada = ?)
          AND (? IS NULL OR l.UsuarioID = ?)
        ORDER BY l.DataHora DESC, l.LogID DESC
        LIMIT ?
        "#,
    )
    .bind(&table)
    .bind(&table)
    .bind(user_id)
    .bind(user_id)
    .bind(filter.limit())
    .fetch_all(pool)
    .await
}

/// Distinct table names present in the trail, for the filter dropdown.
pub async fn tables(pool: &SqlitePool) -> Result<Vec<String>, sqlx::Error> {
    let rows: Vec<(String,)> =
        sqlx::query_as("SELECT DISTINCT TabelaAfetada FROM LogAuditoria ORDER BY TabelaAfetada")
            .fetch_all(pool)
            .await?;
    Ok(rows.into_iter().map(|(t,)| t).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_limit_bounds() {
        let mut filter = AuditFilter::default();
        assert_eq!(filter.limit(), DEFAULT_REPORT_LIMIT);
        filter.limite = "5000".into();
        assert_eq!(filter.limit(), MAX_REPORT_LIMIT);
        filter.limite = "-3".into();
        assert_eq!(filter.limit(), DEFAULT_REPORT_LIMIT);
        filter.limite = "25".into();
        assert_eq!(filter.limit(), 25);
    }

    #[test]
    fn test_filter_blank_fields_are_none() {
        let filter = AuditFilter {
            tabela: "  ".into(),
            usuario: "".into(),
            limite: "".into(),
        };
        assert_eq!(filter.table(), None);
        assert_eq!(filter.user_id(), None);
    }
}
