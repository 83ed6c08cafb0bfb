//! Customers (`Cliente`)

pub mod handlers;

use serde::Deserialize;
use sqlx::SqlitePool;

use crate::core::forms::non_empty;
use crate::models::Cliente;

const CLIENTE_COLUMNS: &str = "ClienteID, Nome, CPF_CNPJ, Email, Telefone, Endereco";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ClienteForm {
    pub nome: String,
    pub cpf_cnpj: String,
    pub email: String,
    pub telefone: String,
    pub endereco: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NovoCliente {
    pub nome: String,
    pub cpf_cnpj: Option<String>,
    pub email: Option<String>,
    pub telefone: Option<String>,
    pub endereco: Option<String>,
}

impl ClienteForm {
    pub fn from_cliente(cliente: &Cliente) -> Self {
        Self {
            nome: cliente.nome.clone(),
            cpf_cnpj: cliente.cpf_cnpj.clone().unwrap_or_default(),
            email: cliente.email.clone().unwrap_or_default(),
            telefone: cliente.telefone.clone().unwrap_or_default(),
            endereco: cliente.endereco.clone().unwrap_or_default(),
        }
    }

    pub fn validate(&self) -> Result<NovoCliente, String> {
        let nome = non_empty(&self.nome).ok_or("Informe o nome do cliente.")?;
        Ok(NovoCliente {
            nome,
            cpf_cnpj: non_empty(&self.cpf_cnpj),
            email: non_empty(&self.email),
            telefone: non_empty(&self.telefone),
            endereco: non_empty(&self.endereco),
        })
    }
}

pub async fn list(pool: &SqlitePool) -> Result<Vec<Cliente>, sqlx::Error> {
    sqlx::query_as::<_, Cliente>(&format!(
        "SELECT {} FROM Cliente ORDER BY Nome",
        CLIENTE_COLUMNS
    ))
    .fetch_all(pool)
    .await
}

pub async fn get(pool: &SqlitePool, id: i64) -> Result<Option<Cliente>, sqlx::Error> {
    sqlx::query_as::<_, Cliente>(&format!(
        "SELECT {} FROM Cliente WHERE ClienteID = ?",
        CLIENTE_COLUMNS
    ))
    .bind(id)
    .fetch_optional(pool)
    .await
}

pub async fn count(pool: &SqlitePool) -> Result<i64, sqlx::Error> {
    let (total,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM Cliente")
        .fetch_one(pool)
        .await?;
    Ok(total)
}

pub async fn create(pool: &SqlitePool, cliente: &NovoCliente) -> Result<i64, sqlx::Error> {
    let result = sqlx::query(
        "INSERT INTO Cliente (Nome, CPF_CNPJ, Email, Telefone, Endereco) VALUES (?, ?, ?, ?, ?)",
    )
    .bind(&cliente.nome)
    .bind(&cliente.cpf_cnpj)
    .bind(&cliente.email)
    .bind(&cliente.telefone)
    .bind(&cliente.endereco)
    .execute(pool)
    .await?;

    Ok(result.last_insert_rowid())
}

pub async fn update(pool: &SqlitePool, id: i64, cliente: &NovoCliente) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE Cliente SET Nome = ?, CPF_CNPJ = ?, Email = ?, Telefone = ?, Endereco = ? WHERE ClienteID = ?",
    )
    .bind(&cliente.nome)
    .bind(&cliente.cpf_cnpj)
    .bind(&cliente.email)
    .bind(&cliente.telefone)
    .bind(&cliente.endereco)
    .bind(id)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

pub async fn delete(pool: &SqlitePool, id: i64) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM Cliente WHERE ClienteID = ?")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_requires_name_and_blanks_optional_fields() {
        let form = ClienteForm {
            nome: " Fazenda Boa Vista ".into(),
            cpf_cnpj: "".into(),
            email: "contato@boavista.com".into(),
            ..ClienteForm::default()
        };
        let cliente = form.validate().unwrap();
        assert_eq!(cliente.nome, "Fazenda Boa Vista");
        assert_eq!(cliente.cpf_cnpj, None);
        assert_eq!(cliente.email.as_deref(), Some("contato@boavista.com"));

        assert!(ClienteForm::default().validate().is_err());
    }
}
