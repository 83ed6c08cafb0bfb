//! User administration
//!
//! Accounts are created through `AuthManager` so that hashing stays in one
//! place; edits and deletes go straight to `Usuarios`.

pub mod handlers;

use serde::Deserialize;
use sqlx::SqlitePool;

use crate::core::auth::NewAccount;
use crate::core::forms::{non_empty, parse_flag};
use crate::models::{Role, Usuario};

const USUARIO_COLUMNS: &str = "UsuarioID, Nome, CPF, Email, Telefone, NomeUsuario, Role, Ativo";

/// Admin user form, field names as posted by the page
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct UsuarioForm {
    #[serde(rename = "Nome")]
    pub nome: String,
    #[serde(rename = "CPF")]
    pub cpf: String,
    #[serde(rename = "Email")]
    pub email: String,
    #[serde(rename = "Telefone")]
    pub telefone: String,
    #[serde(rename = "NomeUsuario")]
    pub nome_usuario: String,
    #[serde(rename = "Senha")]
    pub senha: String,
    #[serde(rename = "NovaSenha")]
    pub nova_senha: String,
    #[serde(rename = "Role")]
    pub role: String,
    #[serde(rename = "Ativo")]
    pub ativo: String,
}

/// Validated changes to an existing account
#[derive(Debug, Clone, PartialEq)]
pub struct UsuarioUpdate {
    pub nome: String,
    pub cpf: Option<String>,
    pub email: Option<String>,
    pub telefone: Option<String>,
    pub nome_usuario: String,
    pub role: Role,
    pub ativo: bool,
    /// Replaces the password when present
    pub nova_senha: Option<String>,
}

impl UsuarioForm {
    pub fn blank() -> Self {
        Self {
            role: Role::User.as_str().to_string(),
            ativo: "1".to_string(),
            ..Self::default()
        }
    }

    pub fn from_usuario(usuario: &Usuario) -> Self {
        Self {
            nome: usuario.nome.clone(),
            cpf: usuario.cpf.clone().unwrap_or_default(),
            email: usuario.email.clone().unwrap_or_default(),
            telefone: usuario.telefone.clone().unwrap_or_default(),
            nome_usuario: usuario.nome_usuario.clone(),
            senha: String::new(),
            nova_senha: String::new(),
            role: usuario.role.as_str().to_string(),
            ativo: if usuario.ativo { "1" } else { "0" }.to_string(),
        }
    }

    pub fn to_new_account(&self) -> Result<NewAccount, String> {
        let (nome, nome_usuario) = self.required()?;
        if self.senha.is_empty() {
            return Err("Informe a senha do usuário.".to_string());
        }

        Ok(NewAccount {
            nome,
            cpf: non_empty(&self.cpf),
            email: non_empty(&self.email),
            telefone: non_empty(&self.telefone),
            nome_usuario,
            senha: self.senha.clone(),
            role: Role::from_form(&self.role),
            ativo: parse_flag(&self.ativo),
        })
    }

    pub fn to_update(&self) -> Result<UsuarioUpdate, String> {
        let (nome, nome_usuario) = self.required()?;

        Ok(UsuarioUpdate {
            nome,
            cpf: non_empty(&self.cpf),
            email: non_empty(&self.email),
            telefone: non_empty(&self.telefone),
            nome_usuario,
            role: Role::from_form(&self.role),
            ativo: parse_flag(&self.ativo),
            nova_senha: Some(self.nova_senha.clone()).filter(|s| !s.trim().is_empty()),
        })
    }

    fn required(&self) -> Result<(String, String), String> {
        match (non_empty(&self.nome), non_empty(&self.nome_usuario)) {
            (Some(nome), Some(nome_usuario)) => Ok((nome, nome_usuario)),
            _ => Err("Nome e usuário são obrigatórios.".to_string()),
        }
    }
}

pub async fn list(pool: &SqlitePool) -> Result<Vec<Usuario>, sqlx::Error> {
    sqlx::query_as::<_, Usuario>(&format!(
        "SELECT {} FROM Usuarios ORDER BY Nome",
        USUARIO_COLUMNS
    ))
    .fetch_all(pool)
    .await
}

pub async fn get(pool: &SqlitePool, id: i64) -> Result<Option<Usuario>, sqlx::Error> {
    sqlx::query_as::<_, Usuario>(&format!(
        "SELECT {} FROM Usuarios WHERE UsuarioID = ?",
        USUARIO_COLUMNS
    ))
    .bind(id)
    .fetch_optional(pool)
    .await
}

/// Update profile fields in one statement. `senha_hash` replaces the stored
/// password when given; hash it with `AuthManager::hash_password` first.
pub async fn update(
    pool: &SqlitePool,
    id: i64,
    usuario: &UsuarioUpdate,
    senha_hash: Option<&str>,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        r#"
        UPDATE Usuarios
        SET Nome = ?, CPF = ?, Email = ?, Telefone = ?, NomeUsuario = ?, Role = ?, Ativo = ?,
            Senha = COALESCE(?, Senha)
        WHERE UsuarioID = ?
        "#,
    )
    .bind(&usuario.nome)
    .bind(&usuario.cpf)
    .bind(&usuario.email)
    .bind(&usuario.telefone)
    .bind(&usuario.nome_usuario)
    .bind(usuario.role)
    .bind(usuario.ativo)
    .bind(senha_hash)
    .bind(id)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

pub async fn delete(pool: &SqlitePool, id: i64) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM Usuarios WHERE UsuarioID = ?")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}
