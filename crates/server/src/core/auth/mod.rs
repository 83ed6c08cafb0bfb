//! Authentication Module
//!
//! Handles login, self-service registration, and password resets against
//! the `Usuarios` table. Session handling lives in `core::session`.

pub mod handlers;
pub mod middleware;

use sqlx::SqlitePool;
use thiserror::Error;
use tracing::{info, warn};

use crate::core::error::is_unique_violation;
use crate::models::{Role, SessionUser};

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Usuário não encontrado.")]
    UserNotFound,
    #[error("Senha incorreta.")]
    WrongPassword,
    #[error("Usuário ou CPF já cadastrado.")]
    Duplicate,
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("password hashing failed: {0}")]
    Hash(#[from] bcrypt::BcryptError),
    #[error("hashing task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// Fields of a new account
#[derive(Debug, Clone)]
pub struct NewAccount {
    pub nome: String,
    pub cpf: Option<String>,
    pub email: Option<String>,
    pub telefone: Option<String>,
    pub nome_usuario: String,
    pub senha: String,
    pub role: Role,
    pub ativo: bool,
}

/// Auth manager handles credential checks and password storage
pub struct AuthManager {
    pool: SqlitePool,
    cost: u32,
}

impl AuthManager {
    pub fn new(pool: SqlitePool, cost: u32) -> Self {
        Self { pool, cost }
    }

    /// bcrypt-hash a password off the async executor.
    pub async fn hash_password(&self, password: &str) -> Result<String, AuthError> {
        let password = password.to_string();
        let cost = self.cost;
        let hashed = tokio::task::spawn_blocking(move || bcrypt::hash(password, cost)).await??;
        Ok(hashed)
    }

    async fn verify_password(&self, password: &str, hash: &str) -> Result<bool, AuthError> {
        let password = password.to_string();
        let hash = hash.to_string();
        let valid = tokio::task::spawn_blocking(move || bcrypt::verify(password, &hash)).await??;
        Ok(valid)
    }

    /// Check credentials of an active user.
    pub async fn login(&self, username: &str, password: &str) -> Result<SessionUser, AuthError> {
        let row: Option<(i64, String, String, String, Role, Option<String>)> = sqlx::query_as(
            "SELECT UsuarioID, Nome, NomeUsuario, Senha, Role, Email FROM Usuarios WHERE NomeUsuario = ? AND Ativo = 1",
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await?;

        let (id, nome, nome_usuario, senha, role, email) = row.ok_or(AuthError::UserNotFound)?;

        if !self.verify_password(password, &senha).await? {
            warn!("[Auth] Failed login attempt for {}", username);
            return Err(AuthError::WrongPassword);
        }

        info!("[Auth] User logged in: {}", nome_usuario);

        Ok(SessionUser {
            id,
            nome,
            nome_usuario,
            email,
            role,
        })
    }

    /// Insert a new account, returning its id.
    pub async fn create_account(&self, account: &NewAccount) -> Result<i64, AuthError> {
        let hash = self.hash_password(&account.senha).await?;

        let result = sqlx::query(
            "INSERT INTO Usuarios (Nome, CPF, Email, Telefone, NomeUsuario, Senha, Role, Ativo) VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&account.nome)
        .bind(&account.cpf)
        .bind(&account.email)
        .bind(&account.telefone)
        .bind(&account.nome_usuario)
        .bind(hash)
        .bind(account.role)
        .bind(account.ativo)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                AuthError::Duplicate
            } else {
                AuthError::Database(e)
            }
        })?;

        info!(
            "[Auth] User registered: {} ({})",
            account.nome_usuario,
            account.role.as_str()
        );

        Ok(result.last_insert_rowid())
    }

    /// Replace the password of `username` after checking the account e-mail.
    pub async fn reset_password(
        &self,
        username: &str,
        email: &str,
        new_password: &str,
    ) -> Result<i64, AuthError> {
        let row: Option<(i64, Option<String>)> =
            sqlx::query_as("SELECT UsuarioID, Email FROM Usuarios WHERE NomeUsuario = ?")
                .bind(username)
                .fetch_optional(&self.pool)
                .await?;

        let (id, registered) = row.ok_or(AuthError::UserNotFound)?;
        let matches = registered
            .map(|r| r.trim().eq_ignore_ascii_case(email.trim()))
            .unwrap_or(false);
        if !matches {
            warn!("[Auth] Password reset with wrong e-mail for {}", username);
            return Err(AuthError::UserNotFound);
        }

        self.set_password(id, new_password).await?;
        info!("[Auth] Password reset for {}", username);
        Ok(id)
    }

    pub async fn set_password(&self, user_id: i64, password: &str) -> Result<(), AuthError> {
        let hash = self.hash_password(password).await?;
        sqlx::query("UPDATE Usuarios SET Senha = ? WHERE UsuarioID = ?")
            .bind(hash)
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Create the configured admin account when the database has no admin.
    pub async fn ensure_admin(&self, username: &str, password: &str) -> Result<bool, AuthError> {
        let (admins,): (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM Usuarios WHERE Role = 'admin'")
                .fetch_one(&self.pool)
                .await?;
        if admins > 0 {
            return Ok(false);
        }

        self.create_account(&NewAccount {
            nome: "Administrador".to_string(),
            cpf: None,
            email: None,
            telefone: None,
            nome_usuario: username.to_string(),
            senha: password.to_string(),
            role: Role::Admin,
            ativo: true,
        })
        .await?;

        info!("[Auth] Bootstrap admin '{}' created", username);
        Ok(true)
    }
}
