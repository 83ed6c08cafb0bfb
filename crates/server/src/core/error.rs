use axum::{
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use thiserror::Error;
use tracing::error;

#[derive(Debug, Error)]
pub enum Error {
    // Auth Errors
    #[error("Sessão ausente ou expirada")]
    NotAuthenticated,
    #[error("Não autorizado")]
    Unauthorized,
    #[error("Acesso negado: apenas administradores.")]
    Forbidden,
    #[error("Contexto de autenticação ausente")]
    AuthFailCtxNotInRequestExt,

    // Request Errors
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    BadRequest(String),

    // Generic
    #[error("{context}: {source}")]
    Database {
        context: String,
        #[source]
        source: sqlx::Error,
    },
    #[error("Erro ao renderizar página: {0}")]
    Template(#[from] askama::Error),
    #[error("{0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// `map_err` adapter attaching a user-facing context to a database error.
    pub fn db(context: impl Into<String>) -> impl FnOnce(sqlx::Error) -> Error {
        let context = context.into();
        move |source| Error::Database { context, source }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Error::NotAuthenticated => StatusCode::SEE_OTHER,
            Error::Unauthorized => StatusCode::UNAUTHORIZED,
            Error::Forbidden => StatusCode::FORBIDDEN,
            Error::NotFound(_) => StatusCode::NOT_FOUND,
            Error::BadRequest(_) => StatusCode::BAD_REQUEST,
            Error::AuthFailCtxNotInRequestExt
            | Error::Database { .. }
            | Error::Template(_)
            | Error::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        if matches!(self, Error::NotAuthenticated) {
            return Redirect::to("/login").into_response();
        }

        let status = self.status();
        if status.is_server_error() {
            error!("{}", self);
        }

        (status, self.to_string()).into_response()
    }
}

impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Error::Internal(err.to_string())
    }
}

impl From<String> for Error {
    fn from(err: String) -> Self {
        Error::Internal(err)
    }
}

/// True when the error is a UNIQUE constraint violation.
pub fn is_unique_violation(err: &sqlx::Error) -> bool {
    err.as_database_error()
        .map(|e| e.is_unique_violation())
        .unwrap_or(false)
}

/// True when the error is a FOREIGN KEY constraint violation.
pub fn is_foreign_key_violation(err: &sqlx::Error) -> bool {
    err.as_database_error()
        .map(|e| e.is_foreign_key_violation())
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_authenticated_redirects_to_login() {
        let response = Error::NotAuthenticated.into_response();
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(response.headers()["location"], "/login");
    }

    #[test]
    fn test_status_mapping() {
        assert_eq!(Error::Forbidden.status(), StatusCode::FORBIDDEN);
        assert_eq!(Error::Unauthorized.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            Error::NotFound("x".into()).status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            Error::db("Erro ao buscar produtos")(sqlx::Error::RowNotFound).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_database_message_carries_context() {
        let err = Error::db("Erro ao excluir produto")(sqlx::Error::RowNotFound);
        assert!(err.to_string().starts_with("Erro ao excluir produto: "));
    }
}
