//! Database pool and schema
//!
//! The schema keeps the table and column names of the original AGROVALE
//! database so existing reports and SQL snippets keep working.

use std::str::FromStr;
use std::time::Duration;

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::{ConnectOptions, SqlitePool};
use tracing::{info, log::LevelFilter};

use crate::config::ServerConfig;

/// Payment methods available on a fresh database.
pub const DEFAULT_PAYMENT_METHODS: &[&str] = &[
    "Dinheiro",
    "PIX",
    "Cartão de Crédito",
    "Cartão de Débito",
    "Boleto",
];

/// Open the pool and make sure every table exists.
pub async fn connect(config: &ServerConfig) -> Result<SqlitePool, sqlx::Error> {
    let options = SqliteConnectOptions::from_str(&config.database_url)?
        .create_if_missing(true)
        .foreign_keys(true)
        .journal_mode(SqliteJournalMode::Wal)
        .busy_timeout(Duration::from_secs(5))
        .log_slow_statements(LevelFilter::Warn, Duration::from_secs(1))
        .log_statements(LevelFilter::Debug);

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await?;

    init_schema(&pool).await?;
    info!("[DB] Connected to {}", config.database_url);

    Ok(pool)
}

/// Create tables and seed reference data. Safe to run repeatedly.
pub async fn init_schema(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS Usuarios (
            UsuarioID INTEGER PRIMARY KEY AUTOINCREMENT,
            Nome TEXT NOT NULL,
            CPF TEXT UNIQUE,
            Email TEXT,
            Telefone TEXT,
            NomeUsuario TEXT NOT NULL UNIQUE,
            Senha TEXT NOT NULL,
            Role TEXT NOT NULL DEFAULT 'user' CHECK (Role IN ('admin', 'user')),
            Ativo INTEGER NOT NULL DEFAULT 1
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS Produto (
            ProdutoID INTEGER PRIMARY KEY AUTOINCREMENT,
            Codigo TEXT,
            Nome TEXT NOT NULL,
            Categoria TEXT,
            Subcategoria TEXT,
            PrecoCusto REAL NOT NULL DEFAULT 0,
            PrecoVenda REAL NOT NULL DEFAULT 0,
            UnidadeMedida TEXT,
            EstoqueAtual REAL NOT NULL DEFAULT 0,
            EstoqueMinimo REAL NOT NULL DEFAULT 0,
            FornecedorID INTEGER,
            Ativo INTEGER NOT NULL DEFAULT 1
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS Cliente (
            ClienteID INTEGER PRIMARY KEY AUTOINCREMENT,
            Nome TEXT NOT NULL,
            CPF_CNPJ TEXT UNIQUE,
            Email TEXT,
            Telefone TEXT,
            Endereco TEXT
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS FormaPagamento (
            PagamentoID INTEGER PRIMARY KEY AUTOINCREMENT,
            Nome TEXT NOT NULL UNIQUE
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS Venda (
            VendaID INTEGER PRIMARY KEY AUTOINCREMENT,
            NumeroPedido TEXT NOT NULL UNIQUE,
            DataVenda TEXT NOT NULL,
            ClienteID INTEGER NOT NULL REFERENCES Cliente(ClienteID),
            UsuarioID INTEGER NOT NULL REFERENCES Usuarios(UsuarioID),
            FormaPagamentoID INTEGER NOT NULL REFERENCES FormaPagamento(PagamentoID),
            ValorBruto REAL NOT NULL,
            Desconto REAL NOT NULL DEFAULT 0,
            ValorLiquido REAL NOT NULL,
            Frete REAL NOT NULL DEFAULT 0,
            Observacoes TEXT,
            Status TEXT NOT NULL DEFAULT 'Concluída'
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS ItemVenda (
            ItemVendaID INTEGER PRIMARY KEY AUTOINCREMENT,
            VendaID INTEGER NOT NULL REFERENCES Venda(VendaID) ON DELETE CASCADE,
            ProdutoID INTEGER NOT NULL REFERENCES Produto(ProdutoID),
            Quantidade REAL NOT NULL,
            PrecoUnitario REAL NOT NULL,
            TotalItem REAL NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS LogAuditoria (
            LogID INTEGER PRIMARY KEY AUTOINCREMENT,
            UsuarioID INTEGER REFERENCES Usuarios(UsuarioID) ON DELETE SET NULL,
            Acao TEXT NOT NULL,
            TabelaAfetada TEXT NOT NULL,
            RegistroID INTEGER,
            Descricao TEXT,
            DataHora TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS sessions (
            token TEXT PRIMARY KEY,
            user_id INTEGER NOT NULL REFERENCES Usuarios(UsuarioID) ON DELETE CASCADE,
            data TEXT NOT NULL,
            created_at INTEGER NOT NULL,
            expires_at INTEGER NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_venda_usuario ON Venda(UsuarioID, DataVenda)")
        .execute(pool)
        .await?;
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_itemvenda_venda ON ItemVenda(VendaID)")
        .execute(pool)
        .await?;
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_log_datahora ON LogAuditoria(DataHora)")
        .execute(pool)
        .await?;

    for nome in DEFAULT_PAYMENT_METHODS {
        sqlx::query("INSERT OR IGNORE INTO FormaPagamento (Nome) VALUES (?)")
            .bind(nome)
            .execute(pool)
            .await?;
    }

    Ok(())
}
