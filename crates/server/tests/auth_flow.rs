mod common;

use agrovale_server::models::Role;
use axum::http::{header, StatusCode};
use common::{body_string, location, session_cookie, setup};

#[tokio::test]
async fn test_root_redirects_to_login_without_session() {
    let t = setup().await;

    let response = t.get("/", None).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/login");
}

#[tokio::test]
async fn test_protected_routes_require_session() {
    let t = setup().await;

    let response = t.get("/dashboard", None).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/login");

    let response = t
        .post_form("/produtos/criar", "nome_produto=X&preco_custo=1", None)
        .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body_string(response).await, "Não autorizado");
    assert_eq!(t.count("SELECT COUNT(*) FROM Produto").await, 0);
}

#[tokio::test]
async fn test_login_starts_session_and_records_audit() {
    let t = setup().await;
    let id = t.create_user("joao", "senha123", Role::User).await;

    let response = t.post_form("/login", "username=joao&password=senha123", None).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/dashboard");
    let set_cookie = response.headers()[header::SET_COOKIE].to_str().unwrap().to_string();
    assert!(set_cookie.starts_with("agrovale_sess="));
    assert!(set_cookie.contains("HttpOnly"));
    assert!(set_cookie.contains("SameSite=Lax"));

    let cookie = session_cookie(&response);
    let response = t.get("/dashboard", Some(&cookie)).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_string(response).await;
    assert!(body.contains("Nome joao"));
    assert!(body.contains("minhas vendas"));
    assert!(!body.contains("/admin/usuarios"));

    let logins = t
        .count(&format!(
            "SELECT COUNT(*) FROM LogAuditoria WHERE Acao = 'LOGIN' AND UsuarioID = {}",
            id
        ))
        .await;
    assert_eq!(logins, 1);
}

#[tokio::test]
async fn test_login_errors_are_shown_on_the_form() {
    let t = setup().await;
    t.create_user("maria", "certa", Role::User).await;

    let response = t.post_form("/login", "username=maria&password=errada", None).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().get(header::SET_COOKIE).is_none());
    assert!(body_string(response).await.contains("Senha incorreta."));

    let response = t.post_form("/login", "username=ninguem&password=x", None).await;
    assert!(body_string(response).await.contains("Usuário não encontrado."));
}

#[tokio::test]
async fn test_inactive_user_cannot_log_in() {
    let t = setup().await;
    let id = t.create_user("inativo", "senha", Role::User).await;
    sqlx::query("UPDATE Usuarios SET Ativo = 0 WHERE UsuarioID = ?")
        .bind(id)
        .execute(&t.state.pool)
        .await
        .unwrap();

    let response = t.post_form("/login", "username=inativo&password=senha", None).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(body_string(response).await.contains("Usuário não encontrado."));
}

#[tokio::test]
async fn test_register_validates_and_creates_user() {
    let t = setup().await;

    let response = t
        .post_form(
            "/register",
            "nome=Ana&usuario=ana&senha=abc&confirmarSenha=abd",
            None,
        )
        .await;
    assert!(body_string(response).await.contains("As senhas não coincidem."));

    let response = t
        .post_form("/register", "nome=&usuario=ana&senha=abc&confirmarSenha=abc", None)
        .await;
    assert!(body_string(response)
        .await
        .contains("Preencha todos os campos obrigatórios."));

    let response = t
        .post_form(
            "/register",
            "nome=Ana&cpf=123&email=&usuario=ana&senha=abc&confirmarSenha=abc",
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/login");

    let (role, email): (String, Option<String>) =
        sqlx::query_as("SELECT Role, Email FROM Usuarios WHERE NomeUsuario = 'ana'")
            .fetch_one(&t.state.pool)
            .await
            .unwrap();
    assert_eq!(role, "user");
    assert_eq!(email, None);

    let response = t
        .post_form(
            "/register",
            "nome=Outra&cpf=123&usuario=outra&senha=abc&confirmarSenha=abc",
            None,
        )
        .await;
    assert!(body_string(response).await.contains("Usuário ou CPF já cadastrado."));

    t.login("ana", "abc").await;
}

#[tokio::test]
async fn test_logout_destroys_session() {
    let t = setup().await;
    let id = t.create_user("pedro", "senha", Role::User).await;
    let cookie = t.login("pedro", "senha").await;

    let response = t.get("/logout", Some(&cookie)).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/login");
    let cleared = response.headers()[header::SET_COOKIE].to_str().unwrap();
    assert!(cleared.contains("Max-Age=0"));

    let response = t.get("/dashboard", Some(&cookie)).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(t.count("SELECT COUNT(*) FROM sessions").await, 0);

    let logouts = t
        .count(&format!(
            "SELECT COUNT(*) FROM LogAuditoria WHERE Acao = 'LOGOUT' AND UsuarioID = {}",
            id
        ))
        .await;
    assert_eq!(logouts, 1);
}

#[tokio::test]
async fn test_logout_clears_cookie_when_database_is_unavailable() {
    let t = setup().await;
    t.create_user("joana", "senha", Role::User).await;
    let cookie = t.login("joana", "senha").await;

    // The session is still served from the cache once the pool is gone
    t.state.pool.close().await;

    let response = t.get("/logout", Some(&cookie)).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/login");
    let cleared = response.headers()[header::SET_COOKIE].to_str().unwrap();
    assert!(cleared.contains("Max-Age=0"));
}

#[tokio::test]
async fn test_forged_cookie_is_ignored() {
    let t = setup().await;
    t.create_user("lucas", "senha", Role::User).await;
    let cookie = t.login("lucas", "senha").await;

    let (name, value) = cookie.split_once('=').unwrap();
    let (token, _signature) = value.rsplit_once('.').unwrap();
    let forged = format!("{}={}.{}", name, token, "0".repeat(64));

    let response = t.get("/dashboard", Some(&forged)).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/login");
}

#[tokio::test]
async fn test_forgot_password_requires_matching_email() {
    let t = setup().await;
    t.create_user("rita", "antiga", Role::User).await;

    let response = t
        .post_form(
            "/forgot-password",
            "username=rita&email=outra%40agrovale.test&newPassword=nova",
            None,
        )
        .await;
    assert!(body_string(response).await.contains("Usuário não encontrado"));

    let response = t
        .post_form("/forgot-password", "username=rita&email=&newPassword=nova", None)
        .await;
    assert!(body_string(response).await.contains("Preencha todos os campos"));

    let response = t
        .post_form(
            "/forgot-password",
            "username=rita&email=rita%40agrovale.test&newPassword=nova",
            None,
        )
        .await;
    assert!(body_string(response).await.contains("Senha alterada com sucesso!"));

    t.login("rita", "nova").await;
}

#[tokio::test]
async fn test_password_reset_ends_existing_sessions() {
    let t = setup().await;
    t.create_user("sofia", "antiga", Role::User).await;
    let cookie = t.login("sofia", "antiga").await;

    let response = t
        .post_form(
            "/forgot-password",
            "username=sofia&email=sofia%40agrovale.test&newPassword=nova",
            None,
        )
        .await;
    assert!(body_string(response).await.contains("Senha alterada com sucesso!"));

    let response = t.get("/dashboard", Some(&cookie)).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/login");
}

#[tokio::test]
async fn test_health_and_security_headers() {
    let t = setup().await;

    let response = t.get("/health", None).await;
    assert_eq!(response.status(), StatusCode::OK);
    let headers = response.headers().clone();
    assert_eq!(headers["x-frame-options"], "SAMEORIGIN");
    assert_eq!(headers["x-content-type-options"], "nosniff");
    assert_eq!(headers["referrer-policy"], "no-referrer");
    assert!(headers["content-security-policy"]
        .to_str()
        .unwrap()
        .starts_with("default-src 'self'"));
    assert_eq!(body_string(response).await, "OK");
}
