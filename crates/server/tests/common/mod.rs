#![allow(dead_code)]

use agrovale_server::config::{AppState, ServerConfig};
use agrovale_server::core::auth::NewAccount;
use agrovale_server::models::Role;
use axum::body::Body;
use axum::http::{header, Method, Request, Response};
use axum::Router;
use tempfile::{tempdir, TempDir};
use tower::ServiceExt;

pub struct TestApp {
    // Keeps the database directory alive for the duration of the test
    pub dir: TempDir,
    pub state: AppState,
    pub app: Router,
}

pub async fn setup() -> TestApp {
    let dir = tempdir().unwrap();
    let mut config = ServerConfig::with_database_file(dir.path().join("agrovale.sqlite"));
    config.bcrypt_cost = 4;
    config.public_dir = dir.path().join("public");

    let state = agrovale_server::build_state(config).await.unwrap();
    let app = agrovale_server::app(state.clone());
    TestApp { dir, state, app }
}

impl TestApp {
    pub async fn create_user(&self, username: &str, password: &str, role: Role) -> i64 {
        self.state
            .auth
            .create_account(&NewAccount {
                nome: format!("Nome {}", username),
                cpf: None,
                email: Some(format!("{}@agrovale.test", username)),
                telefone: None,
                nome_usuario: username.to_string(),
                senha: password.to_string(),
                role,
                ativo: true,
            })
            .await
            .unwrap()
    }

    pub async fn get(&self, uri: &str, cookie: Option<&str>) -> Response<Body> {
        self.send(Method::GET, uri, None, cookie).await
    }

    pub async fn post_form(&self, uri: &str, body: &str, cookie: Option<&str>) -> Response<Body> {
        self.send(Method::POST, uri, Some(body), cookie).await
    }

    async fn send(
        &self,
        method: Method,
        uri: &str,
        body: Option<&str>,
        cookie: Option<&str>,
    ) -> Response<Body> {
        let mut builder = Request::builder().method(method).uri(uri);
        if body.is_some() {
            builder = builder.header(header::CONTENT_TYPE, "application/x-www-form-urlencoded");
        }
        if let Some(cookie) = cookie {
            builder = builder.header(header::COOKIE, cookie);
        }
        let request = builder
            .body(Body::from(body.unwrap_or_default().to_string()))
            .unwrap();

        self.app.clone().oneshot(request).await.unwrap()
    }

    /// Log in and return the `name=value` cookie pair.
    pub async fn login(&self, username: &str, password: &str) -> String {
        let response = self
            .post_form(
                "/login",
                &format!("username={}&password={}", username, password),
                None,
            )
            .await;
        assert_eq!(location(&response), "/dashboard", "login failed for {}", username);
        session_cookie(&response)
    }

    pub async fn count(&self, sql: &str) -> i64 {
        let (n,): (i64,) = sqlx::query_as(sql)
            .fetch_one(&self.state.pool)
            .await
            .unwrap();
        n
    }
}

pub fn location(response: &Response<Body>) -> String {
    response
        .headers()
        .get(header::LOCATION)
        .map(|v| v.to_str().unwrap().to_string())
        .unwrap_or_default()
}

pub fn session_cookie(response: &Response<Body>) -> String {
    let set_cookie = response
        .headers()
        .get(header::SET_COOKIE)
        .expect("missing set-cookie")
        .to_str()
        .unwrap();
    set_cookie.split(';').next().unwrap().to_string()
}

pub async fn body_string(response: Response<Body>) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}
