use shared::{
    domain::{Owner, RecordId, Status},
    error::DEFAULT_ERROR_MESSAGE,
    protocol::{ClientPatch, LoginRequest, NewClient, NewTask},
};

use super::*;
use crate::test_support::{api_client, client, closed_port_url, spawn_backend, task, PASSWORD};

#[tokio::test]
async fn login_returns_token_and_user() {
    let (url, _backend) = spawn_backend().await;
    let api = api_client(&url);

    let response = api
        .login(&LoginRequest {
            username: "sergio".to_string(),
            password: PASSWORD.to_string(),
        })
        .await
        .expect("login");

    assert_eq!(response.token, "tok-sergio");
    assert_eq!(response.user.username, "sergio");
    assert_eq!(response.user.name, "Sergio");
}

#[tokio::test]
async fn api_error_carries_server_message() {
    let (url, _backend) = spawn_backend().await;
    let api = api_client(&url);

    let err = api
        .login(&LoginRequest {
            username: "sergio".to_string(),
            password: "wrong".to_string(),
        })
        .await
        .expect_err("wrong password");

    match err {
        ClientError::Api { status, message } => {
            assert_eq!(status, 401);
            assert_eq!(message, "Credenciales inválidas");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn non_json_error_body_uses_default_message() {
    let (url, backend) = spawn_backend().await;
    backend.set_fail_reads(true).await;
    let api = api_client(&url);

    let err = api.list_clients().await.expect_err("503");
    assert!(matches!(
        &err,
        ClientError::Api { status: 503, message } if message == DEFAULT_ERROR_MESSAGE
    ));
    assert_eq!(err.banner_message(), DEFAULT_ERROR_MESSAGE);
}

#[tokio::test]
async fn bearer_token_is_sent_once_set() {
    let (url, backend) = spawn_backend().await;
    let mut api = api_client(&url);

    api.me().await.expect_err("anonymous me");
    api.set_token(Some("tok-isaac".to_string()));
    let user = api.me().await.expect("me");
    assert_eq!(user.username, "isaac");

    let requests = backend.requests().await;
    assert_eq!(requests.len(), 2);
    assert_eq!(requests[0].authorization, None);
    assert_eq!(
        requests[1].authorization.as_deref(),
        Some("Bearer tok-isaac")
    );
}

#[tokio::test]
async fn crud_endpoints_use_expected_paths() {
    let (url, backend) = spawn_backend().await;
    backend.seed_clients(vec![client(7, "Acme", 10.0)]).await;
    backend
        .seed_tasks(vec![
            task(1, "Llamar", Owner::Sergio),
            task(2, "Visitar", Owner::Isaac),
        ])
        .await;
    let api = api_client(&url);

    api.create_client(&NewClient {
        name: "Beta".to_string(),
        description: "Nuevo".to_string(),
        price: 50.0,
    })
    .await
    .expect("create client");
    api.update_client(
        &RecordId::Numeric(7),
        &ClientPatch {
            name: "Acme".to_string(),
            description: "Cerrado".to_string(),
            price: 12.0,
            status: Status::Hecho,
        },
    )
    .await
    .expect("update client");
    api.delete_client(&RecordId::Numeric(7))
        .await
        .expect("delete client with empty body");

    let clients = api.list_clients().await.expect("list clients");
    assert_eq!(clients.len(), 1);
    assert_eq!(clients[0].name, "Beta");

    let isaac = api.list_tasks(Owner::Isaac).await.expect("isaac tasks");
    assert_eq!(isaac, vec![task(2, "Visitar", Owner::Isaac)]);
    api.create_task(&NewTask {
        title: "Cotizar".to_string(),
        owner: Owner::Isaac,
    })
    .await
    .expect("create task");

    let uris: Vec<String> = backend
        .requests()
        .await
        .into_iter()
        .map(|request| format!("{} {}", request.method, request.uri))
        .collect();
    assert_eq!(
        uris,
        vec![
            "POST /clients",
            "PATCH /clients/7",
            "DELETE /clients/7",
            "GET /clients",
            "GET /tasks?owner=isaac",
            "POST /tasks",
        ]
    );
}

#[test]
fn non_array_body_is_a_decode_error() {
    let err = decode::<Vec<shared::domain::Client>>("/clients", serde_json::json!({}))
        .expect_err("object is not a list");
    assert!(matches!(err, ClientError::Decode { ref path, .. } if path == "/clients"));
}

#[tokio::test]
async fn unreachable_backend_is_a_transport_error() {
    let api = api_client(&closed_port_url().await);
    let err = api.list_clients().await.expect_err("nothing listening");
    assert!(matches!(err, ClientError::Transport(_)));
    assert_eq!(err.banner_message(), crate::error::UNREACHABLE_MESSAGE);
}

#[test]
fn rejects_invalid_base_urls() {
    assert!(matches!(
        ApiClient::new("not a url", Duration::from_secs(1)),
        Err(ClientError::Validation(_))
    ));
    assert!(matches!(
        ApiClient::new("mailto:ventas@example.com", Duration::from_secs(1)),
        Err(ClientError::Validation(_))
    ));
}

#[test]
fn endpoints_extend_base_path_and_escape_ids() {
    let api = ApiClient::new("http://localhost:3000/api/", Duration::from_secs(1)).expect("api");
    assert_eq!(
        api.endpoint(&["clients", "a b/c"]).expect("url").as_str(),
        "http://localhost:3000/api/clients/a%20b%2Fc"
    );

    let root = ApiClient::new("http://localhost:3000", Duration::from_secs(1)).expect("api");
    assert_eq!(
        root.endpoint(&["tasks"]).expect("url").as_str(),
        "http://localhost:3000/tasks"
    );
}
