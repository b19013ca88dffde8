use std::time::Duration;

use reqwest::{header::CONTENT_TYPE, Client as HttpClient, Method, RequestBuilder};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use shared::{
    domain::{Client, Owner, RecordId, Task, User},
    error::ApiErrorBody,
    protocol::{ClientPatch, LoginRequest, LoginResponse, MeResponse, NewClient, NewTask, TaskPatch},
};
use tracing::debug;
use url::Url;

use crate::error::{ClientError, ClientResult};

/// Thin HTTP binding of the sales backend. Holds the bearer token but no
/// other session state.
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: HttpClient,
    base_url: Url,
    token: Option<String>,
}

impl ApiClient {
    pub fn new(base_url: &str, timeout: Duration) -> ClientResult<Self> {
        let parsed = Url::parse(base_url)
            .map_err(|err| ClientError::Validation(format!("invalid api url '{base_url}': {err}")))?;
        if parsed.cannot_be_a_base() {
            return Err(ClientError::Validation(format!(
                "api url '{base_url}' cannot be used as a base url"
            )));
        }
        let http = HttpClient::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            base_url: parsed,
            token: None,
        })
    }

    pub fn set_token(&mut self, token: Option<String>) {
        self.token = token;
    }

    pub async fn login(&self, request: &LoginRequest) -> ClientResult<LoginResponse> {
        let path = "/auth/login";
        let body = self
            .execute(self.request(Method::POST, &["auth", "login"])?.json(request), path)
            .await?;
        decode(path, body)
    }

    pub async fn me(&self) -> ClientResult<User> {
        let path = "/auth/me";
        let body = self
            .execute(self.request(Method::GET, &["auth", "me"])?, path)
            .await?;
        let response: MeResponse = decode(path, body)?;
        Ok(response.user)
    }

    pub async fn list_clients(&self) -> ClientResult<Vec<Client>> {
        let path = "/clients";
        let body = self
            .execute(self.request(Method::GET, &["clients"])?, path)
            .await?;
        decode(path, body)
    }

    pub async fn create_client(&self, client: &NewClient) -> ClientResult<()> {
        self.execute(
            self.request(Method::POST, &["clients"])?.json(client),
            "/clients",
        )
        .await?;
        Ok(())
    }

    pub async fn update_client(&self, id: &RecordId, patch: &ClientPatch) -> ClientResult<()> {
        let id = id.to_string();
        self.execute(
            self.request(Method::PATCH, &["clients", &id])?.json(patch),
            &format!("/clients/{id}"),
        )
        .await?;
        Ok(())
    }

    pub async fn delete_client(&self, id: &RecordId) -> ClientResult<()> {
        let id = id.to_string();
        self.execute(
            self.request(Method::DELETE, &["clients", &id])?,
            &format!("/clients/{id}"),
        )
        .await?;
        Ok(())
    }

    pub async fn list_tasks(&self, owner: Owner) -> ClientResult<Vec<Task>> {
        let path = format!("/tasks?owner={owner}");
        let body = self
            .execute(
                self.request(Method::GET, &["tasks"])?
                    .query(&[("owner", owner.as_str())]),
                &path,
            )
            .await?;
        decode(&path, body)
    }

    pub async fn create_task(&self, task: &NewTask) -> ClientResult<()> {
        self.execute(self.request(Method::POST, &["tasks"])?.json(task), "/tasks")
            .await?;
        Ok(())
    }

    pub async fn update_task(&self, id: &RecordId, patch: &TaskPatch) -> ClientResult<()> {
        let id = id.to_string();
        self.execute(
            self.request(Method::PATCH, &["tasks", &id])?.json(patch),
            &format!("/tasks/{id}"),
        )
        .await?;
        Ok(())
    }

    pub async fn delete_task(&self, id: &RecordId) -> ClientResult<()> {
        let id = id.to_string();
        self.execute(
            self.request(Method::DELETE, &["tasks", &id])?,
            &format!("/tasks/{id}"),
        )
        .await?;
        Ok(())
    }

    fn endpoint(&self, segments: &[&str]) -> ClientResult<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| {
                ClientError::Validation(format!(
                    "api url '{}' cannot be used as a base url",
                    self.base_url
                ))
            })?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn request(&self, method: Method, segments: &[&str]) -> ClientResult<RequestBuilder> {
        let builder = self
            .http
            .request(method, self.endpoint(segments)?)
            .header(CONTENT_TYPE, "application/json");
        Ok(match &self.token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        })
    }

    /// Sends the request and returns the JSON body. Missing or non-JSON bodies
    /// read as an empty object; non-2xx statuses become [`ClientError::Api`].
    async fn execute(&self, builder: RequestBuilder, path: &str) -> ClientResult<Value> {
        let response = builder.send().await?;
        let status = response.status();
        let bytes = response.bytes().await?;
        let body = serde_json::from_slice::<Value>(&bytes).unwrap_or_else(|_| Value::Object(Map::new()));
        debug!(path, status = status.as_u16(), "api response");

        if !status.is_success() {
            let message = serde_json::from_value::<ApiErrorBody>(body)
                .unwrap_or_default()
                .message_or_default();
            return Err(ClientError::Api {
                status: status.as_u16(),
                message,
            });
        }

        Ok(body)
    }
}

fn decode<T: DeserializeOwned>(path: &str, body: Value) -> ClientResult<T> {
    serde_json::from_value(body).map_err(|err| ClientError::Decode {
        path: path.to_string(),
        reason: err.to_string(),
    })
}

#[cfg(test)]
#[path = "tests/api_tests.rs"]
mod tests;
