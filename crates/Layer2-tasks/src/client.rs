//! Task service client
//!
//! One method per REST operation, one round trip per call. No retries and
//! no caching; every failure goes back to the caller.

use crate::error::TaskClientError;
use crate::task::{Task, TaskId};
use codepad_foundation::{ApiConfig, DEFAULT_API_URL};
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Result alias for task operations
pub type Result<T> = std::result::Result<T, TaskClientError>;

/// Client for `{base_url}/tasks`
#[derive(Debug, Clone)]
pub struct TaskClient {
    client: Client,
    base_url: String,
}

impl TaskClient {
    /// Create a client for `base_url` with the default timeout
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        Self::with_timeout(base_url, Duration::from_secs(DEFAULT_TIMEOUT_SECS))
    }

    pub fn with_timeout(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| TaskClientError::Transport(format!("failed to create HTTP client: {}", e)))?;
        Ok(Self::with_client(client, base_url))
    }

    /// Use an existing `reqwest::Client`
    pub fn with_client(client: Client, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { client, base_url }
    }

    pub fn from_config(config: &ApiConfig) -> Result<Self> {
        Self::with_timeout(&config.base_url, config.timeout())
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn tasks_url(&self) -> String {
        format!("{}/tasks", self.base_url)
    }

    fn task_url(&self, id: &TaskId) -> String {
        format!("{}/tasks/{}", self.base_url, urlencoding::encode(id.as_str()))
    }

    // ========================================================================
    // Operations
    // ========================================================================

    /// `GET /tasks`
    pub async fn list_tasks(&self) -> Result<Vec<Task>> {
        let url = self.tasks_url();
        debug!("GET {}", url);
        let response = self.client.get(&url).send().await?;
        decode(response).await
    }

    /// `GET /tasks/{id}`
    pub async fn get_task(&self, id: impl Into<TaskId>) -> Result<Task> {
        let url = self.task_url(&id.into());
        debug!("GET {}", url);
        let response = self.client.get(&url).send().await?;
        decode(response).await
    }

    /// `POST /tasks`
    pub async fn create_task<T: Serialize + ?Sized>(&self, data: &T) -> Result<Task> {
        let url = self.tasks_url();
        debug!("POST {}", url);
        let response = self.client.post(&url).json(data).send().await?;
        decode(response).await
    }

    /// `PUT /tasks/{id}`
    pub async fn update_task<T: Serialize + ?Sized>(
        &self,
        id: impl Into<TaskId>,
        data: &T,
    ) -> Result<Task> {
        let url = self.task_url(&id.into());
        debug!("PUT {}", url);
        let response = self.client.put(&url).json(data).send().await?;
        decode(response).await
    }

    /// `DELETE /tasks/{id}`; returns the service's confirmation body
    /// (`Value::Null` when the body is empty)
    pub async fn delete_task(&self, id: impl Into<TaskId>) -> Result<Value> {
        let url = self.task_url(&id.into());
        debug!("DELETE {}", url);
        let response = self.client.delete(&url).send().await?;

        let body = read_success_body(response).await?;
        if body.trim().is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_str(&body).map_err(|e| TaskClientError::Decode(e.to_string()))
    }
}

impl Default for TaskClient {
    fn default() -> Self {
        Self::with_client(Client::new(), DEFAULT_API_URL)
    }
}

/// Body of a 2xx response, or `HttpStatus` carrying the error body
async fn read_success_body(response: Response) -> Result<String> {
    let status = response.status();
    let body = response.text().await?;

    if !status.is_success() {
        debug!("Task service answered {}", status);
        return Err(TaskClientError::HttpStatus {
            status: status.as_u16(),
            body,
        });
    }

    Ok(body)
}

async fn decode<T: DeserializeOwned>(response: Response) -> Result<T> {
    let body = read_success_body(response).await?;
    serde_json::from_str(&body).map_err(|e| TaskClientError::Decode(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;
    use serde_json::json;

    async fn client_for(server: &mockito::ServerGuard) -> TaskClient {
        TaskClient::new(format!("{}/api/", server.url())).unwrap()
    }

    #[tokio::test]
    async fn test_list_tasks() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/api/tasks")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"[{"id":1,"title":"a"},{"id":"two","title":"b"}]"#)
            .create_async()
            .await;

        let tasks = client_for(&server).await.list_tasks().await.unwrap();

        mock.assert_async().await;
        assert_eq!(tasks.len(), 2);
        assert_eq!(tasks[0].id.as_str(), "1");
        assert_eq!(tasks[1].title(), Some("b"));
    }

    #[tokio::test]
    async fn test_get_missing_task_is_404() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/api/tasks/missing")
            .with_status(404)
            .with_body(r#"{"error":"Task not found"}"#)
            .create_async()
            .await;

        let err = client_for(&server)
            .await
            .get_task("missing")
            .await
            .unwrap_err();

        assert_eq!(
            err,
            TaskClientError::HttpStatus {
                status: 404,
                body: r#"{"error":"Task not found"}"#.to_string(),
            }
        );
    }

    #[tokio::test]
    async fn test_create_sends_json_body() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/api/tasks")
            .match_header("content-type", "application/json")
            .match_body(Matcher::Json(json!({ "title": "New", "status": "open" })))
            .with_status(201)
            .with_body(r#"{"id":"n1","title":"New","status":"open"}"#)
            .create_async()
            .await;

        let task = client_for(&server)
            .await
            .create_task(&json!({ "title": "New", "status": "open" }))
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(task.id.as_str(), "n1");
        assert_eq!(task.status(), Some("open"));
    }

    #[tokio::test]
    async fn test_update_puts_to_task_url() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("PUT", "/api/tasks/7")
            .match_body(Matcher::Json(json!({ "status": "done" })))
            .with_status(200)
            .with_body(r#"{"id":7,"status":"done"}"#)
            .create_async()
            .await;

        let task = client_for(&server)
            .await
            .update_task(7u64, &json!({ "status": "done" }))
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(task.status(), Some("done"));
    }

    #[tokio::test]
    async fn test_delete_confirmation_and_empty_body() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("DELETE", "/api/tasks/a")
            .with_status(200)
            .with_body(r#"{"message":"Task deleted"}"#)
            .create_async()
            .await;
        server
            .mock("DELETE", "/api/tasks/b")
            .with_status(204)
            .create_async()
            .await;

        let client = client_for(&server).await;
        assert_eq!(
            client.delete_task("a").await.unwrap(),
            json!({ "message": "Task deleted" })
        );
        assert_eq!(client.delete_task("b").await.unwrap(), Value::Null);
    }

    #[tokio::test]
    async fn test_ids_are_percent_encoded() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/api/tasks/a%2Fb")
            .with_status(200)
            .with_body(r#"{"id":"a/b"}"#)
            .create_async()
            .await;

        let task = client_for(&server).await.get_task("a/b").await.unwrap();

        mock.assert_async().await;
        assert_eq!(task.id.as_str(), "a/b");
    }

    #[tokio::test]
    async fn test_undecodable_success_body() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/api/tasks")
            .with_status(200)
            .with_body("<html>not json</html>")
            .create_async()
            .await;

        let err = client_for(&server).await.list_tasks().await.unwrap_err();
        assert!(matches!(err, TaskClientError::Decode(_)));
    }

    #[tokio::test]
    async fn test_unreachable_server_is_transport_error() {
        // port 9 (discard) on localhost is expected to refuse connections
        let client =
            TaskClient::with_timeout("http://127.0.0.1:9/api", Duration::from_secs(2)).unwrap();

        let err = client.list_tasks().await.unwrap_err();
        assert!(matches!(err, TaskClientError::Transport(_)));
    }

    #[test]
    fn test_base_url_trailing_slash() {
        let client = TaskClient::with_client(Client::new(), "http://host/api///");
        assert_eq!(client.base_url(), "http://host/api");
        assert_eq!(client.tasks_url(), "http://host/api/tasks");
        assert_eq!(
            client.task_url(&TaskId::from("x y")),
            "http://host/api/tasks/x%20y"
        );
    }
}
