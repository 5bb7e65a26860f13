use std::path::Path;
use std::time::Duration;

use auditor_logging::auditor_info;
use reqwest::multipart::{Form, Part};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use url::Url;

use crate::ApiError;

#[derive(Debug, Clone)]
pub struct ApiSettings {
    pub base_url: String,
    /// Sent as a bearer token when present.
    pub auth_token: Option<String>,
    pub company_id: String,
    pub user_id: String,
    pub request_timeout: Duration,
}

impl Default for ApiSettings {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000/".to_string(),
            auth_token: None,
            company_id: String::new(),
            user_id: String::new(),
            request_timeout: Duration::from_secs(30),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Project {
    #[serde(rename = "_id", deserialize_with = "id_string")]
    pub id: String,
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Employee {
    #[serde(rename = "_id", deserialize_with = "id_string")]
    pub id: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
}

/// JSON body of the create-task call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewTask {
    pub task_name: String,
    pub description: String,
    pub due_date: String,
    pub user_id: String,
    pub project_id: String,
    pub collaborators: Vec<String>,
}

#[derive(Deserialize)]
struct ProjectList {
    #[serde(default)]
    projects: Vec<Project>,
}

#[derive(Deserialize)]
struct EmployeeList {
    #[serde(default)]
    data: Vec<Employee>,
}

#[async_trait::async_trait]
pub trait TaskApi: Send + Sync {
    async fn list_projects(&self) -> Result<Vec<Project>, ApiError>;
    async fn list_employees(&self) -> Result<Vec<Employee>, ApiError>;
    /// Creates a task and returns its id.
    async fn create_task(&self, task: &NewTask) -> Result<String, ApiError>;
    /// Uploads `path` as the task's attachment and returns the stored file URL.
    async fn upload_attachment(&self, task_id: &str, path: &Path) -> Result<String, ApiError>;
}

#[derive(Debug, Clone)]
pub struct ReqwestTaskApi {
    settings: ApiSettings,
    client: reqwest::Client,
}

impl ReqwestTaskApi {
    pub fn new(settings: ApiSettings) -> Result<Self, ApiError> {
        let client = reqwest::Client::builder()
            .timeout(settings.request_timeout)
            .build()
            .map_err(|err| ApiError::Network(err.to_string()))?;
        Ok(Self { settings, client })
    }

    fn endpoint(&self, path: &str) -> Result<Url, ApiError> {
        let mut base = self.settings.base_url.trim().to_string();
        if !base.ends_with('/') {
            base.push('/');
        }
        Url::parse(&base)
            .and_then(|base| base.join(path))
            .map_err(|err| ApiError::InvalidUrl(err.to_string()))
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match self.settings.auth_token.as_deref() {
            Some(token) if !token.is_empty() => request.bearer_auth(token),
            _ => request,
        }
    }

    async fn send_json<T: DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
    ) -> Result<T, ApiError> {
        let response = self.authorize(request).send().await.map_err(map_reqwest_error)?;
        let status = response.status();
        if !status.is_success() {
            return Err(ApiError::HttpStatus {
                status: status.as_u16(),
            });
        }
        response
            .json::<T>()
            .await
            .map_err(|err| ApiError::Decode(err.to_string()))
    }
}

#[async_trait::async_trait]
impl TaskApi for ReqwestTaskApi {
    async fn list_projects(&self) -> Result<Vec<Project>, ApiError> {
        let url = self.endpoint(&format!("project/company/{}/", self.settings.company_id))?;
        let list: ProjectList = self.send_json(self.client.get(url)).await?;
        Ok(list.projects)
    }

    async fn list_employees(&self) -> Result<Vec<Employee>, ApiError> {
        let url = self.endpoint(&format!("employee/list/{}/", self.settings.company_id))?;
        let list: EmployeeList = self.send_json(self.client.get(url)).await?;
        Ok(list.data)
    }

    async fn create_task(&self, task: &NewTask) -> Result<String, ApiError> {
        let url = self.endpoint(&format!("create-task/{}/", self.settings.user_id))?;
        let body: Value = self.send_json(self.client.post(url).json(task)).await?;
        let task_id = body
            .get("taskId")
            .and_then(value_to_id)
            .ok_or_else(|| ApiError::Decode("response has no taskId".to_string()))?;
        auditor_info!("Created task {} ({})", task_id, task.task_name);
        Ok(task_id)
    }

    async fn upload_attachment(&self, task_id: &str, path: &Path) -> Result<String, ApiError> {
        let bytes = tokio::fs::read(path)
            .await
            .map_err(|err| ApiError::Attachment {
                path: path.display().to_string(),
                message: err.to_string(),
            })?;
        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "attachment".to_string());
        let form = Form::new().part("file", Part::bytes(bytes).file_name(file_name));

        let url = self.endpoint(&format!("api/task/{task_id}/upload/"))?;
        let body: Value = self
            .send_json(self.client.post(url).multipart(form))
            .await?;
        body.get("file_url")
            .and_then(Value::as_str)
            .map(ToOwned::to_owned)
            .ok_or_else(|| ApiError::Decode("response has no file_url".to_string()))
    }
}

fn value_to_id(value: &Value) -> Option<String> {
    match value {
        Value::String(text) => Some(text.clone()),
        Value::Number(number) => Some(number.to_string()),
        _ => None,
    }
}

fn id_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    value_to_id(&value).ok_or_else(|| serde::de::Error::custom("id must be a string or number"))
}

fn map_reqwest_error(err: reqwest::Error) -> ApiError {
    if err.is_timeout() {
        return ApiError::Timeout;
    }
    ApiError::Network(err.to_string())
}
