use super::EMAILS_PREFIX;
use crate::client::ApiClient;
use crate::error::ApiError;
use crate::http::RequestBody;
use crate::transport::Transport;
use crate::types::{
    Ack, Email, GenerateEmailRequest, GenerateEmailResponse, ListParams, ProcessEmailsRequest,
    ProcessSummary, SendEmailRequest,
};

impl<T: Transport> ApiClient<T> {
    pub async fn list_emails(&self, params: ListParams) -> Result<Vec<Email>, ApiError> {
        self.get(&format!("{EMAILS_PREFIX}/"), params.to_query())
            .await?
            .into_typed()
    }

    pub async fn get_email(&self, id: i64) -> Result<Email, ApiError> {
        self.get(&format!("{EMAILS_PREFIX}/{id}"), Vec::<(&str, &str)>::new())
            .await?
            .into_typed()
    }

    /// Ask the backend to pull unread mail and derive calendar events from it.
    pub async fn process_emails(&self, request: &ProcessEmailsRequest) -> Result<ProcessSummary, ApiError> {
        let body = RequestBody::json(request)?;
        self.post(&format!("{EMAILS_PREFIX}/process"), Some(body))
            .await?
            .into_typed()
    }

    pub async fn delete_email(&self, id: i64) -> Result<Ack, ApiError> {
        self.delete(&format!("{EMAILS_PREFIX}/{id}"), None)
            .await?
            .into_typed()
    }

    pub async fn generate_email(&self, request: &GenerateEmailRequest) -> Result<GenerateEmailResponse, ApiError> {
        let body = RequestBody::json(request)?;
        self.post(&format!("{EMAILS_PREFIX}/generate"), Some(body))
            .await?
            .into_typed()
    }

    pub async fn send_email(&self, request: &SendEmailRequest) -> Result<Ack, ApiError> {
        let body = RequestBody::json(request)?;
        self.post(&format!("{EMAILS_PREFIX}/send"), Some(body))
            .await?
            .into_typed()
    }
}
