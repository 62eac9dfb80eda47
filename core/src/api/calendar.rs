use super::CALENDAR_PREFIX;
use crate::client::ApiClient;
use crate::error::ApiError;
use crate::http::RequestBody;
use crate::transport::Transport;
use crate::types::{Ack, CalendarEvent, CalendarEventUpdate, ConfirmResult, ListParams, NewCalendarEvent};

impl<T: Transport> ApiClient<T> {
    pub async fn list_events(&self, params: ListParams) -> Result<Vec<CalendarEvent>, ApiError> {
        self.get(&format!("{CALENDAR_PREFIX}/"), params.to_query())
            .await?
            .into_typed()
    }

    pub async fn get_event(&self, id: i64) -> Result<CalendarEvent, ApiError> {
        self.get(&format!("{CALENDAR_PREFIX}/{id}"), Vec::<(&str, &str)>::new())
            .await?
            .into_typed()
    }

    pub async fn create_event(&self, event: &NewCalendarEvent) -> Result<CalendarEvent, ApiError> {
        let body = RequestBody::json(event)?;
        self.post(&format!("{CALENDAR_PREFIX}/"), Some(body))
            .await?
            .into_typed()
    }

    pub async fn update_event(&self, id: i64, update: &CalendarEventUpdate) -> Result<CalendarEvent, ApiError> {
        let body = RequestBody::json(update)?;
        self.put(&format!("{CALENDAR_PREFIX}/{id}"), Some(body))
            .await?
            .into_typed()
    }

    pub async fn delete_event(&self, id: i64) -> Result<Ack, ApiError> {
        self.delete(&format!("{CALENDAR_PREFIX}/{id}"), None)
            .await?
            .into_typed()
    }

    /// Push a pending event to Google Calendar; the local record is removed
    /// server-side on success.
    pub async fn confirm_event(&self, id: i64) -> Result<ConfirmResult, ApiError> {
        self.post(&format!("{CALENDAR_PREFIX}/{id}/confirm"), None)
            .await?
            .into_typed()
    }
}
