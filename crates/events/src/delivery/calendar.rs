//! Calendar service client.
//!
//! [`HttpCalendarClient`] talks JSON to the calendar API that fronts the
//! organisation's shared calendars. Configuration is loaded from environment
//! variables; if `CALENDAR_API_URL` is not set, [`CalendarConfig::from_env`]
//! returns `None` and [`DisabledCalendar`] should be used instead.

use std::time::Duration;

use async_trait::async_trait;
use rollout_core::outbox::CalendarEvent;

/// HTTP request timeout for a single call.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

// ---------------------------------------------------------------------------
// Error
// ---------------------------------------------------------------------------

/// Error type for calendar service failures.
#[derive(Debug, thiserror::Error)]
pub enum CalendarError {
    /// The underlying HTTP request failed (network, DNS, timeout, etc.).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The calendar service returned a non-2xx status code.
    #[error("Calendar service returned HTTP {0}")]
    HttpStatus(u16),

    /// `CALENDAR_API_URL` is not an absolute http(s) URL.
    #[error("Invalid calendar API URL: {0}")]
    InvalidBaseUrl(String),
}

impl CalendarError {
    /// Whether retrying the same call can never succeed.
    ///
    /// Client errors other than timeouts and rate limiting are permanent.
    pub fn is_permanent(&self) -> bool {
        match self {
            CalendarError::Request(_) => false,
            CalendarError::InvalidBaseUrl(_) => true,
            CalendarError::HttpStatus(code) => {
                (400..500).contains(code) && *code != 408 && *code != 429
            }
        }
    }
}

// ---------------------------------------------------------------------------
// CalendarService
// ---------------------------------------------------------------------------

/// Remote calendar operations used by the outbox dispatcher.
#[async_trait]
pub trait CalendarService: Send + Sync {
    /// Create or replace an event.
    async fn upsert_event(&self, event: &CalendarEvent) -> Result<(), CalendarError>;

    /// Delete an event. Deleting an event that no longer exists succeeds.
    async fn delete_event(&self, calendar_id: &str, event_id: &str) -> Result<(), CalendarError>;
}

// ---------------------------------------------------------------------------
// CalendarConfig
// ---------------------------------------------------------------------------

/// Connection settings for the calendar API.
#[derive(Debug, Clone)]
pub struct CalendarConfig {
    /// Base URL, e.g. `https://calendar.internal/api`.
    pub base_url: String,
    /// Bearer token sent with every request.
    pub api_token: Option<String>,
}

impl CalendarConfig {
    /// Load configuration from environment variables.
    ///
    /// | Variable             | Required | Default |
    /// |----------------------|----------|---------|
    /// | `CALENDAR_API_URL`   | yes      | -       |
    /// | `CALENDAR_API_TOKEN` | no       | -       |
    pub fn from_env() -> Option<Self> {
        let base_url = std::env::var("CALENDAR_API_URL").ok()?;
        Some(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_token: std::env::var("CALENDAR_API_TOKEN").ok(),
        })
    }
}

// ---------------------------------------------------------------------------
// HttpCalendarClient
// ---------------------------------------------------------------------------

/// Calendar service reached over HTTP.
///
/// Events are addressed as `{base_url}/calendars/{calendar_id}/events/{event_id}`
/// with both ids percent-encoded as single path segments; upserts are `PUT`
/// with a JSON body, deletes are `DELETE`.
pub struct HttpCalendarClient {
    client: reqwest::Client,
    base_url: reqwest::Url,
    api_token: Option<String>,
}

impl HttpCalendarClient {
    pub fn new(config: CalendarConfig) -> Result<Self, CalendarError> {
        let base_url = reqwest::Url::parse(&config.base_url)
            .map_err(|e| CalendarError::InvalidBaseUrl(format!("{}: {e}", config.base_url)))?;
        if base_url.cannot_be_a_base() {
            return Err(CalendarError::InvalidBaseUrl(config.base_url));
        }
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(Self {
            client,
            base_url,
            api_token: config.api_token,
        })
    }

    fn event_url(&self, calendar_id: &str, event_id: &str) -> reqwest::Url {
        let mut url = self.base_url.clone();
        // Checked in `new`: the base URL always has path segments.
        if let Ok(mut segments) = url.path_segments_mut() {
            segments
                .pop_if_empty()
                .extend(["calendars", calendar_id, "events", event_id]);
        }
        url
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.api_token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }
}

#[async_trait]
impl CalendarService for HttpCalendarClient {
    async fn upsert_event(&self, event: &CalendarEvent) -> Result<(), CalendarError> {
        let url = self.event_url(&event.calendar_id, &event.event_id);
        let body = serde_json::json!({
            "summary": event.name,
            "description": event.description,
            "attendees": event.attendees,
            "date": event.date,
            "start_time": event.start_time,
            "end_time": event.end_time,
        });
        let response = self
            .authorize(self.client.put(url))
            .json(&body)
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(CalendarError::HttpStatus(response.status().as_u16()));
        }
        tracing::debug!(event_id = %event.event_id, calendar_id = %event.calendar_id, "Calendar event upserted");
        Ok(())
    }

    async fn delete_event(&self, calendar_id: &str, event_id: &str) -> Result<(), CalendarError> {
        let url = self.event_url(calendar_id, event_id);
        let response = self.authorize(self.client.delete(url)).send().await?;
        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND || status == reqwest::StatusCode::GONE {
            tracing::debug!(event_id, calendar_id, "Calendar event already absent");
            return Ok(());
        }
        if !status.is_success() {
            return Err(CalendarError::HttpStatus(status.as_u16()));
        }
        tracing::debug!(event_id, calendar_id, "Calendar event deleted");
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// DisabledCalendar
// ---------------------------------------------------------------------------

/// Stand-in used when no calendar API is configured. Every call succeeds.
pub struct DisabledCalendar;

#[async_trait]
impl CalendarService for DisabledCalendar {
    async fn upsert_event(&self, event: &CalendarEvent) -> Result<(), CalendarError> {
        tracing::debug!(event_id = %event.event_id, "Calendar sync disabled, skipping upsert");
        Ok(())
    }

    async fn delete_event(&self, _calendar_id: &str, event_id: &str) -> Result<(), CalendarError> {
        tracing::debug!(event_id, "Calendar sync disabled, skipping delete");
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
