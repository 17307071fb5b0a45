use crate::calendar::event::calendar_day;
use crate::calendar::{Category, Event, RepeatFrequency, DEFAULT_CALENDAR_COLOR};
use crate::storage::config::ApiConfig;
use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::{Method, RequestBuilder, Response};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),
    #[error("Request error: {0}")]
    RequestError(String),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Rate limit exceeded")]
    RateLimited,
    #[error("Authentication failed")]
    AuthenticationFailed,
    #[error("Parse error: {0}")]
    ParseError(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self { start, end }
    }

    pub fn days(&self) -> i64 {
        (self.end - self.start).num_days()
    }
}

/// Wire form of an event on the `/calendar/schedules` endpoints.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Schedule {
    #[serde(default, alias = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub date: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(default)]
    pub is_all_day: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub calendar_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repeat: Option<String>,
}

impl Schedule {
    pub fn from_event(event: &Event, include_id: bool) -> Self {
        Self {
            id: include_id.then(|| event.id.clone()),
            title: event.title.clone(),
            description: event.description.clone(),
            date: event.date.format("%Y-%m-%d").to_string(),
            end_date: event.end_date.map(|d| d.format("%Y-%m-%d").to_string()),
            start_time: event.start_time.clone(),
            end_time: event.end_time.clone(),
            category: Some(event.category.as_str().to_string()),
            color: Some(event.color.clone()),
            is_all_day: event.is_all_day,
            calendar_id: Some(event.calendar_id.clone()),
            repeat: event.repeat.map(|r| r.as_str().to_string()),
        }
    }

    /// Events with an unknown calendar keep an empty calendar id; the state
    /// container reassigns them when merging.
    pub fn into_event(self) -> Result<Event, ApiError> {
        let id = self
            .id
            .ok_or_else(|| ApiError::ParseError("Missing schedule id".to_string()))?;
        let date = calendar_day::parse(&self.date)
            .ok_or_else(|| ApiError::ParseError(format!("Invalid schedule date: {}", self.date)))?;
        let end_date = match self.end_date.as_deref() {
            Some(raw) if !raw.is_empty() => Some(
                calendar_day::parse(raw)
                    .ok_or_else(|| ApiError::ParseError(format!("Invalid schedule end date: {}", raw)))?,
            ),
            _ => None,
        };

        let mut event = Event {
            id,
            title: self.title,
            description: self.description,
            date,
            end_date,
            start_time: self.start_time,
            end_time: self.end_time,
            category: self
                .category
                .as_deref()
                .and_then(Category::parse)
                .unwrap_or_default(),
            color: self.color.unwrap_or_else(|| DEFAULT_CALENDAR_COLOR.to_string()),
            is_all_day: self.is_all_day,
            is_multi_day: false,
            calendar_id: self.calendar_id.unwrap_or_default(),
            repeat: self.repeat.as_deref().and_then(RepeatFrequency::parse),
        };
        event.normalize();
        Ok(event)
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommunityPost {
    #[serde(default, alias = "_id")]
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
}

#[derive(Debug, Serialize)]
struct LoginRequest<'a> {
    email: &'a str,
    password: &'a str,
}

#[derive(Debug, Deserialize)]
struct LoginResponse {
    #[serde(alias = "accessToken")]
    token: String,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ScheduleList {
    Bare(Vec<Schedule>),
    Wrapped { schedules: Vec<Schedule> },
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum PostList {
    Bare(Vec<CommunityPost>),
    Wrapped { posts: Vec<CommunityPost> },
}

#[derive(Debug, Deserialize)]
struct CreatedSchedule {
    #[serde(default, alias = "_id")]
    id: Option<String>,
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ScheduleApi {
    /// Exchanges credentials for a bearer token.
    async fn login(&self, email: &str, password: &str) -> Result<String, ApiError>;

    async fn fetch_schedules(&self, date_range: DateRange) -> Result<Vec<Event>, ApiError>;

    /// Returns the id the server assigned.
    async fn create_schedule(&self, event: &Event) -> Result<String, ApiError>;

    async fn update_schedule(&self, event: &Event) -> Result<(), ApiError>;

    async fn delete_schedule(&self, event_id: &str) -> Result<(), ApiError>;

    async fn fetch_posts(&self) -> Result<Vec<CommunityPost>, ApiError>;
}

pub struct ApiClient {
    base_url: String,
    token: Option<String>,
    client: reqwest::Client,
}

impl ApiClient {
    pub fn new(base_url: String, timeout: Duration) -> Result<Self, ApiError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            token: None,
            client,
        })
    }

    pub fn from_config(config: &ApiConfig) -> Result<Self, ApiError> {
        Self::new(config.base_url.clone(), Duration::from_secs(config.timeout_secs))
    }

    pub fn with_token(mut self, token: Option<String>) -> Self {
        self.token = token;
        self
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let builder = self.client.request(method, format!("{}{}", self.base_url, path));
        match &self.token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    async fn check_status(response: Response, subject: &str) -> Result<Response, ApiError> {
        let status = response.status();
        tracing::info!("{} response status: {}", subject, status);

        if status == 401 {
            tracing::error!("Authentication failed: {}", subject);
            return Err(ApiError::AuthenticationFailed);
        }

        if status == 404 {
            tracing::error!("Not found: {}", subject);
            return Err(ApiError::NotFound(subject.to_string()));
        }

        if status == 429 {
            tracing::warn!("Rate limit exceeded");
            return Err(ApiError::RateLimited);
        }

        if !status.is_success() {
            let body = response.text().await?;
            tracing::error!("{} failed. Status: {}, Body: {}", subject, status, body);
            return Err(ApiError::RequestError(format!("Status {}: {}", status, body)));
        }

        Ok(response)
    }
}

#[async_trait]
impl ScheduleApi for ApiClient {
    async fn login(&self, email: &str, password: &str) -> Result<String, ApiError> {
        tracing::info!("Logging in as {}", email);

        let response = self
            .request(Method::POST, "/auth/login")
            .json(&LoginRequest { email, password })
            .send()
            .await?;
        let response = Self::check_status(response, "login").await?;

        let body: LoginResponse = response
            .json()
            .await
            .map_err(|e| ApiError::ParseError(format!("Invalid login response: {}", e)))?;
        Ok(body.token)
    }

    async fn fetch_schedules(&self, date_range: DateRange) -> Result<Vec<Event>, ApiError> {
        let start = date_range.start.format("%Y-%m-%d").to_string();
        let end = date_range.end.format("%Y-%m-%d").to_string();

        tracing::info!("Fetching schedules from {} to {}", start, end);

        let response = self
            .request(Method::GET, "/calendar/schedules")
            .query(&[("startDate", start.as_str()), ("endDate", end.as_str())])
            .send()
            .await?;
        let response = Self::check_status(response, "schedules").await?;

        let list: ScheduleList = response
            .json()
            .await
            .map_err(|e| ApiError::ParseError(format!("Invalid schedule list: {}", e)))?;
        let schedules = match list {
            ScheduleList::Bare(items) | ScheduleList::Wrapped { schedules: items } => items,
        };

        let events: Vec<Event> = schedules
            .into_iter()
            .filter_map(|schedule| match schedule.into_event() {
                Ok(event) => Some(event),
                Err(e) => {
                    tracing::warn!("Skipping schedule: {}", e);
                    None
                }
            })
            .collect();

        tracing::info!("Fetched {} schedules successfully", events.len());
        Ok(events)
    }

    async fn create_schedule(&self, event: &Event) -> Result<String, ApiError> {
        let payload = Schedule::from_event(event, false);

        tracing::info!("Creating schedule: {} on {}", event.title, event.date);
        tracing::debug!("POST /calendar/schedules with payload: {:?}", payload);

        let response = self
            .request(Method::POST, "/calendar/schedules")
            .json(&payload)
            .send()
            .await?;
        let response = Self::check_status(response, "create schedule").await?;

        let created: CreatedSchedule = response
            .json()
            .await
            .map_err(|e| ApiError::ParseError(format!("Invalid create response: {}", e)))?;
        let id = created
            .id
            .ok_or_else(|| ApiError::ParseError("Created schedule has no id".to_string()))?;
        tracing::info!("Schedule created successfully with ID: {}", id);
        Ok(id)
    }

    async fn update_schedule(&self, event: &Event) -> Result<(), ApiError> {
        let payload = Schedule::from_event(event, true);
        let path = format!("/calendar/schedules/{}", event.id);

        tracing::info!("Updating schedule {}: {}", event.id, event.title);
        tracing::debug!("PUT {} with payload: {:?}", path, payload);

        let response = self.request(Method::PUT, &path).json(&payload).send().await?;
        Self::check_status(response, &format!("schedule {}", event.id)).await?;

        tracing::info!("Schedule {} updated successfully", event.id);
        Ok(())
    }

    async fn delete_schedule(&self, event_id: &str) -> Result<(), ApiError> {
        let path = format!("/calendar/schedules/{}", event_id);

        let response = self.request(Method::DELETE, &path).send().await?;
        Self::check_status(response, &format!("schedule {}", event_id)).await?;

        tracing::info!("Schedule {} deleted", event_id);
        Ok(())
    }

    async fn fetch_posts(&self) -> Result<Vec<CommunityPost>, ApiError> {
        let response = self.request(Method::GET, "/community/posts").send().await?;
        let response = Self::check_status(response, "community posts").await?;

        let list: PostList = response
            .json()
            .await
            .map_err(|e| ApiError::ParseError(format!("Invalid post list: {}", e)))?;
        Ok(match list {
            PostList::Bare(posts) | PostList::Wrapped { posts } => posts,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn date(year: i32, month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, day).unwrap()
    }

    fn client(server: &MockServer) -> ApiClient {
        ApiClient::new(server.uri(), Duration::from_secs(5))
            .unwrap()
            .with_token(Some("tok".to_string()))
    }

    #[test]
    fn date_range_calculates_days() {
        let range = DateRange::new(date(2025, 1, 1), date(2025, 1, 8));

        assert_eq!(range.days(), 7);
    }

    #[test]
    fn client_strips_trailing_slash_from_base_url() {
        let client = ApiClient::new("http://localhost:8080/".to_string(), Duration::from_secs(1)).unwrap();

        assert_eq!(client.base_url, "http://localhost:8080");
    }

    #[test]
    fn repeat_travels_over_the_wire() {
        let event = crate::calendar::EventDraft::new("Review", date(2024, 6, 3), "cal")
            .with_repeat(RepeatFrequency::Monthly)
            .into_event("e1".to_string(), "#BAE1FF".to_string())
            .unwrap();

        let body = serde_json::to_value(Schedule::from_event(&event, true)).unwrap();
        assert_eq!(body["repeat"], "monthly");

        let pulled: Schedule = serde_json::from_value(body).unwrap();
        assert_eq!(pulled.into_event().unwrap().repeat, Some(RepeatFrequency::Monthly));
    }

    #[test]
    fn unknown_repeat_value_is_dropped() {
        let pulled: Schedule = serde_json::from_value(json!({
            "id": "e1", "title": "Review", "date": "2024-06-03", "repeat": "fortnightly"
        }))
        .unwrap();

        assert_eq!(pulled.into_event().unwrap().repeat, None);
    }

    #[test]
    fn schedule_without_id_cannot_become_event() {
        let schedule = Schedule {
            id: None,
            title: "Lunch".to_string(),
            description: None,
            date: "2024-06-03".to_string(),
            end_date: None,
            start_time: None,
            end_time: None,
            category: None,
            color: None,
            is_all_day: true,
            calendar_id: None,
            repeat: None,
        };

        assert!(matches!(schedule.into_event(), Err(ApiError::ParseError(_))));
    }

    #[tokio::test]
    async fn login_accepts_access_token_alias() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/auth/login"))
            .and(body_json(json!({"email": "a@b.c", "password": "pw"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"accessToken": "xyz"})))
            .mount(&server)
            .await;

        let token = client(&server).login("a@b.c", "pw").await.unwrap();

        assert_eq!(token, "xyz");
    }

    #[tokio::test]
    async fn fetch_sends_range_and_bearer_token() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/calendar/schedules"))
            .and(query_param("startDate", "2024-05-26"))
            .and(query_param("endDate", "2024-07-06"))
            .and(header("authorization", "Bearer tok"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                {"id": "s1", "title": "Trip", "date": "2024-06-03", "endDate": "2024-06-05",
                 "category": "family", "color": "#FFB3BA", "calendarId": "primary"},
                {"title": "No id", "date": "2024-06-04"}
            ])))
            .mount(&server)
            .await;

        let events = client(&server)
            .fetch_schedules(DateRange::new(date(2024, 5, 26), date(2024, 7, 6)))
            .await
            .unwrap();

        assert_eq!(events.len(), 1);
        assert_eq!(events[0].id, "s1");
        assert!(events[0].is_multi_day);
        assert_eq!(events[0].category, Category::Family);
    }

    #[tokio::test]
    async fn fetch_accepts_wrapped_list() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/calendar/schedules"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "schedules": [{"_id": "s2", "title": "Gym", "date": "2024-06-10",
                               "startTime": "07:00", "endTime": "08:00"}]
            })))
            .mount(&server)
            .await;

        let events = client(&server)
            .fetch_schedules(DateRange::new(date(2024, 6, 1), date(2024, 6, 30)))
            .await
            .unwrap();

        assert_eq!(events.len(), 1);
        assert_eq!(events[0].start_time.as_deref(), Some("07:00"));
        assert!(!events[0].is_all_day);
    }

    #[tokio::test]
    async fn status_codes_map_to_errors() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/community/posts"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;
        Mock::given(method("DELETE"))
            .and(path("/calendar/schedules/missing"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;
        Mock::given(method("PUT"))
            .respond_with(ResponseTemplate::new(429))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/calendar/schedules"))
            .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
            .mount(&server)
            .await;

        let api = client(&server);
        let event = Schedule {
            id: Some("e1".to_string()),
            title: "Review".to_string(),
            description: None,
            date: "2024-06-03".to_string(),
            end_date: None,
            start_time: None,
            end_time: None,
            category: None,
            color: None,
            is_all_day: true,
            calendar_id: None,
            repeat: None,
        }
        .into_event()
        .unwrap();

        assert!(matches!(api.fetch_posts().await, Err(ApiError::AuthenticationFailed)));
        assert!(matches!(api.delete_schedule("missing").await, Err(ApiError::NotFound(_))));
        assert!(matches!(api.update_schedule(&event).await, Err(ApiError::RateLimited)));
        match api.create_schedule(&event).await {
            Err(ApiError::RequestError(message)) => assert!(message.contains("boom")),
            other => panic!("expected request error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn create_returns_server_id() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/calendar/schedules"))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({"id": "srv-7", "title": "x"})))
            .mount(&server)
            .await;
        let event = Schedule {
            id: Some("local".to_string()),
            title: "Dentist".to_string(),
            description: None,
            date: "2024-06-03".to_string(),
            end_date: None,
            start_time: Some("10:00".to_string()),
            end_time: Some("11:00".to_string()),
            category: Some("health".to_string()),
            color: None,
            is_all_day: false,
            calendar_id: Some("primary".to_string()),
            repeat: None,
        }
        .into_event()
        .unwrap();

        let id = client(&server).create_schedule(&event).await.unwrap();

        assert_eq!(id, "srv-7");
    }

    #[tokio::test]
    async fn posts_are_listed() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/community/posts"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "posts": [{"id": "p1", "title": "Book club", "content": "Thursdays", "author": "sam"}]
            })))
            .mount(&server)
            .await;

        let posts = client(&server).fetch_posts().await.unwrap();

        assert_eq!(posts.len(), 1);
        assert_eq!(posts[0].author.as_deref(), Some("sam"));
    }
}
