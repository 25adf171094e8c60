use std::future::Future;
use std::time::Duration;

use chrono::NaiveDate;
use futures::stream::{self, StreamExt, TryStreamExt};
use serde_json::Value;
use tokio_retry::{strategy::ExponentialBackoff, RetryIf};
use tracing::{debug, warn};

use crate::error::ApiError;
use crate::schedule::week_days;

pub const DEFAULT_BASE_URL: &str = "https://v1.american-football.api-sports.io";
pub const DEFAULT_LEAGUE_ID: u32 = 1;
const GAMES_ENDPOINT: &str = "/games";
const API_KEY_HEADER: &str = "x-apisports-key";

/// Days of one week window fetched at the same time.
const DAY_CONCURRENCY: usize = 3;

/// Connection settings for [`ApiSportsClient`].
#[derive(Debug, Clone)]
pub struct ClientSettings {
    pub base_url: String,
    pub league_id: u32,
    pub timeout: Duration,
    /// IANA zone the API reports dates in; the API defaults to UTC.
    pub timezone: Option<String>,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            league_id: DEFAULT_LEAGUE_ID,
            timeout: Duration::from_secs(20),
            timezone: None,
        }
    }
}

/// Thin client over the API-Sports `/games` endpoint.
#[derive(Debug, Clone)]
pub struct ApiSportsClient {
    http: reqwest::Client,
    settings: ClientSettings,
    api_key: String,
}

impl ApiSportsClient {
    pub fn new(settings: ClientSettings, api_key: String) -> Result<Self, ApiError> {
        if api_key.trim().is_empty() {
            return Err(ApiError::MissingKey);
        }
        let http = reqwest::Client::builder()
            .timeout(settings.timeout)
            .user_agent(concat!("nfl-lines/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            http,
            settings,
            api_key,
        })
    }

    pub fn settings(&self) -> &ClientSettings {
        &self.settings
    }

    fn games_url(&self) -> String {
        format!("{}{}", self.settings.base_url.trim_end_matches('/'), GAMES_ENDPOINT)
    }

    async fn get_games_once(&self, date: NaiveDate, season: Option<i32>) -> Result<Vec<Value>, ApiError> {
        let mut query: Vec<(&str, String)> = vec![
            ("league", self.settings.league_id.to_string()),
            ("date", date.to_string()),
        ];
        if let Some(season) = season {
            query.push(("season", season.to_string()));
        }
        if let Some(tz) = &self.settings.timezone {
            query.push(("timezone", tz.clone()));
        }

        let response = self
            .http
            .get(self.games_url())
            .header(API_KEY_HEADER, &self.api_key)
            .query(&query)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ApiError::Status { status, body });
        }

        let body: Value = response.json().await?;
        parse_games_response(body)
    }

    /// All games on one calendar day.
    pub async fn games_by_date(&self, date: NaiveDate, season: Option<i32>) -> Result<Vec<Value>, ApiError> {
        let games = with_retry(|| self.get_games_once(date, season)).await?;
        debug!(%date, games = games.len(), "fetched games");
        Ok(games)
    }

    /// Games for each of `days`, concatenated in day order.
    pub async fn games_for_days(&self, days: &[NaiveDate], season: Option<i32>) -> Result<Vec<Value>, ApiError> {
        let per_day: Vec<Vec<Value>> = stream::iter(days.iter().copied())
            .map(|day| self.games_by_date(day, season))
            .buffered(DAY_CONCURRENCY)
            .try_collect()
            .await?;
        Ok(per_day.into_iter().flatten().collect())
    }

    /// Games for every day of a week window, Thursday through Tuesday.
    pub async fn games_for_week(&self, season: i32, week: u32) -> Result<Vec<Value>, ApiError> {
        let days = week_days(season, week)?;
        self.games_for_days(&days, Some(season)).await
    }
}

/// Run `op` with exponential backoff (100ms doubling, capped at 5s, three
/// retries). Only rate limits, server errors and transport failures are
/// retried.
async fn with_retry<F, Fut, T>(op: F) -> Result<T, ApiError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, ApiError>>,
{
    let retry_strategy = ExponentialBackoff::from_millis(100)
        .max_delay(Duration::from_secs(5))
        .take(3);

    RetryIf::start(retry_strategy, op, |e: &ApiError| {
        let retry = e.is_retryable();
        if retry {
            warn!(error = %e, "request failed, retrying");
        }
        retry
    })
    .await
}

/// Anything that can supply raw games for a list of days.
pub trait GameSource {
    fn fetch_days(
        &self,
        days: &[NaiveDate],
        season: Option<i32>,
    ) -> impl Future<Output = Result<Vec<Value>, ApiError>>;
}

impl GameSource for ApiSportsClient {
    fn fetch_days(
        &self,
        days: &[NaiveDate],
        season: Option<i32>,
    ) -> impl Future<Output = Result<Vec<Value>, ApiError>> {
        self.games_for_days(days, season)
    }
}

/// Pull the `response` array out of an API body.
///
/// API-Sports reports some failures (bad key, plan limits) with HTTP 200 and
/// a non-empty `errors` field, so that is checked first.
pub fn parse_games_response(body: Value) -> Result<Vec<Value>, ApiError> {
    let errors_present = match body.get("errors") {
        Some(Value::Object(map)) => !map.is_empty(),
        Some(Value::Array(list)) => !list.is_empty(),
        _ => false,
    };
    if errors_present {
        let errors = body.get("errors").map(Value::to_string).unwrap_or_default();
        return Err(ApiError::Payload(errors));
    }

    match body {
        Value::Object(mut map) => match map.remove("response") {
            Some(Value::Array(games)) => Ok(games),
            Some(Value::Null) | None => Ok(Vec::new()),
            Some(other) => Err(ApiError::Payload(format!(
                "expected 'response' to be an array, got {}",
                other
            ))),
        },
        _ => Ok(Vec::new()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_parse_response_array() {
        let body = json!({"get": "games", "errors": [], "results": 2, "response": [{"a": 1}, {"b": 2}]});
        let games = parse_games_response(body).unwrap();
        assert_eq!(games.len(), 2);
    }

    #[test]
    fn test_parse_missing_response_is_empty() {
        assert!(parse_games_response(json!({"results": 0})).unwrap().is_empty());
        assert!(parse_games_response(json!([1, 2, 3])).unwrap().is_empty());
    }

    #[test]
    fn test_parse_errors_object() {
        let body = json!({"errors": {"token": "Error/Missing application key."}, "response": []});
        match parse_games_response(body) {
            Err(ApiError::Payload(msg)) => assert!(msg.contains("application key")),
            other => panic!("expected payload error, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_non_array_response() {
        let body = json!({"errors": [], "response": "oops"});
        assert!(matches!(parse_games_response(body), Err(ApiError::Payload(_))));
    }

    #[test]
    fn test_empty_key_rejected() {
        let result = ApiSportsClient::new(ClientSettings::default(), "  ".to_string());
        assert!(matches!(result, Err(ApiError::MissingKey)));
    }

    fn unavailable() -> ApiError {
        ApiError::Status {
            status: reqwest::StatusCode::SERVICE_UNAVAILABLE,
            body: String::new(),
        }
    }

    #[tokio::test]
    async fn test_with_retry_recovers_from_server_errors() {
        let attempts = AtomicUsize::new(0);
        let result = with_retry(|| async {
            if attempts.fetch_add(1, Ordering::SeqCst) < 2 {
                Err(unavailable())
            } else {
                Ok(7)
            }
        })
        .await;
        assert_eq!(result.unwrap(), 7);
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_with_retry_gives_up_after_three_retries() {
        let attempts = AtomicUsize::new(0);
        let result: Result<(), ApiError> = with_retry(|| async {
            attempts.fetch_add(1, Ordering::SeqCst);
            Err(unavailable())
        })
        .await;
        assert!(matches!(result, Err(ApiError::Status { .. })));
        assert_eq!(attempts.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn test_with_retry_stops_on_payload_error() {
        let attempts = AtomicUsize::new(0);
        let result: Result<(), ApiError> = with_retry(|| async {
            attempts.fetch_add(1, Ordering::SeqCst);
            Err(ApiError::Payload("bad key".to_string()))
        })
        .await;
        assert!(matches!(result, Err(ApiError::Payload(_))));
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_payload_errors_not_retryable() {
        assert!(!ApiError::Payload("x".to_string()).is_retryable());
    }
}
