//! Instagram web API adapter over reqwest

use crate::instagram::client::{ClientError, Credentials, InstagramApi, InstagramConnector, UserProfile};
use async_trait::async_trait;
use rand::Rng;
use reqwest::cookie::{CookieStore, Jar};
use reqwest::header::{HeaderMap, HeaderValue, REFERER};
use reqwest::{Client, Proxy as ReqwestProxy, RequestBuilder, Url};
use serde_json::Value;
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tracing::{debug, warn};

const BASE_URL: &str = "https://www.instagram.com";
const WEB_APP_ID: &str = "936619743392459";
const DEFAULT_TIMEOUT_SECS: u64 = 30;
const DEFAULT_PAGE_SIZE: u32 = 100;
/// Upper bound on friendships pages walked for one edge
const MAX_PAGES: usize = 500;
const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/133.0.0.0 Safari/537.36";

/// Configuration for the web adapter
#[derive(Debug, Clone)]
pub struct WebClientConfig {
    pub timeout: Duration,
    pub user_agent: String,
    /// Users requested per friendships page
    pub page_size: u32,
    /// Random pause between pages, in milliseconds (min, max)
    pub page_delay_ms: (u64, u64),
}

impl Default for WebClientConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            page_size: DEFAULT_PAGE_SIZE,
            page_delay_ms: (1000, 2500),
        }
    }
}

impl WebClientConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_page_delay_ms(mut self, min: u64, max: u64) -> Self {
        self.page_delay_ms = (min, max.max(min));
        self
    }
}

/// Logs in with username and password through the web login endpoint
#[derive(Debug, Clone, Default)]
pub struct WebInstagramConnector {
    config: WebClientConfig,
}

impl WebInstagramConnector {
    pub fn new(config: WebClientConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl InstagramConnector for WebInstagramConnector {
    async fn login(
        &self,
        credentials: &Credentials,
        proxy_url: Option<&str>,
    ) -> Result<Arc<dyn InstagramApi>, ClientError> {
        let jar = Arc::new(Jar::default());
        let mut builder = Client::builder()
            .cookie_provider(jar.clone())
            .user_agent(&self.config.user_agent)
            .timeout(self.config.timeout);
        if let Some(url) = proxy_url {
            let proxy = ReqwestProxy::all(url).map_err(|e| ClientError::Other(e.to_string()))?;
            builder = builder.proxy(proxy);
        }
        let client = builder.build()?;

        // the login page hands out the csrftoken cookie
        client
            .get(format!("{}/accounts/login/", BASE_URL))
            .send()
            .await?;
        let csrf_token = csrf_from_jar(&jar).ok_or_else(|| ClientError::Other("no csrftoken issued".to_string()))?;

        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or_default();
        let enc_password = format!("#PWD_INSTAGRAM_BROWSER:0:{}:{}", timestamp, credentials.password);
        let form = [
            ("username", credentials.username.as_str()),
            ("enc_password", enc_password.as_str()),
            ("queryParams", "{}"),
            ("optIntoOneTap", "false"),
        ];

        let response = client
            .post(format!("{}/api/v1/web/accounts/login/ajax/", BASE_URL))
            .headers(web_headers(&csrf_token))
            .form(&form)
            .send()
            .await?;
        let status = response.status().as_u16();
        let body = read_body(response).await?;
        interpret(status, &body)?;

        if body["authenticated"].as_bool() != Some(true) {
            let message = if body["user"].as_bool() == Some(true) {
                "incorrect password"
            } else {
                "unknown account"
            };
            return Err(ClientError::Api {
                status,
                message: message.to_string(),
            });
        }

        // the token rotates on login
        let csrf_token = csrf_from_jar(&jar).unwrap_or(csrf_token);
        debug!("Web login accepted for {}", credentials.username);

        Ok(Arc::new(WebInstagramApi {
            client,
            csrf_token,
            config: self.config.clone(),
        }))
    }
}

/// Authenticated web session
pub struct WebInstagramApi {
    client: Client,
    csrf_token: String,
    config: WebClientConfig,
}

impl WebInstagramApi {
    fn get(&self, path: &str) -> RequestBuilder {
        self.client
            .get(format!("{}{}", BASE_URL, path))
            .headers(web_headers(&self.csrf_token))
    }

    async fn get_json(&self, request: RequestBuilder) -> Result<Value, ClientError> {
        let response = request.send().await?;
        let status = response.status().as_u16();
        let body = read_body(response).await?;
        interpret(status, &body)?;
        Ok(body)
    }

    /// Walk a friendships edge (`followers` or `following`) to the end
    async fn friendships(&self, user_id: &str, edge: &str) -> Result<Vec<String>, ClientError> {
        let mut usernames = Vec::new();
        let mut max_id: Option<String> = None;
        let count = self.config.page_size.to_string();

        for page in 1..=MAX_PAGES {
            let mut query = vec![("count", count.clone())];
            if let Some(cursor) = &max_id {
                query.push(("max_id", cursor.clone()));
            }

            let body = self
                .get_json(self.get(&format!("/api/v1/friendships/{}/{}/", user_id, edge)).query(&query))
                .await?;

            if let Some(users) = body["users"].as_array() {
                usernames.extend(
                    users
                        .iter()
                        .filter_map(|u| u["username"].as_str())
                        .map(str::to_string),
                );
            }

            max_id = next_cursor(&body, max_id.as_deref());
            if max_id.is_none() {
                break;
            }
            if page == MAX_PAGES {
                warn!("Stopped {} of {} after {} pages", edge, user_id, MAX_PAGES);
                break;
            }

            let (min, max) = self.config.page_delay_ms;
            let delay = rand::thread_rng().gen_range(min..=max);
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }

        debug!("Fetched {} {} for {}", usernames.len(), edge, user_id);
        Ok(usernames)
    }
}

#[async_trait]
impl InstagramApi for WebInstagramApi {
    async fn user_id_from_username(&self, username: &str) -> Result<String, ClientError> {
        let body = self
            .get_json(self.get("/api/v1/users/web_profile_info/").query(&[("username", username)]))
            .await?;

        body["data"]["user"]["id"]
            .as_str()
            .map(str::to_string)
            .ok_or(ClientError::NotFound)
    }

    async fn user_info(&self, user_id: &str) -> Result<UserProfile, ClientError> {
        let body = self
            .get_json(self.get(&format!("/api/v1/users/{}/info/", user_id)))
            .await?;
        let user = &body["user"];
        if user.is_null() {
            return Err(ClientError::NotFound);
        }

        Ok(UserProfile {
            user_id: user_id.to_string(),
            username: user["username"].as_str().unwrap_or_default().to_string(),
            is_private: user["is_private"].as_bool().unwrap_or(false),
        })
    }

    async fn user_followers(&self, user_id: &str) -> Result<Vec<String>, ClientError> {
        self.friendships(user_id, "followers").await
    }

    async fn user_following(&self, user_id: &str) -> Result<Vec<String>, ClientError> {
        self.friendships(user_id, "following").await
    }
}

/// Cursor for the next page; `None` when the edge is exhausted or the
/// server hands back the cursor it was just given
fn next_cursor(body: &Value, previous: Option<&str>) -> Option<String> {
    let cursor = match &body["next_max_id"] {
        Value::String(s) if !s.is_empty() => s.clone(),
        Value::Number(n) => n.to_string(),
        _ => return None,
    };
    if previous == Some(cursor.as_str()) {
        return None;
    }
    Some(cursor)
}

fn web_headers(csrf_token: &str) -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert("x-ig-app-id", HeaderValue::from_static(WEB_APP_ID));
    headers.insert("x-requested-with", HeaderValue::from_static("XMLHttpRequest"));
    headers.insert(REFERER, HeaderValue::from_static("https://www.instagram.com/"));
    if let Ok(value) = HeaderValue::from_str(csrf_token) {
        headers.insert("x-csrftoken", value);
    }
    headers
}

fn csrf_from_jar(jar: &Jar) -> Option<String> {
    let url = Url::parse(BASE_URL).ok()?;
    let cookies = jar.cookies(&url)?;
    let cookies = cookies.to_str().ok()?;
    cookies
        .split(';')
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == "csrftoken")
        .map(|(_, value)| value.to_string())
}

/// Read a response body as JSON, wrapping non-JSON bodies as a message
async fn read_body(response: reqwest::Response) -> Result<Value, ClientError> {
    let text = response.text().await?;
    Ok(serde_json::from_str(&text).unwrap_or_else(|_| {
        let snippet: String = text.chars().take(200).collect();
        serde_json::json!({ "message": snippet })
    }))
}

/// Turn an API response into a typed error, structured fields first
fn interpret(status: u16, body: &Value) -> Result<(), ClientError> {
    let message = body["message"].as_str().unwrap_or_default();

    if message == "checkpoint_required"
        || message == "challenge_required"
        || !body["checkpoint_url"].is_null()
        || !body["challenge"].is_null()
        || body["two_factor_required"].as_bool() == Some(true)
    {
        return Err(ClientError::ChallengeRequired);
    }
    if message == "login_required" || body["require_login"].as_bool() == Some(true) || status == 401 {
        return Err(ClientError::LoginRequired);
    }
    if status == 429 || body["spam"].as_bool() == Some(true) {
        return Err(ClientError::RateLimited);
    }
    if status == 404 {
        return Err(ClientError::NotFound);
    }
    if !(200..300).contains(&status) || body["status"].as_str() == Some("fail") {
        let message = if message.is_empty() {
            format!("HTTP status: {}", status)
        } else {
            message.to_string()
        };
        return Err(ClientError::Api { status, message });
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_interpret_success() {
        assert!(interpret(200, &json!({"status": "ok", "users": []})).is_ok());
    }

    #[test]
    fn test_interpret_challenge() {
        let body = json!({"message": "checkpoint_required", "checkpoint_url": "/challenge/", "status": "fail"});
        assert_eq!(interpret(400, &body), Err(ClientError::ChallengeRequired));
        let body = json!({"two_factor_required": true, "status": "fail"});
        assert_eq!(interpret(400, &body), Err(ClientError::ChallengeRequired));
    }

    #[test]
    fn test_interpret_login_required() {
        let body = json!({"message": "login_required", "status": "fail"});
        assert_eq!(interpret(403, &body), Err(ClientError::LoginRequired));
    }

    #[test]
    fn test_interpret_rate_limit() {
        let body = json!({"message": "Please wait a few minutes before you try again.", "spam": true, "status": "fail"});
        assert_eq!(interpret(400, &body), Err(ClientError::RateLimited));
        assert_eq!(interpret(429, &json!({})), Err(ClientError::RateLimited));
    }

    #[test]
    fn test_interpret_not_found_and_generic() {
        assert_eq!(interpret(404, &json!({})), Err(ClientError::NotFound));
        let err = interpret(400, &json!({"message": "Sorry, there was a problem with your request.", "status": "fail"}));
        assert_eq!(
            err,
            Err(ClientError::Api {
                status: 400,
                message: "Sorry, there was a problem with your request.".to_string()
            })
        );
        assert_eq!(
            interpret(502, &json!({})),
            Err(ClientError::Api {
                status: 502,
                message: "HTTP status: 502".to_string()
            })
        );
    }

    #[test]
    fn test_next_cursor() {
        assert_eq!(next_cursor(&json!({"next_max_id": "50"}), None), Some("50".to_string()));
        assert_eq!(next_cursor(&json!({"next_max_id": 100}), Some("50")), Some("100".to_string()));
        assert_eq!(next_cursor(&json!({"next_max_id": ""}), Some("50")), None);
        assert_eq!(next_cursor(&json!({"users": []}), Some("50")), None);
        // a repeated cursor would loop forever
        assert_eq!(next_cursor(&json!({"next_max_id": "50"}), Some("50")), None);
    }

    #[test]
    fn test_csrf_from_jar() {
        let jar = Jar::default();
        let url = Url::parse(BASE_URL).unwrap();
        jar.add_cookie_str("csrftoken=abc123; Path=/", &url);
        jar.add_cookie_str("mid=xyz; Path=/", &url);
        assert_eq!(csrf_from_jar(&jar), Some("abc123".to_string()));
    }

    #[test]
    fn test_page_delay_builder_orders_bounds() {
        let config = WebClientConfig::new().with_page_delay_ms(500, 100);
        assert_eq!(config.page_delay_ms, (500, 500));
    }
}
