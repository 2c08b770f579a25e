//! HTTP implementation of [`Backend`] for a Supabase project.
//!
//! Handles:
//! - GoTrue auth endpoints (`/auth/v1/*`)
//! - PostgREST tables and RPCs (`/rest/v1/*`)
//! - Mapping status codes and Postgres error codes to [`BackendError`]

use std::sync::RwLock;

use async_trait::async_trait;
use reqwest::{Method, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::json;

use super::error::{BackendError, BackendResult, UNIQUE_VIOLATION};
use super::rows::{
    AttendeeRecordRow, AttendeeRow, NearbySessionRow, NewSessionRow, RadiusQuery, SessionRow,
};
use super::Backend;
use crate::auth::{
    jwt_expiry, AuthSession, AuthUser, OtpTarget, ProfileUpdate, SecretToken, SignUpResponse,
    UserProfile,
};
use crate::config::BackendConfig;
use crate::university::{PrayerSpace, University};

/// Access token lifetime assumed when the response states none.
const DEFAULT_EXPIRES_IN_SECS: i64 = 3_600;

/// Embedded select for attendee lists.
const ATTENDEE_SELECT: &str = "session_id,user_id,joined_at,user:users!inner(display_name)";

/// Supabase REST + auth client.
pub struct SupabaseClient {
    http: reqwest::Client,
    base_url: String,
    anon_key: String,
    access_token: RwLock<Option<SecretToken>>,
}

impl std::fmt::Debug for SupabaseClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SupabaseClient")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

impl SupabaseClient {
    /// Creates a client for the project in `config`.
    #[must_use]
    pub fn new(config: &BackendConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: config.url.trim_end_matches('/').to_string(),
            anon_key: config.anon_key.clone(),
            access_token: RwLock::new(None),
        }
    }

    fn rest_url(&self, path: &str) -> String {
        format!("{}/rest/v1/{path}", self.base_url)
    }

    fn auth_url(&self, path: &str) -> String {
        format!("{}/auth/v1/{path}", self.base_url)
    }

    /// Starts a request carrying the API key and the current bearer token
    /// (the anon key when signed out).
    fn request(&self, method: Method, url: &str) -> RequestBuilder {
        let builder = self
            .http
            .request(method, url)
            .header("apikey", &self.anon_key);

        match self.access_token.read() {
            Ok(guard) => match guard.as_ref() {
                Some(token) => builder.bearer_auth(token.expose()),
                None => builder.bearer_auth(&self.anon_key),
            },
            Err(_) => builder.bearer_auth(&self.anon_key),
        }
    }

    /// Sends a request and returns the body of a successful response.
    async fn send(&self, builder: RequestBuilder) -> BackendResult<String> {
        let response = builder.send().await?;
        let status = response.status();
        let body = response.text().await?;

        if status.is_success() {
            Ok(body)
        } else {
            Err(classify_error(status.as_u16(), &body))
        }
    }

    async fn send_json<T: DeserializeOwned>(&self, builder: RequestBuilder) -> BackendResult<T> {
        let body = self.send(builder).await?;
        serde_json::from_str(&body).map_err(|e| BackendError::Decode(e.to_string()))
    }

    /// Sends a `return=representation` write and takes the single row back.
    async fn send_returning<T: DeserializeOwned>(
        &self,
        builder: RequestBuilder,
        what: &str,
    ) -> BackendResult<T> {
        let rows: Vec<T> = self
            .send_json(builder.header("Prefer", "return=representation"))
            .await?;
        rows.into_iter()
            .next()
            .ok_or_else(|| BackendError::NotFound(what.to_string()))
    }
}

#[async_trait]
impl Backend for SupabaseClient {
    fn set_access_token(&self, token: Option<SecretToken>) {
        if let Ok(mut guard) = self.access_token.write() {
            *guard = token;
        }
    }

    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> BackendResult<AuthSession> {
        let builder = self
            .request(Method::POST, &self.auth_url("token"))
            .query(&[("grant_type", "password")])
            .json(&json!({ "email": email, "password": password }));
        let body = self.send(builder).await?;
        parse_auth_session(&body, now_unix())
    }

    async fn sign_up(&self, email: &str, password: &str) -> BackendResult<SignUpResponse> {
        let builder = self
            .request(Method::POST, &self.auth_url("signup"))
            .json(&json!({ "email": email, "password": password }));
        let body = self.send(builder).await?;
        parse_sign_up(&body, now_unix())
    }

    async fn send_otp(&self, target: &OtpTarget) -> BackendResult<()> {
        let builder = self
            .request(Method::POST, &self.auth_url("otp"))
            .json(&otp_request_body(target));
        self.send(builder).await.map(|_| ())
    }

    async fn verify_otp(&self, target: &OtpTarget, code: &str) -> BackendResult<AuthSession> {
        let builder = self
            .request(Method::POST, &self.auth_url("verify"))
            .json(&otp_verify_body(target, code));
        let body = self.send(builder).await?;
        parse_auth_session(&body, now_unix())
    }

    async fn refresh_session(&self, refresh_token: &SecretToken) -> BackendResult<AuthSession> {
        let builder = self
            .request(Method::POST, &self.auth_url("token"))
            .query(&[("grant_type", "refresh_token")])
            .json(&json!({ "refresh_token": refresh_token.expose() }));
        let body = self.send(builder).await?;
        parse_auth_session(&body, now_unix())
    }

    async fn sign_out(&self) -> BackendResult<()> {
        let builder = self.request(Method::POST, &self.auth_url("logout"));
        self.send(builder).await.map(|_| ())
    }

    async fn fetch_user(&self, user_id: &str) -> BackendResult<Option<UserProfile>> {
        let builder = self
            .request(Method::GET, &self.rest_url("users"))
            .query(&[("select", "*".to_string()), ("id", format!("eq.{user_id}"))]);
        let rows: Vec<UserProfile> = self.send_json(builder).await?;
        Ok(rows.into_iter().next())
    }

    async fn create_user(&self, profile: &UserProfile) -> BackendResult<UserProfile> {
        let builder = self
            .request(Method::POST, &self.rest_url("users"))
            .header("Prefer", "resolution=merge-duplicates,return=representation")
            .json(profile);
        let rows: Vec<UserProfile> = self.send_json(builder).await?;
        rows.into_iter()
            .next()
            .ok_or_else(|| BackendError::Decode("empty upsert response".to_string()))
    }

    async fn update_user(
        &self,
        user_id: &str,
        update: &ProfileUpdate,
    ) -> BackendResult<UserProfile> {
        let builder = self
            .request(Method::PATCH, &self.rest_url("users"))
            .query(&[("id", format!("eq.{user_id}"))])
            .json(update);
        self.send_returning(builder, "users").await
    }

    async fn fetch_universities(&self) -> BackendResult<Vec<University>> {
        let builder = self
            .request(Method::GET, &self.rest_url("universities"))
            .query(&[
                ("select", "*"),
                ("is_active", "eq.true"),
                ("order", "name.asc"),
            ]);
        self.send_json(builder).await
    }

    async fn fetch_prayer_spaces(
        &self,
        university_id: Option<&str>,
    ) -> BackendResult<Vec<PrayerSpace>> {
        let mut query = vec![
            ("select", "*".to_string()),
            ("is_verified", "eq.true".to_string()),
            ("order", "name.asc".to_string()),
        ];
        if let Some(id) = university_id {
            query.push(("university_id", format!("eq.{id}")));
        }
        let builder = self
            .request(Method::GET, &self.rest_url("prayer_spaces"))
            .query(&query);
        self.send_json(builder).await
    }

    async fn sessions_within_radius(
        &self,
        query: &RadiusQuery,
    ) -> BackendResult<Vec<NearbySessionRow>> {
        let builder = self
            .request(Method::POST, &self.rest_url("rpc/get_sessions_within_radius"))
            .json(query);
        self.send_json(builder).await
    }

    async fn joined_session_ids(
        &self,
        user_id: &str,
        session_ids: &[String],
    ) -> BackendResult<Vec<String>> {
        #[derive(Deserialize)]
        struct JoinedRow {
            session_id: String,
        }

        if session_ids.is_empty() {
            return Ok(Vec::new());
        }

        let builder = self
            .request(Method::GET, &self.rest_url("session_attendees"))
            .query(&[
                ("select", "session_id".to_string()),
                ("user_id", format!("eq.{user_id}")),
                ("session_id", in_filter(session_ids)),
            ]);
        let rows: Vec<JoinedRow> = self.send_json(builder).await?;
        Ok(rows.into_iter().map(|row| row.session_id).collect())
    }

    async fn insert_session(&self, session: &NewSessionRow) -> BackendResult<SessionRow> {
        let builder = self
            .request(Method::POST, &self.rest_url("prayer_sessions"))
            .json(session);
        self.send_returning(builder, "prayer_sessions").await
    }

    async fn cancel_session(&self, session_id: &str) -> BackendResult<()> {
        let builder = self
            .request(Method::PATCH, &self.rest_url("prayer_sessions"))
            .query(&[("id", format!("eq.{session_id}"))])
            .json(&json!({ "is_cancelled": true }));
        let _: SessionRow = self.send_returning(builder, "prayer_sessions").await?;
        Ok(())
    }

    async fn insert_attendee(
        &self,
        session_id: &str,
        user_id: &str,
    ) -> BackendResult<AttendeeRecordRow> {
        let builder = self
            .request(Method::POST, &self.rest_url("session_attendees"))
            .json(&json!({ "session_id": session_id, "user_id": user_id }));
        self.send_returning(builder, "session_attendees").await
    }

    async fn delete_attendee(&self, session_id: &str, user_id: &str) -> BackendResult<()> {
        let builder = self
            .request(Method::DELETE, &self.rest_url("session_attendees"))
            .query(&[
                ("session_id", format!("eq.{session_id}")),
                ("user_id", format!("eq.{user_id}")),
            ]);
        self.send(builder).await.map(|_| ())
    }

    async fn fetch_attendees(&self, session_id: &str) -> BackendResult<Vec<AttendeeRow>> {
        let builder = self
            .request(Method::GET, &self.rest_url("session_attendees"))
            .query(&[
                ("select", ATTENDEE_SELECT.to_string()),
                ("session_id", format!("eq.{session_id}")),
                ("order", "joined_at.asc".to_string()),
            ]);
        self.send_json(builder).await
    }
}

fn now_unix() -> i64 {
    chrono::Utc::now().timestamp()
}

/// PostgREST `in.(...)` filter over quoted ids.
fn in_filter(ids: &[String]) -> String {
    let quoted: Vec<String> = ids
        .iter()
        .map(|id| format!("\"{}\"", id.replace('"', "")))
        .collect();
    format!("in.({})", quoted.join(","))
}

fn otp_request_body(target: &OtpTarget) -> serde_json::Value {
    match target {
        OtpTarget::Email(email) => json!({ "email": email, "create_user": true }),
        OtpTarget::Phone(phone) => json!({ "phone": phone }),
    }
}

fn otp_verify_body(target: &OtpTarget, code: &str) -> serde_json::Value {
    match target {
        OtpTarget::Email(email) => json!({ "type": "email", "email": email, "token": code }),
        OtpTarget::Phone(phone) => json!({ "type": "sms", "phone": phone, "token": code }),
    }
}

#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    code: Option<serde_json::Value>,
    #[serde(default)]
    error_code: Option<String>,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    msg: Option<String>,
    #[serde(default)]
    error_description: Option<String>,
}

/// Maps a non-success answer onto a [`BackendError`].
///
/// PostgREST reports constraint violations with the Postgres SQLSTATE in
/// `code`; GoTrue uses `error_code` / `error` / `msg`.
#[must_use]
pub fn classify_error(status: u16, body: &str) -> BackendError {
    let parsed: ErrorBody = serde_json::from_str(body).unwrap_or_default();

    let message = parsed
        .message
        .or(parsed.msg)
        .or(parsed.error_description)
        .or_else(|| parsed.error.clone())
        .unwrap_or_else(|| body.to_string());

    let pg_code = parsed.code.as_ref().and_then(serde_json::Value::as_str);
    let auth_code = parsed.error_code.as_deref().or(parsed.error.as_deref());

    if status == 409 || pg_code == Some(UNIQUE_VIOLATION) {
        return BackendError::Conflict(message);
    }
    if matches!(status, 401 | 403) || auth_code == Some("invalid_grant") {
        return BackendError::Unauthorized(message);
    }
    if status == 404 {
        return BackendError::NotFound(message);
    }
    BackendError::Api { status, message }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    refresh_token: String,
    #[serde(default)]
    expires_at: Option<i64>,
    #[serde(default)]
    expires_in: Option<i64>,
    user: UserResponse,
}

#[derive(Debug, Deserialize)]
struct UserResponse {
    id: String,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    phone: Option<String>,
}

impl From<UserResponse> for AuthUser {
    fn from(user: UserResponse) -> Self {
        Self {
            id: user.id,
            email: user.email.filter(|e| !e.is_empty()),
            phone: user.phone.filter(|p| !p.is_empty()),
        }
    }
}

impl TokenResponse {
    fn into_session(self, now: i64) -> AuthSession {
        let expires_at = self
            .expires_at
            .or_else(|| jwt_expiry(&self.access_token))
            .unwrap_or_else(|| now + self.expires_in.unwrap_or(DEFAULT_EXPIRES_IN_SECS));

        AuthSession {
            access_token: SecretToken::new(self.access_token),
            refresh_token: SecretToken::new(self.refresh_token),
            expires_at,
            user: self.user.into(),
        }
    }
}

/// Decodes a GoTrue token response.
///
/// The expiry comes from `expires_at`, else the token's `exp` claim, else
/// `now + expires_in`.
///
/// # Errors
///
/// Returns [`BackendError::Decode`] if the body is not a token response.
pub fn parse_auth_session(body: &str, now: i64) -> BackendResult<AuthSession> {
    let response: TokenResponse =
        serde_json::from_str(body).map_err(|e| BackendError::Decode(e.to_string()))?;
    Ok(response.into_session(now))
}

/// Decodes a GoTrue sign-up response.
///
/// Projects that auto-confirm return a full token response; otherwise the
/// body is the new user alone and no session is issued.
///
/// # Errors
///
/// Returns [`BackendError::Decode`] if neither shape matches.
pub fn parse_sign_up(body: &str, now: i64) -> BackendResult<SignUpResponse> {
    if let Ok(response) = serde_json::from_str::<TokenResponse>(body) {
        let session = response.into_session(now);
        return Ok(SignUpResponse {
            user_id: session.user.id.clone(),
            session: Some(session),
        });
    }

    let user: UserResponse =
        serde_json::from_str(body).map_err(|e| BackendError::Decode(e.to_string()))?;
    Ok(SignUpResponse {
        user_id: user.id,
        session: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unique_violation_is_conflict() {
        let body = r#"{"code":"23505","details":"Key (session_id, user_id) already exists.","hint":null,"message":"duplicate key value violates unique constraint"}"#;
        assert_eq!(
            classify_error(400, body),
            BackendError::Conflict("duplicate key value violates unique constraint".to_string())
        );
        assert!(matches!(classify_error(409, ""), BackendError::Conflict(_)));
    }

    #[test]
    fn auth_failures_are_unauthorized() {
        let body = r#"{"error":"invalid_grant","error_description":"Invalid login credentials"}"#;
        assert_eq!(
            classify_error(400, body),
            BackendError::Unauthorized("Invalid login credentials".to_string())
        );
        assert!(matches!(
            classify_error(401, r#"{"message":"JWT expired"}"#),
            BackendError::Unauthorized(_)
        ));
    }

    #[test]
    fn other_statuses_keep_raw_body() {
        assert_eq!(
            classify_error(502, "Bad Gateway"),
            BackendError::Api {
                status: 502,
                message: "Bad Gateway".to_string()
            }
        );
        assert!(matches!(classify_error(404, "{}"), BackendError::NotFound(_)));
    }

    #[test]
    fn token_response_prefers_expires_at() {
        let body = r#"{
            "access_token": "a.b.c",
            "token_type": "bearer",
            "expires_in": 3600,
            "expires_at": 1741400000,
            "refresh_token": "r1",
            "user": {"id": "u1", "email": "a@b.co", "phone": ""}
        }"#;
        let session = parse_auth_session(body, 0).unwrap();
        assert_eq!(session.expires_at, 1_741_400_000);
        assert_eq!(session.user.email.as_deref(), Some("a@b.co"));
        assert_eq!(session.user.phone, None);
        assert_eq!(session.refresh_token.expose(), "r1");
    }

    #[test]
    fn token_response_falls_back_to_expires_in() {
        let body = r#"{
            "access_token": "opaque",
            "refresh_token": "r1",
            "expires_in": 600,
            "user": {"id": "u1"}
        }"#;
        let session = parse_auth_session(body, 1_000).unwrap();
        assert_eq!(session.expires_at, 1_600);
    }

    #[test]
    fn sign_up_without_session_requires_confirmation() {
        let body = r#"{"id": "u9", "email": "new@b.co", "confirmation_sent_at": "2025-03-07T00:00:00Z"}"#;
        let response = parse_sign_up(body, 0).unwrap();
        assert_eq!(response.user_id, "u9");
        assert!(response.session.is_none());
    }

    #[test]
    fn sign_up_with_session_is_signed_in() {
        let body = r#"{
            "access_token": "opaque",
            "refresh_token": "r1",
            "expires_in": 3600,
            "user": {"id": "u9"}
        }"#;
        let response = parse_sign_up(body, 0).unwrap();
        assert_eq!(response.user_id, "u9");
        assert!(response.session.is_some());
    }

    #[test]
    fn garbage_sign_up_is_decode_error() {
        assert!(matches!(
            parse_sign_up("[]", 0),
            Err(BackendError::Decode(_))
        ));
    }

    #[test]
    fn otp_bodies_by_channel() {
        let email = OtpTarget::Email("a@b.co".to_string());
        let phone = OtpTarget::Phone("+15550100".to_string());

        assert_eq!(otp_request_body(&email)["create_user"], true);
        assert_eq!(otp_verify_body(&email, "123456")["type"], "email");
        assert_eq!(otp_verify_body(&phone, "123456")["type"], "sms");
        assert_eq!(otp_verify_body(&phone, "123456")["phone"], "+15550100");
    }

    #[test]
    fn in_filter_quotes_ids() {
        let ids = vec!["a1".to_string(), "b2".to_string()];
        assert_eq!(in_filter(&ids), r#"in.("a1","b2")"#);
    }

    #[test]
    fn urls_are_joined_without_double_slash() {
        let client = SupabaseClient::new(&BackendConfig {
            url: "https://demo.supabase.co/".to_string(),
            anon_key: "anon".to_string(),
        });
        assert_eq!(
            client.rest_url("rpc/get_sessions_within_radius"),
            "https://demo.supabase.co/rest/v1/rpc/get_sessions_within_radius"
        );
        assert_eq!(client.auth_url("otp"), "https://demo.supabase.co/auth/v1/otp");
    }
}
