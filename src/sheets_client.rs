use crate::config::{Config, ServiceAccountKey};
use crate::errors::AppError;
use crate::rows::Row;
use chrono::Utc;
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use moka::future::Cache;
use reqwest;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::time::Duration;
use tracing;

const SHEETS_SCOPE: &str = "https://www.googleapis.com/auth/spreadsheets";
const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";
const ASSERTION_LIFETIME_SECS: i64 = 3600;
/// Google tokens live for an hour; refresh well before that.
const TOKEN_CACHE_TTL: Duration = Duration::from_secs(50 * 60);

#[derive(Debug, Serialize)]
struct AssertionClaims<'a> {
    iss: &'a str,
    scope: &'a str,
    aud: &'a str,
    iat: i64,
    exp: i64,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

/// Client for appending rows through the Google Sheets v4 API, authenticated
/// as a service account.
#[derive(Clone)]
pub struct SheetsClient {
    client: reqwest::Client,
    base_url: String,
    spreadsheet_id: String,
    range: String,
    service_account: ServiceAccountKey,
    signing_key: EncodingKey,
    token_cache: Cache<String, String>,
}

impl SheetsClient {
    /// Creates a new `SheetsClient`.
    ///
    /// # Arguments
    ///
    /// * `base_url` - Sheets API base URL (no trailing slash).
    /// * `spreadsheet_id` - Target spreadsheet.
    /// * `range` - A1 range rows are appended to, e.g. `Sheet1!A:L`.
    /// * `service_account` - Credentials used to mint access tokens. The
    ///   private key is decoded here, so an unusable key fails construction.
    pub fn new(
        base_url: String,
        spreadsheet_id: String,
        range: String,
        service_account: ServiceAccountKey,
    ) -> Result<Self, AppError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| {
                AppError::ExternalApiError(format!("Failed to create Sheets client: {}", e))
            })?;
        let signing_key = service_account.signing_key()?;

        Ok(Self {
            client,
            base_url,
            spreadsheet_id,
            range,
            service_account,
            signing_key,
            token_cache: Cache::builder()
                .max_capacity(1)
                .time_to_live(TOKEN_CACHE_TTL)
                .build(),
        })
    }

    pub fn from_config(config: &Config) -> Result<Self, AppError> {
        Self::new(
            config.sheets_api_base_url.clone(),
            config.spreadsheet_id.clone(),
            config.sheet_range.clone(),
            config.service_account.clone(),
        )
    }

    pub fn spreadsheet_id(&self) -> &str {
        &self.spreadsheet_id
    }

    pub fn range(&self) -> &str {
        &self.range
    }

    /// Returns a bearer token, exchanging a signed assertion when the cached
    /// one is missing or expired.
    async fn access_token(&self) -> Result<String, AppError> {
        let cache_key = self.service_account.client_email.clone();
        if let Some(token) = self.token_cache.get(&cache_key).await {
            return Ok(token);
        }

        let now = Utc::now().timestamp();
        let claims = AssertionClaims {
            iss: &self.service_account.client_email,
            scope: SHEETS_SCOPE,
            aud: &self.service_account.token_uri,
            iat: now,
            exp: now + ASSERTION_LIFETIME_SECS,
        };
        let assertion = encode(&Header::new(Algorithm::RS256), &claims, &self.signing_key)?;

        let form = url::form_urlencoded::Serializer::new(String::new())
            .append_pair("grant_type", JWT_BEARER_GRANT)
            .append_pair("assertion", &assertion)
            .finish();

        tracing::debug!("Requesting access token from {}", self.service_account.token_uri);

        let response = self
            .client
            .post(&self.service_account.token_uri)
            .header("Content-Type", "application/x-www-form-urlencoded")
            .body(form)
            .send()
            .await
            .map_err(|e| AppError::Auth(format!("Token request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(AppError::Auth(format!(
                "Token endpoint returned {}: {}",
                status, error_text
            )));
        }

        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| AppError::Auth(format!("Failed to parse token response: {}", e)))?;

        self.token_cache
            .insert(cache_key, token.access_token.clone())
            .await;
        tracing::info!("✓ Obtained Sheets access token");

        Ok(token.access_token)
    }

    fn append_url(&self) -> Result<url::Url, AppError> {
        let range_segment = format!("{}:append", self.range);
        let mut url = url::Url::parse(&self.base_url).map_err(|e| {
            AppError::InternalError(format!("Invalid Sheets base URL {}: {}", self.base_url, e))
        })?;

        url.path_segments_mut()
            .map_err(|_| {
                AppError::InternalError(format!("Sheets base URL cannot be a base: {}", self.base_url))
            })?
            .pop_if_empty()
            .extend([
                "v4",
                "spreadsheets",
                self.spreadsheet_id.as_str(),
                "values",
                range_segment.as_str(),
            ]);

        url.query_pairs_mut()
            .append_pair("valueInputOption", "USER_ENTERED")
            .append_pair("insertDataOption", "INSERT_ROWS");

        Ok(url)
    }

    /// Appends one row to the configured range.
    ///
    /// # Returns
    ///
    /// * `Result<Option<String>, AppError>` - The updated range, when Sheets reports it.
    pub async fn append_row(&self, row: &Row) -> Result<Option<String>, AppError> {
        let token = self.access_token().await?;
        let url = self.append_url()?;

        tracing::info!("Appending row to spreadsheet {} ({})", self.spreadsheet_id, self.range);

        let body = json!({
            "majorDimension": "ROWS",
            "values": [row],
        });

        let response = self
            .client
            .post(url)
            .bearer_auth(token)
            .json(&body)
            .send()
            .await
            .map_err(|e| AppError::ExternalApiError(format!("Sheets request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(AppError::ExternalApiError(format!(
                "Sheets append failed {}: {}",
                status, error_text
            )));
        }

        let data: Value = response.json().await.map_err(|e| {
            AppError::ExternalApiError(format!("Failed to parse Sheets response: {}", e))
        })?;

        let updated_range = data
            .pointer("/updates/updatedRange")
            .and_then(Value::as_str)
            .map(str::to_string);

        tracing::info!("✓ Row appended: {:?}", updated_range);
        Ok(updated_range)
    }
}
