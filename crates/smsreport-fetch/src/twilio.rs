//! Twilio-style REST message source.

use chrono::{DateTime, FixedOffset, NaiveDate, TimeZone, Utc};
use parking_lot::Mutex;
use serde::Deserialize;
use smsreport_core::{Error, ProviderCredentials, Result};
use tracing::{debug, info};

use crate::source::MessageSource;
use crate::types::{DateBlock, FetchedMessage};

pub const DEFAULT_BASE_URL: &str = "https://api.twilio.com";
const PAGE_SIZE: &str = "1000";
const API_TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

#[derive(Debug, Deserialize)]
struct MessagePage {
    #[serde(default)]
    messages: Vec<ApiMessage>,
    next_page_uri: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiMessage {
    sid: String,
    from: Option<String>,
    to: Option<String>,
    status: Option<String>,
    date_created: Option<String>,
    date_sent: Option<String>,
    error_code: Option<serde_json::Value>,
    error_message: Option<String>,
    num_segments: Option<serde_json::Value>,
    price: Option<serde_json::Value>,
    direction: Option<String>,
    body: Option<String>,
}

fn value_text(value: Option<serde_json::Value>) -> String {
    match value {
        None | Some(serde_json::Value::Null) => String::new(),
        Some(serde_json::Value::String(s)) => s,
        Some(other) => other.to_string(),
    }
}

fn parse_timestamp(value: Option<&str>) -> Option<DateTime<Utc>> {
    let value = value?.trim();
    DateTime::parse_from_rfc2822(value)
        .or_else(|_| DateTime::parse_from_rfc3339(value))
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

impl From<ApiMessage> for FetchedMessage {
    fn from(m: ApiMessage) -> Self {
        Self {
            date_created: parse_timestamp(m.date_created.as_deref()),
            date_sent: parse_timestamp(m.date_sent.as_deref()),
            sid: m.sid,
            from: m.from.unwrap_or_default(),
            to: m.to.unwrap_or_default(),
            status: m.status.unwrap_or_default(),
            error_code: value_text(m.error_code),
            error_message: m.error_message.unwrap_or_default(),
            num_segments: value_text(m.num_segments),
            price: value_text(m.price),
            direction: m.direction.unwrap_or_default(),
            body: m.body.unwrap_or_default(),
        }
    }
}

fn http_err(e: reqwest::Error) -> Error {
    Error::Http(e.to_string())
}

/// Local midnight of `day`, in UTC.
fn local_midnight(day: NaiveDate, offset: FixedOffset) -> Result<DateTime<Utc>> {
    let naive = day
        .and_hms_opt(0, 0, 0)
        .ok_or_else(|| Error::Internal(format!("no midnight for {}", day)))?;
    offset
        .from_local_datetime(&naive)
        .single()
        .map(|dt| dt.with_timezone(&Utc))
        .ok_or_else(|| Error::Internal(format!("ambiguous local time for {}", day)))
}

/// UTC bounds `[start, end)` covering every local day of the block.
pub fn block_bounds(block: &DateBlock, offset: FixedOffset) -> Result<(DateTime<Utc>, DateTime<Utc>)> {
    let after_end = block
        .end
        .succ_opt()
        .ok_or_else(|| Error::Config(format!("end date {} out of range", block.end)))?;
    Ok((
        local_midnight(block.start, offset)?,
        local_midnight(after_end, offset)?,
    ))
}

/// Lists messages through the provider's paged Messages resource.
pub struct TwilioSource {
    base_url: String,
    credentials: ProviderCredentials,
    offset: FixedOffset,
    client: Mutex<Option<reqwest::Client>>,
}

impl TwilioSource {
    pub fn new(credentials: ProviderCredentials, offset: FixedOffset) -> Self {
        Self::with_base_url(DEFAULT_BASE_URL, credentials, offset)
    }

    pub fn with_base_url(base_url: &str, credentials: ProviderCredentials, offset: FixedOffset) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            credentials,
            offset,
            client: Mutex::new(None),
        }
    }

    pub fn offset(&self) -> FixedOffset {
        self.offset
    }

    /// Shared connection pool, built on first use.
    fn client(&self) -> Result<reqwest::Client> {
        let mut slot = self.client.lock();
        if let Some(client) = slot.as_ref() {
            return Ok(client.clone());
        }
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(120))
            .build()
            .map_err(http_err)?;
        *slot = Some(client.clone());
        Ok(client)
    }

    fn messages_url(&self) -> String {
        format!(
            "{}/2010-04-01/Accounts/{}/Messages.json",
            self.base_url, self.credentials.account_sid
        )
    }

    async fn fetch_page(&self, request: reqwest::RequestBuilder, block: &DateBlock) -> Result<MessagePage> {
        let response = request
            .basic_auth(&self.credentials.account_sid, Some(&self.credentials.auth_token))
            .send()
            .await
            .map_err(http_err)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Fetch(format!(
                "block {}: provider returned {}: {}",
                block.index, status, body
            )));
        }
        response.json::<MessagePage>().await.map_err(http_err)
    }
}

impl MessageSource for TwilioSource {
    fn name(&self) -> &str {
        "twilio"
    }

    async fn fetch_block(&self, block: &DateBlock) -> Result<Vec<FetchedMessage>> {
        let (after, before) = block_bounds(block, self.offset)?;
        let client = self.client()?;
        let after = after.format(API_TIME_FORMAT).to_string();
        let before = before.format(API_TIME_FORMAT).to_string();

        debug!("Block {}: DateSent> {} DateSent< {}", block.index, after, before);

        let mut request = client.get(self.messages_url()).query(&[
            ("DateSent>", after.as_str()),
            ("DateSent<", before.as_str()),
            ("PageSize", PAGE_SIZE),
        ]);

        let mut messages = Vec::new();
        let mut pages = 0;
        loop {
            let page = self.fetch_page(request, block).await?;
            pages += 1;
            messages.extend(page.messages.into_iter().map(FetchedMessage::from));
            if pages > 1 {
                info!("Block {}: page {}, {} messages so far", block.index, pages, messages.len());
            }
            match page.next_page_uri {
                Some(uri) if !uri.is_empty() => {
                    request = client.get(format!("{}{}", self.base_url, uri));
                }
                _ => break,
            }
        }

        debug!("Block {}: {} pages, {} messages", block.index, pages, messages.len());
        Ok(messages)
    }
}
