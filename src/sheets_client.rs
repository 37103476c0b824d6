use reqwest::Client;
use secrecy::ExposeSecret;
use std::time;

use crate::domain::subscription_record::SubscriptionRecord;
use crate::google_auth::AccessToken;

const REQUEST_TIMEOUT: time::Duration = time::Duration::from_secs(10);
/// Columns written by every append: timestamp, email, source, user agent.
const APPEND_COLUMNS: &str = "A:D";

pub struct SheetsClient {
    http_client: Client,
    base_url: String,
}

#[derive(serde::Serialize)]
pub struct AppendValuesBody {
    values: Vec<[String; 4]>,
}

impl SheetsClient {
    pub fn new(
        base_url: String,
        timeout: Option<time::Duration>,
    ) -> Result<SheetsClient, reqwest::Error> {
        let http_client = Client::builder()
            .timeout(timeout.unwrap_or(REQUEST_TIMEOUT))
            .build()?;

        Ok(SheetsClient {
            http_client,
            base_url,
        })
    }

    pub fn append_url(&self, sheet_id: &str, tab_name: &str) -> String {
        format!(
            "{}/v4/spreadsheets/{}/values/{}!{}:append?valueInputOption=USER_ENTERED",
            self.base_url.trim_end_matches('/'),
            sheet_id,
            urlencoding::encode(tab_name),
            APPEND_COLUMNS
        )
    }

    /// Appends `record` as a new row at the end of `tab_name`. The access
    /// token is consumed by the call.
    #[tracing::instrument(
        name = "Append a subscription row to Google Sheets",
        skip(self, access_token, record),
        fields(subscriber_email = %record.email)
    )]
    pub async fn append_row(
        &self,
        access_token: AccessToken,
        sheet_id: &str,
        tab_name: &str,
        record: &SubscriptionRecord,
    ) -> Result<(), reqwest::Error> {
        let url = self.append_url(sheet_id, tab_name);
        let body = AppendValuesBody {
            values: vec![record.to_row()],
        };

        self.http_client
            .post(&url)
            .bearer_auth(access_token.expose_secret())
            .json(&body)
            .send()
            .await?
            .error_for_status()?; // return an error when server response status code is 4xx or 5xx

        Ok(())
    }
}
