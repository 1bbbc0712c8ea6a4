use std::time::Duration;

use chrono::Utc;
use log::debug;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, ETAG, IF_NONE_MATCH, USER_AGENT};
use url::Url;

use crate::constants::{FEATURES_PATH, PKG_VERSION};
use crate::errors::ClientError;
use crate::errors::ErrorKind::*;
use crate::fetch::fetcher::FetchResponse::{Failed, Fetched, NotModified};
use crate::model::feature::{snapshot_from_json, Snapshot};

const APP_NAME_HEADER: &str = "UNLEASH-APPNAME";
const INSTANCE_ID_HEADER: &str = "UNLEASH-INSTANCEID";

#[derive(Debug, PartialEq)]
pub enum FetchResponse {
    Fetched(Snapshot),
    NotModified,
    /// The failure and whether retrying it may succeed.
    Failed(ClientError, bool),
}

pub struct Fetcher {
    features_url: Url,
    http_client: reqwest::Client,
}

impl Fetcher {
    pub fn new(
        base_url: &Url,
        app_name: &str,
        instance_id: &str,
        custom_headers: &[(String, String)],
        timeout: Duration,
    ) -> Result<Self, ClientError> {
        let features_url = base_url.join(FEATURES_PATH).map_err(|err| {
            ClientError::new(
                InvalidUrl,
                format!("Failed to build the features URL from '{base_url}'. {err}"),
            )
        })?;

        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            header_value(format!("unleash-client-rust/{PKG_VERSION}").as_str())?,
        );
        headers.insert(APP_NAME_HEADER, header_value(app_name)?);
        headers.insert(INSTANCE_ID_HEADER, header_value(instance_id)?);
        for (name, value) in custom_headers {
            let name = HeaderName::from_bytes(name.as_bytes()).map_err(|err| {
                ClientError::new(
                    HttpClientInitFailure,
                    format!("Invalid HTTP header name '{name}'. {err}"),
                )
            })?;
            headers.insert(name, header_value(value)?);
        }

        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .default_headers(headers)
            .build()
            .map_err(|err| {
                ClientError::new(
                    HttpClientInitFailure,
                    format!("Failed to initialize the HTTP client. {err}"),
                )
            })?;

        Ok(Self {
            features_url,
            http_client,
        })
    }

    pub fn features_url(&self) -> &Url {
        &self.features_url
    }

    pub async fn fetch(&self, etag: &str) -> FetchResponse {
        let mut builder = self.http_client.get(self.features_url.clone());
        if !etag.is_empty() {
            builder = builder.header(IF_NONE_MATCH, etag.to_owned());
        }

        let result = builder.send().await;

        match result {
            Ok(response) => match response.status().as_u16() {
                200 => {
                    debug!("Fetch was successful: new features fetched");
                    let etag = response
                        .headers()
                        .get(ETAG)
                        .and_then(|header| header.to_str().ok())
                        .unwrap_or("")
                        .to_owned();
                    match response.text().await {
                        Ok(body) => match snapshot_from_json(body.as_str(), &etag, Utc::now()) {
                            Ok(snapshot) => Fetched(snapshot),
                            Err(parse_error) => {
                                let msg = format!("Fetching features was successful but the HTTP response content was invalid. {parse_error}");
                                Failed(ClientError::new(InvalidHttpResponseContent, msg), true)
                            }
                        },
                        Err(body_error) => {
                            let msg = format!("Fetching features was successful but the HTTP response content was invalid. {body_error}");
                            Failed(ClientError::new(InvalidHttpResponseContent, msg), true)
                        }
                    }
                }
                304 => {
                    debug!("Fetch was successful: not modified");
                    NotModified
                }
                code @ (401 | 403 | 404) => {
                    let msg = format!("The toggle server rejected the request, check the server URL and the API token. Status code: {code}");
                    Failed(ClientError::new(Unauthorized, msg), false)
                }
                code => {
                    let msg = format!("Unexpected HTTP response was received while trying to fetch features. Status code: {code}");
                    Failed(ClientError::new(UnexpectedHttpResponse, msg), true)
                }
            },
            Err(error) => {
                if error.is_timeout() {
                    let msg = "Request timed out while trying to fetch features.".to_owned();
                    Failed(ClientError::new(HttpRequestTimeout, msg), true)
                } else {
                    let msg = format!("Unexpected error occurred while trying to fetch features. It is most likely due to a local network issue. {error}");
                    Failed(ClientError::new(HttpRequestFailure, msg), true)
                }
            }
        }
    }
}

fn header_value(value: &str) -> Result<HeaderValue, ClientError> {
    HeaderValue::from_str(value).map_err(|err| {
        ClientError::new(
            HttpClientInitFailure,
            format!("Invalid HTTP header value '{value}'. {err}"),
        )
    })
}
