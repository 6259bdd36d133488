use std::{collections::HashMap, fmt, time::Duration};

use jiff::{tz::TimeZone, Timestamp};
use log::{debug, info, warn};
use reqwest::{
    blocking::{Client, RequestBuilder, Response},
    header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE, WWW_AUTHENTICATE},
    StatusCode, Url,
};
use serde_json::Value;

use crate::config::Config;
use crate::error::Error;
use crate::myenergi::{auth, device::DeviceId, sample::RawSample, HourlyRecords, HourlySource};

pub const DIRECTOR_URL: &str = "https://director.myenergi.net";

/// Response header of the director holding the API server of the hub.
const SERVER_HEADER: &str = "x_myenergi-asn";

/// Hub serial number and API key.
#[derive(Clone, PartialEq)]
pub struct Credentials {
    pub user_name: String,
    pub password: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("user_name", &self.user_name)
            .field("password", &format!("<{} chars>", self.password.len()))
            .finish()
    }
}

pub struct MyenergiClient {
    client: Client,
    credentials: Credentials,
    server: String,
}

fn http_client() -> Result<Client, Error> {
    Ok(Client::builder().timeout(Duration::from_secs(60)).build()?)
}

/// Path and query of the url, as used in the digest.
fn request_uri(url: &str) -> Result<String, Error> {
    let url = Url::parse(url).map_err(|e| Error::EndpointUnavailable(format!("{}: {}", url, e)))?;
    Ok(match url.query() {
        Some(query) => format!("{}?{}", url.path(), query),
        None => url.path().to_string(),
    })
}

/// Send a GET request, answering a digest challenge if the server asks for one.
fn get_with_digest(client: &Client, credentials: &Credentials, url: &str) -> Result<Response, Error> {
    let request = || -> RequestBuilder {
        client
            .get(url)
            .header(CONTENT_TYPE, "application/json")
            .header(ACCEPT, "application/json")
    };
    let response = request().send()?;
    if response.status() != StatusCode::UNAUTHORIZED {
        return Ok(response);
    }
    let auth_failure = || Error::AuthenticationFailure {
        url: url.to_string(),
        status: StatusCode::UNAUTHORIZED.as_u16(),
    };
    let challenge = response
        .headers()
        .get_all(WWW_AUTHENTICATE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .find(|v| auth::is_digest(v))
        .map(str::to_string)
        .ok_or_else(auth_failure)?;
    let authorization = auth::authorization(
        &challenge,
        &credentials.user_name,
        &credentials.password,
        &request_uri(url)?,
    )?;
    let response = request().header(AUTHORIZATION, authorization).send()?;
    if response.status() == StatusCode::UNAUTHORIZED {
        return Err(auth_failure());
    }
    Ok(response)
}

/// Ask the director which API server handles this hub.
pub fn resolve_api_endpoint(director_url: &str, credentials: &Credentials) -> Result<String, Error> {
    let client = http_client()?;
    let response = get_with_digest(&client, credentials, director_url)?;
    debug!("Director response: {:?}", response);
    match response.headers().get(SERVER_HEADER).and_then(|v| v.to_str().ok()) {
        Some(server) if !server.trim().is_empty() => Ok(server.trim().to_string()),
        _ => Err(Error::EndpointUnavailable(format!(
            "{} did not return an API server (HTTP {})",
            director_url,
            response.status()
        ))),
    }
}

/// The `cgi-jdayhour` url for `hour_count` hours starting at the UTC hour of
/// `start`, see [`Period::request_start`](crate::interval::month_tz::Period::request_start).
pub fn hourly_url(server: &str, device: &DeviceId, start: Timestamp, hour_count: u32) -> String {
    let utc = start.to_zoned(TimeZone::UTC);
    if utc.minute() != 0 || utc.second() != 0 {
        warn!(
            "Start {} is not on a whole UTC hour, the API starts at {:02}:00",
            start,
            utc.hour()
        );
    }
    format!(
        "https://{}/cgi-jdayhour-{}-{}-{}-{}-{}-{}",
        server,
        device,
        utc.year(),
        utc.month(),
        utc.day(),
        utc.hour(),
        hour_count
    )
}

/// Extract the hourly records of the device from a `cgi-jdayhour` response.
/// Each record is read on its own, a record that is not an object is
/// rejected and counted without losing the others.
pub fn parse_hourly_response(body: &str, device: &DeviceId) -> Result<HourlyRecords, Error> {
    let mut v: HashMap<String, Value> = serde_json::from_str(body)?;
    let Some(records) = device.response_keys().iter().find_map(|key| v.remove(key)) else {
        return Err(Error::EndpointUnavailable(format!(
            "Response has no hourly records for device {}: {}",
            device,
            v.keys().cloned().collect::<Vec<_>>().join(", ")
        )));
    };
    let records: Vec<Value> = serde_json::from_value(records)?;
    let mut out = HourlyRecords::default();
    for (i, record) in records.into_iter().enumerate() {
        match serde_json::from_value::<RawSample>(record) {
            Ok(sample) => out.samples.push(sample),
            Err(e) => {
                warn!("{}: rejecting hourly record {}, {}", device, i, e);
                out.rejected += 1;
            }
        }
    }
    Ok(out)
}

impl MyenergiClient {
    pub fn new(server: String, credentials: Credentials) -> Result<Self, Error> {
        Ok(MyenergiClient {
            client: http_client()?,
            credentials,
            server,
        })
    }

    /// Resolve the API server through the director and connect to it.
    pub fn connect(config: &Config) -> Result<Self, Error> {
        let server = resolve_api_endpoint(&config.director_url, &config.credentials)?;
        info!("API server: {}", server);
        MyenergiClient::new(server, config.credentials.clone())
    }

    pub fn server(&self) -> &str {
        &self.server
    }
}

impl HourlySource for MyenergiClient {
    fn fetch_hourly(
        &self,
        device: &DeviceId,
        start: Timestamp,
        hour_count: u32,
    ) -> Result<HourlyRecords, Error> {
        let url = hourly_url(&self.server, device, start, hour_count);
        info!("URL: {}", url);
        let response = get_with_digest(&self.client, &self.credentials, &url)?;
        let status = response.status();
        if status != StatusCode::OK {
            let request_id = response
                .headers()
                .get("x-request-id")
                .and_then(|v| v.to_str().ok())
                .unwrap_or("n/a")
                .to_string();
            let body = response.text().unwrap_or_default();
            return Err(Error::EndpointUnavailable(format!(
                "{} returned HTTP {} (x-request-id {}): {}",
                url, status, request_id, body
            )));
        }
        let body = response.text()?;
        parse_hourly_response(&body, device)
    }
}
