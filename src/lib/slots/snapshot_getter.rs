use futures::future;
use log::info;
use reqwest::{header::COOKIE, Client, RequestBuilder};
use serde::de::DeserializeOwned;

use super::{
    board::BoardSnapshot,
    errors::GatewayError,
    models::{
        booking_model::{RawBookingRecord, RawSlotControl},
        Config,
    },
};

/// A trait, necessary for every entity that will be used for getting a fresh snapshot.
#[allow(async_fn_in_trait)]
pub trait SnapshotGetter {
    async fn get_snapshot(&self) -> Result<BoardSnapshot, GatewayError>;
}

/// HTTP access to the shift server.
#[derive(Debug, Clone)]
pub struct ShiftApi {
    client: Client,
    base_url: String,
    division: String,
    session_cookie: Option<String>,
}

impl ShiftApi {
    pub fn new(client: Client, base_url: &str, division: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_owned(),
            division: division.to_owned(),
            session_cookie: None,
        }
    }

    pub fn from_config(client: Client, config: &Config) -> Self {
        let api = ShiftApi::new(client, &config.base_url, &config.division);
        match &config.session_cookie {
            Some(cookie) => api.with_session_cookie(cookie),
            None => api,
        }
    }

    /// The server identifies the viewer by its session; login happens elsewhere.
    pub fn with_session_cookie(mut self, cookie: &str) -> Self {
        self.session_cookie = Some(cookie.to_owned());
        self
    }

    fn with_session(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.session_cookie {
            Some(cookie) => request.header(COOKIE, cookie),
            None => request,
        }
    }

    pub(crate) fn get(&self, path: &str) -> RequestBuilder {
        self.with_session(self.client.get(format!("{}{}", self.base_url, path)))
    }

    pub(crate) fn post(&self, path: &str) -> RequestBuilder {
        self.with_session(self.client.post(format!("{}{}", self.base_url, path)))
    }

    pub fn division(&self) -> &str {
        &self.division
    }

    pub(crate) async fn get_list<T: DeserializeOwned>(
        &self,
        path: &str,
    ) -> Result<Vec<T>, GatewayError> {
        info!("Getting {}", path);
        let response = self.get(path).send().await?.error_for_status()?;
        Ok(response.json().await?)
    }

    pub async fn get_applications(&self) -> Result<Vec<RawBookingRecord>, GatewayError> {
        self.get_list("/api/applications").await
    }

    pub async fn get_slot_controls(&self) -> Result<Vec<RawSlotControl>, GatewayError> {
        self.get_list("/api/slot_controls").await
    }
}

/// Both lists are fetched concurrently and decoded in one step.
impl SnapshotGetter for ShiftApi {
    async fn get_snapshot(&self) -> Result<BoardSnapshot, GatewayError> {
        let (records, controls) =
            future::try_join(self.get_applications(), self.get_slot_controls()).await?;
        info!(
            "Collected {} applications and {} slot controls",
            records.len(),
            controls.len()
        );
        Ok(BoardSnapshot::from_raw(&self.division, records, controls)?)
    }
}
