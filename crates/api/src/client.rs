//! Device API trait and its reqwest implementation.

use std::future::Future;
use std::pin::Pin;

use peershare_protocol::constants::{
    CLEAR_PATH, DEVICES_PATH, NOTIFY_PATH, PENDING_PATH, REGISTER_PATH,
};
use peershare_protocol::{ClearRequest, Device, NotifyRequest, PendingTransfer, RegisterRequest};
use reqwest::{Response, StatusCode, Url};
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::error::ApiError;

/// Boxed future returned by [`DeviceApi`] calls.
pub type ApiFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, ApiError>> + Send + 'a>>;

/// Abstract connection to the device API.
///
/// Requests are serialized before the returned future is created, so the
/// future only borrows `self`.
pub trait DeviceApi: Send + Sync {
    /// `POST /api/devices/register`.
    fn register(&self, req: &RegisterRequest) -> ApiFuture<'_, Device>;

    /// `GET /api/devices/pending?id=<id>`. `None` on `204 No Content`.
    fn pending(&self, device_id: &str) -> ApiFuture<'_, Option<PendingTransfer>>;

    /// `POST /api/devices/clear`. The response body is ignored.
    fn clear(&self, req: &ClearRequest) -> ApiFuture<'_, ()>;

    /// `GET /api/devices`.
    fn list_devices(&self) -> ApiFuture<'_, Vec<Device>>;

    /// `POST /api/devices/notify`. The response body is ignored.
    fn notify(&self, req: &NotifyRequest) -> ApiFuture<'_, ()>;

    /// Scheme, host and port of the server, used to build transfer links.
    fn origin(&self) -> String;
}

/// [`DeviceApi`] over HTTP.
#[derive(Debug, Clone)]
pub struct HttpDeviceApi {
    client: reqwest::Client,
    base: Url,
}

impl HttpDeviceApi {
    /// Creates a client for the server at `base_url`.
    pub fn new(client: reqwest::Client, base_url: &str) -> Result<Self, ApiError> {
        let base = Url::parse(base_url).map_err(|e| ApiError::Url(format!("{base_url}: {e}")))?;
        if base.cannot_be_a_base() {
            return Err(ApiError::Url(format!("{base_url}: not a base URL")));
        }
        Ok(Self { client, base })
    }

    fn endpoint(&self, path: &str) -> Result<Url, ApiError> {
        self.base
            .join(path)
            .map_err(|e| ApiError::Url(format!("{path}: {e}")))
    }
}

impl DeviceApi for HttpDeviceApi {
    fn register(&self, req: &RegisterRequest) -> ApiFuture<'_, Device> {
        let builder = self.endpoint(REGISTER_PATH).map(|url| self.client.post(url).json(req));
        Box::pin(async move {
            let response = check_status(builder?.send().await?).await?;
            let device: Device = decode_json(response).await?;
            debug!(device = %device.id, name = %device.name, "device registered");
            Ok(device)
        })
    }

    fn pending(&self, device_id: &str) -> ApiFuture<'_, Option<PendingTransfer>> {
        let builder = self
            .endpoint(PENDING_PATH)
            .map(|url| self.client.get(url).query(&[("id", device_id)]));
        Box::pin(async move {
            let response = builder?.send().await?;
            if response.status() == StatusCode::NO_CONTENT {
                return Ok(None);
            }
            let response = check_status(response).await?;
            Ok(Some(decode_json(response).await?))
        })
    }

    fn clear(&self, req: &ClearRequest) -> ApiFuture<'_, ()> {
        let builder = self.endpoint(CLEAR_PATH).map(|url| self.client.post(url).json(req));
        Box::pin(async move {
            check_status(builder?.send().await?).await?;
            Ok(())
        })
    }

    fn list_devices(&self) -> ApiFuture<'_, Vec<Device>> {
        let builder = self.endpoint(DEVICES_PATH).map(|url| self.client.get(url));
        Box::pin(async move {
            let response = check_status(builder?.send().await?).await?;
            decode_json(response).await
        })
    }

    fn notify(&self, req: &NotifyRequest) -> ApiFuture<'_, ()> {
        let builder = self.endpoint(NOTIFY_PATH).map(|url| self.client.post(url).json(req));
        Box::pin(async move {
            check_status(builder?.send().await?).await?;
            Ok(())
        })
    }

    fn origin(&self) -> String {
        self.base.origin().ascii_serialization()
    }
}

/// Turns non-2xx responses into [`ApiError::Status`], keeping the body text.
async fn check_status(response: Response) -> Result<Response, ApiError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let message = response.text().await.unwrap_or_default().trim().to_string();
    Err(ApiError::Status {
        status: status.as_u16(),
        message,
    })
}

async fn decode_json<T: DeserializeOwned>(response: Response) -> Result<T, ApiError> {
    let body = response.bytes().await?;
    Ok(serde_json::from_slice(&body)?)
}
