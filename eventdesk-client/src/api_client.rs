use crate::error::RemoteError;
use crate::record::Record;
use async_trait::async_trait;
use eventdesk_common::api::{CurrentUser, HealthCheckResponse, LoginRequest};
use eventdesk_common::collection::Collection;
use eventdesk_common::domain::RecordId;
use reqwest::{Client, Response, StatusCode};
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

/// The collection server that holds the records of truth.
#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// GET /{collection}
    async fn list(&self, collection: Collection) -> Result<Vec<Value>, RemoteError>;
    /// POST /{collection}
    async fn create(&self, collection: Collection, body: Value) -> Result<Value, RemoteError>;
    /// PUT /{collection}/{id}
    async fn replace(
        &self,
        collection: Collection,
        id: &RecordId,
        body: Value,
    ) -> Result<Value, RemoteError>;
    /// PATCH /{collection}/{id}
    async fn patch(
        &self,
        collection: Collection,
        id: &RecordId,
        body: Value,
    ) -> Result<Value, RemoteError>;
    /// DELETE /{collection}/{id}
    async fn delete(&self, collection: Collection, id: &RecordId) -> Result<(), RemoteError>;
    /// POST /login
    async fn login(&self, request: &LoginRequest) -> Result<CurrentUser, RemoteError>;
}

async fn handle_response_error(res: Response) -> Result<Response, RemoteError> {
    let status = res.status();
    if status == StatusCode::SERVICE_UNAVAILABLE {
        return Err(RemoteError::Unavailable);
    }

    if !status.is_success() {
        return Err(RemoteError::Status(status));
    }

    Ok(res)
}

pub async fn health_check(address: &str) -> Result<HealthCheckResponse, RemoteError> {
    let url = format!("{}/", address.trim_end_matches('/'));
    let res = reqwest::get(url).await?;
    let res = handle_response_error(res).await?;

    let res = res.json::<HealthCheckResponse>().await?;
    Ok(res)
}

/// `RemoteStore` over HTTP with JSON bodies.
#[derive(Debug, Clone)]
pub struct HttpRemote {
    address: String,
    client: Client,
}

impl HttpRemote {
    pub fn new(address: &str) -> Self {
        Self {
            address: address.trim_end_matches('/').to_string(),
            client: Client::new(),
        }
    }

    fn collection_url(&self, collection: Collection) -> String {
        format!("{}/{}", self.address, collection.path())
    }

    fn record_url(&self, collection: Collection, id: &RecordId) -> String {
        format!(
            "{}/{}/{}",
            self.address,
            collection.path(),
            urlencoding::encode(id.as_str())
        )
    }
}

#[async_trait]
impl RemoteStore for HttpRemote {
    async fn list(&self, collection: Collection) -> Result<Vec<Value>, RemoteError> {
        let res = self.client.get(self.collection_url(collection)).send().await?;
        let res = handle_response_error(res).await?;
        Ok(res.json().await?)
    }

    async fn create(&self, collection: Collection, body: Value) -> Result<Value, RemoteError> {
        let res = self
            .client
            .post(self.collection_url(collection))
            .json(&body)
            .send()
            .await?;
        let res = handle_response_error(res).await?;
        Ok(res.json().await?)
    }

    async fn replace(
        &self,
        collection: Collection,
        id: &RecordId,
        body: Value,
    ) -> Result<Value, RemoteError> {
        let res = self
            .client
            .put(self.record_url(collection, id))
            .json(&body)
            .send()
            .await?;
        let res = handle_response_error(res).await?;
        Ok(res.json().await?)
    }

    async fn patch(
        &self,
        collection: Collection,
        id: &RecordId,
        body: Value,
    ) -> Result<Value, RemoteError> {
        let res = self
            .client
            .patch(self.record_url(collection, id))
            .json(&body)
            .send()
            .await?;
        let res = handle_response_error(res).await?;
        Ok(res.json().await?)
    }

    async fn delete(&self, collection: Collection, id: &RecordId) -> Result<(), RemoteError> {
        let res = self
            .client
            .delete(self.record_url(collection, id))
            .send()
            .await?;
        handle_response_error(res).await?;
        Ok(())
    }

    async fn login(&self, request: &LoginRequest) -> Result<CurrentUser, RemoteError> {
        let url = format!("{}/login", self.address);
        let res = self.client.post(url).json(request).send().await?;
        let res = handle_response_error(res).await?;
        Ok(res.json().await?)
    }
}

// Typed wrappers over `RemoteStore`. An answer that does not decode into the record type counts
// as a failed call.

pub async fn fetch<T: Record>(remote: &dyn RemoteStore) -> Result<Vec<T>, RemoteError> {
    let collection = T::COLLECTION;
    debug!("fetching {collection}");
    let values = remote.list(collection).await?;
    values
        .into_iter()
        .map(|x| serde_json::from_value(x).map_err(RemoteError::from))
        .collect()
}

pub async fn post<T: Record>(remote: &dyn RemoteStore, draft: &T::Draft) -> Result<T, RemoteError> {
    let body = serde_json::to_value(draft)?;
    let value = remote.create(T::COLLECTION, body).await?;
    Ok(serde_json::from_value(value)?)
}

pub async fn put<T: Record, B: Serialize + ?Sized>(
    remote: &dyn RemoteStore,
    id: &RecordId,
    body: &B,
) -> Result<T, RemoteError> {
    let body = serde_json::to_value(body)?;
    let value = remote.replace(T::COLLECTION, id, body).await?;
    Ok(serde_json::from_value(value)?)
}

pub async fn patch<T: Record>(
    remote: &dyn RemoteStore,
    id: &RecordId,
    patch: &T::Patch,
) -> Result<T, RemoteError> {
    let body = serde_json::to_value(patch)?;
    let value = remote.patch(T::COLLECTION, id, body).await?;
    Ok(serde_json::from_value(value)?)
}

pub async fn delete<T: Record>(remote: &dyn RemoteStore, id: &RecordId) -> Result<(), RemoteError> {
    remote.delete(T::COLLECTION, id).await
}
