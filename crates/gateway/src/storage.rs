//! HTTP implementation of the metadata store boundary.

use async_trait::async_trait;
use jsonrpsee::core::client::ClientT;
use jsonrpsee::http_client::{HttpClient, HttpClientBuilder};
use jsonrpsee::rpc_params;

use gavel_engine::gateway::{MetadataStore, StorageError};
use gavel_types::NftMetadata;

/// Content-addressed metadata store behind the marketplace RPC endpoint.
///
/// Blobs travel hex-encoded; documents travel as plain JSON. Any failure to
/// reach the store or to land an upload surfaces as `Unavailable`, blocking
/// only the metadata-dependent workflows.
pub struct RpcMetadataStore {
    client: HttpClient,
}

impl RpcMetadataStore {
    pub fn new(url: &str) -> Result<Self, StorageError> {
        let client = HttpClientBuilder::default()
            .build(url)
            .map_err(|err| StorageError::Unavailable(err.to_string()))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl MetadataStore for RpcMetadataStore {
    async fn put_blob(&self, bytes: Vec<u8>) -> Result<String, StorageError> {
        self.client
            .request("storage_putBlob", rpc_params![hex::encode(bytes)])
            .await
            .map_err(|err| StorageError::Unavailable(err.to_string()))
    }

    async fn put_json(&self, document: &NftMetadata) -> Result<String, StorageError> {
        self.client
            .request("storage_putJson", rpc_params![document])
            .await
            .map_err(|err| StorageError::Unavailable(err.to_string()))
    }
}
