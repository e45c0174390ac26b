//! Client for the external pinning service.
//!
//! Only the token's image is pinned; the token document itself travels
//! inline in the token URI built by the mint workflow.

use crate::error::Error;
use serde::Deserialize;

const PIN_ENDPOINT: &str = "https://api.pinata.cloud/pinning/pinFileToIPFS";

pub struct PinningClient {
    http: reqwest::Client,
    api_key: String,
    secret: String,
}

#[derive(Debug, Deserialize)]
struct PinResponse {
    #[serde(rename = "IpfsHash")]
    ipfs_hash: String,
}

impl PinningClient {
    pub fn new(api_key: &str, secret: &str) -> Result<Self, Error> {
        if api_key.is_empty() || secret.is_empty() {
            return Err(Error::Pinning("pinning credentials not configured".into()));
        }
        Ok(Self {
            http: reqwest::Client::new(),
            api_key: api_key.to_string(),
            secret: secret.to_string(),
        })
    }

    /// Upload a single file, returning its content hash.
    pub async fn pin_file(&self, filename: &str, bytes: Vec<u8>) -> Result<String, Error> {
        let part = reqwest::multipart::Part::bytes(bytes).file_name(filename.to_string());
        let form = reqwest::multipart::Form::new().part("file", part);
        let response = self
            .http
            .post(PIN_ENDPOINT)
            .header("pinata_api_key", &self.api_key)
            .header("pinata_secret_api_key", &self.secret)
            .multipart(form)
            .send()
            .await
            .map_err(|e| Error::Pinning(format!("upload failed: {e}")))?
            .error_for_status()
            .map_err(|e| Error::Pinning(format!("upload rejected: {e}")))?;
        let pin: PinResponse = response
            .json()
            .await
            .map_err(|e| Error::Pinning(format!("malformed response: {e}")))?;
        Ok(pin.ipfs_hash)
    }
}
