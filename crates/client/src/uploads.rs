//! Authenticated file uploads

use crate::client::BackendClient;
use crate::error::ClientError;
use crate::request::{ApiRequest, FilePart};
use tracing::info;

impl BackendClient {
    /// Upload an image into `bucket` and return its public URL, if the
    /// backend reported one
    pub async fn upload_image(
        &self,
        bucket: &str,
        file: FilePart,
    ) -> Result<Option<String>, ClientError> {
        let bucket = bucket.trim_matches('/');
        if bucket.is_empty() || bucket.contains(['/', '?', '#']) {
            return Err(ClientError::Configuration(format!(
                "invalid upload bucket `{bucket}`"
            )));
        }

        let file_name = file.file_name.clone();
        let request = ApiRequest::post(format!("/admin/upload/{bucket}")).multipart([file]);
        let response = self.call(&request).await?;

        let url = response
            .body
            .get("url")
            .and_then(|url| url.as_str())
            .map(ToString::to_string);
        info!(bucket = %bucket, file_name = %file_name, uploaded = url.is_some(), "Image uploaded");
        Ok(url)
    }
}
