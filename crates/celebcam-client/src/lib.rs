//! celebcam-client — HTTP client for the celebrity recognition service.
//!
//! The service exposes two endpoints that both answer with a
//! [`RecognitionResponse`]:
//!
//! - `POST /uploadImage` with a JSON body `{"image": "<base64 JPEG>"}`
//! - `POST /uploadFile/` with a multipart body whose `file` field holds the image

use celebcam_core::RecognitionResponse;
use reqwest::multipart::{Form, Part};
use reqwest::{StatusCode, Url};
use std::time::Duration;
use thiserror::Error;

pub const SNAPSHOT_PATH: &str = "uploadImage";
pub const UPLOAD_PATH: &str = "uploadFile/";

#[derive(Error, Debug)]
pub enum ClientError {
    #[error("invalid server URL {url}: {reason}")]
    InvalidUrl { url: String, reason: String },
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("server returned {status}: {body}")]
    Status { status: StatusCode, body: String },
    #[error("invalid response body: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Client for the recognition endpoints. Cheap to clone.
#[derive(Debug, Clone)]
pub struct RecognitionClient {
    http: reqwest::Client,
    snapshot_url: Url,
    upload_url: Url,
}

impl RecognitionClient {
    /// Build a client for the service at `base_url` (e.g. `http://127.0.0.1:8000`).
    ///
    /// `timeout` bounds each request end to end; `None` waits indefinitely.
    pub fn new(base_url: &str, timeout: Option<Duration>) -> Result<Self, ClientError> {
        let invalid = |reason: String| ClientError::InvalidUrl {
            url: base_url.to_string(),
            reason,
        };

        // A trailing slash makes `join` append instead of replacing the last segment.
        let mut base = Url::parse(base_url).map_err(|e| invalid(e.to_string()))?;
        if base.cannot_be_a_base() {
            return Err(invalid("not a base URL".into()));
        }
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }

        let snapshot_url = base.join(SNAPSHOT_PATH).map_err(|e| invalid(e.to_string()))?;
        let upload_url = base.join(UPLOAD_PATH).map_err(|e| invalid(e.to_string()))?;

        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }

        Ok(Self {
            http: builder.build()?,
            snapshot_url,
            upload_url,
        })
    }

    pub fn snapshot_url(&self) -> &Url {
        &self.snapshot_url
    }

    pub fn upload_url(&self) -> &Url {
        &self.upload_url
    }

    /// Submit a camera snapshot given as base64 JPEG without a data-URL prefix.
    pub async fn recognize_snapshot(&self, image_base64: &str) -> Result<RecognitionResponse, ClientError> {
        tracing::debug!(url = %self.snapshot_url, bytes = image_base64.len(), "posting snapshot");
        let resp = self
            .http
            .post(self.snapshot_url.clone())
            .json(&serde_json::json!({ "image": image_base64 }))
            .send()
            .await?;
        decode(resp).await
    }

    /// Submit an image file as the multipart field `file`.
    ///
    /// The content type is guessed from `file_name`; the bytes are sent as-is.
    pub async fn recognize_file(&self, file_name: &str, bytes: Vec<u8>) -> Result<RecognitionResponse, ClientError> {
        let mime = mime_guess::from_path(file_name).first_or_octet_stream();
        tracing::debug!(
            url = %self.upload_url,
            file = file_name,
            mime = %mime,
            bytes = bytes.len(),
            "uploading file"
        );

        let part = Part::bytes(bytes)
            .file_name(file_name.to_string())
            .mime_str(mime.as_ref())?;
        let form = Form::new().part("file", part);

        let resp = self
            .http
            .post(self.upload_url.clone())
            .multipart(form)
            .send()
            .await?;
        decode(resp).await
    }
}

async fn decode(resp: reqwest::Response) -> Result<RecognitionResponse, ClientError> {
    let status = resp.status();
    let body = resp.text().await?;
    if !status.is_success() {
        return Err(ClientError::Status { status, body });
    }
    let parsed: RecognitionResponse = serde_json::from_str(&body)?;
    tracing::info!(
        faces = ?parsed.face_count(),
        filename = ?parsed.filename,
        "recognition response received"
    );
    Ok(parsed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use celebcam_core::FaceEntry;
    use httpmock::Method::POST;
    use httpmock::MockServer;

    const ROW_RESPONSE: &str = r#"{"filename": "captured_image.jpg", "celebrity_info": [
        null,
        ["nm0000001", "Jane Doe", "1984-06-05", null, 40, "https://imdb.example/nm1", "https://img.example/1.jpg",
         "https://bucket.example/nm1.jpg?sig=x", "https://img.example/1a.jpg"]
    ]}"#;

    #[tokio::test]
    async fn snapshot_posts_json_image() {
        let server = MockServer::start_async().await;
        let mock = server.mock(|when, then| {
            when.method(POST)
                .path("/uploadImage")
                .header("content-type", "application/json")
                .json_body(serde_json::json!({"image": "/9j/abcd"}));
            then.status(200)
                .header("content-type", "application/json")
                .body(ROW_RESPONSE);
        });

        let client = RecognitionClient::new(&server.base_url(), None).unwrap();
        let resp = client.recognize_snapshot("/9j/abcd").await.unwrap();
        mock.assert();

        let faces = resp.celebrity_info.unwrap();
        assert_eq!(faces.len(), 2);
        assert_eq!(faces[0], FaceEntry::Unmatched);
        let FaceEntry::Matched(info) = &faces[1] else {
            panic!("second face should be matched");
        };
        assert_eq!(info.id, "nm0000001");
        assert_eq!(info.portrait_url, "https://img.example/1.jpg");
    }

    #[tokio::test]
    async fn file_upload_is_multipart() {
        let server = MockServer::start_async().await;
        let mock = server.mock(|when, then| {
            when.method(POST)
                .path("/uploadFile/")
                .body_contains("name=\"file\"")
                .body_contains("filename=\"face.png\"")
                .body_contains("image/png")
                .body_contains("PNGDATA");
            then.status(200)
                .header("content-type", "application/json")
                .body(r#"{"celebrity_info": null}"#);
        });

        let client = RecognitionClient::new(&server.base_url(), None).unwrap();
        let resp = client
            .recognize_file("face.png", b"PNGDATA".to_vec())
            .await
            .unwrap();
        mock.assert_hits(1);
        assert_eq!(resp.celebrity_info, None);
    }

    #[tokio::test]
    async fn server_error_carries_detail() {
        let server = MockServer::start_async().await;
        server.mock(|when, then| {
            when.method(POST).path("/uploadImage");
            then.status(500).body(r#"{"detail": "no database"}"#);
        });

        let client = RecognitionClient::new(&server.base_url(), None).unwrap();
        let err = client.recognize_snapshot("abcd").await.unwrap_err();
        match err {
            ClientError::Status { status, body } => {
                assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
                assert!(body.contains("no database"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn malformed_json_is_decode_error() {
        let server = MockServer::start_async().await;
        server.mock(|when, then| {
            when.method(POST).path("/uploadFile/");
            then.status(200).body("<html>oops</html>");
        });

        let client = RecognitionClient::new(&server.base_url(), None).unwrap();
        let err = client.recognize_file("a.jpg", vec![1, 2, 3]).await.unwrap_err();
        assert!(matches!(err, ClientError::Decode(_)));
    }

    #[test]
    fn urls_respect_base_path() {
        let client = RecognitionClient::new("http://host:8000/api", None).unwrap();
        assert_eq!(client.snapshot_url().as_str(), "http://host:8000/api/uploadImage");
        assert_eq!(client.upload_url().as_str(), "http://host:8000/api/uploadFile/");

        let client = RecognitionClient::new("http://host:8000/", None).unwrap();
        assert_eq!(client.snapshot_url().as_str(), "http://host:8000/uploadImage");
    }

    #[test]
    fn invalid_base_url() {
        assert!(matches!(
            RecognitionClient::new("not a url", None),
            Err(ClientError::InvalidUrl { .. })
        ));
    }
}
