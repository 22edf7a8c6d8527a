//! reqwest-backed transport talking to the recognition service.

use super::{EnrollRequest, ServerReply, Submission, Transport, TransportError};
use crate::config::EndpointConfig;
use crate::encoding::EncodedImage;
use reqwest::multipart::{Form, Part};
use std::time::Duration;

/// Multipart HTTP client for the attendance and enrollment endpoints.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    attendance_url: String,
    enroll_url: String,
}

impl HttpTransport {
    /// Builds a client with the configured timeouts.
    pub fn new(config: &EndpointConfig) -> Result<Self, TransportError> {
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_millis(config.connect_timeout_ms))
            .timeout(Duration::from_millis(config.request_timeout_ms))
            .build()
            .map_err(TransportError::Client)?;

        Ok(Self {
            client,
            attendance_url: config.attendance_url(),
            enroll_url: config.enroll_url(),
        })
    }

    pub fn attendance_url(&self) -> &str {
        &self.attendance_url
    }

    pub fn enroll_url(&self) -> &str {
        &self.enroll_url
    }

    async fn post(&self, url: &str, form: Form) -> Result<ServerReply, TransportError> {
        let response = self
            .client
            .post(url)
            .multipart(form)
            .send()
            .await
            .map_err(TransportError::Request)?;

        let status = response.status().as_u16();
        let body = response.bytes().await.map_err(TransportError::Request)?;

        tracing::debug!(url, status, bytes = body.len(), "Received reply");
        ServerReply::parse(status, &body)
    }
}

fn image_part(image: EncodedImage, file_name: String) -> Result<Part, TransportError> {
    let mime = image.mime();
    Part::bytes(image.into_bytes())
        .file_name(file_name)
        .mime_str(mime)
        .map_err(TransportError::Request)
}

impl Transport for HttpTransport {
    async fn mark_attendance(&self, submission: Submission) -> Result<ServerReply, TransportError> {
        tracing::debug!(
            session = %submission.session,
            sequence = submission.sequence,
            bytes = submission.image.len(),
            "Submitting frame"
        );
        let form = Form::new()
            .part("image", image_part(submission.image, "scan.jpg".to_string())?)
            .text("sessionName", submission.session.as_str().to_string());

        self.post(&self.attendance_url, form).await
    }

    async fn register_face(&self, request: EnrollRequest) -> Result<ServerReply, TransportError> {
        tracing::debug!(
            reg_no = request.student.reg_no(),
            images = request.images.len(),
            "Submitting enrollment"
        );
        let mut form = Form::new()
            .text("name", request.student.name().to_string())
            .text("reg_no", request.student.reg_no().to_string());
        for (i, image) in request.images.into_iter().enumerate() {
            form = form.part("images[]", image_part(image, format!("capture_{i}.jpg"))?);
        }

        self.post(&self.enroll_url, form).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::SessionId;

    #[test]
    fn test_urls_from_config() {
        let config = EndpointConfig {
            base_url: "http://10.0.0.5:5000/".to_string(),
            ..Default::default()
        };
        let transport = HttpTransport::new(&config).unwrap();

        assert_eq!(
            transport.attendance_url(),
            "http://10.0.0.5:5000/api/mark-attendance-session"
        );
        assert_eq!(transport.enroll_url(), "http://10.0.0.5:5000/api/register-face");
    }

    #[tokio::test]
    async fn test_unreachable_server_is_request_error() {
        // Port 9 (discard) on localhost is closed on any sane test host
        let config = EndpointConfig {
            base_url: "http://127.0.0.1:9".to_string(),
            connect_timeout_ms: 500,
            request_timeout_ms: 1000,
            ..Default::default()
        };
        let transport = HttpTransport::new(&config).unwrap();
        let submission = Submission {
            session: SessionId::new("CS101").unwrap(),
            image: EncodedImage::new(vec![0xFF, 0xD8, 0xFF, 0xD9], 1, 1, "image/jpeg"),
            sequence: 1,
        };

        let result = transport.mark_attendance(submission).await;
        assert!(matches!(result, Err(TransportError::Request(_))));
    }
}
