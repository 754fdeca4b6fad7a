// Content negotiation
// Requests are decoded per Content-Type; responses follow Accept, then Content-Type, then JSON

use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use gateway_core::codec::{self, DataFormat};
use serde::Serialize;
use tracing::error;

fn header_str(headers: &HeaderMap, name: header::HeaderName) -> Option<&str> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .filter(|value| !value.trim().is_empty())
}

/// Raw Content-Type header
pub fn content_type(headers: &HeaderMap) -> Option<String> {
    header_str(headers, header::CONTENT_TYPE).map(str::to_string)
}

/// Format of the request body
pub fn request_format(headers: &HeaderMap) -> gateway_core::Result<DataFormat> {
    DataFormat::from_content_type(header_str(headers, header::CONTENT_TYPE))
}

/// Format the client wants back
pub fn response_format(headers: &HeaderMap) -> DataFormat {
    if let Some(accept) = header_str(headers, header::ACCEPT) {
        if let Some(format) = accept
            .split(',')
            .find_map(|media_type| DataFormat::from_content_type(Some(media_type)).ok())
        {
            return format;
        }
    }

    header_str(headers, header::CONTENT_TYPE)
        .and_then(|value| DataFormat::from_content_type(Some(value)).ok())
        .unwrap_or(DataFormat::Json)
}

/// Response body encoded in a negotiated format
pub struct Encoded<T>(pub DataFormat, pub T);

impl<T: Serialize> IntoResponse for Encoded<T> {
    fn into_response(self) -> Response {
        let Encoded(format, value) = self;
        match codec::encode(format, &value) {
            Ok(body) => (
                StatusCode::OK,
                [(header::CONTENT_TYPE, format.content_type())],
                body,
            )
                .into_response(),
            Err(e) => {
                error!("Failed to encode response: {}", e);
                StatusCode::INTERNAL_SERVER_ERROR.into_response()
            }
        }
    }
}
