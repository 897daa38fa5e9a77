//! Common assertions over test responses.

use axum::http::StatusCode;
use image::{GenericImageView, ImageFormat};

use super::app::TestResponse;

pub fn assert_status(response: &TestResponse, expected: StatusCode) {
    assert_eq!(
        response.status,
        expected,
        "Unexpected status, body: {}",
        response.text()
    );
}

/// Assert a JSON `{ "error": ... }` body with the given status; returns the message.
pub fn assert_json_error(response: &TestResponse, expected: StatusCode) -> String {
    assert_status(response, expected);
    assert_eq!(response.header("content-type"), Some("application/json"));

    let json = response.json();
    let message = json["error"]
        .as_str()
        .expect("error field should be a string")
        .to_string();
    assert!(!message.is_empty(), "error message should not be empty");
    message
}

/// Assert a successful image response; returns the decoded dimensions.
pub fn assert_image(response: &TestResponse, mime: &str, format: ImageFormat) -> (u32, u32) {
    assert_status(response, StatusCode::OK);
    assert_eq!(response.header("content-type"), Some(mime));
    assert_eq!(
        response.header("cache-control"),
        Some("public, max-age=31536000, immutable")
    );
    assert_eq!(image::guess_format(&response.body).unwrap(), format);

    image::load_from_memory(&response.body)
        .expect("response should decode")
        .dimensions()
}
