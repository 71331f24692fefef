//! Middleware for logging requests and responses.

use axum::{
    body::{Body, Bytes},
    extract::Request,
    http::{Method, header::CONTENT_TYPE},
    middleware::Next,
    response::{IntoResponse, Response},
};

/// Form fields whose values must never reach the logs.
const REDACTED_FIELDS: [&str; 3] = ["password", "confirm_password", "new_password"];

/// The number of bytes of a request or response body to log at the `info` level.
pub const LOG_BODY_LENGTH_LIMIT: usize = 64;

/// Log the request and response for each request.
///
/// Both the request and response are logged at the `info` level.
/// If the body is longer than [LOG_BODY_LENGTH_LIMIT] bytes, it is
/// truncated and the full body is logged at the `debug` level.
/// Password fields in submitted forms are redacted.
pub async fn logging_middleware(request: Request, next: Next) -> Response {
    let (parts, body) = request.into_parts();
    let body_bytes = match axum::body::to_bytes(body, usize::MAX).await {
        Ok(bytes) => bytes,
        Err(error) => {
            tracing::error!("Could not read request body: {error}");
            return axum::http::StatusCode::BAD_REQUEST.into_response();
        }
    };
    let body_text = String::from_utf8_lossy(&body_bytes);

    let is_form_post = parts.method == Method::POST
        && parts
            .headers
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .is_some_and(|value| value.starts_with("application/x-www-form-urlencoded"));

    if is_form_post {
        let display_text = REDACTED_FIELDS
            .iter()
            .fold(body_text.to_string(), |text, field| redact_field(&text, field));
        log_body("Received request", &format!("{parts:#?}"), &display_text);
    } else {
        log_body("Received request", &format!("{parts:#?}"), &body_text);
    }

    let request = Request::from_parts(parts, Body::from(body_bytes));
    let response = next.run(request).await;

    let (parts, body) = response.into_parts();
    let body_bytes = match axum::body::to_bytes(body, usize::MAX).await {
        Ok(bytes) => bytes,
        Err(error) => {
            tracing::error!("Could not read response body: {error}");
            Bytes::new()
        }
    };
    log_body(
        "Sending response",
        &format!("{parts:#?}"),
        &String::from_utf8_lossy(&body_bytes),
    );

    Response::from_parts(parts, Body::from(body_bytes))
}

/// Replace the value of `field_name` in a URL-encoded form body with asterisks.
fn redact_field(form_text: &str, field_name: &str) -> String {
    let prefix = format!("{field_name}=");

    form_text
        .split('&')
        .map(|pair| {
            if pair.starts_with(&prefix) {
                format!("{prefix}********")
            } else {
                pair.to_owned()
            }
        })
        .collect::<Vec<_>>()
        .join("&")
}

fn log_body(label: &str, headers: &str, body: &str) {
    if body.len() > LOG_BODY_LENGTH_LIMIT {
        let cut = (0..=LOG_BODY_LENGTH_LIMIT)
            .rev()
            .find(|index| body.is_char_boundary(*index))
            .unwrap_or(0);

        tracing::info!("{label}: {headers}\nbody: {}...", &body[..cut]);
        tracing::debug!("Full body: {body:?}");
    } else {
        tracing::info!("{label}: {headers}\nbody: {body:?}");
    }
}

#[cfg(test)]
mod tests {
    use super::redact_field;

    #[test]
    fn redacts_only_named_field() {
        let form = "username=asha&password=hunter2&confirm_password=hunter2";

        let redacted = redact_field(form, "password");

        assert_eq!(
            redacted,
            "username=asha&password=********&confirm_password=hunter2"
        );
    }

    #[test]
    fn leaves_form_without_field_untouched() {
        assert_eq!(redact_field("amount=12.50", "password"), "amount=12.50");
    }

    #[test]
    fn redacts_new_password() {
        assert_eq!(
            redact_field("new_password=secret", "new_password"),
            "new_password=********"
        );
    }
}
