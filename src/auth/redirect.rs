//! Helpers for redirect URLs during authentication flows.

use axum::{extract::Request, http::Uri};
use tracing::{error, warn};

use crate::endpoints;

fn is_safe_redirect_url(redirect_url: &str) -> bool {
    if !redirect_url.starts_with('/') || redirect_url.starts_with("//") {
        return false;
    }

    let path = redirect_url
        .split_once('?')
        .map(|(path, _)| path)
        .unwrap_or(redirect_url);

    path != endpoints::LOG_IN_VIEW && path != endpoints::LOG_OUT
}

/// Reduce `raw_url` to a path and query on this site, or `None` if it
/// points elsewhere or back to the log-in page.
pub fn normalize_redirect_url(raw_url: &str) -> Option<String> {
    let uri = raw_url.parse::<Uri>().ok()?;
    if uri.scheme().is_some() || uri.authority().is_some() {
        return None;
    }
    let path_and_query = uri.path_and_query()?.as_str();

    is_safe_redirect_url(path_and_query).then(|| path_and_query.to_owned())
}

fn normalize_hx_current_url(raw_url: &str) -> Option<String> {
    let uri = raw_url.parse::<Uri>().ok()?;
    let path_and_query = uri.path_and_query()?.as_str();

    is_safe_redirect_url(path_and_query).then(|| path_and_query.to_owned())
}

/// Whether the request was sent by htmx.
pub fn is_hx_request(request: &Request) -> bool {
    request
        .headers()
        .get("hx-request")
        .and_then(|header| header.to_str().ok())
        .is_some_and(|header| header.eq_ignore_ascii_case("true"))
}

/// The log-in URL that sends the user back to where they were after logging in.
///
/// Requests sent by htmx come back to the page they were sent from, other
/// page requests come back to the requested URL. JSON API requests without
/// htmx headers have no page to come back to and return `None`.
pub fn build_log_in_redirect_url(request: &Request) -> Option<String> {
    let redirect_target = if is_hx_request(request) {
        redirect_target_from_hx_request(request)?
    } else if request.uri().path().starts_with("/api") {
        return None;
    } else {
        redirect_target_from_request_uri(request)?
    };

    build_log_in_redirect_url_from_target(&redirect_target)
}

pub(super) fn build_log_in_redirect_url_from_target(redirect_target: &str) -> Option<String> {
    match serde_urlencoded::to_string([("redirect_url", redirect_target)]) {
        Ok(param) => Some(format!("{}?{}", endpoints::LOG_IN_VIEW, param)),
        Err(error) => {
            error!("Could not encode redirect URL {redirect_target}: {error}");
            None
        }
    }
}

fn redirect_target_from_request_uri(request: &Request) -> Option<String> {
    let path_and_query = request.uri().path_and_query()?.as_str();
    normalize_redirect_url(path_and_query)
}

fn redirect_target_from_hx_request(request: &Request) -> Option<String> {
    let current_url = match request
        .headers()
        .get("hx-current-url")
        .and_then(|header| header.to_str().ok())
    {
        Some(value) => value,
        None => {
            warn!("Missing HX-Current-URL header for htmx request.");
            return None;
        }
    };

    let redirect_url = normalize_hx_current_url(current_url);
    if redirect_url.is_none() {
        warn!("Invalid HX-Current-URL header value: {current_url}");
    }

    redirect_url
}

#[cfg(test)]
mod tests {
    use axum::{body::Body, extract::Request};

    use crate::endpoints;

    use super::{build_log_in_redirect_url, normalize_redirect_url};

    #[test]
    fn keeps_local_path_and_query() {
        assert_eq!(
            normalize_redirect_url("/expenses?page=2&category=Food"),
            Some("/expenses?page=2&category=Food".to_owned())
        );
    }

    #[test]
    fn rejects_other_sites() {
        assert_eq!(normalize_redirect_url("https://example.com/expenses"), None);
        assert_eq!(normalize_redirect_url("//example.com/expenses"), None);
    }

    #[test]
    fn rejects_log_in_page() {
        assert_eq!(normalize_redirect_url(endpoints::LOG_IN_VIEW), None);
    }

    #[test]
    fn page_request_redirects_back_to_itself() {
        let request = Request::get("/expenses?page=2").body(Body::empty()).unwrap();

        let got = build_log_in_redirect_url(&request);

        assert_eq!(
            got,
            Some("/log_in?redirect_url=%2Fexpenses%3Fpage%3D2".to_owned())
        );
    }

    #[test]
    fn hx_request_redirects_back_to_current_page() {
        let request = Request::post(endpoints::UPDATE_PROFILE)
            .header("HX-Request", "true")
            .header("HX-Current-URL", "http://localhost:3000/settings")
            .body(Body::empty())
            .unwrap();

        let got = build_log_in_redirect_url(&request);

        assert_eq!(got, Some("/log_in?redirect_url=%2Fsettings".to_owned()));
    }

    #[test]
    fn plain_api_request_has_no_redirect() {
        let request = Request::get(endpoints::CHART_DATA_API)
            .body(Body::empty())
            .unwrap();

        assert_eq!(build_log_in_redirect_url(&request), None);
    }
}
