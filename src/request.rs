//! Building a [`RequestView`] from an axum request.

use std::collections::HashMap;
use std::convert::Infallible;

use axum::extract::{FromRequestParts, Query, RawPathParams};
use axum::http::request::Parts;
use axum_extra::extract::cookie::CookieJar;
use tokengate_auth::RequestView;

/// Snapshot of headers, query string, cookies and path parameters.
///
/// Header values that are not visible ASCII are skipped. A query string that
/// does not parse as `key=value` pairs contributes nothing.
pub async fn request_view(parts: &mut Parts) -> RequestView {
    let mut view = RequestView::new();

    for (name, value) in &parts.headers {
        if let Ok(value) = value.to_str() {
            view = view.with_header(name.as_str(), value);
        }
    }

    if let Ok(Query(query)) = Query::<HashMap<String, String>>::try_from_uri(&parts.uri) {
        for (name, value) in query {
            view = view.with_query(name, value);
        }
    }

    for cookie in CookieJar::from_headers(&parts.headers).iter() {
        view = view.with_cookie(cookie.name(), cookie.value());
    }

    if let Ok(params) = RawPathParams::from_request_parts(parts, &()).await {
        for (name, value) in &params {
            view = view.with_param(name, value);
        }
    }

    view
}

/// Extractor form of [`request_view`].
#[derive(Debug, Clone)]
pub struct RequestSnapshot(pub RequestView);

impl<S> FromRequestParts<S> for RequestSnapshot
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self(request_view(parts).await))
    }
}
