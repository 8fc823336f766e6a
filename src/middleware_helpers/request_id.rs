use crate::i18n::Locale;
use crate::telemetry::{RequestContext, RequestId};
use axum::{
    extract::Request,
    http::{header, header::HeaderName, HeaderValue},
    middleware::Next,
    response::Response,
};

/// Header name for the request ID
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Tags every request with an id and the caller's preferred locale, and runs
/// the rest of the stack inside that request scope.
pub async fn request_id_middleware(mut request: Request, next: Next) -> Response {
    let request_id = request
        .headers()
        .get(REQUEST_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(RequestId::new)
        .unwrap_or_default();

    let locale = request
        .headers()
        .get(header::ACCEPT_LANGUAGE)
        .and_then(|v| v.to_str().ok())
        .map(Locale::from_accept_language)
        .unwrap_or_default();

    request.extensions_mut().insert(request_id.clone());
    request.extensions_mut().insert(locale);

    let ctx = RequestContext::new(request_id.clone(), locale);
    let mut response =
        crate::telemetry::scope_request(ctx, async move { next.run(request).await }).await;

    if let Ok(value) = HeaderValue::from_str(request_id.as_str()) {
        response
            .headers_mut()
            .insert(HeaderName::from_static(REQUEST_ID_HEADER), value);
    }

    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::{to_bytes, Body},
        extract::Extension,
        http::{Request as HttpRequest, StatusCode},
        routing::get,
        Router,
    };
    use tower::ServiceExt;

    async fn echo_handler(
        Extension(request_id): Extension<RequestId>,
        Extension(locale): Extension<Locale>,
    ) -> (StatusCode, String) {
        (StatusCode::OK, format!("{}|{:?}", request_id.as_str(), locale))
    }

    #[tokio::test]
    async fn propagates_incoming_id_and_locale() {
        let app = Router::new()
            .route("/", get(echo_handler))
            .layer(axum::middleware::from_fn(request_id_middleware));

        let response = app
            .oneshot(
                HttpRequest::builder()
                    .uri("/")
                    .header(REQUEST_ID_HEADER, "client-42")
                    .header("accept-language", "ar-SA")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(
            response.headers().get(REQUEST_ID_HEADER).unwrap(),
            "client-42"
        );
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(String::from_utf8(body.to_vec()).unwrap(), "client-42|Ar");
    }

    #[tokio::test]
    async fn generates_id_when_missing() {
        let app = Router::new()
            .route("/", get(echo_handler))
            .layer(axum::middleware::from_fn(request_id_middleware));

        let response = app
            .oneshot(HttpRequest::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();

        let header = response.headers().get(REQUEST_ID_HEADER).cloned();
        assert!(header.is_some());
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert!(String::from_utf8(body.to_vec()).unwrap().ends_with("|En"));
    }
}
