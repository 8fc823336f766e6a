//! Request-scoped context and HTTP tracing.

use axum::http::Request;
use std::{cell::RefCell, fmt, future::Future};
use tower_http::{
    classify::{ServerErrorsAsFailures, SharedClassifier},
    trace::{DefaultOnFailure, DefaultOnResponse, MakeSpan, TraceLayer},
};
use tracing::Level;
use uuid::Uuid;

use crate::i18n::Locale;

/// Request ID tracking information
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RequestId(String);

impl Default for RequestId {
    fn default() -> Self {
        RequestId(Uuid::new_v4().to_string())
    }
}

impl RequestId {
    /// Accepts a client supplied id when it is a short visible-ASCII token,
    /// otherwise generates a fresh one.
    pub fn new(value: impl Into<String>) -> Self {
        let value = value.into();
        let valid = !value.is_empty()
            && value.len() <= 128
            && value.bytes().all(|b| b.is_ascii_graphic());
        if valid {
            RequestId(value)
        } else {
            RequestId::default()
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Clone, Debug)]
pub struct RequestContext {
    pub request_id: RequestId,
    pub locale: Locale,
}

impl RequestContext {
    pub fn new(request_id: RequestId, locale: Locale) -> Self {
        Self { request_id, locale }
    }
}

tokio::task_local! {
    static CURRENT_REQUEST: RefCell<Option<RequestContext>>;
}

pub async fn scope_request<Fut, R>(ctx: RequestContext, future: Fut) -> R
where
    Fut: Future<Output = R>,
{
    CURRENT_REQUEST.scope(RefCell::new(Some(ctx)), future).await
}

pub fn current_request_id() -> Option<RequestId> {
    CURRENT_REQUEST
        .try_with(|cell| cell.borrow().as_ref().map(|ctx| ctx.request_id.clone()))
        .ok()
        .flatten()
}

pub fn current_locale() -> Locale {
    CURRENT_REQUEST
        .try_with(|cell| cell.borrow().as_ref().map(|ctx| ctx.locale))
        .ok()
        .flatten()
        .unwrap_or_default()
}

#[derive(Clone, Default)]
pub struct RequestSpanMaker;

impl<B> MakeSpan<B> for RequestSpanMaker {
    fn make_span(&mut self, request: &Request<B>) -> tracing::Span {
        let request_id = request
            .extensions()
            .get::<RequestId>()
            .cloned()
            .unwrap_or_default();

        tracing::info_span!(
            "http.request",
            request_id = %request_id,
            method = %request.method(),
            uri = %request.uri(),
        )
    }
}

/// Trace layer producing one span per request, tagged with its request id.
pub fn http_trace_layer() -> TraceLayer<SharedClassifier<ServerErrorsAsFailures>, RequestSpanMaker>
{
    TraceLayer::new_for_http()
        .make_span_with(RequestSpanMaker)
        .on_response(DefaultOnResponse::new().level(Level::INFO))
        .on_failure(DefaultOnFailure::new().level(Level::ERROR))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn context_is_visible_inside_scope_only() {
        assert!(current_request_id().is_none());
        assert_eq!(current_locale(), Locale::En);

        let ctx = RequestContext::new(RequestId::new("abc-1"), Locale::Ar);
        let (id, locale) =
            scope_request(ctx, async { (current_request_id(), current_locale()) }).await;
        assert_eq!(id.map(|r| r.to_string()).as_deref(), Some("abc-1"));
        assert_eq!(locale, Locale::Ar);
    }

    #[test]
    fn rejects_unprintable_request_ids() {
        let rid = RequestId::new("bad id\n");
        assert_ne!(rid.as_str(), "bad id\n");
        assert_eq!(rid.as_str().len(), 36);
    }
}
