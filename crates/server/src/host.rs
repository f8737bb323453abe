//! HTTP host in front of the origin.
//!
//! Every incoming request is turned into a [`RequestDescriptor`] against the
//! configured origin and handed to the [`InterceptProxy`]. Cached and fetched
//! responses carry an `x-cache` header.

use actix_web::http::StatusCode;
use actix_web::{HttpRequest, HttpResponse, HttpResponseBuilder, web};
use cachefront_client::fetch::resolve;
use cachefront_core::{Error, RequestDescriptor, ResponseSnapshot};
use url::Url;

use crate::error::CannotLoad;
use crate::proxy::{InterceptProxy, Interception};

pub const CACHE_HEADER: &str = "x-cache";

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/{tail:.*}", web::route().to(handle));
}

async fn handle(req: HttpRequest, body: web::Bytes, proxy: web::Data<InterceptProxy>) -> HttpResponse {
    let request = match descriptor(&req, body, proxy.origin()) {
        Ok(request) => request,
        Err(e) => return HttpResponse::BadRequest().content_type("text/plain").body(e.to_string()),
    };

    match proxy.intercept(&request).await {
        Interception::Hit(snapshot) => snapshot_response(&snapshot, Some("HIT")),
        Interception::Miss(snapshot) => snapshot_response(&snapshot, Some("MISS")),
        Interception::Failed(body) => HttpResponse::build(cannot_load_status())
            .content_type("application/json")
            .body(body.to_json()),
        Interception::Passthrough => match proxy.passthrough(&request).await {
            Ok(snapshot) => snapshot_response(&snapshot, None),
            Err(e) => {
                tracing::warn!(method = %request.method(), url = %request.url(), error = %e, "passthrough failed");
                HttpResponse::BadGateway().content_type("text/plain").body(e.to_string())
            }
        },
    }
}

/// Rebuild the incoming request against the origin.
fn descriptor(req: &HttpRequest, body: web::Bytes, origin: &Url) -> Result<RequestDescriptor, Error> {
    let method = http::Method::from_bytes(req.method().as_str().as_bytes())
        .map_err(|e| Error::InvalidInput(format!("unsupported method: {e}")))?;
    let path_and_query = req.uri().path_and_query().map(|pq| pq.as_str()).unwrap_or("/");
    let url = resolve(origin, path_and_query).map_err(|e| Error::InvalidUrl(e.to_string()))?;

    let mut headers = http::HeaderMap::with_capacity(req.headers().len());
    for (name, value) in req.headers().iter() {
        match (
            http::HeaderName::from_bytes(name.as_str().as_bytes()),
            http::HeaderValue::from_bytes(value.as_bytes()),
        ) {
            (Ok(name), Ok(value)) => {
                headers.append(name, value);
            }
            _ => tracing::debug!(header = %name, "dropping header"),
        }
    }

    Ok(RequestDescriptor::new(method, url).with_headers(headers).with_body(body))
}

fn snapshot_response(snapshot: &ResponseSnapshot, cache: Option<&'static str>) -> HttpResponse {
    let status = StatusCode::from_u16(snapshot.status()).unwrap_or(StatusCode::BAD_GATEWAY);
    let mut builder = HttpResponseBuilder::new(status);
    for (name, value) in snapshot.headers() {
        builder.append_header((name.as_str(), value.as_str()));
    }
    if let Some(cache) = cache {
        builder.insert_header((CACHE_HEADER, cache));
    }
    builder.body(snapshot.body().clone())
}

fn cannot_load_status() -> StatusCode {
    StatusCode::from_u16(CannotLoad::STATUS).unwrap_or(StatusCode::BAD_GATEWAY)
}
