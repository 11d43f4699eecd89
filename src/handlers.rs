use axum::{
    async_trait,
    body::Bytes,
    extract::{FromRequest, Multipart, Request, State},
    http::{header, StatusCode},
    response::{Html, IntoResponse, Response},
    Router,
};

use crate::errors::WikiError;
use crate::router::Route;
use crate::services::Outcome;
use crate::types::{AppState, WikiForm};

/// Build the HTTP application. Every path goes through the wiki router, so
/// anything it cannot decode is a 404.
pub fn app(state: AppState) -> Router {
    Router::new().fallback(handle_request).with_state(state)
}

/// Handle a wiki request of any method
pub async fn handle_request(
    State(state): State<AppState>,
    request: Request,
) -> Result<Response, WikiError> {
    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let route = match Route::from_request_path(&path) {
        Ok(route) => route,
        Err(e) => {
            log::warn!("{} {}: {}", method, path, e);
            return Err(e.into());
        }
    };
    log::info!("{} {}", method, path);

    // Only read once the path is known to be a wiki route, so bad paths stay 404
    let form = WikiForm::from_request(request, &state).await?;

    let start_time = std::time::Instant::now();
    let outcome = state.dispatcher.dispatch(route, form).await?;
    log::debug!("Dispatched {} in {}ms", path, start_time.elapsed().as_millis());

    let html = match outcome {
        Outcome::Redirect(location) => return Ok(redirect(location)),
        Outcome::View(page) => state.templates.render_view(&page)?,
        Outcome::Edit(page) => state.templates.render_edit(&page)?,
        Outcome::Search { query, page, notice } => {
            state.templates.render_search(&query, &page, notice.as_deref())?
        }
    };
    Ok(Html(html).into_response())
}

/// Reads the `body` field the way an HTML form may send it.
///
/// A posted value (urlencoded or multipart) wins over one in the query string,
/// and with repeated keys the first `body` counts. A request with no form at
/// all reads as an empty body. Form data that is present but cannot be
/// decoded is rejected, so a save never proceeds on a body it failed to read.
#[async_trait]
impl<S> FromRequest<S> for WikiForm
where
    S: Send + Sync,
{
    type Rejection = WikiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let from_query = match req.uri().query() {
            Some(query) => first_body_value(query.as_bytes())?,
            None => None,
        };
        let content_type = req
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_ascii_lowercase();

        let posted = if content_type.starts_with("application/x-www-form-urlencoded") {
            let bytes = Bytes::from_request(req, state)
                .await
                .map_err(|e| WikiError::BadForm(e.body_text()))?;
            first_body_value(&bytes)?
        } else if content_type.starts_with("multipart/form-data") {
            let multipart = Multipart::from_request(req, state)
                .await
                .map_err(|e| WikiError::BadForm(e.body_text()))?;
            multipart_body_value(multipart).await?
        } else {
            None
        };

        Ok(WikiForm { body: posted.or(from_query).unwrap_or_default() })
    }
}

fn first_body_value(raw: &[u8]) -> Result<Option<String>, WikiError> {
    let pairs: Vec<(String, String)> =
        serde_urlencoded::from_bytes(raw).map_err(|e| WikiError::BadForm(e.to_string()))?;
    Ok(pairs.into_iter().find(|(key, _)| key == "body").map(|(_, value)| value))
}

async fn multipart_body_value(mut multipart: Multipart) -> Result<Option<String>, WikiError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| WikiError::BadForm(e.to_string()))?
    {
        if field.name() == Some("body") {
            let text = field.text().await.map_err(|e| WikiError::BadForm(e.to_string()))?;
            return Ok(Some(text));
        }
    }
    Ok(None)
}

fn redirect(location: String) -> Response {
    (StatusCode::FOUND, [(header::LOCATION, location)]).into_response()
}
