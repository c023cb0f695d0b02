//! Page surface.
//!
//! Pages themselves are rendered elsewhere; once the guard has allowed a page
//! request this handler reports the identity it was allowed for.

use axum::Json;
use axum::http::Uri;
use serde_json::{Value, json};

use crate::extractors::Caller;

/// Fallback for every page path that passed the page guard.
pub async fn render(uri: Uri, caller: Option<Caller>) -> Json<Value> {
    Json(json!({
        "status": "success",
        "path": uri.path(),
        "identity": caller.map(|c| c.identity),
    }))
}
