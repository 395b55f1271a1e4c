use axum::response::Response;
use meditalks_core::{Language, context};

use crate::models::{self, ContextJson, ContextsData, LanguageJson};

pub async fn contexts() -> Response {
    models::success(ContextsData {
        contexts: context::all().iter().map(ContextJson::from).collect(),
        languages: Language::ALL.into_iter().map(LanguageJson::from).collect(),
    })
}
