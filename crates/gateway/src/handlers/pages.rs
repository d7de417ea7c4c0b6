//! HTML pages
//!
//! A prebuilt frontend in `server.static_dir` takes over both pages when it
//! ships an `index.html`; otherwise the inline pages below are served.

use axum::{extract::State, response::Html};
use std::path::Path;

use crate::AppState;

const HOME_PAGE: &str = include_str!("../../assets/home.html");
const CREATE_PAGE: &str = include_str!("../../assets/create.html");

pub async fn home(State(state): State<AppState>) -> Html<String> {
    page(&state, HOME_PAGE).await
}

pub async fn create_form(State(state): State<AppState>) -> Html<String> {
    page(&state, CREATE_PAGE).await
}

async fn page(state: &AppState, inline: &'static str) -> Html<String> {
    let index = Path::new(&state.config.server.static_dir).join("index.html");

    match tokio::fs::read_to_string(&index).await {
        Ok(html) => Html(html),
        Err(_) => Html(inline.to_string()),
    }
}
