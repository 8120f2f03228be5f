use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};

use super::AppState;
use super::auth::TokenQuery;
use crate::render::page::{self, AudienceView, PresenterView};

pub async fn audience(State(state): State<AppState>) -> Html<String> {
    let (deck, resync) = state.live.view();
    let slide_html = state.live.slide_html(&deck, resync.slide_index);
    Html(page::audience_page(&AudienceView {
        deck: &deck,
        theme: &state.settings.theme,
        resync,
        slide_html: &slide_html,
    }))
}

pub async fn presenter(State(state): State<AppState>, Query(query): Query<TokenQuery>) -> Response {
    if !state.token.verify(query.token.as_deref()) {
        return (StatusCode::UNAUTHORIZED, Html(page::access_denied_page())).into_response();
    }

    let (deck, resync) = state.live.view();
    let index = resync.slide_index;
    let slide_html = state.live.slide_html(&deck, index);
    let next_html = state.live.next_preview_html(&deck, index);
    let notes_html = state.live.notes_html(&deck, index);
    Html(page::presenter_page(&PresenterView {
        deck: &deck,
        theme: &state.settings.theme,
        resync,
        slide_html: &slide_html,
        next_html: &next_html,
        notes_html: &notes_html,
        token: state.token.as_str(),
    }))
    .into_response()
}
