use crate::nav::{decode_component, encode_component};
use crate::view::{EntryView, LetterSlot, ResultRow, ResultsView};
use crate::{Address, LexiconDataset, Lexicon, LoadError, Mode, QueryState, RichText, alphabet};
use askama::Html as HtmlEscaper;
use askama::{MarkupDisplay, Template};
use axum::{
    Json, Router,
    extract::{Query, State},
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    routing::{get, post},
};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::fmt;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::signal;
use tower_http::compression::CompressionLayer;
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::{info, warn};

type SharedState = Arc<AppState>;
type SafeJson = MarkupDisplay<HtmlEscaper, String>;

pub struct AppState {
    lexicon: RwLock<Arc<Lexicon>>,
    pub theme: WebTheme,
    pub base_url: String,
    pub data_path: Option<PathBuf>,
}

impl AppState {
    pub fn new(
        lexicon: Lexicon,
        theme: WebTheme,
        base_url: impl Into<String>,
        data_path: Option<PathBuf>,
    ) -> Self {
        Self {
            lexicon: RwLock::new(Arc::new(lexicon)),
            theme,
            base_url: base_url.into(),
            data_path,
        }
    }

    /// Snapshot of the current lexicon; a reload never disturbs it.
    pub fn lexicon(&self) -> Arc<Lexicon> {
        Arc::clone(&self.lexicon.read())
    }

    fn replace(&self, lexicon: Lexicon) {
        *self.lexicon.write() = Arc::new(lexicon);
    }
}

#[derive(Debug, Clone, Copy, Eq, PartialEq, Default)]
pub enum WebTheme {
    #[default]
    Tailwind,
    Bootstrap,
}

impl fmt::Display for WebTheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WebTheme::Tailwind => write!(f, "tailwind"),
            WebTheme::Bootstrap => write!(f, "bootstrap"),
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Chrome {
    use_tailwind: bool,
    use_bootstrap: bool,
    body_class: &'static str,
    main_class: &'static str,
    card_class: &'static str,
    eyebrow_class: &'static str,
    headline_class: &'static str,
    lede_class: &'static str,
    chip_class: &'static str,
    chip_active_class: &'static str,
    button_class: &'static str,
}

impl Chrome {
    fn new(theme: WebTheme) -> Self {
        match theme {
            WebTheme::Tailwind => Self {
                use_tailwind: true,
                use_bootstrap: false,
                body_class: "bg-slate-50 text-slate-900",
                main_class: "min-h-screen flex flex-col items-center justify-start py-10 px-4",
                card_class: "max-w-5xl w-full space-y-6",
                eyebrow_class: "uppercase tracking-wide text-sm text-slate-500",
                headline_class: "text-4xl font-extrabold tracking-tight",
                lede_class: "text-lg text-slate-600",
                chip_class: "px-3 py-1 rounded-full bg-white border text-sm",
                chip_active_class: "px-3 py-1 rounded-full bg-slate-900 text-white text-sm",
                button_class: "inline-flex items-center rounded-md bg-slate-900 px-4 py-2 text-white font-semibold shadow hover:bg-slate-800 transition-colors",
            },
            WebTheme::Bootstrap => Self {
                use_tailwind: false,
                use_bootstrap: true,
                body_class: "bg-light text-dark",
                main_class: "container py-5",
                card_class: "mx-auto col-lg-10",
                eyebrow_class: "text-uppercase text-muted mb-2",
                headline_class: "display-5 fw-bold",
                lede_class: "lead mb-4",
                chip_class: "badge rounded-pill text-bg-light border",
                chip_active_class: "badge rounded-pill text-bg-dark",
                button_class: "btn btn-primary btn-lg px-4 py-2",
            },
        }
    }
}

#[derive(Clone)]
pub struct WebConfig {
    pub addr: SocketAddr,
    pub theme: WebTheme,
    pub base_url: String,
    pub data_path: PathBuf,
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            addr: SocketAddr::from(([127, 0, 0, 1], 8080)),
            theme: WebTheme::default(),
            base_url: "http://127.0.0.1:8080".to_string(),
            data_path: PathBuf::from("data/lexicon.json"),
        }
    }
}

#[derive(Debug)]
pub enum WebError {
    Io(std::io::Error),
    Load(LoadError),
}

impl fmt::Display for WebError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WebError::Io(err) => write!(f, "io error: {err}"),
            WebError::Load(err) => write!(f, "{err}"),
        }
    }
}

impl std::error::Error for WebError {}

impl From<std::io::Error> for WebError {
    fn from(value: std::io::Error) -> Self {
        WebError::Io(value)
    }
}

impl From<LoadError> for WebError {
    fn from(value: LoadError) -> Self {
        WebError::Load(value)
    }
}

pub async fn serve(config: WebConfig) -> Result<(), WebError> {
    let lexicon = Lexicon::load(&config.data_path)?;
    let state = Arc::new(AppState::new(
        lexicon,
        config.theme,
        config.base_url.clone(),
        Some(config.data_path.clone()),
    ));
    let router = build_router(state);
    info!(
        %config.addr,
        theme = ?config.theme,
        base = %config.base_url,
        data = %config.data_path.display(),
        "Binding HTTP listener"
    );
    let listener = TcpListener::bind(config.addr).await?;
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    info!("HTTP server exited");
    Ok(())
}

#[derive(Debug)]
struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }

    fn not_found(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            message: message.into(),
        }
    }

    fn internal(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: message.into(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let payload = json!({ "error": self.message });
        (self.status, Json(payload)).into_response()
    }
}

pub fn build_router(state: SharedState) -> Router {
    Router::new()
        .route("/", get(home))
        .route("/entry", get(entry_html))
        .route("/api/search", get(api_search))
        .route("/api/entry", get(api_entry))
        .route("/api/overview", get(api_overview))
        .route("/api/reload", post(api_reload))
        .route("/healthz", get(health))
        .with_state(state)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().include_headers(true))
                .on_response(DefaultOnResponse::new().include_headers(true)),
        )
        .layer(CompressionLayer::new())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        let _ = signal::ctrl_c().await;
    };
    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        if let Ok(mut stream) = signal(SignalKind::terminate()) {
            let _ = stream.recv().await;
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

async fn health(State(state): State<SharedState>) -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "service": "lexica-web",
        "entries": state.lexicon().len(),
    }))
}

#[derive(Debug, Default, Deserialize)]
struct SearchParams {
    q: Option<String>,
    pos: Option<String>,
    /// Comma-separated tag list; a comma inside a tag travels as `%2C`.
    tags: Option<String>,
    /// A browse letter, or `all`.
    letter: Option<String>,
    limit: Option<usize>,
}

#[derive(Debug, Deserialize)]
struct EntryParams {
    a: Option<String>,
}

#[derive(Debug, Serialize)]
struct SearchResponsePayload {
    state: QueryState,
    #[serde(flatten)]
    results: ResultsView,
}

fn state_from_params(params: &SearchParams) -> Result<QueryState, ApiError> {
    let mut state = match params.letter.as_deref().map(str::trim) {
        Some(letter) if letter.eq_ignore_ascii_case("all") => QueryState::browse(None),
        Some(letter) if !letter.is_empty() => {
            let parsed = alphabet::parse_letter(letter)
                .ok_or_else(|| ApiError::bad_request(format!("{letter:?} is not a browse letter")))?;
            QueryState::browse(Some(parsed))
        }
        _ => QueryState::search(params.q.clone().unwrap_or_default()),
    };
    state.set_pos(params.pos.clone());
    for raw in params.tags.as_deref().unwrap_or("").split(',') {
        let tag = decode_component(raw).unwrap_or_else(|| raw.to_string());
        state.add_tag(&tag);
    }
    Ok(state)
}

fn results_payload(lexicon: &Lexicon, params: &SearchParams) -> Result<SearchResponsePayload, ApiError> {
    let state = state_from_params(params)?;
    let cap = params
        .limit
        .unwrap_or(lexicon.config().result_cap)
        .clamp(1, lexicon.config().result_cap.max(1));
    let results = lexicon.query_capped(&state, cap);
    let view = ResultsView::from(&results);
    Ok(SearchResponsePayload {
        state,
        results: view,
    })
}

async fn api_search(
    State(state): State<SharedState>,
    Query(params): Query<SearchParams>,
) -> Result<Json<SearchResponsePayload>, ApiError> {
    let lexicon = state.lexicon();
    Ok(Json(results_payload(&lexicon, &params)?))
}

fn entry_from_params(lexicon: &Lexicon, params: &EntryParams) -> Result<EntryView, ApiError> {
    let address = params
        .a
        .as_deref()
        .map(str::trim)
        .filter(|a| !a.is_empty())
        .ok_or_else(|| ApiError::bad_request("Query parameter `a` is required"))?;
    lexicon
        .resolve_position(address)
        .and_then(|position| lexicon.entry_view(position))
        .ok_or_else(|| ApiError::not_found(format!("No entry found for {address:?}")))
}

async fn api_entry(
    State(state): State<SharedState>,
    Query(params): Query<EntryParams>,
) -> Result<Json<EntryView>, ApiError> {
    let lexicon = state.lexicon();
    Ok(Json(entry_from_params(&lexicon, &params)?))
}

async fn api_overview(State(state): State<SharedState>) -> impl IntoResponse {
    Json(state.lexicon().overview())
}

async fn api_reload(State(state): State<SharedState>) -> Result<impl IntoResponse, ApiError> {
    let path = state
        .data_path
        .clone()
        .ok_or_else(|| ApiError::bad_request("This server has no dataset path to reload from"))?;
    let dataset = tokio::task::spawn_blocking(move || LexiconDataset::from_path(&path))
        .await
        .map_err(|err| ApiError::internal(err.to_string()))?
        .map_err(|err| {
            warn!(error = %err, "Lexicon reload failed; keeping the previous dataset");
            ApiError::internal(err.to_string())
        })?;
    let lexicon = Lexicon::with_config(dataset, *state.lexicon().config());
    let entries = lexicon.len();
    state.replace(lexicon);
    info!(entries, "Reloaded lexicon");
    Ok(Json(json!({ "status": "reloaded", "entries": entries })))
}

struct LetterLink {
    slot: LetterSlot,
    label: String,
    href: String,
    active: bool,
}

struct TagLink {
    label: String,
    count: usize,
    href: String,
    active: bool,
}

struct PosLink {
    label: String,
    href: String,
    active: bool,
}

struct RowLink {
    row: ResultRow,
    href: Option<String>,
}

/// Rebuilds `/?…` from a state, so every link keeps the other filters.
fn home_href(state: &QueryState) -> String {
    let mut pairs: Vec<String> = Vec::new();
    match state.mode {
        Mode::Search => {
            if !state.query.is_empty() {
                pairs.push(format!("q={}", encode_component(&state.query)));
            }
        }
        Mode::Browse(None) => pairs.push("letter=all".to_string()),
        Mode::Browse(Some(letter)) => {
            pairs.push(format!("letter={}", encode_component(&letter.to_string())))
        }
    }
    if let Some(pos) = &state.pos {
        pairs.push(format!("pos={}", encode_component(pos)));
    }
    if !state.tags.is_empty() {
        let tags: Vec<String> = state.tags.iter().map(|tag| encode_component(tag)).collect();
        pairs.push(format!("tags={}", encode_component(&tags.join(","))));
    }
    if pairs.is_empty() {
        "/".to_string()
    } else {
        format!("/?{}", pairs.join("&"))
    }
}

fn entry_href(address: &Address) -> String {
    format!("/entry?a={}", encode_component(address.as_str()))
}

fn rich_html(text: &RichText) -> String {
    text.to_html_with(entry_href)
}

async fn home(
    State(state): State<SharedState>,
    Query(params): Query<SearchParams>,
) -> impl IntoResponse {
    let lexicon = state.lexicon();
    let chrome = Chrome::new(state.theme);
    let payload = match results_payload(&lexicon, &params) {
        Ok(payload) => payload,
        Err(err) => return (err.status, Html(render_error_page(state.theme, err.message))),
    };
    let query_state = &payload.state;
    let overview = lexicon.overview();

    let letters = overview
        .letters
        .iter()
        .map(|slot| {
            let mut next = query_state.clone();
            next.mode = Mode::Browse(Some(slot.letter));
            LetterLink {
                slot: *slot,
                label: slot.letter.to_uppercase().to_string(),
                href: home_href(&next),
                active: query_state.mode == Mode::Browse(Some(slot.letter)),
            }
        })
        .collect::<Vec<_>>();
    let browse_all_href = {
        let mut next = query_state.clone();
        next.mode = Mode::Browse(None);
        home_href(&next)
    };
    let tags = overview
        .tags
        .iter()
        .map(|tag| {
            let mut next = query_state.clone();
            next.toggle_tag(&tag.label);
            TagLink {
                label: tag.label.clone(),
                count: tag.count,
                href: home_href(&next),
                active: query_state.has_tag(&tag.label),
            }
        })
        .collect::<Vec<_>>();
    let parts_of_speech = overview
        .parts_of_speech
        .iter()
        .map(|option| {
            let active = query_state.pos.as_deref() == Some(option.code.as_str());
            let mut next = query_state.clone();
            next.set_pos((!active).then(|| option.code.clone()));
            PosLink {
                label: option.label.clone(),
                href: home_href(&next),
                active,
            }
        })
        .collect::<Vec<_>>();
    let rows = payload
        .results
        .rows
        .iter()
        .map(|row| RowLink {
            href: row.address.as_ref().map(entry_href),
            row: row.clone(),
        })
        .collect::<Vec<_>>();

    let template = HomeTemplate {
        chrome,
        title: &overview.title,
        subtitle: &overview.subtitle,
        query: &query_state.query,
        browsing: query_state.mode.is_browse(),
        browse_all_active: query_state.mode == Mode::Browse(None),
        browse_all_href,
        letters,
        tags,
        parts_of_speech,
        rows,
        total: payload.results.total,
        truncated: payload.results.truncated,
    };
    let body = template
        .render()
        .unwrap_or_else(|err| render_error_page(state.theme, err.to_string()));
    (StatusCode::OK, Html(body))
}

struct DefinitionBlock {
    gloss_html: String,
    notes_html: Option<String>,
}

struct ExampleBlock {
    src_html: String,
    gloss: Option<String>,
}

async fn entry_html(
    State(state): State<SharedState>,
    Query(params): Query<EntryParams>,
) -> impl IntoResponse {
    let lexicon = state.lexicon();
    let view = match entry_from_params(&lexicon, &params) {
        Ok(view) => view,
        Err(err) => return (err.status, Html(render_error_page(state.theme, err.message))),
    };
    let definitions = view
        .definitions
        .iter()
        .map(|def| DefinitionBlock {
            gloss_html: rich_html(&def.gloss),
            notes_html: def.notes.as_ref().map(rich_html),
        })
        .collect();
    let examples = view
        .examples
        .iter()
        .map(|example| ExampleBlock {
            src_html: rich_html(&example.src),
            gloss: example.gloss.clone(),
        })
        .collect();
    let plain_text = lexicon
        .entry(view.position)
        .map(crate::view::entry_text)
        .unwrap_or_default();
    let canonical_url = view
        .address
        .as_ref()
        .map(|address| format!("{}{}", state.base_url, entry_href(address)))
        .unwrap_or_else(|| state.base_url.clone());
    let json_ld = MarkupDisplay::new_safe(
        entry_json_ld(&view, &canonical_url, lexicon.title()),
        HtmlEscaper,
    );
    let template = EntryTemplate {
        chrome: Chrome::new(state.theme),
        dataset_title: lexicon.title(),
        view: &view,
        fragment: view.address.as_ref().map(Address::fragment),
        canonical_url,
        json_ld,
        definitions,
        examples,
        plain_text,
    };
    let body = template
        .render()
        .unwrap_or_else(|err| render_error_page(state.theme, err.to_string()));
    (StatusCode::OK, Html(body))
}

fn entry_json_ld(view: &EntryView, url: &str, set_name: &str) -> String {
    let mut term = json!({
        "@context": "https://schema.org",
        "@type": "DefinedTerm",
        "@id": url,
        "url": url,
        "name": view.headword,
        "inDefinedTermSet": set_name,
    });
    if let Some(first) = view.definitions.first() {
        term["description"] = json!(first.gloss.plain_text());
    }
    if !view.pos.is_empty() {
        term["termCode"] = json!(view.pos);
    }
    serde_json::to_string_pretty(&term)
        .map(|text| text.replace("</", "<\\/"))
        .unwrap_or_else(|_| "{}".to_string())
}

fn render_error_page(theme: WebTheme, message: impl Into<String>) -> String {
    let chrome = Chrome::new(theme);
    let (css_tag, js_tag) = match theme {
        WebTheme::Tailwind => (
            r#"<script src="https://cdn.jsdelivr.net/npm/@tailwindcss/browser@4"></script>"#,
            "",
        ),
        WebTheme::Bootstrap => (
            r#"<link href="https://cdn.jsdelivr.net/npm/bootstrap@5.3.8/dist/css/bootstrap.min.css" rel="stylesheet" crossorigin="anonymous">"#,
            r#"<script src="https://cdn.jsdelivr.net/npm/bootstrap@5.3.8/dist/js/bootstrap.bundle.min.js" crossorigin="anonymous"></script>"#,
        ),
    };
    let message = crate::linkify::escape_html(&message.into());
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
  <head>
    <meta charset="utf-8" />
    <meta name="viewport" content="width=device-width, initial-scale=1" />
    <title>Lexicon • Error</title>
    {css_tag}
    {js_tag}
  </head>
  <body class="{body_class}">
    <main class="{main_class}">
      <div class="{card_class}">
        <h1 class="{headline_class}">Something went wrong</h1>
        <p class="{lede_class}">{message}</p>
        <a href="/" class="{button_class}">Back to search</a>
      </div>
    </main>
  </body>
</html>"#,
        css_tag = css_tag,
        js_tag = js_tag,
        body_class = chrome.body_class,
        main_class = chrome.main_class,
        card_class = chrome.card_class,
        headline_class = chrome.headline_class,
        lede_class = chrome.lede_class,
        button_class = chrome.button_class,
        message = message,
    )
}

#[derive(Template)]
#[template(
    source = r#"<!DOCTYPE html>
<html lang="en">
  <head>
    <meta charset="utf-8" />
    <meta name="viewport" content="width=device-width, initial-scale=1" />
    <title>{{ title }}</title>
    {% if chrome.use_tailwind %}
    <script src="https://cdn.jsdelivr.net/npm/@tailwindcss/browser@4"></script>
    {% endif %}
    {% if chrome.use_bootstrap %}
    <link href="https://cdn.jsdelivr.net/npm/bootstrap@5.3.8/dist/css/bootstrap.min.css" rel="stylesheet" crossorigin="anonymous">
    {% endif %}
  </head>
  <body class="{{ chrome.body_class }}">
    <main class="{{ chrome.main_class }}">
      <div class="{{ chrome.card_class }}">
        <div>
          <p class="{{ chrome.eyebrow_class }}">{{ subtitle }}</p>
          <h1 class="{{ chrome.headline_class }}">{{ title }}</h1>
        </div>

        <form method="get" action="/" class="flex gap-3">
          <input type="search" name="q" value="{{ query }}" placeholder="Search headwords, glosses, tags…" class="flex-1 rounded border px-3 py-2 form-control">
          <button type="submit" class="{{ chrome.button_class }}">Search</button>
          <a href="/" class="{{ chrome.button_class }}">Clear</a>
        </form>

        <nav aria-label="Browse by letter" class="flex flex-wrap gap-2">
          <a href="{{ browse_all_href }}" class="{% if browse_all_active %}{{ chrome.chip_active_class }}{% else %}{{ chrome.chip_class }}{% endif %}">All</a>
          {% for letter in letters %}
          {% if letter.slot.enabled %}
          <a href="{{ letter.href }}" class="{% if letter.active %}{{ chrome.chip_active_class }}{% else %}{{ chrome.chip_class }}{% endif %}">{{ letter.label }}</a>
          {% else %}
          <span class="{{ chrome.chip_class }} opacity-40" aria-disabled="true">{{ letter.label }}</span>
          {% endif %}
          {% endfor %}
        </nav>

        {% if parts_of_speech.len() > 0 %}
        <section class="flex flex-wrap gap-2" aria-label="Part of speech">
          {% for pos in parts_of_speech %}
          <a href="{{ pos.href }}" class="{% if pos.active %}{{ chrome.chip_active_class }}{% else %}{{ chrome.chip_class }}{% endif %}">{{ pos.label }}</a>
          {% endfor %}
        </section>
        {% endif %}

        {% if tags.len() > 0 %}
        <section class="flex flex-wrap gap-2" aria-label="Tags">
          {% for tag in tags %}
          <a href="{{ tag.href }}" class="{% if tag.active %}{{ chrome.chip_active_class }}{% else %}{{ chrome.chip_class }}{% endif %}">{{ tag.label }} <span class="text-xs">({{ tag.count }})</span></a>
          {% endfor %}
        </section>
        {% endif %}

        <section id="results">
          <p class="{{ chrome.lede_class }}">{{ total }} match{% if total != 1 %}es{% endif %}{% if truncated %} (first {{ rows.len() }} shown){% endif %}{% if browsing %} • browsing{% endif %}</p>
          {% if rows.len() == 0 %}
          <p>No matches.</p>
          {% else %}
          <div class="space-y-2">
            {% for item in rows %}
            <div class="bg-white shadow rounded p-3 card card-body">
              {% if let Some(href) = item.href.as_ref() %}
              <a href="{{ href }}" class="font-semibold">{{ item.row.headword }}</a>
              {% else %}
              <strong>{{ item.row.headword }}</strong>
              {% endif %}
              <span class="text-slate-500 text-muted">({{ item.row.pos_label }})</span><br/>
              <span class="text-slate-500 text-muted">{{ item.row.primary_gloss }}</span>
            </div>
            {% endfor %}
          </div>
          {% endif %}
        </section>
      </div>
    </main>
  </body>
</html>"#,
    ext = "html"
)]
struct HomeTemplate<'a> {
    chrome: Chrome,
    title: &'a str,
    subtitle: &'a str,
    query: &'a str,
    browsing: bool,
    browse_all_active: bool,
    browse_all_href: String,
    letters: Vec<LetterLink>,
    tags: Vec<TagLink>,
    parts_of_speech: Vec<PosLink>,
    rows: Vec<RowLink>,
    total: usize,
    truncated: bool,
}

#[derive(Template)]
#[template(
    source = r#"<!DOCTYPE html>
<html lang="en">
  <head>
    <meta charset="utf-8" />
    <meta name="viewport" content="width=device-width, initial-scale=1" />
    <title>{{ dataset_title }} • {{ view.headword }}</title>
    {% if chrome.use_tailwind %}
    <script src="https://cdn.jsdelivr.net/npm/@tailwindcss/browser@4"></script>
    {% endif %}
    {% if chrome.use_bootstrap %}
    <link href="https://cdn.jsdelivr.net/npm/bootstrap@5.3.8/dist/css/bootstrap.min.css" rel="stylesheet" crossorigin="anonymous">
    {% endif %}
    <link rel="canonical" href="{{ canonical_url }}">
    <script type="application/ld+json">
    {{ json_ld }}
    </script>
  </head>
  <body class="{{ chrome.body_class }}">
    <main class="{{ chrome.main_class }}">
      <div class="{{ chrome.card_class }}">
        <div>
          <p class="{{ chrome.eyebrow_class }}">{{ view.pos_label }}{% if let Some(fragment) = fragment.as_ref() %} • <code>{{ fragment }}</code>{% endif %}</p>
          <h1 class="{{ chrome.headline_class }}">{{ view.headword }}</h1>
          {% if let Some(pron) = view.pron.as_ref() %}
          <p class="{{ chrome.lede_class }}">{{ pron }}</p>
          {% endif %}
        </div>

        {% if definitions.len() > 0 %}
        <section id="definitions">
          <h2 class="text-xl font-semibold mb-2">Definitions</h2>
          <ol class="list-decimal pl-6 space-y-1">
            {% for def in definitions %}
            <li>{{ def.gloss_html|safe }}{% if let Some(notes) = def.notes_html.as_ref() %} <span class="text-slate-500 text-muted">— {{ notes|safe }}</span>{% endif %}</li>
            {% endfor %}
          </ol>
        </section>
        {% endif %}

        {% if examples.len() > 0 %}
        <section id="examples">
          <h2 class="text-xl font-semibold mb-2">Examples</h2>
          <ul class="list-disc pl-6 space-y-2">
            {% for example in examples %}
            <li>{{ example.src_html|safe }}{% if let Some(gloss) = example.gloss.as_ref() %}<br/><span class="text-slate-500 text-muted">{{ gloss }}</span>{% endif %}</li>
            {% endfor %}
          </ul>
        </section>
        {% endif %}

        {% if view.tags.len() > 0 %}
        <section id="tags" class="flex flex-wrap gap-2">
          {% for tag in view.tags %}
          <span class="{{ chrome.chip_class }}">{{ tag }}</span>
          {% endfor %}
        </section>
        {% endif %}

        <details>
          <summary>Plain text</summary>
          <pre>{{ plain_text }}</pre>
        </details>

        <a href="/" class="{{ chrome.button_class }}">Back to search</a>
      </div>
    </main>
  </body>
</html>"#,
    ext = "html"
)]
struct EntryTemplate<'a> {
    chrome: Chrome,
    dataset_title: &'a str,
    view: &'a EntryView,
    fragment: Option<String>,
    canonical_url: String,
    json_ld: SafeJson,
    definitions: Vec<DefinitionBlock>,
    examples: Vec<ExampleBlock>,
    plain_text: String,
}

#[cfg(all(test, feature = "web"))]
mod tests {
    use super::*;
    use crate::data::{Definition, Entry};
    use axum::{body, body::Body, http::Request};
    use tower::ServiceExt;

    fn entry(headword: &str, gloss: &str, tags: &[&str]) -> Entry {
        Entry {
            headword: headword.to_string(),
            pos: "n".to_string(),
            defs: vec![Definition {
                gloss: gloss.to_string(),
                notes: None,
            }],
            tags: tags.iter().map(|t| t.to_string()).collect(),
            ..Entry::default()
        }
    }

    fn test_router() -> Router {
        let dataset = LexiconDataset::new(
            Default::default(),
            vec![
                entry("aiga", "water, see <b>ríu</b>", &["nature"]),
                entry("ríu", "river full of aiga", &["nature", "place"]),
                entry("çò", "that", &[]),
                Entry {
                    id: Some("anon 1".into()),
                    ..Entry::default()
                },
            ],
        );
        let state = Arc::new(AppState::new(
            Lexicon::new(dataset),
            WebTheme::Tailwind,
            "http://127.0.0.1:8080",
            None,
        ));
        build_router(state)
    }

    async fn get_body(router: Router, uri: &str) -> (StatusCode, String) {
        let response = router
            .oneshot(Request::get(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, String::from_utf8(bytes.to_vec()).unwrap())
    }

    #[tokio::test]
    async fn api_search_ranks_and_counts() {
        let (status, body) = get_body(test_router(), "/api/search?q=aiga").await;
        assert!(status.is_success());
        let payload: serde_json::Value = serde_json::from_str(&body).unwrap();
        assert_eq!(payload["total"], 2);
        assert_eq!(payload["rows"][0]["headword"], "aiga");
    }

    #[tokio::test]
    async fn api_search_browses_cedilla_bucket() {
        let (status, body) = get_body(test_router(), "/api/search?letter=%C3%A7").await;
        assert!(status.is_success());
        let payload: serde_json::Value = serde_json::from_str(&body).unwrap();
        assert_eq!(payload["total"], 1);
        assert_eq!(payload["rows"][0]["headword"], "çò");
    }

    #[tokio::test]
    async fn api_search_rejects_unknown_letter() {
        let (status, _) = get_body(test_router(), "/api/search?letter=k").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn api_entry_resolves_id_addresses() {
        let uri = format!("/api/entry?a={}", encode_component("id:anon%201"));
        let (status, body) = get_body(test_router(), &uri).await;
        assert!(status.is_success(), "{body}");
        let payload: serde_json::Value = serde_json::from_str(&body).unwrap();
        assert_eq!(payload["address"], "id:anon%201");
    }

    #[tokio::test]
    async fn api_entry_missing_is_404() {
        let (status, body) = get_body(test_router(), "/api/entry?a=nothing").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(body.contains("error"));
    }

    #[tokio::test]
    async fn entry_page_links_and_escapes() {
        let (status, html) = get_body(test_router(), "/entry?a=aiga").await;
        assert!(status.is_success());
        assert!(html.contains("&lt;b&gt;"));
        assert!(html.contains(r#"<a class="xref" href="/entry?a=r%25C3%25ADu">ríu</a>"#));
        assert!(html.contains("application/ld+json"));
    }

    #[tokio::test]
    async fn home_page_lists_facets() {
        let (status, html) = get_body(test_router(), "/?tags=nature").await;
        assert!(status.is_success());
        assert!(html.contains("2 matches"));
        assert!(html.contains("place"));
    }

    #[tokio::test]
    async fn reload_without_path_is_rejected() {
        let response = test_router()
            .oneshot(
                Request::post("/api/reload")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn home_href_keeps_filters() {
        let state = QueryState::search("red fox").with_pos("n").with_tag("Wild");
        assert_eq!(home_href(&state), "/?q=red%20fox&pos=n&tags=wild");
        assert_eq!(home_href(&QueryState::browse(None)), "/?letter=all");
        assert_eq!(home_href(&QueryState::default()), "/");
    }

    #[tokio::test]
    async fn tags_containing_commas_survive_links() {
        let dataset = LexiconDataset::new(
            Default::default(),
            vec![
                entry("sal", "salt", &["salt, fresh"]),
                entry("aiga", "water", &["salt", "fresh"]),
            ],
        );
        let state = Arc::new(AppState::new(
            Lexicon::new(dataset),
            WebTheme::Tailwind,
            "http://127.0.0.1:8080",
            None,
        ));
        let href = home_href(&QueryState::browse(None).with_tag("salt, fresh"));
        assert_eq!(href, "/?letter=all&tags=salt%252C%2520fresh");

        let uri = href.replacen('/', "/api/search", 1);
        let (status, body) = get_body(build_router(Arc::clone(&state)), &uri).await;
        assert!(status.is_success(), "{body}");
        let payload: serde_json::Value = serde_json::from_str(&body).unwrap();
        assert_eq!(payload["total"], 1);
        assert_eq!(payload["rows"][0]["headword"], "sal");

        let (_, body) = get_body(build_router(state), "/api/search?letter=all&tags=salt,fresh").await;
        let payload: serde_json::Value = serde_json::from_str(&body).unwrap();
        assert_eq!(payload["rows"][0]["headword"], "aiga");
        assert_eq!(payload["total"], 1);
    }

    #[tokio::test]
    async fn reload_keeps_the_query_config() {
        let fixture = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/lexicon.json");
        let config = crate::QueryConfig {
            result_cap: 5,
            top_tags: 2,
        };
        let state = Arc::new(AppState::new(
            Lexicon::with_config(LexiconDataset::default(), config),
            WebTheme::Bootstrap,
            "http://127.0.0.1:8080",
            Some(fixture),
        ));
        let response = build_router(Arc::clone(&state))
            .oneshot(Request::post("/api/reload").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert!(response.status().is_success());
        let lexicon = state.lexicon();
        assert_eq!(lexicon.len(), 12);
        assert_eq!(*lexicon.config(), config);
        assert_eq!(lexicon.top_tags().len(), 2);
    }
}
