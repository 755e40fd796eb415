use axum::{
    extract::State,
    http::header,
    response::IntoResponse,
    Json,
};
use serde::Serialize;

use crate::http::server::AppState;
use crate::routing::route::RouteUri;

#[derive(Serialize)]
pub struct SystemStatus {
    pub version: &'static str,
    pub status: &'static str,
    pub routes: usize,
    pub base_url: String,
}

#[derive(Serialize)]
pub struct RouteStatus {
    pub path: String,
    pub uri: String,
    pub kind: String,
    pub target: String,
    pub methods: Vec<String>,
    pub middleware: Vec<String>,
    pub case_sensitive: bool,
    pub in_sitemap: bool,
}

impl RouteStatus {
    fn new(base_url: &str, route: &RouteUri) -> Self {
        Self {
            path: route.path(),
            uri: format!("{base_url}{}", route.path()),
            kind: route.kind().to_string(),
            target: route.target().describe(),
            methods: route.allowed_methods().iter().map(ToString::to_string).collect(),
            middleware: route.middleware().to_vec(),
            case_sensitive: route.case_sensitive(),
            in_sitemap: route.in_sitemap(),
        }
    }
}

pub async fn get_status(State(state): State<AppState>) -> Json<SystemStatus> {
    let inner = state.current();
    let routes = inner.dispatcher.routes();
    Json(SystemStatus {
        version: env!("CARGO_PKG_VERSION"),
        status: "operational",
        routes: routes.routes_count(),
        base_url: routes.base_url().to_string(),
    })
}

/// Static routes sorted by path, then variable routes in registration order.
pub async fn get_routes(State(state): State<AppState>) -> Json<Vec<RouteStatus>> {
    let inner = state.current();
    let routes = inner.dispatcher.routes();
    Json(
        routes
            .iter()
            .map(|r| RouteStatus::new(routes.base_url(), r))
            .collect(),
    )
}

pub async fn get_sitemap(State(state): State<AppState>) -> impl IntoResponse {
    let xml = state.current().dispatcher.routes().sitemap();
    ([(header::CONTENT_TYPE, "text/xml")], xml)
}
