//! Request routing for the `/v2/:t/...` image endpoints.
//!
//! This is transport agnostic: a [`Request`] is a method plus a request
//! target, a [`Response`] is a status, headers and body. Any HTTP server can
//! sit in front of [`Router::handle`].

use tracing::{debug, error};

use crate::cache::RenderCache;
use crate::format::ImageFormat;
use crate::render::{RenderOptions, Renderer};

pub const INVALID_PROGRESS_MESSAGE: &str = "Parameter `t` must be a number";
pub const CACHE_CONTROL: &str = "public, max-age:86400";

const PNG_ROUTE_FILE: &str = "hill-chart.png";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Request {
    pub method: String,
    pub path: String,
    pub query: Vec<(String, String)>,
}

impl Request {
    /// Splits `target` into a decoded path and query pairs.
    pub fn new(method: &str, target: &str) -> Self {
        let (path, query) = match target.split_once('?') {
            Some((path, query)) => (path, parse_query(query)),
            None => (target, Vec::new()),
        };
        Self {
            method: method.to_ascii_uppercase(),
            path: path.to_string(),
            query,
        }
    }

    pub fn get(target: &str) -> Self {
        Self::new("GET", target)
    }

    /// First value for `key`, if present.
    pub fn query_param(&self, key: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    fn query_flag(&self, key: &str) -> bool {
        matches!(self.query_param(key), Some("true") | Some("1"))
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Response {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl Response {
    fn text(status: u16, message: &str) -> Self {
        Self {
            status,
            headers: vec![(
                "Content-Type".to_string(),
                "text/plain; charset=utf-8".to_string(),
            )],
            body: message.as_bytes().to_vec(),
        }
    }

    fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.push((name.to_string(), value.into()));
        self
    }

    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Parsed image endpoint parameters.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChartRequest {
    /// Clamped progress in whole percent.
    pub percent: u8,
    pub format: ImageFormat,
    pub options: RenderOptions,
    pub download: bool,
}

impl ChartRequest {
    pub fn progress(&self) -> f64 {
        f64::from(self.percent) / 100.0
    }

    pub fn filename(&self) -> String {
        let mut name = format!("hill-chart-at-{}", self.percent);
        if let Some(title) = self.options.title_text() {
            name.push('-');
            name.push_str(&underscore_whitespace(title));
        }
        name.push('.');
        name.push_str(self.format.extension());
        name
    }

    pub fn content_disposition(&self) -> String {
        let kind = if self.download { "attachment" } else { "inline" };
        format!(
            "{}; filename=\"{}\"",
            kind,
            self.filename().replace('"', "\\\"")
        )
    }
}

enum Routed {
    Chart(ChartRequest),
    Rejected(Response),
}

pub struct Router {
    renderer: Renderer,
    cache: Option<RenderCache>,
}

impl Default for Router {
    fn default() -> Self {
        Self::new(Renderer::default())
    }
}

impl Router {
    pub fn new(renderer: Renderer) -> Self {
        Self {
            renderer,
            cache: None,
        }
    }

    /// Memoizes encoded images in an LRU cache of `capacity` entries.
    pub fn with_cache(renderer: Renderer, capacity: usize) -> Self {
        Self {
            renderer: renderer.clone(),
            cache: Some(RenderCache::new(renderer, capacity)),
        }
    }

    pub fn cache(&self) -> Option<&RenderCache> {
        self.cache.as_ref()
    }

    pub fn handle(&mut self, request: &Request) -> Response {
        let chart = match parse_route(request) {
            Routed::Chart(chart) => chart,
            Routed::Rejected(response) => {
                debug!(
                    method = %request.method,
                    path = %request.path,
                    status = response.status,
                    "request rejected"
                );
                return response;
            }
        };
        debug!(
            percent = chart.percent,
            format = %chart.format,
            download = chart.download,
            "routing chart request"
        );

        let rendered = match self.cache.as_mut() {
            Some(cache) => cache.render(chart.progress(), chart.format, &chart.options),
            None => self
                .renderer
                .render(chart.progress(), chart.format, &chart.options),
        };
        match rendered {
            Ok(body) => Response {
                status: 200,
                headers: Vec::new(),
                body,
            }
            .with_header("Content-Type", chart.format.mime_type())
            .with_header("Content-Disposition", chart.content_disposition())
            .with_header("Cache-Control", CACHE_CONTROL),
            Err(e) => {
                error!(path = %request.path, "render failed: {}", e);
                Response::text(500, "Internal Server Error")
            }
        }
    }
}

/// Routes `request` with the default theme and no cache.
pub fn route(request: &Request) -> Response {
    Router::default().handle(request)
}

fn parse_route(request: &Request) -> Routed {
    let segments: Vec<String> = request
        .path
        .split('/')
        .skip(1)
        .map(percent_decode)
        .collect();
    let (raw_t, image_type) = match segments.as_slice() {
        [version, t] if version == "v2" && !t.is_empty() => (t.as_str(), None),
        [version, t, kind] if version == "v2" && !t.is_empty() => {
            (t.as_str(), Some(kind.as_str()))
        }
        _ => return Routed::Rejected(Response::text(404, "Not Found")),
    };
    if request.method != "GET" {
        return Routed::Rejected(
            Response::text(405, "Method Not Allowed").with_header("Allow", "GET"),
        );
    }

    let Some(value) = parse_progress_percent(raw_t) else {
        return Routed::Rejected(Response::text(422, INVALID_PROGRESS_MESSAGE));
    };
    let format = match image_type {
        Some(kind) if kind.eq_ignore_ascii_case(PNG_ROUTE_FILE) => ImageFormat::Png,
        Some(kind) => ImageFormat::from_token(kind),
        None => ImageFormat::Jpeg,
    };
    let options = RenderOptions {
        title: request
            .query_param("title")
            .filter(|title| !title.is_empty())
            .map(str::to_string),
        show_labels: !request.query_flag("hideLabels"),
    };
    Routed::Chart(ChartRequest {
        percent: value.clamp(0, 100) as u8,
        format,
        options,
        download: request.query_flag("download"),
    })
}

/// Leading-integer parse: optional whitespace, an optional sign, then
/// digits. Trailing garbage is ignored; no digits at all yields `None`.
/// Values saturate instead of overflowing.
pub fn parse_progress_percent(raw: &str) -> Option<i64> {
    let trimmed = raw.trim_start();
    let (negative, digits) = match trimmed.as_bytes().first() {
        Some(b'-') => (true, &trimmed[1..]),
        Some(b'+') => (false, &trimmed[1..]),
        _ => (false, trimmed),
    };
    let mut value: i64 = 0;
    let mut seen = false;
    for b in digits.bytes().take_while(u8::is_ascii_digit) {
        seen = true;
        value = value.saturating_mul(10).saturating_add(i64::from(b - b'0'));
    }
    if !seen {
        return None;
    }
    Some(if negative { -value } else { value })
}

/// Replaces every run of whitespace with a single `_`.
fn underscore_whitespace(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut in_run = false;
    for ch in text.chars() {
        if ch.is_whitespace() {
            if !in_run {
                out.push('_');
            }
            in_run = true;
        } else {
            out.push(ch);
            in_run = false;
        }
    }
    out
}

/// Parses `a=1&b=two` into ordered pairs. Keys without `=` get an empty value.
pub fn parse_query(query: &str) -> Vec<(String, String)> {
    query
        .split('&')
        .filter(|pair| !pair.is_empty())
        .map(|pair| {
            let (k, v) = pair.split_once('=').unwrap_or((pair, ""));
            (decode_component(k), decode_component(v))
        })
        .collect()
}

fn decode_component(raw: &str) -> String {
    percent_decode(&raw.replace('+', " "))
}

/// Decodes `%XX` escapes. Malformed escapes are kept as written.
pub fn percent_decode(raw: &str) -> String {
    let bytes = raw.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' && i + 2 < bytes.len() {
            if let (Some(hi), Some(lo)) = (hex_value(bytes[i + 1]), hex_value(bytes[i + 2])) {
                out.push(hi << 4 | lo);
                i += 3;
                continue;
            }
        }
        out.push(bytes[i]);
        i += 1;
    }
    String::from_utf8_lossy(&out).into_owned()
}

fn hex_value(b: u8) -> Option<u8> {
    match b {
        b'0'..=b'9' => Some(b - b'0'),
        b'a'..=b'f' => Some(b - b'a' + 10),
        b'A'..=b'F' => Some(b - b'A' + 10),
        _ => None,
    }
}
