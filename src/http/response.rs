//! Error page rendering.
//!
//! # Responsibilities
//! - Render the developer exception page (full error chain)
//! - Render the database error page (driver message and connection hint)
//! - Escape everything taken from the request or the error
//!
//! # Design Decisions
//! - Pages are plain server-rendered HTML, no template engine
//! - Only used in the Development environment; other environments
//!   redirect to the error handler path instead

use std::fmt::Write;

use axum::http::{Method, StatusCode};
use axum::response::{Html, IntoResponse, Response};

use crate::error::ErrorReport;

/// What the error pages show about the failed request.
#[derive(Debug, Clone)]
pub struct RequestSummary {
    pub method: Method,
    pub path: String,
    pub request_id: Option<String>,
}

pub fn escape_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

fn page(title: &str, body: &str) -> String {
    format!(
        "<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n<title>{title}</title>\n\
         <link rel=\"stylesheet\" href=\"/css/site.css\">\n</head>\n<body>\n{body}</body>\n</html>\n",
        title = escape_html(title),
    )
}

fn request_table(out: &mut String, request: &RequestSummary, report: &ErrorReport) {
    out.push_str("<h2>Request</h2>\n<table>\n");
    let _ = writeln!(out, "<tr><th>Method</th><td>{}</td></tr>", escape_html(request.method.as_str()));
    let _ = writeln!(out, "<tr><th>Path</th><td>{}</td></tr>", escape_html(&request.path));
    let _ = writeln!(
        out,
        "<tr><th>Request ID</th><td>{}</td></tr>",
        escape_html(request.request_id.as_deref().unwrap_or("-"))
    );
    out.push_str("</table>\n");

    if !report.route_values.is_empty() {
        out.push_str("<h2>Route values</h2>\n<table>\n");
        for (key, value) in &report.route_values {
            let _ = writeln!(out, "<tr><th>{}</th><td>{}</td></tr>", escape_html(key), escape_html(value));
        }
        out.push_str("</table>\n");
    }
}

pub fn developer_exception_page(report: &ErrorReport, request: &RequestSummary) -> Response {
    let mut body = String::new();
    body.push_str("<h1>An unhandled exception occurred while processing the request.</h1>\n");
    let _ = writeln!(body, "<p class=\"kind\">{:?}</p>", report.kind);
    let _ = writeln!(body, "<pre class=\"message\">{}</pre>", escape_html(&report.message));

    if !report.causes.is_empty() {
        body.push_str("<h2>Caused by</h2>\n<ol>\n");
        for cause in &report.causes {
            let _ = writeln!(body, "<li><pre>{}</pre></li>", escape_html(cause));
        }
        body.push_str("</ol>\n");
    }
    request_table(&mut body, request, report);

    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Html(page("Internal Server Error", &body)),
    )
        .into_response()
}

pub fn database_error_page(report: &ErrorReport, request: &RequestSummary) -> Response {
    let mut body = String::new();
    body.push_str("<h1>A database operation failed while processing the request.</h1>\n");
    let _ = writeln!(body, "<pre class=\"message\">{}</pre>", escape_html(&report.message));
    for cause in &report.causes {
        let _ = writeln!(body, "<pre class=\"cause\">{}</pre>", escape_html(cause));
    }
    body.push_str(
        "<p>Check that the database in <code>ConnectionStrings:Default</code> is reachable \
         and that its schema exists. Set <code>Database:EnsureCreated</code> to create the \
         schema at startup.</p>\n",
    );
    request_table(&mut body, request, report);

    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Html(page("Database Error", &body)),
    )
        .into_response()
}

/// The public error page: no internal detail.
pub fn generic_error_page(request_id: Option<&str>) -> Html<String> {
    let mut body = String::new();
    body.push_str("<h1>Error.</h1>\n<h2>An error occurred while processing your request.</h2>\n");
    if let Some(id) = request_id {
        let _ = writeln!(body, "<p><strong>Request ID:</strong> <code>{}</code></p>", escape_html(id));
    }
    Html(page("Error", &body))
}
