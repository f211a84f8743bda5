//! Browsable admin page.
//!
//! Lists the catalog's workflows with their paused state and renders a form
//! for every registered operation that submits to the API endpoint.

use std::fmt::Write;

use axum::{extract::State, response::Html};
use dagway_dispatch::{ApiDescriptor, HttpMethod, InputKind};
use dagway_metadata::Workflow;

use crate::error::ServerError;
use crate::state::AppState;

/// Path of the admin page.
pub const ADMIN_PATH: &str = "/admin/rest_api/";

/// Path of the API endpoint the forms submit to.
pub const API_PATH: &str = "/admin/rest_api/api";

pub async fn admin_handler(State(state): State<AppState>) -> Result<Html<String>, ServerError> {
    let workflows = state.metadata.list_workflows()?;
    Ok(Html(render_page(&state, &workflows)))
}

fn render_page(state: &AppState, workflows: &[Workflow]) -> String {
    let mut page = String::new();
    page.push_str("<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n");
    page.push_str("<title>REST API Plugin</title>\n</head>\n<body>\n");
    let _ = writeln!(
        page,
        "<h1>REST API Plugin</h1>\n<p>Version v{} &middot; Endpoint <code>{}</code> &middot; \
         <a href=\"{}\">Orchestrator webserver</a></p>",
        env!("CARGO_PKG_VERSION"),
        API_PATH,
        escape(&state.config.webserver_base_url),
    );

    page.push_str("<h2>DAGs</h2>\n<table>\n<tr><th>DAG ID</th><th>Active</th></tr>\n");
    for workflow in workflows {
        let _ = writeln!(
            page,
            "<tr><td>{}</td><td>{}</td></tr>",
            escape(&workflow.dag_id),
            if workflow.is_paused { "paused" } else { "active" },
        );
    }
    page.push_str("</table>\n<h2>APIs</h2>\n");

    for descriptor in state.registry.iter() {
        render_form(&mut page, descriptor);
    }

    page.push_str("</body>\n</html>\n");
    page
}

fn render_form(page: &mut String, descriptor: &ApiDescriptor) {
    let _ = writeln!(
        page,
        "<section id=\"{name}\">\n<h3>{name}</h3>\n<p>{description}</p>\n\
         <p><small>Available since: {since}</small></p>",
        name = descriptor.name,
        description = escape(descriptor.description),
        since = escape(descriptor.available_since),
    );

    let method = descriptor.http_method;
    let enctype = if method == HttpMethod::Post {
        " enctype=\"multipart/form-data\""
    } else {
        ""
    };
    let _ = writeln!(
        page,
        "<form method=\"{}\" action=\"{}?api={}\"{}>",
        method.as_str(),
        API_PATH,
        descriptor.name,
        enctype,
    );
    if method == HttpMethod::Get {
        let _ = writeln!(
            page,
            "<input type=\"hidden\" name=\"api\" value=\"{}\">",
            descriptor.name
        );
    }

    for spec in descriptor.arguments.iter().chain(&descriptor.post_arguments) {
        let input_type = match spec.input_kind {
            InputKind::Text => "text",
            InputKind::Flag => "checkbox",
            InputKind::File => "file",
        };
        let _ = writeln!(
            page,
            "<label>{name}{required} <input type=\"{kind}\" name=\"{name}\" title=\"{title}\"{req}></label><br>",
            name = spec.name,
            required = if spec.required { " *" } else { "" },
            kind = input_type,
            title = escape(spec.description),
            req = if spec.required { " required" } else { "" },
        );
    }
    for fixed in &descriptor.fixed_arguments {
        let _ = writeln!(
            page,
            "<p><small>Always passes --{} {}</small></p>",
            fixed.name,
            escape(fixed.value)
        );
    }

    page.push_str("<button type=\"submit\">Submit</button>\n</form>\n</section>\n");
}

/// Escape text for HTML element and attribute content.
fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
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
