use crate::Cli;
use crate::context::AppContext;
use crate::format;
use libregent::{Client, Request, RequestOption};

/// Collects the placeholder values given on the command line.
pub fn request_options(cli: &Cli) -> Vec<RequestOption> {
    let mut options = Vec::new();
    if let Some(name) = &cli.name {
        options.push(RequestOption::name(name));
    }
    if let Some(reference) = &cli.reference {
        options.push(RequestOption::reference(reference));
    }
    if let Some(digest) = &cli.digest {
        options.push(RequestOption::digest(digest));
    }
    if let Some(id) = &cli.session_id {
        options.push(RequestOption::session_id(id));
    }
    options
}

/// Splits a `Key: Value` header argument.
pub fn parse_header(arg: &str) -> Result<(&str, &str), String> {
    match arg.split_once(':') {
        Some((key, value)) if !key.trim().is_empty() => Ok((key.trim(), value.trim())),
        _ => Err(format!("Invalid header '{}', expected 'Key: Value'", arg)),
    }
}

/// Splits a `key=value` query argument.
pub fn parse_query(arg: &str) -> Result<(&str, &str), String> {
    match arg.split_once('=') {
        Some((key, value)) if !key.is_empty() => Ok((key, value)),
        _ => Err(format!("Invalid query parameter '{}', expected 'key=value'", arg)),
    }
}

/// Builds the request described by the command line.
pub fn build_request(client: &Client, cli: &Cli) -> Result<Request, String> {
    let mut request = client.new_request(cli.method.clone(), &cli.path, request_options(cli));

    for arg in &cli.headers {
        let (key, value) = parse_header(arg)?;
        request.set_header(key, value);
    }
    for arg in &cli.query {
        let (key, value) = parse_query(arg)?;
        request.set_query_param(key, value);
    }

    if let Some(data) = &cli.data {
        request.set_body(data.as_bytes());
    } else if let Some(path) = &cli.data_file {
        let body = std::fs::read(path)
            .map_err(|e| format!("Failed to read {}: {}", path.display(), e))?;
        request.set_body(body);
    }

    Ok(request)
}

/// Sends the request and prints the response.
///
/// Returns whether the registry answered with a success status.
pub async fn handle_request(ctx: &AppContext, cli: &Cli) -> Result<bool, String> {
    let client = ctx
        .config
        .client_builder()
        .and_then(|builder| builder.build())
        .map_err(|e| e.to_string())?;

    let request = build_request(&client, cli)?;
    let response = client.execute(request).await.map_err(|e| e.to_string())?;

    println!("{}", format::status_line(response.status(), ctx.color));
    if cli.include {
        for line in format::header_lines(&response, ctx.color) {
            println!("{}", line);
        }
    }
    if let Some(line) = format::location_line(&response, ctx.color) {
        println!("{}", line);
    }

    if cli.errors && !response.is_success() {
        match format::error_lines(&response) {
            Ok(lines) => {
                println!("Errors:");
                for line in lines {
                    println!("{}", line);
                }
            }
            Err(e) => format::error(&e),
        }
    } else if let Some(body) = format::body_text(response.body()) {
        println!();
        println!("{}", body);
    }

    if let Some(summary) = format::failure_summary(&response) {
        format::error(&summary);
    }

    Ok(response.is_success())
}

#[cfg(test)]
#[path = "request_tests.rs"]
mod tests;
