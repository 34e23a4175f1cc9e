//! Static content serving under the configured www root.
//!
//! Targets are percent-decoded, then canonicalized and checked to still
//! live inside the root, so `..` segments cannot escape it. `/` resolves
//! to `index.html`; unknown extensions fall back to the generic binary
//! content type.

use std::path::Path;

use log::debug;
use tokio::fs;

use crate::api::error_response;
use crate::http::{Request, Response};
use crate::AppState;

pub async fn serve_static(state: &AppState, request: &Request) -> Response {
    if request.method != "GET" && request.method != "HEAD" {
        return error_response(400, "badRequest", "Bad request");
    }

    let decoded = percent_decode(request.path());
    let relative = decoded.trim_start_matches('/');
    let mut target = state.www_root.join(relative);
    if relative.is_empty() {
        target = state.www_root.join("index.html");
    }

    // Canonicalization both resolves `..` and confirms existence.
    let mut resolved = match fs::canonicalize(&target).await {
        Ok(path) => path,
        Err(_) => return error_response(404, "fileNotFound", "File not found"),
    };
    if !resolved.starts_with(&state.www_root) {
        return error_response(400, "badRequest", "Bad request");
    }
    if resolved.is_dir() {
        resolved = resolved.join("index.html");
    }

    match fs::read(&resolved).await {
        Ok(bytes) => {
            debug!("serving {} ({} bytes)", resolved.display(), bytes.len());
            Response::new(200).with_body(bytes, content_type_for(&resolved))
        }
        Err(_) => error_response(404, "fileNotFound", "File not found"),
    }
}

/// Decodes %XX escapes; malformed escapes are kept verbatim.
pub fn percent_decode(input: &str) -> String {
    fn hex_value(byte: u8) -> Option<u8> {
        match byte {
            b'0'..=b'9' => Some(byte - b'0'),
            b'a'..=b'f' => Some(byte - b'a' + 10),
            b'A'..=b'F' => Some(byte - b'A' + 10),
            _ => None,
        }
    }

    let bytes = input.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' && i + 2 < bytes.len() {
            if let (Some(hi), Some(lo)) = (hex_value(bytes[i + 1]), hex_value(bytes[i + 2])) {
                out.push(hi * 16 + lo);
                i += 3;
                continue;
            }
        }
        out.push(bytes[i]);
        i += 1;
    }
    String::from_utf8_lossy(&out).into_owned()
}

/// Extension-based content type; unknown extensions are served as an
/// opaque byte stream.
pub fn content_type_for(path: &Path) -> &'static str {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());
    match extension.as_deref() {
        Some("htm") | Some("html") => "text/html",
        Some("json") => "application/json",
        Some("css") => "text/css",
        Some("txt") => "text/plain",
        Some("js") => "text/javascript",
        Some("xml") => "application/xml",
        Some("png") => "image/png",
        Some("jpg") | Some("jpe") | Some("jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("bmp") => "image/bmp",
        Some("ico") => "image/vnd.microsoft.icon",
        Some("tif") | Some("tiff") => "image/tiff",
        Some("svg") | Some("svgz") => "image/svg+xml",
        Some("mp3") => "audio/mpeg",
        _ => "application/octet-stream",
    }
}
