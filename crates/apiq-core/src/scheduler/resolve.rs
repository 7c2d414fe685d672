//! Turning a queued request into a fully resolved transport call.

use std::time::Duration;

use crate::config::ApiqConfig;
use crate::request::Request;
use crate::transport::ResolvedCall;

/// True when `path` already carries an http(s) scheme and must not be prefixed.
pub fn is_absolute(path: &str) -> bool {
    url::Url::parse(path)
        .map(|u| matches!(u.scheme(), "http" | "https"))
        .unwrap_or(false)
}

/// Absolute paths pass through; relative ones are appended to `base`.
pub fn compose_url(base: &str, path: &str) -> String {
    if is_absolute(path) {
        path.to_string()
    } else {
        format!("{}{}", base, path)
    }
}

/// Replace (case-insensitively) or append a header.
fn set_header(headers: &mut Vec<(String, String)>, name: &str, value: &str) {
    match headers.iter_mut().find(|(k, _)| k.eq_ignore_ascii_case(name)) {
        Some(slot) => slot.1 = value.to_string(),
        None => headers.push((name.to_string(), value.to_string())),
    }
}

/// Connection defaults applied to every admitted request.
#[derive(Debug, Clone)]
pub(super) struct CallDefaults {
    base_url: String,
    timeout: Option<Duration>,
    content_type: String,
    authorization: Option<String>,
    headers: Vec<(String, String)>,
}

impl CallDefaults {
    pub(super) fn from_config(cfg: &ApiqConfig) -> Self {
        Self {
            base_url: cfg.base_url.clone(),
            timeout: cfg.timeout(),
            content_type: cfg.content_type.clone(),
            authorization: cfg
                .authorization
                .as_deref()
                .map(|t| authorization_value(t, "Bearer")),
            headers: cfg.headers.clone(),
        }
    }

    pub(super) fn set_authorization(&mut self, value: Option<String>) {
        self.authorization = value;
    }

    pub(super) fn set_content_type(&mut self, content_type: String) {
        self.content_type = content_type;
    }

    pub(super) fn set_timeout(&mut self, timeout: Option<Duration>) {
        self.timeout = timeout;
    }

    /// Defaults first, then auth and content type, then the call's own headers.
    pub(super) fn resolve(&self, req: &Request) -> ResolvedCall {
        let opts = &req.options;
        let mut headers = self.headers.clone();
        if let Some(auth) = &self.authorization {
            set_header(&mut headers, "Authorization", auth);
        }
        if req.method.sends_body() {
            set_header(&mut headers, "Content-Type", &self.content_type);
        }
        for (k, v) in &opts.headers {
            set_header(&mut headers, k, v);
        }

        ResolvedCall {
            method: req.method,
            url: compose_url(&self.base_url, &opts.path),
            query: opts.query.clone(),
            headers,
            body: opts.body.clone(),
            timeout: opts.timeout.or(self.timeout),
        }
    }
}

/// `"<kind> <token>"`, both trimmed.
pub(super) fn authorization_value(token: &str, kind: &str) -> String {
    format!("{} {}", kind.trim(), token.trim())
}
