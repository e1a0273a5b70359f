//! CORS (Cross-Origin Resource Sharing) header synthesis.
//!
//! ```
//! use scriptserve::security::CorsPolicy;
//!
//! let cors = CorsPolicy::new(["https://app.example.com"]).allow_credentials(true);
//! let headers = cors.headers(Some("https://app.example.com"));
//! assert_eq!(headers[0].1, "https://app.example.com");
//! ```

use crate::config::CorsConfig;

pub const ALLOW_ORIGIN: &str = "Access-Control-Allow-Origin";
pub const ALLOW_METHODS: &str = "Access-Control-Allow-Methods";
pub const ALLOW_HEADERS: &str = "Access-Control-Allow-Headers";
pub const MAX_AGE: &str = "Access-Control-Max-Age";
pub const ALLOW_CREDENTIALS: &str = "Access-Control-Allow-Credentials";

/// Stateless CORS policy.
#[derive(Debug, Clone)]
pub struct CorsPolicy {
    origins: Vec<String>,
    methods: Vec<String>,
    headers: Vec<String>,
    credentials: bool,
    max_age: u64,
}

impl CorsPolicy {
    /// Policy allowing the given origins with the default methods and headers.
    pub fn new<I, S>(origins: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let defaults = CorsConfig::default();
        Self {
            origins: origins.into_iter().map(Into::into).collect(),
            methods: defaults.methods,
            headers: defaults.headers,
            credentials: false,
            max_age: defaults.max_age_secs,
        }
    }

    /// Policy allowing any origin.
    pub fn permissive() -> Self {
        Self::new(["*"])
    }

    pub fn from_config(config: &CorsConfig) -> Self {
        Self {
            origins: config.origins.clone(),
            methods: config.methods.clone(),
            headers: config.headers.clone(),
            credentials: config.credentials,
            max_age: config.max_age_secs,
        }
    }

    pub fn allow_methods<I, S>(mut self, methods: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.methods = methods.into_iter().map(Into::into).collect();
        self
    }

    pub fn allow_headers<I, S>(mut self, headers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.headers = headers.into_iter().map(Into::into).collect();
        self
    }

    pub fn allow_credentials(mut self, enabled: bool) -> Self {
        self.credentials = enabled;
        self
    }

    pub fn max_age(mut self, secs: u64) -> Self {
        self.max_age = secs;
        self
    }

    /// The origin value echoed for a request carrying `request_origin`.
    ///
    /// Wildcard policies echo `*`; an allowed origin is echoed back; anything
    /// else falls back to the first configured origin.
    pub fn allowed_origin(&self, request_origin: Option<&str>) -> Option<String> {
        if self.origins.iter().any(|o| o == "*") {
            return Some("*".to_string());
        }
        if let Some(origin) = request_origin {
            if self.origins.iter().any(|o| o == origin) {
                return Some(origin.to_string());
            }
        }
        self.origins.first().cloned()
    }

    /// Headers to attach to a response.
    pub fn headers(&self, request_origin: Option<&str>) -> Vec<(&'static str, String)> {
        let mut headers = Vec::with_capacity(5);
        if let Some(origin) = self.allowed_origin(request_origin) {
            headers.push((ALLOW_ORIGIN, origin));
        }
        headers.push((ALLOW_METHODS, self.methods.join(", ")));
        headers.push((ALLOW_HEADERS, self.headers.join(", ")));
        headers.push((MAX_AGE, self.max_age.to_string()));
        if self.credentials {
            headers.push((ALLOW_CREDENTIALS, "true".to_string()));
        }
        headers
    }
}

impl Default for CorsPolicy {
    fn default() -> Self {
        Self::permissive()
    }
}
