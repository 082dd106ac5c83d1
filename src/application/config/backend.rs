//! Backend the setup flow talks to.
//!
//! When `VIDEOPOPUP_BACKEND_URL` (or `SUPABASE_URL`) is set, the role table is read
//! through the hosted REST layer and setup steps are posted to the hosted
//! `setup-database` function. Otherwise the service talks to itself on its bind
//! address.

use std::env;
use std::net::IpAddr;

/// Path of the bootstrap function relative to the backend base URL
pub const SETUP_FUNCTION_PATH: &str = "/functions/v1/setup-database";

/// Path of the REST layer relative to the backend base URL
pub const REST_PATH: &str = "/rest/v1";

#[derive(Debug, Clone)]
pub struct BackendConfig {
    /// Base URL with trailing slashes removed
    pub url: String,
    /// True when `url` points at a hosted backend rather than this service
    pub hosted: bool,
    pub anon_key: Option<String>,
    pub service_role_key: Option<String>,
}

impl BackendConfig {
    /// `local_host`/`local_port` are this service's bind address, used when no
    /// hosted backend is configured
    pub fn from_env(local_host: &str, local_port: u16) -> Self {
        let configured = env::var("VIDEOPOPUP_BACKEND_URL")
            .or_else(|_| env::var("SUPABASE_URL"))
            .ok()
            .filter(|v| !v.trim().is_empty());

        let hosted = configured.is_some();
        let url = configured.unwrap_or_else(|| local_base_url(local_host, local_port));

        Self {
            url: normalize_base_url(&url),
            hosted,
            anon_key: env::var("SUPABASE_ANON_KEY").ok(),
            service_role_key: env::var("SUPABASE_SERVICE_ROLE_KEY").ok(),
        }
    }

    /// Full URL of the `setup-database` function
    pub fn setup_function_url(&self) -> String {
        setup_function_url(&self.url)
    }

    /// Key sent with REST reads; the service role key wins when both are set
    pub fn api_key(&self) -> Option<&str> {
        self.service_role_key
            .as_deref()
            .or(self.anon_key.as_deref())
    }
}

/// Strip surrounding whitespace and any trailing slashes
pub fn normalize_base_url(url: &str) -> String {
    url.trim().trim_end_matches('/').to_string()
}

/// URL under which this service reaches itself
///
/// Wildcard bind addresses map to the loopback address of the same family.
pub fn local_base_url(host: &str, port: u16) -> String {
    let host = host.trim().trim_start_matches('[').trim_end_matches(']');
    match host.parse::<IpAddr>() {
        Ok(IpAddr::V4(ip)) if ip.is_unspecified() => format!("http://127.0.0.1:{}", port),
        Ok(IpAddr::V6(ip)) if ip.is_unspecified() => format!("http://[::1]:{}", port),
        Ok(IpAddr::V6(ip)) => format!("http://[{}]:{}", ip, port),
        Ok(IpAddr::V4(ip)) => format!("http://{}:{}", ip, port),
        Err(_) if host.is_empty() => format!("http://127.0.0.1:{}", port),
        Err(_) => format!("http://{}:{}", host, port),
    }
}

/// Join a base URL and the bootstrap function path
pub fn setup_function_url(base: &str) -> String {
    format!("{}{}", normalize_base_url(base), SETUP_FUNCTION_PATH)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_setup_function_url_strips_trailing_slash() {
        assert_eq!(
            setup_function_url("https://abc.supabase.co/"),
            "https://abc.supabase.co/functions/v1/setup-database"
        );
        assert_eq!(
            setup_function_url("https://abc.supabase.co//"),
            "https://abc.supabase.co/functions/v1/setup-database"
        );
    }

    #[test]
    fn test_setup_function_url_without_slash() {
        assert_eq!(
            setup_function_url("http://127.0.0.1:8000"),
            "http://127.0.0.1:8000/functions/v1/setup-database"
        );
    }

    #[test]
    fn test_local_base_url_follows_bind_host() {
        assert_eq!(local_base_url("0.0.0.0", 8000), "http://127.0.0.1:8000");
        assert_eq!(local_base_url("", 8000), "http://127.0.0.1:8000");
        assert_eq!(local_base_url("::", 8000), "http://[::1]:8000");
        assert_eq!(local_base_url("10.0.0.5", 8000), "http://10.0.0.5:8000");
        assert_eq!(local_base_url("127.0.0.1", 9000), "http://127.0.0.1:9000");
        assert_eq!(local_base_url("fd00::5", 8000), "http://[fd00::5]:8000");
        assert_eq!(local_base_url("[fd00::5]", 8000), "http://[fd00::5]:8000");
        assert_eq!(local_base_url("api.internal", 8000), "http://api.internal:8000");
    }

    #[test]
    fn test_api_key_prefers_service_role() {
        let config = BackendConfig {
            url: "http://localhost".to_string(),
            hosted: true,
            anon_key: Some("anon".to_string()),
            service_role_key: Some("service".to_string()),
        };
        assert_eq!(config.api_key(), Some("service"));

        let anon_only = BackendConfig {
            service_role_key: None,
            ..config
        };
        assert_eq!(anon_only.api_key(), Some("anon"));
    }
}
