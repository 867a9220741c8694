//! HTTP exchange for a single scenario
//!
//! [`Transports`] holds the clients built once per run. [`RequestExecutor`]
//! performs one exchange per scenario and hands the response to the
//! validator. Every failure becomes an error outcome on the scenario; nothing
//! here returns an error to the dispatcher.

use std::collections::HashMap;
use std::io::Read;
use std::sync::Arc;
use std::time::{Duration, Instant};

use flate2::read::GzDecoder;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_ENCODING, CONTENT_TYPE};
use reqwest::{Client, ClientBuilder, Method, Proxy, Url};

use crate::configuration::RunnerSettings;
use crate::error::{DashError, RequestError, Result};
use crate::scenario::{ResponseSnapshot, Scenario};
use crate::validator::ResponseValidator;

/// HTTP clients shared by every scenario of a run
#[derive(Debug, Clone)]
pub struct Transports {
    direct: Client,
    proxied: Option<Client>,
    no_proxy: Vec<String>,
}

impl Transports {
    /// Build the direct client and, when a proxy is configured, the proxy client.
    pub fn new(settings: &RunnerSettings) -> Result<Self> {
        let timeout = settings.request_timeout();
        let direct = build_client(timeout, None)?;

        let proxied = match settings.proxy.as_deref() {
            Some(proxy_url) => {
                let proxy = Proxy::all(proxy_url).map_err(|e| {
                    DashError::Configuration(format!("Invalid proxy URL {}: {}", proxy_url, e))
                })?;
                log::info!("Routing requests through proxy {}", proxy_url);
                Some(build_client(timeout, Some(proxy))?)
            }
            None => None,
        };

        Ok(Self {
            direct,
            proxied,
            no_proxy: settings.no_proxy_hosts(),
        })
    }

    /// Transports without any proxy
    pub fn direct_only() -> Result<Self> {
        Self::new(&RunnerSettings::default())
    }

    /// Client for `host`: the proxy client unless the host is exempt or no
    /// proxy is configured.
    pub fn select(&self, host: &str) -> &Client {
        match &self.proxied {
            Some(proxied) if !self.bypasses_proxy(host) => proxied,
            _ => &self.direct,
        }
    }

    pub fn direct(&self) -> &Client {
        &self.direct
    }

    pub fn bypasses_proxy(&self, host: &str) -> bool {
        self.no_proxy.iter().any(|exempt| exempt == host)
    }
}

fn build_client(timeout: Option<Duration>, proxy: Option<Proxy>) -> Result<Client> {
    let mut builder = ClientBuilder::new()
        .pool_idle_timeout(Duration::from_secs(30))
        .tcp_keepalive(Duration::from_secs(60))
        .user_agent(format!("dash/{}", env!("CARGO_PKG_VERSION")))
        .redirect(reqwest::redirect::Policy::limited(10))
        .danger_accept_invalid_certs(true);
    log::warn!("TLS certificate verification disabled for scenario requests");

    if let Some(timeout) = timeout {
        builder = builder.timeout(timeout);
    }

    builder = match proxy {
        Some(proxy) => builder.proxy(proxy),
        None => builder.no_proxy(),
    };

    builder
        .build()
        .map_err(|e| DashError::Transport(format!("Failed to build HTTP client: {}", e)))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RequestMode {
    Plain,
    UrlEncoded,
}

/// Raw result of one exchange
pub(crate) struct Exchange {
    pub status: u16,
    pub body: String,
    pub elapsed: Duration,
}

/// Executes scenarios one exchange at a time
pub struct RequestExecutor {
    transports: Arc<Transports>,
    validator: Arc<ResponseValidator>,
}

impl RequestExecutor {
    pub fn new(transports: Arc<Transports>, validator: Arc<ResponseValidator>) -> Self {
        Self {
            transports,
            validator,
        }
    }

    pub fn transports(&self) -> &Arc<Transports> {
        &self.transports
    }

    /// Execute `scenario` in the mode its tag selects, then validate it.
    pub async fn execute(&self, scenario: &mut Scenario) {
        if scenario.is_urlencoded() {
            self.urlencoded_request(scenario).await
        } else {
            self.request(scenario).await
        }
    }

    /// Plain exchange through the transport selected for the target host.
    pub async fn request(&self, scenario: &mut Scenario) {
        self.run(scenario, RequestMode::Plain).await
    }

    /// Exchange through the direct transport with the body sent verbatim.
    pub async fn urlencoded_request(&self, scenario: &mut Scenario) {
        self.run(scenario, RequestMode::UrlEncoded).await
    }

    async fn run(&self, scenario: &mut Scenario, mode: RequestMode) {
        match self.exchange(scenario, mode).await {
            Ok(exchange) => {
                log::debug!(
                    "Scenario '{}' answered {} in {:?}",
                    scenario.name,
                    exchange.status,
                    exchange.elapsed
                );
                scenario.response = Some(ResponseSnapshot {
                    status: exchange.status,
                    body: exchange.body,
                    time: exchange.elapsed.as_secs_f64(),
                });
                self.validator.apply(scenario);
            }
            Err(e) => {
                log::error!("Scenario '{}' ({}) failed: {}", scenario.name, scenario.id, e);
                scenario.record_error(e.to_string());
            }
        }
    }

    async fn exchange(
        &self,
        scenario: &mut Scenario,
        mode: RequestMode,
    ) -> std::result::Result<Exchange, RequestError> {
        let method = parse_method(&scenario.method)?;
        let mut url = Url::parse(&scenario.url).map_err(|e| RequestError::InvalidUrl {
            url: scenario.url.clone(),
            reason: e.to_string(),
        })?;
        apply_params(&mut url, &scenario.params);

        let client = match mode {
            RequestMode::UrlEncoded => self.transports.direct(),
            RequestMode::Plain => self.transports.select(url.host_str().unwrap_or_default()),
        };

        let payload = if mode == RequestMode::Plain && !scenario.is_soap() {
            scenario.body.replace('\\', "")
        } else {
            scenario.body.clone()
        };
        scenario.final_body = payload.clone();

        let headers = header_map(&scenario.headers)?;
        let mut builder = client.request(method, url).headers(headers);
        if !payload.is_empty() {
            builder = builder.body(payload);
        }

        if scenario.delay > 0 {
            log::debug!("Delaying scenario '{}' by {}s", scenario.name, scenario.delay);
            tokio::time::sleep(Duration::from_secs(scenario.delay as u64)).await;
        }

        send(builder).await
    }
}

/// Send a prepared request, read and decode the full body.
pub(crate) async fn send(
    builder: reqwest::RequestBuilder,
) -> std::result::Result<Exchange, RequestError> {
    let start_time = Instant::now();
    let response = builder.send().await.map_err(|e| {
        let detail = error_chain(&e);
        if e.is_timeout() {
            RequestError::Timeout(detail)
        } else if e.is_connect() {
            RequestError::ConnectionFailed(detail)
        } else {
            RequestError::Network(detail)
        }
    })?;

    let status = response.status().as_u16();
    let gzipped = response
        .headers()
        .get(CONTENT_ENCODING)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value.trim().eq_ignore_ascii_case("gzip"));

    let bytes = response
        .bytes()
        .await
        .map_err(|e| RequestError::Body(error_chain(&e)))?;

    let body = if gzipped {
        let mut decoded = Vec::new();
        GzDecoder::new(&bytes[..])
            .read_to_end(&mut decoded)
            .map_err(|e| RequestError::Decompression(e.to_string()))?;
        decoded
    } else {
        bytes.to_vec()
    };

    Ok(Exchange {
        status,
        body: String::from_utf8_lossy(&body).into_owned(),
        elapsed: start_time.elapsed(),
    })
}

pub(crate) fn parse_method(method: &str) -> std::result::Result<Method, RequestError> {
    let method = method.trim().to_uppercase();
    if method.is_empty() {
        return Ok(Method::GET);
    }
    Method::from_bytes(method.as_bytes()).map_err(|_| RequestError::InvalidMethod(method))
}

/// Headers as single values; `Content-Type: application/json` when none are given.
pub(crate) fn header_map(
    headers: &HashMap<String, String>,
) -> std::result::Result<HeaderMap, RequestError> {
    let mut map = HeaderMap::new();
    if headers.is_empty() {
        map.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        return Ok(map);
    }

    for (name, value) in headers {
        let header_name =
            HeaderName::from_bytes(name.as_bytes()).map_err(|e| RequestError::InvalidHeader {
                name: name.clone(),
                reason: e.to_string(),
            })?;
        let header_value = HeaderValue::from_str(value).map_err(|e| RequestError::InvalidHeader {
            name: name.clone(),
            reason: e.to_string(),
        })?;
        map.insert(header_name, header_value);
    }
    Ok(map)
}

/// Replace the query string with `params`, keys in sorted order.
fn apply_params(url: &mut Url, params: &HashMap<String, String>) {
    if params.is_empty() {
        return;
    }

    let mut pairs: Vec<(&String, &String)> = params.iter().collect();
    pairs.sort();

    url.set_query(None);
    url.query_pairs_mut().extend_pairs(pairs);
}

fn error_chain(error: &dyn std::error::Error) -> String {
    let mut message = error.to_string();
    let mut source = error.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_params_sorted_and_replace_query() {
        let mut url = Url::parse("http://localhost/items?stale=1").unwrap();
        let params = HashMap::from([
            ("b".to_string(), "2".to_string()),
            ("a".to_string(), "x y".to_string()),
        ]);

        apply_params(&mut url, &params);
        assert_eq!(url.as_str(), "http://localhost/items?a=x+y&b=2");
    }

    #[test]
    fn test_default_content_type() {
        let map = header_map(&HashMap::new()).unwrap();
        assert_eq!(map.get(CONTENT_TYPE).unwrap(), "application/json");

        let map = header_map(&HashMap::from([("X-Trace".to_string(), "1".to_string())])).unwrap();
        assert!(map.get(CONTENT_TYPE).is_none());
        assert_eq!(map.get("x-trace").unwrap(), "1");
    }

    #[test]
    fn test_invalid_header_value() {
        let headers = HashMap::from([("X-Bad".to_string(), "line\nbreak".to_string())]);
        assert!(matches!(header_map(&headers), Err(RequestError::InvalidHeader { .. })));
    }

    #[test]
    fn test_parse_method() {
        assert_eq!(parse_method("").unwrap(), Method::GET);
        assert_eq!(parse_method("post").unwrap(), Method::POST);
        assert!(matches!(parse_method("BAD METHOD"), Err(RequestError::InvalidMethod(_))));
    }

    #[test]
    fn test_transport_selection() {
        let settings = RunnerSettings {
            proxy: Some("http://proxy.internal:3128".to_string()),
            no_proxy: "localhost,127.0.0.1".to_string(),
            ..RunnerSettings::default()
        };
        let transports = Transports::new(&settings).unwrap();

        assert!(transports.bypasses_proxy("localhost"));
        assert!(!transports.bypasses_proxy("api.example.com"));
        assert!(std::ptr::eq(transports.select("localhost"), transports.direct()));
        assert!(!std::ptr::eq(transports.select("api.example.com"), transports.direct()));
    }
}
