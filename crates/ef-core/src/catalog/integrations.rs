use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum IntegrationCategory {
    Payment,
    Messaging,
    Mapping,
    ErrorTracking,
}

/// Third-party SDK that needs a stub instead of a network mock
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntegrationSignature {
    pub name: String,
    pub category: IntegrationCategory,
    /// Package specifiers; subpaths (`pkg/x`) match too
    pub packages: Vec<String>,
    /// Hosts the SDK talks to, `*` allowed as a leading label
    #[serde(default)]
    pub hosts: Vec<String>,
    /// Stubbed members and the value each one returns
    #[serde(default)]
    pub members: IndexMap<String, Value>,
}

impl IntegrationSignature {
    pub fn matches_package(&self, specifier: &str) -> bool {
        self.packages.iter().any(|p| package_matches(p, specifier))
    }
}

/// Analytics or telemetry endpoint whose traffic is aborted under test
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TelemetryDestination {
    pub name: String,
    #[serde(default)]
    pub packages: Vec<String>,
    pub hosts: Vec<String>,
}

impl TelemetryDestination {
    pub fn matches_package(&self, specifier: &str) -> bool {
        self.packages.iter().any(|p| package_matches(p, specifier))
    }

    pub fn matches_url(&self, url: &str) -> bool {
        url_host(url)
            .map(|host| self.hosts.iter().any(|pattern| host_matches(pattern, host)))
            .unwrap_or(false)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntegrationCatalog {
    pub integrations: Vec<IntegrationSignature>,
    pub telemetry: Vec<TelemetryDestination>,
}

fn members(entries: &[(&str, Value)]) -> IndexMap<String, Value> {
    entries
        .iter()
        .map(|(name, value)| (name.to_string(), value.clone()))
        .collect()
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

impl Default for IntegrationCatalog {
    fn default() -> Self {
        let integration = |name: &str,
                           category: IntegrationCategory,
                           packages: &[&str],
                           hosts: &[&str],
                           stubbed: &[(&str, Value)]| IntegrationSignature {
            name: name.to_string(),
            category,
            packages: strings(packages),
            hosts: strings(hosts),
            members: members(stubbed),
        };
        let payment_result = json!({"paymentIntent": {"id": "pi_mock", "status": "succeeded"}});
        let loader_state = json!({"isLoaded": true, "loadError": null});

        let integrations = vec![
            integration(
                "stripe",
                IntegrationCategory::Payment,
                &["@stripe/stripe-js", "@stripe/react-stripe-js"],
                &["js.stripe.com", "api.stripe.com", "m.stripe.network"],
                &[
                    ("loadStripe", json!({})),
                    ("useStripe", json!({})),
                    ("useElements", json!({})),
                    ("confirmCardPayment", payment_result.clone()),
                    ("confirmPayment", payment_result),
                    ("createPaymentMethod", json!({"paymentMethod": {"id": "pm_mock"}})),
                    ("redirectToCheckout", json!({})),
                    ("Elements", Value::Null),
                    ("CardElement", Value::Null),
                    ("PaymentElement", Value::Null),
                ],
            ),
            integration(
                "pusher",
                IntegrationCategory::Messaging,
                &["pusher-js"],
                &["*.pusher.com", "*.pusherapp.com"],
                &[
                    ("Pusher", json!({})),
                    ("subscribe", json!({})),
                    ("bind", Value::Null),
                    ("unbind", Value::Null),
                    ("unsubscribe", Value::Null),
                    ("disconnect", Value::Null),
                    ("trigger", json!(true)),
                ],
            ),
            integration(
                "ably",
                IntegrationCategory::Messaging,
                &["ably"],
                &["*.ably.io", "*.ably-realtime.com"],
                &[
                    ("Realtime", json!({})),
                    ("get", json!({})),
                    ("subscribe", Value::Null),
                    ("publish", Value::Null),
                    ("close", Value::Null),
                ],
            ),
            integration(
                "socket-io",
                IntegrationCategory::Messaging,
                &["socket.io-client"],
                &[],
                &[
                    ("io", json!({})),
                    ("on", Value::Null),
                    ("off", Value::Null),
                    ("emit", Value::Null),
                    ("connect", Value::Null),
                    ("disconnect", Value::Null),
                ],
            ),
            integration(
                "google-maps",
                IntegrationCategory::Mapping,
                &["@react-google-maps/api", "@googlemaps/js-api-loader", "google-map-react"],
                &["maps.googleapis.com", "maps.gstatic.com"],
                &[
                    ("useJsApiLoader", loader_state.clone()),
                    ("useLoadScript", loader_state),
                    ("Loader", json!({})),
                    ("load", json!({})),
                    ("GoogleMap", Value::Null),
                    ("Marker", Value::Null),
                    ("InfoWindow", Value::Null),
                ],
            ),
            integration(
                "mapbox",
                IntegrationCategory::Mapping,
                &["mapbox-gl", "react-map-gl"],
                &["api.mapbox.com", "events.mapbox.com"],
                &[
                    ("Map", json!({})),
                    ("Marker", json!({})),
                    ("on", Value::Null),
                    ("addControl", Value::Null),
                    ("flyTo", Value::Null),
                ],
            ),
            integration(
                "leaflet",
                IntegrationCategory::Mapping,
                &["leaflet", "react-leaflet"],
                &["*.tile.openstreetmap.org"],
                &[
                    ("MapContainer", Value::Null),
                    ("TileLayer", Value::Null),
                    ("Marker", Value::Null),
                    ("Popup", Value::Null),
                ],
            ),
            integration(
                "sentry",
                IntegrationCategory::ErrorTracking,
                &["@sentry/react", "@sentry/nextjs", "@sentry/browser"],
                &["*.ingest.sentry.io", "*.sentry.io"],
                &[
                    ("init", Value::Null),
                    ("captureException", json!("mock-event-id")),
                    ("captureMessage", json!("mock-event-id")),
                    ("setUser", Value::Null),
                    ("setTag", Value::Null),
                    ("withScope", Value::Null),
                    ("ErrorBoundary", Value::Null),
                ],
            ),
            integration(
                "bugsnag",
                IntegrationCategory::ErrorTracking,
                &["@bugsnag/js", "@bugsnag/plugin-react"],
                &["notify.bugsnag.com", "sessions.bugsnag.com"],
                &[("start", json!({})), ("notify", Value::Null)],
            ),
        ];

        let telemetry = |name: &str, packages: &[&str], hosts: &[&str]| TelemetryDestination {
            name: name.to_string(),
            packages: strings(packages),
            hosts: strings(hosts),
        };
        let telemetry = vec![
            telemetry(
                "google-analytics",
                &["react-ga", "react-ga4", "@next/third-parties/google"],
                &[
                    "www.google-analytics.com",
                    "*.google-analytics.com",
                    "www.googletagmanager.com",
                    "*.doubleclick.net",
                ],
            ),
            telemetry(
                "segment",
                &["@segment/analytics-next", "analytics-node"],
                &["api.segment.io", "cdn.segment.com"],
            ),
            telemetry(
                "mixpanel",
                &["mixpanel-browser"],
                &["api-js.mixpanel.com", "api.mixpanel.com", "cdn.mxpnl.com"],
            ),
            telemetry(
                "amplitude",
                &["@amplitude/analytics-browser", "amplitude-js"],
                &["api2.amplitude.com", "cdn.amplitude.com"],
            ),
            telemetry("posthog", &["posthog-js"], &["*.posthog.com"]),
            telemetry(
                "hotjar",
                &["@hotjar/browser", "react-hotjar"],
                &["*.hotjar.com", "*.hotjar.io"],
            ),
            telemetry(
                "vercel-analytics",
                &["@vercel/analytics", "@vercel/speed-insights"],
                &["vitals.vercel-insights.com"],
            ),
            telemetry(
                "datadog-rum",
                &["@datadog/browser-rum", "@datadog/browser-logs"],
                &["*.datadoghq.com", "browser-intake-datadoghq.com"],
            ),
            telemetry(
                "facebook-pixel",
                &["react-facebook-pixel"],
                &["connect.facebook.net"],
            ),
        ];

        Self {
            integrations,
            telemetry,
        }
    }
}

impl IntegrationCatalog {
    pub fn integration_for_package(&self, specifier: &str) -> Option<&IntegrationSignature> {
        self.integrations.iter().find(|i| i.matches_package(specifier))
    }

    pub fn telemetry_for_package(&self, specifier: &str) -> Option<&TelemetryDestination> {
        self.telemetry.iter().find(|t| t.matches_package(specifier))
    }

    pub fn telemetry_for_url(&self, url: &str) -> Option<&TelemetryDestination> {
        self.telemetry.iter().find(|t| t.matches_url(url))
    }
}

fn package_matches(package: &str, specifier: &str) -> bool {
    specifier == package
        || specifier
            .strip_prefix(package)
            .map(|rest| rest.starts_with('/'))
            .unwrap_or(false)
}

/// Host of an absolute or protocol-relative URL
pub fn url_host(url: &str) -> Option<&str> {
    let rest = url
        .split_once("://")
        .map(|(_, rest)| rest)
        .or_else(|| url.strip_prefix("//"))?;
    let host = rest.split(['/', '?', '#']).next()?;
    let host = host.rsplit('@').next().unwrap_or(host);
    let host = host.split(':').next().unwrap_or(host);
    (!host.is_empty()).then_some(host)
}

/// `*.example.com` matches any subdomain; other patterns match exactly
pub fn host_matches(pattern: &str, host: &str) -> bool {
    match pattern.strip_prefix("*.") {
        Some(suffix) => host
            .strip_suffix(suffix)
            .map(|head| head.ends_with('.'))
            .unwrap_or(false),
        None => pattern.eq_ignore_ascii_case(host),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_package_matching_includes_subpaths() {
        let catalog = IntegrationCatalog::default();
        assert_eq!(
            catalog
                .integration_for_package("@stripe/stripe-js/pure")
                .map(|i| i.name.as_str()),
            Some("stripe")
        );
        assert!(catalog.integration_for_package("@stripe/stripe-jsx").is_none());
        assert_eq!(
            catalog
                .integration_for_package("@sentry/nextjs")
                .map(|i| i.category),
            Some(IntegrationCategory::ErrorTracking)
        );
    }

    #[test]
    fn test_telemetry_url_matching() {
        let catalog = IntegrationCatalog::default();
        let hit = catalog.telemetry_for_url("https://www.google-analytics.com/g/collect?v=2");
        assert_eq!(hit.map(|t| t.name.as_str()), Some("google-analytics"));
        assert_eq!(
            catalog
                .telemetry_for_url("https://eu.posthog.com/capture")
                .map(|t| t.name.as_str()),
            Some("posthog")
        );
        assert!(catalog.telemetry_for_url("https://api.example.com/users").is_none());
        assert!(catalog.telemetry_for_url("/relative/path").is_none());
    }

    #[test]
    fn test_url_host() {
        assert_eq!(url_host("https://user@api.example.com:8443/x"), Some("api.example.com"));
        assert_eq!(url_host("//cdn.segment.com/a.js"), Some("cdn.segment.com"));
        assert_eq!(url_host("/api/users"), None);
        assert!(host_matches("*.posthog.com", "app.posthog.com"));
        assert!(!host_matches("*.posthog.com", "posthog.com"));
    }
}
