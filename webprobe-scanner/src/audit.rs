use crate::finding::Finding;
use crate::http::HttpClient;
use crate::target::Target;
use tracing::{debug, warn};

/// Response headers every page of the target is expected to carry, in the
/// order they are reported.
pub const SECURITY_HEADERS: &[&str] = &[
    "Strict-Transport-Security",
    "Content-Security-Policy",
    "X-Frame-Options",
    "X-XSS-Protection",
    "X-Content-Type-Options",
];

/// Fetch the target root once and report the security headers it lacks.
///
/// Yields at most one finding. A failed fetch yields none.
pub async fn audit_security_headers(client: &HttpClient, target: &Target) -> Vec<Finding> {
    let response = match client.get(target.seed(), true).await {
        Ok(response) => response,
        Err(e) => {
            warn!("Security header audit of {} failed: {}", target.seed(), e);
            return Vec::new();
        }
    };

    let missing: Vec<String> = SECURITY_HEADERS
        .iter()
        .filter(|name| response.header(name).is_none())
        .map(|name| name.to_string())
        .collect();

    if missing.is_empty() {
        debug!("All security headers present on {}", target.seed());
        return Vec::new();
    }

    warn!("Missing security headers on {}: {}", target.seed(), missing.join(", "));
    vec![Finding::insecure_headers(target.seed().as_str(), missing)]
}
