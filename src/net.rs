//! Internet connectivity probe.

use std::time::Duration;

/// Captive-portal-safe endpoints: the first two return 204 with an empty
/// body, the favicon is a last resort for networks that rewrite 204s.
const PROBE_ENDPOINTS: &[&str] = &[
    "https://clients3.google.com/generate_204",
    "https://connectivitycheck.gstatic.com/generate_204",
    "https://www.google.com/favicon.ico",
];

/// Lightweight GET against known endpoints; any 200/204 within the timeout
/// counts as online.
pub fn is_online(timeout: Duration) -> bool {
    let agent = ureq::AgentBuilder::new()
        .timeout_connect(timeout)
        .timeout(timeout)
        .build();

    for endpoint in PROBE_ENDPOINTS {
        match agent.get(endpoint).call() {
            Ok(resp) if resp.status() == 200 || resp.status() == 204 => return true,
            Ok(_) => continue,
            Err(_) => continue,
        }
    }
    false
}
