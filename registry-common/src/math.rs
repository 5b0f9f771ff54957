//! Scoring and host-extraction helpers (spec §4.3 V1/V2, §4.4).

use url::Url;

/// Below this score a node earns no reward share at all.
const SCORE_FLOOR: f64 = 0.2;
/// At or above this score a node earns its full reward share.
const SCORE_CEILING: f64 = 0.8;

/// Maps a raw `[0, 1]` score to a `[0, 1]` reward multiplier: zero below
/// `SCORE_FLOOR`, one at or above `SCORE_CEILING`, linear in between.
pub fn score_multiplier(score: f64) -> f64 {
    if score < SCORE_FLOOR {
        0.0
    } else if score >= SCORE_CEILING {
        1.0
    } else {
        (score - SCORE_FLOOR) / (SCORE_CEILING - SCORE_FLOOR)
    }
}

/// Extracts the host component from a libp2p-style multiaddress, e.g.
/// `/ip4/1.2.3.4/tcp/4001/p2p/Qm...` -> `1.2.3.4`, or `/dns4/example.com/...`
/// -> `example.com`. Returns `None` if the address has no recognizable
/// `ip4`/`ip6`/`dns`/`dns4`/`dns6` segment (V1).
pub fn hostname_from_multiaddress(multiaddress: &str) -> Option<String> {
    let parts: Vec<&str> = multiaddress.split('/').filter(|s| !s.is_empty()).collect();
    let mut iter = parts.into_iter();
    while let Some(segment) = iter.next() {
        match segment {
            "ip4" | "ip6" | "dns" | "dns4" | "dns6" => {
                return iter.next().map(|host| host.to_string());
            }
            _ => continue,
        }
    }
    None
}

/// Extracts the host component of an absolute URL, e.g. a resource node's
/// `address` field (V2). `None` if the string doesn't parse as a URL with
/// an explicit host.
pub fn url_host(address: &str) -> Option<String> {
    Url::parse(address).ok().and_then(|u| u.host_str().map(str::to_string))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn score_multiplier_floors_and_ceilings() {
        assert_eq!(score_multiplier(0.0), 0.0);
        assert_eq!(score_multiplier(0.19), 0.0);
        assert_eq!(score_multiplier(SCORE_FLOOR), 0.0);
        assert_eq!(score_multiplier(SCORE_CEILING), 1.0);
        assert_eq!(score_multiplier(1.0), 1.0);
    }

    #[test]
    fn score_multiplier_interpolates_linearly() {
        assert!((score_multiplier(0.5) - 0.5).abs() < 1e-9);
    }

    #[test]
    fn hostname_extraction_handles_ip_and_dns() {
        assert_eq!(
            hostname_from_multiaddress("/ip4/1.2.3.4/tcp/4001/p2p/Qm123"),
            Some("1.2.3.4".to_string())
        );
        assert_eq!(
            hostname_from_multiaddress("/dns4/node.example.com/tcp/443/https"),
            Some("node.example.com".to_string())
        );
        assert_eq!(hostname_from_multiaddress("/p2p/Qm123"), None);
    }

    #[test]
    fn url_host_extracts_or_rejects() {
        assert_eq!(url_host("https://crn.example.com:4020/api"), Some("crn.example.com".to_string()));
        assert_eq!(url_host("not a url"), None);
    }
}
