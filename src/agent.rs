//! User-Agent classification for the status code of full downloads.

use axum::http::StatusCode;

/// Tokens identifying Internet Explorer and the EdgeHTML based Edge.
const LEGACY_IE_TOKENS: [&str; 3] = ["MSIE", "TRIDENT", "EDGE"];

/// Browser family as far as download status quirks are concerned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientFamily {
    LegacyIe,
    Other,
}

/// Classifies a raw `User-Agent` value. A missing header counts as empty.
pub fn classify(user_agent: Option<&str>) -> ClientFamily {
    let user_agent = user_agent.unwrap_or_default().to_ascii_uppercase();
    if LEGACY_IE_TOKENS.iter().any(|token| user_agent.contains(token)) {
        ClientFamily::LegacyIe
    } else {
        ClientFamily::Other
    }
}

/// Status of a download served without a `Range` header.
///
/// Legacy IE family clients get `201 Created`, everyone else `200 OK`.
pub fn full_content_status(family: ClientFamily) -> StatusCode {
    match family {
        ClientFamily::LegacyIe => StatusCode::CREATED,
        ClientFamily::Other => StatusCode::OK,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_legacy_tokens() {
        let agents = [
            "Mozilla/4.0 (compatible; MSIE 8.0; Windows NT 6.1)",
            "Mozilla/5.0 (Windows NT 10.0; Trident/7.0; rv:11.0) like Gecko",
            "Mozilla/5.0 Edge/18",
            "mozilla/5.0 edge/18",
        ];
        for agent in agents {
            assert_eq!(ClientFamily::LegacyIe, classify(Some(agent)), "{agent}");
        }
    }

    #[test]
    fn test_other_agents() {
        let agents = [
            "Mozilla/5.0 (X11; Linux x86_64; rv:120.0) Gecko/20100101 Firefox/120.0",
            "curl/8.4.0",
            "",
        ];
        for agent in agents {
            assert_eq!(ClientFamily::Other, classify(Some(agent)), "{agent}");
        }
        assert_eq!(ClientFamily::Other, classify(None));
    }

    #[test]
    fn test_status_policy() {
        assert_eq!(StatusCode::CREATED, full_content_status(ClientFamily::LegacyIe));
        assert_eq!(StatusCode::OK, full_content_status(ClientFamily::Other));
    }
}
