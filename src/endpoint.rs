//! Session keys and the URLs derived from them.
//!
//! Every URL is a pure function of the host, the TLS flag and the key, so a
//! reconnecting channel always dials the same status URL.

use reqwest::Url;

use crate::error::RemoteError;
use crate::now_playing::AudioCommand;

/// Path of the WebSocket status endpoint.
pub const STATUS_PATH: &str = "/audio-control/status";
/// Path of the now-playing JSON endpoint.
pub const PLAYING_PATH: &str = "/audio-control/playing";

/// Opaque identifier tying this client to one server-side playback session.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SessionKey(String);

impl SessionKey {
    /// Wrap a key. Rejects the empty key; anything else is passed through
    /// verbatim.
    pub fn new(key: impl Into<String>) -> Result<Self, RemoteError> {
        let key = key.into();
        if key.is_empty() {
            return Err(RemoteError::EmptyKey);
        }
        Ok(Self(key))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Short form safe to put in logs.
    pub fn redacted(&self) -> String {
        redact(&self.0)
    }
}

fn redact(key: &str) -> String {
    let prefix: String = key.chars().take(4).collect();
    if key.chars().count() > 4 {
        format!("{prefix}…")
    } else {
        prefix
    }
}

/// Render `url` for errors and logs with its `key` query value truncated the
/// same way [`SessionKey::redacted`] does.
pub fn redacted_url(url: &Url) -> String {
    if url.query().is_none() {
        return url.to_string();
    }
    let pairs: Vec<String> = url
        .query_pairs()
        .map(|(name, value)| {
            if name == "key" {
                format!("{name}={}", redact(&value))
            } else {
                format!("{name}={value}")
            }
        })
        .collect();
    let mut bare = url.clone();
    bare.set_query(None);
    bare.set_fragment(None);
    format!("{bare}?{}", pairs.join("&"))
}

impl std::fmt::Display for SessionKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.redacted())
    }
}

/// The server a client talks to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    host: String,
    secure: bool,
    http_base: Url,
    ws_base: Url,
}

impl Endpoint {
    /// `host` is a bare authority such as `bot.example.com` or
    /// `127.0.0.1:8080`. When `secure` is false the plain `ws`/`http`
    /// schemes are used.
    pub fn new(host: impl Into<String>, secure: bool) -> Result<Self, RemoteError> {
        let host = host.into();
        let invalid = |reason: &str| RemoteError::InvalidHost {
            host: host.clone(),
            reason: reason.to_string(),
        };

        if host.is_empty() {
            return Err(invalid("host is empty"));
        }
        if host.chars().any(char::is_whitespace) {
            return Err(invalid("host contains whitespace"));
        }
        if host.contains("://") {
            return Err(invalid("host must not include a scheme"));
        }
        if host.contains(['/', '?', '#']) {
            return Err(invalid("host must not include a path, query or fragment"));
        }
        let (http, ws) = if secure { ("https", "wss") } else { ("http", "ws") };
        let http_base =
            Url::parse(&format!("{http}://{host}/")).map_err(|e| invalid(&e.to_string()))?;
        let ws_base =
            Url::parse(&format!("{ws}://{host}/")).map_err(|e| invalid(&e.to_string()))?;

        Ok(Self {
            host,
            secure,
            http_base,
            ws_base,
        })
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn is_secure(&self) -> bool {
        self.secure
    }

    fn build(base: &Url, path: &str, pairs: &[(&str, &str)]) -> Url {
        let mut url = base.clone();
        url.set_path(path);
        {
            let mut query = url.query_pairs_mut();
            for (k, v) in pairs {
                query.append_pair(k, v);
            }
        }
        url
    }

    /// `wss://<host>/audio-control/status?key=<key>`
    pub fn status_url(&self, key: &SessionKey) -> Url {
        Self::build(&self.ws_base, STATUS_PATH, &[("key", key.as_str())])
    }

    /// `https://<host>/audio-control/playing?key=<key>`
    pub fn playing_url(&self, key: &SessionKey) -> Url {
        Self::build(&self.http_base, PLAYING_PATH, &[("key", key.as_str())])
    }

    /// `https://<host>/<command>?key=<key>`
    pub fn command_url(&self, command: AudioCommand, key: &SessionKey) -> Url {
        Self::build(&self.http_base, command.path(), &[("key", key.as_str())])
    }

    /// The browser page that hosts the audio-control panel.
    pub fn panel_url(&self, key: &SessionKey) -> Url {
        Self::build(
            &self.http_base,
            "/",
            &[("audio-control", "1"), ("key", key.as_str())],
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(s: &str) -> SessionKey {
        SessionKey::new(s).unwrap()
    }

    #[test]
    fn empty_key_rejected() {
        assert!(matches!(SessionKey::new(""), Err(RemoteError::EmptyKey)));
    }

    #[test]
    fn whitespace_key_is_kept_verbatim() {
        assert_eq!(SessionKey::new("   ").unwrap().as_str(), "   ");
        assert_eq!(SessionKey::new(" k ").unwrap().as_str(), " k ");
    }

    #[test]
    fn redacted_url_hides_the_key() {
        let ep = Endpoint::new("127.0.0.1:8080", false).unwrap();
        let k = key("supersecretkey123");

        let status = redacted_url(&ep.status_url(&k));
        assert_eq!(status, "ws://127.0.0.1:8080/audio-control/status?key=supe…");

        let panel = redacted_url(&ep.panel_url(&k));
        assert_eq!(panel, "http://127.0.0.1:8080/?audio-control=1&key=supe…");
        assert!(!panel.contains("supersecretkey123"));
    }

    #[test]
    fn redacted_url_without_query_is_unchanged() {
        let url = Url::parse("https://bot.example.com/audio-control/playing").unwrap();
        assert_eq!(redacted_url(&url), "https://bot.example.com/audio-control/playing");
    }

    #[test]
    fn redacted_key_truncates() {
        assert_eq!(key("abcdefgh").redacted(), "abcd…");
        assert_eq!(key("abc").redacted(), "abc");
        assert_eq!(key("abcdefgh").to_string(), "abcd…");
    }

    #[test]
    fn status_url_secure() {
        let ep = Endpoint::new("bot.example.com", true).unwrap();
        assert_eq!(
            ep.status_url(&key("abc")).as_str(),
            "wss://bot.example.com/audio-control/status?key=abc"
        );
    }

    #[test]
    fn status_url_insecure_with_port() {
        let ep = Endpoint::new("127.0.0.1:8080", false).unwrap();
        assert_eq!(
            ep.status_url(&key("abc")).as_str(),
            "ws://127.0.0.1:8080/audio-control/status?key=abc"
        );
    }

    #[test]
    fn status_url_is_deterministic() {
        let ep = Endpoint::new("bot.example.com", true).unwrap();
        let k = key("k-_9");
        assert_eq!(ep.status_url(&k), ep.status_url(&k));
    }

    #[test]
    fn key_is_percent_encoded() {
        let ep = Endpoint::new("h", true).unwrap();
        let url = ep.status_url(&key("a&b=c"));
        assert_eq!(url.query(), Some("key=a%26b%3Dc"));
        let (_, v) = url.query_pairs().next().unwrap();
        assert_eq!(v, "a&b=c");
    }

    #[test]
    fn playing_url() {
        let ep = Endpoint::new("bot.example.com", true).unwrap();
        assert_eq!(
            ep.playing_url(&key("abc")).as_str(),
            "https://bot.example.com/audio-control/playing?key=abc"
        );
    }

    #[test]
    fn command_url() {
        let ep = Endpoint::new("bot.example.com", false).unwrap();
        assert_eq!(
            ep.command_url(AudioCommand::StopAfter, &key("abc")).as_str(),
            "http://bot.example.com/stopafter?key=abc"
        );
    }

    #[test]
    fn panel_url() {
        let ep = Endpoint::new("bot.example.com", true).unwrap();
        assert_eq!(
            ep.panel_url(&key("abc")).as_str(),
            "https://bot.example.com/?audio-control=1&key=abc"
        );
    }

    #[test]
    fn host_validation() {
        assert!(Endpoint::new("", true).is_err());
        assert!(Endpoint::new("https://bot.example.com", true).is_err());
        assert!(Endpoint::new("bot.example.com/path", true).is_err());
        assert!(Endpoint::new("bot example", true).is_err());
        assert!(Endpoint::new("localhost:3000", true).is_ok());
    }
}
