//! Decomposes an input URL string, optionally resolved against a base URL,
//! into the eight component strings the matcher compares against.

use url::Url;

use crate::error::Error;
use crate::UrlPatternInit;

/// Parse `input` (resolving it against `base_url` when one is given) and
/// extract its components. An input the host parser cannot represent — a
/// scheme-less reference with no base — is decomposed as a relative
/// reference, with every unmentioned component empty.
pub(crate) fn resolve(
  input: &str,
  base_url: Option<&str>,
) -> Result<UrlPatternInit, Error> {
  let base = match base_url {
    Some(base) if !base.is_empty() => {
      Some(Url::parse(base).map_err(|_| Error::at(0, base))?)
    }
    _ => None,
  };
  match Url::options().base_url(base.as_ref()).parse(input) {
    Ok(url) => Ok(from_url(&url)),
    Err(url::ParseError::RelativeUrlWithoutBase) => {
      Ok(split_relative_reference(input))
    }
    Err(_) => Err(Error::at(0, input)),
  }
}

fn from_url(url: &Url) -> UrlPatternInit {
  UrlPatternInit {
    protocol: Some(url.scheme().to_string()),
    username: Some(url.username().to_string()),
    password: Some(url.password().unwrap_or_default().to_string()),
    hostname: Some(url.host_str().unwrap_or_default().to_string()),
    port: Some(url::quirks::port(url).to_string()),
    pathname: Some(url::quirks::pathname(url).to_string()),
    search: Some(url.query().unwrap_or_default().to_string()),
    hash: Some(url.fragment().unwrap_or_default().to_string()),
    base_url: None,
  }
}

/// RFC 3986 relative-reference decomposition: fragment, then query, then an
/// optional `//authority` with userinfo, host and port, then the path.
fn split_relative_reference(input: &str) -> UrlPatternInit {
  let mut init = UrlPatternInit {
    protocol: Some(String::new()),
    username: Some(String::new()),
    password: Some(String::new()),
    hostname: Some(String::new()),
    port: Some(String::new()),
    pathname: Some(String::new()),
    search: Some(String::new()),
    hash: Some(String::new()),
    base_url: None,
  };

  let (rest, hash) = match input.split_once('#') {
    Some((rest, hash)) => (rest, hash),
    None => (input, ""),
  };
  init.hash = Some(hash.to_string());
  let (rest, search) = match rest.split_once('?') {
    Some((rest, search)) => (rest, search),
    None => (rest, ""),
  };
  init.search = Some(search.to_string());

  match rest.strip_prefix("//") {
    Some(authority_and_path) => {
      let (authority, path) = match authority_and_path.find('/') {
        Some(slash) => authority_and_path.split_at(slash),
        None => (authority_and_path, ""),
      };
      let host = match authority.rsplit_once('@') {
        Some((userinfo, host)) => {
          match userinfo.split_once(':') {
            Some((username, password)) => {
              init.username = Some(username.to_string());
              init.password = Some(password.to_string());
            }
            None => init.username = Some(userinfo.to_string()),
          }
          host
        }
        None => authority,
      };
      let (hostname, port) = split_host_port(host);
      init.hostname = Some(hostname.to_string());
      init.port = Some(port.to_string());
      init.pathname = Some(path.to_string());
    }
    None => init.pathname = Some(rest.to_string()),
  }
  init
}

/// Split a trailing `:port`, leaving bracketed IPv6 literals whole.
fn split_host_port(host: &str) -> (&str, &str) {
  if host.starts_with('[') {
    if let Some(close) = host.find(']') {
      return match host[close + 1..].strip_prefix(':') {
        Some(port) => (&host[..close + 1], port),
        None => (host, ""),
      };
    }
  }
  match host.rfind(':') {
    Some(colon) => (&host[..colon], &host[colon + 1..]),
    None => (host, ""),
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn absolute_url() {
    let init =
      resolve("https://user:pw@example.com:8080/a/b?q=1#top", None).unwrap();
    assert_eq!(init.protocol.as_deref(), Some("https"));
    assert_eq!(init.username.as_deref(), Some("user"));
    assert_eq!(init.password.as_deref(), Some("pw"));
    assert_eq!(init.hostname.as_deref(), Some("example.com"));
    assert_eq!(init.port.as_deref(), Some("8080"));
    assert_eq!(init.pathname.as_deref(), Some("/a/b"));
    assert_eq!(init.search.as_deref(), Some("q=1"));
    assert_eq!(init.hash.as_deref(), Some("top"));
  }

  #[test]
  fn default_port_is_empty() {
    let init = resolve("https://example.com:443/", None).unwrap();
    assert_eq!(init.port.as_deref(), Some(""));
  }

  #[test]
  fn resolved_against_base() {
    let init = resolve("/docs?v=2", Some("https://example.com/old")).unwrap();
    assert_eq!(init.protocol.as_deref(), Some("https"));
    assert_eq!(init.hostname.as_deref(), Some("example.com"));
    assert_eq!(init.pathname.as_deref(), Some("/docs"));
    assert_eq!(init.search.as_deref(), Some("v=2"));
  }

  #[test]
  fn opaque_path() {
    let init = resolve("data:text/plain,hello#frag", None).unwrap();
    assert_eq!(init.protocol.as_deref(), Some("data"));
    assert_eq!(init.hostname.as_deref(), Some(""));
    assert_eq!(init.pathname.as_deref(), Some("text/plain,hello"));
    assert_eq!(init.hash.as_deref(), Some("frag"));
  }

  #[test]
  fn relative_reference_without_base() {
    let init = resolve("/test/route?a=b#c", None).unwrap();
    assert_eq!(init.protocol.as_deref(), Some(""));
    assert_eq!(init.hostname.as_deref(), Some(""));
    assert_eq!(init.pathname.as_deref(), Some("/test/route"));
    assert_eq!(init.search.as_deref(), Some("a=b"));
    assert_eq!(init.hash.as_deref(), Some("c"));
  }

  #[test]
  fn protocol_relative_reference() {
    let init = resolve("//user@[::1]:8080/x", None).unwrap();
    assert_eq!(init.username.as_deref(), Some("user"));
    assert_eq!(init.hostname.as_deref(), Some("[::1]"));
    assert_eq!(init.port.as_deref(), Some("8080"));
    assert_eq!(init.pathname.as_deref(), Some("/x"));
  }

  #[test]
  fn unparseable_base_fails() {
    assert!(resolve("/x", Some("not a url")).is_err());
  }
}
