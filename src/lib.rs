// Copyright 2018-2021 the Deno authors. All rights reserved. MIT license.

//! An implementation of the URLPattern standard: URL-shaped templates where
//! every URL component carries its own sub-pattern in a
//! path-to-regexp-inspired syntax.
//!
//! ```
//! use url_pattern::UrlPattern;
//!
//! let pattern =
//!   UrlPattern::parse("https://example.com/books/:id".into(), None).unwrap();
//! let result = pattern.exec("https://example.com/books/123".into(), None);
//! let result = result.unwrap();
//! assert_eq!(
//!   result.pathname.groups.get("id"),
//!   Some(&Some("123".to_string()))
//! );
//! ```

mod canonical;
mod component;
mod error;
mod parser;
mod resolver;
mod shape;
mod tokenizer;

use indexmap::IndexMap;
use serde::Deserialize;
use serde::Serialize;
use url::Url;

use crate::canonical::ProcessKind;
use crate::component::Component;
use crate::parser::ParseOptions;

pub use error::Error;

/// The eight URL components a pattern is made of, plus the base URL input
/// key.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ComponentKind {
  Protocol,
  Username,
  Password,
  Hostname,
  Port,
  Pathname,
  Search,
  Hash,
  /// Only ever an input key; never compiled into a component.
  #[serde(rename = "baseURL")]
  BaseUrl,
}

/// Options for pattern construction. `ignore_case` affects only the
/// pathname component's matching; every other component stays
/// case-sensitive.
#[derive(
  Debug, Clone, Copy, Default, Eq, PartialEq, Deserialize, Serialize,
)]
pub struct UrlPatternOptions {
  #[serde(rename = "ignoreCase", default)]
  pub ignore_case: bool,
}

impl UrlPatternOptions {
  /// A copy of these options with `ignore_case` replaced.
  pub fn with_ignore_case(self, ignore_case: bool) -> Self {
    UrlPatternOptions { ignore_case }
  }
}

/// The structured input used to create a URL pattern: a sparse map from
/// component to sub-pattern string.
#[derive(Deserialize, Serialize, Clone, Default, Debug, Eq, PartialEq)]
pub struct UrlPatternInit {
  #[serde(skip_serializing_if = "Option::is_none")]
  pub protocol: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub username: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub password: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub hostname: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub port: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub pathname: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub search: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub hash: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  #[serde(rename = "baseURL")]
  pub base_url: Option<String>,
}

impl UrlPatternInit {
  /// Look up one entry by component key.
  pub fn component(&self, kind: ComponentKind) -> Option<&str> {
    match kind {
      ComponentKind::Protocol => self.protocol.as_deref(),
      ComponentKind::Username => self.username.as_deref(),
      ComponentKind::Password => self.password.as_deref(),
      ComponentKind::Hostname => self.hostname.as_deref(),
      ComponentKind::Port => self.port.as_deref(),
      ComponentKind::Pathname => self.pathname.as_deref(),
      ComponentKind::Search => self.search.as_deref(),
      ComponentKind::Hash => self.hash.as_deref(),
      ComponentKind::BaseUrl => self.base_url.as_deref(),
    }
  }

  /// Merge this init into a component map. `ProcessKind::Pattern` keeps the
  /// values as sub-patterns; `ProcessKind::Url` canonicalizes them as
  /// concrete URL components and defaults every missing one to the empty
  /// string. A base URL contributes the components the init leaves out.
  fn process(&self, kind: ProcessKind) -> Result<UrlPatternInit, Error> {
    let mut result = match kind {
      ProcessKind::Pattern => UrlPatternInit::default(),
      ProcessKind::Url => UrlPatternInit {
        protocol: Some(String::new()),
        username: Some(String::new()),
        password: Some(String::new()),
        hostname: Some(String::new()),
        port: Some(String::new()),
        pathname: Some(String::new()),
        search: Some(String::new()),
        hash: Some(String::new()),
        base_url: None,
      },
    };

    let base = match &self.base_url {
      Some(base_url) => {
        let base = Url::parse(base_url).map_err(|_| Error::at(0, base_url))?;
        result.protocol = Some(base.scheme().to_string());
        result.username = Some(base.username().to_string());
        result.password =
          Some(base.password().unwrap_or_default().to_string());
        result.hostname =
          Some(base.host_str().unwrap_or_default().to_string());
        result.port = Some(url::quirks::port(&base).to_string());
        result.pathname = Some(url::quirks::pathname(&base).to_string());
        result.search = Some(base.query().unwrap_or_default().to_string());
        result.hash = Some(base.fragment().unwrap_or_default().to_string());
        Some(base)
      }
      None => None,
    };

    if let Some(protocol) = &self.protocol {
      result.protocol = Some(canonical::process_protocol(protocol, kind)?);
    }
    if let Some(username) = &self.username {
      result.username = Some(canonical::process_username(username, kind)?);
    }
    if let Some(password) = &self.password {
      result.password = Some(canonical::process_password(password, kind)?);
    }
    if let Some(hostname) = &self.hostname {
      result.hostname = Some(canonical::process_hostname(hostname, kind)?);
    }
    if let Some(port) = &self.port {
      result.port = Some(canonical::process_port(
        port,
        result.protocol.as_deref(),
        kind,
      )?);
    }
    if let Some(pathname) = &self.pathname {
      let mut pathname = pathname.clone();
      if let Some(base) = &base {
        // A relative pathname resolves against the base URL's directory.
        if !base.cannot_be_a_base() && !is_absolute_pathname(&pathname, kind)
        {
          let base_pathname = url::quirks::pathname(base);
          if let Some(slash) = base_pathname.rfind('/') {
            pathname =
              format!("{}{}", &base_pathname[..=slash], pathname);
          }
        }
      }
      result.pathname = Some(canonical::process_pathname(
        &pathname,
        result.protocol.as_deref(),
        kind,
      )?);
    }
    if let Some(search) = &self.search {
      result.search = Some(canonical::process_search(search, kind)?);
    }
    if let Some(hash) = &self.hash {
      result.hash = Some(canonical::process_hash(hash, kind)?);
    }
    Ok(result)
  }
}

fn is_absolute_pathname(input: &str, kind: ProcessKind) -> bool {
  if input.is_empty() {
    return false;
  }
  if input.starts_with('/') {
    return true;
  }
  if kind == ProcessKind::Url {
    return false;
  }
  // Pattern text may hide the leading slash behind an escape or a group.
  input.starts_with("\\/") || input.starts_with("{/")
}

/// Input for pattern construction and matching: either a URL-shaped string
/// or a component map.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum UrlPatternInput {
  String(String),
  Init(UrlPatternInit),
}

impl From<&str> for UrlPatternInput {
  fn from(value: &str) -> Self {
    UrlPatternInput::String(value.to_string())
  }
}

impl From<String> for UrlPatternInput {
  fn from(value: String) -> Self {
    UrlPatternInput::String(value)
  }
}

impl From<UrlPatternInit> for UrlPatternInput {
  fn from(value: UrlPatternInit) -> Self {
    UrlPatternInput::Init(value)
  }
}

/// A compiled URL pattern: eight independently compiled components.
/// Immutable once constructed; matching never mutates shared state, so a
/// pattern may be queried from multiple threads at once.
#[derive(Debug, Deserialize, Serialize)]
pub struct UrlPattern {
  protocol: Component,
  username: Component,
  password: Component,
  hostname: Component,
  port: Component,
  pathname: Component,
  search: Component,
  hash: Component,
}

impl UrlPattern {
  /// Parse a [UrlPatternInput], with an optional base URL, into a pattern.
  pub fn parse(
    input: UrlPatternInput,
    base_url: Option<&str>,
  ) -> Result<UrlPattern, Error> {
    UrlPattern::parse_with_options(input, base_url, Default::default())
  }

  /// As [UrlPattern::parse], with explicit [UrlPatternOptions].
  pub fn parse_with_options(
    input: UrlPatternInput,
    base_url: Option<&str>,
    options: UrlPatternOptions,
  ) -> Result<UrlPattern, Error> {
    let init = match input {
      UrlPatternInput::String(pattern) => {
        let mut init = shape::split_pattern_string(&pattern)?;
        init.base_url = base_url.map(str::to_string);
        init
      }
      UrlPatternInput::Init(init) => {
        if let Some(base_url) = base_url {
          // A base URL only combines with string patterns; an init carries
          // its own `base_url` entry.
          return Err(Error::at(0, base_url));
        }
        init
      }
    };

    let mut init = init.process(ProcessKind::Pattern)?;

    let protocol = Component::compile(
      init.protocol.as_deref(),
      canonical::canonicalize_protocol,
      &ParseOptions::default(),
    )?;

    // A special-scheme pattern whose port is unspecified or equal to the
    // scheme's default only ever matches the empty (elided) port.
    if let Some(scheme) = protocol.matched_special_scheme() {
      let default = canonical::default_port(scheme).unwrap_or("");
      match init.port.as_deref() {
        None => init.port = Some(String::new()),
        Some(port) if port == default => init.port = Some(String::new()),
        _ => {}
      }
    }

    let hostname = if hostname_pattern_is_ipv6(
      init.hostname.as_deref().unwrap_or_default(),
    ) {
      Component::compile(
        init.hostname.as_deref(),
        canonical::canonicalize_ipv6_hostname,
        &ParseOptions::hostname(),
      )?
    } else {
      Component::compile(
        init.hostname.as_deref(),
        canonical::canonicalize_hostname,
        &ParseOptions::hostname(),
      )?
    };

    let pathname = if protocol.matched_special_scheme().is_some() {
      Component::compile(
        init.pathname.as_deref(),
        canonical::canonicalize_pathname,
        &ParseOptions::pathname(options.ignore_case),
      )?
    } else {
      Component::compile(
        init.pathname.as_deref(),
        canonical::canonicalize_opaque_pathname,
        &ParseOptions::opaque_pathname(options.ignore_case),
      )?
    };

    Ok(UrlPattern {
      protocol,
      username: Component::compile(
        init.username.as_deref(),
        canonical::canonicalize_username,
        &ParseOptions::default(),
      )?,
      password: Component::compile(
        init.password.as_deref(),
        canonical::canonicalize_password,
        &ParseOptions::default(),
      )?,
      hostname,
      port: Component::compile(
        init.port.as_deref(),
        |port| canonical::canonicalize_port(port, None),
        &ParseOptions::default(),
      )?,
      pathname,
      search: Component::compile(
        init.search.as_deref(),
        canonical::canonicalize_search,
        &ParseOptions::default(),
      )?,
      hash: Component::compile(
        init.hash.as_deref(),
        canonical::canonicalize_hash,
        &ParseOptions::default(),
      )?,
    })
  }

  /// The canonical pattern string matched against the protocol.
  pub fn protocol(&self) -> &str {
    &self.protocol.pattern_string
  }

  /// The canonical pattern string matched against the username.
  pub fn username(&self) -> &str {
    &self.username.pattern_string
  }

  /// The canonical pattern string matched against the password.
  pub fn password(&self) -> &str {
    &self.password.pattern_string
  }

  /// The canonical pattern string matched against the hostname.
  pub fn hostname(&self) -> &str {
    &self.hostname.pattern_string
  }

  /// The canonical pattern string matched against the port.
  pub fn port(&self) -> &str {
    &self.port.pattern_string
  }

  /// The canonical pattern string matched against the pathname.
  pub fn pathname(&self) -> &str {
    &self.pathname.pattern_string
  }

  /// The canonical pattern string matched against the search string.
  pub fn search(&self) -> &str {
    &self.search.pattern_string
  }

  /// The canonical pattern string matched against the hash fragment.
  pub fn hash(&self) -> &str {
    &self.hash.pattern_string
  }

  /// Whether the input (with optional base URL) matches the pattern.
  /// Inputs that cannot be parsed or canonicalized do not match.
  pub fn test(
    &self,
    input: UrlPatternInput,
    base_url: Option<&str>,
  ) -> bool {
    self.matches(input, base_url).is_some()
  }

  /// Match the input (with optional base URL) against the pattern,
  /// returning the bound groups per component, or `None` when it does not
  /// match. Inputs that cannot be parsed or canonicalized do not match.
  pub fn exec(
    &self,
    input: UrlPatternInput,
    base_url: Option<&str>,
  ) -> Option<UrlPatternResult> {
    self.matches(input, base_url)
  }

  fn matches(
    &self,
    input: UrlPatternInput,
    base_url: Option<&str>,
  ) -> Option<UrlPatternResult> {
    let mut inputs = vec![input.clone()];
    let init = match input {
      UrlPatternInput::Init(init) => {
        if base_url.is_some() {
          return None;
        }
        init
      }
      UrlPatternInput::String(url) => {
        if let Some(base_url) = base_url {
          inputs.push(UrlPatternInput::String(base_url.to_string()));
        }
        resolver::resolve(&url, base_url).ok()?
      }
    };
    let init = init.process(ProcessKind::Url).ok()?;

    let protocol = init.protocol.unwrap_or_default();
    let username = init.username.unwrap_or_default();
    let password = init.password.unwrap_or_default();
    let hostname = init.hostname.unwrap_or_default();
    let port = init.port.unwrap_or_default();
    let pathname = init.pathname.unwrap_or_default();
    let search = init.search.unwrap_or_default();
    let hash = init.hash.unwrap_or_default();

    // Components are checked in a fixed order; the first failure ends the
    // match.
    let protocol_captures = self.protocol.regex.captures(&protocol)?;
    let username_captures = self.username.regex.captures(&username)?;
    let password_captures = self.password.regex.captures(&password)?;
    let hostname_captures = self.hostname.regex.captures(&hostname)?;
    let port_captures = self.port.regex.captures(&port)?;
    let pathname_captures = self.pathname.regex.captures(&pathname)?;
    let search_captures = self.search.regex.captures(&search)?;
    let hash_captures = self.hash.regex.captures(&hash)?;

    Some(UrlPatternResult {
      inputs,
      protocol: self
        .protocol
        .create_match_result(protocol.clone(), &protocol_captures),
      username: self
        .username
        .create_match_result(username.clone(), &username_captures),
      password: self
        .password
        .create_match_result(password.clone(), &password_captures),
      hostname: self
        .hostname
        .create_match_result(hostname.clone(), &hostname_captures),
      port: self.port.create_match_result(port.clone(), &port_captures),
      pathname: self
        .pathname
        .create_match_result(pathname.clone(), &pathname_captures),
      search: self
        .search
        .create_match_result(search.clone(), &search_captures),
      hash: self.hash.create_match_result(hash.clone(), &hash_captures),
    })
  }
}

fn hostname_pattern_is_ipv6(input: &str) -> bool {
  if input.len() < 2 {
    return false;
  }
  input.starts_with('[')
    || input.starts_with("{[")
    || input.starts_with("\\[")
}

/// The result of a successful match.
#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct UrlPatternResult {
  /// The inputs exactly as the caller passed them.
  pub inputs: Vec<UrlPatternInput>,

  pub protocol: UrlPatternComponentResult,
  pub username: UrlPatternComponentResult,
  pub password: UrlPatternComponentResult,
  pub hostname: UrlPatternComponentResult,
  pub port: UrlPatternComponentResult,
  pub pathname: UrlPatternComponentResult,
  pub search: UrlPatternComponentResult,
  pub hash: UrlPatternComponentResult,
}

/// The match result for a single component.
#[derive(Debug, Deserialize, Serialize, Default, PartialEq, Eq)]
pub struct UrlPatternComponentResult {
  /// The component string that was matched.
  pub input: String,
  /// Every named group, in pattern order; `None` for captures that did not
  /// participate in the match.
  pub groups: IndexMap<String, Option<String>>,
}

#[cfg(test)]
mod tests {
  use indexmap::IndexMap;
  use serde::Deserialize;

  use super::UrlPattern;
  use super::UrlPatternComponentResult;
  use super::UrlPatternInput;
  use super::UrlPatternOptions;

  #[derive(Deserialize)]
  struct TestCase {
    /// `[pattern]` or `[pattern, baseUrl]`.
    pattern: Vec<UrlPatternInput>,
    /// `[input]` or `[input, baseUrl]`; empty to only check construction.
    #[serde(default)]
    inputs: Vec<UrlPatternInput>,
    /// Expected canonical pattern strings per component, or the string
    /// `"error"` when construction must fail.
    #[serde(default)]
    expected_pattern: Option<serde_json::Value>,
    /// Expected per-component match results; `null`/absent means the input
    /// must not match.
    #[serde(default)]
    expected_match: Option<IndexMap<String, UrlPatternComponentResult>>,
  }

  fn base_of(inputs: &[UrlPatternInput]) -> Option<String> {
    inputs.get(1).map(|input| match input {
      UrlPatternInput::String(url) => url.clone(),
      UrlPatternInput::Init(_) => unreachable!("base must be a string"),
    })
  }

  fn run_case(case: TestCase) {
    let pattern_input = case.pattern.first().unwrap().clone();
    let pattern_base = base_of(&case.pattern);
    let description = format!("{:?} (base {:?})", pattern_input, pattern_base);

    let parsed =
      UrlPattern::parse(pattern_input, pattern_base.as_deref());
    let expected_pattern = case.expected_pattern.as_ref();
    if expected_pattern.and_then(|v| v.as_str()) == Some("error") {
      assert!(parsed.is_err(), "expected error constructing {}", description);
      return;
    }
    let pattern = parsed
      .unwrap_or_else(|e| panic!("constructing {}: {}", description, e));

    if let Some(expected) = expected_pattern.and_then(|v| v.as_object()) {
      for (component, value) in expected {
        let expected = value.as_str().unwrap();
        let actual = match component.as_str() {
          "protocol" => pattern.protocol(),
          "username" => pattern.username(),
          "password" => pattern.password(),
          "hostname" => pattern.hostname(),
          "port" => pattern.port(),
          "pathname" => pattern.pathname(),
          "search" => pattern.search(),
          "hash" => pattern.hash(),
          other => panic!("unknown component {}", other),
        };
        assert_eq!(
          actual, expected,
          "{} pattern string for {}",
          component, description
        );
      }
    }

    let match_input = match case.inputs.first() {
      Some(input) => input.clone(),
      None => return,
    };
    let match_base = base_of(&case.inputs);
    let description =
      format!("{} matched against {:?}", description, match_input);

    let tested = pattern.test(match_input.clone(), match_base.as_deref());
    let result = pattern.exec(match_input, match_base.as_deref());
    assert_eq!(tested, result.is_some(), "test/exec disagree");

    let expected = match case.expected_match {
      Some(expected) => expected,
      None => {
        assert!(result.is_none(), "expected no match for {}", description);
        return;
      }
    };
    let result =
      result.unwrap_or_else(|| panic!("expected match for {}", description));
    for (component, expected) in expected {
      let actual = match component.as_str() {
        "protocol" => &result.protocol,
        "username" => &result.username,
        "password" => &result.password,
        "hostname" => &result.hostname,
        "port" => &result.port,
        "pathname" => &result.pathname,
        "search" => &result.search,
        "hash" => &result.hash,
        other => panic!("unknown component {}", other),
      };
      assert_eq!(actual, &expected, "{} result for {}", component, description);
    }
  }

  #[test]
  fn fixture_cases() {
    let testdata = include_str!("./testdata/cases.json");
    let cases: Vec<TestCase> = serde_json::from_str(testdata).unwrap();
    for case in cases {
      run_case(case);
    }
  }

  #[test]
  fn test_matches_exec_presence() {
    let pattern =
      UrlPattern::parse("https://example.com/:section/*".into(), None)
        .unwrap();
    for input in [
      "https://example.com/docs/intro",
      "https://example.com/",
      "http://example.com/docs/intro",
      "not a url at all",
    ] {
      let input: UrlPatternInput = input.into();
      assert_eq!(
        pattern.test(input.clone(), None),
        pattern.exec(input, None).is_some()
      );
    }
  }

  #[test]
  fn unbound_optional_group() {
    let pattern = UrlPattern::parse("/:foo/:bar?".into(), None).unwrap();
    let result = pattern.exec("/test".into(), None).unwrap();
    assert_eq!(
      result.pathname.groups.get("foo"),
      Some(&Some("test".to_string()))
    );
    assert_eq!(result.pathname.groups.get("bar"), Some(&None));
    assert!(pattern.test("/test/route".into(), None));
  }

  #[test]
  fn group_order_is_pattern_order() {
    let pattern =
      UrlPattern::parse("/:alpha/:beta/:gamma".into(), None).unwrap();
    let result = pattern.exec("/1/2/3".into(), None).unwrap();
    let names: Vec<_> = result.pathname.groups.keys().cloned().collect();
    assert_eq!(names, vec!["alpha", "beta", "gamma"]);
  }

  #[test]
  fn ignore_case_applies_to_pathname_only() {
    let options = UrlPatternOptions::default().with_ignore_case(true);
    assert!(options.ignore_case);
    let pattern = UrlPattern::parse_with_options(
      "https://example.com/FOO#Bar".into(),
      None,
      options,
    )
    .unwrap();
    assert!(pattern.test("https://example.com/foo#Bar".into(), None));
    // The hash stays case-sensitive even with ignore_case.
    assert!(!pattern.test("https://example.com/foo#bar".into(), None));

    let sensitive =
      UrlPattern::parse("https://example.com/FOO".into(), None).unwrap();
    assert!(!sensitive.test("https://example.com/foo".into(), None));
  }

  #[test]
  fn base_url_with_init_input_fails_construction() {
    let init = super::UrlPatternInit {
      pathname: Some("/x".to_string()),
      ..Default::default()
    };
    assert!(
      UrlPattern::parse(init.into(), Some("https://example.com")).is_err()
    );
  }

  #[test]
  fn match_errors_become_no_match() {
    let pattern =
      UrlPattern::parse("https://example.com/*".into(), None).unwrap();
    // Unparseable input, unparseable base, init alongside a base URL.
    assert!(!pattern.test("https://exa mple.com/".into(), None));
    assert!(!pattern.test("/x".into(), Some("not a base")));
    let init = super::UrlPatternInit::default();
    assert!(!pattern.test(init.into(), Some("https://example.com")));
  }

  #[test]
  fn construction_error_message() {
    let init = super::UrlPatternInit {
      protocol: Some("(café)".to_string()),
      ..Default::default()
    };
    let err = UrlPattern::parse(init.into(), None).unwrap_err();
    assert_eq!(
      err.to_string(),
      "illegal pattern near index 4: (café)"
    );
  }

  #[test]
  fn init_component_lookup() {
    let init = super::UrlPatternInit {
      hostname: Some("example.com".to_string()),
      base_url: Some("https://example.com".to_string()),
      ..Default::default()
    };
    assert_eq!(
      init.component(super::ComponentKind::Hostname),
      Some("example.com")
    );
    assert_eq!(init.component(super::ComponentKind::Port), None);
    assert_eq!(
      init.component(super::ComponentKind::BaseUrl),
      Some("https://example.com")
    );
  }
}
