// Copyright 2018-2021 the Deno authors. All rights reserved. MIT license.

//! Per-component canonicalization. Concrete (non-pattern) text is brought
//! into the canonical form the matcher compares against: percent-encoding,
//! IDNA for hostnames, scheme and port validation, and dot-segment
//! normalization for hierarchical paths.

use crate::error::Error;

/// The six special schemes and their default ports. The order is fixed:
/// ambiguous protocol patterns resolve to the first scheme they match.
pub(crate) const SPECIAL_SCHEMES: [(&str, &str); 6] = [
  ("file", ""),
  ("ftp", "21"),
  ("http", "80"),
  ("ws", "80"),
  ("https", "443"),
  ("wss", "443"),
];

pub(crate) fn is_special_scheme(scheme: &str) -> bool {
  SPECIAL_SCHEMES.iter().any(|(s, _)| *s == scheme)
}

pub(crate) fn default_port(scheme: &str) -> Option<&'static str> {
  SPECIAL_SCHEMES
    .iter()
    .find(|(s, _)| *s == scheme)
    .map(|(_, port)| *port)
}

// Per-component percent-encode sets. Bytes below 0x20 are always encoded;
// non-ASCII bytes always pass through.
const USERINFO_SET: &[u8] = b" \"#<>?`{}/:;=@[\\]^|";
const FORBIDDEN_HOST_SET: &[u8] = b" #/:<>?@[\\]^|";
const PATH_SEGMENT_SET: &[u8] = b" \"#<>?`{}";
const QUERY_SET: &[u8] = b" \"#<>?'";
const FRAGMENT_SET: &[u8] = b" \"<>`";

/// Percent-encode `input` over `set`. With `percent_check`, an existing
/// `%HH` sequence passes through unchanged and a stray `%` fails.
fn percent_encode(
  input: &str,
  set: &[u8],
  percent_check: bool,
) -> Result<String, Error> {
  let bytes = input.as_bytes();
  let mut out = String::with_capacity(input.len());
  let mut pos = 0;
  while pos < input.len() {
    let c = input[pos..].chars().next().unwrap();
    if c == '%' && percent_check {
      if pos + 3 > input.len()
        || !bytes[pos + 1].is_ascii_hexdigit()
        || !bytes[pos + 2].is_ascii_hexdigit()
      {
        return Err(Error::at(pos, input));
      }
      out.push_str(&input[pos..pos + 3]);
      pos += 3;
      continue;
    }
    if c.is_ascii() {
      let byte = c as u8;
      if byte < 0x20 || set.contains(&byte) {
        out.push_str(&format!("%{:02X}", byte));
      } else {
        out.push(c);
      }
    } else {
      out.push(c);
    }
    pos += c.len_utf8();
  }
  Ok(out)
}

/// Schemes follow the URI grammar: ASCII alpha, then alphanumerics and
/// `+` `-` `.`. The canonical spelling is lowercase.
pub(crate) fn canonicalize_protocol(value: &str) -> Result<String, Error> {
  if value.is_empty() {
    return Ok(String::new());
  }
  for (i, c) in value.char_indices() {
    let valid = if i == 0 {
      c.is_ascii_alphabetic()
    } else {
      c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.')
    };
    if !valid {
      return Err(Error::at(i, value));
    }
  }
  Ok(value.to_ascii_lowercase())
}

pub(crate) fn canonicalize_username(value: &str) -> Result<String, Error> {
  percent_encode(value, USERINFO_SET, false)
}

pub(crate) fn canonicalize_password(value: &str) -> Result<String, Error> {
  percent_encode(value, USERINFO_SET, false)
}

/// IDNA ToASCII, then verify the result is a fixed point of host
/// percent-encoding: forbidden host code points fail, as do stray `%`s.
pub(crate) fn canonicalize_hostname(value: &str) -> Result<String, Error> {
  if value.is_empty() {
    return Ok(String::new());
  }
  let ascii =
    idna::domain_to_ascii(value).map_err(|_| Error::at(0, value))?;
  let encoded = percent_encode(&ascii, FORBIDDEN_HOST_SET, true)?;
  if encoded != ascii {
    return Err(Error::at(0, value));
  }
  Ok(ascii)
}

/// IPv6 hosts admit only hex digits, `[`, `]` and `:`, lowercased.
pub(crate) fn canonicalize_ipv6_hostname(
  value: &str,
) -> Result<String, Error> {
  let mut out = String::with_capacity(value.len());
  for (i, c) in value.char_indices() {
    if !c.is_ascii_hexdigit() && !matches!(c, '[' | ']' | ':') {
      return Err(Error::at(i, value));
    }
    out.push(c.to_ascii_lowercase());
  }
  Ok(out)
}

/// Ports are decimal integers in 0..=65535, re-serialized. A port equal to
/// the protocol's default serializes to the empty string.
pub(crate) fn canonicalize_port(
  value: &str,
  protocol: Option<&str>,
) -> Result<String, Error> {
  if value.is_empty() {
    return Ok(String::new());
  }
  let port: u16 = value.parse().map_err(|_| Error::at(0, value))?;
  let serialized = port.to_string();
  match protocol.and_then(default_port) {
    Some(default) if default == serialized => Ok(String::new()),
    _ => Ok(serialized),
  }
}

fn is_single_dot(segment: &str) -> bool {
  segment == "." || segment.eq_ignore_ascii_case("%2e")
}

fn is_double_dot(segment: &str) -> bool {
  let lower = segment.to_ascii_lowercase();
  matches!(lower.as_str(), ".." | ".%2e" | "%2e." | "%2e%2e")
}

/// Hierarchical paths: split on `/`, collapse `.` and `..` segments
/// (accepting `%2e` spellings, case-insensitively), percent-encode each
/// surviving segment. A collapsed final segment keeps the trailing slash.
pub(crate) fn canonicalize_pathname(value: &str) -> Result<String, Error> {
  if value.is_empty() {
    return Ok(String::new());
  }
  let floor = if value.starts_with('/') { 1 } else { 0 };
  let mut segments: Vec<String> = Vec::new();
  let mut trailing_dir = false;
  for segment in value.split('/') {
    if is_single_dot(segment) {
      trailing_dir = true;
      continue;
    }
    if is_double_dot(segment) {
      if segments.len() > floor {
        segments.pop();
      }
      trailing_dir = true;
      continue;
    }
    trailing_dir = false;
    segments.push(percent_encode(segment, PATH_SEGMENT_SET, false)?);
  }
  if trailing_dir {
    segments.push(String::new());
  }
  Ok(segments.join("/"))
}

/// Opaque paths (`data:`, `javascript:`, …) only encode control bytes.
pub(crate) fn canonicalize_opaque_pathname(
  value: &str,
) -> Result<String, Error> {
  percent_encode(value, &[], false)
}

pub(crate) fn canonicalize_search(value: &str) -> Result<String, Error> {
  percent_encode(value, QUERY_SET, false)
}

pub(crate) fn canonicalize_hash(value: &str) -> Result<String, Error> {
  percent_encode(value, FRAGMENT_SET, false)
}

/// How an init map's values are interpreted when merged: as sub-patterns
/// (no canonicalization) or as concrete URL components.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub(crate) enum ProcessKind {
  Pattern,
  Url,
}

pub(crate) fn process_protocol(
  value: &str,
  kind: ProcessKind,
) -> Result<String, Error> {
  let stripped = value.strip_suffix(':').unwrap_or(value);
  match kind {
    ProcessKind::Pattern => Ok(stripped.to_string()),
    ProcessKind::Url => canonicalize_protocol(stripped),
  }
}

pub(crate) fn process_username(
  value: &str,
  kind: ProcessKind,
) -> Result<String, Error> {
  match kind {
    ProcessKind::Pattern => Ok(value.to_string()),
    ProcessKind::Url => canonicalize_username(value),
  }
}

pub(crate) fn process_password(
  value: &str,
  kind: ProcessKind,
) -> Result<String, Error> {
  match kind {
    ProcessKind::Pattern => Ok(value.to_string()),
    ProcessKind::Url => canonicalize_password(value),
  }
}

pub(crate) fn process_hostname(
  value: &str,
  kind: ProcessKind,
) -> Result<String, Error> {
  match kind {
    ProcessKind::Pattern => Ok(value.to_string()),
    ProcessKind::Url => {
      if value.starts_with('[') {
        canonicalize_ipv6_hostname(value)
      } else {
        canonicalize_hostname(value)
      }
    }
  }
}

pub(crate) fn process_port(
  value: &str,
  protocol: Option<&str>,
  kind: ProcessKind,
) -> Result<String, Error> {
  match kind {
    ProcessKind::Pattern => Ok(value.to_string()),
    ProcessKind::Url => canonicalize_port(value, protocol),
  }
}

pub(crate) fn process_pathname(
  value: &str,
  protocol: Option<&str>,
  kind: ProcessKind,
) -> Result<String, Error> {
  match kind {
    ProcessKind::Pattern => Ok(value.to_string()),
    ProcessKind::Url => match protocol {
      Some(protocol) if protocol.is_empty() || is_special_scheme(protocol) => {
        canonicalize_pathname(value)
      }
      _ => canonicalize_opaque_pathname(value),
    },
  }
}

pub(crate) fn process_search(
  value: &str,
  kind: ProcessKind,
) -> Result<String, Error> {
  let stripped = value.strip_prefix('?').unwrap_or(value);
  match kind {
    ProcessKind::Pattern => Ok(stripped.to_string()),
    ProcessKind::Url => canonicalize_search(stripped),
  }
}

pub(crate) fn process_hash(
  value: &str,
  kind: ProcessKind,
) -> Result<String, Error> {
  let stripped = value.strip_prefix('#').unwrap_or(value);
  match kind {
    ProcessKind::Pattern => Ok(stripped.to_string()),
    ProcessKind::Url => canonicalize_hash(stripped),
  }
}
