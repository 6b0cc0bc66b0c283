// Copyright 2018-2021 the Deno authors. All rights reserved. MIT license.

use regex::Regex;
use serde::Deserialize;
use serde::Serialize;

use crate::canonical::SPECIAL_SCHEMES;
use crate::error::Error;
use crate::parser::parse_pattern_string;
use crate::parser::ParseOptions;
use crate::parser::Part;
use crate::parser::PartKind;
use crate::parser::PartModifier;
use crate::parser::escape_regex_string;
use crate::parser::FULL_WILDCARD;
use crate::tokenizer::is_name_codepoint;
use crate::UrlPatternComponentResult;

/// One compiled URL component: the canonical pattern string, the anchored
/// regular expression it lowers to, and the capture names in order. The
/// regex has exactly one capture group per entry in `group_names`.
#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct Component {
  pub pattern_string: String,
  #[serde(with = "serde_regex")]
  pub regex: Regex,
  pub group_names: Vec<String>,
}

impl Component {
  /// Compile one component sub-pattern. A missing sub-pattern is the
  /// catch-all `*`.
  pub fn compile<F>(
    input: Option<&str>,
    encode: F,
    options: &ParseOptions,
  ) -> Result<Self, Error>
  where
    F: Fn(&str) -> Result<String, Error>,
  {
    let raw = input.unwrap_or("*");
    let parts = parse_pattern_string(raw, options, encode)?;
    let (regex_source, group_names) = build_regex_source(&parts, options);
    let regex = regex::RegexBuilder::new(&regex_source)
      .case_insensitive(options.ignore_case)
      .build()
      .map_err(|_| Error::at(0, raw))?;
    let pattern_string = build_pattern_string(&parts, options);
    Ok(Component {
      pattern_string,
      regex,
      group_names,
    })
  }

  /// Which of the six special schemes, if any, this protocol pattern can
  /// produce. Only meaningful on the protocol component.
  pub fn matched_special_scheme(&self) -> Option<&'static str> {
    SPECIAL_SCHEMES
      .iter()
      .map(|(scheme, _)| *scheme)
      .find(|scheme| self.regex.is_match(scheme))
  }

  pub fn create_match_result(
    &self,
    input: String,
    captures: &regex::Captures,
  ) -> UrlPatternComponentResult {
    let groups = self
      .group_names
      .iter()
      .enumerate()
      .map(|(i, name)| {
        let capture = captures.get(i + 1).map(|m| m.as_str().to_string());
        (name.clone(), capture)
      })
      .collect();
    UrlPatternComponentResult { input, groups }
  }
}

/// Lower the part list into an anchored regex source plus the ordered
/// capture names.
fn build_regex_source(
  parts: &[Part],
  options: &ParseOptions,
) -> (String, Vec<String>) {
  let mut result = String::from("^");
  let mut group_names = Vec::new();
  for part in parts {
    if part.kind == PartKind::Text {
      if part.modifier == PartModifier::None {
        result.push_str(&escape_regex_string(&part.value));
      } else {
        result.push_str(&format!(
          "(?:{}){}",
          escape_regex_string(&part.value),
          part.modifier.as_str()
        ));
      }
      continue;
    }

    debug_assert!(!part.name.is_empty());
    group_names.push(part.name.clone());
    let body = match part.kind {
      PartKind::Segment => options.segment_wildcard(),
      PartKind::Asterisk => FULL_WILDCARD.to_string(),
      _ => part.value.clone(),
    };

    if part.empty_prefix_suffix() {
      if matches!(part.modifier, PartModifier::None | PartModifier::Optional)
      {
        result.push_str(&format!("({}){}", body, part.modifier.as_str()));
      } else {
        result
          .push_str(&format!("((?:{}){})", body, part.modifier.as_str()));
      }
      continue;
    }

    let prefix = escape_regex_string(&part.prefix);
    let suffix = escape_regex_string(&part.suffix);
    if matches!(part.modifier, PartModifier::None | PartModifier::Optional) {
      result.push_str(&format!(
        "(?:{}({}){}){}",
        prefix,
        body,
        suffix,
        part.modifier.as_str()
      ));
      continue;
    }
    // The inner capture binds the repeated body; the outer non-capturing
    // group absorbs the suffix/prefix runs between repetitions.
    result.push_str(&format!(
      "(?:{}((?:{})(?:{}{}(?:{}))*){}){}",
      prefix,
      body,
      suffix,
      prefix,
      body,
      suffix,
      if part.modifier == PartModifier::ZeroOrMore {
        "?"
      } else {
        ""
      }
    ));
  }
  result.push('$');
  (result, group_names)
}

/// Regenerate the canonical pattern string the component's accessor
/// returns.
fn build_pattern_string(parts: &[Part], options: &ParseOptions) -> String {
  let prefix_str =
    options.prefix.map(|c| c.to_string()).unwrap_or_default();
  let mut result = String::new();
  for (i, part) in parts.iter().enumerate() {
    let prev = if i == 0 { None } else { parts.get(i - 1) };
    let next = parts.get(i + 1);

    if part.kind == PartKind::Text {
      if part.modifier == PartModifier::None {
        result.push_str(&escape_pattern_string(&part.value));
      } else {
        result.push_str(&format!(
          "{{{}}}{}",
          escape_pattern_string(&part.value),
          part.modifier.as_str()
        ));
      }
      continue;
    }

    let mut needs_grouping = !part.suffix.is_empty()
      || (!part.prefix.is_empty() && part.prefix != prefix_str);

    // A custom-named segment followed directly by text that could extend
    // the identifier (or by an anonymous group) must be framed.
    if !needs_grouping
      && part.custom_name
      && part.kind == PartKind::Segment
      && part.modifier == PartModifier::None
    {
      if let Some(next) = next {
        if next.empty_prefix_suffix() {
          needs_grouping = if next.kind == PartKind::Text {
            is_name_codepoint(
              next.value.chars().next().unwrap_or_default(),
              false,
            )
          } else {
            !next.custom_name
          };
        }
      }
    }

    if !needs_grouping && part.prefix.is_empty() {
      if let (Some(prev), Some(prefix_char)) = (prev, options.prefix) {
        if prev.kind == PartKind::Text
          && prev.value.chars().last() == Some(prefix_char)
        {
          needs_grouping = true;
        }
      }
    }

    if needs_grouping {
      result.push('{');
    }
    result.push_str(&escape_pattern_string(&part.prefix));
    if part.custom_name {
      result.push(':');
      result.push_str(&part.name);
    }
    match part.kind {
      PartKind::Text => unreachable!(),
      PartKind::NamedPattern => {
        result.push_str(&format!("({})", part.value));
      }
      PartKind::Segment => {
        if !part.custom_name {
          result
            .push_str(&format!("({})", options.segment_wildcard()));
        }
      }
      PartKind::Asterisk => {
        let plain_wildcard = !part.custom_name
          && (prev.is_none()
            || prev.unwrap().kind == PartKind::Text
            || prev.unwrap().modifier != PartModifier::None
            || needs_grouping
            || !part.prefix.is_empty());
        if plain_wildcard {
          result.push('*');
        } else {
          result.push_str(&format!("({})", FULL_WILDCARD));
        }
      }
    }
    // `:name` followed by an identifier-looking suffix needs the suffix
    // visibly separated.
    if part.kind == PartKind::Segment
      && part.custom_name
      && !part.suffix.is_empty()
      && is_name_codepoint(part.suffix.chars().next().unwrap(), false)
    {
      result.push('\\');
    }
    result.push_str(&escape_pattern_string(&part.suffix));
    if needs_grouping {
      result.push('}');
    }
    result.push_str(part.modifier.as_str());
  }
  result
}

/// Escape the characters that are meaningful to the pattern syntax itself.
fn escape_pattern_string(input: &str) -> String {
  let mut result = String::with_capacity(input.len());
  for c in input.chars() {
    if matches!(c, '+' | '*' | '?' | ':' | '{' | '}' | '(' | ')' | '\\') {
      result.push('\\');
    }
    result.push(c);
  }
  result
}

#[cfg(test)]
mod tests {
  use super::*;

  fn compile(input: &str, options: &ParseOptions) -> Component {
    Component::compile(Some(input), |s| Ok(s.to_string()), options).unwrap()
  }

  #[test]
  fn capture_count_matches_group_names() {
    for (pattern, options) in [
      ("/:foo/:bar?", ParseOptions::pathname(false)),
      ("{*.}?example.com", ParseOptions::hostname()),
      ("/books/{:id(\\d+)}?", ParseOptions::pathname(false)),
      ("*", ParseOptions::default()),
      ("", ParseOptions::default()),
    ] {
      let component = compile(pattern, &options);
      assert_eq!(
        component.regex.captures_len() - 1,
        component.group_names.len(),
        "pattern {:?}",
        pattern
      );
    }
  }

  #[test]
  fn anchored_regexes() {
    let component = compile("/foo", &ParseOptions::pathname(false));
    assert!(component.regex.is_match("/foo"));
    assert!(!component.regex.is_match("x/foo"));
    assert!(!component.regex.is_match("/foox"));
  }

  #[test]
  fn wildcard_matches_empty() {
    let component = compile("*", &ParseOptions::default());
    assert!(component.regex.is_match(""));
    assert_eq!(component.group_names, vec!["0"]);
  }

  #[test]
  fn plus_modifier_with_prefix_repeats() {
    let component = compile("/:id+", &ParseOptions::pathname(false));
    assert!(component.regex.is_match("/a"));
    assert!(component.regex.is_match("/a/b/c"));
    assert!(!component.regex.is_match(""));
    let captures = component.regex.captures("/a/b/c").unwrap();
    assert_eq!(captures.get(1).unwrap().as_str(), "a/b/c");
  }

  #[test]
  fn special_scheme_probe() {
    let http =
      compile("http{s}?", &ParseOptions::default());
    assert_eq!(http.matched_special_scheme(), Some("http"));
    let custom = compile("custom", &ParseOptions::default());
    assert_eq!(custom.matched_special_scheme(), None);
  }

  #[test]
  fn ambiguous_special_scheme_resolves_in_table_order() {
    // `ws` precedes `https` in the scheme table, so an alternation matching
    // both resolves to `ws` (and its default port).
    let component = compile("(https|ws)", &ParseOptions::default());
    assert_eq!(component.matched_special_scheme(), Some("ws"));
  }

  #[test]
  fn canonical_pattern_strings() {
    let component = compile("/:foo/:bar?", &ParseOptions::pathname(false));
    assert_eq!(component.pattern_string, "/:foo/:bar?");
    let component = compile("{*.}?example.com", &ParseOptions::hostname());
    assert_eq!(component.pattern_string, "{*.}?example.com");
  }
}
