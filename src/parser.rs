// Copyright 2018-2021 the Deno authors. All rights reserved. MIT license.

use crate::error::Error;
use crate::tokenizer::tokenize;
use crate::tokenizer::Token;
use crate::tokenizer::TokenKind;
use crate::tokenizer::TokenizeMode;

/// The body of a group that matches anything.
pub(crate) const FULL_WILDCARD: &str = ".*";

/// Per-component knobs for parsing and compiling a sub-pattern.
#[derive(Debug, Default, Clone)]
pub(crate) struct ParseOptions {
  /// The segment separator; a bare `:name` group matches up to (not
  /// including) it.
  pub delimiter: Option<char>,
  /// The character a group may adopt as its prefix, `/` for segmented
  /// paths.
  pub prefix: Option<char>,
  /// Compile the component's regex case-insensitively. Only ever set for
  /// the pathname.
  pub ignore_case: bool,
}

impl ParseOptions {
  pub fn hostname() -> Self {
    ParseOptions {
      delimiter: Some('.'),
      prefix: None,
      ignore_case: false,
    }
  }

  pub fn pathname(ignore_case: bool) -> Self {
    ParseOptions {
      delimiter: Some('/'),
      prefix: Some('/'),
      ignore_case,
    }
  }

  pub fn opaque_pathname(ignore_case: bool) -> Self {
    ParseOptions {
      delimiter: None,
      prefix: None,
      ignore_case,
    }
  }

  /// The "not the separator" class a bare `:name` group compiles to.
  pub fn segment_wildcard(&self) -> String {
    match self.delimiter {
      Some(c) => format!("[^{}]+?", escape_regex_string(&c.to_string())),
      None => String::from(".+?"),
    }
  }
}

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub(crate) enum PartKind {
  /// A run of already-canonicalized literal text.
  Text,
  /// A named group with an explicit regular expression body.
  NamedPattern,
  /// A named group matching one segment: anything but the separator.
  Segment,
  /// A group matching anything.
  Asterisk,
}

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub(crate) enum PartModifier {
  None,
  Optional,
  ZeroOrMore,
  OneOrMore,
}

impl PartModifier {
  pub fn as_str(&self) -> &'static str {
    match self {
      PartModifier::None => "",
      PartModifier::Optional => "?",
      PartModifier::ZeroOrMore => "*",
      PartModifier::OneOrMore => "+",
    }
  }
}

/// One structural element of a parsed sub-pattern.
#[derive(Debug, Clone)]
pub(crate) struct Part {
  pub kind: PartKind,
  /// The regex body for `NamedPattern` parts, the text for `Text` parts.
  pub value: String,
  pub modifier: PartModifier,
  /// Either a caller-supplied identifier or an auto-assigned decimal index.
  pub name: String,
  pub prefix: String,
  pub suffix: String,
  /// Whether the name came from a `:name` token rather than auto-indexing.
  pub custom_name: bool,
}

impl Part {
  pub fn empty_prefix_suffix(&self) -> bool {
    self.prefix.is_empty() && self.suffix.is_empty()
  }
}

struct PatternParser<'a, F>
where
  F: Fn(&str) -> Result<String, Error>,
{
  input: &'a str,
  tokens: Vec<Token>,
  encode: F,
  segment_wildcard: String,
  parts: Vec<Part>,
  pending: String,
  cursor: usize,
  next_numeric_name: usize,
}

impl<'a, F> PatternParser<'a, F>
where
  F: Fn(&str) -> Result<String, Error>,
{
  fn try_consume(&mut self, kind: TokenKind) -> Option<Token> {
    let token = self.tokens[self.cursor];
    if token.kind != kind {
      return None;
    }
    self.cursor += 1;
    Some(token)
  }

  /// A name token may be followed by an explicit regex group; an anonymous
  /// group may also be a bare `*`.
  fn try_consume_pattern(&mut self, name: Option<Token>) -> Option<Token> {
    let token = self.try_consume(TokenKind::Pattern);
    if name.is_none() && token.is_none() {
      return self.try_consume(TokenKind::Asterisk);
    }
    token
  }

  fn try_consume_modifier(&mut self) -> Option<Token> {
    self
      .try_consume(TokenKind::OtherModifier)
      .or_else(|| self.try_consume(TokenKind::Asterisk))
  }

  fn consume_required(&mut self, kind: TokenKind) -> Result<Token, Error> {
    self
      .try_consume(kind)
      .ok_or_else(|| Error::at(self.tokens[self.cursor].start, self.input))
  }

  /// Concatenate a run of plain and escaped characters.
  fn consume_text(&mut self) -> String {
    let mut result = String::new();
    loop {
      let token = self
        .try_consume(TokenKind::Char)
        .or_else(|| self.try_consume(TokenKind::EscapedChar));
      match token {
        Some(token) => {
          let lexeme = token.lexeme(self.input);
          result.push_str(lexeme.strip_prefix('\\').unwrap_or(lexeme));
        }
        None => return result,
      }
    }
  }

  fn flush_pending(&mut self) -> Result<(), Error> {
    if self.pending.is_empty() {
      return Ok(());
    }
    let value = (self.encode)(&self.pending)?;
    self.pending.clear();
    self.parts.push(Part {
      kind: PartKind::Text,
      value,
      modifier: PartModifier::None,
      name: String::new(),
      prefix: String::new(),
      suffix: String::new(),
      custom_name: false,
    });
    Ok(())
  }

  fn add_part(
    &mut self,
    prefix: &str,
    name_token: Option<Token>,
    pattern_token: Option<Token>,
    suffix: &str,
    modifier_token: Option<Token>,
  ) -> Result<(), Error> {
    let modifier = match modifier_token {
      None => PartModifier::None,
      Some(token) => match token.lexeme(self.input) {
        "?" => PartModifier::Optional,
        "*" => PartModifier::ZeroOrMore,
        "+" => PartModifier::OneOrMore,
        _ => unreachable!(),
      },
    };
    if name_token.is_none()
      && pattern_token.is_none()
      && modifier == PartModifier::None
    {
      // `{text}` groups nothing; the text is ordinary pending literal.
      self.pending.push_str(prefix);
      return Ok(());
    }
    self.flush_pending()?;
    if name_token.is_none() && pattern_token.is_none() {
      debug_assert!(suffix.is_empty());
      if prefix.is_empty() {
        return Ok(());
      }
      let value = (self.encode)(prefix)?;
      self.parts.push(Part {
        kind: PartKind::Text,
        value,
        modifier,
        name: String::new(),
        prefix: String::new(),
        suffix: String::new(),
        custom_name: false,
      });
      return Ok(());
    }

    let body: String = match pattern_token {
      None => self.segment_wildcard.clone(),
      Some(token) if token.kind == TokenKind::Asterisk => {
        FULL_WILDCARD.to_string()
      }
      Some(token) => {
        let lexeme = token.lexeme(self.input);
        lexeme[1..lexeme.len() - 1].to_string()
      }
    };
    let (kind, value) = if body == self.segment_wildcard {
      (PartKind::Segment, String::new())
    } else if body == FULL_WILDCARD {
      (PartKind::Asterisk, String::new())
    } else {
      (PartKind::NamedPattern, body)
    };

    let custom_name = name_token.is_some();
    let name = match name_token {
      Some(token) => token.lexeme(self.input)[1..].to_string(),
      None => {
        let name = self.next_numeric_name.to_string();
        self.next_numeric_name += 1;
        name
      }
    };
    if self.parts.iter().any(|part| part.name == name) {
      return Err(Error::at(
        name_token.map(|t| t.start).unwrap_or(0),
        self.input,
      ));
    }

    let prefix = (self.encode)(prefix)?;
    let suffix = (self.encode)(suffix)?;
    self.parts.push(Part {
      kind,
      value,
      modifier,
      name,
      prefix,
      suffix,
      custom_name,
    });
    Ok(())
  }
}

/// Parse one component sub-pattern into its ordered part list. All literal
/// text (pending runs, prefixes, suffixes) is canonicalized through
/// `encode` before being stored.
pub(crate) fn parse_pattern_string<F>(
  input: &str,
  options: &ParseOptions,
  encode: F,
) -> Result<Vec<Part>, Error>
where
  F: Fn(&str) -> Result<String, Error>,
{
  let mut parser = PatternParser {
    input,
    tokens: tokenize(input, TokenizeMode::Strict)?,
    encode,
    segment_wildcard: options.segment_wildcard(),
    parts: Vec::new(),
    pending: String::new(),
    cursor: 0,
    next_numeric_name: 0,
  };
  let prefix_str =
    options.prefix.map(|c| c.to_string()).unwrap_or_default();

  while parser.cursor < parser.tokens.len() {
    let char_token = parser.try_consume(TokenKind::Char);
    let name_token = parser.try_consume(TokenKind::Name);
    let pattern_token = parser.try_consume_pattern(name_token);

    if name_token.is_some() || pattern_token.is_some() {
      // A bare group. The character before it becomes its prefix only when
      // it is the component's separator.
      let mut prefix = char_token.map(|t| t.lexeme(input)).unwrap_or("");
      if !prefix.is_empty() && prefix != prefix_str {
        parser.pending.push_str(prefix);
        prefix = "";
      }
      parser.flush_pending()?;
      let modifier_token = parser.try_consume_modifier();
      parser.add_part(prefix, name_token, pattern_token, "", modifier_token)?;
      continue;
    }

    let fixed_token =
      char_token.or_else(|| parser.try_consume(TokenKind::EscapedChar));
    if let Some(token) = fixed_token {
      let lexeme = token.lexeme(input);
      parser
        .pending
        .push_str(lexeme.strip_prefix('\\').unwrap_or(lexeme));
      continue;
    }

    if parser.try_consume(TokenKind::Open).is_some() {
      let prefix = parser.consume_text();
      let name_token = parser.try_consume(TokenKind::Name);
      let pattern_token = parser.try_consume_pattern(name_token);
      let suffix = parser.consume_text();
      parser.consume_required(TokenKind::Close)?;
      let modifier_token = parser.try_consume_modifier();
      parser.add_part(
        &prefix,
        name_token,
        pattern_token,
        &suffix,
        modifier_token,
      )?;
      continue;
    }

    parser.flush_pending()?;
    parser.consume_required(TokenKind::End)?;
    break;
  }

  Ok(parser.parts)
}

/// Escape the characters that are meaningful to the regex engine.
pub(crate) fn escape_regex_string(input: &str) -> String {
  let mut result = String::with_capacity(input.len());
  for c in input.chars() {
    if matches!(
      c,
      '.'
        | '+'
        | '*'
        | '?'
        | '^'
        | '$'
        | '{'
        | '}'
        | '('
        | ')'
        | '['
        | ']'
        | '|'
        | '/'
        | '\\'
    ) {
      result.push('\\');
    }
    result.push(c);
  }
  result
}
