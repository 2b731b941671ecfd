//! Lenient parser for Python-style literals.
//!
//! Feedback exports produced by scripts often contain `repr()` output instead
//! of JSON: single-quoted strings, `True`/`False`/`None`, tuples and trailing
//! commas. This parser accepts that dialect (and plain JSON) and produces a
//! [`serde_json::Value`] so the JSON dispatch can handle both the same way.

use std::iter::Peekable;
use std::str::Chars;

use anyhow::{Context, anyhow, bail};
use serde_json::{Map, Number, Value};

/// Deepest container nesting accepted, matching `serde_json`'s recursion limit.
const MAX_DEPTH: usize = 128;

/// Parse `input` as a single literal. Trailing non-whitespace is an error.
pub fn parse_literal(input: &str) -> anyhow::Result<Value> {
    let mut parser = LiteralParser {
        chars: input.chars().peekable(),
        depth: 0,
    };
    let value = parser.parse_value()?;
    parser.skip_whitespace();
    if let Some(c) = parser.chars.peek() {
        bail!("unexpected trailing character '{c}'");
    }
    Ok(value)
}

struct LiteralParser<'a> {
    chars: Peekable<Chars<'a>>,
    depth: usize,
}

impl LiteralParser<'_> {
    fn skip_whitespace(&mut self) {
        while self.chars.next_if(|c| c.is_whitespace()).is_some() {}
    }

    fn expect(&mut self, expected: char) -> anyhow::Result<()> {
        self.skip_whitespace();
        match self.chars.next() {
            Some(c) if c == expected => Ok(()),
            Some(c) => bail!("expected '{expected}', found '{c}'"),
            None => bail!("expected '{expected}', found end of input"),
        }
    }

    fn parse_value(&mut self) -> anyhow::Result<Value> {
        self.skip_whitespace();
        match self.chars.peek().copied() {
            Some(open @ ('[' | '(' | '{')) => {
                self.chars.next();
                self.depth += 1;
                if self.depth > MAX_DEPTH {
                    bail!("nesting deeper than {MAX_DEPTH} levels");
                }
                let value = match open {
                    '[' => self.parse_sequence(']'),
                    '(' => self.parse_sequence(')'),
                    _ => self.parse_mapping(),
                };
                self.depth -= 1;
                value
            }
            Some(quote @ ('\'' | '"')) => {
                self.chars.next();
                self.parse_string(quote).map(Value::String)
            }
            Some(c) if c == '-' || c == '+' || c.is_ascii_digit() || c == '.' => self.parse_number(),
            Some(c) if c.is_alphabetic() => self.parse_keyword(),
            Some(c) => bail!("unexpected character '{c}'"),
            None => bail!("unexpected end of input"),
        }
    }

    /// Items up to `close`, allowing a trailing comma.
    fn parse_sequence(&mut self, close: char) -> anyhow::Result<Value> {
        let mut items = Vec::new();
        loop {
            self.skip_whitespace();
            if self.chars.next_if_eq(&close).is_some() {
                return Ok(Value::Array(items));
            }
            items.push(self.parse_value()?);
            self.skip_whitespace();
            match self.chars.next() {
                Some(',') => continue,
                Some(c) if c == close => return Ok(Value::Array(items)),
                Some(c) => bail!("expected ',' or '{close}', found '{c}'"),
                None => bail!("unterminated sequence"),
            }
        }
    }

    fn parse_mapping(&mut self) -> anyhow::Result<Value> {
        let mut map = Map::new();
        loop {
            self.skip_whitespace();
            if self.chars.next_if_eq(&'}').is_some() {
                return Ok(Value::Object(map));
            }
            let key = match self.parse_value()? {
                Value::String(s) => s,
                Value::Null => "None".to_string(),
                Value::Bool(b) => String::from(if b { "True" } else { "False" }),
                Value::Number(n) => n.to_string(),
                other => bail!("unsupported mapping key {other}"),
            };
            self.expect(':')?;
            let value = self.parse_value()?;
            map.insert(key, value);

            self.skip_whitespace();
            match self.chars.next() {
                Some(',') => continue,
                Some('}') => return Ok(Value::Object(map)),
                Some(c) => bail!("expected ',' or '}}', found '{c}'"),
                None => bail!("unterminated mapping"),
            }
        }
    }

    fn parse_string(&mut self, quote: char) -> anyhow::Result<String> {
        let mut out = String::new();
        while let Some(c) = self.chars.next() {
            match c {
                '\\' => {
                    let escaped = self.chars.next().context("unterminated escape")?;
                    match escaped {
                        'n' => out.push('\n'),
                        't' => out.push('\t'),
                        'r' => out.push('\r'),
                        '0' => out.push('\0'),
                        'x' => out.push(self.parse_code_point(2)?),
                        'u' => out.push(self.parse_code_point(4)?),
                        'U' => out.push(self.parse_code_point(8)?),
                        '\n' => {}
                        other => out.push(other),
                    }
                }
                c if c == quote => return Ok(out),
                c => out.push(c),
            }
        }
        bail!("unterminated string")
    }

    fn parse_code_point(&mut self, digits: usize) -> anyhow::Result<char> {
        let hex: String = (0..digits).filter_map(|_| self.chars.next()).collect();
        if hex.len() != digits {
            bail!("truncated escape sequence");
        }
        let code = u32::from_str_radix(&hex, 16).with_context(|| format!("bad escape '{hex}'"))?;
        char::from_u32(code).ok_or_else(|| anyhow!("invalid code point {code:#x}"))
    }

    fn parse_number(&mut self) -> anyhow::Result<Value> {
        let mut text = String::new();
        while let Some(c) = self
            .chars
            .next_if(|c| c.is_ascii_digit() || matches!(*c, '-' | '+' | '.' | 'e' | 'E' | '_'))
        {
            if c != '_' {
                text.push(c);
            }
        }
        let text = text.strip_prefix('+').unwrap_or(&text);

        if let Ok(int) = text.parse::<i64>() {
            return Ok(Value::Number(int.into()));
        }
        let float: f64 = text
            .parse()
            .with_context(|| format!("invalid number '{text}'"))?;
        Number::from_f64(float)
            .map(Value::Number)
            .ok_or_else(|| anyhow!("non-finite number '{text}'"))
    }

    fn parse_keyword(&mut self) -> anyhow::Result<Value> {
        let mut word = String::new();
        while let Some(c) = self.chars.next_if(|c| c.is_alphanumeric() || *c == '_') {
            word.push(c);
        }
        match word.as_str() {
            "True" | "true" => Ok(Value::Bool(true)),
            "False" | "false" => Ok(Value::Bool(false)),
            "None" | "null" => Ok(Value::Null),
            other => bail!("unknown identifier '{other}'"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_single_quoted_records() {
        let value = parse_literal("[{'feedback': 'Great tour', 'rating': 5}]").unwrap();
        assert_eq!(value, json!([{"feedback": "Great tour", "rating": 5}]));
    }

    #[test]
    fn test_python_keywords_and_tuples() {
        let value = parse_literal("{'ok': True, 'note': None, 'pair': (1, 2.5)}").unwrap();
        assert_eq!(value, json!({"ok": true, "note": null, "pair": [1, 2.5]}));
    }

    #[test]
    fn test_trailing_commas() {
        assert_eq!(parse_literal("['a', 'b',]").unwrap(), json!(["a", "b"]));
        assert_eq!(parse_literal("{'a': 1,}").unwrap(), json!({"a": 1}));
    }

    #[test]
    fn test_escapes() {
        let value = parse_literal(r"'it\'s é\n'").unwrap();
        assert_eq!(value, json!("it's é\n"));
    }

    #[test]
    fn test_numeric_keys_are_stringified() {
        assert_eq!(parse_literal("{1: 'x'}").unwrap(), json!({"1": "x"}));
    }

    #[test]
    fn test_key_order_preserved() {
        let value = parse_literal("{'zeta': 1, 'alpha': 2}").unwrap();
        let keys: Vec<&String> = value.as_object().unwrap().keys().collect();
        assert_eq!(keys, vec!["zeta", "alpha"]);
    }

    #[test]
    fn test_nesting_limit() {
        let ok = format!("{}1{}", "[".repeat(MAX_DEPTH), "]".repeat(MAX_DEPTH));
        assert!(parse_literal(&ok).is_ok());

        let too_deep = format!("{}1{}", "[".repeat(MAX_DEPTH + 1), "]".repeat(MAX_DEPTH + 1));
        assert!(parse_literal(&too_deep).is_err());
    }

    #[test]
    fn test_unbounded_nesting_is_an_error() {
        assert!(parse_literal(&"[".repeat(100_000)).is_err());
        assert!(parse_literal(&"({".repeat(50_000)).is_err());
    }

    #[test]
    fn test_rejects_garbage() {
        assert!(parse_literal("not a literal").is_err());
        assert!(parse_literal("['a', 'b'").is_err());
        assert!(parse_literal("[1] extra").is_err());
        assert!(parse_literal("").is_err());
    }
}
