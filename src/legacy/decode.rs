use serde_json::{Map, Number, Value};

use super::decode_error;
use crate::error::SqlComposeError;

const MAX_DEPTH: usize = 512;

/// Decode one legacy-serialized value. Surrounding whitespace is ignored,
/// anything else after the value is an error.
///
/// # Errors
/// Returns `SqlComposeError::LegacyFormat` with the failing byte offset.
pub fn decode(text: &str) -> Result<Value, SqlComposeError> {
    let mut parser = Parser {
        input: text.trim().as_bytes(),
        pos: 0,
        depth: 0,
    };
    let value = parser.value()?;
    if parser.pos != parser.input.len() {
        return Err(decode_error(parser.pos, "trailing data"));
    }
    Ok(value)
}

struct Parser<'a> {
    input: &'a [u8],
    pos: usize,
    depth: usize,
}

impl<'a> Parser<'a> {
    fn value(&mut self) -> Result<Value, SqlComposeError> {
        let tag = self.next_byte()?;
        if tag == b'N' {
            self.expect(b';')?;
            return Ok(Value::Null);
        }
        self.expect(b':')?;
        match tag {
            b'b' => {
                let raw = self.until(b';')?;
                match raw {
                    "0" => Ok(Value::Bool(false)),
                    "1" => Ok(Value::Bool(true)),
                    _ => Err(decode_error(self.pos, format!("bad boolean `{raw}`"))),
                }
            }
            b'i' => {
                let raw = self.until(b';')?;
                raw.parse::<i64>()
                    .map(Value::from)
                    .map_err(|e| decode_error(self.pos, format!("bad integer `{raw}`: {e}")))
            }
            b'd' => {
                let raw = self.until(b';')?;
                let parsed = raw
                    .parse::<f64>()
                    .map_err(|e| decode_error(self.pos, format!("bad float `{raw}`: {e}")))?;
                Number::from_f64(parsed)
                    .map(Value::Number)
                    .ok_or_else(|| decode_error(self.pos, "non-finite float"))
            }
            b's' => {
                let text = self.sized_string()?;
                self.expect(b';')?;
                Ok(Value::String(text))
            }
            b'a' => {
                let count = self.length(b':')?;
                self.entries(count)
            }
            b'O' => {
                // class name is not kept, only the properties
                let _class = self.sized_string()?;
                self.expect(b':')?;
                let count = self.length(b':')?;
                match self.entries(count)? {
                    Value::Array(items) => Ok(Value::Object(
                        items
                            .into_iter()
                            .enumerate()
                            .map(|(i, v)| (i.to_string(), v))
                            .collect(),
                    )),
                    other => Ok(other),
                }
            }
            other => Err(decode_error(
                self.pos - 2,
                format!("unknown tag `{}`", other as char),
            )),
        }
    }

    fn entries(&mut self, count: usize) -> Result<Value, SqlComposeError> {
        if self.depth >= MAX_DEPTH {
            return Err(decode_error(self.pos, "nesting too deep"));
        }
        self.depth += 1;
        let value = self.entry_list(count);
        self.depth -= 1;
        value
    }

    fn entry_list(&mut self, count: usize) -> Result<Value, SqlComposeError> {
        self.expect(b'{')?;
        let mut map = Map::new();
        let mut sequential = true;
        for index in 0..count {
            let key = match self.value()? {
                Value::Number(n) if n.is_i64() => {
                    let key = n.to_string();
                    sequential &= key == index.to_string();
                    key
                }
                Value::String(s) => {
                    sequential = false;
                    strip_visibility(&s).to_string()
                }
                _ => return Err(decode_error(self.pos, "array key must be int or string")),
            };
            let item = self.value()?;
            map.insert(key, item);
        }
        self.expect(b'}')?;

        if sequential && map.len() == count {
            Ok(Value::Array(map.into_iter().map(|(_, v)| v).collect()))
        } else {
            Ok(Value::Object(map))
        }
    }

    fn sized_string(&mut self) -> Result<String, SqlComposeError> {
        let len = self.length(b':')?;
        self.expect(b'"')?;
        let end = self
            .pos
            .checked_add(len)
            .ok_or_else(|| decode_error(self.pos, "string length overflow"))?;
        let slice = self
            .input
            .get(self.pos..end)
            .ok_or_else(|| decode_error(self.pos, "string length past end of input"))?;
        let text = std::str::from_utf8(slice)
            .map_err(|e| decode_error(self.pos, format!("invalid utf-8: {e}")))?
            .to_string();
        self.pos = end;
        self.expect(b'"')?;
        Ok(text)
    }

    fn length(&mut self, terminator: u8) -> Result<usize, SqlComposeError> {
        let raw = self.until(terminator)?;
        raw.parse::<usize>()
            .map_err(|e| decode_error(self.pos, format!("bad length `{raw}`: {e}")))
    }

    /// Consume bytes up to `terminator` (consumed, not returned).
    fn until(&mut self, terminator: u8) -> Result<&'a str, SqlComposeError> {
        let input = self.input;
        let start = self.pos;
        let rel = input[start..]
            .iter()
            .position(|b| *b == terminator)
            .ok_or_else(|| {
                decode_error(start, format!("missing `{}`", terminator as char))
            })?;
        self.pos = start + rel + 1;
        std::str::from_utf8(&input[start..start + rel])
            .map_err(|e| decode_error(start, format!("invalid utf-8: {e}")))
    }

    fn next_byte(&mut self) -> Result<u8, SqlComposeError> {
        let b = *self
            .input
            .get(self.pos)
            .ok_or_else(|| decode_error(self.pos, "unexpected end of input"))?;
        self.pos += 1;
        Ok(b)
    }

    fn expect(&mut self, wanted: u8) -> Result<(), SqlComposeError> {
        let at = self.pos;
        let got = self.next_byte()?;
        if got == wanted {
            Ok(())
        } else {
            Err(decode_error(
                at,
                format!("expected `{}`, found `{}`", wanted as char, got as char),
            ))
        }
    }
}

/// Protected (`\0*\0name`) and private (`\0Class\0name`) property names.
fn strip_visibility(name: &str) -> &str {
    if let Some(rest) = name.strip_prefix('\0') {
        rest.find('\0').map_or(name, |end| &rest[end + 1..])
    } else {
        name
    }
}
