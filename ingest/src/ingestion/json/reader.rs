//! Pull-style JSON reader over a borrowed byte buffer.
//!
//! The caller drives parsing (`begin_object` / `next_key`, `begin_array` /
//! `next_element`, scalar reads). Strings without escape sequences are
//! returned as slices of the input; nothing is buffered beyond one value.

use std::borrow::Cow;

use crate::ingestion::error::DecodeError;

type Result<T> = std::result::Result<T, DecodeError>;

/// Default nesting limit for objects and arrays.
pub const DEFAULT_MAX_DEPTH: usize = 128;

/// Tokenizer options.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReaderOptions {
    /// Accept `[1, 2,]` and `{"a": 1,}`.
    pub allow_trailing_commas: bool,
    pub max_depth: usize,
}

impl Default for ReaderOptions {
    fn default() -> Self {
        Self {
            allow_trailing_commas: false,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

impl ReaderOptions {
    /// Options used for OTLP ingestion: trailing commas tolerated.
    pub fn lenient() -> Self {
        Self {
            allow_trailing_commas: true,
            ..Self::default()
        }
    }
}

/// Kind of the next value in the input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    Object,
    Array,
    String,
    Number,
    Bool,
    Null,
}

pub struct JsonReader<'a> {
    buf: &'a [u8],
    pos: usize,
    options: ReaderOptions,
    /// One entry per open container, true until its first member is read.
    first: Vec<bool>,
}

impl<'a> JsonReader<'a> {
    pub fn new(buf: &'a [u8], options: ReaderOptions) -> Self {
        let buf = buf.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(buf);
        Self {
            buf,
            pos: 0,
            options,
            first: Vec::with_capacity(16),
        }
    }

    /// Byte offset of the reader, used in error reports.
    pub fn offset(&self) -> usize {
        self.pos
    }

    pub fn error(&self, reason: impl Into<String>) -> DecodeError {
        DecodeError::Json {
            offset: self.pos,
            reason: reason.into(),
        }
    }

    // ========================================================================
    // CONTAINERS
    // ========================================================================

    pub fn begin_object(&mut self) -> Result<()> {
        self.enter(b'{')
    }

    /// Next property name of the current object, or `None` once the closing
    /// brace has been consumed. The reader is left on the property value.
    pub fn next_key(&mut self) -> Result<Option<Cow<'a, str>>> {
        if !self.advance_member(b'}')? {
            return Ok(None);
        }
        if self.peek_byte() != Some(b'"') {
            return Err(self.error("expected property name"));
        }
        let key = self.read_string()?;
        self.expect_byte(b':')?;
        Ok(Some(key))
    }

    pub fn begin_array(&mut self) -> Result<()> {
        self.enter(b'[')
    }

    /// Whether another element follows in the current array. Returns false
    /// once the closing bracket has been consumed.
    pub fn next_element(&mut self) -> Result<bool> {
        self.advance_member(b']')
    }

    fn enter(&mut self, open: u8) -> Result<()> {
        self.expect_byte(open)?;
        if self.first.len() >= self.options.max_depth {
            return Err(self.error("maximum nesting depth exceeded"));
        }
        self.first.push(true);
        Ok(())
    }

    fn advance_member(&mut self, close: u8) -> Result<bool> {
        let is_first = self
            .first
            .last()
            .copied()
            .ok_or_else(|| self.error("not inside a container"))?;

        let next = self.peek_byte();
        if next == Some(close) {
            self.pos += 1;
            self.first.pop();
            return Ok(false);
        }

        if !is_first {
            if next != Some(b',') {
                return Err(self.error(format!("expected ',' or '{}'", close as char)));
            }
            self.pos += 1;
            if self.peek_byte() == Some(close) {
                if !self.options.allow_trailing_commas {
                    return Err(self.error("trailing comma"));
                }
                self.pos += 1;
                self.first.pop();
                return Ok(false);
            }
        }

        if let Some(first) = self.first.last_mut() {
            *first = false;
        }
        Ok(true)
    }

    // ========================================================================
    // SCALARS
    // ========================================================================

    pub fn peek_kind(&mut self) -> Result<ValueKind> {
        match self.peek_byte() {
            Some(b'{') => Ok(ValueKind::Object),
            Some(b'[') => Ok(ValueKind::Array),
            Some(b'"') => Ok(ValueKind::String),
            Some(b'-' | b'0'..=b'9') => Ok(ValueKind::Number),
            Some(b't' | b'f') => Ok(ValueKind::Bool),
            Some(b'n') => Ok(ValueKind::Null),
            Some(b) => Err(self.error(format!("unexpected character '{}'", b as char))),
            None => Err(self.error("unexpected end of input")),
        }
    }

    pub fn read_string(&mut self) -> Result<Cow<'a, str>> {
        self.expect_byte(b'"')?;
        let buf = self.buf;
        let start = self.pos;

        loop {
            match buf.get(self.pos) {
                None => return Err(self.error("unterminated string")),
                Some(b'"') => {
                    let bytes = &buf[start..self.pos];
                    self.pos += 1;
                    return std::str::from_utf8(bytes)
                        .map(Cow::Borrowed)
                        .map_err(|_| self.error("invalid UTF-8 in string"));
                }
                Some(b'\\') => break,
                Some(&b) if b < 0x20 => return Err(self.error("control character in string")),
                Some(_) => self.pos += 1,
            }
        }

        let mut out = buf[start..self.pos].to_vec();
        loop {
            match buf.get(self.pos) {
                None => return Err(self.error("unterminated string")),
                Some(b'"') => {
                    self.pos += 1;
                    break;
                }
                Some(b'\\') => {
                    self.pos += 1;
                    self.read_escape(&mut out)?;
                }
                Some(&b) if b < 0x20 => return Err(self.error("control character in string")),
                Some(&b) => {
                    out.push(b);
                    self.pos += 1;
                }
            }
        }
        String::from_utf8(out)
            .map(Cow::Owned)
            .map_err(|_| self.error("invalid UTF-8 in string"))
    }

    fn read_escape(&mut self, out: &mut Vec<u8>) -> Result<()> {
        let Some(&c) = self.buf.get(self.pos) else {
            return Err(self.error("unterminated escape"));
        };
        self.pos += 1;
        let byte = match c {
            b'"' => b'"',
            b'\\' => b'\\',
            b'/' => b'/',
            b'b' => 0x08,
            b'f' => 0x0c,
            b'n' => b'\n',
            b'r' => b'\r',
            b't' => b'\t',
            b'u' => {
                let ch = self.read_unicode_escape()?;
                let mut tmp = [0u8; 4];
                out.extend_from_slice(ch.encode_utf8(&mut tmp).as_bytes());
                return Ok(());
            }
            other => return Err(self.error(format!("invalid escape '\\{}'", other as char))),
        };
        out.push(byte);
        Ok(())
    }

    fn read_unicode_escape(&mut self) -> Result<char> {
        let high = self.read_hex4()?;
        let code = match high {
            0xD800..=0xDBFF => {
                if !self.buf[self.pos..].starts_with(b"\\u") {
                    return Err(self.error("unpaired surrogate in unicode escape"));
                }
                self.pos += 2;
                let low = self.read_hex4()?;
                if !(0xDC00..=0xDFFF).contains(&low) {
                    return Err(self.error("invalid low surrogate in unicode escape"));
                }
                0x10000 + ((u32::from(high) - 0xD800) << 10) + (u32::from(low) - 0xDC00)
            }
            0xDC00..=0xDFFF => return Err(self.error("unpaired surrogate in unicode escape")),
            other => u32::from(other),
        };
        char::from_u32(code).ok_or_else(|| self.error("invalid unicode escape"))
    }

    fn read_hex4(&mut self) -> Result<u16> {
        let buf = self.buf;
        let digits = buf
            .get(self.pos..self.pos + 4)
            .ok_or_else(|| self.error("truncated unicode escape"))?;
        let mut value: u16 = 0;
        for &d in digits {
            let nibble = (d as char)
                .to_digit(16)
                .ok_or_else(|| self.error("invalid hex digit in unicode escape"))?;
            value = (value << 4) | nibble as u16;
        }
        self.pos += 4;
        Ok(value)
    }

    /// Raw text of a JSON number, validated against the JSON grammar.
    pub fn read_number(&mut self) -> Result<&'a str> {
        self.skip_whitespace();
        let buf = self.buf;
        let start = self.pos;
        let mut p = start;

        if buf.get(p) == Some(&b'-') {
            p += 1;
        }
        match buf.get(p) {
            Some(b'0') => p += 1,
            Some(b'1'..=b'9') => p = skip_digits(buf, p),
            _ => {
                self.pos = p;
                return Err(self.error("invalid number"));
            }
        }
        if buf.get(p) == Some(&b'.') {
            p += 1;
            if !matches!(buf.get(p), Some(b'0'..=b'9')) {
                self.pos = p;
                return Err(self.error("expected digit after decimal point"));
            }
            p = skip_digits(buf, p);
        }
        if matches!(buf.get(p), Some(b'e' | b'E')) {
            p += 1;
            if matches!(buf.get(p), Some(b'+' | b'-')) {
                p += 1;
            }
            if !matches!(buf.get(p), Some(b'0'..=b'9')) {
                self.pos = p;
                return Err(self.error("expected digit in exponent"));
            }
            p = skip_digits(buf, p);
        }

        self.pos = p;
        std::str::from_utf8(&buf[start..p]).map_err(|_| self.error("invalid number"))
    }

    pub fn read_bool(&mut self) -> Result<bool> {
        self.skip_whitespace();
        let rest = &self.buf[self.pos..];
        if rest.starts_with(b"true") {
            self.pos += 4;
            Ok(true)
        } else if rest.starts_with(b"false") {
            self.pos += 5;
            Ok(false)
        } else {
            Err(self.error("expected boolean"))
        }
    }

    pub fn read_null(&mut self) -> Result<()> {
        self.skip_whitespace();
        if self.buf[self.pos..].starts_with(b"null") {
            self.pos += 4;
            Ok(())
        } else {
            Err(self.error("expected null"))
        }
    }

    /// Consume the next value, whatever it is.
    pub fn skip_value(&mut self) -> Result<()> {
        match self.peek_kind()? {
            ValueKind::Object => {
                self.begin_object()?;
                while self.next_key()?.is_some() {
                    self.skip_value()?;
                }
            }
            ValueKind::Array => {
                self.begin_array()?;
                while self.next_element()? {
                    self.skip_value()?;
                }
            }
            ValueKind::String => {
                self.read_string()?;
            }
            ValueKind::Number => {
                self.read_number()?;
            }
            ValueKind::Bool => {
                self.read_bool()?;
            }
            ValueKind::Null => self.read_null()?,
        }
        Ok(())
    }

    // ========================================================================
    // LENIENT SCALARS (protobuf JSON mapping)
    // ========================================================================

    /// Unsigned 64-bit integer from a number or a numeric string. `null`
    /// reads as 0.
    pub fn read_u64_lenient(&mut self) -> Result<u64> {
        let parsed = match self.peek_kind()? {
            ValueKind::Number => parse_u64(self.read_number()?),
            ValueKind::String => parse_u64(self.read_string()?.trim()),
            ValueKind::Null => {
                self.read_null()?;
                Some(0)
            }
            _ => None,
        };
        parsed.ok_or_else(|| self.error("expected unsigned integer"))
    }

    /// Signed 64-bit integer from a number or a numeric string.
    pub fn read_i64_lenient(&mut self) -> Result<i64> {
        let parsed = match self.peek_kind()? {
            ValueKind::Number => parse_i64(self.read_number()?),
            ValueKind::String => parse_i64(self.read_string()?.trim()),
            _ => None,
        };
        parsed.ok_or_else(|| self.error("expected integer"))
    }

    /// Double from a number or a string (`"NaN"`, `"Infinity"`, `"1.5"`).
    pub fn read_f64_lenient(&mut self) -> Result<f64> {
        let parsed = match self.peek_kind()? {
            ValueKind::Number => self.read_number()?.parse().ok(),
            ValueKind::String => self.read_string()?.trim().parse().ok(),
            _ => None,
        };
        parsed.ok_or_else(|| self.error("expected number"))
    }

    /// Require that only whitespace remains.
    pub fn finish(mut self) -> Result<()> {
        if !self.first.is_empty() {
            return Err(self.error("unclosed object or array"));
        }
        self.skip_whitespace();
        if self.pos < self.buf.len() {
            return Err(self.error("trailing characters after JSON value"));
        }
        Ok(())
    }

    // ========================================================================
    // LOW LEVEL
    // ========================================================================

    #[inline]
    fn skip_whitespace(&mut self) {
        while let Some(b' ' | b'\t' | b'\n' | b'\r') = self.buf.get(self.pos) {
            self.pos += 1;
        }
    }

    #[inline]
    fn peek_byte(&mut self) -> Option<u8> {
        self.skip_whitespace();
        self.buf.get(self.pos).copied()
    }

    fn expect_byte(&mut self, expected: u8) -> Result<()> {
        match self.peek_byte() {
            Some(b) if b == expected => {
                self.pos += 1;
                Ok(())
            }
            Some(b) => Err(self.error(format!(
                "expected '{}', found '{}'",
                expected as char, b as char
            ))),
            None => Err(self.error(format!(
                "expected '{}', found end of input",
                expected as char
            ))),
        }
    }
}

#[inline]
fn skip_digits(buf: &[u8], mut p: usize) -> usize {
    while matches!(buf.get(p), Some(b'0'..=b'9')) {
        p += 1;
    }
    p
}

fn parse_u64(text: &str) -> Option<u64> {
    text.parse().ok().or_else(|| {
        text.parse::<f64>()
            .ok()
            .filter(|f| f.fract() == 0.0 && *f >= 0.0 && *f < u64::MAX as f64)
            .map(|f| f as u64)
    })
}

pub(super) fn parse_i64(text: &str) -> Option<i64> {
    text.parse().ok().or_else(|| {
        text.parse::<f64>()
            .ok()
            .filter(|f| f.fract() == 0.0 && f.abs() < i64::MAX as f64)
            .map(|f| f as i64)
    })
}
