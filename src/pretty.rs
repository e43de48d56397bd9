use std::io;

use serde_json::ser::{Formatter, PrettyFormatter};
use serde_json::value::RawValue;

/// Re-indents `body` with two spaces if it looks like a JSON object or array.
///
/// Only whitespace between tokens changes: keys (duplicates included),
/// strings and numbers are copied byte for byte.
///
/// Returns `None` for empty bodies, bodies that don't start with `{` or `[`
/// (ignoring surrounding whitespace), and anything the parser rejects.
pub fn pretty_json(body: &[u8]) -> Option<String> {
    let trimmed = body.trim_ascii();
    match trimmed.first() {
        Some(b'{') | Some(b'[') => {}
        _ => return None,
    }
    // Validates without converting numbers or merging keys
    serde_json::from_slice::<&RawValue>(trimmed).ok()?;

    let mut indenter = Indenter {
        input: trimmed,
        pos: 0,
        out: Vec::with_capacity(trimmed.len() * 2),
        formatter: PrettyFormatter::with_indent(b"  "),
    };
    indenter.value().ok()?;
    String::from_utf8(indenter.out).ok()
}

/// Walks validated JSON and lays it out through serde_json's pretty formatter.
struct Indenter<'a> {
    input: &'a [u8],
    pos: usize,
    out: Vec<u8>,
    formatter: PrettyFormatter<'static>,
}

impl Indenter<'_> {
    fn value(&mut self) -> io::Result<()> {
        self.skip_whitespace();
        match self.peek() {
            Some(b'{') => self.object(),
            Some(b'[') => self.array(),
            Some(b'"') => self.string(),
            Some(_) => self.scalar(),
            None => Err(malformed()),
        }
    }

    fn object(&mut self) -> io::Result<()> {
        self.pos += 1;
        self.formatter.begin_object(&mut self.out)?;
        self.skip_whitespace();
        if self.peek() == Some(b'}') {
            self.pos += 1;
            return self.formatter.end_object(&mut self.out);
        }
        let mut first = true;
        loop {
            self.formatter.begin_object_key(&mut self.out, first)?;
            self.skip_whitespace();
            self.string()?;
            self.formatter.end_object_key(&mut self.out)?;
            self.skip_whitespace();
            self.expect(b':')?;
            self.formatter.begin_object_value(&mut self.out)?;
            self.value()?;
            self.formatter.end_object_value(&mut self.out)?;
            self.skip_whitespace();
            match self.next() {
                Some(b',') => first = false,
                Some(b'}') => break,
                _ => return Err(malformed()),
            }
        }
        self.formatter.end_object(&mut self.out)
    }

    fn array(&mut self) -> io::Result<()> {
        self.pos += 1;
        self.formatter.begin_array(&mut self.out)?;
        self.skip_whitespace();
        if self.peek() == Some(b']') {
            self.pos += 1;
            return self.formatter.end_array(&mut self.out);
        }
        let mut first = true;
        loop {
            self.formatter.begin_array_value(&mut self.out, first)?;
            self.value()?;
            self.formatter.end_array_value(&mut self.out)?;
            self.skip_whitespace();
            match self.next() {
                Some(b',') => first = false,
                Some(b']') => break,
                _ => return Err(malformed()),
            }
        }
        self.formatter.end_array(&mut self.out)
    }

    fn string(&mut self) -> io::Result<()> {
        let start = self.pos;
        self.expect(b'"')?;
        loop {
            match self.next() {
                Some(b'\\') => self.pos += 1,
                Some(b'"') => break,
                Some(_) => {}
                None => return Err(malformed()),
            }
        }
        let end = self.pos.min(self.input.len());
        self.out.extend_from_slice(&self.input[start..end]);
        Ok(())
    }

    /// Numbers, `true`, `false` and `null`, copied as written.
    fn scalar(&mut self) -> io::Result<()> {
        let start = self.pos;
        while let Some(byte) = self.peek() {
            if matches!(byte, b',' | b']' | b'}') || byte.is_ascii_whitespace() {
                break;
            }
            self.pos += 1;
        }
        if start == self.pos {
            return Err(malformed());
        }
        self.out.extend_from_slice(&self.input[start..self.pos]);
        Ok(())
    }

    fn skip_whitespace(&mut self) {
        while self.peek().is_some_and(|b| b.is_ascii_whitespace()) {
            self.pos += 1;
        }
    }

    fn expect(&mut self, byte: u8) -> io::Result<()> {
        if self.next() == Some(byte) {
            Ok(())
        } else {
            Err(malformed())
        }
    }

    fn peek(&self) -> Option<u8> {
        self.input.get(self.pos).copied()
    }

    fn next(&mut self) -> Option<u8> {
        let byte = self.peek()?;
        self.pos += 1;
        Some(byte)
    }
}

fn malformed() -> io::Error {
    io::Error::new(io::ErrorKind::InvalidData, "unexpected JSON token")
}
