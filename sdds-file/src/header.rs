use std::fmt::Write as _;

use sdds_dataset::{ArrayDef, ColumnDef, ParameterDef, Schema, Value};
use sdds_dtype::SddsType;
use sdds_error::{sdds_bail, sdds_err, SddsExpect, SddsResult};

use crate::config::{ByteOrder, RowLayout};
use crate::SDDS_MAGIC;

/// Everything the textual header fixes for the rest of the file.
#[derive(Debug, Clone, PartialEq)]
pub struct HeaderInfo {
    pub schema: Schema,
    pub byte_order: ByteOrder,
    pub row_layout: RowLayout,
    pub description: Option<String>,
    /// Bytes the header occupies, including the trailing newline of the
    /// `&data` namelist. The first binary page starts here.
    pub header_len: u64,
}

fn quote(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('"');
    for c in value.chars() {
        if c == '"' {
            out.push('\\');
        }
        out.push(c);
    }
    out.push('"');
    out
}

/// Render the textual header: the magic line, one namelist per definition
/// in schema order, and the closing `&data` namelist.
pub fn write_header(
    schema: &Schema,
    byte_order: ByteOrder,
    row_layout: RowLayout,
    description: Option<&str>,
) -> String {
    let mut out = String::new();
    out.push_str(SDDS_MAGIC);
    out.push('\n');
    if let Some(text) = description {
        let _ = writeln!(out, "&description text={}, &end", quote(text));
    }
    for p in schema.parameters() {
        let _ = write!(out, "&parameter name={}, type={}", p.name, p.dtype.name());
        if let Some(units) = &p.units {
            let _ = write!(out, ", units={}", quote(units));
        }
        if let Some(fixed) = &p.fixed_value {
            let _ = write!(out, ", fixed_value={}", quote(&fixed.to_string()));
        }
        out.push_str(", &end\n");
    }
    for a in schema.arrays() {
        let _ = write!(
            out,
            "&array name={}, type={}, dimensions={}",
            a.name,
            a.dtype.name(),
            a.dimensions
        );
        if let Some(units) = &a.units {
            let _ = write!(out, ", units={}", quote(units));
        }
        out.push_str(", &end\n");
    }
    for c in schema.columns() {
        let _ = write!(out, "&column name={}, type={}", c.name, c.dtype.name());
        if let Some(units) = &c.units {
            let _ = write!(out, ", units={}", quote(units));
        }
        if let Some(len) = c.field_length {
            let _ = write!(out, ", field_length={len}");
        }
        out.push_str(", &end\n");
    }
    let _ = write!(out, "&data mode=binary, endian={}", byte_order.name());
    if row_layout == RowLayout::ColumnMajor {
        out.push_str(", column_major_order=1");
    }
    out.push_str(", &end\n");
    out
}

struct Cursor<'a> {
    text: &'a str,
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn new(text: &'a str) -> Self {
        Self { text, pos: 0 }
    }

    fn rest(&self) -> &'a str {
        &self.text[self.pos..]
    }

    fn skip_separators(&mut self) {
        while let Some(c) = self.rest().chars().next() {
            if c.is_whitespace() || c == ',' {
                self.pos += c.len_utf8();
            } else {
                break;
            }
        }
    }

    fn eat(&mut self, expected: char) -> SddsResult<()> {
        match self.rest().chars().next() {
            Some(c) if c == expected => {
                self.pos += c.len_utf8();
                Ok(())
            }
            Some(c) => sdds_bail!(
                DecodeError: "header byte {}: expected {:?}, found {:?}", self.pos, expected, c
            ),
            None => sdds_bail!(DecodeError: "header ends inside a namelist"),
        }
    }

    fn ident(&mut self) -> SddsResult<&'a str> {
        let start = self.pos;
        while let Some(c) = self.rest().chars().next() {
            if c.is_ascii_alphanumeric() || c == '_' {
                self.pos += 1;
            } else {
                break;
            }
        }
        if self.pos == start {
            sdds_bail!(DecodeError: "header byte {}: expected an identifier", start);
        }
        Ok(&self.text[start..self.pos])
    }

    /// A namelist value: a quoted string with `\"` escapes, or a bare token
    /// running to the next separator.
    fn value(&mut self) -> SddsResult<String> {
        if self.rest().starts_with('"') {
            self.pos += 1;
            let mut out = String::new();
            let mut escaped = false;
            for c in self.rest().chars() {
                self.pos += c.len_utf8();
                if escaped {
                    out.push(c);
                    escaped = false;
                } else if c == '\\' {
                    escaped = true;
                } else if c == '"' {
                    return Ok(out);
                } else {
                    out.push(c);
                }
            }
            sdds_bail!(DecodeError: "unterminated quoted value in header");
        }
        let start = self.pos;
        while let Some(c) = self.rest().chars().next() {
            if c.is_whitespace() || c == ',' || c == '&' {
                break;
            }
            self.pos += c.len_utf8();
        }
        Ok(self.text[start..self.pos].to_string())
    }
}

fn parse_literal<T: std::str::FromStr>(text: &str, name: &str) -> SddsResult<T> {
    text.parse()
        .map_err(|_| sdds_err!(DecodeError: "bad fixed_value {:?} for parameter {:?}", text, name))
}

fn parse_fixed_value(dtype: SddsType, text: &str, name: &str) -> SddsResult<Value> {
    Ok(match dtype {
        SddsType::Double => Value::Double(parse_literal(text, name)?),
        SddsType::Float => Value::Float(parse_literal(text, name)?),
        SddsType::Long64 => Value::Long64(parse_literal(text, name)?),
        SddsType::ULong64 => Value::ULong64(parse_literal(text, name)?),
        SddsType::Long => Value::Long(parse_literal(text, name)?),
        SddsType::ULong => Value::ULong(parse_literal(text, name)?),
        SddsType::Short => Value::Short(parse_literal(text, name)?),
        SddsType::UShort => Value::UShort(parse_literal(text, name)?),
        SddsType::String => Value::String(text.to_string()),
        SddsType::Character => {
            let mut chars = text.chars();
            match (chars.next(), chars.next()) {
                (Some(c), None) if c.is_ascii() => Value::Character(c as u8),
                _ => sdds_bail!(
                    DecodeError: "fixed_value for character parameter {:?} must be one ASCII character", name
                ),
            }
        }
        SddsType::LongDouble => sdds_bail!(
            DecodeError: "fixed_value is unsupported for longdouble parameter {:?}", name
        ),
    })
}

fn pair<'k>(pairs: &mut Vec<(&'k str, String)>, key: &str) -> Option<String> {
    let index = pairs.iter().position(|(k, _)| *k == key)?;
    Some(pairs.swap_remove(index).1)
}

fn required<'k>(
    pairs: &mut Vec<(&'k str, String)>,
    key: &str,
    tag: &str,
) -> SddsResult<String> {
    pair(pairs, key).ok_or_else(|| sdds_err!(DecodeError: "&{} is missing {}=", tag, key))
}

/// Parse the textual header from the start of the file. `bytes` must hold
/// the complete header; readers grow their chunk and retry when the closing
/// `&data` namelist has not arrived yet.
pub fn parse_header(bytes: &[u8]) -> SddsResult<HeaderInfo> {
    // A reader's chunk usually extends past the header into binary page
    // bytes, which need not be UTF-8. Decode the longest valid prefix; the
    // tokenizer stops at the closing `&data` namelist well before it, and a
    // header that is itself malformed fails in the tokenizer instead.
    let text = match std::str::from_utf8(bytes) {
        Ok(text) => text,
        Err(e) => std::str::from_utf8(&bytes[..e.valid_up_to()])
            .sdds_expect("valid_up_to bounds a valid prefix"),
    };
    let Some(first_line) = text.lines().next() else {
        sdds_bail!(DecodeError: "empty file");
    };
    if first_line.trim_end() != SDDS_MAGIC {
        sdds_bail!(DecodeError: "not an SDDS file: first line {:?}", first_line);
    }
    let mut cursor = Cursor::new(text);
    cursor.pos = first_line.len();

    let mut schema = Schema::new();
    let mut description = None;
    loop {
        cursor.skip_separators();
        cursor.eat('&')?;
        let tag = cursor.ident()?;
        let mut pairs: Vec<(&str, String)> = Vec::new();
        loop {
            cursor.skip_separators();
            if cursor.rest().starts_with('&') {
                cursor.eat('&')?;
                let end = cursor.ident()?;
                if end != "end" {
                    sdds_bail!(DecodeError: "&{} inside &{} namelist", end, tag);
                }
                break;
            }
            let key = cursor.ident()?;
            cursor.skip_separators();
            cursor.eat('=')?;
            cursor.skip_separators();
            pairs.push((key, cursor.value()?));
        }
        match tag {
            "description" => {
                description = pair(&mut pairs, "text");
            }
            "parameter" => {
                let name = required(&mut pairs, "name", tag)?;
                let dtype = SddsType::from_name(&required(&mut pairs, "type", tag)?)?;
                let mut def = ParameterDef::new(name, dtype);
                if let Some(units) = pair(&mut pairs, "units") {
                    def = def.with_units(units);
                }
                if let Some(fixed) = pair(&mut pairs, "fixed_value") {
                    let value = parse_fixed_value(dtype, &fixed, &def.name)?;
                    def = def.with_fixed_value(value);
                }
                schema.add_parameter(def)?;
            }
            "array" => {
                let name = required(&mut pairs, "name", tag)?;
                let dtype = SddsType::from_name(&required(&mut pairs, "type", tag)?)?;
                let dimensions = match pair(&mut pairs, "dimensions") {
                    Some(d) => d.parse().map_err(
                        |_| sdds_err!(DecodeError: "bad dimensions {:?} for array {:?}", d, name),
                    )?,
                    None => 1,
                };
                let mut def = ArrayDef::new(name, dtype, dimensions);
                if let Some(units) = pair(&mut pairs, "units") {
                    def = def.with_units(units);
                }
                schema.add_array(def)?;
            }
            "column" => {
                let name = required(&mut pairs, "name", tag)?;
                let dtype = SddsType::from_name(&required(&mut pairs, "type", tag)?)?;
                let mut def = ColumnDef::new(name, dtype);
                if let Some(units) = pair(&mut pairs, "units") {
                    def = def.with_units(units);
                }
                if let Some(len) = pair(&mut pairs, "field_length") {
                    let len = len.parse().map_err(
                        |_| sdds_err!(DecodeError: "bad field_length {:?}", len),
                    )?;
                    def = def.with_field_length(len);
                }
                schema.add_column(def)?;
            }
            "data" => {
                let mode = required(&mut pairs, "mode", tag)?;
                if mode != "binary" {
                    sdds_bail!(NotImplemented: "data mode {:?} (only binary)", mode);
                }
                let byte_order = match pair(&mut pairs, "endian").as_deref() {
                    Some("little") | None => ByteOrder::LittleEndian,
                    Some("big") => ByteOrder::BigEndian,
                    Some(other) => sdds_bail!(DecodeError: "unknown endian {:?}", other),
                };
                let row_layout = match pair(&mut pairs, "column_major_order").as_deref() {
                    Some("1") => RowLayout::ColumnMajor,
                    Some("0") | None => RowLayout::RowMajor,
                    Some(other) => sdds_bail!(DecodeError: "bad column_major_order {:?}", other),
                };
                // The binary pages begin on the byte after the namelist's
                // trailing newline.
                if cursor.rest().starts_with('\r') {
                    cursor.pos += 1;
                }
                if cursor.rest().starts_with('\n') {
                    cursor.pos += 1;
                }
                return Ok(HeaderInfo {
                    schema,
                    byte_order,
                    row_layout,
                    description,
                    header_len: cursor.pos as u64,
                });
            }
            other => sdds_bail!(DecodeError: "unknown namelist &{}", other),
        }
    }
}
