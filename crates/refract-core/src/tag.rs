//! Struct field tag parsing.
//!
//! A tag is a string attached to a field declaration holding key scoped
//! metadata, for example:
//!
//! ```text
//! json:"f1,omitempty" db:"col_f1"
//! ```
//!
//! Each `key:"value"` pair becomes one [`TagEntry`]. The value is split on
//! commas: the first piece is the entry name, the rest are options.

use std::fmt;

use refract_types::TagSummary;

/// Why a tag string was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum TagSyntaxReason {
    #[error("empty key")]
    EmptyKey,
    #[error("missing colon after key")]
    MissingColon,
    #[error("value is not quoted")]
    MissingQuote,
    #[error("unterminated quoted value")]
    Unterminated,
    #[error("malformed quoted value")]
    InvalidLiteral,
}

/// A struct field tag could not be parsed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("struct field tag syntax error: {reason} at byte {offset}")]
pub struct TagSyntaxError {
    pub reason: TagSyntaxReason,
    /// Byte offset into the raw tag string.
    pub offset: usize,
}

impl TagSyntaxError {
    fn new(reason: TagSyntaxReason, offset: usize) -> Self {
        Self { reason, offset }
    }
}

/// A single parsed tag entry.
///
/// Example:
///
/// ```text
/// key:"name,option0,option1"
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct TagEntry {
    field: String,
    key: String,
    name: String,
    options: Vec<String>,
}

impl TagEntry {
    /// A zero entry remembering only the owning field's name.
    pub fn absent(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            ..Self::default()
        }
    }

    /// Build an entry from an already unescaped tag value.
    pub fn from_value(field: &str, key: &str, value: &str) -> Self {
        let mut pieces = Vec::new();
        if !value.is_empty() {
            for (i, piece) in value.split(',').enumerate() {
                let mut piece = piece.trim();
                if i == 0 && piece.is_empty() {
                    piece = field;
                }
                if piece.is_empty() {
                    continue;
                }
                pieces.push(piece.to_owned());
            }
        }

        let mut pieces = pieces.into_iter();
        let name = pieces.next().unwrap_or_default();
        Self {
            field: field.to_owned(),
            key: key.to_owned(),
            name,
            options: pieces.collect(),
        }
    }

    /// Name of the field the tag is attached to.
    pub fn field(&self) -> &str {
        &self.field
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn options(&self) -> &[String] {
        &self.options
    }

    /// Returns true if the option is on the list.
    pub fn contains(&self, option: &str) -> bool {
        self.options.iter().any(|opt| opt == option)
    }

    /// The tag name, or the field name when the name is empty or `-`.
    pub fn name_or_field(&self) -> &str {
        if !self.name.is_empty() && self.name != "-" {
            return &self.name;
        }
        &self.field
    }

    /// Returns true if the tag name is `-`.
    pub fn is_ignored(&self) -> bool {
        self.name == "-"
    }

    /// Returns true when key, name and options are all empty. The field name
    /// is not considered.
    pub fn is_zero(&self) -> bool {
        self.key.is_empty() && self.name.is_empty() && self.options.is_empty()
    }

    pub fn summary(&self) -> TagSummary {
        TagSummary {
            key: self.key.clone(),
            name: self.name.clone(),
            options: self.options.clone(),
        }
    }
}

/// Renders the entry back into `key:"name,opt1,opt2"` form.
impl fmt::Display for TagEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut value = self.name.clone();
        for opt in &self.options {
            value.push(',');
            value.push_str(opt);
        }
        write!(f, "{}:{}", self.key, quote(&value))
    }
}

/// Parse a raw struct field tag.
///
/// Entries are returned in order of first appearance. When a key repeats,
/// the later entry replaces the earlier one in place. Parsing is all or
/// nothing: any syntax error discards the whole tag.
///
/// ```
/// use refract_core::parse_tags;
///
/// let tags = parse_tags("F1", r#"json:",omitempty" db:"f1""#).unwrap();
/// assert_eq!(tags[0].name(), "F1");
/// assert!(tags[0].contains("omitempty"));
/// assert_eq!(tags[1].name(), "f1");
/// ```
pub fn parse_tags(field_name: &str, raw: &str) -> Result<Vec<TagEntry>, TagSyntaxError> {
    let bytes = raw.as_bytes();
    let mut tags: Vec<TagEntry> = Vec::new();
    let mut pos = 0;

    while pos < bytes.len() {
        while pos < bytes.len() && bytes[pos] == b' ' {
            pos += 1;
        }
        if pos == bytes.len() {
            break;
        }

        // Control characters, spaces, quotes and DEL end the key. Multibyte
        // characters are let through, the check is byte based.
        let key_start = pos;
        while pos < bytes.len() && is_key_byte(bytes[pos]) {
            pos += 1;
        }
        if pos == key_start {
            return Err(TagSyntaxError::new(TagSyntaxReason::EmptyKey, pos));
        }
        if pos + 1 >= bytes.len() || bytes[pos] != b':' {
            return Err(TagSyntaxError::new(TagSyntaxReason::MissingColon, pos));
        }
        if bytes[pos + 1] != b'"' {
            return Err(TagSyntaxError::new(TagSyntaxReason::MissingQuote, pos + 1));
        }
        let key = &raw[key_start..pos];

        let quote_start = pos + 1;
        let mut end = quote_start + 1;
        while end < bytes.len() && bytes[end] != b'"' {
            if bytes[end] == b'\\' {
                end += 1;
            }
            end += 1;
        }
        if end >= bytes.len() {
            return Err(TagSyntaxError::new(
                TagSyntaxReason::Unterminated,
                quote_start,
            ));
        }

        let value = unquote(&raw[quote_start..=end])
            .ok_or(TagSyntaxError::new(TagSyntaxReason::InvalidLiteral, quote_start))?;
        pos = end + 1;

        let entry = TagEntry::from_value(field_name, key, &value);
        match tags.iter_mut().find(|tag| tag.key == entry.key) {
            Some(slot) => *slot = entry,
            None => tags.push(entry),
        }
    }

    Ok(tags)
}

fn is_key_byte(b: u8) -> bool {
    b > b' ' && b != b':' && b != b'"' && b != 0x7f
}

/// Decode a double-quoted, backslash-escaped literal.
///
/// Accepts `\a \b \f \n \r \t \v \\ \"`, three digit octal, `\xHH`, `\uHHHH`
/// and `\UHHHHHHHH`. Raw newlines are rejected.
///
/// Entries hold `String`s, so the decoded bytes must be valid UTF-8. Byte
/// escapes that do not form a complete UTF-8 sequence, such as `\377` or a
/// lone `\xc3`, make the literal invalid. A sequence spelled out in escapes,
/// `\xc3\xa9`, decodes to `é`.
pub(crate) fn unquote(literal: &str) -> Option<String> {
    let inner = literal.strip_prefix('"')?.strip_suffix('"')?;
    if inner.contains('\n') {
        return None;
    }
    if !inner.contains('\\') && !inner.contains('"') {
        return Some(inner.to_owned());
    }

    let bytes = inner.as_bytes();
    let mut out: Vec<u8> = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        let c = bytes[i];
        i += 1;
        if c == b'"' {
            return None;
        }
        if c != b'\\' {
            out.push(c);
            continue;
        }

        let esc = *bytes.get(i)?;
        i += 1;
        match esc {
            b'a' => out.push(0x07),
            b'b' => out.push(0x08),
            b'f' => out.push(0x0c),
            b'n' => out.push(b'\n'),
            b'r' => out.push(b'\r'),
            b't' => out.push(b'\t'),
            b'v' => out.push(0x0b),
            b'\\' => out.push(b'\\'),
            b'"' => out.push(b'"'),
            b'0'..=b'7' => {
                let digits = bytes.get(i - 1..i + 2)?;
                let mut value: u32 = 0;
                for &d in digits {
                    if !(b'0'..=b'7').contains(&d) {
                        return None;
                    }
                    value = value * 8 + u32::from(d - b'0');
                }
                out.push(u8::try_from(value).ok()?);
                i += 2;
            }
            b'x' => {
                let value = hex_value(bytes.get(i..i + 2)?)?;
                out.push(u8::try_from(value).ok()?);
                i += 2;
            }
            b'u' | b'U' => {
                let width = if esc == b'u' { 4 } else { 8 };
                let value = hex_value(bytes.get(i..i + width)?)?;
                let ch = char::from_u32(value)?;
                let mut buf = [0u8; 4];
                out.extend_from_slice(ch.encode_utf8(&mut buf).as_bytes());
                i += width;
            }
            _ => return None,
        }
    }

    String::from_utf8(out).ok()
}

fn hex_value(digits: &[u8]) -> Option<u32> {
    digits.iter().try_fold(0u32, |acc, &d| {
        let v = (d as char).to_digit(16)?;
        Some(acc * 16 + v)
    })
}

/// Quote a value so that [`unquote`] returns it unchanged.
pub(crate) fn quote(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('"');
    for ch in value.chars() {
        match ch {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if (c as u32) < 0x20 || c == '\x7f' => {
                out.push_str(&format!("\\x{:02x}", c as u32));
            }
            c => out.push(c),
        }
    }
    out.push('"');
    out
}
