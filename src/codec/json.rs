use crate::utils::error::Result;
use serde::de::{DeserializeOwned, IgnoredAny};
use serde::{Deserialize, Serialize};
use serde_json::ser::Formatter;
use serde_json::Value;
use std::io::{self, Read};

pub use serde_json::value::RawValue;

/// 緊湊格式序列化
pub fn marshal<T: Serialize + ?Sized>(value: &T) -> Result<Vec<u8>> {
    Ok(serde_json::to_vec(value)?)
}

pub fn unmarshal<'a, T: Deserialize<'a>>(data: &'a [u8]) -> Result<T> {
    Ok(serde_json::from_slice(data)?)
}

/// 用於 `skip_serializing_if`，零值欄位不輸出
pub fn is_zero<T: Default + PartialEq>(value: &T) -> bool {
    *value == T::default()
}

/// Encode a number as a JSON string (`"64"`) and parse it back.
///
/// ```ignore
/// #[serde(with = "stdlib_tour::codec::json::as_string")]
/// int64_string: i64,
/// ```
pub mod as_string {
    use serde::de::Error;
    use serde::{Deserialize, Deserializer, Serializer};
    use std::fmt::Display;
    use std::str::FromStr;

    pub fn serialize<T, S>(value: &T, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        T: Display,
        S: Serializer,
    {
        serializer.collect_str(value)
    }

    pub fn deserialize<'de, T, D>(deserializer: D) -> std::result::Result<T, D::Error>
    where
        T: FromStr,
        T::Err: Display,
        D: Deserializer<'de>,
    {
        let text = String::deserialize(deserializer)?;
        text.parse().map_err(D::Error::custom)
    }
}

/// 依序解碼一連串相接的 JSON 值（例如 NDJSON）
pub fn decode_stream<T: DeserializeOwned, R: Read>(reader: R) -> Result<Vec<T>> {
    let mut values = Vec::new();
    for value in serde_json::Deserializer::from_reader(reader).into_iter::<T>() {
        values.push(value?);
    }
    Ok(values)
}

#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    Delim(char),
    String(String),
    Number(f64),
    Bool(bool),
    Null,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TokenEntry {
    pub token: Token,
    /// Another element follows inside the current array or object
    /// (or another top-level value follows the last one).
    pub more: bool,
}

/// 把輸入攤平成 token 序列，物件的 key 保持原始順序
pub fn tokens(input: &str) -> Result<Vec<TokenEntry>> {
    let mut flat = Vec::new();
    for value in serde_json::Deserializer::from_str(input).into_iter::<Value>() {
        flatten(value?, &mut flat);
    }

    let entries = (0..flat.len())
        .map(|i| {
            let more = match flat.get(i + 1) {
                Some(Token::Delim(']')) | Some(Token::Delim('}')) | None => false,
                Some(_) => true,
            };
            TokenEntry {
                token: flat[i].clone(),
                more,
            }
        })
        .collect();
    Ok(entries)
}

fn flatten(value: Value, out: &mut Vec<Token>) {
    match value {
        Value::Null => out.push(Token::Null),
        Value::Bool(b) => out.push(Token::Bool(b)),
        Value::Number(n) => out.push(Token::Number(n.as_f64().unwrap_or(f64::NAN))),
        Value::String(s) => out.push(Token::String(s)),
        Value::Array(items) => {
            out.push(Token::Delim('['));
            for item in items {
                flatten(item, out);
            }
            out.push(Token::Delim(']'));
        }
        Value::Object(map) => {
            out.push(Token::Delim('{'));
            for (key, item) in map {
                out.push(Token::String(key));
                flatten(item, out);
            }
            out.push(Token::Delim('}'));
        }
    }
}

/// Pretty printer where every line after the first starts with `prefix`.
struct PrefixedFormatter<'a> {
    prefix: &'a [u8],
    indent: &'a [u8],
    level: usize,
    has_value: bool,
}

impl<'a> PrefixedFormatter<'a> {
    fn new(prefix: &'a str, indent: &'a str) -> Self {
        Self {
            prefix: prefix.as_bytes(),
            indent: indent.as_bytes(),
            level: 0,
            has_value: false,
        }
    }

    fn newline<W: ?Sized + io::Write>(&self, writer: &mut W) -> io::Result<()> {
        writer.write_all(b"\n")?;
        writer.write_all(self.prefix)?;
        for _ in 0..self.level {
            writer.write_all(self.indent)?;
        }
        Ok(())
    }

    fn open<W: ?Sized + io::Write>(&mut self, writer: &mut W, delim: &[u8]) -> io::Result<()> {
        self.level += 1;
        self.has_value = false;
        writer.write_all(delim)
    }

    fn close<W: ?Sized + io::Write>(&mut self, writer: &mut W, delim: &[u8]) -> io::Result<()> {
        self.level -= 1;
        if self.has_value {
            self.newline(writer)?;
        }
        writer.write_all(delim)
    }

    fn element<W: ?Sized + io::Write>(&mut self, writer: &mut W, first: bool) -> io::Result<()> {
        if !first {
            writer.write_all(b",")?;
        }
        self.newline(writer)
    }
}

impl Formatter for PrefixedFormatter<'_> {
    fn begin_array<W: ?Sized + io::Write>(&mut self, writer: &mut W) -> io::Result<()> {
        self.open(writer, b"[")
    }

    fn end_array<W: ?Sized + io::Write>(&mut self, writer: &mut W) -> io::Result<()> {
        self.close(writer, b"]")
    }

    fn begin_array_value<W: ?Sized + io::Write>(
        &mut self,
        writer: &mut W,
        first: bool,
    ) -> io::Result<()> {
        self.element(writer, first)
    }

    fn end_array_value<W: ?Sized + io::Write>(&mut self, _writer: &mut W) -> io::Result<()> {
        self.has_value = true;
        Ok(())
    }

    fn begin_object<W: ?Sized + io::Write>(&mut self, writer: &mut W) -> io::Result<()> {
        self.open(writer, b"{")
    }

    fn end_object<W: ?Sized + io::Write>(&mut self, writer: &mut W) -> io::Result<()> {
        self.close(writer, b"}")
    }

    fn begin_object_key<W: ?Sized + io::Write>(
        &mut self,
        writer: &mut W,
        first: bool,
    ) -> io::Result<()> {
        self.element(writer, first)
    }

    fn begin_object_value<W: ?Sized + io::Write>(&mut self, writer: &mut W) -> io::Result<()> {
        writer.write_all(b": ")
    }

    fn end_object_value<W: ?Sized + io::Write>(&mut self, _writer: &mut W) -> io::Result<()> {
        self.has_value = true;
        Ok(())
    }
}

fn write_indented(value: &Value, prefix: &str, indent: &str) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    let mut ser = serde_json::Serializer::with_formatter(&mut out, PrefixedFormatter::new(prefix, indent));
    value.serialize(&mut ser)?;
    Ok(out)
}

/// 序列化並縮排。先轉成 `Value`，所以 `RawValue` 內容也會被重新縮排
pub fn marshal_indent<T: Serialize + ?Sized>(value: &T, prefix: &str, indent: &str) -> Result<Vec<u8>> {
    let value = serde_json::to_value(value)?;
    write_indented(&value, prefix, indent)
}

/// 將已編碼的 JSON 重新縮排
pub fn indent(src: &[u8], prefix: &str, indent: &str) -> Result<Vec<u8>> {
    let value: Value = serde_json::from_slice(src)?;
    write_indented(&value, prefix, indent)
}

pub fn valid(data: &[u8]) -> bool {
    serde_json::from_slice::<IgnoredAny>(data).is_ok()
}

/// 把 `<`、`>`、`&`、U+2028、U+2029 換成 `\uXXXX`，讓 JSON 可以安全地嵌進 HTML
pub fn html_escape(src: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(src.len());
    let mut i = 0;
    while i < src.len() {
        match src[i] {
            b'<' => out.extend_from_slice(b"\\u003c"),
            b'>' => out.extend_from_slice(b"\\u003e"),
            b'&' => out.extend_from_slice(b"\\u0026"),
            // U+2028 / U+2029 are E2 80 A8 / E2 80 A9 in UTF-8
            0xE2 if src.get(i + 1) == Some(&0x80)
                && matches!(src.get(i + 2), Some(0xA8) | Some(0xA9)) =>
            {
                let last = if src[i + 2] == 0xA8 { b'8' } else { b'9' };
                out.extend_from_slice(b"\\u202");
                out.push(last);
                i += 3;
                continue;
            }
            b => out.push(b),
        }
        i += 1;
    }
    out
}
