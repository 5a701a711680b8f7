//! Full-fidelity raw rendering of protobuf messages.
//!
//! The envoy protobufs carry no serde support, so a message is turned into a
//! [`serde_json::Value`] by reading its prost `Debug` form. Every field the
//! message holds appears in the value, including defaults. Embedded `Any`
//! payloads of a known type are decoded and expanded in place under an
//! `@type` key; unknown payloads keep their bytes as base64, and payloads
//! that fail to decode carry the decode error instead.

use std::fmt;

use base64::{engine::general_purpose, Engine as _};
use envoy_types::pb::envoy::config::cluster::v3::Cluster;
use envoy_types::pb::envoy::config::endpoint::v3::ClusterLoadAssignment;
use envoy_types::pb::envoy::config::listener::v3::Listener;
use envoy_types::pb::envoy::config::route::v3::RouteConfiguration;
use envoy_types::pb::envoy::extensions::filters::http::router::v3::Router;
use envoy_types::pb::envoy::extensions::filters::network::http_connection_manager::v3::{
    HttpConnectionManager,
};
use envoy_types::pb::envoy::extensions::filters::network::tcp_proxy::v3::TcpProxy;
use envoy_types::pb::envoy::extensions::transport_sockets::tls::v3::{
    DownstreamTlsContext, UpstreamTlsContext,
};
use prost::{DecodeError, Message, Name};
use serde_json::{Map, Number, Value};
use tracing::debug;

/// Key naming the type of an expanded `Any`.
pub const TYPE_KEY: &str = "@type";

/// Convert a prost message into a JSON value holding every field.
///
/// Falls back to the plain `Debug` text when it cannot be read back.
pub fn to_value<M: fmt::Debug>(message: &M) -> Value {
    let text = format!("{:?}", message);
    match DebugParser::new(&text).parse() {
        Ok(value) => value,
        Err(error) => {
            debug!(%error, "Falling back to debug text for raw output");
            Value::String(text)
        }
    }
}

/// Expand an `Any` payload by its type URL.
pub fn expand_any(type_url: &str, value: &[u8]) -> Value {
    let mut object = Map::new();
    object.insert(TYPE_KEY.to_string(), Value::String(type_url.to_string()));

    match decode_known(type_url, value) {
        Some(Ok(text)) => match DebugParser::new(&text).parse() {
            Ok(Value::Object(fields)) => object.extend(fields),
            Ok(_) => {}
            Err(error) => {
                object.insert("error".to_string(), Value::String(error.to_string()));
            }
        },
        Some(Err(error)) => {
            debug!(type_url, %error, "Cannot expand embedded payload");
            object.insert("error".to_string(), Value::String(error.to_string()));
        }
        None => {
            let encoded = general_purpose::STANDARD.encode(value);
            object.insert("value".to_string(), Value::String(encoded));
        }
    }

    Value::Object(object)
}

/// Decode `value` as `M` when `type_url` names it.
fn decode_as<M>(type_url: &str, value: &[u8]) -> Option<Result<String, DecodeError>>
where
    M: Message + Name + Default + std::fmt::Debug,
{
    (type_url == M::type_url()).then(|| M::decode(value).map(|message| format!("{:?}", message)))
}

fn decode_known(type_url: &str, value: &[u8]) -> Option<Result<String, DecodeError>> {
    decode_as::<Listener>(type_url, value)
        .or_else(|| decode_as::<Cluster>(type_url, value))
        .or_else(|| decode_as::<ClusterLoadAssignment>(type_url, value))
        .or_else(|| decode_as::<RouteConfiguration>(type_url, value))
        .or_else(|| decode_as::<HttpConnectionManager>(type_url, value))
        .or_else(|| decode_as::<TcpProxy>(type_url, value))
        .or_else(|| decode_as::<Router>(type_url, value))
        .or_else(|| decode_as::<DownstreamTlsContext>(type_url, value))
        .or_else(|| decode_as::<UpstreamTlsContext>(type_url, value))
}

/// `TypedConfig` becomes `typed_config`.
fn snake_case(ident: &str) -> String {
    let chars: Vec<char> = ident.chars().collect();
    let mut out = String::with_capacity(ident.len() + 4);
    for (i, &c) in chars.iter().enumerate() {
        if c.is_ascii_uppercase() {
            let prev = i.checked_sub(1).map(|p| chars[p]);
            let next = chars.get(i + 1);
            let boundary = match prev {
                Some(p) if p.is_ascii_lowercase() || p.is_ascii_digit() => true,
                Some(p) if p.is_ascii_uppercase() => next.is_some_and(|n| n.is_ascii_lowercase()),
                _ => false,
            };
            if boundary {
                out.push('_');
            }
            out.push(c.to_ascii_lowercase());
        } else {
            out.push(c);
        }
    }
    out
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct ParseError {
    position: usize,
    expected: &'static str,
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "expected {} at offset {}", self.expected, self.position)
    }
}

impl std::error::Error for ParseError {}

type ParseResult<T> = std::result::Result<T, ParseError>;

/// Reader for the `Debug` grammar prost-derive emits: structs, tuple
/// variants, lists, maps, strings, numbers and bare identifiers.
struct DebugParser<'a> {
    src: &'a str,
    pos: usize,
}

impl<'a> DebugParser<'a> {
    fn new(src: &'a str) -> Self {
        Self { src, pos: 0 }
    }

    fn parse(mut self) -> ParseResult<Value> {
        let value = self.value()?;
        self.skip_ws();
        if self.pos != self.src.len() {
            return Err(self.error("end of input"));
        }
        Ok(value)
    }

    fn error(&self, expected: &'static str) -> ParseError {
        ParseError {
            position: self.pos,
            expected,
        }
    }

    fn peek(&self) -> Option<char> {
        self.src[self.pos..].chars().next()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    fn skip_ws(&mut self) {
        while self.peek().is_some_and(char::is_whitespace) {
            self.bump();
        }
    }

    fn eat(&mut self, expected: char) -> bool {
        self.skip_ws();
        if self.peek() == Some(expected) {
            self.bump();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, expected: char, what: &'static str) -> ParseResult<()> {
        if self.eat(expected) {
            Ok(())
        } else {
            Err(self.error(what))
        }
    }

    fn value(&mut self) -> ParseResult<Value> {
        self.skip_ws();
        match self.peek() {
            Some('"') => self.string().map(Value::String),
            Some('b') if self.src[self.pos..].starts_with("b\"") => {
                self.bump();
                self.string().map(Value::String)
            }
            Some('[') => self.list(),
            Some('{') => self.map(),
            Some(c) if c == '-' || c.is_ascii_digit() => self.number(),
            Some(c) if c.is_alphabetic() || c == '_' => self.named(),
            _ => Err(self.error("value")),
        }
    }

    /// Separated items up to `close`, tolerating a trailing separator.
    fn items<F>(&mut self, close: char, mut item: F) -> ParseResult<()>
    where
        F: FnMut(&mut Self) -> ParseResult<()>,
    {
        loop {
            if self.eat(close) {
                return Ok(());
            }
            item(self)?;
            if !self.eat(',') {
                return self.expect(close, "closing delimiter");
            }
        }
    }

    fn list(&mut self) -> ParseResult<Value> {
        self.expect('[', "'['")?;
        let mut values = Vec::new();
        self.items(']', |p| {
            values.push(p.value()?);
            Ok(())
        })?;
        Ok(Value::Array(values))
    }

    fn map(&mut self) -> ParseResult<Value> {
        self.expect('{', "'{'")?;
        let mut object = Map::new();
        self.items('}', |p| {
            let key = match p.value()? {
                Value::String(key) => key,
                other => other.to_string(),
            };
            p.expect(':', "':'")?;
            object.insert(key, p.value()?);
            Ok(())
        })?;
        Ok(Value::Object(object))
    }

    fn ident(&mut self) -> &'a str {
        let src = self.src;
        let start = self.pos;
        while self.peek().is_some_and(|c| c.is_alphanumeric() || c == '_' || c == '#') {
            self.bump();
        }
        &src[start..self.pos]
    }

    /// A struct, tuple variant, keyword or bare enum variant.
    fn named(&mut self) -> ParseResult<Value> {
        let ident = self.ident();
        self.skip_ws();
        match self.peek() {
            Some('{') => {
                self.bump();
                let fields = self.fields()?;
                Ok(match (ident, any_parts(&fields)) {
                    ("Any", Some((type_url, value))) => expand_any(&type_url, &value),
                    _ => Value::Object(fields),
                })
            }
            Some('(') => {
                self.bump();
                let mut values = Vec::new();
                self.items(')', |p| {
                    values.push(p.value()?);
                    Ok(())
                })?;
                let inner = match values.len() {
                    1 => values.remove(0),
                    _ => Value::Array(values),
                };
                if ident == "Some" {
                    return Ok(inner);
                }
                let mut object = Map::new();
                object.insert(snake_case(ident), inner);
                Ok(Value::Object(object))
            }
            _ => Ok(match ident {
                "None" => Value::Null,
                "true" => Value::Bool(true),
                "false" => Value::Bool(false),
                _ => Value::String(ident.to_string()),
            }),
        }
    }

    fn fields(&mut self) -> ParseResult<Map<String, Value>> {
        let mut object = Map::new();
        self.items('}', |p| {
            p.skip_ws();
            if p.src[p.pos..].starts_with("..") {
                p.pos += 2;
                return Ok(());
            }
            let name = p.ident();
            if name.is_empty() {
                return Err(p.error("field name"));
            }
            p.expect(':', "':'")?;
            let value = p.value()?;
            object.insert(name.trim_start_matches("r#").to_string(), value);
            Ok(())
        })?;
        Ok(object)
    }

    fn number(&mut self) -> ParseResult<Value> {
        let start = self.pos;
        if self.peek() == Some('-') {
            self.bump();
            if self.src[self.pos..].starts_with("inf") {
                self.pos += 3;
                return Ok(Value::String("-inf".to_string()));
            }
        }
        while self
            .peek()
            .is_some_and(|c| c.is_ascii_digit() || matches!(c, '.' | 'e' | 'E' | '+' | '-'))
        {
            self.bump();
        }
        let token = &self.src[start..self.pos];

        if let Ok(n) = token.parse::<i64>() {
            return Ok(Value::Number(n.into()));
        }
        if let Ok(n) = token.parse::<u64>() {
            return Ok(Value::Number(n.into()));
        }
        match token.parse::<f64>() {
            Ok(n) => Ok(Number::from_f64(n)
                .map(Value::Number)
                .unwrap_or_else(|| Value::String(token.to_string()))),
            Err(_) => Err(ParseError {
                position: start,
                expected: "number",
            }),
        }
    }

    fn string(&mut self) -> ParseResult<String> {
        self.expect('"', "'\"'")?;
        let mut out = String::new();
        loop {
            match self.bump() {
                None => return Err(self.error("closing quote")),
                Some('"') => return Ok(out),
                Some('\\') => out.push(self.escape()?),
                Some(c) => out.push(c),
            }
        }
    }

    fn escape(&mut self) -> ParseResult<char> {
        match self.bump() {
            Some('n') => Ok('\n'),
            Some('r') => Ok('\r'),
            Some('t') => Ok('\t'),
            Some('0') => Ok('\0'),
            Some(c @ ('"' | '\\' | '\'')) => Ok(c),
            Some('x') => {
                let start = self.pos;
                self.pos = (self.pos + 2).min(self.src.len());
                self.hex_char(start, self.pos)
            }
            Some('u') => {
                self.expect('{', "'{'")?;
                let start = self.pos;
                while self.peek().is_some_and(|c| c.is_ascii_hexdigit()) {
                    self.bump();
                }
                let end = self.pos;
                self.expect('}', "'}'")?;
                self.hex_char(start, end)
            }
            _ => Err(self.error("escape sequence")),
        }
    }

    fn hex_char(&self, start: usize, end: usize) -> ParseResult<char> {
        self.src
            .get(start..end)
            .and_then(|digits| u32::from_str_radix(digits, 16).ok())
            .and_then(char::from_u32)
            .ok_or(ParseError {
                position: start,
                expected: "hex escape",
            })
    }
}

/// The type URL and payload of a parsed `Any { type_url, value }`.
fn any_parts(fields: &Map<String, Value>) -> Option<(String, Vec<u8>)> {
    if fields.len() != 2 {
        return None;
    }
    let type_url = fields.get("type_url")?.as_str()?.to_string();
    let value = fields
        .get("value")?
        .as_array()?
        .iter()
        .map(|byte| byte.as_u64().and_then(|b| u8::try_from(b).ok()))
        .collect::<Option<Vec<u8>>>()?;
    Some((type_url, value))
}
