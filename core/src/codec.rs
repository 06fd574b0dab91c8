//! XML-RPC body encoding and decoding.
//!
//! # Design
//! Pure string-in / string-out functions so both sides of the wire (the
//! client and the mock issuer) share one codec and neither touches I/O.
//! Decoding first builds a small element tree with `quick-xml`, then walks
//! it; whitespace between elements is ignored, text inside `<string>` is
//! kept verbatim.

use std::collections::BTreeMap;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use chrono::NaiveDateTime;
use quick_xml::escape::escape;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use crate::error::TransportError;
use crate::value::{Value, DATE_TIME_FORMAT};

const XML_DECL: &str = r#"<?xml version="1.0"?>"#;

/// Encode a `<methodCall>` document.
pub fn encode_method_call(method: &str, params: &[Value]) -> String {
    let mut out = String::from(XML_DECL);
    out.push_str("<methodCall><methodName>");
    out.push_str(&escape(method));
    out.push_str("</methodName><params>");
    for param in params {
        out.push_str("<param>");
        write_value(&mut out, param);
        out.push_str("</param>");
    }
    out.push_str("</params></methodCall>");
    out
}

/// Encode a successful `<methodResponse>` carrying one value.
pub fn encode_response(value: &Value) -> String {
    let mut out = String::from(XML_DECL);
    out.push_str("<methodResponse><params><param>");
    write_value(&mut out, value);
    out.push_str("</param></params></methodResponse>");
    out
}

/// Encode a `<fault>` response.
pub fn encode_fault(code: i32, message: &str) -> String {
    let mut members = BTreeMap::new();
    members.insert("faultCode".to_string(), Value::Int(code));
    members.insert("faultString".to_string(), Value::String(message.to_string()));

    let mut out = String::from(XML_DECL);
    out.push_str("<methodResponse><fault>");
    write_value(&mut out, &Value::Struct(members));
    out.push_str("</fault></methodResponse>");
    out
}

/// Decode a `<methodCall>` document into its method name and parameters.
pub fn decode_method_call(xml: &str) -> Result<(String, Vec<Value>), TransportError> {
    let root = parse_tree(xml)?;
    root.expect_name("methodCall")?;

    let method = root.required_child("methodName")?.text().trim().to_string();
    if method.is_empty() {
        return Err(malformed("empty methodName"));
    }

    let params = match root.child("params") {
        Some(params) => params
            .elements()
            .map(|param| {
                param.expect_name("param")?;
                decode_value(param.required_child("value")?)
            })
            .collect::<Result<Vec<_>, _>>()?,
        None => Vec::new(),
    };
    Ok((method, params))
}

/// Decode a `<methodResponse>` document.
///
/// A `<fault>` response becomes `TransportError::Fault`.
pub fn decode_response(xml: &str) -> Result<Value, TransportError> {
    let root = parse_tree(xml)?;
    root.expect_name("methodResponse")?;

    if let Some(fault) = root.child("fault") {
        let value = decode_value(fault.required_child("value")?)?;
        let code = value
            .get("faultCode")
            .and_then(Value::as_i32)
            .ok_or_else(|| malformed("fault without integer faultCode"))?;
        let message = value
            .get("faultString")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        return Err(TransportError::Fault { code, message });
    }

    let param = root
        .required_child("params")?
        .elements()
        .next()
        .ok_or_else(|| malformed("response carries no param"))?;
    param.expect_name("param")?;
    decode_value(param.required_child("value")?)
}

fn write_value(out: &mut String, value: &Value) {
    out.push_str("<value>");
    match value {
        Value::Int(i) => {
            out.push_str("<int>");
            out.push_str(&i.to_string());
            out.push_str("</int>");
        }
        Value::Bool(b) => {
            out.push_str(if *b {
                "<boolean>1</boolean>"
            } else {
                "<boolean>0</boolean>"
            });
        }
        Value::String(s) => {
            out.push_str("<string>");
            out.push_str(&escape(s.as_str()));
            out.push_str("</string>");
        }
        Value::Double(d) => {
            out.push_str("<double>");
            out.push_str(&d.to_string());
            out.push_str("</double>");
        }
        Value::DateTime(dt) => {
            out.push_str("<dateTime.iso8601>");
            out.push_str(&dt.format(DATE_TIME_FORMAT).to_string());
            out.push_str("</dateTime.iso8601>");
        }
        Value::Base64(bytes) => {
            out.push_str("<base64>");
            out.push_str(&STANDARD.encode(bytes));
            out.push_str("</base64>");
        }
        Value::Array(items) => {
            out.push_str("<array><data>");
            for item in items {
                write_value(out, item);
            }
            out.push_str("</data></array>");
        }
        Value::Struct(members) => {
            out.push_str("<struct>");
            for (name, member) in members {
                out.push_str("<member><name>");
                out.push_str(&escape(name.as_str()));
                out.push_str("</name>");
                write_value(out, member);
                out.push_str("</member>");
            }
            out.push_str("</struct>");
        }
        Value::Nil => out.push_str("<nil/>"),
    }
    out.push_str("</value>");
}

fn decode_value(element: &Element) -> Result<Value, TransportError> {
    element.expect_name("value")?;

    // A <value> without a type element is an implicit string.
    let Some(typed) = element.elements().next() else {
        return Ok(Value::String(element.text()));
    };

    let text = typed.text();
    match typed.name.as_str() {
        "int" | "i4" => text
            .trim()
            .parse()
            .map(Value::Int)
            .map_err(|e| malformed(format!("bad int {text:?}: {e}"))),
        "boolean" => match text.trim() {
            "1" | "true" => Ok(Value::Bool(true)),
            "0" | "false" => Ok(Value::Bool(false)),
            other => Err(malformed(format!("bad boolean {other:?}"))),
        },
        "string" => Ok(Value::String(text)),
        "double" => text
            .trim()
            .parse()
            .map(Value::Double)
            .map_err(|e| malformed(format!("bad double {text:?}: {e}"))),
        "dateTime.iso8601" => parse_datetime(text.trim()).map(Value::DateTime),
        "base64" => {
            let compact: String = text.chars().filter(|c| !c.is_whitespace()).collect();
            STANDARD
                .decode(compact)
                .map(Value::Base64)
                .map_err(|e| malformed(format!("bad base64: {e}")))
        }
        "array" => {
            let data = typed.required_child("data")?;
            data.elements()
                .map(decode_value)
                .collect::<Result<Vec<_>, _>>()
                .map(Value::Array)
        }
        "struct" => {
            let mut members = BTreeMap::new();
            for member in typed.elements() {
                member.expect_name("member")?;
                let name = member.required_child("name")?.text();
                let value = decode_value(member.required_child("value")?)?;
                members.insert(name, value);
            }
            Ok(Value::Struct(members))
        }
        "nil" => Ok(Value::Nil),
        other => Err(malformed(format!("unknown value type <{other}>"))),
    }
}

fn parse_datetime(text: &str) -> Result<NaiveDateTime, TransportError> {
    NaiveDateTime::parse_from_str(text, DATE_TIME_FORMAT)
        .or_else(|_| NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S"))
        .map_err(|e| malformed(format!("bad dateTime {text:?}: {e}")))
}

fn malformed(msg: impl Into<String>) -> TransportError {
    TransportError::Malformed(msg.into())
}

// ---------------------------------------------------------------------------
// Element tree
// ---------------------------------------------------------------------------

#[derive(Debug)]
struct Element {
    name: String,
    children: Vec<Node>,
}

#[derive(Debug)]
enum Node {
    Element(Element),
    Text(String),
}

impl Element {
    fn new(start: &BytesStart<'_>) -> Self {
        Self {
            name: String::from_utf8_lossy(start.name().as_ref()).into_owned(),
            children: Vec::new(),
        }
    }

    fn elements(&self) -> impl Iterator<Item = &Element> {
        self.children.iter().filter_map(|node| match node {
            Node::Element(el) => Some(el),
            Node::Text(_) => None,
        })
    }

    fn child(&self, name: &str) -> Option<&Element> {
        self.elements().find(|el| el.name == name)
    }

    fn required_child(&self, name: &str) -> Result<&Element, TransportError> {
        self.child(name)
            .ok_or_else(|| malformed(format!("<{}> is missing <{name}>", self.name)))
    }

    fn expect_name(&self, name: &str) -> Result<(), TransportError> {
        if self.name == name {
            Ok(())
        } else {
            Err(malformed(format!("expected <{name}>, found <{}>", self.name)))
        }
    }

    fn text(&self) -> String {
        self.children
            .iter()
            .filter_map(|node| match node {
                Node::Text(t) => Some(t.as_str()),
                Node::Element(_) => None,
            })
            .collect()
    }
}

fn parse_tree(xml: &str) -> Result<Element, TransportError> {
    let mut reader = Reader::from_str(xml);
    let mut stack: Vec<Element> = Vec::new();
    let mut root: Option<Element> = None;

    loop {
        let event = reader
            .read_event()
            .map_err(|e| malformed(format!("at byte {}: {e}", reader.buffer_position())))?;
        match event {
            Event::Start(start) => stack.push(Element::new(&start)),
            Event::Empty(start) => attach(&mut stack, &mut root, Element::new(&start))?,
            Event::End(_) => {
                let done = stack.pop().ok_or_else(|| malformed("unbalanced end tag"))?;
                attach(&mut stack, &mut root, done)?;
            }
            Event::Text(text) => {
                if let Some(parent) = stack.last_mut() {
                    let text = text.unescape().map_err(|e| malformed(e.to_string()))?;
                    parent.children.push(Node::Text(text.into_owned()));
                }
            }
            Event::CData(data) => {
                if let Some(parent) = stack.last_mut() {
                    let text = String::from_utf8_lossy(&data).into_owned();
                    parent.children.push(Node::Text(text));
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if !stack.is_empty() {
        return Err(malformed("unexpected end of document"));
    }
    root.ok_or_else(|| malformed("empty document"))
}

fn attach(
    stack: &mut [Element],
    root: &mut Option<Element>,
    element: Element,
) -> Result<(), TransportError> {
    match stack.last_mut() {
        Some(parent) => parent.children.push(Node::Element(element)),
        None if root.is_none() => *root = Some(element),
        None => return Err(malformed("more than one root element")),
    }
    Ok(())
}
