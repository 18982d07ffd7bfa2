//! Thin helpers layered over `quick_xml`, shared by the schema, linkbase
//! and instance parsers. Kept deliberately small: full XML-Schema
//! validation is an external collaborator's job, this crate only needs
//! enough XML to walk XBRL's document shapes.

use crate::error::Error;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

/// Split a qualified name `prefix:local` into its parts. Names with no
/// colon have an empty prefix (the default namespace).
pub fn split_qname(name: &str) -> (&str, &str) {
    match name.split_once(':') {
        Some((prefix, local)) => (prefix, local),
        None => ("", name),
    }
}

/// Local (namespace-stripped) name of a tag, e.g. `link:presentationLink`
/// -> `presentationLink`.
pub fn local_name(name: &str) -> &str {
    split_qname(name).1
}

/// Read every attribute of a start/empty tag into `(name, value)` pairs,
/// decoding entities. Attribute names keep their prefix (`xlink:href`,
/// `xbrldt:contextElement`, ...) since callers match on the full name.
pub fn read_attributes(tag: &BytesStart) -> Result<Vec<(String, String)>, Error> {
    let mut out = Vec::new();
    for attr in tag.attributes() {
        let attr = attr.map_err(|e| Error::XmlParse(e.to_string()))?;
        let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
        let value = attr
            .unescape_value()
            .map(|v| v.into_owned())
            .unwrap_or_default();
        out.push((key, value));
    }
    Ok(out)
}

pub fn attr<'a>(attrs: &'a [(String, String)], name: &str) -> Option<&'a str> {
    attrs
        .iter()
        .find(|(n, _)| n == name || local_name(n) == name)
        .map(|(_, v)| v.as_str())
}

/// Collect the text content (including CDATA) up to the matching end tag
/// for the element currently open on `reader`. Nested elements are kept
/// verbatim as their serialized form (used for `xbrldi:typedMember`
/// content, which must round-trip as XML, not plain text).
pub fn read_inner_xml(reader: &mut Reader<&[u8]>, buf: &mut Vec<u8>) -> Result<String, Error> {
    let mut depth = 0i32;
    let mut content = String::new();
    loop {
        buf.clear();
        match reader
            .read_event_into(buf)
            .map_err(|e| Error::XmlParse(e.to_string()))?
        {
            Event::Start(ref e) => {
                depth += 1;
                content.push('<');
                content.push_str(&String::from_utf8_lossy(e.as_ref()));
                content.push('>');
            }
            Event::Empty(ref e) => {
                content.push('<');
                content.push_str(&String::from_utf8_lossy(e.as_ref()));
                content.push_str("/>");
            }
            Event::End(ref e) => {
                if depth == 0 {
                    return Ok(content);
                }
                depth -= 1;
                content.push_str("</");
                content.push_str(&String::from_utf8_lossy(e.name().as_ref()));
                content.push('>');
            }
            Event::Text(t) => {
                content.push_str(&t.unescape().unwrap_or_default());
            }
            Event::CData(t) => {
                content.push_str(&String::from_utf8_lossy(t.as_ref()));
            }
            Event::Eof => return Ok(content),
            _ => {}
        }
    }
}

/// Read plain text content up to the matching end tag, decoding CDATA and
/// entities but dropping nested markup (used for simple fact/element text).
pub fn read_text(reader: &mut Reader<&[u8]>, buf: &mut Vec<u8>) -> Result<String, Error> {
    let mut depth = 0i32;
    let mut content = String::new();
    loop {
        buf.clear();
        match reader
            .read_event_into(buf)
            .map_err(|e| Error::XmlParse(e.to_string()))?
        {
            Event::Start(_) => depth += 1,
            Event::End(_) => {
                if depth == 0 {
                    return Ok(content);
                }
                depth -= 1;
            }
            Event::Text(t) => content.push_str(&t.unescape().unwrap_or_default()),
            Event::CData(t) => content.push_str(&String::from_utf8_lossy(t.as_ref())),
            Event::Eof => return Ok(content),
            _ => {}
        }
    }
}

/// A minimal in-memory tree for elements whose shape isn't known in
/// advance (instance contexts: entity/segment/period/scenario nest a
/// handful of optional children). Not used for taxonomy documents, whose
/// shapes are simple enough to stream directly.
#[derive(Debug, Clone)]
pub struct XmlNode {
    pub local: String,
    pub attrs: Vec<(String, String)>,
    pub text: String,
    pub children: Vec<XmlNode>,
}

impl XmlNode {
    pub fn attr(&self, name: &str) -> Option<&str> {
        attr(&self.attrs, name)
    }

    pub fn child(&self, local: &str) -> Option<&XmlNode> {
        self.children.iter().find(|c| c.local == local)
    }

    pub fn children_named<'a>(&'a self, local: &'a str) -> impl Iterator<Item = &'a XmlNode> {
        self.children.iter().filter(move |c| c.local == local)
    }
}

/// Read the current element (everything up to its matching end tag) into
/// an `XmlNode` tree. Call immediately after consuming the element's own
/// `Start` event.
pub fn read_node(
    reader: &mut Reader<&[u8]>,
    buf: &mut Vec<u8>,
    full_name: &str,
    attrs: Vec<(String, String)>,
) -> Result<XmlNode, Error> {
    let mut text = String::new();
    let mut children = Vec::new();
    loop {
        buf.clear();
        match reader
            .read_event_into(buf)
            .map_err(|e| Error::XmlParse(e.to_string()))?
        {
            Event::Start(ref e) => {
                let cname = String::from_utf8_lossy(e.name().as_ref()).into_owned();
                let cattrs = read_attributes(e)?;
                children.push(read_node(reader, buf, &cname, cattrs)?);
            }
            Event::Empty(ref e) => {
                let cname = String::from_utf8_lossy(e.name().as_ref()).into_owned();
                let cattrs = read_attributes(e)?;
                children.push(XmlNode {
                    local: local_name(&cname).to_string(),
                    attrs: cattrs,
                    text: String::new(),
                    children: Vec::new(),
                });
            }
            Event::Text(t) => text.push_str(&t.unescape().unwrap_or_default()),
            Event::CData(t) => text.push_str(&String::from_utf8_lossy(t.as_ref())),
            Event::End(_) => {
                return Ok(XmlNode {
                    local: local_name(full_name).to_string(),
                    attrs,
                    text,
                    children,
                })
            }
            Event::Eof => {
                return Ok(XmlNode {
                    local: local_name(full_name).to_string(),
                    attrs,
                    text,
                    children,
                })
            }
            _ => {}
        }
    }
}

/// Skip to the matching end tag without collecting content.
pub fn skip_element(reader: &mut Reader<&[u8]>, buf: &mut Vec<u8>) -> Result<(), Error> {
    let mut depth = 0i32;
    loop {
        buf.clear();
        match reader
            .read_event_into(buf)
            .map_err(|e| Error::XmlParse(e.to_string()))?
        {
            Event::Start(_) => depth += 1,
            Event::End(_) => {
                if depth == 0 {
                    return Ok(());
                }
                depth -= 1;
            }
            Event::Eof => return Ok(()),
            _ => {}
        }
    }
}
