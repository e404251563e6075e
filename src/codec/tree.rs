use quick_xml::NsReader;
use quick_xml::events::Event;
use quick_xml::name::{Namespace, ResolveResult};

use crate::error::ProtocolError;

/// Attribute names a signature reference may point at
const ID_ATTRIBUTES: [&str; 3] = ["id", "Id", "ID"];

/// Owned, namespace-resolved element.
///
/// Responses are small, so decoding works on a fully built tree rather than
/// a streaming state machine; lookups then read like the document layout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Element {
    pub namespace: Option<String>,
    pub local_name: String,
    pub attributes: Vec<(String, String)>,
    pub children: Vec<Node>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Node {
    Element(Element),
    Text(String),
}

impl Element {
    fn new(namespace: Option<String>, local_name: String) -> Self {
        Self {
            namespace,
            local_name,
            attributes: Vec::new(),
            children: Vec::new(),
        }
    }

    pub fn is(&self, namespace: Option<&str>, local_name: &str) -> bool {
        self.local_name == local_name && self.namespace.as_deref() == namespace
    }

    /// Child elements in document order
    pub fn elements(&self) -> impl Iterator<Item = &Element> {
        self.children.iter().filter_map(|node| match node {
            Node::Element(element) => Some(element),
            Node::Text(_) => None,
        })
    }

    pub fn child(&self, namespace: Option<&str>, local_name: &str) -> Option<&Element> {
        self.elements().find(|e| e.is(namespace, local_name))
    }

    pub fn children<'a>(
        &'a self,
        namespace: Option<&'a str>,
        local_name: &'a str,
    ) -> impl Iterator<Item = &'a Element> + 'a {
        self.elements().filter(move |e| e.is(namespace, local_name))
    }

    /// First match in document order, the element itself included
    pub fn find(&self, namespace: Option<&str>, local_name: &str) -> Option<&Element> {
        if self.is(namespace, local_name) {
            return Some(self);
        }
        self.elements().find_map(|e| e.find(namespace, local_name))
    }

    /// Elements of this subtree carrying `id`, in document order
    pub fn with_id<'a>(&'a self, id: &str) -> Vec<&'a Element> {
        let mut found = Vec::new();
        self.collect_with_id(id, &mut found);
        found
    }

    fn collect_with_id<'a>(&'a self, id: &str, found: &mut Vec<&'a Element>) {
        if ID_ATTRIBUTES
            .iter()
            .any(|name| self.attribute(name) == Some(id))
        {
            found.push(self);
        }
        for element in self.elements() {
            element.collect_with_id(id, found);
        }
    }

    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    /// Direct text content with surrounding whitespace removed
    pub fn text(&self) -> String {
        self.raw_text().trim().to_string()
    }

    pub fn raw_text(&self) -> String {
        self.children
            .iter()
            .filter_map(|node| match node {
                Node::Text(text) => Some(text.as_str()),
                Node::Element(_) => None,
            })
            .collect()
    }
}

fn malformed(reason: impl ToString) -> ProtocolError {
    ProtocolError::MalformedXml(reason.to_string())
}

fn resolve_namespace(resolved: ResolveResult<'_>) -> Result<Option<String>, ProtocolError> {
    match resolved {
        ResolveResult::Bound(Namespace(uri)) => Ok(Some(String::from_utf8_lossy(uri).into_owned())),
        ResolveResult::Unbound => Ok(None),
        ResolveResult::Unknown(prefix) => Err(malformed(format!(
            "unbound namespace prefix '{}'",
            String::from_utf8_lossy(&prefix)
        ))),
    }
}

/// Parses a complete document into its root element
pub(crate) fn parse(xml: &str) -> Result<Element, ProtocolError> {
    let mut reader = NsReader::from_str(xml);
    reader.config_mut().trim_text(false);
    reader.config_mut().expand_empty_elements = true;

    let mut buf = Vec::new();
    let mut stack: Vec<Element> = Vec::new();
    let mut root: Option<Element> = None;

    loop {
        let (resolved, event) = reader.read_resolved_event_into(&mut buf).map_err(malformed)?;
        match event {
            Event::Start(e) => {
                if root.is_some() && stack.is_empty() {
                    return Err(malformed("more than one root element"));
                }
                let namespace = resolve_namespace(resolved)?;
                let local_name = String::from_utf8_lossy(e.local_name().as_ref()).into_owned();
                let mut element = Element::new(namespace, local_name);
                for attr in e.attributes() {
                    let attr = attr.map_err(malformed)?;
                    let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
                    let value = attr.unescape_value().map_err(malformed)?.into_owned();
                    element.attributes.push((key, value));
                }
                stack.push(element);
            }
            Event::End(_) => {
                let element = stack
                    .pop()
                    .ok_or_else(|| malformed("unexpected closing tag"))?;
                match stack.last_mut() {
                    Some(parent) => parent.children.push(Node::Element(element)),
                    None => root = Some(element),
                }
            }
            Event::Text(e) => {
                let text = e.unescape().map_err(malformed)?;
                match stack.last_mut() {
                    Some(parent) => parent.children.push(Node::Text(text.into_owned())),
                    None if text.trim().is_empty() => {}
                    None => return Err(malformed("text outside of the root element")),
                }
            }
            Event::CData(e) => {
                let text = String::from_utf8(e.into_inner().into_owned()).map_err(malformed)?;
                match stack.last_mut() {
                    Some(parent) => parent.children.push(Node::Text(text)),
                    None => return Err(malformed("CDATA outside of the root element")),
                }
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    if let Some(open) = stack.last() {
        return Err(malformed(format!("unclosed element '{}'", open.local_name)));
    }
    root.ok_or_else(|| malformed("document has no root element"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_resolves_namespaces() {
        let xml = r#"<?xml version="1.0"?>
            <a:root xmlns:a="urn:a" xmlns="urn:default" id="1">
                <a:item>one</a:item>
                <item>two &amp; three</item>
                <plain xmlns=""/>
            </a:root>"#;
        let root = parse(xml).unwrap();

        assert!(root.is(Some("urn:a"), "root"));
        assert_eq!(root.attribute("id"), Some("1"));
        assert_eq!(root.child(Some("urn:a"), "item").unwrap().text(), "one");
        assert_eq!(
            root.child(Some("urn:default"), "item").unwrap().text(),
            "two & three"
        );
        assert!(root.child(None, "plain").is_some());
        assert_eq!(root.elements().count(), 3);
    }

    #[test]
    fn test_find_searches_depth_first() {
        let xml = r#"<r xmlns:t="urn:t"><x><t:v>first</t:v></x><t:v>second</t:v></r>"#;
        let root = parse(xml).unwrap();

        assert_eq!(root.find(Some("urn:t"), "v").unwrap().text(), "first");
        assert!(root.find(None, "v").is_none());
    }

    #[test]
    fn test_with_id_lists_every_match() {
        let xml = r#"<r id="a"><x Id="b"><y ID="b"/></x><z id="c"/></r>"#;
        let root = parse(xml).unwrap();

        assert_eq!(root.with_id("a").len(), 1);
        let matches = root.with_id("b");
        assert_eq!(matches.len(), 2);
        assert_eq!(matches[0].local_name, "x");
        assert!(root.with_id("missing").is_empty());
    }

    #[test]
    fn test_cdata_and_raw_text() {
        let root = parse("<r>  <![CDATA[<b>]]>  </r>").unwrap();
        assert_eq!(root.raw_text(), "  <b>  ");
        assert_eq!(root.text(), "<b>");
    }

    #[test]
    fn test_malformed_documents() {
        for xml in [
            "",
            "not xml at all",
            "<a><b></a>",
            "<a><b></b>",
            "<a/><b/>",
            "<x:a/>",
            "<a>&unknown;</a>",
        ] {
            assert!(
                matches!(parse(xml), Err(ProtocolError::MalformedXml(_))),
                "accepted {xml:?}"
            );
        }
    }
}
