//! Exclusive XML Canonicalization (without comments) of a document subset.
//!
//! The whole document is read so that namespace declarations inherited by
//! the selected element resolve, but output starts at that element. Namespace
//! declarations are rendered where they are visibly used, plus any prefix in
//! the inclusive list.

use quick_xml::Reader;
use quick_xml::escape::unescape;
use quick_xml::events::{BytesStart, Event};
use std::borrow::Cow;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str;

use super::utils::has_id;
use super::{Error, Result};
use crate::soap::ns;

const XML_NAMESPACE: &[u8] = b"http://www.w3.org/XML/1998/namespace";
const DEFAULT_PREFIX_TOKEN: &str = "#default";

type NsMap = BTreeMap<Vec<u8>, Vec<u8>>;

/// Apex of the canonicalized subset
#[derive(Debug, Clone, Copy)]
pub enum Selector<'a> {
    /// The document element
    Root,
    /// First element whose `id` attribute equals the value
    Id(&'a str),
    /// First element with this expanded name
    Element {
        namespace: &'a str,
        local_name: &'a str,
    },
}

impl Selector<'_> {
    fn matches(&self, e: &BytesStart<'_>, declared: &NsMap) -> Result<bool> {
        match self {
            Selector::Root => Ok(true),
            Selector::Id(id) => has_id(e, id),
            Selector::Element {
                namespace,
                local_name,
            } => Ok(is_element(e, declared, namespace, local_name)),
        }
    }
}

impl fmt::Display for Selector<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Selector::Root => f.write_str("document element"),
            Selector::Id(id) => write!(f, "element with id '{id}'"),
            Selector::Element {
                namespace,
                local_name,
            } => write!(f, "{{{namespace}}}{local_name}"),
        }
    }
}

/// Canonicalize the subtree picked by `selector`.
///
/// `inclusive_prefixes` is the transform's PrefixList (`#default` names the
/// default namespace). With `enveloped`, every `dsig:Signature` inside the
/// subtree is left out.
pub fn canonicalize(
    xml: &str,
    selector: Selector<'_>,
    inclusive_prefixes: &[&str],
    enveloped: bool,
) -> Result<String> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(false);
    reader.config_mut().expand_empty_elements = true;

    let inclusive: BTreeSet<Vec<u8>> = inclusive_prefixes
        .iter()
        .map(|prefix| match *prefix {
            DEFAULT_PREFIX_TOKEN => Vec::new(),
            other => other.as_bytes().to_vec(),
        })
        .collect();

    let mut out = String::new();
    let mut buf = Vec::new();
    // Namespaces in scope, tracked for the whole document
    let mut declared_stack: Vec<NsMap> = vec![NsMap::new()];
    // Namespaces already output by an ancestor inside the subset
    let mut rendered_stack: Vec<NsMap> = Vec::new();
    let mut depth = 0usize;
    let mut skipped = 0usize;
    let mut found = false;

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) => {
                let declared = declare_namespaces(&e, declared_stack.last())?;
                if skipped > 0 {
                    skipped += 1;
                } else if depth == 0 {
                    if !found && selector.matches(&e, &declared)? {
                        found = true;
                        depth = 1;
                        let rendered =
                            write_start(&mut out, &e, &declared, &NsMap::new(), &inclusive)?;
                        rendered_stack.push(rendered);
                    }
                } else if enveloped && is_element(&e, &declared, ns::XMLDSIG, "Signature") {
                    skipped = 1;
                } else {
                    depth += 1;
                    let parent = rendered_stack.last().cloned().unwrap_or_default();
                    let rendered = write_start(&mut out, &e, &declared, &parent, &inclusive)?;
                    rendered_stack.push(rendered);
                }
                declared_stack.push(declared);
            }
            Event::End(e) => {
                declared_stack.pop();
                if skipped > 0 {
                    skipped -= 1;
                } else if depth > 0 {
                    out.push_str("</");
                    out.push_str(str::from_utf8(e.name().as_ref())?);
                    out.push('>');
                    rendered_stack.pop();
                    depth -= 1;
                    if depth == 0 {
                        break;
                    }
                }
            }
            Event::Text(e) if depth > 0 && skipped == 0 => {
                let raw = str::from_utf8(&e)?;
                let normalized = normalize_line_endings(raw);
                let text = unescape(&normalized)?;
                out.push_str(&escape_text_value(&text));
            }
            Event::CData(e) if depth > 0 && skipped == 0 => {
                // CDATA is normalized to text content
                let raw = str::from_utf8(&e)?;
                out.push_str(&escape_text_value(&normalize_line_endings(raw)));
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    if !found {
        return Err(Error::ElementNotFound(selector.to_string()));
    }
    if depth > 0 {
        return Err(Error::Xml(format!("{selector} is not closed")));
    }
    Ok(out)
}

fn declare_namespaces(e: &BytesStart<'_>, parent: Option<&NsMap>) -> Result<NsMap> {
    let mut declared = parent.cloned().unwrap_or_default();
    for attr in e.attributes().with_checks(false) {
        let attr = attr?;
        let key = attr.key.as_ref();
        let prefix = if key == b"xmlns" {
            Vec::new()
        } else if let Some(prefix) = key.strip_prefix(b"xmlns:") {
            prefix.to_vec()
        } else {
            continue;
        };
        if attr.value.is_empty() {
            declared.remove(&prefix);
        } else {
            declared.insert(prefix, attr.value.to_vec());
        }
    }
    Ok(declared)
}

fn split_name(name: &[u8]) -> (&[u8], &[u8]) {
    match name.iter().position(|&b| b == b':') {
        Some(pos) => (&name[..pos], &name[pos + 1..]),
        None => (&[], name),
    }
}

fn is_element(e: &BytesStart<'_>, declared: &NsMap, namespace: &str, local_name: &str) -> bool {
    let name = e.name();
    let (prefix, local) = split_name(name.as_ref());
    local == local_name.as_bytes()
        && declared.get(prefix).map(Vec::as_slice) == Some(namespace.as_bytes())
}

/// Normalize line endings to LF as C14N requires
fn normalize_line_endings(text: &str) -> Cow<'_, str> {
    if !text.contains('\r') {
        return Cow::Borrowed(text);
    }
    Cow::Owned(text.replace("\r\n", "\n").replace('\r', "\n"))
}

/// Escape attribute value per C14N rules.
fn escape_attr_value(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + s.len() / 4);
    for ch in s.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '"' => out.push_str("&quot;"),
            '\t' => out.push_str("&#x9;"),
            '\n' => out.push_str("&#xA;"),
            '\r' => out.push_str("&#xD;"),
            _ => out.push(ch),
        }
    }
    out
}

/// Escape text node value per C14N rules.
fn escape_text_value(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + s.len() / 4);
    for ch in s.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '\r' => out.push_str("&#xD;"),
            _ => out.push(ch),
        }
    }
    out
}

/// Writes the canonical start tag and returns the namespaces rendered so far.
fn write_start(
    out: &mut String,
    e: &BytesStart<'_>,
    declared: &NsMap,
    parent_rendered: &NsMap,
    inclusive: &BTreeSet<Vec<u8>>,
) -> Result<NsMap> {
    let name = e.name();
    let name_bytes = name.as_ref();

    let mut visibly_utilized = BTreeSet::new();
    visibly_utilized.insert(split_name(name_bytes).0.to_vec());

    let mut attrs = Vec::new();
    for attr in e.attributes().with_checks(false) {
        let attr = attr?;
        let key = attr.key.as_ref();
        if key == b"xmlns" || key.starts_with(b"xmlns:") {
            continue;
        }
        let (prefix, local) = split_name(key);
        let namespace = if prefix.is_empty() {
            Vec::new()
        } else if prefix == b"xml" {
            XML_NAMESPACE.to_vec()
        } else {
            visibly_utilized.insert(prefix.to_vec());
            declared.get(prefix).cloned().unwrap_or_default()
        };
        let value = attr.unescape_value()?.into_owned();
        attrs.push((namespace, local.to_vec(), key.to_vec(), value));
    }

    for prefix in inclusive {
        if declared.contains_key(prefix) {
            visibly_utilized.insert(prefix.clone());
        }
    }

    // BTreeSet order puts the default namespace first, then prefixes lexically
    let mut rendered = parent_rendered.clone();
    let mut render_ns = Vec::new();
    for prefix in visibly_utilized {
        if prefix == b"xml" {
            continue;
        }
        match declared.get(&prefix) {
            Some(uri) => {
                if parent_rendered.get(&prefix) != Some(uri) {
                    render_ns.push((prefix.clone(), uri.clone()));
                    rendered.insert(prefix, uri.clone());
                }
            }
            // An unbound default namespace is undeclared only if an output ancestor bound it
            None if prefix.is_empty()
                && parent_rendered.get(&prefix).is_some_and(|uri| !uri.is_empty()) =>
            {
                render_ns.push((prefix.clone(), Vec::new()));
                rendered.insert(prefix, Vec::new());
            }
            None => {}
        }
    }

    attrs.sort_by(|a, b| (&a.0, &a.1).cmp(&(&b.0, &b.1)));

    out.push('<');
    out.push_str(str::from_utf8(name_bytes)?);
    for (prefix, uri) in &render_ns {
        if prefix.is_empty() {
            out.push_str(" xmlns=\"");
        } else {
            out.push_str(" xmlns:");
            out.push_str(str::from_utf8(prefix)?);
            out.push_str("=\"");
        }
        out.push_str(&escape_attr_value(str::from_utf8(uri)?));
        out.push('"');
    }
    for (_, _, key, value) in &attrs {
        out.push(' ');
        out.push_str(str::from_utf8(key)?);
        out.push_str("=\"");
        out.push_str(&escape_attr_value(value));
        out.push('"');
    }
    out.push('>');

    Ok(rendered)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn root(xml: &str) -> String {
        canonicalize(xml, Selector::Root, &[], false).unwrap()
    }

    #[test]
    fn test_basic_canonicalization() {
        let xml = r#"<root><child attr="value">text</child></root>"#;
        assert_eq!(root(xml), r#"<root><child attr="value">text</child></root>"#);
    }

    #[test]
    fn test_attribute_escaping() {
        let xml = r#"<root attr="&lt;&quot;&#x9;&#xA;&#xD;">text</root>"#;
        assert!(root(xml).contains("&lt;&quot;&#x9;&#xA;&#xD;"));
    }

    #[test]
    fn test_text_escaping() {
        let xml = "<root>a &amp; b &gt; c &#xD; d\r\ne</root>";
        assert_eq!(root(xml), "<root>a &amp; b &gt; c &#xD; d\ne</root>");
    }

    #[test]
    fn test_empty_elements_expanded_and_comments_dropped() {
        let xml = r#"<?xml version="1.0"?><!-- header --><root><!-- c --><e/><?pi x?></root>"#;
        assert_eq!(root(xml), "<root><e></e></root>");
    }

    #[test]
    fn test_cdata_becomes_text() {
        let xml = "<root><![CDATA[a < b]]></root>";
        assert_eq!(root(xml), "<root>a &lt; b</root>");
    }

    #[test]
    fn test_attributes_sorted_by_namespace_then_name() {
        let xml = r#"<root xmlns:b="urn:b" xmlns:a="urn:a" z="1" b:y="2" a:x="3" c="4"/>"#;
        assert_eq!(
            root(xml),
            r#"<root xmlns:a="urn:a" xmlns:b="urn:b" c="4" z="1" a:x="3" b:y="2"></root>"#
        );
    }

    #[test]
    fn test_namespace_not_duplicated() {
        // Namespace declared on root should not be re-rendered on child
        let xml = r#"<root xmlns="http://example.com"><child>text</child></root>"#;
        let result = root(xml);
        assert_eq!(result.matches(r#"xmlns="http://example.com""#).count(), 1);
    }

    #[test]
    fn test_unused_namespace_dropped() {
        let xml = r#"<root xmlns:a="http://a.com"><child>text</child></root>"#;
        assert_eq!(root(xml), "<root><child>text</child></root>");
    }

    #[test]
    fn test_prefix_utilized_by_element() {
        let xml = r#"<root xmlns:a="http://a.com"><a:child>text</a:child></root>"#;
        assert!(root(xml).contains(r#"<a:child xmlns:a="http://a.com">"#));
    }

    #[test]
    fn test_prefix_utilized_by_attribute() {
        let xml = r#"<root xmlns:a="http://a.com"><child a:attr="value">text</child></root>"#;
        assert!(root(xml).contains(r#"<child xmlns:a="http://a.com" a:attr="value">"#));
    }

    #[test]
    fn test_inclusive_namespaces_with_prefix_list() {
        let xml =
            r#"<root xmlns:a="http://a.com" xmlns:b="http://b.com"><child>text</child></root>"#;
        let result = canonicalize(xml, Selector::Root, &["a"], false).unwrap();
        assert_eq!(result, r#"<root xmlns:a="http://a.com"><child>text</child></root>"#);
    }

    #[test]
    fn test_subset_inherits_namespace_context() {
        let xml = r#"<r xmlns:a="urn:a" xmlns:b="urn:b"><b:s><a:t>v</a:t></b:s></r>"#;
        let selector = Selector::Element {
            namespace: "urn:b",
            local_name: "s",
        };

        let exclusive = canonicalize(xml, selector, &[], false).unwrap();
        assert_eq!(exclusive, r#"<b:s xmlns:b="urn:b"><a:t xmlns:a="urn:a">v</a:t></b:s>"#);

        let inclusive = canonicalize(xml, selector, &["a"], false).unwrap();
        assert_eq!(inclusive, r#"<b:s xmlns:a="urn:a" xmlns:b="urn:b"><a:t>v</a:t></b:s>"#);
    }

    #[test]
    fn test_select_by_id_with_enveloped_signature() {
        let xml = concat!(
            r#"<env><a:root xmlns:a="urn:a" xmlns:b="urn:b" id="x"><a:child>t</a:child>"#,
            r#"<dsig:Signature xmlns:dsig="http://www.w3.org/2000/09/xmldsig#">"#,
            r#"<dsig:SignedInfo/></dsig:Signature></a:root></env>"#
        );

        let result = canonicalize(xml, Selector::Id("x"), &["a"], true).unwrap();
        assert_eq!(result, r#"<a:root xmlns:a="urn:a" id="x"><a:child>t</a:child></a:root>"#);

        let with_signature = canonicalize(xml, Selector::Id("x"), &["a"], false).unwrap();
        assert!(with_signature.contains("<dsig:Signature"));
    }

    #[test]
    fn test_default_namespace_token() {
        let xml = r#"<r xmlns="urn:d"><s id="x"/></r>"#;
        let result = canonicalize(xml, Selector::Id("x"), &["#default"], false).unwrap();
        assert_eq!(result, r#"<s xmlns="urn:d" id="x"></s>"#);
    }

    #[test]
    fn test_default_namespace_undeclared_for_output() {
        let xml = r#"<r xmlns="urn:d"><s xmlns=""/></r>"#;
        assert_eq!(root(xml), r#"<r xmlns="urn:d"><s xmlns=""></s></r>"#);
    }

    #[test]
    fn test_missing_selection() {
        let result = canonicalize("<root/>", Selector::Id("nope"), &[], false);
        assert!(matches!(result, Err(Error::ElementNotFound(_))));
    }

    #[test]
    fn test_line_ending_normalization() {
        assert_eq!(normalize_line_endings("hello\r\nworld\rtest"), "hello\nworld\ntest");
    }
}
