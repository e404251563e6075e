use quick_xml::events::{BytesStart, Event};
use quick_xml::{Reader, Writer};

use super::{Error, Result};

/// Attribute names accepted as element ids
const ID_ATTRIBUTES: [&[u8]; 3] = [b"id", b"Id", b"ID"];

/// Whether the element carries an unprefixed id attribute with this value
pub fn has_id(e: &BytesStart<'_>, id: &str) -> Result<bool> {
    for attr in e.attributes().with_checks(false) {
        let attr = attr?;
        if ID_ATTRIBUTES.contains(&attr.key.as_ref()) && attr.unescape_value()? == id {
            return Ok(true);
        }
    }
    Ok(false)
}

/// Namespace prefix of the element with the given id (`None` when unprefixed)
pub fn element_prefix_by_id(xml: &str, id: &str) -> Result<Option<String>> {
    let mut reader = Reader::from_str(xml);
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) | Event::Empty(e) if has_id(&e, id)? => {
                let name = e.name();
                return Ok(name
                    .prefix()
                    .map(|prefix| String::from_utf8_lossy(prefix.as_ref()).into_owned()));
            }
            Event::Eof => return Err(Error::MissingReference(format!("#{id}"))),
            _ => {}
        }
        buf.clear();
    }
}

/// Inserts `fragment` as the last child of the element with the given id
pub fn append_child_by_id(xml: &str, id: &str, fragment: &str) -> Result<String> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(false);
    reader.config_mut().expand_empty_elements = true;

    let mut writer = Writer::new(Vec::with_capacity(xml.len() + fragment.len()));
    let mut buf = Vec::new();
    let mut depth = 0usize;
    let mut found = false;

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) => {
                if depth > 0 {
                    depth += 1;
                } else if !found && has_id(&e, id)? {
                    found = true;
                    depth = 1;
                }
                writer.write_event(Event::Start(e))?;
            }
            Event::End(e) => {
                if depth > 0 {
                    depth -= 1;
                    if depth == 0 {
                        writer.get_mut().extend_from_slice(fragment.as_bytes());
                    }
                }
                writer.write_event(Event::End(e))?;
            }
            Event::Eof => break,
            event => writer.write_event(event)?,
        }
        buf.clear();
    }

    if !found {
        return Err(Error::MissingReference(format!("#{id}")));
    }
    Ok(String::from_utf8(writer.into_inner())?)
}
