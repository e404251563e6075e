use quick_xml::de::from_str as quick_xml_from_str;
use quick_xml::events::Event;
use quick_xml::{DeError, Reader, Writer};
use serde::Deserialize;

/// Deserialize an instance of type T from a string of XML text.
///
/// Whitespace-only text between elements (indentation, line breaks in
/// canonical output) is dropped first, otherwise it would surface as
/// unexpected `$text` content.
pub fn from_str<T>(xml: &str) -> Result<T, DeError>
where
    T: for<'de> Deserialize<'de>,
{
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(false);

    let mut buf = Vec::new();
    let mut writer = Writer::new(Vec::with_capacity(xml.len()));

    loop {
        let event = match reader.read_event_into(&mut buf)? {
            Event::Eof => break,
            Event::Text(e) if e.iter().all(u8::is_ascii_whitespace) => None,
            event => Some(event),
        };
        if let Some(event) = event {
            writer
                .write_event(event)
                .map_err(|e| DeError::Custom(e.to_string()))?;
        }
        buf.clear();
    }

    let normalized =
        String::from_utf8(writer.into_inner()).map_err(|e| DeError::Custom(e.to_string()))?;
    quick_xml_from_str(&normalized)
}
