use super::*;
use serde::Deserialize;

#[derive(Debug, Deserialize, PartialEq)]
struct Greeting {
    #[serde(rename = "@lang")]
    lang: String,
    #[serde(rename = "name")]
    names: Vec<String>,
}

#[test]
fn test_envelope_wraps_body_verbatim() {
    let body = r#"<a:doc xmlns:a="urn:a" id="x">text &amp; more</a:doc>"#;
    let xml = Envelope::new(body).to_xml();

    assert_eq!(
        xml,
        concat!(
            r#"<?xml version="1.0" encoding="UTF-8"?>"#,
            r#"<soap:Envelope xmlns:soap="http://schemas.xmlsoap.org/soap/envelope/">"#,
            r#"<soap:Body><a:doc xmlns:a="urn:a" id="x">text &amp; more</a:doc></soap:Body>"#,
            r#"</soap:Envelope>"#
        )
    );
    assert_eq!(Envelope::new(body).body(), body);
}

#[test]
fn test_from_str_ignores_layout_whitespace() {
    let xml = "<greeting lang=\"lt\">\n  <name>Jonas</name>\r\n  <name>Ona</name>\n</greeting>";
    let greeting: Greeting = from_str(xml).unwrap();

    assert_eq!(
        greeting,
        Greeting {
            lang: "lt".to_string(),
            names: vec!["Jonas".to_string(), "Ona".to_string()],
        }
    );
}

#[test]
fn test_from_str_reports_errors() {
    let result: Result<Greeting, _> = from_str("<greeting><name>x</name></greeting>");
    assert!(result.is_err());
}
