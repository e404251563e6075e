use quick_xml::escape::escape;

/// Name of the form field carrying the ticket
pub const TICKET_FIELD: &str = "ticket";

const FORM_NAME: &str = "REQUEST";

/// Renders the page that posts `ticket` to `action` as soon as it loads.
///
/// A submit button stays available when scripts are disabled.
pub fn auto_submit_page(action: &str, ticket: &str) -> String {
    format!(
        concat!(
            "<!DOCTYPE html>",
            "<html><head>",
            r#"<meta charset="utf-8">"#,
            r#"<meta name="viewport" content="width=device-width, initial-scale=1">"#,
            "<title>Redirecting to VIISP</title>",
            "<script>window.onload=function(){{document.forms['{form}'].submit();}}</script>",
            "</head><body>",
            "<p>Redirecting to the authentication service...</p>",
            r#"<form name="{form}" method="post" action="{action}">"#,
            r#"<input type="hidden" name="{field}" value="{ticket}"/>"#,
            r#"<noscript><button type="submit">Continue</button></noscript>"#,
            "</form>",
            "</body></html>"
        ),
        form = FORM_NAME,
        action = escape(action),
        field = TICKET_FIELD,
        ticket = escape(ticket),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_posts_ticket_to_action() {
        let page = auto_submit_page(
            "https://test.epaslaugos.lt/portal/external/services/authentication/v2",
            "ABC123",
        );

        assert!(page.contains(
            r#"<form name="REQUEST" method="post" action="https://test.epaslaugos.lt/portal/external/services/authentication/v2">"#
        ));
        assert!(page.contains(r#"<input type="hidden" name="ticket" value="ABC123"/>"#));
        assert!(page.contains("document.forms['REQUEST'].submit();"));
    }

    #[test]
    fn test_values_are_escaped() {
        let page = auto_submit_page("https://remote/?a=1&b=2", r#""><script>x</script>"#);

        assert!(page.contains(r#"action="https://remote/?a=1&amp;b=2""#));
        assert!(page.contains(r#"value="&quot;&gt;&lt;script&gt;x&lt;/script&gt;""#));
        assert_eq!(page.matches("<script>").count(), 1);
    }
}
