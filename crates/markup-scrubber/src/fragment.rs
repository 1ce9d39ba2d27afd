//! Fixed markup shown in place of a denied item's body.

use quick_xml::escape::escape;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DenialFragment {
    /// Prefix for the wrapper's CSS classes.
    pub class_prefix: String,
    pub heading: String,
    pub message: String,
    pub home_url: String,
    pub back_label: String,
}

impl DenialFragment {
    pub fn render(&self) -> String {
        let prefix = escape(&self.class_prefix);
        format!(
            concat!(
                r#"<div class="{prefix}_403">"#,
                r#"<div class="{prefix}_403_icon"><i class="fa fa-lock"></i></div>"#,
                r#"<div class="{prefix}_403_heading"><h2><span>{heading}</span></h2></div>"#,
                r#"<p>{message}</p>"#,
                r#"<div><a href="{home}" class="btn btn-default"><i class="fa fa-arrow-left"></i>{back}</a></div>"#,
                r#"</div>"#,
            ),
            prefix = prefix,
            heading = escape(&self.heading),
            message = escape(&self.message),
            home = escape(&self.home_url),
            back = escape(&self.back_label),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fragment() -> DenialFragment {
        DenialFragment {
            class_prefix: "pcr-rpbr".into(),
            heading: "Restricted Content".into(),
            message: "Apologies, you do not have the proper permissions to access this page."
                .into(),
            home_url: "https://example.com/?lang=en&x=1".into(),
            back_label: "Back on the home page".into(),
        }
    }

    #[test]
    fn renders_heading_message_and_home_link() {
        let html = fragment().render();
        assert!(html.starts_with(r#"<div class="pcr-rpbr_403">"#));
        assert!(html.contains("<h2><span>Restricted Content</span></h2>"));
        assert!(html.contains("proper permissions"));
        assert!(html.contains(r#"href="https://example.com/?lang=en&amp;x=1""#));
    }

    #[test]
    fn copy_is_escaped() {
        let mut denial = fragment();
        denial.heading = "<script>alert(1)</script>".into();
        let html = denial.render();
        assert!(!html.contains("<script>"));
        assert!(html.contains("&lt;script&gt;"));
    }
}
