// src/utils/html.rs

/// Sanitizes a free-text explanation before it reaches a result page.
///
/// Answer descriptions come from instructors, notes from learners, and both
/// are rendered as HTML. Safe inline markup such as `<b>` or `<p>` survives;
/// `<script>` and `<style>` disappear together with their content.
pub fn clean_html(input: &str) -> String {
    ammonia::clean(input)
}

/// [`clean_html`] for optional fields. Blank input, or input that sanitizes
/// down to nothing, becomes `None`.
pub fn clean_description(input: Option<&str>) -> Option<String> {
    let cleaned = clean_html(input?.trim());
    if cleaned.trim().is_empty() {
        None
    } else {
        Some(cleaned)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keeps_safe_markup() {
        assert_eq!(clean_html("<p>See <b>chapter 2</b></p>"), "<p>See <b>chapter 2</b></p>");
    }

    #[test]
    fn strips_scripts_with_content() {
        let cleaned = clean_html("<p>ok</p><script>steal()</script>");
        assert_eq!(cleaned, "<p>ok</p>");
    }

    #[test]
    fn empty_descriptions_vanish() {
        assert_eq!(clean_description(None), None);
        assert_eq!(clean_description(Some("   ")), None);
        assert_eq!(clean_description(Some("<script>x()</script>")), None);
        assert_eq!(clean_description(Some(" note ")).as_deref(), Some("note"));
    }
}
