use ammonia;

/// Clean HTML content using the ammonia library.
///
/// Whitelist-based: safe tags (like <b>, <p>) are kept, dangerous tags (like
/// <script>, <iframe>) and attributes (like onclick) are stripped. Applied to
/// every teacher-entered text before it is stored and later shown to students.
pub fn clean_html(input: &str) -> String {
    ammonia::clean(input)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_scripts_keeps_text() {
        let cleaned = clean_html("What is 2 + 2?<script>alert(1)</script>");
        assert_eq!(cleaned, "What is 2 + 2?");
    }

    #[test]
    fn keeps_safe_markup() {
        assert_eq!(clean_html("<b>bold</b>"), "<b>bold</b>");
    }
}
