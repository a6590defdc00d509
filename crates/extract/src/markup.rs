use crate::consts::{ASS_BREAK_REGEX, HTML_TAG_REGEX, OVERRIDE_REGEX, WHITESPACE_REGEX};

/// Strip styling markup from subtitle text and flatten it onto one line.
///
/// # Examples
///
/// ```
/// use subclipper_extract::strip_markup;
/// assert_eq!(strip_markup("<i>Hello</i>\nthere"), "Hello there");
/// assert_eq!(strip_markup(r"{\an8}Top\Nof the screen"), "Top of the screen");
/// ```
pub fn strip_markup(text: &str) -> String {
    let text = OVERRIDE_REGEX.replace_all(text, "");
    let text = HTML_TAG_REGEX.replace_all(&text, "");
    let text = ASS_BREAK_REGEX.replace_all(&text, " ");
    WHITESPACE_REGEX.replace_all(&text, " ").trim().to_string()
}
