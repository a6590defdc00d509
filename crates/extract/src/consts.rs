use regex::Regex;
use std::sync::LazyLock;

macro_rules! regex {
    ($name:ident, $regex:expr) => {
        pub(crate) static $name: LazyLock<Regex> = LazyLock::new(|| Regex::new($regex).unwrap());
    };
}

// `00:01:02,345 --> 00:01:04,000`, optionally followed by SRT position hints.
regex!(
    TIMING_REGEX,
    r"^\s*(\d+):(\d{1,2}):(\d{1,2})[,.](\d{1,3})\s*-->\s*(\d+):(\d{1,2}):(\d{1,2})[,.](\d{1,3})"
);
// HTML-ish styling tags emitted by SRT muxers: <i>, </b>, <font color="...">.
regex!(HTML_TAG_REGEX, r"</?[A-Za-z][^>]*>");
// ASS/SSA override blocks that survive conversion: {\an8}, {\i1}.
regex!(OVERRIDE_REGEX, r"\{\\[^}]*\}");
// ASS hard and soft line breaks.
regex!(ASS_BREAK_REGEX, r"\\[Nnh]");
regex!(WHITESPACE_REGEX, r"\s+");
