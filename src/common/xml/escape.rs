use aho_corasick::AhoCorasick;
use once_cell::sync::Lazy;

// Static initialization: automaton is built only once, thread-safe
static XML_ESCAPER: Lazy<AhoCorasick> = Lazy::new(|| {
    AhoCorasick::builder()
        .build(["&", "<", ">", "\"", "'"])
        .expect("Failed to build XML escaper")
});

/// Escape XML special characters.
///
/// # Examples
///
/// ```
/// use formwright::common::xml::escape_xml;
/// assert_eq!(escape_xml("a & b"), "a &amp; b");
/// assert_eq!(escape_xml("<tag>\"hello\"</tag>"), "&lt;tag&gt;&quot;hello&quot;&lt;/tag&gt;");
/// ```
#[inline]
pub fn escape_xml(s: &str) -> String {
    XML_ESCAPER.replace_all(s, &["&amp;", "&lt;", "&gt;", "&quot;", "&apos;"])
}

/// Decode character data as it appears between tags.
///
/// Handles the five predefined entities and decimal/hexadecimal character
/// references. Unknown or malformed references are left unchanged.
///
/// # Examples
///
/// ```
/// use formwright::common::xml::unescape_xml;
/// assert_eq!(unescape_xml("&lt;a &amp; b&gt;"), "<a & b>");
/// assert_eq!(unescape_xml("line&#10;break"), "line\nbreak");
/// assert_eq!(unescape_xml("&#x41;&#66;"), "AB");
/// assert_eq!(unescape_xml("&amp;lt;"), "&lt;");
/// assert_eq!(unescape_xml("&invalid;"), "&invalid;");
/// assert_eq!(unescape_xml("&amp"), "&amp");
/// ```
pub fn unescape_xml(s: &str) -> String {
    let bytes = s.as_bytes();
    let Some(first) = memchr::memchr(b'&', bytes) else {
        return s.to_string();
    };

    let mut out = String::with_capacity(s.len());
    out.push_str(&s[..first]);
    let mut pos = first;
    while pos < bytes.len() {
        if bytes[pos] != b'&' {
            let next = memchr::memchr(b'&', &bytes[pos..]).map_or(bytes.len(), |i| pos + i);
            out.push_str(&s[pos..next]);
            pos = next;
            continue;
        }
        // Entity names and references are short; bound the search for ';'
        let window_end = bytes.len().min(pos + 12);
        let decoded = memchr::memchr(b';', &bytes[pos + 1..window_end])
            .and_then(|i| decode_reference(&s[pos + 1..pos + 1 + i]).map(|c| (c, i + 2)));
        match decoded {
            Some((ch, consumed)) => {
                out.push(ch);
                pos += consumed;
            },
            None => {
                out.push('&');
                pos += 1;
            },
        }
    }
    out
}

fn decode_reference(name: &str) -> Option<char> {
    match name {
        "amp" => Some('&'),
        "lt" => Some('<'),
        "gt" => Some('>'),
        "quot" => Some('"'),
        "apos" => Some('\''),
        _ => {
            let digits = name.strip_prefix('#')?;
            let code = match digits.strip_prefix(['x', 'X']) {
                Some(hex) => u32::from_str_radix(hex, 16).ok()?,
                None => digits.parse::<u32>().ok()?,
            };
            char::from_u32(code).filter(|c| is_xml_char(*c))
        },
    }
}

/// Whether `c` may appear in an XML 1.0 document.
#[inline]
pub fn is_xml_char(c: char) -> bool {
    matches!(c,
        '\u{9}' | '\u{A}' | '\u{D}'
        | '\u{20}'..='\u{D7FF}'
        | '\u{E000}'..='\u{FFFD}'
        | '\u{10000}'..='\u{10FFFF}')
}

/// First character of `s` that cannot be represented in XML 1.0, if any.
#[inline]
pub fn first_illegal_char(s: &str) -> Option<char> {
    s.chars().find(|c| !is_xml_char(*c))
}
