//! Text passes around the CSS parser.
//!
//! lightningcss drops declarations it cannot parse and prints `url()`
//! arguments unquoted. Old stylesheets rely on both: IE targets
//! declarations with `*prop`, `_prop`, `value\9` and `!ie`, and on
//! `filter: progid:...`. Before parsing, each such declaration is swapped
//! for a numbered custom property the parser keeps, and swapped back in
//! the printed output. Quotes are restored on every `url()` argument that
//! was quoted in the source. Adjacent rules with identical bodies are
//! grouped after printing, since the merging pass itself stays off.

use std::collections::HashMap;

const MARKER: &str = "--lowband-hack-";

/// Which IE declaration hacks are carried through verbatim.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HackRules {
    /// `color: red !ie`
    pub bang: bool,
    /// `*zoom: 1`, `_height: 1px`
    pub prefix: bool,
    /// `width: 10px\9`
    pub suffix: bool,
    /// `filter: progid:...`, `filter: alpha(opacity=50)`, `-ms-filter`
    pub filters: bool,
}

impl HackRules {
    pub fn any(&self) -> bool {
        self.bang || self.prefix || self.suffix || self.filters
    }

    fn matches(&self, name: &str, value: &str) -> bool {
        (self.prefix && name.starts_with(['*', '_']))
            || (self.suffix && (value.ends_with("\\9") || value.ends_with("\\0")))
            || (self.bang && has_bang_ie(value))
            || (self.filters && is_ie_filter(name, value))
    }
}

fn has_bang_ie(value: &str) -> bool {
    let lower = value.to_ascii_lowercase();
    lower.match_indices('!').any(|(i, _)| {
        let rest = lower[i + 1..].trim_start();
        rest.strip_prefix("ie")
            .is_some_and(|tail| !tail.starts_with(|c: char| c.is_ascii_alphanumeric() || c == '-'))
    })
}

fn is_ie_filter(name: &str, value: &str) -> bool {
    let value = value.to_ascii_lowercase();
    (name.eq_ignore_ascii_case("filter") || name.eq_ignore_ascii_case("-ms-filter"))
        && (value.contains("progid:") || value.starts_with("alpha("))
}

/// CSS with its hack declarations replaced by placeholders.
#[derive(Debug)]
pub struct Protected {
    pub css: String,
    hacks: Vec<String>,
}

/// Replace hack declarations in `css` with placeholders.
///
/// `declarations_only` is set for `style` attribute bodies, where every
/// top-level segment is a declaration. Comments are dropped.
pub fn protect(css: &str, rules: &HackRules, declarations_only: bool) -> Protected {
    let mut out = String::with_capacity(css.len());
    let mut hacks = Vec::new();
    if !rules.any() {
        out.push_str(css);
        return Protected { css: out, hacks };
    }

    let mut segment = String::new();
    let mut depth = usize::from(declarations_only);
    let mut parens = 0usize;
    let mut chars = css.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '/' if chars.peek() == Some(&'*') => {
                chars.next();
                let mut last = '\0';
                for c in chars.by_ref() {
                    if last == '*' && c == '/' {
                        break;
                    }
                    last = c;
                }
                segment.push(' ');
            }
            '"' | '\'' => {
                segment.push(c);
                while let Some(s) = chars.next() {
                    segment.push(s);
                    if s == '\\' {
                        if let Some(escaped) = chars.next() {
                            segment.push(escaped);
                        }
                    } else if s == c || s == '\n' {
                        break;
                    }
                }
            }
            '\\' => {
                segment.push(c);
                if let Some(escaped) = chars.next() {
                    segment.push(escaped);
                }
            }
            '(' => {
                parens += 1;
                segment.push(c);
            }
            ')' => {
                parens = parens.saturating_sub(1);
                segment.push(c);
            }
            '{' if parens == 0 => {
                out.push_str(&segment);
                segment.clear();
                out.push(c);
                depth += 1;
            }
            ';' | '}' if parens == 0 => {
                flush(&mut segment, depth > 0, rules, &mut out, &mut hacks);
                out.push(c);
                if c == '}' {
                    depth = depth.saturating_sub(1);
                }
            }
            _ => segment.push(c),
        }
    }
    flush(&mut segment, depth > 0, rules, &mut out, &mut hacks);

    Protected { css: out, hacks }
}

fn flush(
    segment: &mut String,
    in_block: bool,
    rules: &HackRules,
    out: &mut String,
    hacks: &mut Vec<String>,
) {
    let hack = in_block
        .then(|| segment.split_once(':'))
        .flatten()
        .map(|(name, value)| (name.trim(), value.trim()))
        .filter(|(name, value)| rules.matches(name, value))
        .map(|(name, value)| format!("{name}:{value}"));

    match hack {
        Some(text) => {
            out.push_str(&format!("{MARKER}{}:0", hacks.len()));
            hacks.push(text);
        }
        None => out.push_str(segment),
    }
    segment.clear();
}

impl Protected {
    /// Put the hack declarations back into printed CSS.
    pub fn restore(&self, printed: &str) -> String {
        if self.hacks.is_empty() {
            return printed.to_string();
        }

        let mut out = String::with_capacity(printed.len());
        let mut rest = printed;
        while let Some(pos) = rest.find(MARKER) {
            out.push_str(&rest[..pos]);
            let after = &rest[pos + MARKER.len()..];
            let digits = after
                .find(|c: char| !c.is_ascii_digit())
                .unwrap_or(after.len());
            let hack = after[..digits]
                .parse::<usize>()
                .ok()
                .and_then(|i| self.hacks.get(i));

            match (hack, after[digits..].strip_prefix(':')) {
                (Some(hack), Some(value)) => {
                    out.push_str(hack);
                    let end = value.find([';', '}']).unwrap_or(value.len());
                    rest = &value[end..];
                }
                _ => {
                    out.push_str(MARKER);
                    rest = after;
                }
            }
        }
        out.push_str(rest);
        out
    }
}

/// Quote character of every quoted `url()` argument in `css`.
pub fn quoted_urls(css: &str) -> HashMap<String, char> {
    let lower = css.to_ascii_lowercase();
    let mut quotes = HashMap::new();
    let mut from = 0;

    while let Some(found) = lower[from..].find("url(") {
        let start = from + found + "url(".len();
        from = start;
        let args = css[start..].trim_start();
        let Some(quote @ ('"' | '\'')) = args.chars().next() else {
            continue;
        };
        if let Some(end) = args[1..].find(quote) {
            quotes.entry(args[1..1 + end].to_string()).or_insert(quote);
        }
    }
    quotes
}

/// Quote the unquoted `url()` arguments of `printed` that appear in
/// `quotes`. Strings are skipped.
pub fn requote_urls(printed: &str, quotes: &HashMap<String, char>) -> String {
    if quotes.is_empty() {
        return printed.to_string();
    }

    let bytes = printed.as_bytes();
    let mut out = String::with_capacity(printed.len() + 2 * quotes.len());
    let mut copied = 0;
    let mut i = 0;

    while i < bytes.len() {
        match bytes[i] {
            b'"' | b'\'' => i = skip_string(bytes, i),
            b'\\' => i += 2,
            b'(' if i >= 3 && bytes[i - 3..i].eq_ignore_ascii_case(b"url") => {
                let args = i + 1;
                let quoted = matches!(bytes.get(args), Some(b'"' | b'\''));
                match bytes[args..].iter().position(|&b| b == b')') {
                    Some(len) if !quoted => {
                        let arg = &printed[args..args + len];
                        if let Some(&quote) = quotes.get(arg) {
                            out.push_str(&printed[copied..args]);
                            out.push(quote);
                            out.push_str(arg);
                            out.push(quote);
                            copied = args + len;
                        }
                        i = args + len;
                    }
                    _ => i += 1,
                }
            }
            _ => i += 1,
        }
    }
    out.push_str(&printed[copied..]);
    out
}

/// Deepest nesting of `{`, `(` and `[` in `css`. Strings, escapes and
/// comments are skipped.
pub fn nesting_depth(css: &str) -> usize {
    let bytes = css.as_bytes();
    let (mut depth, mut deepest) = (0usize, 0usize);
    let mut i = 0;

    while i < bytes.len() {
        match bytes[i] {
            b'"' | b'\'' => {
                i = skip_string(bytes, i);
                continue;
            }
            b'/' if bytes.get(i + 1) == Some(&b'*') => {
                i = css[i + 2..].find("*/").map_or(bytes.len(), |end| i + 2 + end + 2);
                continue;
            }
            b'\\' => i += 1,
            b'{' | b'(' | b'[' => {
                depth += 1;
                deepest = deepest.max(depth);
            }
            b'}' | b')' | b']' => depth = depth.saturating_sub(1),
            _ => {}
        }
        i += 1;
    }
    deepest
}

fn skip_string(bytes: &[u8], start: usize) -> usize {
    let quote = bytes[start];
    let mut i = start + 1;
    while i < bytes.len() {
        match bytes[i] {
            b'\\' => i += 2,
            b if b == quote => return i + 1,
            _ => i += 1,
        }
    }
    bytes.len()
}

/// Group adjacent top-level rules whose bodies are identical, as in
/// `a{x}b{x}` → `a,b{x}`, keeping at most `limit` selectors per rule.
///
/// Rules with vendor-prefixed pseudo selectors are left alone: an old
/// engine drops a whole selector list when one entry is unknown to it.
pub fn group_selectors(css: &str, limit: usize) -> String {
    if limit == 0 {
        return css.to_string();
    }

    let mut out = String::with_capacity(css.len());
    let mut pending: Option<(String, usize, &str)> = None;

    for statement in top_level_statements(css) {
        let rule = plain_rule(statement).filter(|(selector, _)| !has_vendor_pseudo(selector));
        let Some((selector, body)) = rule else {
            flush_group(&mut out, pending.take());
            out.push_str(statement);
            continue;
        };

        let count = selector_count(selector);
        if let Some((group, grouped, group_body)) = pending.as_mut() {
            if *group_body == body && *grouped + count <= limit {
                group.push(',');
                group.push_str(selector);
                *grouped += count;
                continue;
            }
        }
        flush_group(&mut out, pending.take());
        pending = Some((selector.to_string(), count, body));
    }
    flush_group(&mut out, pending);
    out
}

fn flush_group(out: &mut String, group: Option<(String, usize, &str)>) {
    if let Some((selector, _, body)) = group {
        out.push_str(&selector);
        out.push('{');
        out.push_str(body);
        out.push('}');
    }
}

/// Split printed CSS into top-level statements: rules, at-rule blocks and
/// `;`-terminated at-rules.
fn top_level_statements(css: &str) -> Vec<&str> {
    let bytes = css.as_bytes();
    let mut statements = Vec::new();
    let mut start = 0;
    let mut depth = 0usize;
    let mut i = 0;

    while i < bytes.len() {
        match bytes[i] {
            b'"' | b'\'' => {
                i = skip_string(bytes, i);
                continue;
            }
            b'\\' => i += 1,
            b'{' => depth += 1,
            b'}' => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    statements.push(&css[start..=i]);
                    start = i + 1;
                }
            }
            b';' if depth == 0 => {
                statements.push(&css[start..=i]);
                start = i + 1;
            }
            _ => {}
        }
        i += 1;
    }
    if start < css.len() {
        statements.push(&css[start..]);
    }
    statements
}

/// Selector and body of a style rule without nested blocks.
fn plain_rule(statement: &str) -> Option<(&str, &str)> {
    if statement.starts_with('@') {
        return None;
    }
    let inner = statement.strip_suffix('}')?;
    let bytes = inner.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'"' | b'\'' => {
                i = skip_string(bytes, i);
                continue;
            }
            b'{' => break,
            _ => i += 1,
        }
    }
    let (selector, body) = (inner.get(..i)?, inner.get(i + 1..)?);
    (!selector.is_empty() && !body.contains(['{', '}'])).then_some((selector, body))
}

fn selector_count(selector: &str) -> usize {
    selector.split(',').count()
}

fn has_vendor_pseudo(selector: &str) -> bool {
    selector.contains(":-")
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: HackRules = HackRules {
        bang: true,
        prefix: true,
        suffix: true,
        filters: true,
    };

    #[test]
    fn test_hack_detection() {
        assert!(ALL.matches("*zoom", "1"));
        assert!(ALL.matches("_height", "1px"));
        assert!(ALL.matches("width", "10px\\9"));
        assert!(ALL.matches("color", "red !ie"));
        assert!(ALL.matches("color", "red ! IE"));
        assert!(ALL.matches("filter", "progid:DXImageTransform.Microsoft.Alpha(Opacity=80)"));
        assert!(ALL.matches("filter", "alpha(opacity=50)"));

        assert!(!ALL.matches("color", "red !important"));
        assert!(!ALL.matches("filter", "blur(2px)"));
        assert!(!ALL.matches("--custom", "1"));
        assert!(!ALL.matches("-webkit-box-flex", "1"));
    }

    #[test]
    fn test_protect_and_restore() {
        let protected = protect("div { *zoom: 1; width: 10px; color: red !ie }", &ALL, false);
        assert_eq!(
            protected.css,
            "div { --lowband-hack-0:0; width: 10px;--lowband-hack-1:0}"
        );
        let printed = "div{--lowband-hack-0:0;width:10px;--lowband-hack-1:0}";
        assert_eq!(
            protected.restore(printed),
            "div{*zoom:1;width:10px;color:red !ie}"
        );
    }

    #[test]
    fn test_selectors_and_strings_are_not_declarations() {
        let css = "* html .a{b:c} a[title=\"x;*y:z\"]{content:\"*a:b\"} @import url(x.css);";
        let protected = protect(css, &ALL, false);
        assert_eq!(protected.css, css);
    }

    #[test]
    fn test_data_urls_do_not_split_declarations() {
        let css = "a{background:url(data:image/png;base64,AAAA);_height:1px}";
        let protected = protect(css, &ALL, false);
        assert!(protected.css.contains("url(data:image/png;base64,AAAA)"));
        assert!(protected.css.ends_with("--lowband-hack-0:0}"));
    }

    #[test]
    fn test_style_attribute_mode() {
        let protected = protect("*display: inline; zoom: 1", &ALL, true);
        assert_eq!(protected.css, "--lowband-hack-0:0; zoom: 1");
    }

    #[test]
    fn test_disabled_rules_leave_css_alone() {
        let none = HackRules {
            bang: false,
            prefix: false,
            suffix: false,
            filters: false,
        };
        let protected = protect("a{*zoom:1}", &none, false);
        assert_eq!(protected.css, "a{*zoom:1}");
        assert_eq!(protected.restore("a{}"), "a{}");
    }

    #[test]
    fn test_url_quotes_restored() {
        let quotes = quoted_urls(r#"a{background:url("img/a.png")} b{background:URL( 'b.png' )} c{background:url(c.png)}"#);
        assert_eq!(quotes.get("img/a.png"), Some(&'"'));
        assert_eq!(quotes.get("b.png"), Some(&'\''));
        assert!(!quotes.contains_key("c.png"));

        let printed = r#"a{background:url(img/a.png)}b{background:url(b.png)}c{background:url(c.png)}d:after{content:"url(c.png)"}"#;
        assert_eq!(
            requote_urls(printed, &quotes),
            r#"a{background:url("img/a.png")}b{background:url('b.png')}c{background:url(c.png)}d:after{content:"url(c.png)"}"#
        );
    }

    #[test]
    fn test_already_quoted_urls_untouched() {
        let quotes = quoted_urls(r#"a{background:url("a b.png")}"#);
        let printed = r#"a{background:url("a b.png")}"#;
        assert_eq!(requote_urls(printed, &quotes), printed);
    }

    #[test]
    fn test_adjacent_identical_rules_grouped() {
        assert_eq!(
            group_selectors("h1{margin:0}h2{margin:0}p{color:red}h3{margin:0}", 8191),
            "h1,h2{margin:0}p{color:red}h3{margin:0}"
        );
        assert_eq!(
            group_selectors("a,b{x:1}c{x:1}d{x:1}", 3),
            "a,b,c{x:1}d{x:1}"
        );
    }

    #[test]
    fn test_grouping_stops_at_blocks_and_vendor_pseudos() {
        let css = "@import url(a.css);a{x:1}@media print{a{x:1}}b{x:1}::-moz-selection{c:d}::selection{c:d}";
        assert_eq!(group_selectors(css, 8191), css);
        assert_eq!(group_selectors("a{x:1}b{x:1}", 0), "a{x:1}b{x:1}");
    }

    #[test]
    fn test_nesting_depth() {
        assert_eq!(nesting_depth(""), 0);
        assert_eq!(nesting_depth("a{b:c}"), 1);
        assert_eq!(nesting_depth("@media print{a{width:calc(1px + (2px))}}"), 4);
        assert_eq!(nesting_depth("a{content:\"{{{((\"}/* [[[ */"), 1);
        assert_eq!(nesting_depth(&"a{".repeat(10_000)), 10_000);
    }
}
