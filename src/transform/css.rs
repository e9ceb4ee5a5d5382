//! CSS minification for legacy renderers.
//!
//! All minification goes through one constant [`CompatibilityProfile`].
//! The profile keeps output readable by old engines: no hex-alpha colors,
//! no shorthand merging, IE hacks and `url()` quotes carried through
//! verbatim, and adjacent rules with identical bodies grouped under one
//! selector list up to a fixed size.

use lightningcss::stylesheet::{MinifyOptions, ParserOptions, PrinterOptions, StyleAttribute, StyleSheet};
use lightningcss::targets::{Browsers, Targets};

use crate::error::{ProxyError, ProxyResult};
use crate::transform::css_hacks::{self, HackRules};

/// Switches controlling how aggressively CSS is rewritten.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompatibilityProfile {
    /// Allow `rgba()`/`hsla()` style colors and their hex-alpha shorthands.
    pub color_opacity: bool,
    /// Merge longhands into shorthands and merge overlapping rules.
    pub property_merging: bool,
    /// IE declaration hacks kept verbatim.
    pub hacks: HackRules,
    /// Keep the quotes of quoted `url()` arguments.
    pub url_quotes: bool,
    /// Most selectors a grouped rule may hold; 0 disables grouping.
    pub selector_merge_limit: usize,
}

/// The only profile the proxy uses.
pub const LEGACY_PROFILE: CompatibilityProfile = CompatibilityProfile {
    color_opacity: false,
    property_merging: false,
    hacks: HackRules {
        bang: true,
        prefix: true,
        suffix: true,
        filters: true,
    },
    url_quotes: true,
    selector_merge_limit: 8191,
};

/// Deepest `{`/`(`/`[` nesting handed to the parser, which recurses per
/// level.
pub const MAX_CSS_DEPTH: usize = 32;

const fn version(major: u32) -> Option<u32> {
    Some(major << 16)
}

fn css_error(e: impl std::fmt::Display) -> ProxyError {
    ProxyError::Css(e.to_string())
}

impl CompatibilityProfile {
    /// Browser targets the printer must stay compatible with.
    pub fn targets(&self) -> Targets {
        if self.color_opacity {
            return Targets::default();
        }
        Browsers {
            ie: version(6),
            firefox: version(2),
            safari: version(3),
            opera: version(9),
            chrome: version(4),
            ..Browsers::default()
        }
        .into()
    }

    fn parser_options<'i>(&self) -> ParserOptions<'i> {
        ParserOptions {
            error_recovery: true,
            ..ParserOptions::default()
        }
    }

    fn printer_options<'a>(&self) -> PrinterOptions<'a> {
        PrinterOptions {
            minify: true,
            targets: self.targets(),
            ..PrinterOptions::default()
        }
    }

    fn minify_options(&self) -> MinifyOptions {
        MinifyOptions {
            targets: self.targets(),
            ..MinifyOptions::default()
        }
    }

    /// Minify a complete stylesheet.
    pub fn minify_stylesheet(&self, css: &str) -> ProxyResult<String> {
        check_depth(css)?;
        let protected = css_hacks::protect(css, &self.hacks, false);
        let printed = {
            let mut sheet = StyleSheet::parse(&protected.css, self.parser_options()).map_err(css_error)?;
            if self.property_merging {
                sheet.minify(self.minify_options()).map_err(css_error)?;
            }
            sheet.to_css(self.printer_options()).map_err(css_error)?.code
        };

        let out = self.finish(css, protected.restore(&printed));
        Ok(css_hacks::group_selectors(&out, self.selector_merge_limit))
    }

    /// Minify the declaration list of a `style` attribute.
    pub fn minify_declarations(&self, css: &str) -> ProxyResult<String> {
        check_depth(css)?;
        let protected = css_hacks::protect(css, &self.hacks, true);
        let printed = {
            let mut attr = StyleAttribute::parse(&protected.css, self.parser_options()).map_err(css_error)?;
            if self.property_merging {
                attr.minify(self.minify_options());
            }
            attr.to_css(self.printer_options()).map_err(css_error)?.code
        };

        Ok(self.finish(css, protected.restore(&printed)))
    }

    fn finish(&self, source: &str, printed: String) -> String {
        if !self.url_quotes {
            return printed;
        }
        css_hacks::requote_urls(&printed, &css_hacks::quoted_urls(source))
    }
}

fn check_depth(css: &str) -> ProxyResult<()> {
    let depth = css_hacks::nesting_depth(css);
    if depth > MAX_CSS_DEPTH {
        return Err(ProxyError::Css(format!(
            "nesting depth {depth} exceeds {MAX_CSS_DEPTH}"
        )));
    }
    Ok(())
}

/// Run the CSS pipeline on a stylesheet response body.
pub fn transform(css: &str) -> ProxyResult<String> {
    LEGACY_PROFILE.minify_stylesheet(css)
}
