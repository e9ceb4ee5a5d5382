//! HTML pipeline.
//!
//! ```text
//! raw text
//!     → downgrade https:// (textual)
//!     → parse into dom::Document
//!     → strip scripts / unwrap noscript      (strip_js, not friendly)
//!     → strip styles and class/style attrs   (strip_css, not friendly)
//!     → drop SVG images, size the rest       (minify_images, not friendly)
//!     → anchor root-relative hrefs at origin
//!     → serialize, unescape &apos;
//!     → minify                               (not friendly)
//! ```

use futures_util::future::join_all;
use minify_html::Cfg;
use url::Url;

use crate::config::TransformConfig;
use crate::transform::context::RequestContext;
use crate::transform::css::LEGACY_PROFILE;
use crate::transform::dimensions::{self, Dimensions};
use crate::transform::dom::{Document, NodeData, NodeId};
use crate::transform::links;
use crate::upstream::Fetch;

/// Deepest nesting handed to minify-html, whose parser recurses per level.
const MAX_MINIFY_DEPTH: usize = 512;

/// Run the HTML pipeline over a page.
pub async fn transform(
    html: &str,
    ctx: &RequestContext,
    config: &TransformConfig,
    fetcher: &dyn Fetch,
) -> String {
    let normalized = links::downgrade_secure_urls(html);
    let mut doc = Document::parse(&normalized);

    if !ctx.friendly {
        if config.strip_js {
            strip_scripts(&mut doc);
        }
        if config.strip_css {
            strip_styles(&mut doc);
        }
        if config.minify_images {
            size_images(&mut doc, ctx, config.max_inline_width, fetcher).await;
        }
    }

    rewrite_root_relative(&mut doc, &ctx.origin);

    if ctx.friendly {
        return serialize(&doc);
    }
    if !config.strip_css {
        minify_inline_css(&mut doc);
    }
    let depth = doc.depth();
    if depth > MAX_MINIFY_DEPTH {
        tracing::warn!(url = %ctx.target, depth, "Document too deeply nested to minify");
        return serialize(&doc);
    }
    minify(&serialize(&doc))
}

fn serialize(doc: &Document) -> String {
    doc.serialize().replace("&apos;", "'")
}

/// Remove `<script>` and replace each `<noscript>` with its children.
pub fn strip_scripts(doc: &mut Document) {
    for id in doc.elements_named("script") {
        doc.detach(id);
    }
    for id in doc.elements_named("noscript") {
        doc.promote_children(id);
        doc.detach(id);
    }
}

/// Remove `<style>`, stylesheet `<link>`s and every `class`/`style` attribute.
pub fn strip_styles(doc: &mut Document) {
    let sheets = doc.select(|el| {
        el.name == "style" || (el.name == "link" && el.has_token("rel", "stylesheet"))
    });
    for id in sheets {
        doc.detach(id);
    }
    for id in doc.select(|el| el.has_attr("class") || el.has_attr("style")) {
        if let Some(el) = doc.element_mut(id) {
            el.remove_attr("class");
            el.remove_attr("style");
        }
    }
}

/// Pixel value of a `width`/`height` attribute (`"120"`, `"120px"`).
fn parse_pixels(value: &str) -> Option<f64> {
    let value = value.trim();
    let value = value.strip_suffix("px").unwrap_or(value).trim_end();
    value.parse::<f64>().ok().filter(|v| v.is_finite() && *v > 0.0)
}

/// Width capped at `cap` and the height that keeps the `width`:`height`
/// ratio, both rounded to whole pixels.
pub fn scale_to_cap(cap: u32, width: f64, height: Option<f64>) -> (u32, Option<u32>) {
    let new_width = width.min(cap as f64);
    let new_height = height.map(|h| (h * new_width / width).round().max(1.0) as u32);
    (new_width.round().max(1.0) as u32, new_height)
}

fn is_svg(url: &Url) -> bool {
    url.path().to_ascii_lowercase().ends_with(".svg")
}

/// How an image gets its new size.
enum Sizing {
    /// Both attributes present and in pixels.
    Declared { width: f64, height: f64 },
    /// Width declared, height follows the natural aspect ratio.
    WidthOnly { width: f64 },
    /// Nothing usable declared.
    Natural,
}

async fn size_images(doc: &mut Document, ctx: &RequestContext, cap: u32, fetcher: &dyn Fetch) {
    let mut pending: Vec<(NodeId, Url, Sizing)> = Vec::new();

    for id in doc.elements_named("img") {
        let Some(el) = doc.element(id) else { continue };
        let src = el.attr("src").and_then(|s| ctx.resolve(s));
        let width_attr = el.attr("width").map(str::to_string);
        let height = el.attr("height").and_then(parse_pixels);

        if src.as_ref().is_some_and(is_svg) {
            doc.detach(id);
            continue;
        }

        let sizing = match width_attr.as_deref().map(parse_pixels) {
            Some(Some(width)) => match height {
                Some(height) => Sizing::Declared { width, height },
                None => Sizing::WidthOnly { width },
            },
            // width="50%" and friends are left to the browser
            Some(None) => continue,
            None => Sizing::Natural,
        };

        if let Sizing::Declared { width, height } = sizing {
            set_size(doc, id, scale_to_cap(cap, width, Some(height)));
            continue;
        }
        match src {
            Some(url) => pending.push((id, url, sizing)),
            None => {
                if let Sizing::WidthOnly { width } = sizing {
                    set_size(doc, id, scale_to_cap(cap, width, None));
                }
            }
        }
    }

    let resolved = join_all(
        pending
            .iter()
            .map(|(_, url, _)| dimensions::resolve(fetcher, &ctx.dimensions, url)),
    )
    .await;

    for ((id, url, sizing), result) in pending.into_iter().zip(resolved) {
        let natural = match result {
            Ok(dims) => Some(dims),
            Err(e) => {
                tracing::warn!(url = %url, error = %e, "Could not resolve image dimensions");
                None
            }
        };
        match (sizing, natural) {
            (Sizing::Natural, Some(Dimensions { width, height })) if width > 0 => {
                set_size(doc, id, scale_to_cap(cap, width as f64, Some(height as f64)));
            }
            (Sizing::WidthOnly { width }, Some(dims)) if dims.width > 0 => {
                let height = width * dims.height as f64 / dims.width as f64;
                set_size(doc, id, scale_to_cap(cap, width, Some(height)));
            }
            (Sizing::WidthOnly { width }, _) => {
                set_size(doc, id, scale_to_cap(cap, width, None));
            }
            _ => {}
        }
    }
}

fn set_size(doc: &mut Document, id: NodeId, (width, height): (u32, Option<u32>)) {
    if let Some(el) = doc.element_mut(id) {
        el.set_attr("width", width.to_string());
        if let Some(height) = height {
            el.set_attr("height", height.to_string());
        }
    }
}

/// Anchor every root-relative `href` at `origin`.
pub fn rewrite_root_relative(doc: &mut Document, origin: &str) {
    for id in doc.select(|el| el.attr("href").is_some_and(links::is_root_relative)) {
        if let Some(el) = doc.element_mut(id) {
            if let Some(absolute) = el.attr("href").and_then(|href| links::absolutize(href, origin)) {
                el.set_attr("href", absolute);
            }
        }
    }
}

/// Minify `<style>` bodies and `style` attributes with the legacy profile.
/// CSS that fails to parse is left as it was.
fn minify_inline_css(doc: &mut Document) {
    for style in doc.elements_named("style") {
        let texts: Vec<NodeId> = doc.children(style).to_vec();
        for text in texts {
            if let NodeData::Text(css) = doc.data_mut(text) {
                match LEGACY_PROFILE.minify_stylesheet(css) {
                    Ok(min) => *css = min,
                    Err(e) => tracing::warn!(error = %e, "Keeping unminified <style> block"),
                }
            }
        }
    }

    for id in doc.select(|el| el.has_attr("style")) {
        let Some(el) = doc.element_mut(id) else { continue };
        let Some(css) = el.attr("style") else { continue };
        match LEGACY_PROFILE.minify_declarations(css) {
            Ok(min) => el.set_attr("style", min),
            Err(e) => tracing::warn!(error = %e, "Keeping unminified style attribute"),
        }
    }
}

/// Collapse whitespace, drop comments, shorten boolean attributes.
///
/// Closing tags and optional `<html>`/`<head>` tags are kept; old parsers
/// do not infer them reliably.
pub fn minify(html: &str) -> String {
    let cfg = Cfg {
        keep_closing_tags: true,
        keep_html_and_head_opening_tags: true,
        keep_comments: false,
        minify_css: false,
        minify_js: false,
        ..Cfg::new()
    };
    String::from_utf8_lossy(&minify_html::minify(html.as_bytes(), &cfg)).into_owned()
}
