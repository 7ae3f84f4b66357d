//! Add `srcset` attributes to `<img>` tags in generated HTML.
//!
//! Runs after the raster pass has written `photo@2x.jpg` and friends, so each
//! local JPEG/PNG image can advertise its density variants:
//!
//! ```text
//! <img src="/img/photo.jpg" alt="">
//! <img src="/img/photo.jpg" srcset="/img/photo.jpg 1x, /img/photo@2x.jpg 2x, /img/photo@3x.jpg 3x" alt="">
//! ```
//!
//! Tags that already carry a `srcset`, remote or `data:` URLs, and other
//! formats are left untouched.

use crate::config::VariantRule;
use crate::imaging::RASTER_EXTENSIONS;
use regex::{Captures, Regex};
use std::borrow::Cow;
use std::sync::LazyLock;

static IMG_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<img\b[^>]*>").expect("img tag regex must compile"));

static SRC_ATTR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)(\s)src\s*=\s*(?:"([^"]*)"|'([^']*)')"#).expect("src regex must compile")
});

static SRCSET_ATTR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\ssrcset\s*=").expect("srcset regex must compile"));

/// True for a local URL pointing at a JPEG or PNG file.
fn is_local_raster(url: &str) -> bool {
    let lower = url.to_ascii_lowercase();
    if lower.starts_with("http:")
        || lower.starts_with("https:")
        || lower.starts_with("//")
        || lower.starts_with("data:")
    {
        return false;
    }
    let path = lower.split(['?', '#']).next().unwrap_or("");
    path.rsplit_once('.')
        .is_some_and(|(_, ext)| RASTER_EXTENSIONS.contains(&ext))
}

/// Insert `suffix` before the extension of a URL, keeping any query or fragment.
pub fn suffixed_url(url: &str, suffix: &str) -> String {
    let split_at = url.find(['?', '#']).unwrap_or(url.len());
    let (path, tail) = url.split_at(split_at);
    match path.rfind('.') {
        Some(dot) if !path[dot..].contains('/') => {
            format!("{}{}{}{}", &path[..dot], suffix, &path[dot..], tail)
        }
        _ => format!("{}{}{}", path, suffix, tail),
    }
}

/// Build the `srcset` value for `url`, ordered by density.
pub fn srcset_for(url: &str, rules: &[VariantRule]) -> String {
    let mut rules: Vec<&VariantRule> = rules.iter().collect();
    rules.sort_by_key(|r| r.density);
    rules
        .iter()
        .map(|r| format!("{} {}x", suffixed_url(url, &r.suffix), r.density))
        .collect::<Vec<_>>()
        .join(", ")
}

fn rewrite_tag(tag: &str, rules: &[VariantRule]) -> Option<String> {
    if SRCSET_ATTR.is_match(tag) {
        return None;
    }
    let caps = SRC_ATTR.captures(tag)?;
    let url = caps.get(2).or_else(|| caps.get(3))?.as_str();
    if !is_local_raster(url) {
        return None;
    }
    let src = caps.get(0)?;
    let srcset = srcset_for(url, rules);
    Some(format!(
        "{} srcset=\"{}\"{}",
        &tag[..src.end()],
        srcset,
        &tag[src.end()..]
    ))
}

/// Rewrite every eligible `<img>` tag in `html`.
///
/// Returns `Cow::Borrowed` when nothing changed so callers can skip the write.
pub fn add_srcset<'a>(html: &'a str, rules: &[VariantRule]) -> Cow<'a, str> {
    let mut changed = false;
    let rewritten = IMG_TAG.replace_all(html, |caps: &Captures| {
        let tag = &caps[0];
        match rewrite_tag(tag, rules) {
            Some(new_tag) => {
                changed = true;
                new_tag
            }
            None => tag.to_string(),
        }
    });
    if changed {
        Cow::Owned(rewritten.into_owned())
    } else {
        Cow::Borrowed(html)
    }
}
