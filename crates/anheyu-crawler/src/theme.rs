//! Themed CSS extraction: the fallback strategy when a site exposes no feed.
//!
//! Themes are tried in [`ThemeRules`]'s fixed iteration order; the first theme
//! whose four fields (title, link, created, updated) resolve to equally long,
//! non-empty value arrays wins. `updated` is the one field allowed to fall
//! short — any missing trailing entries are filled in from `created`.

use anheyu_types::{FieldRule, RuleAttr, ThemeFieldRules, ThemeRules};
use scraper::{Html, Selector};
use url::Url;

/// One field's worth of extracted (title|link|created|updated) raw strings,
/// in document order, aligned across fields by index.
struct ExtractedFields {
    title: Vec<String>,
    link: Vec<String>,
    created: Vec<String>,
    updated: Vec<String>,
}

/// Try every theme in order against `html`; return the winning theme's name
/// and its per-post `(title, link, created, updated)` tuples (link already
/// resolved against `base_url`).
pub fn extract(
    html: &str,
    base_url: &str,
    themes: &ThemeRules,
) -> Option<(String, Vec<(String, String, String, String)>)> {
    let document = Html::parse_document(html);
    let base = Url::parse(base_url).ok();

    for (name, rules) in themes.iter() {
        if let Some(fields) = resolve_theme_fields(&document, rules) {
            let posts = zip_fields(fields, base.as_ref());
            if !posts.is_empty() {
                return Some((name.clone(), posts));
            }
        }
    }
    None
}

fn resolve_theme_fields(document: &Html, rules: &ThemeFieldRules) -> Option<ExtractedFields> {
    let title = resolve_field(document, &rules.title)?;
    let link = resolve_field(document, &rules.link)?;
    let created = resolve_field(document, &rules.created)?;
    let updated = resolve_field(document, &rules.updated).unwrap_or_default();

    if title.is_empty() || link.is_empty() || created.is_empty() {
        return None;
    }
    if title.len() != link.len() || title.len() != created.len() {
        return None;
    }
    if updated.len() > created.len() {
        return None;
    }

    Some(ExtractedFields {
        title,
        link,
        created,
        updated,
    })
}

/// Try each rule in order; the first whose selector yields at least one
/// non-empty extracted value wins that field.
fn resolve_field(document: &Html, field_rules: &[FieldRule]) -> Option<Vec<String>> {
    for rule in field_rules {
        let Ok(selector) = Selector::parse(&rule.selector) else {
            continue;
        };
        let values: Vec<String> = document
            .select(&selector)
            .map(|el| extract_value(&el, &rule.attr))
            .filter(|v| !v.is_empty())
            .collect();
        if !values.is_empty() {
            return Some(values);
        }
    }
    None
}

fn extract_value(el: &scraper::ElementRef, attr: &RuleAttr) -> String {
    match attr {
        RuleAttr::Text => el.text().collect::<String>().trim().to_string(),
        RuleAttr::Time => el
            .value()
            .attr("datetime")
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| el.text().collect::<String>().trim().to_string()),
        RuleAttr::Named(name) => el
            .value()
            .attr(name)
            .unwrap_or_default()
            .trim()
            .to_string(),
    }
}

fn zip_fields(
    fields: ExtractedFields,
    base: Option<&Url>,
) -> Vec<(String, String, String, String)> {
    let n = fields.title.len();
    (0..n)
        .map(|i| {
            let link = resolve_link(&fields.link[i], base);
            let created = fields.created[i].clone();
            let updated = fields.updated.get(i).cloned().unwrap_or_else(|| created.clone());
            (fields.title[i].clone(), link, created, updated)
        })
        .collect()
}

fn resolve_link(raw: &str, base: Option<&Url>) -> String {
    match base {
        Some(base) => base.join(raw).map(|u| u.to_string()).unwrap_or_else(|_| raw.to_string()),
        None => raw.to_string(),
    }
}
