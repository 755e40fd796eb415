//! Sitemap generation.
//!
//! # Responsibilities
//! - Expand variable routes over their example values (Cartesian product)
//! - Render the standard sitemap XML document with alternate-language links
//!
//! # Design Decisions
//! - Expansion is a plain iterator over an odometer of value indices; the first
//!   variable varies slowest, matching declaration order
//! - A variable without example values removes the whole route from the sitemap
//! - No pagination and no 50,000 URL limit

use std::collections::HashMap;

use crate::routing::route::RouteUri;

pub const SITEMAP_NAMESPACE: &str = "http://www.sitemaps.org/schemas/sitemap/0.9";
pub const XHTML_NAMESPACE: &str = "http://www.w3.org/1999/xhtml";

/// Iterator over the concrete paths of one route.
pub struct Expansion<'a> {
    route: &'a RouteUri,
    domains: Vec<(&'a str, &'a [String])>,
    indices: Vec<usize>,
    done: bool,
}

impl<'a> Expansion<'a> {
    pub fn new(route: &'a RouteUri) -> Self {
        let domains: Vec<(&str, &[String])> = route
            .variable_names()
            .map(|name| (name, route.var_values(name)))
            .collect();
        let done = domains.iter().any(|(_, values)| values.is_empty());

        Self {
            route,
            indices: vec![0; domains.len()],
            domains,
            done,
        }
    }

    fn advance(&mut self) {
        for position in (0..self.indices.len()).rev() {
            self.indices[position] += 1;
            if self.indices[position] < self.domains[position].1.len() {
                return;
            }
            self.indices[position] = 0;
        }
        self.done = true;
    }
}

impl Iterator for Expansion<'_> {
    type Item = String;

    fn next(&mut self) -> Option<String> {
        if self.done {
            return None;
        }

        let encoded: Vec<(&str, String)> = self
            .domains
            .iter()
            .zip(&self.indices)
            .map(|((name, values), &i)| (*name, urlencoding::encode(&values[i]).into_owned()))
            .collect();
        let values: HashMap<&str, &str> = encoded.iter().map(|(n, v)| (*n, v.as_str())).collect();
        let path = self.route.pattern().render_encoded(&values);

        // A static route has a single, empty odometer.
        if self.domains.is_empty() {
            self.done = true;
        } else {
            self.advance();
        }
        Some(path)
    }
}

/// Render a sitemap for every route flagged for inclusion.
pub fn build_sitemap<'a, I>(base_url: &str, routes: I) -> String
where
    I: IntoIterator<Item = &'a RouteUri>,
{
    let base = base_url.trim_end_matches('/');
    let mut xml = String::from("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");
    xml.push_str(&format!(
        "<urlset xmlns=\"{SITEMAP_NAMESPACE}\" xmlns:xhtml=\"{XHTML_NAMESPACE}\">\n"
    ));

    let mut count = 0usize;
    for route in routes.into_iter().filter(|r| r.in_sitemap()) {
        for path in Expansion::new(route) {
            let loc = format!("{base}{path}");
            xml.push_str("  <url>\n");
            xml.push_str(&format!("    <loc>{}</loc>\n", escape_xml(&loc)));
            for lang in route.languages() {
                let href = format!("{loc}?lang={lang}");
                xml.push_str(&format!(
                    "    <xhtml:link rel=\"alternate\" hreflang=\"{}\" href=\"{}\"/>\n",
                    escape_xml(lang),
                    escape_xml(&href)
                ));
            }
            xml.push_str("  </url>\n");
            count += 1;
        }
    }
    xml.push_str("</urlset>\n");

    tracing::debug!(entries = count, "Sitemap built");
    xml
}

fn escape_xml(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(c),
        }
    }
    out
}
