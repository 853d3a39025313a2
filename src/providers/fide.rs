//! FIDE profile scraper.
//!
//! The federation publishes ratings as an HTML page with no stable schema;
//! the selectors below mirror the page's current layout and are expected to
//! drift. Parse failures are logged and reported as "profile unavailable"
//! rather than hard errors.

use anyhow::{bail, Context, Result};
use regex::Regex;
use reqwest::{Client, StatusCode};
use scraper::{ElementRef, Html, Selector};
use tracing::{debug, warn};

const PROFILE_URL_BASE: &str = "https://ratings.fide.com/profile";

#[derive(Debug, Clone, PartialEq)]
pub struct FideProfile {
    pub fide_id: i64,
    pub name: Option<String>,
    pub country: Option<String>,
    pub standard_rating: Option<f64>,
    pub rapid_rating: Option<f64>,
    pub blitz_rating: Option<f64>,
}

impl FideProfile {
    fn new(fide_id: i64) -> Self {
        Self {
            fide_id,
            name: None,
            country: None,
            standard_rating: None,
            rapid_rating: None,
            blitz_rating: None,
        }
    }

    /// Best of the three published ratings, None when unrated everywhere.
    pub fn highest_rating(&self) -> Option<f64> {
        crate::ranking::highest_rating([
            self.standard_rating,
            self.rapid_rating,
            self.blitz_rating,
        ])
    }
}

/// Fetch and parse the profile page for `fide_id`. Returns Ok(None) for
/// unknown ids and for pages the parser no longer understands.
pub async fn fetch_profile(http: &Client, fide_id: i64) -> Result<Option<FideProfile>> {
    let url = format!("{PROFILE_URL_BASE}/{fide_id}");
    debug!(fide_id, %url, "fetching fide profile");

    let resp = http
        .get(&url)
        .header(
            "Accept",
            "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8",
        )
        .header("Accept-Language", "en-US,en;q=0.5")
        .send()
        .await
        .with_context(|| format!("fide profile request for {fide_id}"))?;

    match resp.status() {
        StatusCode::NOT_FOUND => {
            debug!(fide_id, "fide: profile not found");
            Ok(None)
        }
        s if s.is_success() => {
            let body = resp
                .text()
                .await
                .context("reading fide profile body")?;
            Ok(parse_profile(&body, fide_id))
        }
        s => bail!("fide profile returned HTTP {s} for id {fide_id}"),
    }
}

/// Parse the profile page. The ratings live in three unlabelled divs under
/// `div.profile-games`, in the fixed order standard, rapid, blitz; each div's
/// first `<p>` carries the rating digits somewhere in its text.
pub fn parse_profile(html: &str, fide_id: i64) -> Option<FideProfile> {
    let doc = Html::parse_document(html);

    let sel_h1 = Selector::parse("h1").ok()?;
    let sel_directory = Selector::parse("section.directory").ok()?;
    let sel_profile_section = Selector::parse("div.profile-section").ok()?;
    let sel_games = Selector::parse("div.profile-games").ok()?;
    let sel_p = Selector::parse("p").ok()?;
    let sel_img = Selector::parse("img").ok()?;
    let rating_re = Regex::new(r"\b(\d{3,4})\b").ok()?;

    let mut profile = FideProfile::new(fide_id);

    profile.name = doc
        .select(&sel_h1)
        .next()
        .map(|h1| collapse_text(h1))
        .filter(|s| !s.is_empty());

    let Some(directory) = doc.select(&sel_directory).next() else {
        warn!(fide_id, "fide page is missing the directory section");
        return None;
    };
    let Some(profile_section) = directory.select(&sel_profile_section).next() else {
        warn!(fide_id, "fide page is missing the profile section");
        return None;
    };
    let Some(games) = profile_section.select(&sel_games).next() else {
        warn!(fide_id, "fide page is missing the profile-games block");
        return None;
    };

    let game_divs = games
        .children()
        .filter_map(ElementRef::wrap)
        .filter(|e| e.value().name() == "div");

    for (i, game_div) in game_divs.enumerate().take(3) {
        let rating = game_div
            .select(&sel_p)
            .next()
            .and_then(|p| extract_rating(&rating_re, &collapse_text(p)));
        match i {
            0 => profile.standard_rating = rating,
            1 => profile.rapid_rating = rating,
            _ => profile.blitz_rating = rating,
        }
    }

    // The flag image carries the country name in its title.
    profile.country = doc
        .select(&sel_img)
        .find(|img| {
            img.value()
                .attr("alt")
                .is_some_and(|alt| alt.to_ascii_lowercase().contains("flag"))
        })
        .and_then(|img| img.value().attr("title"))
        .map(|t| t.trim().to_string())
        .filter(|s| !s.is_empty());

    Some(profile)
}

fn collapse_text(element: ElementRef<'_>) -> String {
    element.text().collect::<String>().trim().to_string()
}

/// First 3-4 digit integer in the text, e.g. "2839" out of "2839 (std)".
fn extract_rating(re: &Regex, text: &str) -> Option<f64> {
    re.captures(text)?
        .get(1)
        .and_then(|m| m.as_str().parse::<f64>().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    const PROFILE_HTML: &str = r#"
        <html><body>
        <h1> Magnus Carlsen </h1>
        <img src="/flags/no.svg" alt="Norway flag" title="Norway">
        <section class="directory">
          <div class="profile-section">
            <div class="profile-games">
              <div><p>2839 (std)</p><small>world #1</small></div>
              <div><p>rating: 2828</p></div>
              <div><p>Not rated</p></div>
            </div>
          </div>
        </section>
        </body></html>
    "#;

    #[test]
    fn parses_ratings_by_position() {
        let profile = parse_profile(PROFILE_HTML, 1503014).expect("parseable fixture");
        assert_eq!(profile.name.as_deref(), Some("Magnus Carlsen"));
        assert_eq!(profile.country.as_deref(), Some("Norway"));
        assert_eq!(profile.standard_rating, Some(2839.0));
        assert_eq!(profile.rapid_rating, Some(2828.0));
        assert_eq!(profile.blitz_rating, None);
        assert_eq!(profile.highest_rating(), Some(2839.0));
    }

    #[test]
    fn missing_directory_section_is_unparseable() {
        let html = "<html><body><h1>Someone</h1><p>2100</p></body></html>";
        assert!(parse_profile(html, 42).is_none());
    }

    #[test]
    fn empty_games_block_yields_unrated_profile() {
        let html = r#"
            <section class="directory"><div class="profile-section">
            <div class="profile-games"></div>
            </div></section>
        "#;
        let profile = parse_profile(html, 42).expect("structure is present");
        assert_eq!(profile.highest_rating(), None);
    }

    #[test]
    fn rating_extraction_wants_three_or_four_digits() {
        let re = Regex::new(r"\b(\d{3,4})\b").expect("static pattern");
        assert_eq!(extract_rating(&re, "2839 (std)"), Some(2839.0));
        assert_eq!(extract_rating(&re, "rapid 985"), Some(985.0));
        assert_eq!(extract_rating(&re, "Not rated"), None);
        assert_eq!(extract_rating(&re, "#1 of 12"), None);
        assert_eq!(extract_rating(&re, "12345"), None);
    }
}
