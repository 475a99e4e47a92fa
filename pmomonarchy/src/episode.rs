//! Episode page links derived from archive file names.
//!
//! Three naming schemes have been used over the years. They are tried in a
//! fixed order; the generic dated scheme also matches the two older ones, so
//! the order is what decides. Dates and episode numbers are ASCII digits
//! only.

use once_cell::sync::Lazy;
use regex::{Captures, Regex};

type Extractor = fn(&Captures<'_>) -> String;

/// `20230501_PumpUpThaVolume042.mp3` → `putv042`
static OLD_PUTV: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"([0-9]{8})_PumpUpThaVolume([0-9]{3})\.mp3$").expect("valid regex"));

/// `20230501_MixlrMusic.mp3` → `20230501mixlrmusic`
static MIXLR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"([0-9]{8})_MixlrMusic\.mp3$").expect("valid regex"));

/// `20230501_Morning_Show.mp3` → `20230501morningshow`
static DATED: Lazy<Regex> = Lazy::new(|| Regex::new(r"([0-9]{8})_(.+)\.mp3$").expect("valid regex"));

fn old_putv_slug(caps: &Captures<'_>) -> String {
    format!("putv{}", &caps[2])
}

fn mixlr_slug(caps: &Captures<'_>) -> String {
    format!("{}mixlrmusic", &caps[1])
}

fn dated_slug(caps: &Captures<'_>) -> String {
    let name = caps[2].to_lowercase().replace('_', "");
    format!("{}{}", &caps[1], name)
}

/// Schemes in priority order.
static SCHEMES: [(&Lazy<Regex>, Extractor); 3] = [
    (&OLD_PUTV, old_putv_slug),
    (&MIXLR, mixlr_slug),
    (&DATED, dated_slug),
];

/// Page slug of the episode stored in `filename`, if any scheme matches.
pub fn episode_slug(filename: &str) -> Option<String> {
    SCHEMES
        .iter()
        .find_map(|(pattern, extract)| pattern.captures(filename).map(|caps| extract(&caps)))
}

/// Full episode page URL under `site`, e.g. `https://mediamonarchy.com/putv042/`.
pub fn episode_link(site: &str, filename: &str) -> Option<String> {
    let slug = episode_slug(filename)?;
    Some(format!("{}/{}/", site.trim_end_matches('/'), slug))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SITE: &str = "https://mediamonarchy.com";

    #[test]
    fn test_old_putv_scheme() {
        assert_eq!(
            episode_link(SITE, "20230501_PumpUpThaVolume042.mp3").as_deref(),
            Some("https://mediamonarchy.com/putv042/")
        );
    }

    #[test]
    fn test_mixlr_scheme() {
        assert_eq!(
            episode_link(SITE, "20230501_MixlrMusic.mp3").as_deref(),
            Some("https://mediamonarchy.com/20230501mixlrmusic/")
        );
    }

    #[test]
    fn test_dated_scheme() {
        assert_eq!(
            episode_link(SITE, "20230501_Morning_Show.mp3").as_deref(),
            Some("https://mediamonarchy.com/20230501morningshow/")
        );
    }

    #[test]
    fn test_old_scheme_wins_over_dated() {
        // both OLD_PUTV and DATED match; the dated slug would be
        // "20230501pumpupthavolume042"
        assert_eq!(
            episode_slug("/archive/20230501_PumpUpThaVolume042.mp3").as_deref(),
            Some("putv042")
        );
    }

    #[test]
    fn test_unmatched() {
        assert_eq!(episode_link(SITE, "morning_show.mp3"), None);
        assert_eq!(episode_link(SITE, "20230501_Morning_Show.ogg"), None);
        assert_eq!(episode_link(SITE, ""), None);
    }

    #[test]
    fn test_non_ascii_digits_do_not_match() {
        assert_eq!(episode_slug("٢٠٢٣٠٥٠١_Morning_Show.mp3"), None);
        // falls through to the dated scheme
        assert_eq!(
            episode_slug("20230501_PumpUpThaVolume٠٤٢.mp3").as_deref(),
            Some("20230501pumpupthavolume٠٤٢")
        );
        assert_eq!(episode_slug("２０２３０５０１_MixlrMusic.mp3"), None);
    }

    #[test]
    fn test_trailing_slash_on_site() {
        assert_eq!(
            episode_link("https://example.org/", "20230501_MixlrMusic.mp3").as_deref(),
            Some("https://example.org/20230501mixlrmusic/")
        );
    }
}
