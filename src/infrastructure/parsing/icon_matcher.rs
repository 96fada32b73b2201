//! Icon-to-upgrade resolution heuristics
//!
//! The source layout does not reliably pair upgrade rows with their icons,
//! so resolution is filename-driven: a positional pass over the row's own
//! images first, and a token-similarity scorer over the whole section as
//! the fallback. Finding nothing is a valid outcome.

use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{ElementRef, Selector};
use url::Url;

use crate::domain::entities::normalize_name;

/// Currency/time/hotkey glyphs and wiki chrome that must never be taken
/// for an upgrade icon.
const ICON_SKIP_PATTERNS: &[&str] = &[
    "minerals.gif",
    "vespene",
    "buildtime",
    "hotkey",
    "edit",
    "information",
    "commons/thumb/a/a4",
];

const IMAGE_EXTENSIONS: &[&str] = &[".png", ".jpg", ".jpeg", ".gif"];

/// Upgrade-name keyword -> icon-filename hints that count as a match even
/// though the literal tokens differ.
const SYNONYM_BONUSES: &[(&str, &[&str])] = &[
    ("glial", &["glial"]),
    ("tunneling", &["tunneling", "claw"]),
    ("weapons", &["weapons"]),
    ("armor", &["armor"]),
    ("carapace", &["carapace"]),
    ("attacks", &["attacks"]),
];

static IMG: Lazy<Selector> = Lazy::new(|| Selector::parse("img").expect("valid selector"));
static LEVEL_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"level\s+(\d+)").expect("valid regex"));

/// Does this `src` qualify as an upgrade icon at all?
fn is_candidate_src(src: &str) -> bool {
    let lower = src.to_lowercase();
    if ICON_SKIP_PATTERNS.iter().any(|p| lower.contains(p)) {
        return false;
    }
    (lower.contains("/commons/images/thumb/") || lower.contains("/commons/images/"))
        && IMAGE_EXTENSIONS.iter().any(|ext| lower.ends_with(ext))
}

/// Lowercased filename portion of an image src.
fn file_name(src: &str) -> String {
    src.rsplit('/').next().unwrap_or(src).to_lowercase()
}

fn absolute(base: &Url, src: &str) -> Option<String> {
    base.join(src).ok().map(Into::into)
}

/// All qualifying icons within the given elements, as
/// `(lowercased filename, absolute URL)` in first-seen order.
pub fn collect_candidate_icons(elements: &[ElementRef], base: &Url) -> Vec<(String, String)> {
    let mut icons = Vec::new();
    for element in elements {
        for img in element.select(&IMG) {
            let Some(src) = img.value().attr("src") else {
                continue;
            };
            if !is_candidate_src(src) {
                continue;
            }
            if let Some(url) = absolute(base, src) {
                icons.push((file_name(src), url));
            }
        }
    }
    icons
}

/// Positional match for one level of a tiered upgrade: an image inside the
/// same element whose filename carries both the level digit and at least
/// one meaningful token of the family name.
pub fn positional_tiered_icon(
    element: ElementRef,
    base_name: &str,
    level: u32,
    base: &Url,
) -> Option<String> {
    let level_digit = level.to_string();
    let normalized = normalize_name(base_name);
    let tokens: Vec<&str> = normalized.split('_').filter(|t| t.len() > 2).collect();

    for img in element.select(&IMG) {
        let Some(src) = img.value().attr("src") else {
            continue;
        };
        if !is_candidate_src(src) {
            continue;
        }
        let filename = file_name(src);
        if filename.contains(&level_digit) && tokens.iter().any(|t| filename.contains(t)) {
            return absolute(base, src);
        }
    }
    None
}

/// First qualifying image in the element, for flat upgrades.
pub fn first_icon_in_element(element: ElementRef, base: &Url) -> Option<String> {
    element
        .select(&IMG)
        .filter_map(|img| img.value().attr("src"))
        .find(|src| is_candidate_src(src))
        .and_then(|src| absolute(base, src))
}

/// Score every candidate filename against the upgrade name and pick the
/// best one; ties resolve to the first seen, a zero score never matches.
pub fn match_icon_by_tokens(
    upgrade_name: &str,
    candidates: &[(String, String)],
) -> Option<String> {
    let name_lower = upgrade_name.to_lowercase();
    let normalized = normalize_name(upgrade_name);
    let words: Vec<&str> = normalized.split('_').collect();
    let level_digit = LEVEL_RE
        .captures(&name_lower)
        .map(|caps| caps[1].to_string());

    let mut best: Option<&str> = None;
    let mut best_score = 0u32;

    for (filename, url) in candidates {
        let icon_name = filename
            .rsplit_once('.')
            .map(|(stem, _)| stem)
            .unwrap_or(filename);

        let mut score = 0u32;
        for word in &words {
            if *word != "level" && word.len() > 2 && icon_name.contains(word) {
                score += 1;
            }
        }
        if let Some(digit) = &level_digit {
            if icon_name.contains(digit.as_str()) {
                score += 5;
            }
        }
        for (keyword, hints) in SYNONYM_BONUSES {
            if name_lower.contains(keyword) && hints.iter().any(|hint| icon_name.contains(hint)) {
                score += 2;
            }
        }

        if score > best_score {
            best_score = score;
            best = Some(url);
        }
    }

    best.map(str::to_string)
}
