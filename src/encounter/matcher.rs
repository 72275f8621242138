//! # Name Matching
//!
//! Decides whether a free-text guess names a wild encounter.
//!
//! Both the guess and the canonical name go through the same pipeline:
//! 1. lowercase, split into words on anything that is not a letter or digit
//! 2. drop a regional qualifier ("alolan", "alola", ...) from either end when
//!    the encounter is a regional form
//! 3. fold gender wording ("male", "f", "♀", ...) into one trailing marker
//!    when the canonical name carries a gender suffix
//! 4. glue the remaining words together
//!
//! The two results must be equal. For gendered names a guess that already
//! ends in the glued marker ("nidoranf") is also accepted.

use crate::{Region, WildEncounter};

const MALE_WORDS: [&str; 2] = ["male", "m"];
const FEMALE_WORDS: [&str; 2] = ["female", "f"];

/// Gender suffix carried by a canonical name such as "Nidoran M".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum GenderMarker {
    Male,
    Female,
}

impl GenderMarker {
    fn of_name(name: &str) -> Option<Self> {
        let words = words(name);
        if words.len() < 2 {
            return None;
        }
        let last = words.last()?.as_str();
        if MALE_WORDS.contains(&last) {
            Some(GenderMarker::Male)
        } else if FEMALE_WORDS.contains(&last) {
            Some(GenderMarker::Female)
        } else {
            None
        }
    }

    fn own_words(self) -> &'static [&'static str] {
        match self {
            GenderMarker::Male => &MALE_WORDS,
            GenderMarker::Female => &FEMALE_WORDS,
        }
    }

    fn token(self) -> &'static str {
        match self {
            GenderMarker::Male => "m",
            GenderMarker::Female => "f",
        }
    }
}

/// Whether `guess` names the creature of `encounter`.
///
/// # Examples
///
/// ```
/// use oakoak::names_match;
/// use oakoak::Region;
///
/// let alolan = Region::new("alolan");
/// assert!(names_match("Alolan Raichu", "Raichu", &alolan));
/// assert!(names_match("raichu", "Raichu", &alolan));
/// assert!(names_match("Pika-Chu!", "Pikachu", &Region::global()));
/// assert!(names_match("Nidoran-F", "Nidoran F", &Region::global()));
/// assert!(!names_match("raichu", "Pikachu", &Region::global()));
/// ```
pub fn names_match(guess: &str, canonical: &str, region: &Region) -> bool {
    let canonical = without_qualifier(words(canonical), region);
    let marker = GenderMarker::of_name(&canonical.join(" "));
    let target = fold_gender(canonical, marker);
    if target.is_empty() {
        return false;
    }

    let guess = without_qualifier(words(guess), region);
    if marker.is_some() && guess.concat() == target {
        return true;
    }
    fold_gender(guess, marker) == target
}

/// Whether `guess` names the creature of `encounter`, using the region of the
/// sprite the encounter spawned with.
pub fn matches(guess: &str, encounter: &WildEncounter) -> bool {
    names_match(guess, encounter.name(), &encounter.sprite.region)
}

/// Lowercase words of `text`. Gender symbols count as their own word.
fn words(text: &str) -> Vec<String> {
    text.to_lowercase()
        .replace('♂', " m ")
        .replace('♀', " f ")
        .split(|c: char| !c.is_alphanumeric())
        .filter(|word| !word.is_empty())
        .map(str::to_string)
        .collect()
}

fn without_qualifier(words: Vec<String>, region: &Region) -> Vec<String> {
    let mut text = words.join(" ");
    for qualifier in region.qualifiers() {
        if let Some(rest) = text.strip_prefix(qualifier.as_str()) {
            text = rest.to_string();
            break;
        }
        if let Some(rest) = text.strip_suffix(qualifier.as_str()) {
            text = rest.to_string();
            break;
        }
    }
    text.split_whitespace().map(str::to_string).collect()
}

fn fold_gender(mut words: Vec<String>, marker: Option<GenderMarker>) -> String {
    if let Some(marker) = marker {
        let own = |word: Option<&String>| {
            word.is_some_and(|w| marker.own_words().contains(&w.as_str()))
        };
        while words.len() > 1 && own(words.last()) {
            words.pop();
        }
        while words.len() > 1 && own(words.first()) {
            words.remove(0);
        }
        words.push(marker.token().to_string());
    }
    words.concat()
}
