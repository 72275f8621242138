//! # Captions
//!
//! Text sent back to the chat alongside images and command replies.

use crate::CaughtRecord;

pub const SPAWN_CAPTION: &str = "A wild creature appeared!";
pub const FLED_CAPTION: &str = "Oh no! The wild creature fled!";
pub const NOT_CATCHABLE_CAPTION: &str = "Hey! I'm not yours to catch!";
pub const EMPTY_GUESS_CAPTION: &str = "You must tell me which creature you want to catch";
pub const EMPTY_TEAM_CAPTION: &str = "You still haven't caught any creatures!";

/// Guesses that name the host professor rather than a creature.
pub const PROFESSOR_NAMES: [&str; 3] = ["oak", "professor oak", "samuel oak"];

/// Caption of a successful capture.
pub fn catch_caption(user: &str, creature: &str, shiny: bool) -> String {
    if shiny {
        format!("AWESOME! {} caught a shiny {}!", user, creature)
    } else {
        format!("Congratulations {}! {} was caught!", user, creature)
    }
}

/// Reply to a guess that names nothing in the channel.
pub fn wrong_guess_caption(guess: &str) -> String {
    format!("Hm no, I haven't seen any wild {}", guess)
}

/// Numbered team listing, showing at most `limit` entries.
///
/// # Examples
///
/// ```
/// use oakoak::team_listing;
///
/// assert_eq!(
///     team_listing("ash", &[], 50),
///     "You still haven't caught any creatures!"
/// );
/// ```
pub fn team_listing(user: &str, team: &[CaughtRecord], limit: usize) -> String {
    if team.is_empty() {
        return EMPTY_TEAM_CAPTION.to_string();
    }

    let mut listing = format!("{}'s caught creatures:\n", user);
    for record in team.iter().take(limit) {
        let shiny = if record.shiny { " (shiny)" } else { "" };
        listing.push_str(&format!(
            "{}. {}{}\n",
            record.team_index + 1,
            record.creature_name,
            shiny
        ));
    }
    if team.len() > limit {
        listing.push_str(&format!(
            "Only the first {} of {} creatures are shown.\n",
            limit,
            team.len()
        ));
    }
    listing
}
