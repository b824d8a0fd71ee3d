//! Action affordance resolution
//!
//! Maps a bot reply's position in the conversation and its attached action
//! tags to the affordances that are actually rendered with it. Pure logic,
//! no I/O, so the cadence rule stays independently testable.

use serde::{Deserialize, Serialize};

use crate::conversation::ActionTag;

/// A concrete action affordance rendered alongside a bot message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Affordance {
    Breathing,
    Meditation,
    Journal,
    MoodTracker,
    CrisisHotline,
}

/// The composite shown for empty or unrecognized tags.
const GENERAL: [Affordance; 4] = [
    Affordance::Breathing,
    Affordance::Meditation,
    Affordance::Journal,
    Affordance::MoodTracker,
];

/// Resolve which affordances to render for the `bot_ordinal`-th bot message
/// (1-based) carrying `tags`.
///
/// Affordances are shown on the first bot message, on every third one after
/// that, and always when the reply is tagged with exactly `["crisis"]` -
/// the crisis hotline must never be hidden by the cadence.
pub fn resolve(bot_ordinal: u64, tags: &[ActionTag]) -> Vec<Affordance> {
    let crisis_override = tags == [ActionTag::Crisis];
    let on_cadence = bot_ordinal == 1 || bot_ordinal % 3 == 0;

    if !on_cadence && !crisis_override {
        return Vec::new();
    }

    if tags.is_empty() {
        return GENERAL.to_vec();
    }

    let mut rendered = Vec::new();
    for tag in tags {
        for affordance in affordances_for(tag) {
            if !rendered.contains(affordance) {
                rendered.push(*affordance);
            }
        }
    }
    rendered
}

fn affordances_for(tag: &ActionTag) -> &'static [Affordance] {
    match tag {
        ActionTag::Write => &[Affordance::Journal, Affordance::MoodTracker],
        ActionTag::Breathe => &[Affordance::Breathing],
        ActionTag::Meditate => &[Affordance::Meditation],
        ActionTag::Crisis => &[Affordance::CrisisHotline],
        ActionTag::Other(_) => &GENERAL,
    }
}
