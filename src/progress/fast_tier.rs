/// Highest recordable fast tier ("Fast +9").
pub const MAX_FAST_TIER: u8 = 11;

/// Clamp an arbitrary integer into the valid fast-tier range.
pub fn clamp_fast_tier(tier: u8) -> u8 {
    tier.min(MAX_FAST_TIER)
}

/// Display label for a fast tier. Tier 0 ("not completed") and anything else
/// without its own label fall back to "Normal", matching the progression
/// view's behavior.
pub fn fast_tier_label(tier: u8) -> &'static str {
    match tier {
        2 => "Fast",
        3 => "Fast +",
        4 => "Fast ++",
        5 => "Fast +3",
        6 => "Fast +4",
        7 => "Fast +5",
        8 => "Fast +6",
        9 => "Fast +7",
        10 => "Fast +8",
        11 => "Fast +9",
        _ => "Normal",
    }
}

/// The crate's toggle policy for completion checkboxes: tapping a level that
/// is already complete at the selected tier steps it down one tier; tapping
/// an incomplete one completes it at the selected tier.
///
/// Completion is monotonic downward-implied, so `recorded >= selected` means
/// "already complete at the selected tier". The model records whatever value
/// the caller passes; this helper is only the recommended caller policy.
pub fn toggle_fast_tier(recorded: u8, selected: u8) -> u8 {
    if recorded >= selected {
        selected.saturating_sub(1)
    } else {
        clamp_fast_tier(selected)
    }
}
