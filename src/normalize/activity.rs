//! Workout activity table
//!
//! Static lookup from activity-type code to display name, icon and emoji.
//! Codes missing from the table resolve to [`OTHER`].

/// Display attributes of one activity type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Activity {
    pub code: u32,
    pub name: &'static str,
    /// Short name; differs from `name` only where a common abbreviation exists
    pub common_name: &'static str,
    /// SF-symbol name
    pub icon: &'static str,
    pub emoji: Option<&'static str>,
}

const fn entry(
    code: u32,
    name: &'static str,
    icon: &'static str,
    emoji: Option<&'static str>,
) -> Activity {
    Activity {
        code,
        name,
        common_name: name,
        icon,
        emoji,
    }
}

/// Catch-all entry for unknown codes
pub static OTHER: Activity = entry(3000, "Other", "questionmark", None);

/// Sorted by code
static ACTIVITIES: [Activity; 75] = [
    entry(1, "American Football", "figure.american.football", Some("🏈")),
    entry(2, "Archery", "figure.archery", Some("🏹")),
    entry(3, "Australian Football", "figure.australian.football", None),
    entry(4, "Badminton", "figure.badminton", Some("🏸")),
    entry(5, "Baseball", "figure.baseball", Some("⚾️")),
    entry(6, "Basketball", "figure.basketball", Some("🏀")),
    entry(7, "Bowling", "figure.bowling", Some("🎳")),
    entry(8, "Boxing", "figure.boxing", Some("🥊")),
    entry(9, "Climbing", "figure.climbing", None),
    entry(11, "Cross Training", "figure.cross.training", None),
    entry(12, "Curling", "figure.curling", Some("🥌")),
    entry(13, "Cycling", "figure.outdoor.cycle", Some("🚲")),
    entry(14, "Dance", "figure.dance", None),
    entry(15, "Dance Inspired Training", "figure.dance", None),
    entry(16, "Elliptical", "figure.elliptical", None),
    entry(17, "Equestrian Sports", "figure.equestrian.sports", Some("🏇")),
    entry(18, "Fencing", "figure.fencing", Some("🤺")),
    entry(19, "Fishing", "figure.fishing", Some("🎣")),
    entry(20, "Functional Strength Training", "figure.strengthtraining.functional", Some("💪")),
    entry(21, "Golf", "figure.golf", Some("⛳️")),
    entry(22, "Gymnastics", "figure.gymnastics", None),
    entry(23, "Handball", "figure.handball", None),
    entry(24, "Hiking", "figure.hiking", Some("🥾")),
    entry(25, "Hockey", "figure.hockey", Some("🏒")),
    entry(26, "Hunting", "figure.hunting", None),
    entry(27, "Lacrosse", "figure.lacrosse", Some("🥍")),
    entry(28, "Martial Arts", "figure.martial.arts", Some("🥋")),
    entry(29, "Mind and Body", "figure.mind.and.body", None),
    entry(30, "Mixed Metabolic Cardio Training", "figure.mixed.cardio", Some("❤️")),
    entry(31, "Paddle Sports", "questionmark", Some("🛶")),
    entry(32, "Play", "figure.play", None),
    entry(33, "Preparation and Recovery", "questionmark", None),
    entry(34, "Racquetball", "figure.racquetball", None),
    entry(35, "Rowing", "questionmark", Some("🛶")),
    entry(36, "Rugby", "figure.rugby", Some("🏉")),
    entry(37, "Running", "figure.run", None),
    entry(38, "Sailing", "figure.sailing", Some("⛵️")),
    entry(39, "Skating Sports", "figure.skating", Some("⛸")),
    entry(40, "Snow Sports", "figure.snowboarding", Some("🛷")),
    entry(41, "Soccer", "figure.soccer", Some("⚽️")),
    entry(42, "Softball", "figure.softball", Some("🥎")),
    entry(43, "Squash", "figure.squash", None),
    entry(44, "Stair Climbing", "figure.stairs", None),
    entry(45, "Surfing Sports", "figure.surfing", None),
    entry(46, "Swimming", "figure.pool.swim", None),
    entry(47, "Table Tennis", "figure.table.tennis", Some("🏓")),
    entry(48, "Tennis", "figure.tennis", Some("🎾")),
    entry(49, "Track and Field", "Track and Field", None),
    entry(50, "Traditional Strength Training", "figure.strengthtraining.traditional", Some("🏋️‍♂️")),
    entry(51, "Volleyball", "figure.volleyball", Some("🏐")),
    entry(52, "Walking", "figure.walk", None),
    entry(53, "Water Fitness", "figure.water.fitness", Some("💧")),
    entry(54, "Water Polo", "Water Polo", None),
    entry(55, "Water Sports", "figure.water.fitness", Some("💧")),
    entry(56, "Wrestling", "Wrestling", None),
    entry(57, "Yoga", "figure.yoga", None),
    entry(58, "Barre", "figure.barre", Some("🥿")),
    entry(59, "Core Training", "figure.core.training", None),
    entry(60, "Cross Country Skiing", "figure.skiing.crosscountry", Some("⛷")),
    entry(61, "Downhill Skiing", "figure.skiing.downhill", Some("⛷")),
    entry(62, "Flexibility", "figure.flexibility", None),
    Activity {
        code: 63,
        name: "High Intensity Interval Training",
        common_name: "HIIT",
        icon: "figure.highintensity.intervaltraining",
        emoji: None,
    },
    entry(64, "Jump Rope", "figure.jumprope", None),
    entry(65, "Kickboxing", "figure.kickboxing", Some("🥋")),
    entry(66, "Pilates", "figure.pilates", None),
    entry(67, "Snowboarding", "figure.snowboarding", Some("🏂")),
    entry(68, "Stairs", "figure.stairs", None),
    entry(69, "Step Training", "figure.step.training", None),
    entry(70, "Wheelchair Walk Pace", "figure.roll.runningpace", None),
    entry(71, "Wheelchair Run Pace", "figure.roll", None),
    entry(72, "Tai Chi", "figure.taichi", None),
    entry(73, "Mixed Cardio", "figure.mixed.cardio", Some("❤️")),
    entry(74, "Hand Cycling", "figure.hand.cycling", None),
    entry(75, "Disc Sports", "figure.disc.sports", Some("🥏")),
    entry(76, "Fitness Gaming", "questionmark", Some("🎮")),
];

/// Look up an activity code, falling back to [`OTHER`]
pub fn lookup(code: u32) -> &'static Activity {
    ACTIVITIES
        .binary_search_by_key(&code, |a| a.code)
        .map(|i| &ACTIVITIES[i])
        .unwrap_or(&OTHER)
}

/// Every named activity, sorted by code
pub fn all() -> &'static [Activity] {
    &ACTIVITIES
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_sorted_and_unique() {
        for pair in ACTIVITIES.windows(2) {
            assert!(pair[0].code < pair[1].code, "{} before {}", pair[0].code, pair[1].code);
        }
    }

    #[test]
    fn test_lookup() {
        let cycling = lookup(13);
        assert_eq!(cycling.name, "Cycling");
        assert_eq!(cycling.common_name, "Cycling");
        assert_eq!(cycling.icon, "figure.outdoor.cycle");
        assert_eq!(cycling.emoji, Some("🚲"));

        let hiit = lookup(63);
        assert_eq!(hiit.common_name, "HIIT");
        assert_eq!(hiit.name, "High Intensity Interval Training");
    }

    #[test]
    fn test_unknown_codes_fall_back() {
        // Cricket has no entry
        assert_eq!(lookup(10), &OTHER);
        assert_eq!(lookup(0), &OTHER);
        assert_eq!(lookup(9999).name, "Other");
        assert_eq!(lookup(9999).icon, "questionmark");
        assert_eq!(lookup(9999).emoji, None);
    }
}
