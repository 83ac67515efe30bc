//! Mapping from store-specific category labels to one shared vocabulary.
//!
//! Google Play uses upper snake case identifiers (`HEALTH_AND_FITNESS`), the
//! App Store uses display names (`Social Networking`). Both collapse onto the
//! same unified labels so the two platforms can be grouped side by side.

const CATEGORY_MAP: &[(&str, &str)] = &[
    // Google Play
    ("ART_AND_DESIGN", "Creative"),
    ("AUTO_AND_VEHICLES", "Lifestyle"),
    ("BEAUTY", "Lifestyle"),
    ("BOOKS_AND_REFERENCE", "Education"),
    ("BUSINESS", "Business"),
    ("COMICS", "Entertainment"),
    ("COMMUNICATION", "Social"),
    ("DATING", "Social"),
    ("EDUCATION", "Education"),
    ("ENTERTAINMENT", "Entertainment"),
    ("EVENTS", "Lifestyle"),
    ("FAMILY", "Family"),
    ("FINANCE", "Finance"),
    ("FOOD_AND_DRINK", "Food & Drink"),
    ("GAME", "Games"),
    ("HEALTH_AND_FITNESS", "Health & Fitness"),
    ("HOUSE_AND_HOME", "Lifestyle"),
    ("LIBRARIES_AND_DEMO", "Developer Tools"),
    ("LIFESTYLE", "Lifestyle"),
    ("MAPS_AND_NAVIGATION", "Navigation"),
    ("MEDICAL", "Medical"),
    ("MUSIC_AND_AUDIO", "Music"),
    ("NEWS_AND_MAGAZINES", "News"),
    ("PARENTING", "Family"),
    ("PERSONALIZATION", "Utilities"),
    ("PHOTOGRAPHY", "Photo & Video"),
    ("PRODUCTIVITY", "Productivity"),
    ("SHOPPING", "Shopping"),
    ("SOCIAL", "Social"),
    ("SPORTS", "Sports"),
    ("TOOLS", "Utilities"),
    ("TRAVEL_AND_LOCAL", "Travel"),
    ("VIDEO_PLAYERS", "Photo & Video"),
    ("WEATHER", "Weather"),
    // App Store
    ("Games", "Games"),
    ("Business", "Business"),
    ("Education", "Education"),
    ("Entertainment", "Entertainment"),
    ("Finance", "Finance"),
    ("Health & Fitness", "Health & Fitness"),
    ("Lifestyle", "Lifestyle"),
    ("Music", "Music"),
    ("News", "News"),
    ("Photo & Video", "Photo & Video"),
    ("Productivity", "Productivity"),
    ("Social Networking", "Social"),
    ("Sports", "Sports"),
    ("Travel", "Travel"),
    ("Utilities", "Utilities"),
    ("Shopping", "Shopping"),
    ("Food & Drink", "Food & Drink"),
    ("Medical", "Medical"),
    ("Navigation", "Navigation"),
    ("Reference", "Education"),
    ("Weather", "Weather"),
];

/// Returns the unified category label for a raw store category.
///
/// Matching is exact after trimming. Unknown labels pass through unchanged so
/// no app loses its category.
#[must_use]
pub fn unify_category(raw: &str) -> String {
    let trimmed = raw.trim();
    CATEGORY_MAP
        .iter()
        .find(|(store, _)| *store == trimmed)
        .map_or_else(|| trimmed.to_string(), |(_, unified)| (*unified).to_string())
}
