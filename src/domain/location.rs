use super::Location;

/// City/state pair parsed from a listing string or a catalog title.
/// Both parts are lowercased.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CityState {
    pub city: String,
    pub state: Option<String>,
}

/// Split a trailing `(ST)` off a string: `"Dallas (TX)"` -> ("Dallas", Some("TX")).
fn split_state_suffix(input: &str) -> (&str, Option<&str>) {
    let trimmed = input.trim_end();
    if let Some(without_paren) = trimmed.strip_suffix(')') {
        if let Some(open) = without_paren.rfind('(') {
            let state = &without_paren[open + 1..];
            if !state.is_empty() && !state.contains(')') {
                return (&trimmed[..open], Some(state));
            }
        }
    }
    (trimmed, None)
}

impl CityState {
    /// Parse a free-text listing location such as `"Corpus Chr... (TX)"`
    /// or `"Anaheim Co…"`. Truncation ellipses are dropped from the city.
    pub fn from_query(input: &str) -> Self {
        let normalized = input.replace('\u{2026}', "...");
        let (city_part, state) = split_state_suffix(normalized.trim());
        let city = city_part.trim();
        let city = city.strip_suffix("...").unwrap_or(city);
        Self {
            city: city.trim().to_lowercase(),
            state: state.map(|s| s.trim().to_lowercase()),
        }
    }

    /// Parse a catalog title such as `"Dallas (TX)"`.
    pub fn from_title(title: &str) -> Self {
        let (city_part, state) = split_state_suffix(title.trim());
        Self {
            city: city_part.trim().to_lowercase(),
            state: state.map(|s| s.trim().to_lowercase()),
        }
    }
}

/// Resolve a listing location against a platform catalog.
///
/// A strict pass (same state when one was given, city prefix-compatible in
/// either direction) runs first; only when it finds nothing does a loose
/// pass accept substring matches or a bare state match. The first entry in
/// catalog order wins.
pub fn find_location<'a>(catalog: &'a [Location], raw_input: &str) -> Option<&'a Location> {
    let query = CityState::from_query(raw_input);

    let strict = catalog.iter().find(|location| {
        let title = CityState::from_title(&location.title);
        let state_ok = match &query.state {
            Some(state) => title.state.as_ref() == Some(state),
            None => true,
        };
        let city_ok = query.city.is_empty()
            || title.city.starts_with(&query.city)
            || query.city.starts_with(&title.city);
        state_ok && city_ok
    });
    if strict.is_some() {
        return strict;
    }

    let query_state = query.state.as_deref().unwrap_or("");
    catalog.iter().find(|location| {
        let title = CityState::from_title(&location.title);
        let location_state = location.state.as_deref().unwrap_or("").to_lowercase();
        title.city.contains(&query.city)
            || query.city.contains(&title.city)
            || location_state == query_state
    })
}
