//! Store state identifiers mapped to boundary-layer names and centroids.
//!
//! The store spells states as lowercase hyphenated identifiers
//! (`andaman-&-nicobar-islands`); the boundary layer uses display names
//! (`Andaman & Nicobar Islands`). Known identifiers resolve through
//! [`REGIONS`]; anything else gets a best-effort transliteration and is
//! flagged as unmatched.

use serde::Serialize;

/// One state or union territory.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Region {
    /// Identifier as stored in the `state` column.
    pub id: &'static str,
    /// Name used by the boundary layer.
    pub name: &'static str,
    /// Approximate centroid.
    pub lat: f64,
    pub lon: f64,
}

const fn region(id: &'static str, name: &'static str, lat: f64, lon: f64) -> Region {
    Region { id, name, lat, lon }
}

/// Every region the store reports, sorted by identifier.
pub const REGIONS: &[Region] = &[
    region("andaman-&-nicobar-islands", "Andaman & Nicobar Islands", 11.7401, 92.6586),
    region("andhra-pradesh", "Andhra Pradesh", 15.9129, 79.7400),
    region("arunachal-pradesh", "Arunachal Pradesh", 28.2180, 94.7278),
    region("assam", "Assam", 26.2006, 92.9376),
    region("bihar", "Bihar", 25.0961, 85.3131),
    region("chandigarh", "Chandigarh", 30.7333, 76.7794),
    region("chhattisgarh", "Chhattisgarh", 21.2787, 81.8661),
    region(
        "dadra-&-nagar-haveli-&-daman-&-diu",
        "Dadra and Nagar Haveli and Daman and Diu",
        20.1809,
        73.0169,
    ),
    region("delhi", "Delhi", 28.7041, 77.1025),
    region("goa", "Goa", 15.2993, 74.1240),
    region("gujarat", "Gujarat", 22.2587, 71.1924),
    region("haryana", "Haryana", 29.0588, 76.0856),
    region("himachal-pradesh", "Himachal Pradesh", 31.1048, 77.1734),
    region("jammu-&-kashmir", "Jammu & Kashmir", 33.7782, 76.5762),
    region("jharkhand", "Jharkhand", 23.6102, 85.2799),
    region("karnataka", "Karnataka", 15.3173, 75.7139),
    region("kerala", "Kerala", 10.8505, 76.2711),
    region("ladakh", "Ladakh", 34.1526, 77.5771),
    region("lakshadweep", "Lakshadweep", 10.5667, 72.6417),
    region("madhya-pradesh", "Madhya Pradesh", 22.9734, 78.6569),
    region("maharashtra", "Maharashtra", 19.7515, 75.7139),
    region("manipur", "Manipur", 24.6637, 93.9063),
    region("meghalaya", "Meghalaya", 25.4670, 91.3662),
    region("mizoram", "Mizoram", 23.1645, 92.9376),
    region("nagaland", "Nagaland", 26.1584, 94.5624),
    region("odisha", "Odisha", 20.9517, 85.0985),
    region("puducherry", "Puducherry", 11.9416, 79.8083),
    region("punjab", "Punjab", 31.1471, 75.3412),
    region("rajasthan", "Rajasthan", 27.0238, 74.2179),
    region("sikkim", "Sikkim", 27.5330, 88.5122),
    region("tamil-nadu", "Tamil Nadu", 11.1271, 78.6569),
    region("telangana", "Telangana", 18.1124, 79.0193),
    region("tripura", "Tripura", 23.9408, 91.9882),
    region("uttar-pradesh", "Uttar Pradesh", 26.8467, 80.9462),
    region("uttarakhand", "Uttarakhand", 30.0668, 79.0193),
    region("west-bengal", "West Bengal", 22.9868, 87.8550),
];

/// Display name and centroid of a store identifier.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GeoName {
    pub name: String,
    /// `false` when the identifier is not in [`REGIONS`] and `name` is a
    /// transliteration.
    pub matched: bool,
    pub lat: Option<f64>,
    pub lon: Option<f64>,
}

/// Look up a store identifier. Surrounding whitespace and case are ignored.
pub fn lookup(id: &str) -> Option<&'static Region> {
    let wanted = id.trim().to_lowercase();
    REGIONS
        .binary_search_by(|region| region.id.cmp(wanted.as_str()))
        .ok()
        .map(|index| &REGIONS[index])
}

/// Resolve a store identifier, falling back to [`transliterate`].
pub fn resolve(id: &str) -> GeoName {
    match lookup(id) {
        Some(region) => GeoName {
            name: region.name.to_string(),
            matched: true,
            lat: Some(region.lat),
            lon: Some(region.lon),
        },
        None => {
            tracing::debug!(state = id, "state identifier not in region table");
            GeoName {
                name: transliterate(id),
                matched: false,
                lat: None,
                lon: None,
            }
        }
    }
}

/// Hyphens become spaces and words are capitalized; the connector `and`
/// stays lowercase and `&` is kept as is.
pub fn transliterate(id: &str) -> String {
    id.trim()
        .split('-')
        .filter(|word| !word.is_empty())
        .map(|word| {
            if word.eq_ignore_ascii_case("and") {
                return String::from("and");
            }
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn region_table_is_sorted_for_lookup() {
        assert_eq!(REGIONS.len(), 36);
        assert!(REGIONS.windows(2).all(|pair| pair[0].id < pair[1].id));
    }

    #[test]
    fn connector_identifiers_resolve_exactly() {
        let islands = resolve("andaman-&-nicobar-islands");
        assert_eq!(islands.name, "Andaman & Nicobar Islands");
        assert!(islands.matched);

        let dnh = resolve("dadra-&-nagar-haveli-&-daman-&-diu");
        assert_eq!(dnh.name, "Dadra and Nagar Haveli and Daman and Diu");
        assert_eq!(dnh.lat, Some(20.1809));

        assert_eq!(lookup(" Jammu-&-Kashmir ").map(|region| region.name), Some("Jammu & Kashmir"));
    }

    #[test]
    fn unknown_identifiers_fall_back_and_are_flagged() {
        let name = resolve("daman-and-diu");
        assert_eq!(name.name, "Daman and Diu");
        assert!(!name.matched);
        assert_eq!(name.lat, None);
    }

    #[test]
    fn transliteration_keeps_ampersand() {
        assert_eq!(transliterate("andaman-&-nicobar-islands"), "Andaman & Nicobar Islands");
        assert_eq!(transliterate("TAMIL-NADU"), "Tamil Nadu");
    }
}
