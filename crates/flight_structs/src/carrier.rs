/// Carriers accepted at the prediction boundary.
///
/// Training data may contain carriers outside this list; they are encoded like
/// any other value and simply never reach the retained feature columns.
pub const KNOWN_CARRIERS: [&str; 20] = [
    "Aerolineas Argentinas",
    "Air Canada",
    "Air France",
    "Alitalia",
    "American Airlines",
    "Austral",
    "Avianca",
    "British Airways",
    "Copa Air",
    "Delta Air Lines",
    "Gol Trans",
    "Grupo LATAM",
    "Iberia",
    "K.L.M.",
    "Latin American Wings",
    "Oceanair Linhas Aereas",
    "PLUNA",
    "Sky Airline",
    "United Airlines",
    "Qantas Airways",
];

/// Returns true if the carrier is on the allow-list (exact match).
#[must_use]
pub fn is_known_carrier(carrier: &str) -> bool {
    KNOWN_CARRIERS.contains(&carrier)
}
