//! The built-in map pool and map-name helpers.

use rand::seq::SliceRandom;

/// Maps matches are played on. The leading `(N)` is the player count of the
/// map, used by the `2p`/`3p`/`4p` selectors.
pub(crate) const MAP_POOL: &[&str] = &[
    "(2)Benzene.scx",
    "(2)Destination.scx",
    "(2)Heartbreak Ridge.scx",
    "(3)Neo Moon Glaive.scx",
    "(3)Tau Cross.scx",
    "(4)Andromeda.scx",
    "(4)Circuit Breaker.scx",
    "(4)Electric Circuit.scx",
    "(4)Empire of the Sun.scm",
    "(4)Fighting Spirit.scx",
    "(4)Icarus.scm",
    "(4)Jade.scx",
    "(4)La Mancha1.1.scx",
    "(4)Python.scx",
    "(4)Roadrunner.scx",
];

/// The map pool in a fresh random order.
pub(crate) fn shuffled_pool() -> Vec<&'static str> {
    let mut maps = MAP_POOL.to_vec();
    maps.shuffle(&mut rand::thread_rng());
    maps
}

/// First pool map containing `filter`, case-insensitively.
pub(crate) fn find_map(filter: &str) -> Option<&'static str> {
    let needle = filter.to_ascii_lowercase();
    MAP_POOL
        .iter()
        .copied()
        .find(|map| map.to_ascii_lowercase().contains(&needle))
}

/// Map file name without the player-count prefix and extension:
/// `(4)Fighting Spirit.scx` becomes `Fighting Spirit`.
pub(crate) fn short_name(map: &str) -> &str {
    let start = map.find(')').map(|i| i + 1).unwrap_or(0);
    let end = map.rfind('.').filter(|&i| i >= start).unwrap_or(map.len());
    map[start..end].trim()
}
