//! Presence registry.
//!
//! Holds the roster of participants currently in the room and the color index
//! each one renders with. The registry itself has no notion of connection
//! state; the session decides when it may be mutated and clears it whenever
//! the connection drops.
//!
//! Two kinds of update layer on top of each other:
//! - [`PresenceRegistry::replace_all`] installs an authoritative snapshot
//!   (`user_list`).
//! - [`PresenceRegistry::upsert`] / [`PresenceRegistry::remove`] apply live
//!   `join`/`leave` events on top of the last snapshot.

use parley_proto::Roster;

/// Number of avatar colors the reference palette provides.
pub const DEFAULT_PALETTE_SIZE: u32 = 8;

/// Roster of present participants.
#[derive(Debug, Clone)]
pub struct PresenceRegistry {
    roster: Roster,
    palette_size: u32,
}

impl Default for PresenceRegistry {
    fn default() -> Self {
        Self::new(DEFAULT_PALETTE_SIZE)
    }
}

impl PresenceRegistry {
    /// Create an empty registry assigning colors in `0..palette_size`.
    pub fn new(palette_size: u32) -> Self {
        Self { roster: Roster::new(), palette_size: palette_size.max(1) }
    }

    /// Add `name` if absent and return its color index.
    ///
    /// New participants get a color derived from their name, so every client
    /// picks the same color for the same person. Existing entries keep the
    /// color they already have (possibly server-assigned).
    pub fn upsert(&mut self, name: &str) -> u32 {
        if let Some(&color) = self.roster.get(name) {
            return color;
        }

        let color = color_for(name, self.palette_size);
        self.roster.insert(name.to_owned(), color);
        color
    }

    /// Remove `name`. Returns `true` if it was present.
    pub fn remove(&mut self, name: &str) -> bool {
        self.roster.remove(name).is_some()
    }

    /// Replace the whole roster with an authoritative snapshot.
    pub fn replace_all(&mut self, roster: Roster) {
        self.roster = roster;
    }

    /// Remove everyone. Returns `true` if the roster was non-empty.
    pub fn clear(&mut self) -> bool {
        let had_entries = !self.roster.is_empty();
        self.roster.clear();
        had_entries
    }

    /// Number of present participants.
    pub fn count(&self) -> usize {
        self.roster.len()
    }

    /// True if nobody is present.
    pub fn is_empty(&self) -> bool {
        self.roster.is_empty()
    }

    /// True if `name` is present.
    pub fn contains(&self, name: &str) -> bool {
        self.roster.contains_key(name)
    }

    /// Color index of `name`. `None` if absent.
    pub fn color_of(&self, name: &str) -> Option<u32> {
        self.roster.get(name).copied()
    }

    /// Current roster.
    pub fn roster(&self) -> &Roster {
        &self.roster
    }

    /// Owned copy of the roster for handing to the presentation layer.
    pub fn snapshot(&self) -> Roster {
        self.roster.clone()
    }
}

/// FNV-1a over the name bytes, reduced to the palette.
fn color_for(name: &str, palette_size: u32) -> u32 {
    const OFFSET_BASIS: u32 = 0x811c_9dc5;
    const PRIME: u32 = 0x0100_0193;

    let hash = name
        .bytes()
        .fold(OFFSET_BASIS, |hash, byte| (hash ^ u32::from(byte)).wrapping_mul(PRIME));
    hash % palette_size
}
