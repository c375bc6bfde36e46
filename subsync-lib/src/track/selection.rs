//! Which track occupies which display slot, per stream class.

use super::{DisplaySlot, StreamKind, TrackId};

const MAX_SLOTS: usize = 2;

/// Session-scoped mapping from (stream class, slot) to at most one track.
///
/// A track occupies at most one slot at a time.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelectionTable {
    slots: [[Option<TrackId>; MAX_SLOTS]; 3],
}

impl SelectionTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, kind: StreamKind, slot: DisplaySlot) -> Option<TrackId> {
        if slot.index() >= kind.slot_count() {
            return None;
        }
        self.slots[kind.index()][slot.index()]
    }

    /// Put `track` into `slot`, or clear the slot with `None`.
    ///
    /// The track is removed from any other slot it held. Returns `false` when
    /// the stream class has no such slot.
    pub fn set(&mut self, kind: StreamKind, slot: DisplaySlot, track: Option<TrackId>) -> bool {
        if slot.index() >= kind.slot_count() {
            return false;
        }
        if let Some(id) = track {
            self.remove(id);
        }
        self.slots[kind.index()][slot.index()] = track;
        true
    }

    /// Clear every slot holding `track`.
    pub fn remove(&mut self, track: TrackId) {
        for row in self.slots.iter_mut() {
            for entry in row.iter_mut() {
                if *entry == Some(track) {
                    *entry = None;
                }
            }
        }
    }

    /// First subtitle slot holding `track`, scanning in slot order.
    pub fn resolve_order(&self, track: TrackId) -> Option<DisplaySlot> {
        self.order_of(StreamKind::Sub, track)
    }

    pub fn order_of(&self, kind: StreamKind, track: TrackId) -> Option<DisplaySlot> {
        DisplaySlot::ALL
            .into_iter()
            .take(kind.slot_count())
            .find(|slot| self.slots[kind.index()][slot.index()] == Some(track))
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unselected_tracks_resolve_to_none() {
        let mut table = SelectionTable::new();
        table.set(StreamKind::Sub, DisplaySlot::Primary, Some(TrackId(1)));
        for id in [0, 2, 3, 99] {
            assert_eq!(table.resolve_order(TrackId(id)), None);
        }
    }

    #[test]
    fn resolves_primary_and_secondary() {
        let mut table = SelectionTable::new();
        table.set(StreamKind::Sub, DisplaySlot::Primary, Some(TrackId(1)));
        table.set(StreamKind::Sub, DisplaySlot::Secondary, Some(TrackId(2)));
        assert_eq!(table.resolve_order(TrackId(1)), Some(DisplaySlot::Primary));
        assert_eq!(table.resolve_order(TrackId(2)), Some(DisplaySlot::Secondary));
    }

    #[test]
    fn moving_a_track_vacates_its_old_slot() {
        let mut table = SelectionTable::new();
        table.set(StreamKind::Sub, DisplaySlot::Primary, Some(TrackId(1)));
        table.set(StreamKind::Sub, DisplaySlot::Secondary, Some(TrackId(1)));
        assert_eq!(table.get(StreamKind::Sub, DisplaySlot::Primary), None);
        assert_eq!(table.resolve_order(TrackId(1)), Some(DisplaySlot::Secondary));
    }

    #[test]
    fn video_has_no_secondary_slot() {
        let mut table = SelectionTable::new();
        assert!(!table.set(StreamKind::Video, DisplaySlot::Secondary, Some(TrackId(4))));
        assert!(table.set(StreamKind::Video, DisplaySlot::Primary, Some(TrackId(4))));
        assert_eq!(table.get(StreamKind::Video, DisplaySlot::Secondary), None);
        assert_eq!(table.resolve_order(TrackId(4)), None);
        assert_eq!(
            table.order_of(StreamKind::Video, TrackId(4)),
            Some(DisplaySlot::Primary)
        );
    }
}
