use crate::catalog::Track;
use crate::menu::Menu;
use serde::{Deserialize, Serialize};

/// Track ids compared when deciding whether two lists are the same queue.
pub const SAME_QUEUE_PROBE: usize = 10;

/// Same length and the leading track ids match.
pub fn same_queue(a: &[Track], b: &[Track]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let n = a.len().min(SAME_QUEUE_PROBE);
    a[..n].iter().zip(&b[..n]).all(|(x, y)| x.id == y.id)
}

#[derive(Debug, Clone, Default)]
pub struct PlayQueue {
    tracks: Vec<Track>,
    current: Option<usize>,
    origin_key: String,
    /// Copy of the menu that produced the queue, used to fetch more tracks
    /// while that menu is not on screen.
    origin_menu: Option<Menu>,
}

impl PlayQueue {
    pub fn new(
        tracks: Vec<Track>,
        origin_key: impl Into<String>,
        start: usize,
        origin_menu: Option<Menu>,
    ) -> Self {
        let current = if tracks.is_empty() {
            None
        } else {
            Some(start.min(tracks.len() - 1))
        };
        Self {
            tracks,
            current,
            origin_key: origin_key.into(),
            origin_menu,
        }
    }

    pub fn tracks(&self) -> &[Track] {
        &self.tracks
    }

    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    pub fn current_index(&self) -> Option<usize> {
        self.current
    }

    pub fn current_track(&self) -> Option<&Track> {
        self.current.and_then(|i| self.tracks.get(i))
    }

    pub fn current_track_mut(&mut self) -> Option<&mut Track> {
        self.current.and_then(|i| self.tracks.get_mut(i))
    }

    pub fn set_current(&mut self, index: usize) {
        if index < self.tracks.len() {
            self.current = Some(index);
        }
    }

    pub fn origin_key(&self) -> &str {
        &self.origin_key
    }

    pub fn set_origin_key(&mut self, key: impl Into<String>) {
        self.origin_key = key.into();
    }

    pub fn origin_menu_mut(&mut self) -> Option<&mut Menu> {
        self.origin_menu.as_mut()
    }

    pub fn set_origin_menu(&mut self, menu: Menu) {
        self.origin_menu = Some(menu);
    }

    pub fn contains(&self, id: &str) -> bool {
        self.tracks.iter().any(|t| t.id == id)
    }

    pub fn same_tracks(&self, other: &[Track]) -> bool {
        same_queue(&self.tracks, other)
    }

    pub fn extend(&mut self, tracks: impl IntoIterator<Item = Track>) {
        self.tracks.extend(tracks);
        if self.current.is_none() && !self.tracks.is_empty() {
            self.current = Some(0);
        }
    }

    /// Take the tail of `menu_tracks` when it continues this queue.
    /// Returns how many tracks were appended.
    pub fn absorb(&mut self, menu_tracks: &[Track]) -> usize {
        let n = self.tracks.len();
        if menu_tracks.len() <= n {
            return 0;
        }
        let probe = n.min(SAME_QUEUE_PROBE);
        let prefix_matches = self.tracks[..probe]
            .iter()
            .zip(&menu_tracks[..probe])
            .all(|(a, b)| a.id == b.id);
        if !prefix_matches {
            return 0;
        }
        self.tracks.extend_from_slice(&menu_tracks[n..]);
        menu_tracks.len() - n
    }

    pub fn snapshot(&self) -> QueueSnapshot {
        QueueSnapshot {
            tracks: self.tracks.clone(),
            current_index: self.current,
            origin_key: self.origin_key.clone(),
        }
    }

    pub fn from_snapshot(snapshot: QueueSnapshot) -> Self {
        let current = snapshot
            .current_index
            .filter(|&i| i < snapshot.tracks.len());
        Self {
            tracks: snapshot.tracks,
            current,
            origin_key: snapshot.origin_key,
            origin_menu: None,
        }
    }
}

/// Persisted form of a [`PlayQueue`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueueSnapshot {
    pub tracks: Vec<Track>,
    pub current_index: Option<usize>,
    #[serde(default)]
    pub origin_key: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::track;

    fn make_tracks(ids: &[&str]) -> Vec<Track> {
        ids.iter().map(|id| track(id)).collect()
    }

    #[test]
    fn test_same_queue_is_reflexive() {
        let a = make_tracks(&["1", "2", "3"]);
        assert!(same_queue(&a, &a));
        assert!(same_queue(&[], &[]));
    }

    #[test]
    fn test_same_queue_false_on_length_mismatch() {
        let a = make_tracks(&["1", "2", "3"]);
        let b = make_tracks(&["1", "2"]);
        assert!(!same_queue(&a, &b));
        assert!(!same_queue(&b, &a));
    }

    #[test]
    fn test_same_queue_only_probes_leading_ids() {
        let ids: Vec<String> = (0..12).map(|i| i.to_string()).collect();
        let mut a: Vec<Track> = ids.iter().map(|id| track(id)).collect();
        let b = a.clone();
        a[11].id = "changed".into();
        assert!(same_queue(&a, &b));
        a[3].id = "changed".into();
        assert!(!same_queue(&a, &b));
    }

    #[test]
    fn test_new_clamps_start() {
        let q = PlayQueue::new(make_tracks(&["1", "2"]), "k", 9, None);
        assert_eq!(q.current_index(), Some(1));
        assert!(PlayQueue::new(vec![], "k", 0, None).current_index().is_none());
    }

    #[test]
    fn test_absorb_takes_continuation_only() {
        let mut q = PlayQueue::new(make_tracks(&["1", "2"]), "k", 0, None);
        assert_eq!(q.absorb(&make_tracks(&["1", "2", "3", "4"])), 2);
        assert_eq!(q.len(), 4);
        assert_eq!(q.absorb(&make_tracks(&["x", "y", "z", "w", "v"])), 0);
        assert_eq!(q.absorb(&make_tracks(&["1"])), 0);
        assert_eq!(q.len(), 4);
    }

    #[test]
    fn test_snapshot_round_trip() {
        let mut q = PlayQueue::new(make_tracks(&["a", "b", "c"]), "tracks:playlist:pl1", 0, None);
        q.set_current(2);
        let restored = PlayQueue::from_snapshot(q.snapshot());
        assert_eq!(restored.current_index(), Some(2));
        assert_eq!(restored.origin_key(), "tracks:playlist:pl1");
        assert!(restored.same_tracks(q.tracks()));
    }

    #[test]
    fn test_snapshot_with_bad_index_is_dropped() {
        let snap = QueueSnapshot {
            tracks: make_tracks(&["a"]),
            current_index: Some(4),
            origin_key: String::new(),
        };
        assert!(PlayQueue::from_snapshot(snap).current_index().is_none());
    }
}
