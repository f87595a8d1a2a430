//! The per-guild queue of upcoming tracks.
//!
//! The currently playing track is never in here, see [Session](super::Session).

use std::collections::VecDeque;

use delegate::delegate;
use rand::seq::SliceRandom;
use rand::Rng;

use super::Track;
use crate::error::UserError;

/// Ordered upcoming tracks, front plays next.
#[derive(Debug, Default, Clone)]
pub struct TrackQueue {
    #[allow(clippy::missing_docs_in_private_items)]
    inner: VecDeque<Track>,
}

impl TrackQueue {
    delegate! {
        to self.inner {
            /// Number of upcoming tracks.
            pub fn len(&self) -> usize;
            /// Whether nothing is queued.
            pub fn is_empty(&self) -> bool;
            /// Drop all upcoming tracks.
            pub fn clear(&mut self);
            /// Iterate from next to last.
            pub fn iter(&self) -> std::collections::vec_deque::Iter<'_, Track>;
            /// Peek at the next track.
            pub fn front(&self) -> Option<&Track>;
            /// Add to the back of the queue.
            #[call(push_back)]
            pub fn enqueue(&mut self, track: Track);
            /// Take the next track.
            #[call(pop_front)]
            pub fn pop_next(&mut self) -> Option<Track>;
        }
    }

    /// Add several tracks to the back, keeping their order.
    pub fn enqueue_many(&mut self, tracks: impl IntoIterator<Item = Track>) {
        self.inner.extend(tracks);
    }

    /// Remove and return the track at `index`, shifting later ones forward.
    /// An out of range index leaves the queue as it was.
    pub fn jump(&mut self, index: usize) -> Result<Track, UserError> {
        let len = self.inner.len();
        self.inner
            .remove(index)
            .ok_or(UserError::IndexOutOfRange { index, len })
    }

    /// Uniformly permute the upcoming tracks.
    pub fn shuffle(&mut self) {
        self.shuffle_with(&mut rand::rng());
    }

    /// [TrackQueue::shuffle] with a given source of randomness.
    pub fn shuffle_with<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        self.inner.make_contiguous().shuffle(rng);
    }
}

#[cfg(test)]
mod test {
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    use super::*;
    use crate::data::track::test::track;

    fn queue_of(names: &[&str]) -> TrackQueue {
        let mut queue = TrackQueue::default();
        queue.enqueue_many(names.iter().map(|n| track(n)));
        queue
    }

    fn titles(queue: &TrackQueue) -> Vec<String> {
        queue.iter().map(|t| t.title.clone()).collect()
    }

    #[test]
    fn pops_in_fifo_order() {
        let mut queue = queue_of(&["a", "b"]);
        queue.enqueue(track("c"));

        let popped: Vec<String> = std::iter::from_fn(|| queue.pop_next())
            .map(|t| t.title)
            .collect();
        assert_eq!(popped, ["a", "b", "c"]);
        assert!(queue.pop_next().is_none());
    }

    #[test]
    fn jump_removes_and_shifts() {
        let mut queue = queue_of(&["a", "b", "c"]);

        let jumped = queue.jump(1).expect("index in range");
        assert_eq!(jumped.title, "b");
        assert_eq!(titles(&queue), ["a", "c"]);
    }

    #[test]
    fn jump_out_of_range_is_user_error() {
        let mut queue = queue_of(&["a", "b", "c"]);

        let err = queue.jump(3).unwrap_err();
        assert!(matches!(err, UserError::IndexOutOfRange { index: 3, len: 3 }));
        assert_eq!(titles(&queue), ["a", "b", "c"]);

        let mut empty = TrackQueue::default();
        assert!(empty.jump(0).is_err());
    }

    #[test]
    fn shuffle_keeps_the_same_tracks() {
        let names: Vec<String> = (0..20).map(|i| format!("t{i}")).collect();
        let refs: Vec<&str> = names.iter().map(String::as_str).collect();
        let mut queue = queue_of(&refs);

        queue.shuffle_with(&mut StdRng::seed_from_u64(7));

        let mut shuffled = titles(&queue);
        assert_eq!(shuffled.len(), names.len());
        shuffled.sort();
        let mut expected = names.clone();
        expected.sort();
        assert_eq!(shuffled, expected);
    }

    #[test]
    fn shuffle_actually_reorders_sometimes() {
        let names: Vec<String> = (0..10).map(|i| format!("t{i}")).collect();
        let refs: Vec<&str> = names.iter().map(String::as_str).collect();
        let mut rng = StdRng::seed_from_u64(42);

        let reordered = (0..10).any(|_| {
            let mut queue = queue_of(&refs);
            queue.shuffle_with(&mut rng);
            titles(&queue) != names
        });
        assert!(reordered);
    }

    #[test]
    fn clear_empties() {
        let mut queue = queue_of(&["a", "b"]);
        queue.clear();
        assert!(queue.is_empty());
        assert_eq!(queue.len(), 0);
    }
}
