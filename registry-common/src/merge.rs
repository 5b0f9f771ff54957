//! Ordered n-way merge of event streams (spec §4.1).
//!
//! Each upstream (a balance ingester, the message stream, a scores sender)
//! produces events in its own non-decreasing `height` order, but the
//! streams are otherwise independent and arrive interleaved in real time.
//! `OrderedMerge` buffers one pending item per source and always emits the
//! lowest `height` among them, so the merged stream is itself
//! non-decreasing in height. Events sharing a height are ordered by a
//! random tiebreaker assigned at merge time — this exists only to avoid a
//! fixed processing bias across sources with identical heights, not for
//! correctness: nothing downstream depends on the relative order of
//! same-height events from different sources.

use std::collections::BinaryHeap;
use std::pin::Pin;
use std::task::{Context, Poll};

use futures::stream::{Stream, StreamExt};
use rand::Rng;

use crate::event::Event;

type BoxedEventStream = Pin<Box<dyn Stream<Item = Event> + Send>>;

struct Pending {
    height: u64,
    tiebreaker: u64,
    source: usize,
    event: Event,
}

impl PartialEq for Pending {
    fn eq(&self, other: &Self) -> bool {
        self.height == other.height && self.tiebreaker == other.tiebreaker
    }
}
impl Eq for Pending {}
impl PartialOrd for Pending {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}
impl Ord for Pending {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        // Reversed so `BinaryHeap` (a max-heap) pops the smallest (height, tiebreaker).
        (other.height, other.tiebreaker).cmp(&(self.height, self.tiebreaker))
    }
}

/// Merges multiple event streams into one, ordered by non-decreasing
/// `height` with randomized tiebreaking within a height.
pub struct OrderedMerge {
    sources: Vec<Option<BoxedEventStream>>,
    heap: BinaryHeap<Pending>,
}

impl OrderedMerge {
    pub fn new(sources: Vec<BoxedEventStream>) -> Self {
        Self {
            sources: sources.into_iter().map(Some).collect(),
            heap: BinaryHeap::new(),
        }
    }

    /// Wraps an arbitrary set of already-boxed streams.
    pub fn from_streams<I>(streams: I) -> Self
    where
        I: IntoIterator<Item = BoxedEventStream>,
    {
        Self::new(streams.into_iter().collect())
    }
}

impl Stream for OrderedMerge {
    type Item = Event;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();

        // Top up: poll every live source that hasn't already contributed a
        // pending item for this round, so the heap always holds at most one
        // entry per still-live source.
        let pending_sources: std::collections::HashSet<usize> =
            this.heap.iter().map(|p| p.source).collect();

        for idx in 0..this.sources.len() {
            if pending_sources.contains(&idx) {
                continue;
            }
            let Some(stream) = this.sources[idx].as_mut() else {
                continue;
            };
            match stream.as_mut().poll_next(cx) {
                Poll::Ready(Some(event)) => {
                    let height = event.height();
                    let tiebreaker: u64 = rand::rng().random();
                    this.heap.push(Pending {
                        height,
                        tiebreaker,
                        source: idx,
                        event,
                    });
                }
                Poll::Ready(None) => {
                    this.sources[idx] = None;
                }
                Poll::Pending => {}
            }
        }

        let all_exhausted = this.sources.iter().all(|s| s.is_none());

        if let Some(top) = this.heap.peek() {
            // Only safe to emit once every still-live source has either
            // contributed an item or been exhausted, otherwise a slower
            // source could later produce a lower height than what we'd emit.
            let ready_to_emit = this
                .sources
                .iter()
                .enumerate()
                .all(|(idx, s)| s.is_none() || idx == top.source || this_has_pending(&this.heap, idx));
            if ready_to_emit {
                let popped = this.heap.pop().expect("peeked Some above");
                return Poll::Ready(Some(popped.event));
            }
        }

        if all_exhausted && this.heap.is_empty() {
            return Poll::Ready(None);
        }

        Poll::Pending
    }
}

fn this_has_pending(heap: &BinaryHeap<Pending>, source: usize) -> bool {
    heap.iter().any(|p| p.source == source)
}
