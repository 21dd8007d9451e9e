//! Flattening of downloadables into per-track work items.
//!
//! A [`Downloadable`] is a container or an arbitrarily nested list of them.
//! [`FanOut`] walks it depth-first with an explicit stack and yields one
//! `(container, item)` pair per track, in stored order. Items of a
//! collection are produced one at a time, so nothing is built for a track
//! before it is its turn.

use std::sync::Arc;

use crate::container::{Container, ItemData};

#[derive(Clone, Debug)]
pub enum Downloadable {
    Container(Arc<Container>),
    List(Vec<Downloadable>),
}

impl Downloadable {
    /// Total number of tracks across all containers.
    #[must_use]
    pub fn size(&self) -> usize {
        self.containers().map(|container| container.size()).sum()
    }

    /// Whether this is exactly one single-track container.
    #[must_use]
    pub fn is_single(&self) -> bool {
        matches!(self, Self::Container(container) if container.is_single())
    }

    /// All containers, depth-first in stored order.
    pub fn containers(&self) -> impl Iterator<Item = &Arc<Container>> {
        let mut stack = vec![self];
        std::iter::from_fn(move || {
            while let Some(next) = stack.pop() {
                match next {
                    Self::Container(container) => return Some(container),
                    Self::List(children) => stack.extend(children.iter().rev()),
                }
            }
            None
        })
    }

    /// Consumes the downloadable into its work items.
    #[must_use]
    pub fn fan_out(self) -> FanOut {
        FanOut {
            stack: vec![Frame::Object(self)],
        }
    }
}

impl From<Container> for Downloadable {
    fn from(container: Container) -> Self {
        Self::Container(Arc::new(container))
    }
}

enum Frame {
    Object(Downloadable),
    Tracks {
        container: Arc<Container>,
        next: usize,
    },
}

/// Lazy, non-restartable sequence of work items.
pub struct FanOut {
    stack: Vec<Frame>,
}

impl Iterator for FanOut {
    type Item = (Arc<Container>, ItemData);

    fn next(&mut self) -> Option<Self::Item> {
        while let Some(frame) = self.stack.pop() {
            match frame {
                Frame::Object(Downloadable::List(children)) => {
                    // Reversed so that the first child is popped first.
                    self.stack
                        .extend(children.into_iter().rev().map(Frame::Object));
                }
                Frame::Object(Downloadable::Container(container)) => {
                    self.stack.push(Frame::Tracks { container, next: 0 });
                }
                Frame::Tracks { container, next } => {
                    if let Some(item) = container.item(next) {
                        self.stack.push(Frame::Tracks {
                            container: Arc::clone(&container),
                            next: next + 1,
                        });
                        return Some((container, item));
                    }
                }
            }
        }

        None
    }
}

#[cfg(test)]
mod tests {
    use tokio_util::sync::CancellationToken;

    use super::*;
    use crate::{container::Content, protocol::api::TrackRef};

    fn track(id: i64) -> TrackRef {
        serde_json::from_str(&format!(r#"{{"id": {id}, "title": "T{id}"}}"#)).unwrap()
    }

    fn collection(ids: &[i64]) -> Downloadable {
        let content = Content::Collection {
            tracks: ids.iter().copied().map(track).collect(),
            album: None,
            playlist: None,
        };
        Container::new("C", content, &CancellationToken::new()).into()
    }

    fn single(id: i64) -> Downloadable {
        Container::single(track(id), None, &CancellationToken::new()).into()
    }

    fn ids(downloadable: Downloadable) -> Vec<i64> {
        downloadable
            .fan_out()
            .map(|(_, item)| item.track.id.unwrap().get())
            .collect()
    }

    #[test]
    fn single_yields_one() {
        assert_eq!(ids(single(5)), [5]);
    }

    #[test]
    fn collection_yields_stored_order() {
        let downloadable = collection(&[3, 1, 2]);
        assert_eq!(downloadable.size(), 3);
        assert_eq!(ids(downloadable), [3, 1, 2]);
    }

    #[test]
    fn nested_lists_flatten_in_order() {
        let mut nested = Downloadable::List(vec![single(9)]);
        for depth in 1..=1000 {
            nested = Downloadable::List(vec![nested, single(depth)]);
        }
        assert_eq!(nested.size(), 1001);

        let flat = ids(nested);
        assert_eq!(flat.len(), 1001);
        assert_eq!(flat[0], 9);
        assert_eq!(flat[1], 1);
        assert_eq!(flat[1000], 1000);
    }

    #[test]
    fn mixed_list_keeps_containers_together() {
        let downloadable = Downloadable::List(vec![
            collection(&[1, 2]),
            Downloadable::List(vec![]),
            single(3),
            collection(&[4]),
        ]);
        assert!(!downloadable.is_single());
        assert_eq!(downloadable.containers().count(), 3);

        let pairs: Vec<_> = downloadable.fan_out().collect();
        assert_eq!(pairs.len(), 4);
        assert!(Arc::ptr_eq(&pairs[0].0, &pairs[1].0));
        assert!(!Arc::ptr_eq(&pairs[1].0, &pairs[2].0));
        assert_eq!(pairs[1].1.position, 1);
    }
}
