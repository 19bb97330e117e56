//! Change-set fan-out to subscribers.

use crate::context::ChangeSet;
use crossbeam::channel::{unbounded, Receiver, Sender};
use std::sync::{Mutex, PoisonError};

#[derive(Default)]
pub(crate) struct ChangeNotifier {
    subscribers: Mutex<Vec<Sender<ChangeSet>>>,
}

impl ChangeNotifier {
    pub(crate) fn subscribe(&self) -> Receiver<ChangeSet> {
        let (sender, receiver) = unbounded();
        self.subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(sender);
        receiver
    }

    /// Sends `changes` to every live subscriber and drops disconnected ones.
    pub(crate) fn publish(&self, changes: &ChangeSet) {
        let mut subscribers = self
            .subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        subscribers.retain(|sender| sender.send(changes.clone()).is_ok());
    }

    #[cfg(test)]
    fn subscriber_count(&self) -> usize {
        self.subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

#[cfg(test)]
mod tests {
    use super::ChangeNotifier;
    use crate::context::ChangeSet;

    #[test]
    fn publish_reaches_every_subscriber() {
        let notifier = ChangeNotifier::default();
        let first = notifier.subscribe();
        let second = notifier.subscribe();

        notifier.publish(&ChangeSet::store_reset("view"));

        assert!(first.try_recv().unwrap().store_reset);
        assert!(second.try_recv().unwrap().store_reset);
    }

    #[test]
    fn dropped_subscribers_are_pruned() {
        let notifier = ChangeNotifier::default();
        let kept = notifier.subscribe();
        drop(notifier.subscribe());

        notifier.publish(&ChangeSet::store_reset("view"));

        assert_eq!(notifier.subscriber_count(), 1);
        assert_eq!(kept.len(), 1);
    }
}
