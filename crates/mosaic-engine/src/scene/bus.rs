use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::{Rc, Weak};

type Mailbox<E> = Rc<RefCell<VecDeque<E>>>;

/// Typed single-threaded publish/subscribe channel.
///
/// Every subscriber gets its own mailbox; `publish` clones the event into each
/// live mailbox. Dropping a [`Subscription`] detaches it, so there is no
/// handle bookkeeping on the publisher side.
#[derive(Debug)]
pub struct EventBus<E> {
    subscribers: Vec<Weak<RefCell<VecDeque<E>>>>,
}

impl<E> Default for EventBus<E> {
    fn default() -> Self {
        Self { subscribers: Vec::new() }
    }
}

impl<E: Clone> EventBus<E> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a new subscriber. Events published before this call are not delivered.
    pub fn subscribe(&mut self) -> Subscription<E> {
        let mailbox: Mailbox<E> = Rc::new(RefCell::new(VecDeque::new()));
        self.subscribers.push(Rc::downgrade(&mailbox));
        Subscription { mailbox }
    }

    pub fn publish(&mut self, event: E) {
        self.subscribers.retain(|weak| match weak.upgrade() {
            Some(mailbox) => {
                mailbox.borrow_mut().push_back(event.clone());
                true
            }
            None => false,
        });
    }

    /// Number of live subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.iter().filter(|w| w.strong_count() > 0).count()
    }
}

/// Receiving end returned by [`EventBus::subscribe`].
#[derive(Debug)]
pub struct Subscription<E> {
    mailbox: Mailbox<E>,
}

impl<E> Subscription<E> {
    /// Pops the oldest pending event.
    pub fn next_event(&self) -> Option<E> {
        self.mailbox.borrow_mut().pop_front()
    }

    /// Takes every pending event in publish order.
    pub fn drain(&self) -> Vec<E> {
        self.mailbox.borrow_mut().drain(..).collect()
    }

    pub fn pending(&self) -> usize {
        self.mailbox.borrow().len()
    }

    /// Detaches from the bus. Equivalent to dropping the subscription.
    pub fn unsubscribe(self) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn each_subscriber_sees_every_event() {
        let mut bus = EventBus::new();
        let a = bus.subscribe();
        let b = bus.subscribe();
        bus.publish(1);
        bus.publish(2);
        assert_eq!(a.drain(), vec![1, 2]);
        assert_eq!(b.next_event(), Some(1));
        assert_eq!(b.pending(), 1);
    }

    #[test]
    fn unsubscribe_detaches() {
        let mut bus = EventBus::new();
        let a = bus.subscribe();
        let b = bus.subscribe();
        a.unsubscribe();
        bus.publish("x");
        assert_eq!(bus.subscriber_count(), 1);
        assert_eq!(b.drain(), vec!["x"]);
    }

    #[test]
    fn late_subscriber_misses_earlier_events() {
        let mut bus = EventBus::new();
        bus.publish(7);
        let s = bus.subscribe();
        assert_eq!(s.next_event(), None);
    }
}
