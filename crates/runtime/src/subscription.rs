/// One-time subscription: registered with a handler and fired at most once.
///
/// The handler is an `FnOnce`, so a fired subscription cannot run again;
/// later events are reported back as unhandled.
pub struct OnceSubscription<E, R = ()> {
    handler: Option<Box<dyn FnOnce(E) -> R + Send>>,
}

impl<E, R> OnceSubscription<E, R> {
    pub fn new(handler: impl FnOnce(E) -> R + Send + 'static) -> Self {
        Self {
            handler: Some(Box::new(handler)),
        }
    }

    pub fn is_active(&self) -> bool {
        self.handler.is_some()
    }

    /// Delivers `event` to the handler if it has not fired yet.
    ///
    /// Returns `None` once the handler has run.
    pub fn fire(&mut self, event: E) -> Option<R> {
        let handler = self.handler.take()?;
        Some(handler(event))
    }
}

impl<E, R> std::fmt::Debug for OnceSubscription<E, R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OnceSubscription")
            .field("active", &self.is_active())
            .finish()
    }
}
