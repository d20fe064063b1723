/// Side channel told about lockouts. Must not block or fail the caller.
pub trait LockoutNotifier: Send + Sync + 'static {
    fn notify_lockout(&self);
}

/// No-op notifier, for when no beacon endpoint is configured.
impl LockoutNotifier for () {
    fn notify_lockout(&self) {}
}
