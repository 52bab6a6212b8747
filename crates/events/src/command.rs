use expenseshare_core::GroupId;

/// A command targets a specific group stream.
///
/// Commands represent **intent** (e.g. "record this expense"). They are
/// transient; accepted commands become events, rejected ones become errors.
///
/// The dispatcher uses `target_group_id()` to pick which stream to load,
/// rehydrate and append to, so a command never touches more than one group.
pub trait Command: Clone + core::fmt::Debug + Send + Sync + 'static {
    fn target_group_id(&self) -> GroupId;
}
