use std::cell::Cell;

thread_local! {
    static ACTIVE_LEVEL: Cell<usize> = const { Cell::new(0) };
}

/// Nesting level of the team the current thread is executing in.
///
/// Zero outside of any dispatch.
pub fn current_level() -> usize {
    ACTIVE_LEVEL.with(|level| level.get())
}

/// RAII guard setting the thread's active level for the lifetime of a unit
pub(crate) struct LevelGuard {
    previous: usize,
}

impl LevelGuard {
    pub(crate) fn enter(level: usize) -> Self {
        let previous = ACTIVE_LEVEL.with(|cell| cell.replace(level));
        Self { previous }
    }
}

impl Drop for LevelGuard {
    fn drop(&mut self) {
        ACTIVE_LEVEL.with(|cell| cell.set(self.previous));
    }
}
