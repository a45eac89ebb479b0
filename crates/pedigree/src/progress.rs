/// Receiver for coarse progress notifications while a pedigree loads
///
/// `tick` is called with a message when a milestone starts and with an
/// increment when it finishes.
pub trait Progress {
    fn tick(&mut self, message: Option<&str>, increment: usize);
}

// Blanket implementation for closures
impl<F> Progress for F
where
    F: FnMut(Option<&str>, usize),
{
    fn tick(&mut self, message: Option<&str>, increment: usize) {
        self(message, increment)
    }
}

/// Progress sink that ignores every notification
#[derive(Debug, Clone, Copy, Default)]
pub struct NoProgress;

impl Progress for NoProgress {
    fn tick(&mut self, _message: Option<&str>, _increment: usize) {}
}
