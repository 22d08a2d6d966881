/// Presentation backend for the screen buffer.
pub trait VideoDriver {
    /// Queues a changed screen rectangle for presentation.
    fn make_dirty(&mut self, left: i32, top: i32, width: i32, height: i32);

    /// When true the OS draws the pointer and the software cursor is skipped.
    fn use_system_cursor(&self) -> bool {
        false
    }

    fn clear_system_sprites(&mut self) {}
}
