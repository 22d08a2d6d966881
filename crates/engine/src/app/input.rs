use winit::event::{ElementState, MouseButton, MouseScrollDelta};
use winit::keyboard::{KeyCode, PhysicalKey};

use crate::geometry::Point;

/// Held-key actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InputAction {
    ScrollUp,
    ScrollDown,
    ScrollLeft,
    ScrollRight,
    Quit,
}

const ACTION_COUNT: usize = 5;

#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct ActionStates {
    down: [bool; ACTION_COUNT],
}

impl ActionStates {
    pub(crate) fn set(&mut self, action: InputAction, is_down: bool) {
        self.down[action.index()] = is_down;
    }

    pub(crate) fn is_down(&self, action: InputAction) -> bool {
        self.down[action.index()]
    }
}

impl InputAction {
    const fn index(self) -> usize {
        match self {
            InputAction::ScrollUp => 0,
            InputAction::ScrollDown => 1,
            InputAction::ScrollLeft => 2,
            InputAction::ScrollRight => 3,
            InputAction::Quit => 4,
        }
    }
}

/// Input state for one simulation tick. Pressed flags are true for the
/// single tick following the press.
#[derive(Debug, Clone, Copy, Default)]
pub struct InputSnapshot {
    quit_requested: bool,
    actions: ActionStates,
    cursor_position_px: Option<Point>,
    left_click_pressed: bool,
    right_click_pressed: bool,
    overlay_toggle_pressed: bool,
    dirty_overlay_toggle_pressed: bool,
    zoom_delta_steps: i32,
    window_width: u32,
    window_height: u32,
}

impl InputSnapshot {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn quit_requested(&self) -> bool {
        self.quit_requested
    }

    pub fn is_down(&self, action: InputAction) -> bool {
        self.actions.is_down(action)
    }

    pub fn with_action_down(mut self, action: InputAction, is_down: bool) -> Self {
        self.actions.set(action, is_down);
        self
    }

    pub fn cursor_position_px(&self) -> Option<Point> {
        self.cursor_position_px
    }

    pub fn with_cursor_position_px(mut self, cursor_position_px: Option<Point>) -> Self {
        self.cursor_position_px = cursor_position_px;
        self
    }

    pub fn left_click_pressed(&self) -> bool {
        self.left_click_pressed
    }

    pub fn with_left_click_pressed(mut self, pressed: bool) -> Self {
        self.left_click_pressed = pressed;
        self
    }

    pub fn right_click_pressed(&self) -> bool {
        self.right_click_pressed
    }

    pub fn with_right_click_pressed(mut self, pressed: bool) -> Self {
        self.right_click_pressed = pressed;
        self
    }

    /// F3.
    pub fn overlay_toggle_pressed(&self) -> bool {
        self.overlay_toggle_pressed
    }

    pub fn with_overlay_toggle_pressed(mut self, pressed: bool) -> Self {
        self.overlay_toggle_pressed = pressed;
        self
    }

    /// F4.
    pub fn dirty_overlay_toggle_pressed(&self) -> bool {
        self.dirty_overlay_toggle_pressed
    }

    pub fn with_dirty_overlay_toggle_pressed(mut self, pressed: bool) -> Self {
        self.dirty_overlay_toggle_pressed = pressed;
        self
    }

    /// Positive zooms in.
    pub fn zoom_delta_steps(&self) -> i32 {
        self.zoom_delta_steps
    }

    pub fn with_zoom_delta_steps(mut self, steps: i32) -> Self {
        self.zoom_delta_steps = steps;
        self
    }

    pub fn window_size(&self) -> (u32, u32) {
        (self.window_width, self.window_height)
    }
}

#[derive(Debug, Clone, Copy, Default)]
struct EdgeKey {
    is_down: bool,
    pressed: bool,
}

impl EdgeKey {
    /// Returns true on a fresh press; held repeats are ignored.
    fn handle(&mut self, state: ElementState) -> bool {
        match state {
            ElementState::Pressed => {
                let fresh = !self.is_down;
                self.pressed |= fresh;
                self.is_down = true;
                fresh
            }
            ElementState::Released => {
                self.is_down = false;
                false
            }
        }
    }

    fn take(&mut self) -> bool {
        std::mem::take(&mut self.pressed)
    }
}

/// Collects window events between ticks.
#[derive(Debug, Default)]
pub(crate) struct InputCollector {
    pub(crate) quit_requested: bool,
    overlay_toggle: EdgeKey,
    dirty_overlay_toggle: EdgeKey,
    screenshot: EdgeKey,
    pick: EdgeKey,
    zoom_in: EdgeKey,
    zoom_out: EdgeKey,
    left_mouse: EdgeKey,
    right_mouse: EdgeKey,
    pending_zoom_steps: i32,
    action_states: ActionStates,
    cursor_position_px: Option<Point>,
    window_width: u32,
    window_height: u32,
}

impl InputCollector {
    pub(crate) fn new(window_width: u32, window_height: u32) -> Self {
        Self {
            window_width,
            window_height,
            ..Self::default()
        }
    }

    pub(crate) fn mark_quit_requested(&mut self) {
        self.quit_requested = true;
    }

    pub(crate) fn handle_key(&mut self, key: PhysicalKey, state: ElementState) {
        let is_pressed = state == ElementState::Pressed;
        let PhysicalKey::Code(code) = key else {
            return;
        };
        match code {
            KeyCode::KeyW | KeyCode::ArrowUp => self.action_states.set(InputAction::ScrollUp, is_pressed),
            KeyCode::KeyS | KeyCode::ArrowDown => {
                self.action_states.set(InputAction::ScrollDown, is_pressed)
            }
            KeyCode::KeyA | KeyCode::ArrowLeft => {
                self.action_states.set(InputAction::ScrollLeft, is_pressed)
            }
            KeyCode::KeyD | KeyCode::ArrowRight => {
                self.action_states.set(InputAction::ScrollRight, is_pressed)
            }
            KeyCode::Escape => {
                self.action_states.set(InputAction::Quit, is_pressed);
                if is_pressed {
                    self.mark_quit_requested();
                }
            }
            KeyCode::F3 => {
                self.overlay_toggle.handle(state);
            }
            KeyCode::F4 => {
                self.dirty_overlay_toggle.handle(state);
            }
            KeyCode::F12 => {
                self.screenshot.handle(state);
            }
            KeyCode::KeyP => {
                self.pick.handle(state);
            }
            KeyCode::Equal | KeyCode::NumpadAdd => {
                if self.zoom_in.handle(state) {
                    self.pending_zoom_steps = self.pending_zoom_steps.saturating_add(1);
                }
            }
            KeyCode::Minus | KeyCode::NumpadSubtract => {
                if self.zoom_out.handle(state) {
                    self.pending_zoom_steps = self.pending_zoom_steps.saturating_sub(1);
                }
            }
            _ => {}
        }
    }

    pub(crate) fn handle_mouse_input(&mut self, button: MouseButton, state: ElementState) {
        match button {
            MouseButton::Left => {
                self.left_mouse.handle(state);
            }
            MouseButton::Right => {
                self.right_mouse.handle(state);
            }
            _ => {}
        }
    }

    /// Returns the wheel steps so the cursor can count them too.
    pub(crate) fn handle_mouse_wheel(&mut self, delta: MouseScrollDelta) -> i32 {
        let steps = zoom_steps_from_scroll_delta(delta);
        self.pending_zoom_steps = self.pending_zoom_steps.saturating_add(steps);
        steps
    }

    pub(crate) fn set_window_size(&mut self, width: u32, height: u32) {
        self.window_width = width;
        self.window_height = height;
    }

    pub(crate) fn set_cursor_position_px(&mut self, x: i32, y: i32) {
        self.cursor_position_px = Some(Point::new(x, y));
    }

    pub(crate) fn clear_cursor_position(&mut self) {
        self.cursor_position_px = None;
    }

    pub(crate) fn cursor_position_px(&self) -> Option<Point> {
        self.cursor_position_px
    }

    pub(crate) fn snapshot_for_tick(&mut self) -> InputSnapshot {
        InputSnapshot {
            quit_requested: self.quit_requested,
            actions: self.action_states,
            cursor_position_px: self.cursor_position_px,
            left_click_pressed: self.left_mouse.take(),
            right_click_pressed: self.right_mouse.take(),
            overlay_toggle_pressed: self.overlay_toggle.take(),
            dirty_overlay_toggle_pressed: self.dirty_overlay_toggle.take(),
            zoom_delta_steps: std::mem::take(&mut self.pending_zoom_steps),
            window_width: self.window_width,
            window_height: self.window_height,
        }
    }

    /// F12, handled by the loop rather than the scene.
    pub(crate) fn take_screenshot_pressed(&mut self) -> bool {
        self.screenshot.take()
    }

    /// P, handled by the loop rather than the scene.
    pub(crate) fn take_pick_pressed(&mut self) -> bool {
        self.pick.take()
    }
}

fn zoom_steps_from_scroll_delta(delta: MouseScrollDelta) -> i32 {
    match delta {
        MouseScrollDelta::LineDelta(_, y) => y.round() as i32,
        MouseScrollDelta::PixelDelta(position) => {
            if position.y > 0.0 {
                1
            } else if position.y < 0.0 {
                -1
            } else {
                0
            }
        }
    }
}
