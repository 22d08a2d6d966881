//! Windowed shell: event loop, fixed-step simulation and presentation.

mod input;
mod loop_runner;
mod presenter;
mod scene;

pub use input::{InputAction, InputSnapshot};
pub use loop_runner::{run_app, AppError, LoopConfig, SLOW_FRAME_ENV_VAR};
pub use presenter::PixelsPresenter;
pub use scene::{Scene, SceneContext};
