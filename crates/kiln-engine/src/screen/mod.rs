//! Logic-thread screen facade.
//!
//! Responsibilities:
//! - drive the per-frame broadcast (`RenderScreen::update`)
//! - pace logic updates against the configured frame rate
//! - nest viewports: each narrows the clip and offsets its children
//! - render viewports into off-screen targets and read pixels back
//!
//! Everything here is single-threaded (`Rc`/`RefCell`). GPU work is posted
//! to the render runner the screen owns.

mod config;
mod flash;
mod handle;
mod render_screen;
mod target;
mod viewport;

pub use config::ScreenConfig;
pub use flash::FlashController;
pub use handle::ScreenHandle;
pub use render_screen::RenderScreen;
pub use target::RenderTarget;
pub use viewport::Viewport;
