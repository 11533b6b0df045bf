//! Tutorial progression engine.
//!
//! A grid of dots teaches tapping, rubbing, shaking and tilting through a
//! fixed loop of stages. The engine owns the state and the token registry;
//! drawing, status text, timers and the tilt sensor are collaborators.

pub mod engine;
pub mod error;
pub mod grid;
pub mod host;
pub mod motion;
pub mod palette;
pub mod scheduler;
pub mod stages;
pub mod state;
pub mod types;

pub use engine::{Tutorial, TutorialSnapshot};
pub use error::TutorialError;
pub use host::{Host, Renderer, Shell};
pub use stages::Stage;
