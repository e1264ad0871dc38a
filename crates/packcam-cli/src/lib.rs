//! Terminal capture screen.
//!
//! Mounts the full capture-and-delivery pipeline behind a line-oriented terminal: each
//! stdin line is one decoder read, and the operator types `stop` or `status`.

pub mod camera;
pub mod console;
pub mod pipeline;

pub use camera::FixtureCamera;
pub use console::TerminalConsole;
pub use pipeline::{Collaborators, Pipeline};
