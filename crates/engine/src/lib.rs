//! Skywave Engine library.
//!
//! Everything that talks to the outside world:
//!
//! - `infrastructure/` - Port traits and their implementations (generation
//!   service client, synthesis service client, offline audio store)
//! - `pipeline` - The content creator: mode state machine, probes, fallback
//! - `validation` - Structural validation of generated text
//! - `settings` - Environment-backed configuration

pub mod infrastructure;
pub mod pipeline;
pub mod settings;
pub mod validation;

pub use pipeline::{ContentCreator, ContentRequest, Mode};
pub use settings::ApiSettings;
