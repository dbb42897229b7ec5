pub mod config;
pub mod dispatch;
pub mod error;
pub mod io;
pub mod normalize;
pub mod record;
pub mod render;
pub mod source;
pub mod template;
pub mod tier;
pub mod transport;

pub use error::{OutreachError, Result};
pub use tier::Tier;
