pub mod error;
pub mod run;
pub mod song;

pub use error::*;
pub use run::*;
pub use song::*;
