//! CLI commands implementation

pub mod init;
pub mod maintain;
pub mod search;
pub mod status;

pub use init::*;
pub use maintain::*;
pub use search::*;
pub use status::*;
