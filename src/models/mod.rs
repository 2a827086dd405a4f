pub mod ids;
pub mod issue;
pub mod status;

pub use ids::*;
pub use issue::*;
pub use status::*;
