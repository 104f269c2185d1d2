pub mod logging;
pub mod normalize;

pub use logging::truncate_text;
pub use normalize::normalize;
