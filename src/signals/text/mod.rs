// Text signal providers.

pub mod classifier;
pub mod patterns;
pub mod sentiment;
pub mod structural;
