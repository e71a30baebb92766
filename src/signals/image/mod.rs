// Image signal providers.
//
// Every provider reads the same decoded RGB buffer. Pixel work is CPU-bound,
// so each provider moves it onto tokio's blocking pool.

pub mod color;
pub mod edges;
pub mod objects;
pub mod pixels;
pub mod rules;
pub mod texture;
