// Text classifiers — trait-based abstraction over swappable model backends.
//
// ClassifierService is the interface. The ONNX backend runs toxic-bert and an
// SST-2 sentiment model locally (feature `onnx`); PerspectiveClassifier calls
// Google's Perspective API. A backend that fails to load is left out and the
// text providers degrade instead of failing.

pub mod download;
#[cfg(feature = "onnx")]
pub mod onnx;
pub mod perspective;
pub mod rate_limiter;
pub mod traits;
