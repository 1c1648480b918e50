//! Convolutional squat classifier
//!
//! Layers, the fixed network architecture, and the optimizer used to train it.

pub mod layers;
pub mod network;
pub mod optimizer;

pub use network::{ForwardPass, SquatNet, HIDDEN_UNITS};
pub use optimizer::Adam;
