//! Path-sampling estimators: the bidirectional path tracer and the
//! Metropolis light transport sampler built on top of it.

pub mod bdpt;
pub mod mlt;

pub use self::bdpt::BidirPathTracer;
pub use self::mlt::MltRenderer;
