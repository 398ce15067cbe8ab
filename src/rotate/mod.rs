//! Size-estimated segment rotation.
//!
//! Three cooperating pieces: [`SizeEstimator`] approximates bytes accumulated
//! in the open segment, [`RotationPolicy`] decides when that approximation
//! crosses the configured target, and [`WriteSession`] owns the underlying
//! writer lifecycle, performing the close-and-reopen cycle when the policy
//! fires.

mod estimator;
mod policy;
mod session;

pub use estimator::{SizeEstimator, MIN_RECALIBRATION_SAMPLE};
pub use policy::RotationPolicy;
pub use session::{SegmentSummary, SessionError, WriteSession};
