//! Face enrollment for a new student.
//!
//! A fixed number of images is captured, each after a short countdown,
//! and sent to the registration endpoint in a single request.

mod runner;
mod session;

pub use runner::{run_enrollment, EnrollmentReport};
pub use session::{CountdownStep, EnrollError, EnrollmentSession, ENROLL_CAMERA_UNAVAILABLE_TEXT};
