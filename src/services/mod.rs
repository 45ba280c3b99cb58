pub mod conflict;
pub mod enrollment;
pub mod schedule;

pub use conflict::{check_conflict, ConflictResult};
pub use enrollment::{EnrollmentOutcome, EnrollmentService};
pub use schedule::ScheduleService;
