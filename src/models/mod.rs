pub mod enrollment;
pub mod schedule;

pub use enrollment::{NewEnrollmentRequest, PendingEnrollment, SectionChoice, SubjectAssignment};
pub use schedule::{entry_id, parse_hhmm, section_name, NewScheduleRequest, ScheduleEntry, Weekday};
