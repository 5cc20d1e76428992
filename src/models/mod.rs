pub mod coding_question;
pub mod drive;
pub mod drive_candidate;
pub mod notification_job;
pub mod submission;
