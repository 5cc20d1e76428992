pub mod drive_service;
pub mod grading_service;
pub mod judge_service;
pub mod notification_service;
pub mod round_projector;
pub mod shortlist_service;
pub mod statistics;
pub mod submission_service;
