mod file_activity;

pub use file_activity::{ActivityFilter, ActivityType, FileActivity, NewActivity};
