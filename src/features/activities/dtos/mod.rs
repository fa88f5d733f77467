mod activity_dto;

pub use activity_dto::{ActivityListQuery, ActivityResponseDto};
