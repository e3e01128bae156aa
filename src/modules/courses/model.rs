pub use supernova_models::content::{
    ContentTree, CourseContent, CourseVersion, CourseVersionDetail, CreateContentDto,
    CreateVersionDto, UpdateContentDto,
};
pub use supernova_models::courses::*;
