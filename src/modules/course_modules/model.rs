pub use supernova_models::content::{
    CourseModule, CreateModuleDto, ModuleFilterParams, PaginatedModulesResponse,
    ReorderModulesDto, UpdateModuleDto,
};
