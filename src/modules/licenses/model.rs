pub use supernova_models::purchases::{
    CreateLicenseDto, License, LicenseCheckResponse, LicenseFilterParams,
    PaginatedLicensesResponse, UpdateLicenseDto,
};
