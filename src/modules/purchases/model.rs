pub use supernova_models::purchases::{
    CreatePurchaseDto, CurrencyTotal, PaginatedPurchasesResponse, Purchase, PurchaseFilterParams,
    PurchaseSummary, UpdatePurchaseDto,
};
