//! Core domain logic for accounts receivable.
//! Customers, receivable titles, derived payment status and reporting.

pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod report;
pub mod repo;
pub mod service;

pub use config::{AppConfig, ConfigError};
pub use db::{open_db, open_db_in_memory, DbError};
pub use logging::{default_log_level, init_logging, logging_status};
pub use model::amount::{Amount, ParseAmountError};
pub use model::customer::{ContactInfo, Customer, CustomerId, CustomerValidationError};
pub use model::title::{ReceivableTitle, TitleId, TitleValidationError};
pub use model::ValidationError;
pub use report::status::{derive_status, TitleStatus};
pub use report::summary::{
    CustomerBalance, Dashboard, DashboardOptions, RecentTitle, StatusBreakdown,
};
pub use repo::customer_repo::{CustomerRepository, CustomerSummary, SqliteCustomerRepository};
pub use repo::title_repo::{SqliteTitleRepository, TitleRepository, TitleWithCustomer};
pub use repo::{ConflictError, EntityRef, RepoError, RepoResult};
pub use service::customer_service::{CustomerInput, CustomerService};
pub use service::report_service::ReportService;
pub use service::title_service::{TitleChanges, TitleDraft, TitleService};
pub use service::{ErrorKind, ServiceError, ServiceResult};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::core_version;

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
