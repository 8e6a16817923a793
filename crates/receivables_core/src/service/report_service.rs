//! Dashboard, balance and export use-cases.
//!
//! Reads the full title set on every call and hands it to `report`; no
//! aggregate is stored.

use crate::model::customer::CustomerId;
use crate::repo::customer_repo::CustomerRepository;
use crate::repo::title_repo::{TitleListQuery, TitleRepository};
use crate::repo::EntityRef;
use crate::report::export::{build_export_rows, write_csv, ExportRow};
use crate::report::summary::{build_dashboard, CustomerBalance, Dashboard, DashboardOptions};
use crate::service::{ServiceError, ServiceResult};
use chrono::NaiveDate;
use log::info;
use std::io::Write;

pub struct ReportService<C: CustomerRepository, T: TitleRepository> {
    customers: C,
    titles: T,
}

impl<C: CustomerRepository, T: TitleRepository> ReportService<C, T> {
    pub fn new(customers: C, titles: T) -> Self {
        Self { customers, titles }
    }

    pub fn dashboard(
        &self,
        today: NaiveDate,
        options: &DashboardOptions,
    ) -> ServiceResult<Dashboard> {
        let titles = self.titles.list_titles(&TitleListQuery::default())?;
        let customer_count = self.customers.count_customers()?;
        Ok(build_dashboard(&titles, customer_count, today, options))
    }

    /// Receivable and received totals for one customer.
    pub fn customer_balance(
        &self,
        customer_id: CustomerId,
        today: NaiveDate,
    ) -> ServiceResult<CustomerBalance> {
        if self.customers.get_customer(customer_id)?.is_none() {
            return Err(ServiceError::NotFound(EntityRef::Customer(customer_id)));
        }
        let rows = self.titles.list_titles(&TitleListQuery {
            customer_id: Some(customer_id),
        })?;
        Ok(CustomerBalance::from_titles(
            customer_id,
            rows.iter().map(|row| &row.title),
            today,
        ))
    }

    pub fn export_rows(&self, today: NaiveDate) -> ServiceResult<Vec<ExportRow>> {
        let titles = self.titles.list_titles(&TitleListQuery::default())?;
        Ok(build_export_rows(&titles, today))
    }

    /// Writes the CSV export to `writer` and returns the number of data rows.
    pub fn export_csv<W: Write>(&self, writer: W, today: NaiveDate) -> ServiceResult<usize> {
        let rows = self.export_rows(today)?;
        let written = write_csv(writer, &rows)?;
        info!("event=export_csv module=service status=ok rows={written} today={today}");
        Ok(written)
    }
}
