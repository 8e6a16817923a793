//! Customer use-case service.
//!
//! # Invariants
//! - Edits use full replacement semantics: absent optional fields are cleared.
//! - Deletion is refused while the customer owns titles.

use crate::model::customer::{non_blank, ContactInfo, Customer, CustomerId};
use crate::repo::customer_repo::{CustomerListQuery, CustomerRepository, CustomerSummary};
use crate::repo::EntityRef;
use crate::service::{error_code, ServiceError, ServiceResult};
use log::{info, warn};

/// Registration/edit form for a customer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CustomerInput {
    pub name: String,
    pub contact: ContactInfo,
    pub notes: Option<String>,
}

impl CustomerInput {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Copies the editable fields of an existing record.
    pub fn from_customer(customer: &Customer) -> Self {
        Self {
            name: customer.name.clone(),
            contact: customer.contact.clone(),
            notes: customer.notes.clone(),
        }
    }

    fn into_customer(self, id: Option<CustomerId>) -> Customer {
        let mut customer = match id {
            Some(id) => Customer::with_id(id, self.name, self.contact),
            None => Customer::new(self.name, self.contact),
        };
        customer.notes = non_blank(self.notes);
        customer
    }
}

/// Customer service facade over repository implementations.
pub struct CustomerService<R: CustomerRepository> {
    repo: R,
}

impl<R: CustomerRepository> CustomerService<R> {
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    /// Registers a customer and returns the stored record.
    pub fn register_customer(&self, input: CustomerInput) -> ServiceResult<Customer> {
        let customer = input.into_customer(None);
        let id = self.repo.create_customer(&customer).inspect_err(|err| {
            warn!(
                "event=customer_create module=service status=error error_code={}",
                error_code(err)
            );
        })?;
        info!("event=customer_create module=service status=ok customer_id={id}");
        self.read_back(id, "created customer not found in read-back")
    }

    pub fn get_customer(&self, id: CustomerId) -> ServiceResult<Customer> {
        self.repo
            .get_customer(id)?
            .ok_or(ServiceError::NotFound(EntityRef::Customer(id)))
    }

    /// Lists customers by name, optionally narrowed by a search term.
    pub fn list_customers(&self, search: Option<&str>) -> ServiceResult<Vec<CustomerSummary>> {
        let query = CustomerListQuery {
            search: search.map(str::to_string),
        };
        Ok(self.repo.list_customers(&query)?)
    }

    /// Replaces the editable fields of an existing customer.
    pub fn update_customer(
        &self,
        id: CustomerId,
        input: CustomerInput,
    ) -> ServiceResult<Customer> {
        let customer = input.into_customer(Some(id));
        self.repo.update_customer(&customer).inspect_err(|err| {
            warn!(
                "event=customer_update module=service status=error customer_id={id} error_code={}",
                error_code(err)
            );
        })?;
        info!("event=customer_update module=service status=ok customer_id={id}");
        self.read_back(id, "updated customer not found in read-back")
    }

    pub fn delete_customer(&self, id: CustomerId) -> ServiceResult<()> {
        self.repo.delete_customer(id).inspect_err(|err| {
            warn!(
                "event=customer_delete module=service status=error customer_id={id} error_code={}",
                error_code(err)
            );
        })?;
        info!("event=customer_delete module=service status=ok customer_id={id}");
        Ok(())
    }

    fn read_back(&self, id: CustomerId, details: &'static str) -> ServiceResult<Customer> {
        self.repo
            .get_customer(id)?
            .ok_or(ServiceError::InconsistentState(details))
    }
}
