use chrono::NaiveDate;
use receivables_core::db::open_db_in_memory;
use receivables_core::repo::title_repo::TitleListQuery;
use receivables_core::{
    derive_status, Amount, ConflictError, ContactInfo, Customer, CustomerRepository, EntityRef,
    ErrorKind, ReceivableTitle, RepoError, ServiceError, SqliteCustomerRepository,
    SqliteTitleRepository, TitleChanges, TitleDraft, TitleRepository, TitleService, TitleStatus,
    TitleValidationError, ValidationError,
};
use rusqlite::Connection;
use uuid::Uuid;

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn seed_customer(conn: &Connection, name: &str) -> Customer {
    let repo = SqliteCustomerRepository::try_new(conn).unwrap();
    let customer = Customer::new(name, ContactInfo::default());
    repo.create_customer(&customer).unwrap();
    customer
}

fn draft(customer: &Customer, cents: i64, issue: NaiveDate, due: NaiveDate) -> TitleDraft {
    TitleDraft {
        customer_id: customer.id,
        description: "services".to_string(),
        amount: Amount::from_cents(cents),
        issue_date: issue,
        due_date: due,
        notes: None,
    }
}

#[test]
fn create_and_get_roundtrip() {
    let conn = open_db_in_memory().unwrap();
    let customer = seed_customer(&conn, "Acme");
    let repo = SqliteTitleRepository::try_new(&conn).unwrap();

    let title = ReceivableTitle::new(
        customer.id,
        "  January retainer ",
        Amount::from_cents(123_456),
        date(2024, 1, 1),
        date(2024, 1, 31),
    )
    .with_notes(Some("net 30".to_string()));
    let id = repo.create_title(&title).unwrap();

    let loaded = repo.get_title(id).unwrap().unwrap();
    assert_eq!(loaded.customer_id, customer.id);
    assert_eq!(loaded.description, "January retainer");
    assert_eq!(loaded.amount, Amount::from_cents(123_456));
    assert_eq!(loaded.issue_date, date(2024, 1, 1));
    assert_eq!(loaded.due_date, date(2024, 1, 31));
    assert!(!loaded.paid);
    assert_eq!(loaded.paid_date, None);
    assert_eq!(loaded.notes.as_deref(), Some("net 30"));
}

#[test]
fn due_date_equal_to_issue_date_is_accepted() {
    let conn = open_db_in_memory().unwrap();
    let customer = seed_customer(&conn, "Acme");
    let service = TitleService::new(SqliteTitleRepository::try_new(&conn).unwrap());

    let title = service
        .register_title(draft(&customer, 100, date(2024, 3, 1), date(2024, 3, 1)))
        .unwrap();
    assert_eq!(title.due_date, title.issue_date);
}

#[test]
fn reversed_dates_are_rejected_and_nothing_is_stored() {
    let conn = open_db_in_memory().unwrap();
    let customer = seed_customer(&conn, "Acme");
    let service = TitleService::new(SqliteTitleRepository::try_new(&conn).unwrap());

    let err = service
        .register_title(draft(&customer, 100, date(2024, 2, 1), date(2024, 1, 31)))
        .unwrap_err();
    match err {
        ServiceError::Validation(ValidationError::Title(TitleValidationError::DueBeforeIssue {
            issue_date,
            due_date,
        })) => {
            assert_eq!(issue_date, date(2024, 2, 1));
            assert_eq!(due_date, date(2024, 1, 31));
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(service.list_titles(None).unwrap().is_empty());
}

#[test]
fn non_positive_amount_is_rejected() {
    let conn = open_db_in_memory().unwrap();
    let customer = seed_customer(&conn, "Acme");
    let service = TitleService::new(SqliteTitleRepository::try_new(&conn).unwrap());

    for cents in [0, -500] {
        let err = service
            .register_title(draft(&customer, cents, date(2024, 1, 1), date(2024, 1, 31)))
            .unwrap_err();
        match err {
            ServiceError::Validation(validation) => assert_eq!(validation.field(), "amount"),
            other => panic!("unexpected error: {other}"),
        }
    }
}

#[test]
fn unknown_customer_is_a_validation_error() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteTitleRepository::try_new(&conn).unwrap();

    let ghost = Uuid::new_v4();
    let title = ReceivableTitle::new(
        ghost,
        "",
        Amount::from_cents(100),
        date(2024, 1, 1),
        date(2024, 1, 31),
    );
    let err = repo.create_title(&title).unwrap_err();
    assert!(matches!(
        err,
        RepoError::Validation(ValidationError::Title(TitleValidationError::UnknownCustomer(id)))
            if id == ghost
    ));
}

#[test]
fn mark_paid_sets_flag_and_date_and_freezes_status() {
    let conn = open_db_in_memory().unwrap();
    let customer = seed_customer(&conn, "Acme");
    let service = TitleService::new(SqliteTitleRepository::try_new(&conn).unwrap());

    let title = service
        .register_title(draft(&customer, 10_000, date(2024, 1, 1), date(2024, 1, 31)))
        .unwrap();
    let paid = service
        .mark_paid(title.id, Some(date(2024, 2, 10)), date(2024, 2, 15))
        .unwrap();

    assert!(paid.paid);
    assert_eq!(paid.paid_date, Some(date(2024, 2, 10)));
    assert!(paid.paid_date.unwrap() >= paid.issue_date);
    for today in [date(2023, 12, 1), date(2024, 1, 15), date(2030, 1, 1)] {
        assert_eq!(
            derive_status(paid.paid, paid.due_date, today),
            TitleStatus::Paid
        );
    }
}

#[test]
fn mark_paid_defaults_to_evaluation_date() {
    let conn = open_db_in_memory().unwrap();
    let customer = seed_customer(&conn, "Acme");
    let service = TitleService::new(SqliteTitleRepository::try_new(&conn).unwrap());

    let title = service
        .register_title(draft(&customer, 10_000, date(2024, 1, 1), date(2024, 1, 31)))
        .unwrap();
    let paid = service.mark_paid(title.id, None, date(2024, 1, 20)).unwrap();
    assert_eq!(paid.paid_date, Some(date(2024, 1, 20)));
}

#[test]
fn second_payment_is_a_conflict_and_keeps_first_date() {
    let conn = open_db_in_memory().unwrap();
    let customer = seed_customer(&conn, "Acme");
    let service = TitleService::new(SqliteTitleRepository::try_new(&conn).unwrap());

    let title = service
        .register_title(draft(&customer, 10_000, date(2024, 1, 1), date(2024, 1, 31)))
        .unwrap();
    service
        .mark_paid(title.id, Some(date(2024, 1, 10)), date(2024, 1, 10))
        .unwrap();

    let err = service
        .mark_paid(title.id, Some(date(2024, 1, 20)), date(2024, 1, 20))
        .unwrap_err();
    assert!(matches!(
        err,
        ServiceError::Conflict(ConflictError::TitleAlreadyPaid(id)) if id == title.id
    ));
    assert_eq!(err.kind(), ErrorKind::Conflict);
    assert_eq!(
        service.get_title(title.id).unwrap().paid_date,
        Some(date(2024, 1, 10))
    );
}

#[test]
fn payment_before_issue_is_rejected() {
    let conn = open_db_in_memory().unwrap();
    let customer = seed_customer(&conn, "Acme");
    let service = TitleService::new(SqliteTitleRepository::try_new(&conn).unwrap());

    let title = service
        .register_title(draft(&customer, 10_000, date(2024, 1, 10), date(2024, 1, 31)))
        .unwrap();
    let err = service
        .mark_paid(title.id, Some(date(2024, 1, 9)), date(2024, 1, 15))
        .unwrap_err();
    match err {
        ServiceError::Validation(validation) => assert_eq!(validation.field(), "paid_date"),
        other => panic!("unexpected error: {other}"),
    }
    assert!(!service.get_title(title.id).unwrap().paid);
}

#[test]
fn mark_paid_on_missing_title_is_not_found() {
    let conn = open_db_in_memory().unwrap();
    let service = TitleService::new(SqliteTitleRepository::try_new(&conn).unwrap());

    let missing = Uuid::new_v4();
    let err = service
        .mark_paid(missing, None, date(2024, 1, 1))
        .unwrap_err();
    assert!(matches!(err, ServiceError::NotFound(EntityRef::Title(id)) if id == missing));
}

#[test]
fn update_changes_unpaid_title() {
    let conn = open_db_in_memory().unwrap();
    let customer = seed_customer(&conn, "Acme");
    let service = TitleService::new(SqliteTitleRepository::try_new(&conn).unwrap());

    let title = service
        .register_title(draft(&customer, 10_000, date(2024, 1, 1), date(2024, 1, 31)))
        .unwrap();
    let mut changes = TitleChanges::from_title(&title);
    changes.amount = Amount::from_cents(12_500);
    changes.due_date = date(2024, 2, 29);
    changes.description = "revised".to_string();
    changes.notes = Some("  ".to_string());

    let updated = service.update_title(title.id, changes).unwrap();
    assert_eq!(updated.amount, Amount::from_cents(12_500));
    assert_eq!(updated.due_date, date(2024, 2, 29));
    assert_eq!(updated.description, "revised");
    assert_eq!(updated.notes, None);
    assert!(!updated.paid);
}

#[test]
fn update_with_reversed_dates_is_rejected() {
    let conn = open_db_in_memory().unwrap();
    let customer = seed_customer(&conn, "Acme");
    let service = TitleService::new(SqliteTitleRepository::try_new(&conn).unwrap());

    let title = service
        .register_title(draft(&customer, 10_000, date(2024, 1, 1), date(2024, 1, 31)))
        .unwrap();
    let mut changes = TitleChanges::from_title(&title);
    changes.issue_date = date(2024, 2, 1);

    let err = service.update_title(title.id, changes).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
    assert_eq!(service.get_title(title.id).unwrap().issue_date, date(2024, 1, 1));
}

#[test]
fn paid_titles_cannot_be_edited() {
    let conn = open_db_in_memory().unwrap();
    let customer = seed_customer(&conn, "Acme");
    let service = TitleService::new(SqliteTitleRepository::try_new(&conn).unwrap());

    let title = service
        .register_title(draft(&customer, 10_000, date(2024, 1, 1), date(2024, 1, 31)))
        .unwrap();
    let paid = service
        .mark_paid(title.id, Some(date(2024, 1, 15)), date(2024, 1, 15))
        .unwrap();

    let mut changes = TitleChanges::from_title(&paid);
    changes.amount = Amount::from_cents(1);
    let err = service.update_title(paid.id, changes).unwrap_err();
    assert!(matches!(
        err,
        ServiceError::Conflict(ConflictError::TitleAlreadyPaid(_))
    ));

    let repo = SqliteTitleRepository::try_new(&conn).unwrap();
    let err = repo.update_title(&paid).unwrap_err();
    assert!(matches!(
        err,
        RepoError::Conflict(ConflictError::TitleAlreadyPaid(_))
    ));
    assert_eq!(
        service.get_title(paid.id).unwrap().amount,
        Amount::from_cents(10_000)
    );
}

#[test]
fn acme_title_is_overdue_then_paid() {
    let conn = open_db_in_memory().unwrap();
    let customer = seed_customer(&conn, "Acme");
    let service = TitleService::new(SqliteTitleRepository::try_new(&conn).unwrap());
    let today = date(2024, 2, 15);

    let title = service
        .register_title(draft(&customer, 10_000, date(2024, 1, 1), date(2024, 1, 31)))
        .unwrap();
    assert_eq!(
        derive_status(title.paid, title.due_date, today),
        TitleStatus::Overdue
    );

    let paid = service
        .mark_paid(title.id, Some(date(2024, 2, 10)), today)
        .unwrap();
    assert_eq!(
        derive_status(paid.paid, paid.due_date, today),
        TitleStatus::Paid
    );
}

#[test]
fn list_orders_by_due_date_and_filters_by_customer() {
    let conn = open_db_in_memory().unwrap();
    let acme = seed_customer(&conn, "Acme");
    let globex = seed_customer(&conn, "Globex");
    let service = TitleService::new(SqliteTitleRepository::try_new(&conn).unwrap());

    let late = service
        .register_title(draft(&acme, 100, date(2024, 1, 1), date(2024, 3, 1)))
        .unwrap();
    let early = service
        .register_title(draft(&globex, 200, date(2024, 1, 1), date(2024, 1, 15)))
        .unwrap();
    let middle = service
        .register_title(draft(&acme, 300, date(2024, 1, 1), date(2024, 2, 1)))
        .unwrap();

    let all = service.list_titles(None).unwrap();
    let ids: Vec<_> = all.iter().map(|row| row.title.id).collect();
    assert_eq!(ids, [early.id, middle.id, late.id]);
    assert_eq!(all[0].customer_name, "Globex");

    let acme_only = service.list_titles(Some(acme.id)).unwrap();
    let ids: Vec<_> = acme_only.iter().map(|row| row.title.id).collect();
    assert_eq!(ids, [middle.id, late.id]);

    let repo = SqliteTitleRepository::try_new(&conn).unwrap();
    let filtered = repo
        .list_titles(&TitleListQuery {
            customer_id: Some(globex.id),
        })
        .unwrap();
    assert_eq!(filtered.len(), 1);
}

#[test]
fn delete_removes_title_and_unblocks_customer_deletion() {
    let conn = open_db_in_memory().unwrap();
    let customer = seed_customer(&conn, "Acme");
    let service = TitleService::new(SqliteTitleRepository::try_new(&conn).unwrap());
    let customers = SqliteCustomerRepository::try_new(&conn).unwrap();

    let title = service
        .register_title(draft(&customer, 100, date(2024, 1, 1), date(2024, 1, 31)))
        .unwrap();
    assert!(customers.delete_customer(customer.id).is_err());

    service.delete_title(title.id).unwrap();
    let err = service.get_title(title.id).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
    let err = service.delete_title(title.id).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);

    customers.delete_customer(customer.id).unwrap();
}

#[test]
fn try_new_rejects_missing_column() {
    let conn = open_db_in_memory().unwrap();
    conn.execute_batch("ALTER TABLE titles DROP COLUMN notes;")
        .unwrap();

    let result = SqliteTitleRepository::try_new(&conn);
    assert!(matches!(
        result,
        Err(RepoError::MissingRequiredColumn {
            table: "titles",
            column: "notes",
        })
    ));
}

#[test]
fn installments_split_cents_and_step_monthly_with_month_end_clamp() {
    let conn = open_db_in_memory().unwrap();
    let customer = seed_customer(&conn, "Acme");
    let service = TitleService::new(SqliteTitleRepository::try_new(&conn).unwrap());

    let titles = service
        .register_installments(
            draft(&customer, 10_000, date(2024, 1, 1), date(2024, 1, 31)),
            3,
        )
        .unwrap();

    let amounts: Vec<_> = titles.iter().map(|title| title.amount.cents()).collect();
    assert_eq!(amounts, [3_333, 3_333, 3_334]);
    let due_dates: Vec<_> = titles.iter().map(|title| title.due_date).collect();
    assert_eq!(
        due_dates,
        [date(2024, 1, 31), date(2024, 2, 29), date(2024, 3, 31)]
    );
    assert_eq!(titles[0].description, "services (1/3)");
    assert_eq!(titles[2].description, "services (3/3)");
    assert!(titles
        .iter()
        .all(|title| title.issue_date == date(2024, 1, 1) && !title.paid));
    assert_eq!(service.list_titles(Some(customer.id)).unwrap().len(), 3);
}

#[test]
fn single_installment_keeps_the_plain_description() {
    let conn = open_db_in_memory().unwrap();
    let customer = seed_customer(&conn, "Acme");
    let service = TitleService::new(SqliteTitleRepository::try_new(&conn).unwrap());

    let titles = service
        .register_installments(draft(&customer, 500, date(2024, 1, 1), date(2024, 1, 31)), 1)
        .unwrap();
    assert_eq!(titles.len(), 1);
    assert_eq!(titles[0].description, "services");
    assert_eq!(titles[0].amount, Amount::from_cents(500));
}

#[test]
fn zero_installments_is_rejected_and_nothing_is_stored() {
    let conn = open_db_in_memory().unwrap();
    let customer = seed_customer(&conn, "Acme");
    let service = TitleService::new(SqliteTitleRepository::try_new(&conn).unwrap());

    for count in [0, 361] {
        let err = service
            .register_installments(
                draft(&customer, 10_000, date(2024, 1, 1), date(2024, 1, 31)),
                count,
            )
            .unwrap_err();
        match err {
            ServiceError::Validation(validation) => assert_eq!(validation.field(), "installments"),
            other => panic!("unexpected error: {other}"),
        }
    }
    assert!(service.list_titles(None).unwrap().is_empty());
}

#[test]
fn failing_last_installment_rolls_back_the_whole_plan() {
    let conn = open_db_in_memory().unwrap();
    let customer = seed_customer(&conn, "Acme");
    let service = TitleService::new(SqliteTitleRepository::try_new(&conn).unwrap());

    // 0.02 over three shares is 0.01 + 0.01 + 0.00; the zero share fails.
    let err = service
        .register_installments(draft(&customer, 2, date(2024, 1, 1), date(2024, 1, 31)), 3)
        .unwrap_err();
    match err {
        ServiceError::Validation(validation) => assert_eq!(validation.field(), "amount"),
        other => panic!("unexpected error: {other}"),
    }
    assert!(service.list_titles(None).unwrap().is_empty());
}

#[test]
fn batch_insert_with_unknown_customer_stores_nothing() {
    let conn = open_db_in_memory().unwrap();
    let customer = seed_customer(&conn, "Acme");
    let repo = SqliteTitleRepository::try_new(&conn).unwrap();

    let titles = [
        ReceivableTitle::new(
            customer.id,
            "first",
            Amount::from_cents(100),
            date(2024, 1, 1),
            date(2024, 1, 31),
        ),
        ReceivableTitle::new(
            Uuid::new_v4(),
            "second",
            Amount::from_cents(100),
            date(2024, 1, 1),
            date(2024, 2, 29),
        ),
    ];
    let err = repo.create_titles(&titles).unwrap_err();
    assert!(matches!(
        err,
        RepoError::Validation(ValidationError::Title(TitleValidationError::UnknownCustomer(_)))
    ));
    assert!(repo.get_title(titles[0].id).unwrap().is_none());
}

#[test]
fn five_digit_year_due_date_is_a_validation_error() {
    let conn = open_db_in_memory().unwrap();
    let customer = seed_customer(&conn, "Acme");
    let repo = SqliteTitleRepository::try_new(&conn).unwrap();

    let title = ReceivableTitle::new(
        customer.id,
        "",
        Amount::from_cents(100),
        date(2024, 1, 1),
        date(10_000, 1, 1),
    );
    assert_eq!(title.validate().unwrap_err().field(), "due_date");
    let err = repo.create_title(&title).unwrap_err();
    assert!(matches!(
        err,
        RepoError::Validation(ValidationError::Title(TitleValidationError::DateOutOfRange {
            field: "due_date",
            ..
        }))
    ));

    let service = TitleService::new(repo);
    let err = service
        .register_title(draft(&customer, 100, date(2024, 1, 1), date(10_000, 1, 1)))
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
    assert!(service.list_titles(None).unwrap().is_empty());
}

#[test]
fn payment_beyond_year_9999_is_rejected() {
    let conn = open_db_in_memory().unwrap();
    let customer = seed_customer(&conn, "Acme");
    let service = TitleService::new(SqliteTitleRepository::try_new(&conn).unwrap());

    let title = service
        .register_title(draft(&customer, 10_000, date(2024, 1, 1), date(2024, 1, 31)))
        .unwrap();
    let err = service
        .mark_paid(title.id, Some(date(10_000, 1, 1)), date(2024, 1, 15))
        .unwrap_err();
    match err {
        ServiceError::Validation(validation) => assert_eq!(validation.field(), "paid_date"),
        other => panic!("unexpected error: {other}"),
    }
    assert!(!service.get_title(title.id).unwrap().paid);
}
