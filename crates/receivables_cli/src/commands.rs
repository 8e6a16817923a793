//! Command handlers.
//!
//! Every command maps to exactly one handler; each handler builds the
//! services it needs over the shared connection and renders plain text.

use crate::cli::{
    Command, ContactArgs, CustomerCommand, TitleAddArgs, TitleCommand, TitleEditArgs,
};
use crate::error::CliError;
use chrono::NaiveDate;
use log::info;
use receivables_core::report::status::{days_until_due, title_status};
use receivables_core::{
    CustomerInput, CustomerService, Dashboard, DashboardOptions, ReceivableTitle, ReportService,
    SqliteCustomerRepository, SqliteTitleRepository, TitleChanges, TitleDraft, TitleService,
    TitleStatus,
};
use rusqlite::Connection;
use std::fs::File;
use std::io::Write;

/// Per-invocation settings shared by all handlers.
#[derive(Debug, Clone, Copy)]
pub struct Context {
    pub today: NaiveDate,
    pub dashboard: DashboardOptions,
}

pub fn execute<W: Write>(
    conn: &Connection,
    command: Command,
    ctx: &Context,
    out: &mut W,
) -> Result<(), CliError> {
    info!(
        "event=cli_command module=cli status=start command={} today={}",
        command_name(&command),
        ctx.today
    );
    match command {
        Command::Customer(command) => customer(conn, command, ctx, out),
        Command::Title(command) => title(conn, command, ctx, out),
        Command::Dashboard => dashboard(conn, ctx, out),
        Command::Export { output } => export(conn, output.as_deref(), ctx, out),
    }
}

fn command_name(command: &Command) -> &'static str {
    match command {
        Command::Customer(CustomerCommand::Add(_)) => "customer_add",
        Command::Customer(CustomerCommand::List { .. }) => "customer_list",
        Command::Customer(CustomerCommand::Show { .. }) => "customer_show",
        Command::Customer(CustomerCommand::Edit { .. }) => "customer_edit",
        Command::Customer(CustomerCommand::Delete { .. }) => "customer_delete",
        Command::Title(TitleCommand::Add(_)) => "title_add",
        Command::Title(TitleCommand::List { .. }) => "title_list",
        Command::Title(TitleCommand::Show { .. }) => "title_show",
        Command::Title(TitleCommand::Edit { .. }) => "title_edit",
        Command::Title(TitleCommand::Pay { .. }) => "title_pay",
        Command::Title(TitleCommand::Delete { .. }) => "title_delete",
        Command::Dashboard => "dashboard",
        Command::Export { .. } => "export",
    }
}

fn report_service(
    conn: &Connection,
) -> Result<ReportService<SqliteCustomerRepository<'_>, SqliteTitleRepository<'_>>, CliError> {
    Ok(ReportService::new(
        SqliteCustomerRepository::try_new(conn)?,
        SqliteTitleRepository::try_new(conn)?,
    ))
}

fn customer<W: Write>(
    conn: &Connection,
    command: CustomerCommand,
    ctx: &Context,
    out: &mut W,
) -> Result<(), CliError> {
    let service = CustomerService::new(SqliteCustomerRepository::try_new(conn)?);
    match command {
        CustomerCommand::Add(args) => {
            let mut input = CustomerInput::named(args.name);
            apply_contact(&mut input, args.contact);
            let customer = service.register_customer(input)?;
            writeln!(out, "created customer {}", customer.id)?;
        }
        CustomerCommand::List { search } => {
            let rows = service.list_customers(search.as_deref())?;
            if rows.is_empty() {
                writeln!(out, "no customers")?;
            }
            for row in rows {
                writeln!(
                    out,
                    "{}  {:>3} title(s)  {}",
                    row.customer.id, row.title_count, row.customer.name
                )?;
            }
        }
        CustomerCommand::Show { id } => {
            let customer = service.get_customer(id)?;
            let balance = report_service(conn)?.customer_balance(id, ctx.today)?;
            writeln!(out, "id:         {}", customer.id)?;
            writeln!(out, "name:       {}", customer.name)?;
            let optional = [
                ("document", &customer.contact.document),
                ("phone", &customer.contact.phone),
                ("email", &customer.contact.email),
                ("address", &customer.contact.address),
                ("notes", &customer.notes),
            ];
            for (label, value) in optional {
                if let Some(value) = value {
                    writeln!(out, "{:<11} {value}", format!("{label}:"))?;
                }
            }
            writeln!(out, "receivable: {}", balance.receivable)?;
            writeln!(out, "received:   {}", balance.received)?;
            writeln!(
                out,
                "overdue:    {} title(s) {}",
                balance.breakdown.overdue.count, balance.breakdown.overdue.amount
            )?;
        }
        CustomerCommand::Edit { id, fields } => {
            let mut input = CustomerInput::from_customer(&service.get_customer(id)?);
            if let Some(name) = fields.name {
                input.name = name;
            }
            apply_contact(&mut input, fields.contact);
            let customer = service.update_customer(id, input)?;
            writeln!(out, "updated customer {}", customer.id)?;
        }
        CustomerCommand::Delete { id } => {
            service.delete_customer(id)?;
            writeln!(out, "deleted customer {id}")?;
        }
    }
    Ok(())
}

fn apply_contact(input: &mut CustomerInput, args: ContactArgs) {
    if let Some(document) = args.document {
        input.contact.document = Some(document);
    }
    if let Some(phone) = args.phone {
        input.contact.phone = Some(phone);
    }
    if let Some(email) = args.email {
        input.contact.email = Some(email);
    }
    if let Some(address) = args.address {
        input.contact.address = Some(address);
    }
    if let Some(notes) = args.notes {
        input.notes = Some(notes);
    }
}

fn title<W: Write>(
    conn: &Connection,
    command: TitleCommand,
    ctx: &Context,
    out: &mut W,
) -> Result<(), CliError> {
    let service = TitleService::new(SqliteTitleRepository::try_new(conn)?);
    match command {
        TitleCommand::Add(args) => match args.installments {
            None => {
                let title = service.register_title(draft_from_args(args, ctx.today))?;
                writeln!(out, "created title {}", title.id)?;
            }
            Some(count) => {
                let titles =
                    service.register_installments(draft_from_args(args, ctx.today), count)?;
                writeln!(out, "created {} title(s)", titles.len())?;
                for title in titles {
                    writeln!(
                        out,
                        "  {}  {}  {:>12}",
                        title.id,
                        title.due_date,
                        title.amount.to_string()
                    )?;
                }
            }
        },
        TitleCommand::List { customer } => {
            let rows = service.list_titles(customer)?;
            if rows.is_empty() {
                writeln!(out, "no titles")?;
            }
            for row in rows {
                writeln!(
                    out,
                    "{}  {}  {:<7}  {:>12}  {}",
                    row.title.id,
                    row.title.due_date,
                    title_status(&row.title, ctx.today).as_str(),
                    row.title.amount.to_string(),
                    row.customer_name
                )?;
            }
        }
        TitleCommand::Show { id } => {
            let title = service.get_title(id)?;
            write_title(out, &title, ctx.today)?;
        }
        TitleCommand::Edit { id, fields } => {
            let changes = apply_title_edit(&service.get_title(id)?, fields);
            let title = service.update_title(id, changes)?;
            writeln!(out, "updated title {}", title.id)?;
        }
        TitleCommand::Pay { id, date } => {
            let title = service.mark_paid(id, date, ctx.today)?;
            let paid_on = title.paid_date.unwrap_or(ctx.today);
            writeln!(out, "paid title {} on {paid_on}", title.id)?;
        }
        TitleCommand::Delete { id } => {
            service.delete_title(id)?;
            writeln!(out, "deleted title {id}")?;
        }
    }
    Ok(())
}

fn draft_from_args(args: TitleAddArgs, today: NaiveDate) -> TitleDraft {
    TitleDraft {
        customer_id: args.customer,
        description: args.description,
        amount: args.amount,
        issue_date: args.issue.unwrap_or(today),
        due_date: args.due,
        notes: args.notes,
    }
}

fn apply_title_edit(existing: &ReceivableTitle, fields: TitleEditArgs) -> TitleChanges {
    let mut changes = TitleChanges::from_title(existing);
    if let Some(amount) = fields.amount {
        changes.amount = amount;
    }
    if let Some(issue) = fields.issue {
        changes.issue_date = issue;
    }
    if let Some(due) = fields.due {
        changes.due_date = due;
    }
    if let Some(description) = fields.description {
        changes.description = description;
    }
    if let Some(notes) = fields.notes {
        changes.notes = Some(notes);
    }
    changes
}

fn write_title<W: Write>(
    out: &mut W,
    title: &ReceivableTitle,
    today: NaiveDate,
) -> std::io::Result<()> {
    writeln!(out, "id:          {}", title.id)?;
    writeln!(out, "customer:    {}", title.customer_id)?;
    if !title.description.is_empty() {
        writeln!(out, "description: {}", title.description)?;
    }
    writeln!(out, "amount:      {}", title.amount)?;
    writeln!(out, "issued:      {}", title.issue_date)?;
    writeln!(out, "due:         {}", title.due_date)?;
    writeln!(out, "status:      {}", title_status(title, today))?;
    match (title.paid_date, days_until_due(title, today)) {
        (Some(paid_on), _) => writeln!(out, "paid on:     {paid_on}")?,
        (None, Some(days)) if days < 0 => writeln!(out, "late by:     {} day(s)", -days)?,
        (None, Some(days)) => writeln!(out, "due in:      {days} day(s)")?,
        (None, None) => {}
    }
    if let Some(notes) = &title.notes {
        writeln!(out, "notes:       {notes}")?;
    }
    Ok(())
}

fn dashboard<W: Write>(conn: &Connection, ctx: &Context, out: &mut W) -> Result<(), CliError> {
    let dashboard = report_service(conn)?.dashboard(ctx.today, &ctx.dashboard)?;
    write_dashboard(out, &dashboard, ctx.dashboard.upcoming_window_days)?;
    Ok(())
}

fn write_dashboard<W: Write>(
    out: &mut W,
    dashboard: &Dashboard,
    window_days: u32,
) -> std::io::Result<()> {
    writeln!(out, "as of {}", dashboard.today)?;
    writeln!(out, "customers: {}", dashboard.customer_count)?;
    for status in [TitleStatus::Pending, TitleStatus::Overdue, TitleStatus::Paid] {
        let totals = dashboard.breakdown.bucket(status);
        writeln!(
            out,
            "{:<8} {:>4} title(s) {:>14}",
            format!("{}:", status.as_str()),
            totals.count,
            totals.amount.to_string()
        )?;
    }
    writeln!(out, "total receivable: {}", dashboard.total_receivable)?;
    writeln!(out, "received this month: {}", dashboard.received_this_month)?;
    writeln!(out, "due in the next {window_days} day(s):")?;
    if dashboard.upcoming.is_empty() {
        writeln!(out, "  nothing")?;
    }
    for item in &dashboard.upcoming {
        writeln!(
            out,
            "  {}  in {} day(s)  {:>12}  {}",
            item.due_date,
            item.days_until_due,
            item.amount.to_string(),
            item.customer_name
        )?;
    }
    writeln!(out, "recently created:")?;
    if dashboard.recent.is_empty() {
        writeln!(out, "  nothing")?;
    }
    for item in &dashboard.recent {
        writeln!(
            out,
            "  {}  {:<7}  {:>12}  {}",
            item.due_date,
            item.status.as_str(),
            item.amount.to_string(),
            item.customer_name
        )?;
    }
    Ok(())
}

fn export<W: Write>(
    conn: &Connection,
    output: Option<&std::path::Path>,
    ctx: &Context,
    out: &mut W,
) -> Result<(), CliError> {
    let reports = report_service(conn)?;
    match output {
        Some(path) => {
            let written = reports.export_csv(File::create(path)?, ctx.today)?;
            writeln!(out, "exported {written} title(s) to {}", path.display())?;
        }
        None => {
            reports.export_csv(&mut *out, ctx.today)?;
        }
    }
    Ok(())
}
