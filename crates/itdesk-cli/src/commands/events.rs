use chrono::{Local, NaiveDate, Utc};
use clap::{Args, Subcommand};
use itdesk_core::calendar::grid::DAY_NAMES;
use itdesk_core::calendar::{short_title, CalendarEvent, MonthGrid};
use itdesk_core::error::SessionError;
use itdesk_core::{
    expand, ApiClient, CalendarView, Config, EventForm, EventType, Month, Notice, RecurrenceType,
    StoredEvent,
};
use tokio_util::sync::CancellationToken;

use super::{connect, Backend, CliResult};

#[derive(Subcommand)]
pub enum EventsAction {
    /// Show a month grid and its events
    List {
        /// Month to show, as YYYY-MM (default: current month)
        #[arg(long)]
        month: Option<String>,
        /// Print the loaded events as JSON
        #[arg(long)]
        json: bool,
    },
    /// Events starting in the next days
    Upcoming {
        /// Look-ahead in days (default: calendar.upcoming_days)
        #[arg(long)]
        days: Option<i64>,
        #[arg(long)]
        json: bool,
    },
    /// Create an event; recurring events are stored one instance at a time
    Create {
        #[command(flatten)]
        fields: EventFields,
    },
    /// Update one stored event
    Update {
        id: i64,
        #[command(flatten)]
        fields: EventFields,
    },
    /// Delete one stored event
    Delete {
        id: i64,
        /// Confirm the action with your password if the gate is closed
        #[arg(long)]
        password: Option<String>,
    },
    /// Show the instances a recurring event would create, without saving
    Expand {
        #[command(flatten)]
        fields: EventFields,
        #[arg(long)]
        json: bool,
    },
}

/// Event fields shared by create, update and expand.
#[derive(Args, Debug, Default)]
pub struct EventFields {
    #[arg(long)]
    pub title: Option<String>,
    /// YYYY-MM-DD or YYYY-MM-DDTHH:MM
    #[arg(long)]
    pub start: Option<String>,
    #[arg(long)]
    pub end: Option<String>,
    #[arg(long)]
    pub description: Option<String>,
    /// visit, maintenance, meeting or other
    #[arg(long = "type")]
    pub event_type: Option<EventType>,
    #[arg(long)]
    pub all_day: bool,
    #[arg(long)]
    pub location: Option<String>,
    /// none, daily, weekly, biweekly, monthly or custom_days
    #[arg(long)]
    pub repeat: Option<RecurrenceType>,
    #[arg(long)]
    pub interval: Option<u32>,
    /// Last day of the recurrence, YYYY-MM-DD
    #[arg(long)]
    pub until: Option<String>,
}

impl EventFields {
    fn apply_to(self, form: &mut EventForm) {
        if let Some(title) = self.title {
            form.title = title;
        }
        if let Some(start) = self.start {
            form.start = start;
        }
        if self.end.is_some() {
            form.end = self.end;
        }
        if let Some(description) = self.description {
            form.description = description;
        }
        if let Some(event_type) = self.event_type {
            form.event_type = event_type;
        }
        if self.all_day {
            form.all_day = true;
        }
        if self.location.is_some() {
            form.location = self.location;
        }
        if let Some(repeat) = self.repeat {
            form.is_recurring = repeat.repeats();
            form.recurrence_type = repeat;
        }
        if self.interval.is_some() {
            form.recurrence_interval = self.interval;
        }
        if self.until.is_some() {
            form.recurrence_end = self.until;
        }
    }

    fn into_form(self) -> EventForm {
        let mut form = EventForm::default();
        self.apply_to(&mut form);
        form
    }
}

pub async fn run(action: EventsAction) -> CliResult {
    match action {
        EventsAction::List { month, json } => {
            let month = month.as_deref().map(parse_month).transpose()?;
            list(month, json).await
        }
        EventsAction::Upcoming { days, json } => upcoming(days, json).await,
        EventsAction::Create { fields } => create(fields).await,
        EventsAction::Update { id, fields } => update(id, fields).await,
        EventsAction::Delete { id, password } => delete(id, password).await,
        EventsAction::Expand { fields, json } => preview(fields, json),
    }
}

/// Connect and load the event list.
async fn open_view() -> Result<(CalendarView<ApiClient>, Backend), Box<dyn std::error::Error>> {
    let backend = connect().await?;
    let api = backend.api.clone();
    let mut view = CalendarView::new(api, Local::now().date_naive())
        .with_defaults(backend.config.form_defaults()?)
        .with_upcoming_days(backend.config.calendar.upcoming_days);
    if let Some(notice) = view.reload().await {
        return Err(notice.message.into());
    }
    Ok((view, backend))
}

fn report(notice: Notice) -> CliResult {
    if notice.is_error() {
        return Err(notice.message.into());
    }
    println!("{notice}");
    Ok(())
}

async fn list(month: Option<Month>, json: bool) -> CliResult {
    let (mut view, _) = open_view().await?;
    if let Some(month) = month {
        view.go_to(month);
    }

    if json {
        println!("{}", serde_json::to_string_pretty(view.events())?);
        return Ok(());
    }
    let grid = view.grid(Local::now().date_naive());
    print!("{}", render_grid(&grid));
    for cell in grid.days.iter().filter(|c| !c.events.is_empty()) {
        println!();
        println!("{}", cell.date.format("%Y-%m-%d"));
        for event in &cell.events {
            println!(
                "  #{} {} {}",
                event.id,
                event.event.start.format("%H:%M"),
                short_title(&event.event.title)
            );
        }
        if cell.overflow > 0 {
            println!("  +{} más", cell.overflow);
        }
    }
    Ok(())
}

async fn upcoming(days: Option<i64>, json: bool) -> CliResult {
    let (view, _) = open_view().await?;
    let view = match days {
        Some(days) => view.with_upcoming_days(days),
        None => view,
    };
    let events = view.upcoming(Local::now().naive_local());
    if json {
        println!("{}", serde_json::to_string_pretty(&events)?);
    } else if events.is_empty() {
        println!("no upcoming events");
    } else {
        events.iter().for_each(|e| println!("{}", event_line(e)));
    }
    Ok(())
}

async fn create(fields: EventFields) -> CliResult {
    let (mut view, _) = open_view().await?;
    let cancel = CancellationToken::new();
    let watcher = tokio::spawn({
        let cancel = cancel.clone();
        async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                cancel.cancel();
            }
        }
    });
    let notice = view.save(fields.into_form(), None, &cancel).await;
    watcher.abort();
    report(notice)
}

async fn update(id: i64, fields: EventFields) -> CliResult {
    let (mut view, _) = open_view().await?;
    let existing = view
        .events()
        .iter()
        .find(|e| e.id == id)
        .ok_or_else(|| format!("no event with id {id}"))?;
    let mut form = EventForm::from_event(&existing.event);
    fields.apply_to(&mut form);
    let notice = view.save(form, Some(id), &CancellationToken::new()).await;
    report(notice)
}

async fn delete(id: i64, password: Option<String>) -> CliResult {
    let (mut view, backend) = open_view().await?;
    let mut session = backend.session;
    let now = Utc::now();
    match (session.authorize_action(now), password) {
        (Ok(()), _) => {}
        (Err(SessionError::ConfirmationRequired), Some(password)) => {
            session.confirm_action(&backend.api, &password, now).await?;
        }
        (Err(SessionError::ConfirmationRequired), None) => {
            return Err("password confirmation required, pass --password".into());
        }
        (Err(e), _) => return Err(e.into()),
    }

    report(view.delete(&session, id, now).await)?;
    if session.gate().should_warn(now) {
        eprintln!(
            "warning: password confirmation expires in {} minute(s)",
            session.gate().remaining_minutes(now)
        );
    }
    Ok(())
}

/// Expand locally and print the instances.
fn preview(fields: EventFields, json: bool) -> CliResult {
    let template = local_template(fields)?;
    let instances = if template.needs_expansion() {
        expand(&template)
    } else {
        vec![template]
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&instances)?);
    } else {
        instances.iter().for_each(|e| println!("{}", instance_line(e)));
        println!("{} instance(s)", instances.len());
    }
    Ok(())
}

/// Build a template with the configured form defaults, without a backend.
fn local_template(fields: EventFields) -> itdesk_core::Result<CalendarEvent> {
    let config = Config::load()?;
    Ok(fields.into_form().into_template(&config.form_defaults()?)?)
}

fn parse_month(raw: &str) -> Result<Month, String> {
    NaiveDate::parse_from_str(&format!("{raw}-01"), "%Y-%m-%d")
        .map(Month::containing)
        .map_err(|_| format!("invalid month '{raw}', expected YYYY-MM"))
}

fn instance_line(event: &CalendarEvent) -> String {
    let mut line = format!(
        "{} [{}] {}",
        event.start.format("%Y-%m-%d %H:%M"),
        event.event_type.label(),
        event.title
    );
    if let Some(end) = event.end {
        line.push_str(&format!(" (hasta {})", end.format("%Y-%m-%d %H:%M")));
    }
    line
}

fn event_line(stored: &StoredEvent) -> String {
    let mut line = format!("#{} {}", stored.id, instance_line(&stored.event));
    if let Some(location) = &stored.event.location {
        line.push_str(&format!(" @ {location}"));
    }
    line
}

/// Sunday-first text grid. Today is marked with `*`, days with events
/// with `•`.
fn render_grid(grid: &MonthGrid<'_>) -> String {
    let mut out = format!("{}\n", grid.month.label());
    out.push_str(
        &DAY_NAMES
            .iter()
            .map(|d| format!("{d:>4}"))
            .collect::<String>(),
    );
    out.push('\n');
    for week in grid.weeks() {
        for cell in week {
            match cell {
                Some(cell) => {
                    let marker = if cell.is_today {
                        '*'
                    } else if cell.events.is_empty() {
                        ' '
                    } else {
                        '•'
                    };
                    out.push_str(&format!("{:>3}{marker}", cell.date.format("%-d")));
                }
                None => out.push_str("    "),
            }
        }
        out.push('\n');
    }
    out
}
