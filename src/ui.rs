use anyhow::Result;
use clinic_manager::{Appointment, Bill, ModelManager, Patient};
use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, Paragraph, Row, Table, TableState},
    Frame, Terminal,
};
use std::io;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Page {
    Patients,
    Appointments,
    Bills,
}

impl Page {
    pub fn next(&self) -> Self {
        match self {
            Page::Patients => Page::Appointments,
            Page::Appointments => Page::Bills,
            Page::Bills => Page::Patients,
        }
    }

    pub fn previous(&self) -> Self {
        match self {
            Page::Patients => Page::Bills,
            Page::Appointments => Page::Patients,
            Page::Bills => Page::Appointments,
        }
    }

    pub fn title(&self) -> &str {
        match self {
            Page::Patients => "Patients",
            Page::Appointments => "Appointments",
            Page::Bills => "Bills",
        }
    }
}

/// Terminal front-end over the model. Every undoable key commits history
/// right after the action, keeping the model's push discipline.
pub struct App {
    pub model: ModelManager,
    pub current_page: Page,
    pub patients_state: TableState,
    pub appointments_state: TableState,
    pub bills_state: TableState,
    pub ascending: bool,
    pub status: String,
}

impl App {
    pub fn new(model: ModelManager) -> Self {
        let mut app = Self {
            model,
            current_page: Page::Patients,
            patients_state: TableState::default(),
            appointments_state: TableState::default(),
            bills_state: TableState::default(),
            ascending: true,
            status: String::from("Ready"),
        };
        app.clamp_selections();
        app
    }

    fn page_len(&self, page: Page) -> usize {
        match page {
            Page::Patients => self.model.filtered_patient_list().len(),
            Page::Appointments => self.model.filtered_appointment_list().len(),
            Page::Bills => self.model.filtered_bill_list().len(),
        }
    }

    fn state_mut(&mut self, page: Page) -> &mut TableState {
        match page {
            Page::Patients => &mut self.patients_state,
            Page::Appointments => &mut self.appointments_state,
            Page::Bills => &mut self.bills_state,
        }
    }

    /// Keep every selection inside its (possibly shrunk) view
    fn clamp_selections(&mut self) {
        for page in [Page::Patients, Page::Appointments, Page::Bills] {
            let len = self.page_len(page);
            let state = self.state_mut(page);
            let selected = match (len, state.selected()) {
                (0, _) => None,
                (_, None) => Some(0),
                (len, Some(i)) => Some(i.min(len - 1)),
            };
            state.select(selected);
        }
    }

    pub fn selected_patient(&self) -> Option<Patient> {
        self.patients_state
            .selected()
            .and_then(|i| self.model.filtered_patient_list().get(i))
            .cloned()
    }

    pub fn selected_appointment(&self) -> Option<Appointment> {
        self.appointments_state
            .selected()
            .and_then(|i| self.model.filtered_appointment_list().get(i))
            .cloned()
    }

    pub fn selected_bill(&self) -> Option<Bill> {
        self.bills_state
            .selected()
            .and_then(|i| self.model.filtered_bill_list().get(i))
            .cloned()
    }

    pub fn next(&mut self) {
        let page = self.current_page;
        let len = self.page_len(page);
        if len == 0 {
            return;
        }
        let state = self.state_mut(page);
        let i = match state.selected() {
            Some(i) if i + 1 < len => i + 1,
            _ => 0,
        };
        state.select(Some(i));
    }

    pub fn previous(&mut self) {
        let page = self.current_page;
        let len = self.page_len(page);
        if len == 0 {
            return;
        }
        let state = self.state_mut(page);
        let i = match state.selected() {
            Some(0) | None => len - 1,
            Some(i) => i - 1,
        };
        state.select(Some(i));
    }

    /// Enter: narrow the dependent views to the selected row
    pub fn select(&mut self) {
        match self.current_page {
            Page::Patients => {
                if let Some(patient) = self.selected_patient() {
                    self.model.select_patient(&patient);
                    self.status = format!("Showing records of {}", patient.name);
                    self.commit();
                }
            }
            Page::Appointments => {
                if let Some(appointment) = self.selected_appointment() {
                    self.model.select_appointment(&appointment);
                    self.status = format!("Showing bills of {}", appointment);
                    self.commit();
                }
            }
            Page::Bills => {}
        }
    }

    pub fn delete_selected(&mut self) {
        match self.current_page {
            Page::Patients => {
                if let Some(patient) = self.selected_patient() {
                    self.model.delete_patient(&patient);
                    self.status = format!("Deleted patient {}", patient.name);
                    self.commit();
                }
            }
            Page::Appointments => {
                if let Some(appointment) = self.selected_appointment() {
                    self.model.delete_appointment(&appointment);
                    self.status = format!("Deleted appointment {}", appointment);
                    self.commit();
                }
            }
            Page::Bills => {
                if let Some(bill) = self.selected_bill() {
                    self.model.delete_bill(&bill);
                    self.status = format!("Deleted bill {}", bill);
                    self.commit();
                }
            }
        }
    }

    pub fn toggle_paid(&mut self) {
        if self.current_page != Page::Bills {
            return;
        }
        if let Some(bill) = self.selected_bill() {
            if bill.payment_status.is_paid() {
                self.model.set_bill_as_unpaid(&bill);
            } else {
                self.model.set_bill_as_paid(&bill);
            }
            self.status = String::from("Payment status updated");
            self.commit();
        }
    }

    pub fn sort_current(&mut self) {
        let ascending = self.ascending;
        match self.current_page {
            Page::Patients => self.model.sort_patients(Patient::compare_by_name, ascending),
            Page::Appointments => self
                .model
                .sort_appointments(Appointment::compare_by_slot, ascending),
            Page::Bills => self.model.sort_bills(Bill::compare_by_amount, ascending),
        }
        self.status = format!(
            "Sorted {} {}",
            self.current_page.title().to_lowercase(),
            if ascending { "ascending" } else { "descending" }
        );
        self.ascending = !ascending;
        self.commit();
    }

    pub fn clear_filters(&mut self) {
        self.model.show_all();
        self.status = String::from("Showing all records");
        self.commit();
    }

    pub fn undo(&mut self) {
        self.status = match self.model.undo() {
            Ok(()) => String::from("Undo successful"),
            Err(e) => e.to_string(),
        };
        self.clamp_selections();
    }

    pub fn redo(&mut self) {
        self.status = match self.model.redo() {
            Ok(()) => String::from("Redo successful"),
            Err(e) => e.to_string(),
        };
        self.clamp_selections();
    }

    /// Record the action, unless it left store and filters untouched
    fn commit(&mut self) {
        if self.model.has_uncommitted_changes() {
            self.model.commit();
        }
        self.clamp_selections();
    }

    /// Returns false when the app should quit
    pub fn handle_key(&mut self, key: KeyEvent) -> bool {
        match key.code {
            KeyCode::Char('q') | KeyCode::Esc => return false,
            KeyCode::Tab => self.current_page = self.current_page.next(),
            KeyCode::BackTab => self.current_page = self.current_page.previous(),
            KeyCode::Enter => self.select(),
            KeyCode::Char('d') | KeyCode::Delete => self.delete_selected(),
            KeyCode::Char('p') => self.toggle_paid(),
            KeyCode::Char('s') => self.sort_current(),
            KeyCode::Char('c') => self.clear_filters(),
            KeyCode::Char('u') => self.undo(),
            KeyCode::Char('z') if key.modifiers.contains(KeyModifiers::CONTROL) => self.undo(),
            KeyCode::Char('r') => self.redo(),
            KeyCode::Char('y') if key.modifiers.contains(KeyModifiers::CONTROL) => self.redo(),
            KeyCode::Down | KeyCode::Char('j') => self.next(),
            KeyCode::Up | KeyCode::Char('k') => self.previous(),
            _ => {}
        }
        true
    }
}

pub fn run_ui(app: &mut App) -> Result<()> {
    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let res = run_app(&mut terminal, app);

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    res?;
    Ok(())
}

fn run_app<B: ratatui::backend::Backend>(
    terminal: &mut Terminal<B>,
    app: &mut App,
) -> io::Result<()> {
    loop {
        terminal.draw(|f| ui(f, app))?;

        if let Event::Key(key) = event::read()? {
            if !app.handle_key(key) {
                return Ok(());
            }
        }
    }
}

fn ui(f: &mut Frame, app: &mut App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Header with navigation
            Constraint::Min(0),    // Active list
            Constraint::Length(3), // Status bar
        ])
        .split(f.size());

    render_header(f, chunks[0], app);

    match app.current_page {
        Page::Patients => render_patients(f, chunks[1], app),
        Page::Appointments => render_appointments(f, chunks[1], app),
        Page::Bills => render_bills(f, chunks[1], app),
    }

    render_status_bar(f, chunks[2], app);
}

fn render_header(f: &mut Frame, area: Rect, app: &App) {
    let pages = [
        (Page::Patients, app.model.filtered_patient_list().len()),
        (Page::Appointments, app.model.filtered_appointment_list().len()),
        (Page::Bills, app.model.filtered_bill_list().len()),
    ];

    let mut tab_spans = vec![];
    for (i, (page, count)) in pages.iter().enumerate() {
        if i > 0 {
            tab_spans.push(Span::raw(" │ "));
        }

        let style = if *page == app.current_page {
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD | Modifier::UNDERLINED)
        } else {
            Style::default().fg(Color::DarkGray)
        };

        tab_spans.push(Span::styled(format!("{} ({})", page.title(), count), style));
    }

    let history = app.model.history();
    tab_spans.push(Span::raw("  |  "));
    tab_spans.push(Span::styled(
        format!("undo {} / redo {}", history.undo_len().saturating_sub(1), history.redo_len()),
        Style::default().fg(Color::White),
    ));

    let header = Paragraph::new(vec![Line::from(tab_spans)])
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::Cyan)),
        );

    f.render_widget(header, area);
}

fn header_row(titles: &[&'static str]) -> Row<'static> {
    let cells = titles.iter().map(|h| {
        Cell::from(*h).style(
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
        )
    });
    Row::new(cells).style(Style::default().bg(Color::DarkGray)).height(1)
}

fn list_block(title: String) -> Block<'static> {
    Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::White))
        .title(title)
}

fn highlight() -> Style {
    Style::default()
        .bg(Color::DarkGray)
        .add_modifier(Modifier::BOLD)
}

fn filter_title(base: &str, label: Option<&str>) -> String {
    match label {
        Some(label) => format!(" {} - {} ", base, label),
        None => format!(" {} ", base),
    }
}

fn render_patients(f: &mut Frame, area: Rect, app: &mut App) {
    let view = app.model.filtered_patient_list();
    let rows = view.items().iter().map(|p| {
        Row::new(vec![
            Cell::from(truncate(p.name.as_str(), 24)),
            Cell::from(p.phone.to_string()),
            Cell::from(truncate(p.email.as_str(), 28)),
            Cell::from(truncate(p.address.as_str(), 40)),
        ])
    });

    let table = Table::new(
        rows,
        [
            Constraint::Length(26),
            Constraint::Length(14),
            Constraint::Length(30),
            Constraint::Min(10),
        ],
    )
    .header(header_row(&["Name", "Phone", "Email", "Address"]))
    .block(list_block(filter_title("Patients", view.predicate().map(|p| p.label()))))
    .highlight_style(highlight())
    .highlight_symbol("→ ");

    f.render_stateful_widget(table, area, &mut app.patients_state);
}

fn render_appointments(f: &mut Frame, area: Rect, app: &mut App) {
    let view = app.model.filtered_appointment_list();
    let rows = view.items().iter().map(|a| {
        Row::new(vec![
            Cell::from(truncate(a.name.as_str(), 24)),
            Cell::from(truncate(a.medical_test.as_str(), 20)),
            Cell::from(a.slot.to_string()),
            Cell::from(truncate(a.doctor.as_str(), 20)),
        ])
    });

    let table = Table::new(
        rows,
        [
            Constraint::Length(26),
            Constraint::Length(22),
            Constraint::Length(18),
            Constraint::Min(10),
        ],
    )
    .header(header_row(&["Patient", "Test", "Slot", "Doctor"]))
    .block(list_block(filter_title(
        "Appointments",
        view.predicate().map(|p| p.label()),
    )))
    .highlight_style(highlight())
    .highlight_symbol("→ ");

    f.render_stateful_widget(table, area, &mut app.appointments_state);
}

fn render_bills(f: &mut Frame, area: Rect, app: &mut App) {
    let view = app.model.filtered_bill_list();
    let rows = view.items().iter().map(|b| {
        let color = if b.payment_status.is_paid() {
            Color::Green
        } else {
            Color::Red
        };

        Row::new(vec![
            Cell::from(truncate(b.appointment.name.as_str(), 24)),
            Cell::from(truncate(b.appointment.medical_test.as_str(), 20)),
            Cell::from(b.appointment.slot.to_string()),
            Cell::from(b.amount.to_string()).style(Style::default().fg(color)),
            Cell::from(b.bill_date.to_string()),
            Cell::from(b.payment_status.as_str()).style(Style::default().fg(color)),
        ])
    });

    let table = Table::new(
        rows,
        [
            Constraint::Length(26),
            Constraint::Length(22),
            Constraint::Length(18),
            Constraint::Length(12),
            Constraint::Length(12),
            Constraint::Min(8),
        ],
    )
    .header(header_row(&["Patient", "Test", "Slot", "Amount", "Date", "Status"]))
    .block(list_block(filter_title("Bills", view.predicate().map(|p| p.label()))))
    .highlight_style(highlight())
    .highlight_symbol("→ ");

    f.render_stateful_widget(table, area, &mut app.bills_state);
}

fn render_status_bar(f: &mut Frame, area: Rect, app: &App) {
    let key = |k: &'static str| Span::styled(k, Style::default().fg(Color::Yellow));

    let status_spans = vec![
        Span::styled(format!(" {} ", app.status), Style::default().fg(Color::Cyan)),
        Span::raw(" | "),
        key("Enter"),
        Span::raw(" Select | "),
        key("d"),
        Span::raw(" Delete | "),
        key("p"),
        Span::raw(" Paid | "),
        key("s"),
        Span::raw(" Sort | "),
        key("c"),
        Span::raw(" Clear | "),
        key("u/r"),
        Span::raw(" Undo/Redo | "),
        Span::styled("q", Style::default().fg(Color::Red)),
        Span::raw(" Quit"),
    ];

    let status_bar = Paragraph::new(vec![Line::from(status_spans)]).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::White)),
    );

    f.render_widget(status_bar, area);
}

fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let cut: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", cut)
    }
}
