use std::error::Error;
use std::io;
use std::path::Path;
use std::time::Duration as StdDuration;

use chrono::{Datelike, Local, NaiveDate, Utc};
use crossterm::event::{self, Event as CEvent, KeyCode, KeyEventKind};
use crossterm::terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen};
use crossterm::{execute, ExecutableCommand};
use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph};
use ratatui::{Frame, Terminal};

use crate::calendar::{
	build_month_grid, first_day_of_month, fixed_holidays, shift_month, GridOptions, MonthGrid,
};
use crate::domain::{
	ConfirmationLog, EventKind, Frequency, Registry, Role, Shift, Treatment, User, COLOR_PALETTE,
};
use crate::storage::save_registry;

const UNIT_CHOICES: [&str; 3] = ["mg", "IU", "tablet"];
const FOCUSED_PANEL_BORDER_COLOR: Color = Color::Yellow;
const INACTIVE_PANEL_BORDER_COLOR: Color = Color::DarkGray;
const HIGHLIGHT_BACKGROUND_COLOR: Color = Color::Rgb(42, 45, 52);

/// Two presentations of the same calendar: staff get the holiday-aware
/// clinic look, patients the plain one. The layout engine is shared; only
/// this record differs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Theme {
	show_holidays: bool,
	header: Color,
	today_border: Color,
}

const CLINIC_THEME: Theme = Theme {
	show_holidays: true,
	header: Color::LightBlue,
	today_border: Color::Blue,
};

const PATIENT_THEME: Theme = Theme {
	show_holidays: false,
	header: Color::LightMagenta,
	today_border: Color::Magenta,
};

pub fn run_dashboard(
	registry: &mut Registry,
	registry_path: &Path,
	acting_user: Option<User>,
) -> Result<(), Box<dyn Error>> {
	enable_raw_mode()?;
	let mut stdout = io::stdout();
	stdout.execute(EnterAlternateScreen)?;
	let backend = CrosstermBackend::new(stdout);
	let mut terminal = Terminal::new(backend)?;

	let result = run_event_loop(&mut terminal, registry, registry_path, acting_user);

	disable_raw_mode()?;
	execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
	terminal.show_cursor()?;

	result
}

fn run_event_loop(
	terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
	registry: &mut Registry,
	registry_path: &Path,
	acting_user: Option<User>,
) -> Result<(), Box<dyn Error>> {
	let mut app = App::new(acting_user.as_ref(), registry);

	loop {
		let view = build_view(&app, registry);
		app.clamp_selection(&view);
		terminal.draw(|frame| draw_dashboard(frame, &app, &view))?;

		if event::poll(StdDuration::from_millis(250))? {
			if let CEvent::Key(key) = event::read()? {
				if key.kind != KeyEventKind::Press {
					continue;
				}

				let should_quit = match &app.mode {
					InputMode::Prompt(_) => handle_prompt_key(&mut app, key.code, registry, registry_path),
					InputMode::Select(_) => handle_select_key(&mut app, key.code, registry, registry_path),
					InputMode::Normal => {
						handle_normal_key(&mut app, key.code, registry, registry_path, &view)
					}
				};

				if should_quit {
					break;
				}
			}
		}
	}

	Ok(())
}

fn draw_dashboard(frame: &mut Frame, app: &App, view: &ViewModel) {
	let layout = Layout::default()
		.direction(Direction::Vertical)
		.constraints([Constraint::Min(14), Constraint::Length(4)])
		.split(frame.area());

	let body = Layout::default()
		.direction(Direction::Horizontal)
		.constraints([Constraint::Percentage(62), Constraint::Percentage(38)])
		.split(layout[0]);

	let side = Layout::default()
		.direction(Direction::Vertical)
		.constraints([Constraint::Percentage(55), Constraint::Percentage(45)])
		.split(body[1]);

	render_calendar_panel(frame, body[0], app, view);
	render_explorer_panel(frame, side[0], app, view);
	render_day_panel(frame, side[1], app, view);
	render_footer(frame, layout[1], app);

	if app.popup_day.is_some() {
		render_day_popup(frame, app, view);
	}

	if let InputMode::Select(select) = &app.mode {
		render_select_popup(frame, select);
	}
}

fn render_calendar_panel(frame: &mut Frame, area: Rect, app: &App, view: &ViewModel) {
	let cell_width = (area.width.saturating_sub(2) / 7).max(4) as usize;
	let mut lines = Vec::new();

	lines.push(Line::from(Span::styled(
		format!("{}", app.visible_month.format("%B %Y")),
		Style::default()
			.fg(app.theme.header)
			.add_modifier(Modifier::BOLD),
	)));

	let header = ["Mon", "Tue", "Wed", "Thu", "Fri", "Sat", "Sun"]
		.iter()
		.map(|name| Span::styled(cell_text(name, cell_width), Style::default().fg(app.theme.header)))
		.collect::<Vec<_>>();
	lines.push(Line::from(header));

	for week in &view.grid.weeks {
		let mut number_spans = Vec::new();
		for day in &week.days {
			let mut style = Style::default();
			let dimmed = !day.in_month
				|| (app.theme.show_holidays && (day.is_weekend || day.is_holiday));
			if dimmed {
				style = style.fg(Color::DarkGray);
			}
			if day.is_today {
				style = style
					.fg(app.theme.today_border)
					.add_modifier(Modifier::BOLD | Modifier::UNDERLINED);
			}
			if day.date == app.selected_day {
				style = Style::default()
					.fg(Color::Black)
					.bg(Color::Yellow)
					.add_modifier(Modifier::BOLD);
			}

			number_spans.push(Span::styled(
				cell_text(&format!("{:>2}", day.date.day()), cell_width),
				style,
			));
		}
		lines.push(Line::from(number_spans));

		// The documented row budget: one line for the numbers, one per
		// concurrent bar. Lanes past the budget are clipped, as the source
		// renderer let them spill out of the row.
		let bar_lines = week.row_extent(2, 1).saturating_sub(1) as usize;
		for lane in 0..bar_lines {
			let mut bar_spans = Vec::new();
			for day in &week.days {
				let entry = day.entries.iter().find(|entry| entry.lane == lane);
				match entry {
					Some(entry) => {
						let treatment = view.plan_treatments.get(entry.treatment_index);
						let color = treatment
							.and_then(|treatment| treatment.color.as_deref())
							.and_then(color_from_hex)
							.unwrap_or(Color::Gray);
						let bar_style = Style::default().fg(Color::Black).bg(color);

						let inner_width = cell_width
							- usize::from(entry.is_start)
							- usize::from(entry.is_end);
						let text = if entry.is_start {
							treatment
								.map(|treatment| treatment.bar_label())
								.unwrap_or_default()
						} else {
							String::new()
						};

						if entry.is_start {
							bar_spans.push(Span::raw(" "));
						}
						bar_spans.push(Span::styled(cell_text(&text, inner_width), bar_style));
						if entry.is_end {
							bar_spans.push(Span::raw(" "));
						}
					}
					None => bar_spans.push(Span::raw(" ".repeat(cell_width))),
				}
			}
			lines.push(Line::from(bar_spans));
		}
	}

	let title = match &view.plan_name {
		Some(name) => format!("Calendar: {name}"),
		None => "Calendar (no plan selected)".to_string(),
	};
	let block = Block::default()
		.borders(Borders::ALL)
		.title(title)
		.border_style(border_style(app.focus == FocusPane::Calendar));
	frame.render_widget(Paragraph::new(lines).block(block), area);
}

fn render_explorer_panel(frame: &mut Frame, area: Rect, app: &App, view: &ViewModel) {
	let title = match &app.explorer_mode {
		ExplorerMode::Patients => "Explorer: Patients".to_string(),
		ExplorerMode::PatientPlans { nick, .. } => format!("Explorer: {nick}"),
	};

	let items = view
		.explorer_rows
		.iter()
		.map(|row| ListItem::new(row.line.clone()))
		.collect::<Vec<_>>();

	let mut state = ListState::default();
	if !view.explorer_rows.is_empty() {
		state.select(Some(app.explorer_index.min(view.explorer_rows.len() - 1)));
	}

	let block = Block::default()
		.borders(Borders::ALL)
		.title(title)
		.border_style(border_style(app.focus == FocusPane::Explorer));
	let list = List::new(if items.is_empty() {
		vec![ListItem::new("(empty)")]
	} else {
		items
	})
	.block(block)
	.highlight_style(Style::default().bg(HIGHLIGHT_BACKGROUND_COLOR).add_modifier(Modifier::BOLD));

	frame.render_stateful_widget(list, area, &mut state);
}

fn render_day_panel(frame: &mut Frame, area: Rect, app: &App, view: &ViewModel) {
	let mut items = Vec::new();
	for row in &view.day_rows {
		items.push(ListItem::new(render_day_row_line(row)));
	}

	if items.is_empty() {
		items.push(ListItem::new("(no medication on selected day)"));
	}

	let mut state = ListState::default();
	if !view.day_rows.is_empty() {
		state.select(Some(app.day_index.min(view.day_rows.len() - 1)));
	}

	let title = format!("{}", app.selected_day.format("%A, %d %B %Y"));
	let list = List::new(items)
		.block(
			Block::default()
				.borders(Borders::ALL)
				.title(title)
				.border_style(border_style(app.focus == FocusPane::Day)),
		)
		.highlight_style(Style::default().bg(HIGHLIGHT_BACKGROUND_COLOR).add_modifier(Modifier::BOLD));

	frame.render_stateful_widget(list, area, &mut state);
}

fn render_day_row_line(row: &DayTreatmentRow) -> Line<'static> {
	let marker = match &row.confirmed {
		Some(time) => format!("[x {time}]"),
		None => "[ ]".to_string(),
	};

	let mut spans = vec![
		Span::styled(format!("{marker} "), Style::default().fg(Color::DarkGray)),
		Span::styled(row.title.clone(), row.style),
	];
	if !row.frequency.is_empty() {
		spans.push(Span::raw(format!(" | {}", row.frequency)));
	}
	if !row.hours.is_empty() {
		spans.push(Span::raw(format!(" | {}", row.hours)));
	}
	if let Some(total) = &row.daily_total {
		spans.push(Span::styled(
			format!(" | {total}"),
			Style::default().fg(Color::DarkGray),
		));
	}

	Line::from(spans)
}

fn render_day_popup(frame: &mut Frame, app: &App, view: &ViewModel) {
	let Some(popup_day) = &app.popup_day else {
		return;
	};

	let area = centered_rect(58, 55, frame.area());
	frame.render_widget(Clear, area);

	let mut items = Vec::new();
	for row in &view.day_rows {
		items.push(ListItem::new(render_day_row_line(row)));
	}
	if items.is_empty() {
		items.push(ListItem::new("(no medication)"));
	}

	let mut state = ListState::default();
	if !view.day_rows.is_empty() {
		state.select(Some(app.day_index.min(view.day_rows.len() - 1)));
	}

	let list = List::new(items)
		.block(
			Block::default()
				.borders(Borders::ALL)
				.title(format!("Medication for {popup_day}")),
		)
		.highlight_symbol(">> ")
		.highlight_style(Style::default().bg(HIGHLIGHT_BACKGROUND_COLOR));
	frame.render_stateful_widget(list, area, &mut state);
}

fn render_footer(frame: &mut Frame, area: Rect, app: &App) {
	let footer_lines = match &app.mode {
		InputMode::Normal => vec![
			Line::from("Tab pane | arrows/hjkl navigate | n/N month | Enter day details / open"),
			Line::from(
				"space confirm dose | t treatment | o plan | p patient | u user | h hours | d delete | q quit",
			),
			Line::from(format!("{} | acting as {} ({})", app.status, app.acting_nick, app.role.label())),
		],
		InputMode::Prompt(prompt) => vec![
			Line::from(prompt.title.clone()),
			Line::from(format!("> {}", prompt.input)),
			Line::from("Enter submit | Esc cancel"),
		],
		InputMode::Select(select) => vec![
			Line::from(select.title.clone()),
			Line::from(format!(
				"Selected: {}",
				select
					.selected_option()
					.map(|option| option.label.as_str())
					.unwrap_or("(none)")
			)),
			Line::from("j/k or arrows move | Enter choose | Esc cancel"),
		],
	};

	let footer = Paragraph::new(footer_lines).block(Block::default().borders(Borders::ALL).title("Shortcuts"));
	frame.render_widget(footer, area);
}

fn render_select_popup(frame: &mut Frame, select: &SelectState) {
	let area = centered_rect(62, 55, frame.area());
	frame.render_widget(Clear, area);

	let items = if select.options.is_empty() {
		vec![ListItem::new("(no choices)")]
	} else {
		select
			.options
			.iter()
			.map(|option| ListItem::new(option.label.clone()).style(option.style))
			.collect::<Vec<_>>()
	};

	let current = if select.options.is_empty() {
		0
	} else {
		select.selected.saturating_add(1)
	};
	let total = select.options.len();
	let list = List::new(items)
		.block(
			Block::default()
				.borders(Borders::ALL)
				.title(format!("{} ({current}/{total})", select.title)),
		)
		.highlight_symbol(">> ")
		.highlight_style(Style::default().bg(HIGHLIGHT_BACKGROUND_COLOR));

	let mut state = ListState::default();
	if !select.options.is_empty() {
		state.select(Some(select.selected.min(select.options.len().saturating_sub(1))));
	}
	frame.render_stateful_widget(list, area, &mut state);
}

fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
	let popup_layout = Layout::default()
		.direction(Direction::Vertical)
		.constraints([
			Constraint::Percentage((100 - percent_y) / 2),
			Constraint::Percentage(percent_y),
			Constraint::Percentage((100 - percent_y) / 2),
		])
		.split(area);
	Layout::default()
		.direction(Direction::Horizontal)
		.constraints([
			Constraint::Percentage((100 - percent_x) / 2),
			Constraint::Percentage(percent_x),
			Constraint::Percentage((100 - percent_x) / 2),
		])
		.split(popup_layout[1])[1]
}

fn handle_normal_key(
	app: &mut App,
	code: KeyCode,
	registry: &mut Registry,
	registry_path: &Path,
	view: &ViewModel,
) -> bool {
	// The day popup swallows navigation keys while it is open.
	if app.popup_day.is_some() {
		match code {
			KeyCode::Esc | KeyCode::Enter => app.popup_day = None,
			KeyCode::Up | KeyCode::Char('k') => app.move_day_selection(-1, view),
			KeyCode::Down | KeyCode::Char('j') => app.move_day_selection(1, view),
			KeyCode::Char(' ') => confirm_selected_dose(app, registry, registry_path, view),
			KeyCode::Char('q') => return true,
			_ => {}
		}
		return false;
	}

	match code {
		KeyCode::Char('q') => true,
		KeyCode::Esc => {
			if app.focus == FocusPane::Explorer && app.role.can_edit() {
				if let ExplorerMode::PatientPlans { .. } = app.explorer_mode {
					app.explorer_mode = ExplorerMode::Patients;
					app.explorer_index = 0;
					app.selected_plan = None;
					app.status = "Back to patients".to_string();
					return false;
				}
			}
			true
		}
		KeyCode::Tab => {
			app.focus = app.focus.next();
			false
		}
		KeyCode::BackTab => {
			app.focus = app.focus.prev();
			false
		}
		KeyCode::Up | KeyCode::Char('k') => {
			match app.focus {
				FocusPane::Calendar => app.shift_selected_day(-7),
				FocusPane::Day => app.move_day_selection(-1, view),
				FocusPane::Explorer => app.move_explorer_selection(-1, view),
			}
			false
		}
		KeyCode::Down | KeyCode::Char('j') => {
			match app.focus {
				FocusPane::Calendar => app.shift_selected_day(7),
				FocusPane::Day => app.move_day_selection(1, view),
				FocusPane::Explorer => app.move_explorer_selection(1, view),
			}
			false
		}
		KeyCode::Left | KeyCode::Char('h') if app.focus == FocusPane::Calendar => {
			app.shift_selected_day(-1);
			false
		}
		KeyCode::Right | KeyCode::Char('l') if app.focus == FocusPane::Calendar => {
			app.shift_selected_day(1);
			false
		}
		KeyCode::Char('n') => {
			app.shift_selected_month(1);
			false
		}
		KeyCode::Char('N') => {
			app.shift_selected_month(-1);
			false
		}
		KeyCode::Char('p') => {
			if app.role.can_edit() {
				app.mode = InputMode::Prompt(PromptState::new(
					"New patient nick",
					PromptKind::UserNick { role: Role::Patient },
				));
			} else {
				app.status = "Only staff can register patients".to_string();
			}
			false
		}
		KeyCode::Char('u') => {
			if app.role == Role::Superuser {
				app.mode = InputMode::Select(build_role_select());
			} else {
				app.status = "Only the superuser can manage users".to_string();
			}
			false
		}
		KeyCode::Char('o') => {
			if !app.role.can_edit() {
				app.status = "Only staff can create plans".to_string();
			} else if let Some((patient_id, nick)) = app.selected_patient(view) {
				app.mode = InputMode::Prompt(PromptState::new(
					format!("Plan name for {nick}"),
					PromptKind::PlanName { patient_id },
				));
			} else {
				app.status = "Select a patient in Explorer first".to_string();
			}
			false
		}
		KeyCode::Char('t') => {
			if !app.role.can_edit() {
				app.status = "Only staff can edit treatments".to_string();
			} else if let Some(plan_id) = app.selected_plan.clone() {
				app.mode = InputMode::Prompt(PromptState::new(
					"Medication name",
					PromptKind::TreatmentMedication { plan_id },
				));
			} else {
				app.status = "Open a plan first (Enter on a plan row)".to_string();
			}
			false
		}
		KeyCode::Char('d') => {
			if !app.role.can_edit() {
				app.status = "Only staff can delete treatments".to_string();
				return false;
			}

			match app.selected_treatment(view) {
				Some((plan_id, index)) => {
					let medication = registry
						.plan(&plan_id)
						.and_then(|plan| plan.treatments.get(index))
						.map(|treatment| treatment.medication.clone())
						.unwrap_or_default();
					app.mode = InputMode::Select(build_delete_treatment_select(
						plan_id, index, medication,
					));
				}
				None => app.status = "Select a treatment row first".to_string(),
			}
			false
		}
		KeyCode::Char('h') if app.focus != FocusPane::Calendar => {
			match app.selected_treatment(view) {
				Some((plan_id, index)) => {
					match build_shift_select(registry, plan_id, index) {
						Ok(select) => app.mode = InputMode::Select(select),
						Err(err) => app.status = err,
					}
				}
				None => app.status = "Select a treatment row first".to_string(),
			}
			false
		}
		KeyCode::Char(' ') => {
			if app.focus == FocusPane::Day {
				confirm_selected_dose(app, registry, registry_path, view);
			} else {
				app.status = "Focus the day panel to confirm a dose".to_string();
			}
			false
		}
		KeyCode::Enter => {
			match app.focus {
				FocusPane::Calendar => {
					// The day tap: hand the date string over, toggling off
					// when the same day is tapped again.
					let tapped = on_day_press(app.selected_day);
					if app.popup_day.as_deref() == Some(tapped.as_str()) {
						app.popup_day = None;
					} else {
						app.popup_day = Some(tapped);
						app.day_index = 0;
					}
				}
				FocusPane::Explorer => {
					match app.selected_explorer_row_kind(view) {
						Some(ExplorerRowKind::Patient { user_id, nick }) => {
							app.selected_plan = registry.active_plan_id(&user_id);
							app.explorer_mode = ExplorerMode::PatientPlans {
								patient_id: user_id,
								nick,
							};
							app.explorer_index = 0;
						}
						Some(ExplorerRowKind::Plan { plan_id, name }) => {
							app.selected_plan = Some(plan_id);
							app.status = format!("Showing plan: {name}");
						}
						Some(ExplorerRowKind::Treatment { .. }) => {
							app.status = "Press h for hours, d to delete".to_string();
						}
						Some(ExplorerRowKind::Empty) | None => {}
					}
				}
				FocusPane::Day => {}
			}
			false
		}
		_ => false,
	}
}

/// The tapped day leaves the engine as its `YYYY-MM-DD` string, nothing
/// else.
fn on_day_press(day: NaiveDate) -> String {
	day.format("%Y-%m-%d").to_string()
}

fn confirm_selected_dose(app: &mut App, registry: &mut Registry, registry_path: &Path, view: &ViewModel) {
	let Some(plan_id) = app.selected_plan.clone() else {
		app.status = "No plan selected".to_string();
		return;
	};
	let Some(row) = view.day_rows.get(app.day_index) else {
		app.status = "No treatment selected".to_string();
		return;
	};

	let date = on_day_press(app.selected_day);
	let time_label = Local::now().format("%H:%M").to_string();
	let result = registry
		.record_confirmation(&plan_id, row.treatment_index, &date, time_label.clone(), Utc::now())
		.and_then(|()| persist(registry_path, registry));

	app.status = match result {
		Ok(()) => format!("Dose confirmed at {time_label}"),
		Err(err) => format!("error: {err}"),
	};
}

fn handle_prompt_key(
	app: &mut App,
	code: KeyCode,
	registry: &mut Registry,
	registry_path: &Path,
) -> bool {
	match code {
		KeyCode::Esc => {
			app.mode = InputMode::Normal;
			app.status = "Input cancelled".to_string();
		}
		KeyCode::Backspace => {
			if let InputMode::Prompt(prompt) = &mut app.mode {
				prompt.input.pop();
			}
		}
		KeyCode::Char(value) => {
			if let InputMode::Prompt(prompt) = &mut app.mode {
				prompt.input.push(value);
			}
		}
		KeyCode::Enter => {
			let prompt = match std::mem::replace(&mut app.mode, InputMode::Normal) {
				InputMode::Prompt(prompt) => prompt,
				InputMode::Normal | InputMode::Select(_) => return false,
			};

			let acting_nick = app.acting_nick.clone();
			match submit_prompt(prompt.clone(), registry, registry_path, &acting_nick) {
				Ok(PromptOutcome::NextPrompt(next_prompt)) => app.mode = InputMode::Prompt(next_prompt),
				Ok(PromptOutcome::Select(select)) => app.mode = InputMode::Select(select),
				Ok(PromptOutcome::Done(message)) => {
					app.mode = InputMode::Normal;
					app.status = message;
				}
				Err(err) => {
					app.mode = InputMode::Prompt(prompt);
					app.status = format!("error: {err}");
				}
			}
		}
		_ => {}
	}

	false
}

fn handle_select_key(
	app: &mut App,
	code: KeyCode,
	registry: &mut Registry,
	registry_path: &Path,
) -> bool {
	match code {
		KeyCode::Esc => {
			app.mode = InputMode::Normal;
			app.status = "Selection cancelled".to_string();
		}
		KeyCode::Up | KeyCode::Char('k') => {
			if let InputMode::Select(select) = &mut app.mode {
				select.move_selection(-1);
			}
		}
		KeyCode::Down | KeyCode::Char('j') => {
			if let InputMode::Select(select) = &mut app.mode {
				select.move_selection(1);
			}
		}
		KeyCode::Enter => {
			let select = match std::mem::replace(&mut app.mode, InputMode::Normal) {
				InputMode::Select(select) => select,
				_ => return false,
			};

			match submit_select(select.clone(), registry, registry_path) {
				Ok(SelectOutcome::NextPrompt(prompt)) => app.mode = InputMode::Prompt(prompt),
				Ok(SelectOutcome::NextSelect(next_select)) => app.mode = InputMode::Select(next_select),
				Ok(SelectOutcome::Done(message)) => {
					app.mode = InputMode::Normal;
					app.status = message;
				}
				Err(err) => {
					app.mode = InputMode::Select(select);
					app.status = format!("error: {err}");
				}
			}
		}
		_ => {}
	}

	false
}

fn submit_prompt(
	prompt: PromptState,
	registry: &mut Registry,
	registry_path: &Path,
	acting_nick: &str,
) -> Result<PromptOutcome, String> {
	match prompt.kind {
		PromptKind::UserNick { role } => {
			let nick = required_text(&prompt.input, "nick")?;
			Ok(PromptOutcome::NextPrompt(PromptState::new(
				format!("Password for {nick}"),
				PromptKind::UserPassword { role, nick },
			)))
		}
		PromptKind::UserPassword { role, nick } => {
			let password = required_text(&prompt.input, "password")?;
			let created_nick = nick.clone();
			registry.add_user(nick, password, role)?;
			persist(registry_path, registry)?;
			Ok(PromptOutcome::Done(format!(
				"created {}: {created_nick}",
				role.label()
			)))
		}
		PromptKind::PlanName { patient_id } => {
			let name = required_text(&prompt.input, "plan name")?;
			let created_name = name.clone();
			registry.add_plan(&patient_id, name, acting_nick.to_string(), Utc::now())?;
			persist(registry_path, registry)?;
			Ok(PromptOutcome::Done(format!("created plan: {created_name}")))
		}
		PromptKind::TreatmentMedication { plan_id } => {
			let medication = required_text(&prompt.input, "medication")?;
			let draft = TreatmentDraft::new(plan_id, medication.clone());

			let suggestions = registry.suggestions(&medication);
			if suggestions.is_empty() {
				Ok(PromptOutcome::NextPrompt(PromptState::new(
					"Dose (amount only)",
					PromptKind::TreatmentDose { draft },
				)))
			} else {
				Ok(PromptOutcome::Select(build_catalog_select(
					registry, &medication, draft,
				)))
			}
		}
		PromptKind::TreatmentDose { mut draft } => {
			draft.dose = prompt.input.trim().to_string();
			Ok(PromptOutcome::Select(build_unit_select(draft)))
		}
		PromptKind::TreatmentUnitsPerDose { mut draft } => {
			let raw = prompt.input.trim();
			draft.units_per_dose = if raw.is_empty() {
				1
			} else {
				raw.parse::<u32>()
					.map_err(|_| format!("invalid unit count '{raw}'"))?
			};
			Ok(PromptOutcome::NextPrompt(PromptState::new(
				"Tolerance hh:mm (optional)",
				PromptKind::TreatmentTolerance { draft },
			)))
		}
		PromptKind::TreatmentTolerance { mut draft } => {
			draft.tolerance = optional_text(&prompt.input);
			Ok(PromptOutcome::NextPrompt(PromptState::new(
				"First day YYYY-MM-DD (optional)",
				PromptKind::TreatmentFrom { draft },
			)))
		}
		PromptKind::TreatmentFrom { mut draft } => {
			draft.from = parse_optional_date(&prompt.input)?;
			Ok(PromptOutcome::NextPrompt(PromptState::new(
				"Last day YYYY-MM-DD (optional)",
				PromptKind::TreatmentTo { draft },
			)))
		}
		PromptKind::TreatmentTo { mut draft } => {
			draft.to = parse_optional_date(&prompt.input)?;
			Ok(PromptOutcome::Select(build_frequency_select(draft)))
		}
		PromptKind::HoursTime {
			plan_id,
			treatment_index,
			shift,
		} => {
			let value = match optional_text(&prompt.input) {
				Some(raw) => Some(validated_clock(&raw)?),
				None => None,
			};
			registry.set_treatment_hours(&plan_id, treatment_index, shift, value)?;
			persist(registry_path, registry)?;
			Ok(PromptOutcome::Done(format!("updated {} hours", shift.label())))
		}
	}
}

fn submit_select(
	select: SelectState,
	registry: &mut Registry,
	registry_path: &Path,
) -> Result<SelectOutcome, String> {
	let selected_value = select
		.selected_option()
		.map(|option| option.value.clone())
		.ok_or_else(|| "no option selected".to_string())?;

	match select.kind {
		SelectKind::NewUserRole => {
			let role = selected_value
				.as_deref()
				.and_then(Role::from_flag)
				.ok_or_else(|| "selected role is missing".to_string())?;
			Ok(SelectOutcome::NextPrompt(PromptState::new(
				format!("New {} nick", role.label()),
				PromptKind::UserNick { role },
			)))
		}
		SelectKind::CatalogPick { mut draft } => {
			if let Some(name) = selected_value {
				if let Some(entry) = registry
					.header
					.catalog
					.iter()
					.find(|entry| entry.name == name)
				{
					draft.medication = entry.name.clone();
					draft.dose = entry.dose.clone();
					draft.unit = entry.unit.clone();
					draft.tolerance = entry.tolerance.clone();
					return Ok(SelectOutcome::NextPrompt(PromptState::new(
						"First day YYYY-MM-DD (optional)",
						PromptKind::TreatmentFrom { draft },
					)));
				}
			}

			// Keep what was typed and fill the rest in by hand.
			Ok(SelectOutcome::NextPrompt(PromptState::new(
				"Dose (amount only)",
				PromptKind::TreatmentDose { draft },
			)))
		}
		SelectKind::TreatmentUnit { mut draft } => {
			draft.unit = selected_value.ok_or_else(|| "selected unit is missing".to_string())?;
			Ok(SelectOutcome::NextPrompt(PromptState::new(
				"Units per intake (default 1)",
				PromptKind::TreatmentUnitsPerDose { draft },
			)))
		}
		SelectKind::TreatmentFrequency { mut draft } => {
			draft.frequency = selected_value.as_deref().and_then(Frequency::from_flag);
			Ok(SelectOutcome::NextSelect(build_color_select(registry, draft)))
		}
		SelectKind::TreatmentColor { draft } => {
			let color = selected_value;
			let plan_id = draft.plan_id.clone();
			let mut treatment = Treatment::new(draft.medication);
			treatment.dose = draft.dose;
			treatment.unit = draft.unit;
			treatment.units_per_dose = draft.units_per_dose;
			treatment.tolerance = draft.tolerance;
			treatment.frequency = draft.frequency;
			treatment.from = draft.from;
			treatment.to = draft.to;
			treatment.color = color;

			let medication = treatment.medication.clone();
			registry.add_treatment(&plan_id, treatment)?;
			registry.register_medications(&plan_id);
			persist(registry_path, registry)?;
			Ok(SelectOutcome::Done(format!("added treatment: {medication}")))
		}
		SelectKind::HoursShift {
			plan_id,
			treatment_index,
		} => {
			let shift = match selected_value.as_deref() {
				Some("morning") => Shift::Morning,
				Some("afternoon") => Shift::Afternoon,
				Some("evening") => Shift::Evening,
				_ => return Err("selected shift is missing".to_string()),
			};
			Ok(SelectOutcome::NextPrompt(PromptState::new(
				format!("{} time hh:mm (empty clears)", shift.label()),
				PromptKind::HoursTime {
					plan_id,
					treatment_index,
					shift,
				},
			)))
		}
		SelectKind::DeleteTreatmentConfirm {
			plan_id,
			treatment_index,
			medication,
		} => {
			let action = selected_value
				.as_deref()
				.ok_or_else(|| "selected action is missing".to_string())?;
			if action == "delete" {
				registry.remove_treatment(&plan_id, treatment_index)?;
				persist(registry_path, registry)?;
				Ok(SelectOutcome::Done(format!("deleted treatment: {medication}")))
			} else {
				Ok(SelectOutcome::Done("Delete cancelled".to_string()))
			}
		}
	}
}

fn build_role_select() -> SelectState {
	let options = [Role::Patient, Role::Doctor, Role::Superuser]
		.into_iter()
		.map(|role| {
			SelectOption::new(role.label(), Some(role.label().to_string()), Style::default())
		})
		.collect::<Vec<_>>();
	SelectState::new("New user role", SelectKind::NewUserRole, options)
}

fn build_catalog_select(registry: &Registry, typed: &str, draft: TreatmentDraft) -> SelectState {
	let mut options = vec![SelectOption::new(
		format!("Keep '{typed}' as typed"),
		None,
		Style::default().fg(Color::Gray),
	)];
	for entry in registry.suggestions(typed) {
		let tolerance = entry.tolerance.as_deref().unwrap_or("-");
		options.push(SelectOption::new(
			format!("{} | {} {} | tol {}", entry.name, entry.dose, entry.unit, tolerance),
			Some(entry.name.clone()),
			Style::default(),
		));
	}

	SelectState::new(
		"Known medications",
		SelectKind::CatalogPick { draft },
		options,
	)
}

fn build_unit_select(draft: TreatmentDraft) -> SelectState {
	let options = UNIT_CHOICES
		.iter()
		.map(|unit| SelectOption::new(*unit, Some(unit.to_string()), Style::default()))
		.collect::<Vec<_>>();
	SelectState::new("Dose unit", SelectKind::TreatmentUnit { draft }, options)
}

fn build_frequency_select(draft: TreatmentDraft) -> SelectState {
	let mut options = vec![SelectOption::new("(not set)", None, Style::default().fg(Color::Gray))];
	for frequency in Frequency::ALL {
		let value = match frequency {
			Frequency::Every8h => "every-8h",
			Frequency::Every12h => "every-12h",
			Frequency::Every24h => "every-24h",
			Frequency::SingleDose => "single-dose",
		};
		options.push(SelectOption::new(
			frequency.label(),
			Some(value.to_string()),
			Style::default(),
		));
	}
	SelectState::new(
		"Intake frequency",
		SelectKind::TreatmentFrequency { draft },
		options,
	)
}

fn build_color_select(registry: &Registry, draft: TreatmentDraft) -> SelectState {
	let mut options = vec![SelectOption::new(
		"Auto (first free color)",
		None,
		Style::default().fg(Color::Gray),
	)];

	let used = registry
		.plan(&draft.plan_id)
		.map(|plan| {
			plan.treatments
				.iter()
				.filter_map(|treatment| treatment.color.clone())
				.collect::<Vec<_>>()
		})
		.unwrap_or_default();
	for color in COLOR_PALETTE {
		if used.iter().any(|c| c == color) {
			continue;
		}
		let style = color_from_hex(color)
			.map(|color| Style::default().fg(color))
			.unwrap_or_default();
		options.push(SelectOption::new(
			"████████████████",
			Some(color.to_string()),
			style,
		));
	}

	SelectState::new("Bar color", SelectKind::TreatmentColor { draft }, options)
}

fn build_shift_select(
	registry: &Registry,
	plan_id: String,
	treatment_index: usize,
) -> Result<SelectState, String> {
	let treatment = registry
		.plan(&plan_id)
		.and_then(|plan| plan.treatments.get(treatment_index))
		.ok_or_else(|| "treatment no longer exists".to_string())?;

	let options = Shift::ALL
		.into_iter()
		.filter(|shift| treatment.shift_enabled(*shift))
		.map(|shift| {
			let current = treatment
				.hours
				.get(shift)
				.map(|time| format!(" ({time})"))
				.unwrap_or_default();
			SelectOption::new(
				format!("{}{current}", shift.label()),
				Some(shift.label().to_string()),
				Style::default(),
			)
		})
		.collect::<Vec<_>>();

	if options.is_empty() {
		return Err("set a frequency before scheduling hours".to_string());
	}

	Ok(SelectState::new(
		"Which shift?",
		SelectKind::HoursShift {
			plan_id,
			treatment_index,
		},
		options,
	))
}

fn build_delete_treatment_select(
	plan_id: String,
	treatment_index: usize,
	medication: String,
) -> SelectState {
	let title = format!("Delete treatment? {medication}");
	let options = vec![
		SelectOption::new(
			"Delete",
			Some("delete".to_string()),
			Style::default().fg(Color::LightRed).add_modifier(Modifier::BOLD),
		),
		SelectOption::new("Cancel", Some("cancel".to_string()), Style::default()),
	];

	let mut select = SelectState::new(
		title,
		SelectKind::DeleteTreatmentConfirm {
			plan_id,
			treatment_index,
			medication,
		},
		options,
	);
	// Default to cancel to prevent accidental deletions.
	select.selected = 1;
	select
}

fn build_view(app: &App, registry: &Registry) -> ViewModel {
	let plan = app
		.selected_plan
		.as_ref()
		.and_then(|plan_id| registry.plan(plan_id));
	let plan_treatments = plan
		.map(|plan| plan.treatments.clone())
		.unwrap_or_default();
	let plan_name = plan.map(|plan| plan.name.clone());

	let year = app.visible_month.year();
	let options = GridOptions::new(
		app.theme.show_holidays,
		fixed_holidays(year - 1, year + 1),
		Local::now().date_naive(),
	);
	let grid = build_month_grid(app.visible_month, &plan_treatments, &options);

	let confirmations = registry.confirmations();
	let day_rows = build_day_rows(app, registry, &confirmations);
	let explorer_rows = build_explorer_rows(app, registry);

	ViewModel {
		grid,
		plan_name,
		plan_treatments,
		day_rows,
		explorer_rows,
	}
}

fn build_day_rows(
	app: &App,
	registry: &Registry,
	confirmations: &ConfirmationLog,
) -> Vec<DayTreatmentRow> {
	let Some(plan_id) = app.selected_plan.as_ref() else {
		return Vec::new();
	};

	let date = on_day_press(app.selected_day);
	registry
		.treatments_on(plan_id, &date)
		.into_iter()
		.map(|(index, treatment)| {
			let title = if treatment.dose.is_empty() {
				treatment.medication.clone()
			} else {
				format!(
					"{} ({} {})",
					treatment.medication, treatment.dose, treatment.unit
				)
			};
			let frequency = treatment
				.frequency
				.map(|frequency| frequency.label().to_string())
				.unwrap_or_default();
			let hours = Shift::ALL
				.into_iter()
				.filter(|shift| treatment.shift_enabled(*shift))
				.map(|shift| {
					format!(
						"{} {}",
						shift.label(),
						treatment.hours.get(shift).unwrap_or("--:--")
					)
				})
				.collect::<Vec<_>>()
				.join(", ");
			let style = treatment
				.color
				.as_deref()
				.and_then(color_from_hex)
				.map(|color| Style::default().fg(color))
				.unwrap_or_default();

			DayTreatmentRow {
				treatment_index: index,
				title,
				frequency,
				hours,
				daily_total: treatment.daily_dose_label(),
				confirmed: confirmations
					.time_for(plan_id, index, &date)
					.map(str::to_string),
				style,
			}
		})
		.collect()
}

fn build_explorer_rows(app: &App, registry: &Registry) -> Vec<ExplorerRow> {
	match &app.explorer_mode {
		ExplorerMode::Patients => {
			let mut patients = registry
				.header
				.users
				.iter()
				.filter(|user| user.role == Role::Patient)
				.collect::<Vec<_>>();
			patients.sort_by(|left, right| left.nick.cmp(&right.nick).then_with(|| left.id.cmp(&right.id)));

			if patients.is_empty() {
				return vec![ExplorerRow::empty("(no patients yet, press p)")];
			}

			patients
				.into_iter()
				.map(|patient| {
					let plan_count = registry.patient_plans(&patient.id).len();
					ExplorerRow {
						line: Line::from(format!("{} | plans {}", patient.nick, plan_count)),
						kind: ExplorerRowKind::Patient {
							user_id: patient.id.clone(),
							nick: patient.nick.clone(),
						},
					}
				})
				.collect::<Vec<_>>()
		}
		ExplorerMode::PatientPlans { patient_id, .. } => {
			let plans = registry.patient_plans(patient_id);
			if plans.is_empty() {
				return vec![ExplorerRow::empty("(no plans yet, press o)")];
			}

			let active_id = registry.active_plan_id(patient_id);
			let mut rows = Vec::new();
			for plan in plans {
				let is_open = app.selected_plan.as_deref() == Some(plan.id.as_str());
				let marker = if is_open { "[-]" } else { "[+]" };
				let active = if active_id.as_deref() == Some(plan.id.as_str()) {
					" *active*"
				} else {
					""
				};
				rows.push(ExplorerRow {
					line: Line::from(format!(
						"{} {} | {} | by {}{}",
						marker,
						plan.created_at.format("%Y-%m-%d"),
						plan.name,
						plan.created_by,
						active
					)),
					kind: ExplorerRowKind::Plan {
						plan_id: plan.id.clone(),
						name: plan.name.clone(),
					},
				});

				if !is_open {
					continue;
				}

				for (index, treatment) in plan.treatments.iter().enumerate() {
					let style = treatment
						.color
						.as_deref()
						.and_then(color_from_hex)
						.map(|color| Style::default().fg(color))
						.unwrap_or_default();
					let range = match (treatment.from.as_deref(), treatment.to.as_deref()) {
						(Some(from), Some(to)) if !from.is_empty() && !to.is_empty() => {
							format!("{from}..{to}")
						}
						_ => "(no dates)".to_string(),
					};
					rows.push(ExplorerRow {
						line: Line::from(vec![
							Span::raw("  "),
							Span::styled(
								if treatment.medication.is_empty() {
									"(unnamed)".to_string()
								} else {
									treatment.medication.clone()
								},
								style,
							),
							Span::raw(format!(" | {range}")),
						]),
						kind: ExplorerRowKind::Treatment {
							plan_id: plan.id.clone(),
							index,
						},
					});
				}
			}
			rows
		}
	}
}

fn persist(path: &Path, registry: &Registry) -> Result<(), String> {
	save_registry(path, registry).map_err(|err| err.to_string())
}

fn required_text(input: &str, field_name: &str) -> Result<String, String> {
	let value = input.trim();
	if value.is_empty() {
		Err(format!("{field_name} is required"))
	} else {
		Ok(value.to_string())
	}
}

fn optional_text(input: &str) -> Option<String> {
	let value = input.trim();
	if value.is_empty() {
		None
	} else {
		Some(value.to_string())
	}
}

/// Date flags and prompt fields are parsed here, at the edge; an empty
/// input leaves the bound unset.
fn parse_optional_date(input: &str) -> Result<Option<String>, String> {
	match optional_text(input) {
		None => Ok(None),
		Some(raw) => {
			NaiveDate::parse_from_str(&raw, "%Y-%m-%d")
				.map_err(|_| format!("invalid date '{raw}', expected YYYY-MM-DD"))?;
			Ok(Some(raw))
		}
	}
}

fn validated_clock(raw: &str) -> Result<String, String> {
	let parts = raw.split_once(':');
	let valid = parts
		.and_then(|(hour, minute)| {
			let hour = hour.parse::<u32>().ok()?;
			let minute = minute.parse::<u32>().ok()?;
			(hour < 24 && minute < 60).then_some(())
		})
		.is_some();
	if valid {
		Ok(raw.to_string())
	} else {
		Err(format!("invalid time '{raw}', expected hh:mm"))
	}
}

fn color_from_hex(hex: &str) -> Option<Color> {
	let digits = hex.strip_prefix('#')?;
	if digits.len() != 6 {
		return None;
	}
	let value = u32::from_str_radix(digits, 16).ok()?;
	Some(Color::Rgb(
		(value >> 16) as u8,
		(value >> 8) as u8,
		value as u8,
	))
}

fn cell_text(text: &str, width: usize) -> String {
	let mut out = text.chars().take(width).collect::<String>();
	let used = out.chars().count();
	out.extend(std::iter::repeat(' ').take(width.saturating_sub(used)));
	out
}

fn border_style(focused: bool) -> Style {
	if focused {
		Style::default()
			.fg(FOCUSED_PANEL_BORDER_COLOR)
			.add_modifier(Modifier::BOLD)
	} else {
		Style::default().fg(INACTIVE_PANEL_BORDER_COLOR)
	}
}

#[derive(Debug, Clone)]
enum PromptOutcome {
	NextPrompt(PromptState),
	Select(SelectState),
	Done(String),
}

#[derive(Debug, Clone)]
enum SelectOutcome {
	NextPrompt(PromptState),
	NextSelect(SelectState),
	Done(String),
}

#[derive(Debug, Clone)]
struct PromptState {
	title: String,
	input: String,
	kind: PromptKind,
}

impl PromptState {
	fn new(title: impl Into<String>, kind: PromptKind) -> Self {
		Self {
			title: title.into(),
			input: String::new(),
			kind,
		}
	}
}

#[derive(Debug, Clone)]
struct SelectState {
	title: String,
	options: Vec<SelectOption>,
	selected: usize,
	kind: SelectKind,
}

impl SelectState {
	fn new(title: impl Into<String>, kind: SelectKind, options: Vec<SelectOption>) -> Self {
		Self {
			title: title.into(),
			options,
			selected: 0,
			kind,
		}
	}

	fn move_selection(&mut self, delta: i32) {
		if self.options.is_empty() {
			self.selected = 0;
			return;
		}

		if delta > 0 {
			self.selected = (self.selected + delta as usize).min(self.options.len() - 1);
		} else {
			self.selected = self.selected.saturating_sub(delta.unsigned_abs() as usize);
		}
	}

	fn selected_option(&self) -> Option<&SelectOption> {
		self.options.get(self.selected)
	}
}

#[derive(Debug, Clone)]
struct SelectOption {
	label: String,
	value: Option<String>,
	style: Style,
}

impl SelectOption {
	fn new(label: impl Into<String>, value: Option<String>, style: Style) -> Self {
		Self {
			label: label.into(),
			value,
			style,
		}
	}
}

/// Everything gathered so far while walking the add-treatment chain.
#[derive(Debug, Clone)]
struct TreatmentDraft {
	plan_id: String,
	medication: String,
	dose: String,
	unit: String,
	units_per_dose: u32,
	tolerance: Option<String>,
	from: Option<String>,
	to: Option<String>,
	frequency: Option<Frequency>,
}

impl TreatmentDraft {
	fn new(plan_id: String, medication: String) -> Self {
		Self {
			plan_id,
			medication,
			dose: String::new(),
			unit: "mg".to_string(),
			units_per_dose: 1,
			tolerance: None,
			from: None,
			to: None,
			frequency: None,
		}
	}
}

#[derive(Debug, Clone)]
enum PromptKind {
	UserNick {
		role: Role,
	},
	UserPassword {
		role: Role,
		nick: String,
	},
	PlanName {
		patient_id: String,
	},
	TreatmentMedication {
		plan_id: String,
	},
	TreatmentDose {
		draft: TreatmentDraft,
	},
	TreatmentUnitsPerDose {
		draft: TreatmentDraft,
	},
	TreatmentTolerance {
		draft: TreatmentDraft,
	},
	TreatmentFrom {
		draft: TreatmentDraft,
	},
	TreatmentTo {
		draft: TreatmentDraft,
	},
	HoursTime {
		plan_id: String,
		treatment_index: usize,
		shift: Shift,
	},
}

#[derive(Debug, Clone)]
enum SelectKind {
	NewUserRole,
	CatalogPick {
		draft: TreatmentDraft,
	},
	TreatmentUnit {
		draft: TreatmentDraft,
	},
	TreatmentFrequency {
		draft: TreatmentDraft,
	},
	TreatmentColor {
		draft: TreatmentDraft,
	},
	HoursShift {
		plan_id: String,
		treatment_index: usize,
	},
	DeleteTreatmentConfirm {
		plan_id: String,
		treatment_index: usize,
		medication: String,
	},
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FocusPane {
	Calendar,
	Explorer,
	Day,
}

impl FocusPane {
	fn next(self) -> Self {
		match self {
			FocusPane::Calendar => FocusPane::Explorer,
			FocusPane::Explorer => FocusPane::Day,
			FocusPane::Day => FocusPane::Calendar,
		}
	}

	fn prev(self) -> Self {
		match self {
			FocusPane::Calendar => FocusPane::Day,
			FocusPane::Explorer => FocusPane::Calendar,
			FocusPane::Day => FocusPane::Explorer,
		}
	}
}

#[derive(Debug, Clone)]
enum ExplorerMode {
	Patients,
	PatientPlans {
		patient_id: String,
		nick: String,
	},
}

#[derive(Debug, Clone)]
enum InputMode {
	Normal,
	Prompt(PromptState),
	Select(SelectState),
}

#[derive(Debug, Clone)]
struct App {
	focus: FocusPane,
	selected_day: NaiveDate,
	visible_month: NaiveDate,
	selected_plan: Option<String>,
	popup_day: Option<String>,
	day_index: usize,
	explorer_mode: ExplorerMode,
	explorer_index: usize,
	mode: InputMode,
	status: String,
	role: Role,
	acting_nick: String,
	theme: Theme,
}

impl App {
	fn new(acting_user: Option<&User>, registry: &Registry) -> Self {
		let today = Local::now().date_naive();
		let role = acting_user.map(|user| user.role).unwrap_or(Role::Superuser);
		let acting_nick = acting_user
			.map(|user| user.nick.clone())
			.unwrap_or_else(|| "staff".to_string());
		let theme = if role == Role::Patient {
			PATIENT_THEME
		} else {
			CLINIC_THEME
		};

		let (explorer_mode, selected_plan) = match acting_user {
			Some(user) if user.role == Role::Patient => (
				ExplorerMode::PatientPlans {
					patient_id: user.id.clone(),
					nick: user.nick.clone(),
				},
				registry.active_plan_id(&user.id),
			),
			_ => (ExplorerMode::Patients, None),
		};

		Self {
			focus: FocusPane::Explorer,
			selected_day: today,
			visible_month: first_day_of_month(today),
			selected_plan,
			popup_day: None,
			day_index: 0,
			explorer_mode,
			explorer_index: 0,
			mode: InputMode::Normal,
			status: "Ready".to_string(),
			role,
			acting_nick,
			theme,
		}
	}

	fn clamp_selection(&mut self, view: &ViewModel) {
		if view.day_rows.is_empty() {
			self.day_index = 0;
		} else {
			self.day_index = self.day_index.min(view.day_rows.len() - 1);
		}

		if view.explorer_rows.is_empty() {
			self.explorer_index = 0;
		} else {
			self.explorer_index = self.explorer_index.min(view.explorer_rows.len() - 1);
		}
	}

	fn shift_selected_day(&mut self, delta_days: i64) {
		self.selected_day += chrono::Duration::days(delta_days);
		self.visible_month = first_day_of_month(self.selected_day);
		self.day_index = 0;
		self.popup_day = None;
	}

	fn shift_selected_month(&mut self, delta_months: i32) {
		self.selected_day = shift_month(self.selected_day, delta_months);
		self.visible_month = first_day_of_month(self.selected_day);
		self.day_index = 0;
		self.popup_day = None;
	}

	fn move_day_selection(&mut self, delta: i32, view: &ViewModel) {
		if view.day_rows.is_empty() {
			self.day_index = 0;
			return;
		}

		if delta > 0 {
			self.day_index = (self.day_index + delta as usize).min(view.day_rows.len() - 1);
		} else {
			self.day_index = self.day_index.saturating_sub(delta.unsigned_abs() as usize);
		}
	}

	fn move_explorer_selection(&mut self, delta: i32, view: &ViewModel) {
		if view.explorer_rows.is_empty() {
			self.explorer_index = 0;
			return;
		}

		if delta > 0 {
			self.explorer_index = (self.explorer_index + delta as usize).min(view.explorer_rows.len() - 1);
		} else {
			self.explorer_index = self.explorer_index.saturating_sub(delta.unsigned_abs() as usize);
		}
	}

	fn selected_patient(&self, view: &ViewModel) -> Option<(String, String)> {
		if let ExplorerMode::PatientPlans { patient_id, nick } = &self.explorer_mode {
			return Some((patient_id.clone(), nick.clone()));
		}

		match self.selected_explorer_row_kind(view) {
			Some(ExplorerRowKind::Patient { user_id, nick }) => Some((user_id, nick)),
			_ => None,
		}
	}

	fn selected_treatment(&self, view: &ViewModel) -> Option<(String, usize)> {
		match self.focus {
			FocusPane::Explorer => match self.selected_explorer_row_kind(view) {
				Some(ExplorerRowKind::Treatment { plan_id, index }) => Some((plan_id, index)),
				_ => None,
			},
			FocusPane::Day => {
				let plan_id = self.selected_plan.clone()?;
				view.day_rows
					.get(self.day_index)
					.map(|row| (plan_id, row.treatment_index))
			}
			FocusPane::Calendar => None,
		}
	}

	fn selected_explorer_row_kind(&self, view: &ViewModel) -> Option<ExplorerRowKind> {
		view.explorer_rows
			.get(self.explorer_index)
			.map(|row| row.kind.clone())
	}
}

struct ViewModel {
	grid: MonthGrid,
	plan_name: Option<String>,
	plan_treatments: Vec<Treatment>,
	day_rows: Vec<DayTreatmentRow>,
	explorer_rows: Vec<ExplorerRow>,
}

#[derive(Clone)]
struct DayTreatmentRow {
	treatment_index: usize,
	title: String,
	frequency: String,
	hours: String,
	daily_total: Option<String>,
	confirmed: Option<String>,
	style: Style,
}

#[derive(Clone)]
struct ExplorerRow {
	line: Line<'static>,
	kind: ExplorerRowKind,
}

impl ExplorerRow {
	fn empty(text: impl Into<String>) -> Self {
		Self {
			line: Line::from(text.into()),
			kind: ExplorerRowKind::Empty,
		}
	}
}

#[derive(Debug, Clone)]
enum ExplorerRowKind {
	Empty,
	Patient {
		user_id: String,
		nick: String,
	},
	Plan {
		plan_id: String,
		name: String,
	},
	Treatment {
		plan_id: String,
		index: usize,
	},
}

pub fn print_confirmation_log(registry: &Registry, limit: usize) {
	for event in registry.events.iter().rev().take(limit) {
		let EventKind::DoseConfirmed {
			plan_id,
			treatment_index,
			date,
			time_label,
		} = &event.kind;

		let medication = registry
			.plan(plan_id)
			.and_then(|plan| plan.treatments.get(*treatment_index))
			.map(|treatment| treatment.medication.as_str())
			.unwrap_or("(removed treatment)");
		let plan_name = registry
			.plan(plan_id)
			.map(|plan| plan.name.as_str())
			.unwrap_or("(removed plan)");
		println!(
			"{} confirm {} | {} | {} at {}",
			event.timestamp.to_rfc3339(),
			plan_name,
			medication,
			date,
			time_label
		);
	}
}
