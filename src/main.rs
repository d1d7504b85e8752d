mod calendar;
mod domain;
mod files;
mod storage;
mod ui;

use std::error::Error;
use std::path::PathBuf;

use chrono::{Local, NaiveDate, Utc};
use clap::{Parser, Subcommand};

use crate::domain::{Frequency, Registry, Role, Treatment};
use crate::files::{recent_registries, remember_registry, resolve_registry_path};
use crate::storage::{load_registry, save_registry};
use crate::ui::{print_confirmation_log, run_dashboard};

#[derive(Debug, Parser)]
#[command(name = "mediplan", about = "Terminal-first medication plan tracker")]
struct Cli {
	#[arg(long)]
	file: Option<PathBuf>,
	#[arg(long)]
	user: Option<String>,
	#[command(subcommand)]
	command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
	Init,
	Dashboard,
	AddUser {
		#[arg(long)]
		nick: String,
		#[arg(long)]
		password: String,
		#[arg(long)]
		role: String,
	},
	AddPlan {
		#[arg(long)]
		patient: String,
		#[arg(long)]
		name: String,
	},
	AddTreatment {
		#[arg(long)]
		plan: String,
		#[arg(long)]
		medication: String,
		#[arg(long)]
		dose: Option<String>,
		#[arg(long)]
		unit: Option<String>,
		#[arg(long, default_value_t = 1)]
		units_per_dose: u32,
		#[arg(long)]
		tolerance: Option<String>,
		#[arg(long)]
		from: Option<String>,
		#[arg(long)]
		to: Option<String>,
		#[arg(long)]
		frequency: Option<String>,
		#[arg(long)]
		color: Option<String>,
	},
	ListUsers,
	ListPlans {
		#[arg(long)]
		patient: Option<String>,
	},
	Agenda {
		#[arg(long)]
		plan: String,
	},
	Confirm {
		#[arg(long)]
		plan: String,
		#[arg(long)]
		treatment: usize,
		#[arg(long)]
		date: String,
		#[arg(long)]
		time: Option<String>,
	},
	Confirmations {
		#[arg(long, default_value_t = 20)]
		limit: usize,
	},
	Registries {
		#[arg(long, default_value_t = 20)]
		limit: usize,
	},
}

fn main() {
	if let Err(err) = run() {
		eprintln!("error: {err}");
		std::process::exit(1);
	}
}

fn run() -> Result<(), Box<dyn Error>> {
	let cli = Cli::parse();

	if let Some(Command::Registries { limit }) = &cli.command {
		print_recent_registries(*limit)?;
		return Ok(());
	}

	let registry_path = resolve_registry_path(cli.file)?;
	let mut registry = load_registry(&registry_path)?;
	if let Err(err) = remember_registry(&registry_path) {
		eprintln!("warning: failed to store recent registry: {err}");
	}

	let acting_nick = cli.user.clone().unwrap_or_else(|| "staff".to_string());

	match cli.command.unwrap_or(Command::Dashboard) {
		Command::Init => {
			save_registry(&registry_path, &registry)?;
			println!("initialized registry at {}", registry_path.display());
		}
		Command::Dashboard => {
			let acting_user = match &cli.user {
				Some(nick) => {
					let user = registry.user_by_nick(nick).cloned();
					if user.is_none() {
						eprintln!("warning: unknown user '{nick}', opening the staff view");
					}
					user
				}
				None => None,
			};
			run_dashboard(&mut registry, &registry_path, acting_user)?;
		}
		Command::AddUser { nick, password, role } => {
			let role = Role::from_flag(&role)
				.ok_or_else(|| format!("invalid role '{role}', expected superuser|doctor|patient"))?;
			let user_id = registry.add_user(nick, password, role)?;
			save_registry(&registry_path, &registry)?;
			println!("created {} {user_id}", role.label());
		}
		Command::AddPlan { patient, name } => {
			let patient_id = registry
				.user_by_nick(&patient)
				.map(|user| user.id.clone())
				.ok_or_else(|| format!("no user with nick '{patient}'"))?;
			let plan_id = registry.add_plan(&patient_id, name, acting_nick, Utc::now())?;
			save_registry(&registry_path, &registry)?;
			println!("created plan {plan_id}");
		}
		Command::AddTreatment {
			plan,
			medication,
			dose,
			unit,
			units_per_dose,
			tolerance,
			from,
			to,
			frequency,
			color,
		} => {
			let mut treatment = Treatment::new(medication);
			treatment.dose = dose.unwrap_or_default();
			if let Some(unit) = unit {
				treatment.unit = unit;
			}
			treatment.units_per_dose = units_per_dose;
			treatment.tolerance = tolerance;
			treatment.from = parse_date_flag(from, "--from")?;
			treatment.to = parse_date_flag(to, "--to")?;
			treatment.frequency = match frequency {
				Some(raw) => Some(Frequency::from_flag(&raw).ok_or_else(|| {
					format!(
						"invalid frequency '{raw}', expected every-8h|every-12h|every-24h|single-dose"
					)
				})?),
				None => None,
			};
			treatment.color = color;

			let index = registry.add_treatment(&plan, treatment)?;
			registry.register_medications(&plan);
			save_registry(&registry_path, &registry)?;
			println!("added treatment {index} to plan {plan}");
		}
		Command::ListUsers => {
			print_users(&registry);
		}
		Command::ListPlans { patient } => {
			print_plans(&registry, patient.as_deref())?;
		}
		Command::Agenda { plan } => {
			print_agenda(&registry, &plan)?;
		}
		Command::Confirm {
			plan,
			treatment,
			date,
			time,
		} => {
			let time_label = time.unwrap_or_else(|| Local::now().format("%H:%M").to_string());
			registry.record_confirmation(&plan, treatment, &date, time_label, Utc::now())?;
			save_registry(&registry_path, &registry)?;
			println!("confirmed treatment {treatment} of plan {plan} for {date}");
		}
		Command::Confirmations { limit } => {
			print_confirmation_log(&registry, limit);
		}
		Command::Registries { .. } => {}
	}

	Ok(())
}

fn print_recent_registries(limit: usize) -> Result<(), Box<dyn Error>> {
	let rows = recent_registries(limit)?;
	if rows.is_empty() {
		println!("no recent registries");
		return Ok(());
	}

	for (index, path) in rows.iter().enumerate() {
		println!("{:>2}. {}", index + 1, path.display());
	}

	Ok(())
}

fn parse_date_flag(value: Option<String>, flag: &str) -> Result<Option<String>, Box<dyn Error>> {
	match value {
		None => Ok(None),
		Some(raw) => {
			NaiveDate::parse_from_str(&raw, "%Y-%m-%d")
				.map_err(|_| format!("invalid {flag} date '{raw}', expected YYYY-MM-DD"))?;
			Ok(Some(raw))
		}
	}
}

fn print_users(registry: &Registry) {
	if registry.header.users.is_empty() {
		println!("no users yet");
		return;
	}

	for user in &registry.header.users {
		println!("{} | {} | {}", user.id, user.role.label(), user.nick);
	}
}

fn print_plans(registry: &Registry, patient: Option<&str>) -> Result<(), Box<dyn Error>> {
	let plans = match patient {
		Some(nick) => {
			let patient_id = registry
				.user_by_nick(nick)
				.map(|user| user.id.clone())
				.ok_or_else(|| format!("no user with nick '{nick}'"))?;
			registry.patient_plans(&patient_id)
		}
		None => registry.header.plans.iter().collect(),
	};

	if plans.is_empty() {
		println!("no plans yet");
		return Ok(());
	}

	for plan in plans {
		let patient_nick = registry
			.user(&plan.patient_id)
			.map(|user| user.nick.as_str())
			.unwrap_or("(unknown patient)");
		let active = registry.active_plan_id(&plan.patient_id).as_deref() == Some(plan.id.as_str());
		println!(
			"{} | {} | {} | by {} | {} treatment(s){}",
			plan.id,
			patient_nick,
			plan.name,
			plan.created_by,
			plan.treatments.len(),
			if active { " | active" } else { "" }
		);
	}

	Ok(())
}

fn print_agenda(registry: &Registry, plan_id: &str) -> Result<(), Box<dyn Error>> {
	let plan = registry
		.plan(plan_id)
		.ok_or_else(|| format!("plan not found: {plan_id}"))?;

	let Some((first, last)) = registry.plan_date_span(plan_id) else {
		println!("no dated treatments in plan {}", plan.name);
		return Ok(());
	};

	let mut day = NaiveDate::parse_from_str(&first, "%Y-%m-%d")?;
	let last = NaiveDate::parse_from_str(&last, "%Y-%m-%d")?;
	let confirmations = registry.confirmations();

	println!("agenda for {} ({first} to {last})", plan.name);
	while day <= last {
		let date = day.format("%Y-%m-%d").to_string();
		println!("{date}:");

		let rows = registry.treatments_on(plan_id, &date);
		if rows.is_empty() {
			println!("  no medication");
		} else {
			for (index, treatment) in rows {
				let frequency = treatment
					.frequency
					.map(|frequency| frequency.label())
					.unwrap_or("-");
				let confirmed = confirmations
					.time_for(plan_id, index, &date)
					.map(|time| format!(" | confirmed {time}"))
					.unwrap_or_default();
				println!(
					"  {} | {} {} | {}{}",
					treatment.medication, treatment.dose, treatment.unit, frequency, confirmed
				);
			}
		}

		day = day.succ_opt().expect("next day should exist");
	}

	Ok(())
}
