use std::collections::HashMap;

use chrono::{DateTime, NaiveDate, Utc};
use rand::{Rng, distributions::Alphanumeric, thread_rng};
use serde::{Deserialize, Serialize};

const ID_LEN: usize = 8;

pub const COLOR_PALETTE: [&str; 10] = [
    "#FF8A80", "#FFD180", "#8C9EFF", "#80D8FF", "#CCFF90",
    "#A7FFEB", "#FFB74D", "#BA68C8", "#4DB6AC", "#F06292",
];

pub const FALLBACK_COLOR: &str = "#999999";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Superuser,
    Doctor,
    Patient,
}

impl Role {
    pub fn label(self) -> &'static str {
        match self {
            Role::Superuser => "superuser",
            Role::Doctor => "doctor",
            Role::Patient => "patient",
        }
    }

    pub fn from_flag(raw: &str) -> Option<Self> {
        match raw {
            "superuser" => Some(Role::Superuser),
            "doctor" => Some(Role::Doctor),
            "patient" => Some(Role::Patient),
            _ => None,
        }
    }

    pub fn can_edit(self) -> bool {
        matches!(self, Role::Superuser | Role::Doctor)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub nick: String,
    pub password: String,
    pub role: Role,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Frequency {
    #[serde(rename = "every-8h")]
    Every8h,
    #[serde(rename = "every-12h")]
    Every12h,
    #[serde(rename = "every-24h")]
    Every24h,
    #[serde(rename = "single-dose")]
    SingleDose,
}

impl Frequency {
    pub const ALL: [Frequency; 4] = [
        Frequency::Every8h,
        Frequency::Every12h,
        Frequency::Every24h,
        Frequency::SingleDose,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Frequency::Every8h => "every 8h",
            Frequency::Every12h => "every 12h",
            Frequency::Every24h => "every 24h",
            Frequency::SingleDose => "single dose",
        }
    }

    pub fn from_flag(raw: &str) -> Option<Self> {
        match raw {
            "every-8h" => Some(Frequency::Every8h),
            "every-12h" => Some(Frequency::Every12h),
            "every-24h" => Some(Frequency::Every24h),
            "single-dose" => Some(Frequency::SingleDose),
            _ => None,
        }
    }

    pub fn times_per_day(self) -> u32 {
        match self {
            Frequency::Every8h => 3,
            Frequency::Every12h => 2,
            Frequency::Every24h | Frequency::SingleDose => 1,
        }
    }

    /// Which shifts of the day take a dose under this frequency.
    pub fn shifts(self) -> [bool; 3] {
        match self {
            Frequency::Every8h => [true, true, true],
            Frequency::Every12h => [true, false, true],
            Frequency::Every24h | Frequency::SingleDose => [true, false, false],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shift {
    Morning,
    Afternoon,
    Evening,
}

impl Shift {
    pub const ALL: [Shift; 3] = [Shift::Morning, Shift::Afternoon, Shift::Evening];

    pub fn label(self) -> &'static str {
        match self {
            Shift::Morning => "morning",
            Shift::Afternoon => "afternoon",
            Shift::Evening => "evening",
        }
    }

    pub fn index(self) -> usize {
        match self {
            Shift::Morning => 0,
            Shift::Afternoon => 1,
            Shift::Evening => 2,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShiftHours {
    #[serde(default)]
    pub morning: Option<String>,
    #[serde(default)]
    pub afternoon: Option<String>,
    #[serde(default)]
    pub evening: Option<String>,
}

impl ShiftHours {
    pub fn get(&self, shift: Shift) -> Option<&str> {
        match shift {
            Shift::Morning => self.morning.as_deref(),
            Shift::Afternoon => self.afternoon.as_deref(),
            Shift::Evening => self.evening.as_deref(),
        }
    }

    pub fn set(&mut self, shift: Shift, value: Option<String>) {
        match shift {
            Shift::Morning => self.morning = value,
            Shift::Afternoon => self.afternoon = value,
            Shift::Evening => self.evening = value,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Treatment {
    #[serde(default)]
    pub medication: String,
    #[serde(default)]
    pub dose: String,
    #[serde(default)]
    pub unit: String,
    #[serde(default = "default_units_per_dose")]
    pub units_per_dose: u32,
    #[serde(default)]
    pub tolerance: Option<String>,
    #[serde(default)]
    pub frequency: Option<Frequency>,
    #[serde(default)]
    pub from: Option<String>,
    #[serde(default)]
    pub to: Option<String>,
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default)]
    pub hours: ShiftHours,
}

fn default_units_per_dose() -> u32 {
    1
}

impl Treatment {
    pub fn new(medication: impl Into<String>) -> Self {
        Self {
            medication: medication.into(),
            dose: String::new(),
            unit: "mg".to_string(),
            units_per_dose: 1,
            tolerance: None,
            frequency: None,
            from: None,
            to: None,
            color: None,
            hours: ShiftHours::default(),
        }
    }

    /// Day membership by lexicographic comparison of `YYYY-MM-DD` strings.
    /// Missing or empty bounds never match; an inverted range matches no day.
    pub fn is_active_on(&self, day: &str) -> bool {
        match (self.from.as_deref(), self.to.as_deref()) {
            (Some(from), Some(to)) if !from.is_empty() && !to.is_empty() => {
                from <= day && day <= to
            }
            _ => false,
        }
    }

    pub fn shift_enabled(&self, shift: Shift) -> bool {
        self.frequency
            .map(|frequency| frequency.shifts()[shift.index()])
            .unwrap_or(false)
    }

    /// Total daily intake, e.g. "1200.00 mg/day", when the dose is numeric
    /// and a frequency is set.
    pub fn daily_dose_label(&self) -> Option<String> {
        let dose = self.dose.trim().parse::<f64>().ok()?;
        let frequency = self.frequency?;
        if dose == 0.0 || self.units_per_dose == 0 {
            return None;
        }

        let total = dose * self.units_per_dose as f64 * frequency.times_per_day() as f64;
        Some(format!("{:.2} {}/day", total, self.unit))
    }

    pub fn bar_label(&self) -> String {
        let frequency = self
            .frequency
            .map(|frequency| frequency.label())
            .unwrap_or("");
        format!("{} {} {}", self.medication, self.dose, frequency)
            .trim()
            .to_string()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Plan {
    pub id: String,
    pub patient_id: String,
    pub name: String,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub treatments: Vec<Treatment>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogEntry {
    pub name: String,
    #[serde(default)]
    pub dose: String,
    #[serde(default)]
    pub unit: String,
    #[serde(default)]
    pub tolerance: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistryHeader {
    pub schema_version: u32,
    pub created_at: DateTime<Utc>,
    pub users: Vec<User>,
    pub plans: Vec<Plan>,
    #[serde(default)]
    pub catalog: Vec<CatalogEntry>,
}

impl RegistryHeader {
    pub fn new() -> Self {
        Self {
            schema_version: 1,
            created_at: Utc::now(),
            users: Vec::new(),
            plans: Vec::new(),
            catalog: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EventKind {
    DoseConfirmed {
        plan_id: String,
        treatment_index: usize,
        date: String,
        time_label: String,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CareEvent {
    pub timestamp: DateTime<Utc>,
    #[serde(flatten)]
    pub kind: EventKind,
}

impl CareEvent {
    pub fn dose_confirmed(
        plan_id: impl Into<String>,
        treatment_index: usize,
        date: impl Into<String>,
        time_label: impl Into<String>,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            timestamp,
            kind: EventKind::DoseConfirmed {
                plan_id: plan_id.into(),
                treatment_index,
                date: date.into(),
                time_label: time_label.into(),
            },
        }
    }
}

#[derive(Debug, Clone)]
pub struct Registry {
    pub header: RegistryHeader,
    pub events: Vec<CareEvent>,
}

impl Registry {
    pub fn new() -> Self {
        Self {
            header: RegistryHeader::new(),
            events: Vec::new(),
        }
    }

    pub fn user(&self, id: &str) -> Option<&User> {
        self.header.users.iter().find(|user| user.id == id)
    }

    pub fn user_by_nick(&self, nick: &str) -> Option<&User> {
        self.header.users.iter().find(|user| user.nick == nick)
    }

    pub fn plan(&self, id: &str) -> Option<&Plan> {
        self.header.plans.iter().find(|plan| plan.id == id)
    }

    pub fn plan_mut(&mut self, id: &str) -> Option<&mut Plan> {
        self.header.plans.iter_mut().find(|plan| plan.id == id)
    }

    /// A patient's plans, oldest first. The last one is their active plan.
    pub fn patient_plans(&self, patient_id: &str) -> Vec<&Plan> {
        let mut plans = self
            .header
            .plans
            .iter()
            .filter(|plan| plan.patient_id == patient_id)
            .collect::<Vec<_>>();
        plans.sort_by(|left, right| {
            left.created_at
                .cmp(&right.created_at)
                .then_with(|| left.id.cmp(&right.id))
        });
        plans
    }

    pub fn active_plan_id(&self, patient_id: &str) -> Option<String> {
        self.patient_plans(patient_id)
            .last()
            .map(|plan| plan.id.clone())
    }

    pub fn add_user(
        &mut self,
        nick: String,
        password: String,
        role: Role,
    ) -> Result<String, String> {
        if nick.trim().is_empty() {
            return Err("nick must not be empty".to_string());
        }
        if self.user_by_nick(&nick).is_some() {
            return Err(format!("a user with nick '{nick}' already exists"));
        }

        let id = generate_id();
        self.header.users.push(User {
            id: id.clone(),
            nick,
            password,
            role,
        });
        Ok(id)
    }

    pub fn add_plan(
        &mut self,
        patient_id: &str,
        name: String,
        created_by: String,
        created_at: DateTime<Utc>,
    ) -> Result<String, String> {
        let patient = self
            .user(patient_id)
            .ok_or_else(|| format!("patient not found: {patient_id}"))?;
        if patient.role != Role::Patient {
            return Err(format!("user is not a patient: {}", patient.nick));
        }
        if name.trim().is_empty() {
            return Err("plan name must not be empty".to_string());
        }

        let id = generate_id();
        self.header.plans.push(Plan {
            id: id.clone(),
            patient_id: patient_id.to_string(),
            name,
            created_by,
            created_at,
            treatments: Vec::new(),
        });
        Ok(id)
    }

    /// First palette color not yet used by the plan's treatments.
    pub fn next_color(&self, plan_id: &str) -> String {
        let used = self
            .plan(plan_id)
            .map(|plan| {
                plan.treatments
                    .iter()
                    .filter_map(|treatment| treatment.color.clone())
                    .collect::<Vec<_>>()
            })
            .unwrap_or_default();

        COLOR_PALETTE
            .iter()
            .find(|color| !used.iter().any(|c| c == *color))
            .map(|color| color.to_string())
            .unwrap_or_else(|| FALLBACK_COLOR.to_string())
    }

    pub fn add_treatment(
        &mut self,
        plan_id: &str,
        mut treatment: Treatment,
    ) -> Result<usize, String> {
        if treatment.color.is_none() {
            treatment.color = Some(self.next_color(plan_id));
        }

        let plan = self
            .plan_mut(plan_id)
            .ok_or_else(|| format!("plan not found: {plan_id}"))?;
        plan.treatments.push(treatment);
        Ok(plan.treatments.len() - 1)
    }

    pub fn remove_treatment(&mut self, plan_id: &str, index: usize) -> Result<(), String> {
        let plan = self
            .plan_mut(plan_id)
            .ok_or_else(|| format!("plan not found: {plan_id}"))?;
        if index >= plan.treatments.len() {
            return Err(format!("no treatment at index {index}"));
        }
        plan.treatments.remove(index);
        Ok(())
    }

    pub fn set_treatment_hours(
        &mut self,
        plan_id: &str,
        index: usize,
        shift: Shift,
        value: Option<String>,
    ) -> Result<(), String> {
        let plan = self
            .plan_mut(plan_id)
            .ok_or_else(|| format!("plan not found: {plan_id}"))?;
        let treatment = plan
            .treatments
            .get_mut(index)
            .ok_or_else(|| format!("no treatment at index {index}"))?;
        if !treatment.shift_enabled(shift) {
            return Err(format!(
                "{} takes no {} dose under its frequency",
                treatment.medication,
                shift.label()
            ));
        }

        treatment.hours.set(shift, value);
        Ok(())
    }

    /// Catalog entries matching a partially typed medication name. Nothing
    /// is suggested below two characters, mirroring the entry form.
    pub fn suggestions(&self, text: &str) -> Vec<&CatalogEntry> {
        let needle = text.trim().to_lowercase();
        if needle.len() < 2 {
            return Vec::new();
        }

        self.header
            .catalog
            .iter()
            .filter(|entry| entry.name.to_lowercase().contains(&needle))
            .collect()
    }

    /// Register any plan medication the catalog does not know yet, so future
    /// entry forms can autocomplete it.
    pub fn register_medications(&mut self, plan_id: &str) {
        let new_entries = match self.plan(plan_id) {
            Some(plan) => plan
                .treatments
                .iter()
                .filter(|treatment| !treatment.medication.trim().is_empty())
                .filter(|treatment| {
                    !self.header.catalog.iter().any(|entry| {
                        entry.name.to_lowercase() == treatment.medication.to_lowercase()
                    })
                })
                .map(|treatment| CatalogEntry {
                    name: treatment.medication.clone(),
                    dose: treatment.dose.clone(),
                    unit: treatment.unit.clone(),
                    tolerance: treatment.tolerance.clone(),
                })
                .collect::<Vec<_>>(),
            None => Vec::new(),
        };

        for entry in new_entries {
            if !self
                .header
                .catalog
                .iter()
                .any(|existing| existing.name.to_lowercase() == entry.name.to_lowercase())
            {
                self.header.catalog.push(entry);
            }
        }
    }

    pub fn record_confirmation(
        &mut self,
        plan_id: &str,
        treatment_index: usize,
        date: &str,
        time_label: String,
        timestamp: DateTime<Utc>,
    ) -> Result<(), String> {
        NaiveDate::parse_from_str(date, "%Y-%m-%d")
            .map_err(|_| format!("invalid date '{date}', expected YYYY-MM-DD"))?;

        let plan = self
            .plan(plan_id)
            .ok_or_else(|| format!("plan not found: {plan_id}"))?;
        let treatment = plan
            .treatments
            .get(treatment_index)
            .ok_or_else(|| format!("no treatment at index {treatment_index}"))?;
        if !treatment.is_active_on(date) {
            return Err(format!(
                "{} is not scheduled on {date}",
                treatment.medication
            ));
        }

        let log = self.confirmations();
        if log.time_for(plan_id, treatment_index, date).is_some() {
            return Err(format!(
                "{} already confirmed for {date}",
                treatment.medication
            ));
        }

        self.events.push(CareEvent::dose_confirmed(
            plan_id,
            treatment_index,
            date,
            time_label,
            timestamp,
        ));
        Ok(())
    }

    /// Fold the event log into a lookup of confirmed doses. The first
    /// confirmation for a (plan, treatment, date) wins.
    pub fn confirmations(&self) -> ConfirmationLog {
        let mut events = self.events.clone();
        events.sort_by_key(|event| event.timestamp);

        let mut confirmed = HashMap::new();
        for event in events {
            let EventKind::DoseConfirmed {
                plan_id,
                treatment_index,
                date,
                time_label,
            } = event.kind;
            confirmed
                .entry((plan_id, treatment_index, date))
                .or_insert(time_label);
        }

        ConfirmationLog { confirmed }
    }

    /// Treatments active on a day, with their index in the plan.
    pub fn treatments_on<'a>(&'a self, plan_id: &str, date: &str) -> Vec<(usize, &'a Treatment)> {
        self.plan(plan_id)
            .map(|plan| {
                plan.treatments
                    .iter()
                    .enumerate()
                    .filter(|(_, treatment)| treatment.is_active_on(date))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// The span a day-by-day agenda covers: earliest to latest of the plan's
    /// set date bounds, compared as strings. Fewer than two set bounds give
    /// no span.
    pub fn plan_date_span(&self, plan_id: &str) -> Option<(String, String)> {
        let mut bounds = self
            .plan(plan_id)?
            .treatments
            .iter()
            .flat_map(|treatment| [treatment.from.clone(), treatment.to.clone()])
            .flatten()
            .filter(|bound| !bound.is_empty())
            .collect::<Vec<_>>();
        if bounds.len() < 2 {
            return None;
        }

        bounds.sort();
        let first = bounds.first().cloned()?;
        let last = bounds.last().cloned()?;
        Some((first, last))
    }
}

#[derive(Debug, Clone)]
pub struct ConfirmationLog {
    confirmed: HashMap<(String, usize, String), String>,
}

impl ConfirmationLog {
    pub fn time_for(&self, plan_id: &str, treatment_index: usize, date: &str) -> Option<&str> {
        self.confirmed
            .get(&(plan_id.to_string(), treatment_index, date.to_string()))
            .map(String::as_str)
    }
}

pub fn generate_id() -> String {
    thread_rng()
        .sample_iter(&Alphanumeric)
        .take(ID_LEN)
        .map(char::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::{COLOR_PALETTE, Frequency, Registry, Role, Shift, Treatment};

    fn registry_with_patient() -> (Registry, String) {
        let mut registry = Registry::new();
        let patient_id = registry
            .add_user("ana".to_string(), "secret".to_string(), Role::Patient)
            .expect("patient should be created");
        (registry, patient_id)
    }

    fn plan_with_treatment(registry: &mut Registry, patient_id: &str) -> String {
        let plan_id = registry
            .add_plan(
                patient_id,
                "Post-op".to_string(),
                "dr.lopez".to_string(),
                Utc.with_ymd_and_hms(2025, 6, 1, 9, 0, 0).unwrap(),
            )
            .expect("plan should be created");

        let mut treatment = Treatment::new("Amoxicillin");
        treatment.dose = "500".to_string();
        treatment.frequency = Some(Frequency::Every8h);
        treatment.from = Some("2025-06-01".to_string());
        treatment.to = Some("2025-06-10".to_string());
        registry
            .add_treatment(&plan_id, treatment)
            .expect("treatment should be added");
        plan_id
    }

    #[test]
    fn rejects_duplicate_nicks() {
        let (mut registry, _) = registry_with_patient();
        let err = registry
            .add_user("ana".to_string(), "other".to_string(), Role::Doctor)
            .unwrap_err();
        assert!(err.contains("already exists"));
    }

    #[test]
    fn plans_require_a_patient() {
        let mut registry = Registry::new();
        let doctor_id = registry
            .add_user("dr.lopez".to_string(), "secret".to_string(), Role::Doctor)
            .expect("doctor should be created");

        let err = registry
            .add_plan(
                &doctor_id,
                "Post-op".to_string(),
                "root".to_string(),
                Utc::now(),
            )
            .unwrap_err();
        assert!(err.contains("not a patient"));
    }

    #[test]
    fn newest_plan_is_active() {
        let (mut registry, patient_id) = registry_with_patient();
        let first = registry
            .add_plan(
                &patient_id,
                "Initial".to_string(),
                "dr.lopez".to_string(),
                Utc.with_ymd_and_hms(2025, 1, 1, 8, 0, 0).unwrap(),
            )
            .expect("plan should be created");
        let second = registry
            .add_plan(
                &patient_id,
                "Follow-up".to_string(),
                "dr.lopez".to_string(),
                Utc.with_ymd_and_hms(2025, 3, 1, 8, 0, 0).unwrap(),
            )
            .expect("plan should be created");

        assert_eq!(registry.active_plan_id(&patient_id), Some(second));
        assert_eq!(registry.patient_plans(&patient_id)[0].id, first);
    }

    #[test]
    fn treatments_take_the_first_unused_color() {
        let (mut registry, patient_id) = registry_with_patient();
        let plan_id = plan_with_treatment(&mut registry, &patient_id);
        assert_eq!(
            registry.plan(&plan_id).unwrap().treatments[0].color.as_deref(),
            Some(COLOR_PALETTE[0])
        );

        let index = registry
            .add_treatment(&plan_id, Treatment::new("Omeprazole"))
            .expect("treatment should be added");
        assert_eq!(
            registry.plan(&plan_id).unwrap().treatments[index]
                .color
                .as_deref(),
            Some(COLOR_PALETTE[1])
        );
    }

    #[test]
    fn confirmations_are_recorded_once() {
        let (mut registry, patient_id) = registry_with_patient();
        let plan_id = plan_with_treatment(&mut registry, &patient_id);
        let stamp = Utc.with_ymd_and_hms(2025, 6, 3, 8, 30, 0).unwrap();

        registry
            .record_confirmation(&plan_id, 0, "2025-06-03", "08:30".to_string(), stamp)
            .expect("confirmation should be recorded");
        let err = registry
            .record_confirmation(&plan_id, 0, "2025-06-03", "09:00".to_string(), stamp)
            .unwrap_err();
        assert!(err.contains("already confirmed"));

        let log = registry.confirmations();
        assert_eq!(log.time_for(&plan_id, 0, "2025-06-03"), Some("08:30"));
        assert_eq!(log.time_for(&plan_id, 0, "2025-06-04"), None);
    }

    #[test]
    fn confirmation_requires_a_scheduled_day() {
        let (mut registry, patient_id) = registry_with_patient();
        let plan_id = plan_with_treatment(&mut registry, &patient_id);

        let err = registry
            .record_confirmation(&plan_id, 0, "2025-07-01", "08:30".to_string(), Utc::now())
            .unwrap_err();
        assert!(err.contains("not scheduled"));

        let err = registry
            .record_confirmation(&plan_id, 0, "june 3rd", "08:30".to_string(), Utc::now())
            .unwrap_err();
        assert!(err.contains("invalid date"));
    }

    #[test]
    fn daily_dose_multiplies_units_and_frequency() {
        let mut treatment = Treatment::new("Amoxicillin");
        treatment.dose = "500".to_string();
        treatment.unit = "mg".to_string();
        treatment.units_per_dose = 2;
        treatment.frequency = Some(Frequency::Every8h);
        assert_eq!(
            treatment.daily_dose_label().as_deref(),
            Some("3000.00 mg/day")
        );

        treatment.dose = "one pill".to_string();
        assert_eq!(treatment.daily_dose_label(), None);
    }

    #[test]
    fn shift_mask_follows_frequency() {
        let mut treatment = Treatment::new("Insulin");
        treatment.frequency = Some(Frequency::Every12h);
        assert!(treatment.shift_enabled(Shift::Morning));
        assert!(!treatment.shift_enabled(Shift::Afternoon));
        assert!(treatment.shift_enabled(Shift::Evening));

        treatment.frequency = None;
        assert!(!treatment.shift_enabled(Shift::Morning));
    }

    #[test]
    fn hours_only_settable_on_enabled_shifts() {
        let (mut registry, patient_id) = registry_with_patient();
        let plan_id = plan_with_treatment(&mut registry, &patient_id);

        registry
            .set_treatment_hours(&plan_id, 0, Shift::Evening, Some("22:00".to_string()))
            .expect("every-8h takes an evening dose");

        let mut single = Treatment::new("Vaccine");
        single.frequency = Some(Frequency::SingleDose);
        let index = registry
            .add_treatment(&plan_id, single)
            .expect("treatment should be added");
        let err = registry
            .set_treatment_hours(&plan_id, index, Shift::Evening, Some("22:00".to_string()))
            .unwrap_err();
        assert!(err.contains("no evening dose"));
    }

    #[test]
    fn suggestions_need_two_characters_and_match_anywhere() {
        let (mut registry, patient_id) = registry_with_patient();
        let plan_id = plan_with_treatment(&mut registry, &patient_id);
        registry.register_medications(&plan_id);

        assert!(registry.suggestions("a").is_empty());
        assert_eq!(registry.suggestions("moxi").len(), 1);
        assert_eq!(registry.suggestions("AMOX").len(), 1);
        assert!(registry.suggestions("ibupro").is_empty());
    }

    #[test]
    fn register_medications_skips_known_and_blank_names() {
        let (mut registry, patient_id) = registry_with_patient();
        let plan_id = plan_with_treatment(&mut registry, &patient_id);
        registry
            .add_treatment(&plan_id, Treatment::new(""))
            .expect("treatment should be added");
        registry
            .add_treatment(&plan_id, Treatment::new("amoxicillin"))
            .expect("treatment should be added");

        registry.register_medications(&plan_id);
        registry.register_medications(&plan_id);
        assert_eq!(registry.header.catalog.len(), 1);
        assert_eq!(registry.header.catalog[0].name, "Amoxicillin");
    }

    #[test]
    fn agenda_span_needs_two_set_bounds() {
        let (mut registry, patient_id) = registry_with_patient();
        let plan_id = plan_with_treatment(&mut registry, &patient_id);

        assert_eq!(
            registry.plan_date_span(&plan_id),
            Some(("2025-06-01".to_string(), "2025-06-10".to_string()))
        );

        let empty_plan = registry
            .add_plan(
                &patient_id,
                "Empty".to_string(),
                "dr.lopez".to_string(),
                Utc::now(),
            )
            .expect("plan should be created");
        let mut half_bounded = Treatment::new("Iron");
        half_bounded.from = Some("2025-06-01".to_string());
        registry
            .add_treatment(&empty_plan, half_bounded)
            .expect("treatment should be added");
        assert_eq!(registry.plan_date_span(&empty_plan), None);
    }

    #[test]
    fn active_day_test_handles_edges() {
        let mut treatment = Treatment::new("Amoxicillin");
        treatment.from = Some("2025-06-01".to_string());
        treatment.to = Some("2025-06-10".to_string());

        assert!(treatment.is_active_on("2025-06-01"));
        assert!(treatment.is_active_on("2025-06-10"));
        assert!(!treatment.is_active_on("2025-05-31"));
        assert!(!treatment.is_active_on("2025-06-11"));
    }
}
