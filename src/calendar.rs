use std::collections::HashSet;

use chrono::{Datelike, Duration, NaiveDate, Weekday};

use crate::domain::Treatment;

pub const DAYS_PER_WEEK: usize = 7;

#[derive(Debug, Clone)]
pub struct GridOptions {
    pub show_holidays: bool,
    pub holidays: HashSet<NaiveDate>,
    pub today: NaiveDate,
}

impl GridOptions {
    pub fn new(show_holidays: bool, holidays: HashSet<NaiveDate>, today: NaiveDate) -> Self {
        Self {
            show_holidays,
            holidays,
            today,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DayEntry {
    pub treatment_index: usize,
    pub is_start: bool,
    pub is_end: bool,
    pub lane: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GridDay {
    pub date: NaiveDate,
    pub date_string: String,
    pub in_month: bool,
    pub is_today: bool,
    pub is_weekend: bool,
    pub is_holiday: bool,
    pub entries: Vec<DayEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GridWeek {
    pub days: Vec<GridDay>,
    pub lane_count: usize,
    pub max_concurrency: usize,
}

impl GridWeek {
    /// Vertical room a renderer needs for this row: `base` covers the day
    /// number and the first bar, each additional concurrent bar adds
    /// `lane_height`.
    pub fn row_extent(&self, base: u16, lane_height: u16) -> u16 {
        base + self.max_concurrency.saturating_sub(1) as u16 * lane_height
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonthGrid {
    pub month: NaiveDate,
    pub weeks: Vec<GridWeek>,
}

/// Lay out one calendar month of treatment bars.
///
/// The window runs from the Monday on or before the 1st to the Sunday on or
/// after the last day of `visible_month`'s month, split into Monday-first
/// weeks. A treatment is active on a day when `from <= day <= to` compared
/// as `YYYY-MM-DD` strings; missing, empty, or inverted bounds make it
/// active nowhere. The function is total and touches no clock: `today`
/// comes in through `options`.
pub fn build_month_grid(
    visible_month: NaiveDate,
    treatments: &[Treatment],
    options: &GridOptions,
) -> MonthGrid {
    let month_first = first_day_of_month(visible_month);
    let month_last = last_day_of_month(visible_month);
    let window_start = start_of_week(month_first);
    let window_end = end_of_week(month_last);

    let mut weeks = Vec::new();
    let mut week_start = window_start;
    while week_start <= window_end {
        weeks.push(build_week(week_start, month_first, treatments, options));
        week_start += Duration::days(DAYS_PER_WEEK as i64);
    }

    MonthGrid {
        month: month_first,
        weeks,
    }
}

fn build_week(
    week_start: NaiveDate,
    month_first: NaiveDate,
    treatments: &[Treatment],
    options: &GridOptions,
) -> GridWeek {
    let day_strings = (0..DAYS_PER_WEEK)
        .map(|offset| {
            (week_start + Duration::days(offset as i64))
                .format("%Y-%m-%d")
                .to_string()
        })
        .collect::<Vec<_>>();

    // Lanes are handed out per week, in treatment order. Any two treatments
    // active anywhere in the same week conflict, even when their active days
    // within the week do not overlap.
    let mut lane_by_treatment: Vec<Option<usize>> = vec![None; treatments.len()];
    let mut used_lanes: Vec<bool> = Vec::new();
    for (index, treatment) in treatments.iter().enumerate() {
        if !day_strings.iter().any(|day| treatment.is_active_on(day)) {
            continue;
        }

        let lane = used_lanes
            .iter()
            .position(|used| !used)
            .unwrap_or_else(|| {
                used_lanes.push(false);
                used_lanes.len() - 1
            });
        used_lanes[lane] = true;
        lane_by_treatment[index] = Some(lane);
    }

    let mut days = Vec::with_capacity(DAYS_PER_WEEK);
    let mut max_concurrency = 0usize;
    for (offset, day_string) in day_strings.iter().enumerate() {
        let date = week_start + Duration::days(offset as i64);

        let mut entries = Vec::new();
        for (index, treatment) in treatments.iter().enumerate() {
            if !treatment.is_active_on(day_string) {
                continue;
            }

            let lane = lane_by_treatment[index]
                .expect("treatment active on a day must hold a lane for its week");
            entries.push(DayEntry {
                treatment_index: index,
                is_start: treatment.from.as_deref() == Some(day_string.as_str()),
                is_end: treatment.to.as_deref() == Some(day_string.as_str()),
                lane,
            });
        }
        max_concurrency = max_concurrency.max(entries.len());

        days.push(GridDay {
            date,
            date_string: day_string.clone(),
            in_month: date.year() == month_first.year() && date.month() == month_first.month(),
            is_today: date == options.today,
            is_weekend: matches!(date.weekday(), Weekday::Sat | Weekday::Sun),
            is_holiday: options.show_holidays && options.holidays.contains(&date),
            entries,
        });
    }

    GridWeek {
        days,
        lane_count: used_lanes.len(),
        max_concurrency,
    }
}

/// Fixed-date holidays observed by the staff calendar, for a range of years
/// (inclusive): New Year, Assumption, National Day, All Saints, Christmas.
pub fn fixed_holidays(start_year: i32, end_year: i32) -> HashSet<NaiveDate> {
    let mut holidays = HashSet::new();
    for year in start_year..=end_year {
        for (month, day) in [(1, 1), (8, 15), (10, 12), (11, 1), (12, 25)] {
            if let Some(date) = NaiveDate::from_ymd_opt(year, month, day) {
                holidays.insert(date);
            }
        }
    }
    holidays
}

pub fn days_in_month(year: i32, month: u32) -> u32 {
    let first_of_next = if month == 12 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1).expect("next year date should be valid")
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1).expect("next month date should be valid")
    };
    (first_of_next - Duration::days(1)).day()
}

pub fn first_day_of_month(day: NaiveDate) -> NaiveDate {
    NaiveDate::from_ymd_opt(day.year(), day.month(), 1).expect("first day of month must be valid")
}

pub fn last_day_of_month(day: NaiveDate) -> NaiveDate {
    NaiveDate::from_ymd_opt(day.year(), day.month(), days_in_month(day.year(), day.month()))
        .expect("last day of month must be valid")
}

pub fn start_of_week(day: NaiveDate) -> NaiveDate {
    let days_from_monday = day.weekday().number_from_monday() as i64 - 1;
    day - Duration::days(days_from_monday)
}

pub fn end_of_week(day: NaiveDate) -> NaiveDate {
    start_of_week(day) + Duration::days(DAYS_PER_WEEK as i64 - 1)
}

/// Move exactly one (or `delta`) calendar months, clamping the day of month
/// to the target month's length.
pub fn shift_month(day: NaiveDate, delta: i32) -> NaiveDate {
    let mut year = day.year();
    let mut month = day.month() as i32 + delta;
    while month > 12 {
        year += 1;
        month -= 12;
    }
    while month < 1 {
        year -= 1;
        month += 12;
    }
    let month_u32 = month as u32;
    let max_day = days_in_month(year, month_u32);
    let target_day = day.day().min(max_day);
    NaiveDate::from_ymd_opt(year, month_u32, target_day).expect("shifted month date must be valid")
}

#[cfg(test)]
mod tests {
    use chrono::{Datelike, NaiveDate, Weekday};
    use std::collections::HashSet;

    use crate::domain::Treatment;

    use super::{
        build_month_grid, days_in_month, fixed_holidays, shift_month, GridOptions, MonthGrid,
    };

    fn date(raw: &str) -> NaiveDate {
        NaiveDate::parse_from_str(raw, "%Y-%m-%d").expect("test date must parse")
    }

    fn treatment(from: &str, to: &str, color: &str) -> Treatment {
        let mut treatment = Treatment::new("ibuprofen");
        treatment.from = if from.is_empty() {
            None
        } else {
            Some(from.to_string())
        };
        treatment.to = if to.is_empty() {
            None
        } else {
            Some(to.to_string())
        };
        treatment.color = Some(color.to_string());
        treatment
    }

    fn options_for(today: &str) -> GridOptions {
        GridOptions::new(false, HashSet::new(), date(today))
    }

    fn grid_for(month: &str, treatments: &[Treatment]) -> MonthGrid {
        build_month_grid(date(month), treatments, &options_for("2020-01-01"))
    }

    fn lane_of(grid: &MonthGrid, day: &str, treatment_index: usize) -> usize {
        for week in &grid.weeks {
            for grid_day in &week.days {
                if grid_day.date_string == day {
                    return grid_day
                        .entries
                        .iter()
                        .find(|entry| entry.treatment_index == treatment_index)
                        .map(|entry| entry.lane)
                        .expect("treatment should be active on the day");
                }
            }
        }
        panic!("day {day} not in grid");
    }

    #[test]
    fn window_covers_whole_month_in_complete_weeks() {
        for month in ["2025-06-15", "2025-02-01", "2027-02-10", "2025-09-30", "2024-12-25"] {
            let grid = grid_for(month, &[]);

            for week in &grid.weeks {
                assert_eq!(week.days.len(), 7);
            }
            let first = grid.weeks.first().and_then(|week| week.days.first()).unwrap();
            let last = grid.weeks.last().and_then(|week| week.days.last()).unwrap();
            assert_eq!(first.date.weekday(), Weekday::Mon);
            assert_eq!(last.date.weekday(), Weekday::Sun);

            let month_days = grid
                .weeks
                .iter()
                .flat_map(|week| week.days.iter())
                .filter(|day| day.in_month)
                .count() as u32;
            assert_eq!(month_days, days_in_month(grid.month.year(), grid.month.month()));
        }
    }

    #[test]
    fn month_starting_monday_gains_no_leading_week() {
        // September 2025 starts on a Monday; June 2025 ends on a Monday-start
        // grid whose last week runs Jun 30 - Jul 6.
        let grid = grid_for("2025-09-10", &[]);
        assert_eq!(grid.weeks[0].days[0].date_string, "2025-09-01");
        assert!(grid.weeks[0].days[0].in_month);
    }

    #[test]
    fn six_week_months_are_covered() {
        // March 2026: Mar 1 is a Sunday, Mar 31 a Tuesday -> six rows.
        let grid = grid_for("2026-03-15", &[]);
        assert_eq!(grid.weeks.len(), 6);
    }

    #[test]
    fn lanes_never_collide_within_a_week() {
        let treatments = vec![
            treatment("2025-06-01", "2025-06-20", "#FF8A80"),
            treatment("2025-06-03", "2025-06-12", "#FFD180"),
            treatment("2025-06-05", "2025-06-08", "#8C9EFF"),
            treatment("2025-06-10", "2025-06-30", "#80D8FF"),
        ];
        let grid = grid_for("2025-06-15", &treatments);

        for week in &grid.weeks {
            let mut active = Vec::new();
            for (index, t) in treatments.iter().enumerate() {
                if week.days.iter().any(|day| t.is_active_on(&day.date_string)) {
                    active.push(index);
                }
            }
            let lanes = active
                .iter()
                .map(|&index| {
                    week.days
                        .iter()
                        .flat_map(|day| day.entries.iter())
                        .find(|entry| entry.treatment_index == index)
                        .expect("active treatment appears in some day")
                        .lane
                })
                .collect::<Vec<_>>();

            let unique = lanes.iter().collect::<HashSet<_>>();
            assert_eq!(unique.len(), lanes.len(), "duplicate lane in week");

            // Contiguous from zero, nothing past the conflict count.
            let mut sorted = lanes.clone();
            sorted.sort_unstable();
            for (rank, lane) in sorted.iter().enumerate() {
                assert_eq!(*lane, rank);
            }
            assert_eq!(week.lane_count, lanes.len());
        }
    }

    #[test]
    fn week_conflict_rule_is_coarser_than_daily_overlap() {
        // Both treatments live in the week of Jun 2-8 but never share a day.
        let treatments = vec![
            treatment("2025-06-02", "2025-06-03", "#FF8A80"),
            treatment("2025-06-05", "2025-06-06", "#FFD180"),
        ];
        let grid = grid_for("2025-06-15", &treatments);

        assert_eq!(lane_of(&grid, "2025-06-02", 0), 0);
        assert_eq!(lane_of(&grid, "2025-06-05", 1), 1);

        let week = &grid.weeks[1];
        assert_eq!(week.days[0].date_string, "2025-06-02");
        assert_eq!(week.lane_count, 2);
        assert_eq!(week.max_concurrency, 1);
        assert_eq!(week.row_extent(90, 26), 90);
    }

    #[test]
    fn start_and_end_days_are_flagged() {
        let treatments = vec![treatment("2025-03-10", "2025-03-12", "#FF8A80")];
        let grid = grid_for("2025-03-15", &treatments);

        let flags = |day: &str| {
            grid.weeks
                .iter()
                .flat_map(|week| week.days.iter())
                .find(|grid_day| grid_day.date_string == day)
                .and_then(|grid_day| grid_day.entries.first())
                .map(|entry| (entry.is_start, entry.is_end))
                .expect("entry should exist")
        };
        assert_eq!(flags("2025-03-10"), (true, false));
        assert_eq!(flags("2025-03-11"), (false, false));
        assert_eq!(flags("2025-03-12"), (false, true));
    }

    #[test]
    fn identical_inputs_build_identical_grids() {
        let treatments = vec![
            treatment("2025-06-01", "2025-06-10", "#FF8A80"),
            treatment("2025-06-05", "2025-06-08", "#FFD180"),
            treatment("2025-06-05", "2025-06-28", "#8C9EFF"),
        ];
        let options = options_for("2025-06-07");

        let first = build_month_grid(date("2025-06-15"), &treatments, &options);
        let second = build_month_grid(date("2025-06-15"), &treatments, &options);
        assert_eq!(first, second);
    }

    #[test]
    fn missing_or_empty_bounds_deactivate_everywhere() {
        let mut open_ended = treatment("2025-06-01", "", "#FF8A80");
        open_ended.to = None;
        let blank_start = treatment("", "2025-06-10", "#FFD180");
        let mut empty_string = treatment("2025-06-01", "2025-06-10", "#8C9EFF");
        empty_string.from = Some(String::new());

        let grid = grid_for("2025-06-15", &[open_ended, blank_start, empty_string]);
        let total_entries: usize = grid
            .weeks
            .iter()
            .flat_map(|week| week.days.iter())
            .map(|day| day.entries.len())
            .sum();
        assert_eq!(total_entries, 0);
        assert!(grid.weeks.iter().all(|week| week.lane_count == 0));
    }

    #[test]
    fn inverted_range_is_active_nowhere() {
        let treatments = vec![treatment("2025-06-10", "2025-06-01", "#FF8A80")];
        let grid = grid_for("2025-06-15", &treatments);

        let total_entries: usize = grid
            .weeks
            .iter()
            .flat_map(|week| week.days.iter())
            .map(|day| day.entries.len())
            .sum();
        assert_eq!(total_entries, 0);
    }

    #[test]
    fn overlapping_treatments_split_lanes_only_where_both_run() {
        let treatments = vec![
            treatment("2025-06-01", "2025-06-10", "#A"),
            treatment("2025-06-05", "2025-06-08", "#B"),
        ];
        let grid = grid_for("2025-06-15", &treatments);

        // Week of Jun 2-8: both active, first treatment keeps lane 0.
        assert_eq!(lane_of(&grid, "2025-06-05", 0), 0);
        assert_eq!(lane_of(&grid, "2025-06-05", 1), 1);

        // The surrounding weeks only carry the first treatment, on lane 0.
        assert_eq!(lane_of(&grid, "2025-06-01", 0), 0);
        assert_eq!(lane_of(&grid, "2025-06-09", 0), 0);

        let overlap_week = &grid.weeks[1];
        assert_eq!(overlap_week.max_concurrency, 2);
        assert_eq!(overlap_week.row_extent(90, 26), 116);
        assert_eq!(grid.weeks[0].row_extent(90, 26), 90);
        assert_eq!(grid.weeks[2].row_extent(90, 26), 90);
    }

    #[test]
    fn duplicate_colors_still_render() {
        let treatments = vec![
            treatment("2025-06-02", "2025-06-04", "#FF8A80"),
            treatment("2025-06-03", "2025-06-05", "#FF8A80"),
        ];
        let grid = grid_for("2025-06-15", &treatments);

        let day = grid
            .weeks
            .iter()
            .flat_map(|week| week.days.iter())
            .find(|day| day.date_string == "2025-06-03")
            .unwrap();
        assert_eq!(day.entries.len(), 2);
        assert_ne!(day.entries[0].lane, day.entries[1].lane);
    }

    #[test]
    fn day_flags_follow_theme_options() {
        let holidays = fixed_holidays(2025, 2025);
        let staff = GridOptions::new(true, holidays.clone(), date("2025-12-05"));
        let patient = GridOptions::new(false, holidays, date("2025-12-05"));

        let staff_grid = build_month_grid(date("2025-12-05"), &[], &staff);
        let patient_grid = build_month_grid(date("2025-12-05"), &[], &patient);

        let find = |grid: &MonthGrid, day: &str| {
            grid.weeks
                .iter()
                .flat_map(|week| week.days.iter())
                .find(|grid_day| grid_day.date_string == day)
                .cloned()
                .unwrap()
        };

        assert!(find(&staff_grid, "2025-12-25").is_holiday);
        assert!(!find(&patient_grid, "2025-12-25").is_holiday);
        assert!(find(&staff_grid, "2025-12-06").is_weekend);
        assert!(find(&staff_grid, "2025-12-05").is_today);
        // December 2025 starts on a Monday, so the only fillers are January's.
        assert!(!find(&staff_grid, "2026-01-01").in_month);
    }

    #[test]
    fn month_shift_clamps_day_of_month() {
        assert_eq!(shift_month(date("2025-01-31"), 1), date("2025-02-28"));
        assert_eq!(shift_month(date("2024-01-31"), 1), date("2024-02-29"));
        assert_eq!(shift_month(date("2025-03-31"), -1), date("2025-02-28"));
        assert_eq!(shift_month(date("2025-12-15"), 1), date("2026-01-15"));
        assert_eq!(shift_month(date("2025-01-15"), -13), date("2023-12-15"));
    }
}
