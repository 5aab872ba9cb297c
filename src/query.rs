use std::cmp::Ordering;
use std::collections::HashMap;
use std::fmt::Display;

use chrono::TimeZone;
use fuzzy_matcher::skim::SkimMatcherV2;
use fuzzy_matcher::FuzzyMatcher;
use serde::{Deserialize, Serialize};

use crate::models::{Task, Timestamp};

pub const SEARCH_DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SortMode {
    CreatedAt,
    DueAt,
    Priority,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
    Ascending,
    Descending,
}

impl SortOrder {
    pub fn flipped(self) -> Self {
        match self {
            Self::Ascending => Self::Descending,
            Self::Descending => Self::Ascending,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct SortSpec {
    pub mode: SortMode,
    pub order: SortOrder,
}

impl SortSpec {
    pub fn new(mode: SortMode, order: SortOrder) -> Self {
        Self { mode, order }
    }

    /// Selecting a sort mode always flips the order, whether or not the mode changed.
    pub fn toggled(self, mode: SortMode) -> Self {
        Self {
            mode,
            order: self.order.flipped(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TaskQuery {
    pub sort: SortSpec,
    pub completed_only: bool,
    /// Raw priority level to keep; `None` keeps every priority.
    pub priority: Option<i32>,
    /// Only applied when non-blank.
    pub search: Option<String>,
}

impl TaskQuery {
    pub fn new(sort: SortSpec) -> Self {
        Self {
            sort,
            completed_only: false,
            priority: None,
            search: None,
        }
    }

    fn search_text(&self) -> Option<&str> {
        self.search
            .as_deref()
            .map(str::trim)
            .filter(|text| !text.is_empty())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Section {
    pub title: String,
    pub data: Vec<Task>,
}

pub fn should_exclude(task: &Task, completed_only: bool, priority: Option<i32>) -> bool {
    if completed_only && !task.is_completed {
        return true;
    }
    matches!(priority, Some(level) if level != task.priority)
}

/// Tasks without a due time go last in due-time mode, whichever the order.
pub fn compare(a: &Task, b: &Task, spec: SortSpec) -> Ordering {
    let natural = match spec.mode {
        SortMode::CreatedAt => a.created_at.cmp(&b.created_at),
        SortMode::Priority => a.priority.cmp(&b.priority),
        SortMode::DueAt => match (a.due_at, b.due_at) {
            (Some(a_due), Some(b_due)) => a_due.cmp(&b_due),
            (Some(_), None) => return Ordering::Less,
            (None, Some(_)) => return Ordering::Greater,
            (None, None) => return Ordering::Equal,
        },
    };
    match spec.order {
        SortOrder::Ascending => natural,
        SortOrder::Descending => natural.reverse(),
    }
}

pub fn sort_tasks(tasks: &mut [Task], spec: SortSpec) {
    tasks.sort_by(|a, b| compare(a, b, spec));
}

fn format_timestamp<Tz>(timestamp: Timestamp, tz: &Tz) -> Option<String>
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    tz.timestamp_opt(timestamp, 0)
        .single()
        .map(|dt| dt.format(SEARCH_DATE_FORMAT).to_string())
}

fn searchable_fields<Tz>(task: &Task, tz: &Tz) -> Vec<String>
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    let mut fields = vec![task.title.clone(), task.content.clone()];
    fields.extend(task.due_at.and_then(|due| format_timestamp(due, tz)));
    fields.extend(format_timestamp(task.created_at, tz));
    fields
}

/// Tasks whose title, content or formatted dates contain `text` (case-insensitive),
/// best fuzzy score first. Equal scores keep their input order.
///
/// Scattered letters never make a match on their own; the score only ranks tasks
/// that already contain the text.
pub fn fuzzy_search<'a, Tz>(tasks: &'a [Task], text: &str, tz: &Tz) -> Vec<&'a Task>
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    let needle = text.to_lowercase();
    let matcher = SkimMatcherV2::default().ignore_case();
    let mut scored: Vec<(&Task, i64)> = tasks
        .iter()
        .filter_map(|task| {
            searchable_fields(task, tz)
                .iter()
                .filter(|field| field.to_lowercase().contains(&needle))
                .map(|field| matcher.fuzzy_match(field, text).unwrap_or(0))
                .max()
                .map(|score| (task, score))
        })
        .collect();
    scored.sort_by(|a, b| b.1.cmp(&a.1));
    scored.into_iter().map(|(task, _)| task).collect()
}

/// Sections keyed by lowercased category, in order of first appearance.
pub fn group_by_category<'a, I>(tasks: I) -> Vec<Section>
where
    I: IntoIterator<Item = &'a Task>,
{
    let mut sections: Vec<Section> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();
    for task in tasks {
        let key = task.category_key();
        match index.get(&key) {
            Some(&at) => sections[at].data.push(task.clone()),
            None => {
                index.insert(key.clone(), sections.len());
                sections.push(Section {
                    title: key,
                    data: vec![task.clone()],
                });
            }
        }
    }
    sections
}

/// Sort, search (when requested), filter, then group. The same tasks, query and
/// time zone always give the same sections.
///
/// Search runs before the completed/priority filters, so a match that fails the
/// filters is still dropped.
pub fn build_sections<Tz>(tasks: &[Task], query: &TaskQuery, tz: &Tz) -> Vec<Section>
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    if tasks.is_empty() {
        return Vec::new();
    }
    let mut ordered = tasks.to_vec();
    sort_tasks(&mut ordered, query.sort);

    let candidates: Vec<&Task> = match query.search_text() {
        Some(text) => fuzzy_search(&ordered, text, tz),
        None => ordered.iter().collect(),
    };
    group_by_category(
        candidates
            .into_iter()
            .filter(|task| !should_exclude(task, query.completed_only, query.priority)),
    )
}
