use std::fmt::Display;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::TimeZone;

use crate::models::Task;
use crate::query::{build_sections, sort_tasks, Section, SortMode, SortOrder, SortSpec, TaskQuery};

/// View-state of the task list screen, shared between the UI and the search debouncer.
#[derive(Clone)]
pub struct TaskListState {
    inner: Arc<Mutex<ListData>>,
}

impl TaskListState {
    pub fn new(tasks: Vec<Task>, sorting: SortSpec) -> Self {
        let mut tasks = tasks;
        sort_tasks(&mut tasks, sorting);
        Self {
            inner: Arc::new(Mutex::new(ListData {
                tasks,
                sorting,
                completed_only: false,
                priority: None,
                search_visible: false,
                search_text: String::new(),
            })),
        }
    }

    fn lock(&self) -> MutexGuard<'_, ListData> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn tasks(&self) -> Vec<Task> {
        self.lock().tasks.clone()
    }

    pub fn sorting(&self) -> SortSpec {
        self.lock().sorting
    }

    pub fn completed_only(&self) -> bool {
        self.lock().completed_only
    }

    pub fn priority_filter(&self) -> Option<i32> {
        self.lock().priority
    }

    pub fn search_visible(&self) -> bool {
        self.lock().search_visible
    }

    pub fn search_text(&self) -> String {
        self.lock().search_text.clone()
    }

    /// Stores a fresh list from the repository, sorted by the current spec.
    pub fn replace_tasks(&self, tasks: Vec<Task>) {
        let mut guard = self.lock();
        let sorting = guard.sorting;
        guard.tasks = tasks;
        sort_tasks(&mut guard.tasks, sorting);
    }

    pub fn toggle_sort(&self, mode: SortMode) -> SortSpec {
        let mut guard = self.lock();
        let next = guard.sorting.toggled(mode);
        guard.sorting = next;
        sort_tasks(&mut guard.tasks, next);
        next
    }

    pub fn toggle_completed_filter(&self) -> bool {
        let mut guard = self.lock();
        guard.completed_only = !guard.completed_only;
        guard.completed_only
    }

    /// Picking the active level again clears the filter.
    pub fn toggle_priority_filter(&self, level: i32) -> Option<i32> {
        let mut guard = self.lock();
        guard.priority = if guard.priority == Some(level) {
            None
        } else {
            Some(level)
        };
        guard.priority
    }

    pub fn set_search_visible(&self, visible: bool) {
        self.lock().search_visible = visible;
    }

    pub fn toggle_search_bar(&self) -> bool {
        let mut guard = self.lock();
        guard.search_visible = !guard.search_visible;
        guard.search_visible
    }

    /// Receives debounced search text.
    pub fn apply_search(&self, text: String) {
        self.lock().search_text = text;
    }

    /// Pull-to-refresh: clears the search, resets to newest-first and takes the reloaded list.
    pub fn refresh(&self, tasks: Vec<Task>) {
        let mut guard = self.lock();
        guard.search_text.clear();
        guard.sorting = SortSpec::new(SortMode::CreatedAt, SortOrder::Descending);
        guard.tasks = tasks;
        let sorting = guard.sorting;
        sort_tasks(&mut guard.tasks, sorting);
    }

    pub fn query(&self) -> TaskQuery {
        let guard = self.lock();
        TaskQuery {
            sort: guard.sorting,
            completed_only: guard.completed_only,
            priority: guard.priority,
            search: guard
                .search_visible
                .then(|| guard.search_text.clone())
                .filter(|text| !text.is_empty()),
        }
    }

    pub fn sections<Tz>(&self, tz: &Tz) -> Vec<Section>
    where
        Tz: TimeZone,
        Tz::Offset: Display,
    {
        let query = self.query();
        let tasks = self.tasks();
        build_sections(&tasks, &query, tz)
    }
}

#[derive(Debug)]
struct ListData {
    tasks: Vec<Task>,
    sorting: SortSpec,
    completed_only: bool,
    priority: Option<i32>,
    search_visible: bool,
    search_text: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn make_task(id: &str, created_at: i64, priority: i32, category: &str) -> Task {
        Task {
            id: id.to_string(),
            title: format!("task-{id}"),
            content: String::new(),
            created_at,
            due_at: None,
            priority,
            is_completed: false,
            category: category.to_string(),
            collaborators: Vec::new(),
        }
    }

    fn sample_state() -> TaskListState {
        let tasks = vec![
            make_task("a", 10, 3, "Work"),
            make_task("b", 30, 1, "Home"),
            make_task("c", 20, 2, "work"),
        ];
        TaskListState::new(
            tasks,
            SortSpec::new(SortMode::CreatedAt, SortOrder::Descending),
        )
    }

    fn ids(tasks: &[Task]) -> Vec<&str> {
        tasks.iter().map(|t| t.id.as_str()).collect()
    }

    #[test]
    fn new_and_replace_sort_by_current_spec() {
        let state = sample_state();
        assert_eq!(ids(&state.tasks()), vec!["b", "c", "a"]);

        state.replace_tasks(vec![
            make_task("x", 1, 2, "General"),
            make_task("y", 2, 2, "General"),
        ]);
        assert_eq!(ids(&state.tasks()), vec!["y", "x"]);
    }

    #[test]
    fn toggle_sort_flips_order_and_resorts() {
        let state = sample_state();
        let spec = state.toggle_sort(SortMode::Priority);
        assert_eq!(spec, SortSpec::new(SortMode::Priority, SortOrder::Ascending));
        assert_eq!(ids(&state.tasks()), vec!["b", "c", "a"]);

        let spec = state.toggle_sort(SortMode::Priority);
        assert_eq!(spec.order, SortOrder::Descending);
        assert_eq!(ids(&state.tasks()), vec!["a", "c", "b"]);
    }

    #[test]
    fn filters_toggle_on_and_off() {
        let state = sample_state();
        assert!(state.toggle_completed_filter());
        assert!(!state.toggle_completed_filter());

        assert_eq!(state.toggle_priority_filter(1), Some(1));
        assert_eq!(state.toggle_priority_filter(2), Some(2));
        assert_eq!(state.toggle_priority_filter(2), None);
        assert_eq!(state.priority_filter(), None);
    }

    #[test]
    fn sections_follow_sort_and_filters() {
        let state = sample_state();
        let sections = state.sections(&Utc);
        let titles: Vec<&str> = sections.iter().map(|s| s.title.as_str()).collect();
        assert_eq!(titles, vec!["home", "work"]);
        assert_eq!(ids(&sections[1].data), vec!["c", "a"]);

        state.toggle_priority_filter(3);
        let sections = state.sections(&Utc);
        assert_eq!(sections.len(), 1);
        assert_eq!(ids(&sections[0].data), vec!["a"]);
    }

    #[test]
    fn search_applies_only_while_bar_is_visible() {
        let state = sample_state();
        state.apply_search("task-b".to_string());
        assert_eq!(state.query().search, None);
        assert_eq!(state.sections(&Utc).len(), 2);

        assert!(state.toggle_search_bar());
        assert_eq!(state.query().search.as_deref(), Some("task-b"));
        let sections = state.sections(&Utc);
        assert_eq!(sections[0].title, "home");
        assert_eq!(ids(&sections[0].data), vec!["b"]);

        state.set_search_visible(false);
        assert_eq!(state.sections(&Utc).len(), 2);
    }

    #[test]
    fn refresh_resets_search_and_sorting() {
        let state = sample_state();
        state.toggle_sort(SortMode::Priority);
        state.set_search_visible(true);
        state.apply_search("zzz".to_string());

        state.refresh(vec![
            make_task("old", 1, 1, "General"),
            make_task("new", 5, 1, "General"),
        ]);
        assert_eq!(state.search_text(), "");
        assert!(state.search_visible());
        assert_eq!(
            state.sorting(),
            SortSpec::new(SortMode::CreatedAt, SortOrder::Descending)
        );
        assert_eq!(ids(&state.tasks()), vec!["new", "old"]);
    }

    #[test]
    fn clones_share_state() {
        let state = sample_state();
        let other = state.clone();
        other.apply_search("abc".to_string());
        assert_eq!(state.search_text(), "abc");
    }
}
