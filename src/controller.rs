use serde_json::Value;
use std::time::Instant;
use tracing::{info, warn};

use crate::endpoint::ApiBase;
use crate::models::{CardModel, EmploymentType, QueryState, SortOrder, View};
use crate::normalize::{listing, normalize};
use crate::query::{ApiQuery, build_query};
use crate::render::{self, Banner, CardAction, LOAD_FAILED_MESSAGE, Screen, Stat};
use crate::transport::{Method, Transport, TransportError};

/// Explicit UI events. Every one of them triggers exactly one reload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UiEvent {
    SwitchView(View),
    Refresh,
    SearchSubmit(String),
    FilterChange(Option<EmploymentType>),
    SortChange(SortOrder),
}

/// A reload cycle that has been started but not finished.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadRequest {
    pub view: View,
    pub query: ApiQuery,
}

impl LoadRequest {
    pub fn path(&self) -> String {
        self.query.to_path_and_query()
    }
}

pub struct DashboardState {
    pub view: View,
    pub query: QueryState,
    pub jobs: Vec<CardModel>,
    pub bookmarks: Vec<CardModel>,
    pub applications: Vec<CardModel>,
    pub total: u64,
    pub api_base: ApiBase,
    pub banner: Option<Banner>,
    pub screen: Screen,
    pub selected: usize,
}

impl DashboardState {
    pub fn new(api_base: ApiBase) -> Self {
        Self {
            view: View::default(),
            query: QueryState::default(),
            jobs: Vec::new(),
            bookmarks: Vec::new(),
            applications: Vec::new(),
            total: 0,
            api_base,
            banner: None,
            screen: render::render_empty(View::default().empty_message()),
            selected: 0,
        }
    }

    pub fn handle_event(&mut self, event: UiEvent) -> LoadRequest {
        match event {
            UiEvent::SwitchView(view) => {
                if view != self.view {
                    // Lists belong to the view that loaded them.
                    self.list_mut(self.view).clear();
                    self.selected = 0;
                }
                self.view = view;
            }
            UiEvent::Refresh => {}
            UiEvent::SearchSubmit(text) => self.query.search_text = text,
            UiEvent::FilterChange(filter) => self.query.employment_filter = filter,
            UiEvent::SortChange(sort) => self.query.sort_order = sort,
        }
        self.begin_reload()
    }

    pub fn begin_reload(&mut self) -> LoadRequest {
        self.banner = None;
        LoadRequest {
            view: self.view,
            query: build_query(self.view, &self.query),
        }
    }

    /// Applies a finished load. Completions are applied in arrival order, so
    /// the last one processed decides what is on screen.
    pub fn finish_reload(&mut self, view: View, outcome: Result<Value, TransportError>) {
        match outcome {
            Ok(response) => {
                let page = listing(&response);
                let cards = normalize(view, &page.items);
                info!(view = %view, items = cards.len(), total = page.total, "view loaded");
                self.screen = render::render(view, &cards);
                self.total = page.total;
                *self.list_mut(view) = cards;
                // A load error shown by an earlier completion no longer applies.
                if self.banner.as_ref().is_some_and(Banner::is_error) {
                    self.banner = None;
                }
            }
            Err(e) => {
                warn!(view = %view, error = %e, "view load failed");
                self.list_mut(view).clear();
                self.total = 0;
                self.screen = render::render_empty(LOAD_FAILED_MESSAGE);
                let message = format!("통신 실패: {} | API BASE: {}", e, self.api_base);
                self.banner = Some(Banner::error(message));
            }
        }
        self.clamp_selection();
    }

    pub fn finish_action(
        &mut self,
        action: &CardAction,
        outcome: Result<Value, TransportError>,
        now: Instant,
    ) {
        self.banner = Some(render::action_feedback(action, &outcome, now));
    }

    pub fn tick(&mut self, now: Instant) {
        if self.banner.as_ref().is_some_and(|b| b.is_expired(now)) {
            self.banner = None;
        }
    }

    pub fn cards(&self) -> &[CardModel] {
        self.list(self.view)
    }

    pub fn stats(&self) -> Vec<Stat> {
        render::render_stats(self.total, self.view.label(), &self.api_base)
    }

    /// Actions of the selected card, in display order.
    pub fn selected_actions(&self) -> Vec<CardAction> {
        match &self.screen {
            Screen::Cards(cards) => cards
                .get(self.selected)
                .map(|c| c.actions.clone())
                .unwrap_or_default(),
            Screen::Empty(_) => Vec::new(),
        }
    }

    pub fn select_next(&mut self) {
        if let Screen::Cards(cards) = &self.screen {
            if self.selected + 1 < cards.len() {
                self.selected += 1;
            }
        }
    }

    pub fn select_prev(&mut self) {
        self.selected = self.selected.saturating_sub(1);
    }

    fn clamp_selection(&mut self) {
        let len = match &self.screen {
            Screen::Cards(cards) => cards.len(),
            Screen::Empty(_) => 0,
        };
        self.selected = self.selected.min(len.saturating_sub(1));
    }

    fn list(&self, view: View) -> &[CardModel] {
        match view {
            View::All | View::Today => &self.jobs,
            View::Bookmarks => &self.bookmarks,
            View::Applications => &self.applications,
        }
    }

    fn list_mut(&mut self, view: View) -> &mut Vec<CardModel> {
        match view {
            View::All | View::Today => &mut self.jobs,
            View::Bookmarks => &mut self.bookmarks,
            View::Applications => &mut self.applications,
        }
    }
}

/// Runs a whole reload cycle on the calling thread.
pub fn reload(state: &mut DashboardState, transport: &dyn Transport, event: UiEvent) {
    let request = state.handle_event(event);
    let outcome = transport.request(Method::Get, &request.path(), None);
    state.finish_reload(request.view, outcome);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::{BannerKind, Link};
    use crate::transport::fake::{ScriptedTransport, http_error};
    use serde_json::json;
    use std::time::Duration;

    fn state() -> DashboardState {
        DashboardState::new(ApiBase::new("http://localhost:40001"))
    }

    fn jobs_response() -> Value {
        json!({
            "items": [
                {
                    "job_id": 1,
                    "title": "Backend Eng",
                    "company_name": "Acme",
                    "role_type": "backend",
                    "employment_type": "new_grad",
                    "new_grad_score": 87,
                    "posted_at": "2024-03-01T00:00:00Z",
                    "url": "https://x/1"
                },
                {
                    "job_id": 2,
                    "title": "Data Eng",
                    "company_name": "Globex",
                    "employment_type": "experienced"
                }
            ],
            "total": 57
        })
    }

    #[test]
    fn test_refresh_loads_and_renders_jobs() {
        let transport = ScriptedTransport::new().respond(Ok(jobs_response()));
        let mut state = state();
        reload(&mut state, &transport, UiEvent::Refresh);

        assert_eq!(transport.calls()[0].path, "/api/v1/jobs?sort=posted_at_desc");
        assert_eq!(state.jobs.len(), 2);
        assert_eq!(state.total, 57);
        assert_eq!(state.banner, None);
        let Screen::Cards(cards) = &state.screen else {
            panic!("expected cards");
        };
        assert_eq!(cards[0].status_badge, "신입");
        assert_eq!(cards[1].link, Link::Disabled("링크 없음".to_string()));
        assert_eq!(state.stats()[0].value, "57");
    }

    #[test]
    fn test_empty_items_render_empty_state_for_every_view() {
        for view in [View::All, View::Bookmarks, View::Applications] {
            let transport = ScriptedTransport::new().respond(Ok(json!({"items": [], "total": 0})));
            let mut state = state();
            reload(&mut state, &transport, UiEvent::SwitchView(view));
            assert_eq!(state.screen, Screen::Empty(view.empty_message().to_string()));
            assert!(state.banner.is_none());
        }
    }

    #[test]
    fn test_search_filter_and_sort_events_reach_the_query() {
        let transport = ScriptedTransport::new()
            .respond(Ok(json!({"items": []})))
            .respond(Ok(json!({"items": []})))
            .respond(Ok(json!({"items": []})));
        let mut state = state();
        reload(&mut state, &transport, UiEvent::SearchSubmit("rust".to_string()));
        reload(&mut state, &transport, UiEvent::FilterChange(Some(EmploymentType::NewGrad)));
        reload(&mut state, &transport, UiEvent::SortChange(SortOrder::ScoreDesc));

        let paths: Vec<_> = transport.calls().into_iter().map(|c| c.path).collect();
        assert_eq!(
            paths,
            vec![
                "/api/v1/jobs?q=rust&sort=posted_at_desc",
                "/api/v1/jobs?q=rust&employment_type=new_grad&sort=posted_at_desc",
                "/api/v1/jobs?q=rust&employment_type=new_grad&sort=score_desc",
            ]
        );
    }

    #[test]
    fn test_query_state_survives_bookmarks_view() {
        let transport = ScriptedTransport::new()
            .respond(Ok(json!({"items": []})))
            .respond(Ok(json!({"items": []})))
            .respond(Ok(json!({"items": []})));
        let mut state = state();
        reload(&mut state, &transport, UiEvent::SearchSubmit("rust".to_string()));
        reload(&mut state, &transport, UiEvent::SwitchView(View::Bookmarks));
        reload(&mut state, &transport, UiEvent::SwitchView(View::Today));

        let paths: Vec<_> = transport.calls().into_iter().map(|c| c.path).collect();
        assert_eq!(paths[1], "/api/v1/bookmarks");
        assert_eq!(paths[2], "/api/v1/jobs/today?q=rust&sort=posted_at_desc");
    }

    #[test]
    fn test_switching_views_discards_previous_list() {
        let transport = ScriptedTransport::new()
            .respond(Ok(jobs_response()))
            .respond(Ok(json!({
                "items": [{"job_id": 1, "created_at": "2024-03-02T00:00:00Z"}],
                "total": 1
            })));
        let mut state = state();
        reload(&mut state, &transport, UiEvent::Refresh);
        reload(&mut state, &transport, UiEvent::SwitchView(View::Bookmarks));

        assert!(state.jobs.is_empty());
        assert_eq!(state.bookmarks.len(), 1);
        assert_eq!(state.cards()[0].role_tag, "backend");
        assert_eq!(state.cards()[0].status_tag, "미분류");
    }

    #[test]
    fn test_load_failure_clears_list_and_sets_banner() {
        let transport = ScriptedTransport::new()
            .respond(Ok(jobs_response()))
            .respond(Err(http_error(502, "Bad Gateway", "")));
        let mut state = state();
        reload(&mut state, &transport, UiEvent::Refresh);
        reload(&mut state, &transport, UiEvent::Refresh);

        assert!(state.jobs.is_empty());
        assert_eq!(
            state.screen,
            Screen::Empty("데이터를 불러오지 못했습니다.".to_string())
        );
        let banner = state.banner.as_ref().unwrap();
        assert_eq!(banner.kind, BannerKind::Error);
        assert_eq!(
            banner.message,
            "통신 실패: 502 Bad Gateway (no body) | API BASE: http://localhost:40001"
        );
        // Persistent: ticking does not clear it.
        state.tick(Instant::now() + Duration::from_secs(60));
        assert!(state.banner.is_some());
    }

    #[test]
    fn test_next_reload_clears_error_banner() {
        let transport = ScriptedTransport::new()
            .respond(Err(TransportError::Network("connection refused".to_string())))
            .respond(Ok(jobs_response()));
        let mut state = state();
        reload(&mut state, &transport, UiEvent::Refresh);
        assert!(state.banner.as_ref().unwrap().message.contains("connection refused"));

        reload(&mut state, &transport, UiEvent::Refresh);
        assert!(state.banner.is_none());
        assert_eq!(state.jobs.len(), 2);
    }

    #[test]
    fn test_failed_bookmark_leaves_list_unchanged() {
        let transport = ScriptedTransport::new()
            .respond(Ok(jobs_response()))
            .respond(Err(http_error(500, "Internal Server Error", "db down")));
        let mut state = state();
        reload(&mut state, &transport, UiEvent::Refresh);
        let before_screen = state.screen.clone();
        let before_jobs = state.jobs.clone();

        let action = state.selected_actions()[0].clone();
        assert_eq!(action, CardAction::Bookmark { job_id: "1".to_string() });
        let outcome = render::action_request(&transport, &action);
        state.finish_action(&action, outcome, Instant::now());

        assert_eq!(state.screen, before_screen);
        assert_eq!(state.jobs, before_jobs);
        let banner = state.banner.as_ref().unwrap();
        assert!(banner.is_error());
        assert!(banner.message.contains("500"));
        assert!(banner.message.starts_with("북마크 실패"));
    }

    #[test]
    fn test_later_success_clears_earlier_load_error() {
        let mut state = state();
        let first = state.handle_event(UiEvent::Refresh);
        let second = state.handle_event(UiEvent::Refresh);

        state.finish_reload(second.view, Err(http_error(502, "Bad Gateway", "")));
        assert!(state.banner.as_ref().is_some_and(Banner::is_error));

        state.finish_reload(first.view, Ok(json!({"items": [{"job_id": 1}]})));
        assert!(matches!(state.screen, Screen::Cards(_)));
        assert!(state.banner.is_none());
    }

    #[test]
    fn test_successful_load_keeps_pending_success_banner() {
        let mut state = state();
        let now = Instant::now();
        let request = state.handle_event(UiEvent::Refresh);
        let action = CardAction::Bookmark { job_id: "1".to_string() };
        state.finish_action(&action, Ok(json!({})), now);

        state.finish_reload(request.view, Ok(jobs_response()));
        let banner = state.banner.as_ref().unwrap();
        assert!(matches!(banner.kind, BannerKind::Success { .. }));
    }

    #[test]
    fn test_success_banner_clears_on_tick() {
        let mut state = state();
        let now = Instant::now();
        let action = CardAction::Apply { job_id: "1".to_string() };
        state.finish_action(&action, Ok(json!({})), now);

        state.tick(now + Duration::from_millis(500));
        assert!(state.banner.is_some());
        state.tick(now + Duration::from_millis(1300));
        assert!(state.banner.is_none());
    }

    #[test]
    fn test_last_completion_wins() {
        let mut state = state();
        let first = state.handle_event(UiEvent::Refresh);
        let second = state.handle_event(UiEvent::SwitchView(View::Applications));

        state.finish_reload(
            second.view,
            Ok(json!({
                "items": [{"job_id": 4, "status": "pass", "updated_at": "2024-05-01T00:00:00Z"}]
            })),
        );
        state.finish_reload(first.view, Ok(jobs_response()));

        let Screen::Cards(cards) = &state.screen else {
            panic!("expected cards");
        };
        assert_eq!(cards.len(), 2);
        assert_eq!(cards[0].title, "Backend Eng");
        assert_eq!(state.applications.len(), 1);
        assert_eq!(state.applications[0].status_tag, "최종합격");
    }

    #[test]
    fn test_selection_is_clamped_after_reload() {
        let transport = ScriptedTransport::new()
            .respond(Ok(jobs_response()))
            .respond(Ok(json!({"items": [{"job_id": 9}]})));
        let mut state = state();
        reload(&mut state, &transport, UiEvent::Refresh);
        state.select_next();
        state.select_next();
        assert_eq!(state.selected, 1);

        reload(&mut state, &transport, UiEvent::Refresh);
        assert_eq!(state.selected, 0);
        assert_eq!(state.selected_actions()[1], CardAction::Apply { job_id: "9".to_string() });
    }
}
