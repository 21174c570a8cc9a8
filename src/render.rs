use chrono::{DateTime, Datelike, Local, NaiveDate, NaiveDateTime, TimeZone};
use serde_json::Value;
use std::time::{Duration, Instant};
use tracing::{info, warn};

use crate::endpoint::ApiBase;
use crate::models::{ApplicationStatus, CardModel, View};
use crate::transport::{self, Transport, TransportError};

/// How long a success banner stays up.
pub const SUCCESS_BANNER_TTL: Duration = Duration::from_millis(1200);
pub const LOAD_FAILED_MESSAGE: &str = "데이터를 불러오지 못했습니다.";
pub const BOOKMARK_MEMO: &str = "대시보드에서 저장";
pub const NO_LINK_LABEL: &str = "링크 없음";

/// Structured description of the card area.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Screen {
    Empty(String),
    Cards(Vec<CardView>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CardView {
    pub id: String,
    pub title: String,
    pub company: String,
    pub role_badge: String,
    pub status_badge: String,
    pub score_text: String,
    pub posted_text: String,
    pub link: Link,
    pub actions: Vec<CardAction>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Link {
    Enabled(String),
    /// Rendered inert; there is nothing to open.
    Disabled(String),
}

/// A mutation bound to one card. Carries the job id it targets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CardAction {
    Bookmark { job_id: String },
    Apply { job_id: String },
    Unbookmark { job_id: String },
}

impl CardAction {
    pub fn job_id(&self) -> &str {
        match self {
            CardAction::Bookmark { job_id }
            | CardAction::Apply { job_id }
            | CardAction::Unbookmark { job_id } => job_id,
        }
    }

    fn success_message(&self) -> &'static str {
        match self {
            CardAction::Bookmark { .. } => "✅ 북마크 저장 완료",
            CardAction::Apply { .. } => "✅ 지원 상태 업데이트 완료",
            CardAction::Unbookmark { .. } => "✅ 북마크 삭제 완료",
        }
    }

    fn failure_prefix(&self) -> &'static str {
        match self {
            CardAction::Bookmark { .. } => "북마크 실패",
            CardAction::Apply { .. } => "업데이트 실패",
            CardAction::Unbookmark { .. } => "북마크 삭제 실패",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BannerKind {
    /// Clears itself once `expires_at` passes.
    Success { expires_at: Instant },
    /// Stays until the next reload or action.
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Banner {
    pub message: String,
    pub kind: BannerKind,
}

impl Banner {
    pub fn success(message: impl Into<String>, now: Instant) -> Self {
        Self {
            message: message.into(),
            kind: BannerKind::Success {
                expires_at: now + SUCCESS_BANNER_TTL,
            },
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            kind: BannerKind::Error,
        }
    }

    pub fn is_error(&self) -> bool {
        self.kind == BannerKind::Error
    }

    pub fn is_expired(&self, now: Instant) -> bool {
        match self.kind {
            BannerKind::Success { expires_at } => now >= expires_at,
            BannerKind::Error => false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Stat {
    pub label: &'static str,
    pub value: String,
}

pub fn render(view: View, cards: &[CardModel]) -> Screen {
    if cards.is_empty() {
        return render_empty(view.empty_message());
    }
    Screen::Cards(cards.iter().map(|card| card_view(view, card)).collect())
}

pub fn render_empty(message: &str) -> Screen {
    Screen::Empty(message.to_string())
}

pub fn render_stats(total: u64, view_label: &str, api_base: &ApiBase) -> Vec<Stat> {
    vec![
        Stat {
            label: "총 건수",
            value: total.to_string(),
        },
        Stat {
            label: "현재 뷰",
            value: view_label.to_string(),
        },
        Stat {
            label: "API 대상",
            value: api_base.to_string(),
        },
    ]
}

pub fn card_view(view: View, card: &CardModel) -> CardView {
    let job_id = card.action_target_id.clone();
    let mut actions = vec![
        CardAction::Bookmark { job_id: job_id.clone() },
        CardAction::Apply { job_id: job_id.clone() },
    ];
    if view == View::Bookmarks {
        actions.push(CardAction::Unbookmark { job_id });
    }

    CardView {
        id: card.id.clone(),
        title: card.title.clone(),
        company: card.subtitle.clone(),
        role_badge: card.role_tag.to_uppercase(),
        status_badge: card.status_tag.clone(),
        score_text: format!("신입적합도 {}", card.score),
        posted_text: format!("등록 {}", format_date(card.timestamp.as_deref())),
        link: match &card.external_url {
            Some(url) => Link::Enabled(url.clone()),
            None => Link::Disabled(NO_LINK_LABEL.to_string()),
        },
        actions,
    }
}

/// Short Korean date (`2024. 3. 1.`) in the local timezone.
pub fn format_date(iso: Option<&str>) -> String {
    format_date_in(iso, &Local)
}

pub fn format_date_in<Tz: TimeZone>(iso: Option<&str>, tz: &Tz) -> String {
    let Some(iso) = iso.filter(|s| !s.is_empty()) else {
        return "-".to_string();
    };

    let date = if let Ok(dt) = DateTime::parse_from_rfc3339(iso) {
        dt.with_timezone(tz).date_naive()
    } else if let Ok(naive) = NaiveDateTime::parse_from_str(iso, "%Y-%m-%dT%H:%M:%S%.f") {
        naive.date()
    } else if let Ok(date) = NaiveDate::parse_from_str(iso, "%Y-%m-%d") {
        date
    } else {
        return iso.to_string();
    };

    format!("{}. {}. {}.", date.year(), date.month(), date.day())
}

/// Issues the request behind a card action. Does not touch any rendered list.
pub fn action_request(
    transport: &dyn Transport,
    action: &CardAction,
) -> Result<Value, TransportError> {
    match action {
        CardAction::Bookmark { job_id } => {
            transport::create_bookmark(transport, job_id, BOOKMARK_MEMO)
        }
        CardAction::Apply { job_id } => {
            transport::upsert_application(transport, job_id, ApplicationStatus::Applied)
        }
        CardAction::Unbookmark { job_id } => transport::delete_bookmark(transport, job_id),
    }
}

pub fn action_feedback(
    action: &CardAction,
    outcome: &Result<Value, TransportError>,
    now: Instant,
) -> Banner {
    match outcome {
        Ok(_) => {
            info!(?action, "card action succeeded");
            Banner::success(action.success_message(), now)
        }
        Err(e) => {
            warn!(?action, error = %e, "card action failed");
            Banner::error(format!("{}: {}", action.failure_prefix(), e))
        }
    }
}

pub fn perform_action(transport: &dyn Transport, action: &CardAction, now: Instant) -> Banner {
    let outcome = action_request(transport, action);
    action_feedback(action, &outcome, now)
}
