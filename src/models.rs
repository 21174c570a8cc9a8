use serde::Deserialize;
use std::fmt;

/// Top-level data mode of the dashboard. Exactly one is active at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum View {
    #[default]
    All,
    Today,
    Bookmarks,
    Applications,
}

impl View {
    pub const ALL: [View; 4] = [View::All, View::Today, View::Bookmarks, View::Applications];

    /// Unknown or empty names fall back to `All`.
    pub fn parse(name: &str) -> Self {
        match name.trim() {
            "today" => View::Today,
            "bookmarks" => View::Bookmarks,
            "applications" => View::Applications,
            _ => View::All,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            View::All => "all",
            View::Today => "today",
            View::Bookmarks => "bookmarks",
            View::Applications => "applications",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            View::All => "전체 공고",
            View::Today => "오늘 공고",
            View::Bookmarks => "북마크",
            View::Applications => "지원 현황",
        }
    }

    pub fn empty_message(&self) -> &'static str {
        match self {
            View::All | View::Today => "표시할 공고가 없습니다.",
            View::Bookmarks => "북마크가 없습니다.",
            View::Applications => "지원 현황이 없습니다.",
        }
    }

    /// Job listing views are the only ones that honor search/filter/sort.
    pub fn is_job_listing(&self) -> bool {
        matches!(self, View::All | View::Today)
    }

    pub fn next(&self) -> Self {
        match self {
            View::All => View::Today,
            View::Today => View::Bookmarks,
            View::Bookmarks => View::Applications,
            View::Applications => View::All,
        }
    }
}

impl fmt::Display for View {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EmploymentType {
    InternConvertible,
    InternExperience,
    NewGrad,
    Experienced,
    Unknown,
}

impl EmploymentType {
    pub const ALL: [EmploymentType; 5] = [
        EmploymentType::InternConvertible,
        EmploymentType::InternExperience,
        EmploymentType::NewGrad,
        EmploymentType::Experienced,
        EmploymentType::Unknown,
    ];

    pub fn parse(code: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|e| e.as_str() == code.trim())
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            EmploymentType::InternConvertible => "intern_convertible",
            EmploymentType::InternExperience => "intern_experience",
            EmploymentType::NewGrad => "new_grad",
            EmploymentType::Experienced => "experienced",
            EmploymentType::Unknown => "unknown",
        }
    }
}

/// Steps through "no filter" and then every employment type, wrapping around.
pub fn cycle_employment_filter(current: Option<EmploymentType>) -> Option<EmploymentType> {
    match current {
        None => Some(EmploymentType::ALL[0]),
        Some(kind) => {
            let idx = EmploymentType::ALL.iter().position(|e| *e == kind).unwrap_or(0);
            EmploymentType::ALL.get(idx + 1).copied()
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SortOrder {
    #[default]
    PostedAtDesc,
    DeadlineAsc,
    ScoreDesc,
}

impl SortOrder {
    pub fn parse(code: &str) -> Option<Self> {
        match code.trim() {
            "posted_at_desc" => Some(SortOrder::PostedAtDesc),
            "deadline_asc" => Some(SortOrder::DeadlineAsc),
            "score_desc" => Some(SortOrder::ScoreDesc),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SortOrder::PostedAtDesc => "posted_at_desc",
            SortOrder::DeadlineAsc => "deadline_asc",
            SortOrder::ScoreDesc => "score_desc",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            SortOrder::PostedAtDesc => "최신 등록순",
            SortOrder::DeadlineAsc => "마감 임박순",
            SortOrder::ScoreDesc => "신입적합도순",
        }
    }

    pub fn next(&self) -> Self {
        match self {
            SortOrder::PostedAtDesc => SortOrder::DeadlineAsc,
            SortOrder::DeadlineAsc => SortOrder::ScoreDesc,
            SortOrder::ScoreDesc => SortOrder::PostedAtDesc,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ApplicationStatus {
    Planned,
    Applied,
    Interview,
    Rejected,
    Pass,
}

impl ApplicationStatus {
    pub fn parse(code: &str) -> Option<Self> {
        match code.trim() {
            "planned" => Some(ApplicationStatus::Planned),
            "applied" => Some(ApplicationStatus::Applied),
            "interview" => Some(ApplicationStatus::Interview),
            "rejected" => Some(ApplicationStatus::Rejected),
            "pass" => Some(ApplicationStatus::Pass),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ApplicationStatus::Planned => "planned",
            ApplicationStatus::Applied => "applied",
            ApplicationStatus::Interview => "interview",
            ApplicationStatus::Rejected => "rejected",
            ApplicationStatus::Pass => "pass",
        }
    }
}

/// Filter and sort selections. Only the job listing views use them; the other
/// views keep them untouched so they survive a round trip through bookmarks.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryState {
    pub search_text: String,
    pub employment_filter: Option<EmploymentType>,
    pub sort_order: SortOrder,
}

/// Canonical render unit shared by jobs, bookmarks and applications.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CardModel {
    pub id: String,
    pub title: String,
    pub subtitle: String,   // company name
    pub role_tag: String,   // "backend", "unknown", ...
    pub status_tag: String, // display label, see normalize::status_label
    pub score: i64,
    pub timestamp: Option<String>,
    pub action_target_id: String, // job id used by bookmark/apply
    pub external_url: Option<String>,
}

/// One row of the admin crawl run history.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CrawlRun {
    pub id: i64,
    pub source_code: Option<String>,
    pub status: String, // "running", "success", "failed"
    pub started_at: Option<String>,
    pub finished_at: Option<String>,
    #[serde(default)]
    pub fetched_count: i64,
    #[serde(default)]
    pub inserted_count: i64,
    #[serde(default)]
    pub updated_count: i64,
    #[serde(default)]
    pub failed_count: i64,
    pub error_message: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CrawlRunList {
    #[serde(default)]
    pub items: Vec<CrawlRun>,
}

/// Result of triggering a crawl.
#[derive(Debug, Clone, Deserialize)]
pub struct CrawlSummary {
    pub run_id: i64,
    pub status: String,
    pub source_code: String,
    #[serde(default)]
    pub fetched_count: i64,
    #[serde(default)]
    pub inserted_count: i64,
    #[serde(default)]
    pub updated_count: i64,
}

/// Result of triggering classification.
#[derive(Debug, Clone, Deserialize)]
pub struct ClassifySummary {
    pub rule_version: String,
    #[serde(default)]
    pub processed_count: i64,
    #[serde(default)]
    pub classified_count: i64,
}
