use serde_json::Value;

use crate::models::{CardModel, View};

pub const UNCLASSIFIED_LABEL: &str = "미분류";
pub const UNTITLED: &str = "제목 없음";
pub const UNKNOWN_COMPANY: &str = "회사 미상";
pub const UNKNOWN_ROLE: &str = "unknown";

/// Bookmark and application resources carry no classification, so their cards
/// get this role and a score of zero.
pub const PLACEHOLDER_ROLE: &str = "backend";

/// Employment-type and application-status codes known to the backend. A new
/// backend code needs a row here, otherwise it is shown as the raw code.
pub const STATUS_LABELS: [(&str, &str); 10] = [
    ("intern_convertible", "채용연계형"),
    ("intern_experience", "체험형"),
    ("new_grad", "신입"),
    ("experienced", "경력"),
    ("unknown", "미분류"),
    ("planned", "지원예정"),
    ("applied", "지원완료"),
    ("interview", "면접"),
    ("rejected", "불합격"),
    ("pass", "최종합격"),
];

pub fn status_label(code: Option<&str>) -> String {
    match code {
        None | Some("") => UNCLASSIFIED_LABEL.to_string(),
        Some(code) => STATUS_LABELS
            .iter()
            .find(|(known, _)| *known == code)
            .map(|(_, label)| label.to_string())
            .unwrap_or_else(|| code.to_string()),
    }
}

/// A list response: `items` plus the server-reported `total`.
#[derive(Debug, Clone, PartialEq)]
pub struct Listing {
    pub items: Vec<Value>,
    pub total: u64,
}

pub fn listing(response: &Value) -> Listing {
    let items = response
        .get("items")
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default();
    let total = response
        .get("total")
        .and_then(Value::as_u64)
        .unwrap_or(items.len() as u64);
    Listing { items, total }
}

pub fn normalize(view: View, items: &[Value]) -> Vec<CardModel> {
    items.iter().map(|item| normalize_item(view, item)).collect()
}

pub fn normalize_item(view: View, item: &Value) -> CardModel {
    let job_id = id_field(item, "job_id").unwrap_or_default();
    let id = id_field(item, "id").unwrap_or_else(|| job_id.clone());

    let (role_tag, status_tag, score, timestamp) = match view {
        View::All | View::Today => (
            text_field(item, "role_type").unwrap_or_else(|| UNKNOWN_ROLE.to_string()),
            status_label(text_field(item, "employment_type").as_deref()),
            score_field(item, "new_grad_score"),
            text_field(item, "posted_at"),
        ),
        View::Bookmarks => (
            PLACEHOLDER_ROLE.to_string(),
            status_label(Some("unknown")),
            0,
            text_field(item, "created_at"),
        ),
        View::Applications => (
            PLACEHOLDER_ROLE.to_string(),
            status_label(text_field(item, "status").as_deref()),
            0,
            text_field(item, "updated_at"),
        ),
    };

    CardModel {
        id,
        title: text_field(item, "title").unwrap_or_else(|| UNTITLED.to_string()),
        subtitle: text_field(item, "company_name").unwrap_or_else(|| UNKNOWN_COMPANY.to_string()),
        role_tag,
        status_tag,
        score,
        timestamp,
        action_target_id: job_id,
        external_url: text_field(item, "url"),
    }
}

/// Non-empty string field. Null, missing, empty and non-string values are absent.
fn text_field(item: &Value, key: &str) -> Option<String> {
    item.get(key)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn id_field(item: &Value, key: &str) -> Option<String> {
    match item.get(key)? {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn score_field(item: &Value, key: &str) -> i64 {
    item.get(key)
        .and_then(|v| v.as_i64().or_else(|| v.as_f64().map(|f| f.round() as i64)))
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample_job() -> Value {
        json!({
            "job_id": "j1",
            "title": "Backend Eng",
            "company_name": "Acme",
            "role_type": "backend",
            "employment_type": "new_grad",
            "new_grad_score": 87,
            "posted_at": "2024-03-01T00:00:00Z",
            "url": "https://x/1"
        })
    }

    #[test]
    fn test_job_item_maps_all_fields() {
        let card = normalize_item(View::All, &sample_job());
        assert_eq!(card.id, "j1");
        assert_eq!(card.title, "Backend Eng");
        assert_eq!(card.subtitle, "Acme");
        assert_eq!(card.role_tag, "backend");
        assert_eq!(card.status_tag, "신입");
        assert_eq!(card.score, 87);
        assert_eq!(card.timestamp.as_deref(), Some("2024-03-01T00:00:00Z"));
        assert_eq!(card.action_target_id, "j1");
        assert_eq!(card.external_url.as_deref(), Some("https://x/1"));
    }

    #[test]
    fn test_bookmark_item_uses_placeholders() {
        let item = json!({"job_id": "j2", "created_at": "2024-03-02T00:00:00Z"});
        let card = normalize_item(View::Bookmarks, &item);
        assert_eq!(card.role_tag, "backend");
        assert_eq!(card.status_tag, UNCLASSIFIED_LABEL);
        assert_eq!(card.score, 0);
        assert_eq!(card.timestamp.as_deref(), Some("2024-03-02T00:00:00Z"));
        assert_eq!(card.title, UNTITLED);
        assert_eq!(card.subtitle, UNKNOWN_COMPANY);
        assert_eq!(card.external_url, None);
    }

    #[test]
    fn test_bookmark_ignores_job_classification_fields() {
        let mut item = sample_job();
        item["created_at"] = json!("2024-03-05T00:00:00Z");
        let card = normalize_item(View::Bookmarks, &item);
        assert_eq!(card.role_tag, "backend");
        assert_eq!(card.status_tag, "미분류");
        assert_eq!(card.score, 0);
        assert_eq!(card.timestamp.as_deref(), Some("2024-03-05T00:00:00Z"));
    }

    #[test]
    fn test_application_item_uses_status_and_updated_at() {
        let item = json!({
            "id": 9,
            "job_id": 31,
            "status": "interview",
            "updated_at": "2024-04-01T09:30:00+09:00",
            "title": "Platform Engineer",
            "company_name": "Initech",
            "url": null
        });
        let card = normalize_item(View::Applications, &item);
        assert_eq!(card.id, "9");
        assert_eq!(card.action_target_id, "31");
        assert_eq!(card.status_tag, "면접");
        assert_eq!(card.role_tag, "backend");
        assert_eq!(card.score, 0);
        assert_eq!(card.timestamp.as_deref(), Some("2024-04-01T09:30:00+09:00"));
        assert_eq!(card.external_url, None);
    }

    #[test]
    fn test_job_defaults_when_fields_missing() {
        let item = json!({"job_id": 3, "new_grad_score": null, "url": ""});
        let card = normalize_item(View::Today, &item);
        assert_eq!(card.role_tag, "unknown");
        assert_eq!(card.status_tag, UNCLASSIFIED_LABEL);
        assert_eq!(card.score, 0);
        assert_eq!(card.timestamp, None);
        assert_eq!(card.external_url, None);
    }

    #[test]
    fn test_fractional_score_is_rounded() {
        let card = normalize_item(View::All, &json!({"job_id": 1, "new_grad_score": 72.6}));
        assert_eq!(card.score, 73);
    }

    #[test]
    fn test_status_label_fallbacks() {
        assert_eq!(status_label(Some("intern_convertible")), "채용연계형");
        assert_eq!(status_label(Some("applied")), "지원완료");
        assert_eq!(status_label(Some("contract")), "contract");
        assert_eq!(status_label(Some("")), "미분류");
        assert_eq!(status_label(None), "미분류");
    }

    #[test]
    fn test_every_label_code_is_unique() {
        for (i, (code, _)) in STATUS_LABELS.iter().enumerate() {
            assert!(STATUS_LABELS[i + 1..].iter().all(|(other, _)| other != code));
        }
    }

    #[test]
    fn test_normalize_is_idempotent_per_view() {
        let items = vec![sample_job(), json!({"job_id": "j2", "status": "pass"})];
        for view in View::ALL {
            assert_eq!(normalize(view, &items), normalize(view, &items));
        }
    }

    #[test]
    fn test_listing_total_defaults_to_item_count() {
        let parsed = listing(&json!({"items": [{"job_id": 1}, {"job_id": 2}]}));
        assert_eq!(parsed.total, 2);

        let parsed = listing(&json!({"items": [], "total": 40}));
        assert_eq!(parsed.total, 40);

        let parsed = listing(&Value::Null);
        assert!(parsed.items.is_empty());
        assert_eq!(parsed.total, 0);
    }
}
