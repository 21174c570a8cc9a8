use crate::models::{QueryState, View};

pub const JOBS_PATH: &str = "/api/v1/jobs";
pub const TODAY_JOBS_PATH: &str = "/api/v1/jobs/today";
pub const BOOKMARKS_PATH: &str = "/api/v1/bookmarks";
pub const APPLICATIONS_PATH: &str = "/api/v1/applications";
pub const ADMIN_CRAWL_RUN_PATH: &str = "/api/v1/admin/crawl/run";
pub const ADMIN_CLASSIFY_RUN_PATH: &str = "/api/v1/admin/classify/run";
pub const ADMIN_RUNS_PATH: &str = "/api/v1/admin/runs";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiQuery {
    pub path: &'static str,
    pub params: Vec<(&'static str, String)>,
}

impl ApiQuery {
    pub fn to_path_and_query(&self) -> String {
        if self.params.is_empty() {
            return self.path.to_string();
        }
        let query: Vec<String> = self
            .params
            .iter()
            .map(|(k, v)| format!("{}={}", urlencoding::encode(k), urlencoding::encode(v)))
            .collect();
        format!("{}?{}", self.path, query.join("&"))
    }
}

pub fn endpoint_path(view: View) -> &'static str {
    match view {
        View::All => JOBS_PATH,
        View::Today => TODAY_JOBS_PATH,
        View::Bookmarks => BOOKMARKS_PATH,
        View::Applications => APPLICATIONS_PATH,
    }
}

pub fn build_query(view: View, query: &QueryState) -> ApiQuery {
    let path = endpoint_path(view);
    if !view.is_job_listing() {
        return ApiQuery { path, params: Vec::new() };
    }

    let mut params = Vec::new();
    let search = query.search_text.trim();
    if !search.is_empty() {
        params.push(("q", search.to_string()));
    }
    if let Some(kind) = query.employment_filter {
        params.push(("employment_type", kind.as_str().to_string()));
    }
    params.push(("sort", query.sort_order.as_str().to_string()));

    ApiQuery { path, params }
}

#[cfg(test)]
impl ApiQuery {
    fn param(&self, key: &str) -> Option<&str> {
        self.params.iter().find(|(k, _)| *k == key).map(|(_, v)| v.as_str())
    }
}
