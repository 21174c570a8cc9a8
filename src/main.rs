mod controller;
mod dispatch;
mod endpoint;
mod logging;
mod models;
mod normalize;
mod query;
mod render;
mod transport;
mod tui;

use anyhow::{Context, Result, anyhow};
use clap::{Parser, Subcommand};
use controller::{DashboardState, UiEvent};
use dispatch::Dispatcher;
use endpoint::{ApiBase, OverrideStore, PageLocation};
use models::{
    ApplicationStatus, ClassifySummary, CrawlRun, CrawlRunList, CrawlSummary, EmploymentType,
    QueryState, SortOrder, View,
};
use render::{CardAction, Link, Screen};
use serde_json::Value;
use std::sync::Arc;
use std::time::Instant;
use transport::{HttpTransport, Transport};

#[derive(Parser)]
#[command(name = "joblog")]
#[command(about = "Job postings dashboard - browse, bookmark, and track applications")]
struct Cli {
    /// Origin the dashboard is considered to be served from
    #[arg(long, global = true, default_value = "http://localhost")]
    origin: String,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Open the interactive dashboard (default)
    Dashboard,

    /// Load one view and print its cards
    List {
        /// View to load (all, today, bookmarks, applications)
        #[arg(short, long, default_value = "all")]
        view: String,

        /// Search text (company or title)
        #[arg(short, long)]
        query: Option<String>,

        /// Employment type (intern_convertible, intern_experience, new_grad, experienced, unknown)
        #[arg(short, long)]
        employment: Option<String>,

        /// Sort order (posted_at_desc, deadline_asc, score_desc)
        #[arg(short, long, default_value = "posted_at_desc")]
        sort: String,
    },

    /// Show job details
    Show {
        /// Job ID
        job_id: String,
    },

    /// Bookmark a job
    Bookmark {
        /// Job ID
        job_id: String,

        /// Memo stored with the bookmark
        #[arg(short, long, default_value = render::BOOKMARK_MEMO)]
        memo: String,
    },

    /// Remove a bookmark
    Unbookmark {
        /// Job ID
        job_id: String,
    },

    /// Set the application status of a job
    Apply {
        /// Job ID
        job_id: String,

        /// Status (planned, applied, interview, rejected, pass)
        #[arg(short, long, default_value = "applied")]
        status: String,
    },

    /// Manage the persisted API base override
    ApiBase {
        #[command(subcommand)]
        command: ApiBaseCommands,
    },

    /// Trigger crawls and classification, inspect crawl runs
    Admin {
        #[command(subcommand)]
        command: AdminCommands,
    },
}

#[derive(Subcommand)]
enum ApiBaseCommands {
    /// Show the override and the resolved API base
    Show,

    /// Persist an override that wins over origin-based resolution
    Set {
        /// API origin, e.g. http://127.0.0.1:40001
        url: String,
    },

    /// Remove the override
    Clear,
}

#[derive(Subcommand)]
enum AdminCommands {
    /// Crawl one source now
    Crawl {
        /// Source code
        #[arg(short, long, default_value = "remotive")]
        source: String,
    },

    /// Classify unclassified jobs
    Classify {
        /// Rule version (server default when omitted)
        #[arg(short, long)]
        rule_version: Option<String>,

        /// Maximum number of jobs to classify
        #[arg(
            short,
            long,
            default_value_t = 200,
            value_parser = clap::value_parser!(u32).range(1..=1000)
        )]
        limit: u32,
    },

    /// List recent crawl runs
    Runs {
        /// Number of runs to show
        #[arg(
            short,
            long,
            default_value_t = 20,
            value_parser = clap::value_parser!(u32).range(1..=100)
        )]
        limit: u32,
    },
}

fn resolve_api_base(origin: &str, store: &OverrideStore) -> Result<ApiBase> {
    let location = PageLocation::parse(origin)?;
    let forced = store.load()?;
    Ok(endpoint::resolve(&location, forced.as_deref()))
}

fn parse_query_state(employment: Option<&str>, sort: &str) -> Result<QueryState> {
    let employment_filter = match employment.map(str::trim).filter(|e| !e.is_empty()) {
        Some(code) => Some(
            EmploymentType::parse(code)
                .ok_or_else(|| anyhow!("Unknown employment type '{}'", code))?,
        ),
        None => None,
    };
    let sort_order =
        SortOrder::parse(sort).ok_or_else(|| anyhow!("Unknown sort order '{}'", sort))?;
    Ok(QueryState {
        search_text: String::new(),
        employment_filter,
        sort_order,
    })
}

fn main() -> Result<()> {
    logging::init();
    let cli = Cli::parse();
    let store = OverrideStore::open_default()?;

    match cli.command.unwrap_or(Commands::Dashboard) {
        Commands::Dashboard => {
            let api_base = resolve_api_base(&cli.origin, &store)?;
            tracing::info!(api_base = %api_base, "starting dashboard");
            let transport: Arc<dyn Transport> = Arc::new(HttpTransport::new(api_base.clone()));
            let mut dispatcher = Dispatcher::new(transport)?;
            let mut state = DashboardState::new(api_base);

            let result = tui::run_dashboard(&mut state, &mut dispatcher);
            dispatcher.shutdown();
            result?;
        }

        Commands::List {
            view,
            query,
            employment,
            sort,
        } => {
            let api_base = resolve_api_base(&cli.origin, &store)?;
            let transport = HttpTransport::new(api_base.clone());
            let mut state = DashboardState::new(api_base);
            state.query = parse_query_state(employment.as_deref(), &sort)?;

            let event = match query {
                Some(text) => UiEvent::SearchSubmit(text),
                None => UiEvent::Refresh,
            };
            state.view = View::parse(&view);
            controller::reload(&mut state, &transport, event);

            if let Some(banner) = &state.banner {
                return Err(anyhow!("{}", banner.message));
            }
            print_cards(&state);
        }

        Commands::Show { job_id } => {
            let api_base = resolve_api_base(&cli.origin, &store)?;
            let transport = HttpTransport::new(api_base);
            let detail = transport::job_detail(&transport, &job_id)
                .map_err(|e| anyhow!("통신 실패: {}", e))?;
            print_detail(&detail);
        }

        Commands::Bookmark { job_id, memo } => {
            let api_base = resolve_api_base(&cli.origin, &store)?;
            let transport = HttpTransport::new(api_base);
            if memo == render::BOOKMARK_MEMO {
                run_action(&transport, CardAction::Bookmark { job_id })?;
            } else {
                transport::create_bookmark(&transport, &job_id, &memo)
                    .map_err(|e| anyhow!("북마크 실패: {}", e))?;
                println!("✅ 북마크 저장 완료");
            }
        }

        Commands::Unbookmark { job_id } => {
            let api_base = resolve_api_base(&cli.origin, &store)?;
            let transport = HttpTransport::new(api_base);
            run_action(&transport, CardAction::Unbookmark { job_id })?;
        }

        Commands::Apply { job_id, status } => {
            let status = ApplicationStatus::parse(&status)
                .ok_or_else(|| anyhow!("Unknown application status '{}'", status))?;
            let api_base = resolve_api_base(&cli.origin, &store)?;
            let transport = HttpTransport::new(api_base);
            if status == ApplicationStatus::Applied {
                run_action(&transport, CardAction::Apply { job_id })?;
            } else {
                transport::upsert_application(&transport, &job_id, status)
                    .map_err(|e| anyhow!("업데이트 실패: {}", e))?;
                let label = normalize::status_label(Some(status.as_str()));
                println!("✅ 지원 상태 업데이트 완료 ({})", label);
            }
        }

        Commands::ApiBase { command } => match command {
            ApiBaseCommands::Show => {
                match store.load()? {
                    Some(value) => println!("{}: {}", endpoint::OVERRIDE_KEY, value),
                    None => println!("{}: (not set)", endpoint::OVERRIDE_KEY),
                }
                println!("Resolved API base: {}", resolve_api_base(&cli.origin, &store)?);
                println!("Stored at: {}", store.path().display());
            }

            ApiBaseCommands::Set { url } => {
                store.save(&url)?;
                println!("Saved {} = {}", endpoint::OVERRIDE_KEY, url.trim());
            }

            ApiBaseCommands::Clear => {
                if store.clear()? {
                    println!("Cleared {}.", endpoint::OVERRIDE_KEY);
                } else {
                    println!("{} was not set.", endpoint::OVERRIDE_KEY);
                }
            }
        },

        Commands::Admin { command } => {
            let api_base = resolve_api_base(&cli.origin, &store)?;
            let transport = HttpTransport::new(api_base);
            match command {
                AdminCommands::Crawl { source } => {
                    let response = transport::run_crawl(&transport, &source)
                        .map_err(|e| anyhow!("크롤링 실패: {}", e))?;
                    let run: CrawlSummary = serde_json::from_value(response)
                        .context("Unexpected crawl run response")?;
                    println!(
                        "Run #{} [{}] {}: fetched {}, inserted {}, updated {}",
                        run.run_id,
                        run.status,
                        run.source_code,
                        run.fetched_count,
                        run.inserted_count,
                        run.updated_count
                    );
                }

                AdminCommands::Classify {
                    rule_version,
                    limit,
                } => {
                    let response =
                        transport::run_classification(&transport, rule_version.as_deref(), limit)
                            .map_err(|e| anyhow!("분류 실패: {}", e))?;
                    let result: ClassifySummary = serde_json::from_value(response)
                        .context("Unexpected classification response")?;
                    println!(
                        "Rule {}: processed {}, classified {}",
                        result.rule_version, result.processed_count, result.classified_count
                    );
                }

                AdminCommands::Runs { limit } => {
                    let response = transport::crawl_runs(&transport, limit)
                        .map_err(|e| anyhow!("통신 실패: {}", e))?;
                    let runs: CrawlRunList = serde_json::from_value(response)
                        .context("Unexpected crawl run list response")?;
                    print_runs(&runs.items);
                }
            }
        }
    }

    Ok(())
}

fn run_action(transport: &dyn Transport, action: CardAction) -> Result<()> {
    let banner = render::perform_action(transport, &action, Instant::now());
    if banner.is_error() {
        return Err(anyhow!("{}", banner.message));
    }
    println!("{}", banner.message);
    Ok(())
}

fn print_cards(state: &DashboardState) {
    for stat in state.stats() {
        println!("{}: {}", stat.label, stat.value);
    }
    println!();

    match &state.screen {
        Screen::Empty(message) => println!("{}", message),
        Screen::Cards(cards) => {
            println!(
                "{:<8} {:<10} {:<10} {:>5} {:<30} {:<18} {:<14}",
                "JOB ID", "ROLE", "STATUS", "SCORE", "TITLE", "COMPANY", "DATE"
            );
            println!("{}", "-".repeat(101));
            for (card, model) in cards.iter().zip(state.cards()) {
                println!(
                    "{:<8} {:<10} {:<10} {:>5} {:<30} {:<18} {:<14}",
                    truncate(&model.action_target_id, 8),
                    truncate(&card.role_badge, 10),
                    truncate(&card.status_badge, 10),
                    model.score,
                    truncate(&card.title, 28),
                    truncate(&card.company, 16),
                    render::format_date(model.timestamp.as_deref())
                );
                if let Link::Enabled(url) = &card.link {
                    println!("{:<8} {}", "", url);
                }
            }
        }
    }
}

fn run_row(run: &CrawlRun) -> String {
    format!(
        "{:<6} {:<12} {:<10} {:<14} {:<14} {:>7} {:>8} {:>7} {:>6}",
        run.id,
        truncate(run.source_code.as_deref().unwrap_or("-"), 12),
        truncate(&run.status, 10),
        render::format_date(run.started_at.as_deref()),
        render::format_date(run.finished_at.as_deref()),
        run.fetched_count,
        run.inserted_count,
        run.updated_count,
        run.failed_count
    )
}

fn print_runs(runs: &[CrawlRun]) {
    if runs.is_empty() {
        println!("No crawl runs.");
        return;
    }

    println!(
        "{:<6} {:<12} {:<10} {:<14} {:<14} {:>7} {:>8} {:>7} {:>6}",
        "RUN", "SOURCE", "STATUS", "STARTED", "FINISHED", "FETCHED", "INSERTED", "UPDATED", "FAILED"
    );
    println!("{}", "-".repeat(92));
    for run in runs {
        println!("{}", run_row(run));
        if let Some(error) = run.error_message.as_deref().filter(|e| !e.is_empty()) {
            println!("{:<6} ! {}", "", truncate(error, 84));
        }
    }
}

fn print_detail(detail: &Value) {
    let text = |key: &str| detail.get(key).and_then(Value::as_str).filter(|s| !s.is_empty());

    println!("Job #{}", detail.get("job_id").map(|v| v.to_string()).unwrap_or_default());
    println!("Title: {}", text("title").unwrap_or(normalize::UNTITLED));
    println!("Company: {}", text("company_name").unwrap_or(normalize::UNKNOWN_COMPANY));
    println!("Employment: {}", normalize::status_label(text("employment_type")));
    println!("Role: {}", text("role_type").unwrap_or(normalize::UNKNOWN_ROLE).to_uppercase());
    println!(
        "New-grad score: {}",
        detail.get("new_grad_score").and_then(Value::as_i64).unwrap_or(0)
    );
    match text("url") {
        Some(url) => println!("URL: {}", url),
        None => println!("URL: {}", render::NO_LINK_LABEL),
    }
    if let Some(location) = text("location_text") {
        println!("Location: {}", location);
    }
    if let Some(salary) = text("salary_text") {
        println!("Salary: {}", salary);
    }
    println!("Posted: {}", render::format_date(text("posted_at")));
    println!("Deadline: {}", render::format_date(text("deadline_at")));
    if let Some(keywords) = detail.get("matched_keywords").and_then(Value::as_array) {
        let words: Vec<&str> = keywords.iter().filter_map(Value::as_str).collect();
        if !words.is_empty() {
            println!("Matched keywords: {}", words.join(", "));
        }
    }
    if let Some(description) = text("description_text") {
        println!("\n--- Description ---\n{}", description);
    }
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_run_row_columns() {
        let run: CrawlRun = serde_json::from_value(json!({
            "id": 7,
            "source_code": "remotive",
            "status": "failed",
            "started_at": null,
            "finished_at": null,
            "fetched_count": 12,
            "inserted_count": 3,
            "updated_count": 9,
            "failed_count": 0,
            "error_message": null
        }))
        .unwrap();
        let row = run_row(&run);
        assert!(row.starts_with("7      remotive     failed     -"));
        assert!(row.ends_with("     12        3       9      0"));
    }

    #[test]
    fn test_truncate_counts_chars() {
        assert_eq!(truncate("북마크 저장 완료", 20), "북마크 저장 완료");
        assert_eq!(truncate("abcdefghij", 6), "abc...");
    }
}
