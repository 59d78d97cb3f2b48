//! Integration tests for the scraper
//!
//! These tests use wiremock to serve a small paginated job board and test
//! discovery, extraction, persistence, and reconciliation end-to-end.

use job_harvest::config::{Config, HttpConfig, OutputConfig, ScraperConfig, SiteConfig};
use job_harvest::crawler::{run_scrape, Coordinator};
use job_harvest::state::{JobStatus, REASON_BECAME_UNAVAILABLE, REASON_FIRST_DISCOVERED};
use job_harvest::storage::{JsonStore, Storage};
use job_harvest::HarvestError;
use std::path::Path;
use std::time::Duration;
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const SEARCH_PATH: &str = "/jobseekers/jobsearch";

/// Creates a test configuration pointing at the mock server
fn create_test_config(server: &MockServer, output_dir: &Path) -> Config {
    Config {
        site: SiteConfig {
            search_url: format!("{}{}", server.uri(), SEARCH_PATH),
            job_path: "/jobseekers/job/".to_string(),
            page_size: 2,
            fallback_page_count: 1,
        },
        scraper: ScraperConfig {
            max_workers: 3,
            delay_secs: 0.0,
            max_pages: None,
            limit_jobs: None,
            jitter_seed: Some(42),
        },
        http: HttpConfig {
            timeout_secs: 5,
            connect_timeout_secs: 2,
            ..HttpConfig::default()
        },
        output: OutputConfig {
            output_dir: output_dir.display().to_string(),
            ..OutputConfig::default()
        },
    }
}

fn open_store(dir: &TempDir) -> JsonStore {
    JsonStore::new(dir.path(), "failed_jobs.json").expect("store opens")
}

fn html(body: &str) -> ResponseTemplate {
    ResponseTemplate::new(200)
        .set_body_string(body.to_string())
        .insert_header("content-type", "text/html")
}

fn job_page(title: &str, work_type: &str, skills: &[&str]) -> String {
    let tags: String = skills
        .iter()
        .map(|s| format!(r#"<a class="card-worker-topskill">{}</a>"#, s))
        .collect();
    format!(
        r#"<html><head><title>{title} | Jobs</title></head><body>
<h1>{title}</h1>
<h3>TYPE OF WORK</h3>
<p>{work_type}</p>
<h3>SALARY</h3>
<p>$600/month</p>
<h3>JOB OVERVIEW</h3>
<p>Help us with {title}.</p>
<h3>SKILL REQUIREMENT</h3>
<div>{tags}</div>
<h3>ABOUT THE EMPLOYER</h3>
</body></html>"#
    )
}

const UNAVAILABLE_PAGE: &str =
    "<html><head><title>Jobs</title></head><body><h1>Job Unavailable</h1></body></html>";

/// Mounts two listing pages: the first advertises 4 jobs across pages of 2
async fn mount_listing(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path(SEARCH_PATH))
        .respond_with(html(
            r#"<html><body>
<p>Displaying 2 out of 4 jobs</p>
<a href="/jobseekers/job/101">Senior Writer</a>
<a href="/jobseekers/job/Senior-Writer-101">Senior Writer</a>
<a href="/jobseekers/job/Data-Entry-102?ref=search#top">Data Entry</a>
<a href="/about">About</a>
</body></html>"#,
        ))
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path(format!("{}/2", SEARCH_PATH)))
        .respond_with(html(
            r#"<html><body>
<a href="/jobseekers/job/Bookkeeper-103">Bookkeeper</a>
<a href="/JOBSEEKERS/JOB/Data-Entry-102">Data Entry</a>
</body></html>"#,
        ))
        .mount(server)
        .await;
}

async fn mount_job(server: &MockServer, job_path: &str, response: ResponseTemplate) {
    Mock::given(method("GET"))
        .and(path(job_path))
        .respond_with(response)
        .mount(server)
        .await;
}

async fn mount_all_jobs(server: &MockServer) {
    mount_job(
        server,
        "/jobseekers/job/Senior-Writer-101",
        html(&job_page("Senior Writer", "Full Time", &["Copywriting", "SEO"])),
    )
    .await;
    mount_job(
        server,
        "/jobseekers/job/Data-Entry-102",
        html(&job_page("Data Entry Clerk", "Part Time", &["Excel"])),
    )
    .await;
    mount_job(
        server,
        "/jobseekers/job/Bookkeeper-103",
        html(&job_page("Bookkeeper Needed", "Gig", &["QuickBooks"])),
    )
    .await;
}

#[tokio::test]
async fn test_discovery_across_pages() {
    let server = MockServer::start().await;
    mount_listing(&server).await;
    let dir = TempDir::new().unwrap();

    let coordinator = Coordinator::new(create_test_config(&server, dir.path())).unwrap();
    let (urls, discovered) = coordinator.discover().await.unwrap();

    assert_eq!(discovered, 3);
    assert_eq!(urls.len(), 3);

    // The descriptive URL wins over the bare one, and the query is dropped
    assert!(urls[0].ends_with("/jobseekers/job/Senior-Writer-101"));
    assert!(urls[1].ends_with("/job/Data-Entry-102") || urls[1].ends_with("/JOB/Data-Entry-102"));
    assert!(!urls[1].contains('?'));
    assert!(urls[2].ends_with("/jobseekers/job/Bookkeeper-103"));
}

#[tokio::test]
async fn test_max_pages_limits_discovery() {
    let server = MockServer::start().await;
    mount_listing(&server).await;
    let dir = TempDir::new().unwrap();

    let mut config = create_test_config(&server, dir.path());
    config.scraper.max_pages = Some(1);
    let coordinator = Coordinator::new(config).unwrap();
    let (urls, _) = coordinator.discover().await.unwrap();

    assert_eq!(urls.len(), 2);
    assert!(urls.iter().all(|u| !u.contains("Bookkeeper")));
}

#[tokio::test]
async fn test_full_run_persists_records() {
    let server = MockServer::start().await;
    mount_listing(&server).await;
    mount_all_jobs(&server).await;
    let dir = TempDir::new().unwrap();

    let summary = run_scrape(create_test_config(&server, dir.path()))
        .await
        .unwrap();

    assert_eq!(summary.total, 3);
    assert_eq!(summary.active, 3);
    assert_eq!(summary.failed, 0);
    assert_eq!(summary.success_rate(), 100.0);

    let store = open_store(&dir);
    let record = store.load_job("101").unwrap().expect("record for 101");
    assert_eq!(record.title.as_deref(), Some("Senior Writer"));
    assert_eq!(record.work_type.as_deref(), Some("Full Time"));
    assert_eq!(record.salary_text.as_deref(), Some("$600/month"));
    assert_eq!(record.skills, vec!["Copywriting", "SEO"]);
    assert!(record.is_active);
    assert_eq!(record.status_history.len(), 1);
    assert_eq!(record.status_history[0].status, JobStatus::Active);
    assert_eq!(record.status_history[0].reason, REASON_FIRST_DISCOVERED);

    // Wire field names on disk
    let raw = std::fs::read_to_string(dir.path().join("102.json")).unwrap();
    let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
    assert_eq!(value["job_id"], "102");
    assert_eq!(value["type_of_work"], "Part Time");
    assert_eq!(value["skill_requirements"][0], "Excel");

    assert_eq!(store.load_all_jobs().unwrap().len(), 3);
    assert!(store.load_failure_log().unwrap().is_empty());
}

#[tokio::test]
async fn test_rescrape_detects_unavailable_job() {
    let server = MockServer::start().await;
    mount_listing(&server).await;
    mount_all_jobs(&server).await;
    let dir = TempDir::new().unwrap();
    let config = create_test_config(&server, dir.path());

    run_scrape(config.clone()).await.unwrap();

    server.reset().await;
    mount_listing(&server).await;
    mount_job(
        &server,
        "/jobseekers/job/Senior-Writer-101",
        html(UNAVAILABLE_PAGE),
    )
    .await;
    mount_job(
        &server,
        "/jobseekers/job/Data-Entry-102",
        html(&job_page("Data Entry Clerk", "Part Time", &["Excel"])),
    )
    .await;
    mount_job(
        &server,
        "/jobseekers/job/Bookkeeper-103",
        html(&job_page("Bookkeeper Needed", "Gig", &["QuickBooks"])),
    )
    .await;

    let summary = run_scrape(config).await.unwrap();
    assert_eq!(summary.active, 2);
    assert_eq!(summary.inactive, 1);
    assert_eq!(summary.status_changes, 1);

    let store = open_store(&dir);
    let gone = store.load_job("101").unwrap().unwrap();
    assert!(!gone.is_active);
    assert_eq!(gone.status_history.len(), 2);
    assert_eq!(gone.status_history[0].status, JobStatus::Active);
    assert_eq!(gone.status_history[1].status, JobStatus::Inactive);
    assert_eq!(gone.status_history[1].reason, REASON_BECAME_UNAVAILABLE);
    assert!(gone.status_history[0].timestamp <= gone.status_history[1].timestamp);

    // Unchanged jobs keep a single entry
    let same = store.load_job("102").unwrap().unwrap();
    assert_eq!(same.status_history.len(), 1);
}

#[tokio::test]
async fn test_failed_job_does_not_stop_run() {
    let server = MockServer::start().await;
    mount_listing(&server).await;
    mount_job(
        &server,
        "/jobseekers/job/Senior-Writer-101",
        html(&job_page("Senior Writer", "Full Time", &["SEO"])),
    )
    .await;
    mount_job(
        &server,
        "/jobseekers/job/Data-Entry-102",
        ResponseTemplate::new(500),
    )
    .await;
    mount_job(
        &server,
        "/jobseekers/job/Bookkeeper-103",
        html(&job_page("Bookkeeper Needed", "Gig", &["QuickBooks"])),
    )
    .await;
    let dir = TempDir::new().unwrap();

    let summary = run_scrape(create_test_config(&server, dir.path()))
        .await
        .unwrap();

    assert_eq!(summary.total, 3);
    assert_eq!(summary.active, 2);
    assert_eq!(summary.failed, 1);

    let store = open_store(&dir);
    assert!(store.load_job("101").unwrap().is_some());
    assert!(store.load_job("102").unwrap().is_none());
    assert!(store.load_job("103").unwrap().is_some());

    let failures = store.load_failure_log().unwrap();
    assert_eq!(failures.len(), 1);
    assert!(failures[0].url.contains("Data-Entry-102"));
    assert!(failures[0].error.contains("500"));
}

#[tokio::test]
async fn test_slow_job_times_out_without_stopping_run() {
    let server = MockServer::start().await;
    mount_listing(&server).await;
    mount_job(
        &server,
        "/jobseekers/job/Senior-Writer-101",
        html(&job_page("Senior Writer", "Full Time", &["SEO"])),
    )
    .await;
    mount_job(
        &server,
        "/jobseekers/job/Data-Entry-102",
        html(&job_page("Data Entry Clerk", "Part Time", &["Excel"]))
            .set_delay(Duration::from_secs(3)),
    )
    .await;
    mount_job(
        &server,
        "/jobseekers/job/Bookkeeper-103",
        html(&job_page("Bookkeeper Needed", "Gig", &["QuickBooks"])),
    )
    .await;
    let dir = TempDir::new().unwrap();

    let mut config = create_test_config(&server, dir.path());
    config.http.timeout_secs = 1;
    let summary = run_scrape(config).await.unwrap();

    assert_eq!(summary.total, 3);
    assert_eq!(summary.active, 2);
    assert_eq!(summary.failed, 1);

    let store = open_store(&dir);
    assert!(store.load_job("101").unwrap().is_some());
    assert!(store.load_job("102").unwrap().is_none());
    assert!(store.load_job("103").unwrap().is_some());

    let failures = store.load_failure_log().unwrap();
    assert_eq!(failures.len(), 1);
    assert!(failures[0].url.contains("Data-Entry-102"));
    assert!(failures[0].error.to_lowercase().contains("timeout"));
}

#[tokio::test]
async fn test_limit_jobs_takes_lowest_ids() {
    let server = MockServer::start().await;
    mount_listing(&server).await;
    mount_all_jobs(&server).await;
    let dir = TempDir::new().unwrap();

    let mut config = create_test_config(&server, dir.path());
    config.scraper.limit_jobs = Some(2);
    let summary = run_scrape(config).await.unwrap();

    assert_eq!(summary.discovered, 3);
    assert_eq!(summary.total, 2);

    let store = open_store(&dir);
    assert!(store.load_job("101").unwrap().is_some());
    assert!(store.load_job("102").unwrap().is_some());
    assert!(store.load_job("103").unwrap().is_none());
}

#[tokio::test]
async fn test_empty_listing_is_fatal() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(SEARCH_PATH))
        .respond_with(html("<html><body><p>No jobs today</p></body></html>"))
        .mount(&server)
        .await;
    let dir = TempDir::new().unwrap();

    let result = run_scrape(create_test_config(&server, dir.path())).await;

    assert!(matches!(
        result,
        Err(HarvestError::NothingDiscovered { .. })
    ));
}
