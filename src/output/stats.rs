//! Statistics over the persisted job corpus
//!
//! Pure aggregation over records already on disk: activity, skill demand,
//! salary figures, scrape timing, and employers that post more than once.

use crate::state::JobRecord;
use crate::storage::{JsonStore, Storage};
use crate::HarvestError;
use chrono::{DateTime, Datelike, Timelike, Utc, Weekday};
use regex::Regex;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::sync::LazyLock;

/// Number of skills kept in the frequency table
pub const TOP_SKILLS: usize = 50;

/// Number of multi-posting employers listed
pub const TOP_EMPLOYERS: usize = 20;

const NEGOTIABLE_TERMS: [&str; 5] = ["negotiable", "depending", "tbd", "competitive", "flexible"];
const HOURLY_TERMS: [&str; 3] = ["hour", "/hr", "hourly"];
const MONTHLY_TERMS: [&str; 3] = ["month", "/mo", "monthly"];
const PROJECT_TERMS: [&str; 3] = ["project", "per task", "per clip"];

const WEEKDAYS: [Weekday; 7] = [
    Weekday::Mon,
    Weekday::Tue,
    Weekday::Wed,
    Weekday::Thu,
    Weekday::Fri,
    Weekday::Sat,
    Weekday::Sun,
];

static AMOUNT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\$?(\d+(?:,\d+)*(?:\.\d+)?)").expect("valid salary amount pattern")
});
static EMPLOYER_SLUG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"/job/([^-]*)").expect("valid employer slug pattern"));

/// Statistics for one corpus
#[derive(Debug, Clone, Serialize)]
pub struct CorpusStatistics {
    pub generated_at: DateTime<Utc>,
    pub overview: Overview,
    pub skills: SkillStats,
    pub salary: SalaryStats,
    pub timing: TimingStats,
    pub employers: EmployerStats,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Overview {
    pub total_jobs: usize,
    pub active_jobs: usize,
    pub inactive_jobs: usize,
    /// Fraction of jobs currently active
    pub activity_rate: f64,
    pub work_type_distribution: BTreeMap<String, usize>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkillCount {
    pub skill: String,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SkillStats {
    pub total_mentions: usize,
    pub unique_skills: usize,
    /// Most frequent skills, ties broken by name
    pub top_skills: Vec<SkillCount>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AmountSummary {
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub median: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PaymentStructures {
    pub hourly: usize,
    pub monthly: usize,
    pub project: usize,
    pub unspecified: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SalaryStats {
    /// Jobs with any salary text
    pub jobs_with_salary: usize,
    /// Every numeric amount found across all salary texts
    pub amounts_found: usize,
    pub amounts: Option<AmountSummary>,
    pub payment_structures: PaymentStructures,
    pub negotiable_jobs: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DayCount {
    pub day: String,
    pub jobs: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TimingStats {
    /// Jobs per UTC hour of `scraped_at`
    pub by_hour: BTreeMap<u32, usize>,
    /// Jobs per weekday of `scraped_at`, Monday first
    pub by_weekday: Vec<DayCount>,
    /// History entries beyond each record's first
    pub status_changes: usize,
    pub jobs_with_status_changes: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EmployerCount {
    pub employer: String,
    pub jobs: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EmployerStats {
    pub total_employers: usize,
    pub multi_posting_employers: usize,
    pub multi_posting_percentage: f64,
    pub top_multi_posters: Vec<EmployerCount>,
}

/// Loads every readable record from the store
///
/// # Returns
///
/// * `Ok(Vec<JobRecord>)` - At least one record
/// * `Err(HarvestError)` - `EmptyCorpus` when nothing could be loaded
pub fn load_corpus(store: &JsonStore) -> Result<Vec<JobRecord>, HarvestError> {
    let records = store.load_all_jobs()?;
    if records.is_empty() {
        return Err(HarvestError::EmptyCorpus {
            dir: store.dir().display().to_string(),
        });
    }

    tracing::info!(
        "Loaded {} job records from {}",
        records.len(),
        store.dir().display()
    );
    Ok(records)
}

/// Computes statistics over a set of records
pub fn compute_statistics(records: &[JobRecord]) -> CorpusStatistics {
    CorpusStatistics {
        generated_at: Utc::now(),
        overview: overview(records),
        skills: skill_stats(records),
        salary: salary_stats(records),
        timing: timing_stats(records),
        employers: employer_stats(records),
    }
}

fn overview(records: &[JobRecord]) -> Overview {
    let total_jobs = records.len();
    let active_jobs = records.iter().filter(|r| r.is_active).count();

    let mut work_type_distribution = BTreeMap::new();
    for record in records {
        let work_type = record.work_type.as_deref().unwrap_or("Unspecified");
        *work_type_distribution
            .entry(work_type.to_string())
            .or_insert(0) += 1;
    }

    Overview {
        total_jobs,
        active_jobs,
        inactive_jobs: total_jobs - active_jobs,
        activity_rate: ratio(active_jobs, total_jobs),
        work_type_distribution,
    }
}

fn skill_stats(records: &[JobRecord]) -> SkillStats {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for skill in records.iter().flat_map(|r| &r.skills) {
        *counts.entry(skill.as_str()).or_insert(0) += 1;
    }

    let total_mentions = counts.values().sum();
    let unique_skills = counts.len();
    let mut top_skills: Vec<SkillCount> = counts
        .into_iter()
        .map(|(skill, count)| SkillCount {
            skill: skill.to_string(),
            count,
        })
        .collect();
    top_skills.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.skill.cmp(&b.skill)));
    top_skills.truncate(TOP_SKILLS);

    SkillStats {
        total_mentions,
        unique_skills,
        top_skills,
    }
}

/// Numeric amounts in a salary text, commas stripped
pub fn parse_amounts(salary: &str) -> Vec<f64> {
    AMOUNT
        .captures_iter(salary)
        .filter_map(|caps| caps[1].replace(',', "").parse().ok())
        .collect()
}

fn salary_stats(records: &[JobRecord]) -> SalaryStats {
    let mut amounts = Vec::new();
    let mut payment_structures = PaymentStructures::default();
    let mut jobs_with_salary = 0;
    let mut negotiable_jobs = 0;

    for record in records {
        let Some(salary) = record.salary_text.as_deref() else {
            continue;
        };
        let salary = salary.to_lowercase();
        if salary.trim().is_empty() {
            continue;
        }
        jobs_with_salary += 1;
        amounts.extend(parse_amounts(&salary));

        if contains_any(&salary, &NEGOTIABLE_TERMS) {
            negotiable_jobs += 1;
        }

        if contains_any(&salary, &HOURLY_TERMS) {
            payment_structures.hourly += 1;
        } else if contains_any(&salary, &MONTHLY_TERMS) {
            payment_structures.monthly += 1;
        } else if contains_any(&salary, &PROJECT_TERMS) {
            payment_structures.project += 1;
        } else {
            payment_structures.unspecified += 1;
        }
    }

    SalaryStats {
        jobs_with_salary,
        amounts_found: amounts.len(),
        amounts: summarize_amounts(amounts),
        payment_structures,
        negotiable_jobs,
    }
}

fn summarize_amounts(mut amounts: Vec<f64>) -> Option<AmountSummary> {
    if amounts.is_empty() {
        return None;
    }
    amounts.sort_by(f64::total_cmp);

    let n = amounts.len();
    let median = if n % 2 == 1 {
        amounts[n / 2]
    } else {
        (amounts[n / 2 - 1] + amounts[n / 2]) / 2.0
    };

    Some(AmountSummary {
        min: amounts[0],
        max: amounts[n - 1],
        mean: amounts.iter().sum::<f64>() / n as f64,
        median,
    })
}

fn timing_stats(records: &[JobRecord]) -> TimingStats {
    let mut by_hour = BTreeMap::new();
    let mut weekday_counts = [0usize; 7];
    let mut status_changes = 0;
    let mut jobs_with_status_changes = 0;

    for record in records {
        *by_hour.entry(record.scraped_at.hour()).or_insert(0) += 1;
        weekday_counts[record.scraped_at.weekday().num_days_from_monday() as usize] += 1;

        let changes = record.status_history.len().saturating_sub(1);
        status_changes += changes;
        if changes > 0 {
            jobs_with_status_changes += 1;
        }
    }

    let by_weekday = WEEKDAYS
        .iter()
        .zip(weekday_counts)
        .map(|(day, jobs)| DayCount {
            day: day.to_string(),
            jobs,
        })
        .collect();

    TimingStats {
        by_hour,
        by_weekday,
        status_changes,
        jobs_with_status_changes,
    }
}

/// Best-effort employer key for a record
///
/// Uses the first token of the URL slug, then the start of the title, then
/// the job id.
pub fn infer_employer(record: &JobRecord) -> String {
    if let Some(slug) = EMPLOYER_SLUG
        .captures(&record.source_url)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
        .filter(|slug| !slug.is_empty())
    {
        return slug.chars().take(10).collect();
    }

    match record.title.as_deref().filter(|t| !t.is_empty()) {
        Some(title) => title.chars().take(20).collect(),
        None => format!("unknown_{}", record.id),
    }
}

fn employer_stats(records: &[JobRecord]) -> EmployerStats {
    let mut counts: HashMap<String, usize> = HashMap::new();
    for record in records {
        *counts.entry(infer_employer(record)).or_insert(0) += 1;
    }

    let total_employers = counts.len();
    let mut multi_posters: Vec<EmployerCount> = counts
        .into_iter()
        .filter(|(_, jobs)| *jobs > 1)
        .map(|(employer, jobs)| EmployerCount { employer, jobs })
        .collect();
    multi_posters.sort_by(|a, b| b.jobs.cmp(&a.jobs).then_with(|| a.employer.cmp(&b.employer)));

    let multi_posting_employers = multi_posters.len();
    multi_posters.truncate(TOP_EMPLOYERS);

    EmployerStats {
        total_employers,
        multi_posting_employers,
        multi_posting_percentage: ratio(multi_posting_employers, total_employers) * 100.0,
        top_multi_posters: multi_posters,
    }
}

fn contains_any(text: &str, terms: &[&str]) -> bool {
    terms.iter().any(|term| text.contains(term))
}

fn ratio(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        0.0
    } else {
        part as f64 / whole as f64
    }
}

/// Writes statistics as pretty-printed JSON
pub fn write_statistics(stats: &CorpusStatistics, path: &Path) -> Result<(), HarvestError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    let content = serde_json::to_string_pretty(stats)?;
    std::fs::write(path, content)?;
    tracing::info!("Statistics written to {}", path.display());
    Ok(())
}

/// Prints statistics to stdout in a formatted manner
///
/// # Arguments
///
/// * `stats` - The statistics to display
pub fn print_statistics(stats: &CorpusStatistics) {
    println!("=== Corpus Statistics ===\n");

    let overview = &stats.overview;
    println!("Overview:");
    println!("  Total jobs: {}", overview.total_jobs);
    println!("  Active jobs: {}", overview.active_jobs);
    println!("  Inactive jobs: {}", overview.inactive_jobs);
    println!("  Activity rate: {:.1}%", overview.activity_rate * 100.0);
    println!();

    println!("Work Types:");
    let mut work_types: Vec<_> = overview.work_type_distribution.iter().collect();
    work_types.sort_by(|a, b| b.1.cmp(a.1));
    for (work_type, count) in work_types {
        println!("  {}: {}", work_type, count);
    }
    println!();

    println!(
        "Top Skills ({} unique, {} mentions):",
        stats.skills.unique_skills, stats.skills.total_mentions
    );
    for entry in stats.skills.top_skills.iter().take(10) {
        println!("  {}: {}", entry.skill, entry.count);
    }
    println!();

    let salary = &stats.salary;
    println!("Salary ({} jobs with salary text):", salary.jobs_with_salary);
    if let Some(amounts) = &salary.amounts {
        println!(
            "  Amounts: min {:.2}, max {:.2}, mean {:.2}, median {:.2}",
            amounts.min, amounts.max, amounts.mean, amounts.median
        );
    }
    let structures = &salary.payment_structures;
    println!(
        "  Hourly: {}, Monthly: {}, Project: {}, Unspecified: {}",
        structures.hourly, structures.monthly, structures.project, structures.unspecified
    );
    println!("  Negotiable: {}", salary.negotiable_jobs);
    println!();

    println!("Timing:");
    if let Some((hour, count)) = stats.timing.by_hour.iter().max_by_key(|(_, count)| **count) {
        println!("  Busiest scrape hour (UTC): {:02}:00 ({} jobs)", hour, count);
    }
    println!(
        "  Status changes: {} across {} jobs",
        stats.timing.status_changes, stats.timing.jobs_with_status_changes
    );
    println!();

    let employers = &stats.employers;
    println!(
        "Employers: {} inferred, {} post multiple jobs ({:.1}%)",
        employers.total_employers,
        employers.multi_posting_employers,
        employers.multi_posting_percentage
    );
    for entry in employers.top_multi_posters.iter().take(5) {
        println!("  - {}: {} jobs", entry.employer, entry.jobs);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::{JobStatus, StatusEntry};
    use chrono::TimeZone;
    use tempfile::TempDir;

    fn create_test_record(id: &str, slug: &str) -> JobRecord {
        let mut record = JobRecord::new(id, format!("https://example.com/jobseekers/job/{}-{}", slug, id));
        record.scraped_at = Utc.with_ymd_and_hms(2025, 6, 2, 9, 30, 0).unwrap();
        record
    }

    fn create_test_corpus() -> Vec<JobRecord> {
        let mut first = create_test_record("1", "Acme-Writer");
        first.work_type = Some("Full Time".to_string());
        first.salary_text = Some("$800 - $1,200 per month".to_string());
        first.skills = vec!["SEO".to_string(), "Copywriting".to_string()];
        first.status_history = vec![StatusEntry::now(JobStatus::Active, "first discovered")];

        let mut second = create_test_record("2", "Acme-Editor");
        second.work_type = Some("Part Time".to_string());
        second.salary_text = Some("$5/hour, negotiable".to_string());
        second.skills = vec!["SEO".to_string()];
        second.is_active = false;
        second.status_history = vec![
            StatusEntry::now(JobStatus::Active, "first discovered"),
            StatusEntry::now(JobStatus::Inactive, "became unavailable during re-scrape"),
        ];

        let mut third = create_test_record("3", "Globex-Assistant");
        third.salary_text = Some("TBD".to_string());
        third.skills = vec!["Excel".to_string()];

        vec![first, second, third]
    }

    #[test]
    fn test_overview() {
        let stats = compute_statistics(&create_test_corpus());

        assert_eq!(stats.overview.total_jobs, 3);
        assert_eq!(stats.overview.active_jobs, 2);
        assert_eq!(stats.overview.inactive_jobs, 1);
        assert_eq!(stats.overview.work_type_distribution["Full Time"], 1);
        assert_eq!(stats.overview.work_type_distribution["Unspecified"], 1);
    }

    #[test]
    fn test_skill_frequency_ties_broken_by_name() {
        let stats = compute_statistics(&create_test_corpus());

        assert_eq!(stats.skills.total_mentions, 4);
        assert_eq!(stats.skills.unique_skills, 3);
        let names: Vec<&str> = stats.skills.top_skills.iter().map(|s| s.skill.as_str()).collect();
        assert_eq!(names, vec!["SEO", "Copywriting", "Excel"]);
    }

    #[test]
    fn test_salary_stats() {
        let stats = compute_statistics(&create_test_corpus());
        let salary = &stats.salary;

        assert_eq!(salary.jobs_with_salary, 3);
        assert_eq!(salary.amounts_found, 3);
        let amounts = salary.amounts.as_ref().unwrap();
        assert_eq!(amounts.min, 5.0);
        assert_eq!(amounts.max, 1200.0);
        assert_eq!(amounts.median, 800.0);
        assert_eq!(
            salary.payment_structures,
            PaymentStructures {
                hourly: 1,
                monthly: 1,
                project: 0,
                unspecified: 1,
            }
        );
        assert_eq!(salary.negotiable_jobs, 2);
    }

    #[test]
    fn test_parse_amounts() {
        assert_eq!(parse_amounts("$1,500.50 to $2,000"), vec![1500.5, 2000.0]);
        assert!(parse_amounts("competitive").is_empty());
    }

    #[test]
    fn test_median_of_even_count() {
        let summary = summarize_amounts(vec![4.0, 1.0, 3.0, 2.0]).unwrap();
        assert_eq!(summary.median, 2.5);
        assert_eq!(summary.mean, 2.5);
        assert!(summarize_amounts(Vec::new()).is_none());
    }

    #[test]
    fn test_timing_stats() {
        let stats = compute_statistics(&create_test_corpus());

        assert_eq!(stats.timing.by_hour.get(&9), Some(&3));
        assert_eq!(stats.timing.by_weekday[0].day, "Mon");
        assert_eq!(stats.timing.by_weekday[0].jobs, 3);
        assert_eq!(stats.timing.status_changes, 1);
        assert_eq!(stats.timing.jobs_with_status_changes, 1);
    }

    #[test]
    fn test_employer_inference() {
        let record = create_test_record("7", "Acme-Writer");
        assert_eq!(infer_employer(&record), "Acme");

        let mut bare = JobRecord::new("8", "https://example.com/jobseekers/view/8");
        bare.title = Some("A very long job title that keeps going".to_string());
        assert_eq!(infer_employer(&bare), "A very long job titl");

        bare.title = None;
        assert_eq!(infer_employer(&bare), "unknown_8");
    }

    #[test]
    fn test_employer_stats() {
        let stats = compute_statistics(&create_test_corpus());

        assert_eq!(stats.employers.total_employers, 2);
        assert_eq!(stats.employers.multi_posting_employers, 1);
        assert_eq!(stats.employers.top_multi_posters[0].employer, "Acme");
        assert_eq!(stats.employers.top_multi_posters[0].jobs, 2);
        assert!((stats.employers.multi_posting_percentage - 50.0).abs() < 1e-9);
    }

    #[test]
    fn test_load_corpus_empty_is_error() {
        let dir = TempDir::new().unwrap();
        let store = JsonStore::new(dir.path(), "failed_jobs.json").unwrap();

        let result = load_corpus(&store);
        assert!(matches!(result, Err(HarvestError::EmptyCorpus { .. })));
    }

    #[test]
    fn test_write_statistics() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("reports").join("stats.json");
        let stats = compute_statistics(&create_test_corpus());

        write_statistics(&stats, &path).unwrap();

        let value: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(value["overview"]["total_jobs"], 3);
        assert_eq!(value["skills"]["top_skills"][0]["skill"], "SEO");
    }
}
