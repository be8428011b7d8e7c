//! Static placeholder postings served when no live provider answers.
//! They carry `source = "fallback"` and are never cached or stored.

use chrono::{DateTime, Utc};

use crate::models::job::CanonicalJob;
use crate::providers::normalize::{canonicalize, RawPosting};

pub const FALLBACK_SOURCE: &str = "fallback";

fn posting(id: &str, title: &str, company: &str, location: &str, description: &str) -> RawPosting {
    RawPosting {
        native_id: id.to_string(),
        title: title.to_string(),
        company: company.to_string(),
        location: location.to_string(),
        description: description.to_string(),
        ..Default::default()
    }
}

pub fn fallback_jobs(now: DateTime<Utc>) -> Vec<CanonicalJob> {
    let postings = vec![
        posting(
            "1",
            "Python Backend Developer",
            "Sample Tech (placeholder)",
            "Cairo, Egypt",
            "Build APIs with Python, Django and PostgreSQL. Docker a plus. 2+ years of experience.",
        ),
        posting(
            "2",
            "Data Analyst",
            "Sample Analytics (placeholder)",
            "Nairobi, Kenya",
            "Analyse business data with SQL, Excel and Power BI. Strong communication skills.",
        ),
        posting(
            "3",
            "Full Stack Engineer",
            "Sample Remote Co (placeholder)",
            "Remote",
            "React, TypeScript and Node.js across the stack. Fully remote team.",
        ),
        posting(
            "4",
            "Junior Mobile Developer",
            "Sample Apps (placeholder)",
            "Dubai, United Arab Emirates",
            "Flutter and Android apps, Git workflow, agile team.",
        ),
    ];
    let count = postings.len();
    canonicalize(FALLBACK_SOURCE, postings, count, now)
}
