use std::rc::Rc;

use anyhow::Result;
use chrono::{DateTime, NaiveDate, Utc};
use log::info;
use tokio::io::AsyncBufReadExt;

use pix_scout::config::Config;
use pix_scout::coordinator;
use pix_scout::observable::{bind_bidirectional, combine, Observable};
use pix_scout::search_client::SearchClient;
use pix_scout::search_orchestrator::{OrchestratorSettings, SearchOrchestrator};

fn main() -> Result<()> {
    env_logger::init();

    let config = Config::from_env().map_err(|error| anyhow::anyhow!(error.to_string()))?;
    info!("Searching against {}", config.api_host);

    coordinator::run(session(config))?
}

/// A minimal terminal display surface over the orchestrator's downstream
/// interface: a bound text field, a status line, a result list and error
/// notifications. Lines starting with '/' drive the filter settings; anything
/// else is typed into the search field.
async fn session(config: Config) -> Result<()> {
    let client = Rc::new(SearchClient::new(&config));
    let orchestrator = SearchOrchestrator::new(client, OrchestratorSettings::from(&config));

    let text_field = Observable::new(String::new());
    bind_bidirectional(&text_field, &orchestrator.search_text);

    let status = combine(
        &orchestrator.search_in_progress,
        &orchestrator.search_results,
        |busy, records| {
            if *busy {
                "searching...".to_string()
            } else {
                format!("{} photos", records.len())
            }
        },
    );
    status.subscribe(|line| println!("[{}]", line));

    orchestrator.search_results.subscribe(|records| {
        for record in records {
            println!(
                "  {}  {}  {}",
                record.created_at.format("%Y-%m-%d"),
                record.title,
                record.image_url
            );
        }
    });
    orchestrator
        .error_messages
        .subscribe(|message: &String| println!("something went wrong: {}", message));

    // The stand-in for the red-text feedback a real input widget would show.
    orchestrator.valid_search_text.subscribe(|valid| {
        if !*valid {
            println!("(query too short to search)");
        }
    });

    println!("Type a query and press enter.");
    println!("/cc toggles creative-commons, /dates toggles the date filter,");
    println!("/min YYYY-MM-DD and /max YYYY-MM-DD move the date bounds.");
    let mut lines = tokio::io::BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        match line.as_str() {
            "/cc" => {
                let flipped = !orchestrator.creative_commons_only.get();
                orchestrator.creative_commons_only.set(flipped);
                println!("creative commons only: {}", flipped);
            }
            "/dates" => {
                let flipped = !orchestrator.date_filter_enabled.get();
                orchestrator.date_filter_enabled.set(flipped);
                println!("date filter: {}", flipped);
            }
            _ if line.starts_with("/min ") || line.starts_with("/max ") => {
                let bound = if line.starts_with("/min ") {
                    &orchestrator.dates.min_date
                } else {
                    &orchestrator.dates.max_date
                };
                match parse_day(&line[5..]) {
                    Some(date) => {
                        bound.set(date);
                        println!(
                            "date range: {} to {}",
                            orchestrator.dates.min_date.get().format("%Y-%m-%d"),
                            orchestrator.dates.max_date.get().format("%Y-%m-%d")
                        );
                    }
                    None => println!("expected a date like 2015-11-08"),
                }
            }
            _ => text_field.set(line),
        }
    }
    Ok(())
}

fn parse_day(input: &str) -> Option<DateTime<Utc>> {
    let day = NaiveDate::parse_from_str(input.trim(), "%Y-%m-%d").ok()?;
    Some(day.and_hms_opt(0, 0, 0)?.and_utc())
}
