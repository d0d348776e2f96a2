// Command line front for a single search
//
//   flight-search --from BOS,JFK --to SYD --date 2026-01-19 [--date 2026-01-20]
//   flight-search --query '{"origins":["BOS"],"destinations":["SYD"],"dates":["2026-01-19"]}'

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use flight_fanout::{CacheReaper, FlightSearch, HttpOffersProvider, Query, SearchConfig};
use std::sync::Arc;
use tracing::warn;
use tracing_subscriber::EnvFilter;

fn parse_args(mut args: impl Iterator<Item = String>) -> Result<Query> {
    let mut origins = Vec::new();
    let mut destinations = Vec::new();
    let mut dates = Vec::new();

    while let Some(flag) = args.next() {
        let value = args
            .next()
            .with_context(|| format!("missing value for {}", flag))?;

        match flag.as_str() {
            "--query" => {
                let query: Query =
                    serde_json::from_str(&value).context("query is not valid JSON")?;
                return Ok(query);
            }
            "--from" => origins.extend(value.split(',').map(str::to_string)),
            "--to" => destinations.extend(value.split(',').map(str::to_string)),
            "--date" => {
                for date in value.split(',') {
                    let date = NaiveDate::parse_from_str(date.trim(), "%Y-%m-%d")
                        .with_context(|| format!("invalid date {}", date))?;
                    dates.push(date);
                }
            }
            other => bail!("unknown argument {}", other),
        }
    }

    Ok(Query::new(origins, destinations, dates)?)
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with_writer(std::io::stderr)
        .init();

    let query = parse_args(std::env::args().skip(1))?;
    query.validate()?;

    let config = SearchConfig::from_env()?;
    let provider = Arc::new(HttpOffersProvider::new(config.provider.clone()));
    let search = FlightSearch::new(&config, provider);
    let reaper = CacheReaper::spawn(Arc::clone(search.cache()), config.cache.reaper_interval());

    let results = search.search(&query).await;
    reaper.shutdown().await;
    let results = results?;

    for failure in &results.failures {
        warn!(key = %failure.key, error = %failure.error, "lookup skipped");
    }
    println!("{}", serde_json::to_string_pretty(&results.offers)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> impl Iterator<Item = String> {
        list.iter().map(|a| a.to_string()).collect::<Vec<_>>().into_iter()
    }

    #[test]
    fn test_parse_flags() {
        let query = parse_args(args(&[
            "--from", "bos,JFK", "--to", "SYD", "--date", "2026-01-19,2026-01-20",
        ]))
        .unwrap();
        assert_eq!(query.origins, vec!["bos", "JFK"]);
        assert_eq!(query.key_count(), 4);
    }

    #[test]
    fn test_parse_json_query() {
        let query = parse_args(args(&[
            "--query",
            r#"{"origins":["BOS"],"destinations":["SYD"],"dates":["2026-01-19"]}"#,
        ]))
        .unwrap();
        assert_eq!(query.key_count(), 1);
    }

    #[test]
    fn test_parse_rejects_bad_input() {
        assert!(parse_args(args(&["--from", "BOS", "--to", "SYD"])).is_err());
        assert!(parse_args(args(&["--from"])).is_err());
        assert!(parse_args(args(&["--via", "DOH"])).is_err());
        assert!(parse_args(args(&["--date", "19/01/2026"])).is_err());
    }
}
