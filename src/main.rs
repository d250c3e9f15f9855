use std::env;
use std::io::{self, BufRead, Write};
use std::sync::Arc;

use clothing_recommender::crawlers::HttpFetcher;
use clothing_recommender::crawlers::amazon::WebstoreCrawlerAmazon;
use clothing_recommender::models::config::RecommenderConfig;
use clothing_recommender::processing::embedding::{FastEmbedder, SimilarityScorer};
use clothing_recommender::processing::search::{ProductSearch, SearchReport};
use clothing_recommender::processing::text::TextNormalizer;

/// Prints a report either as JSON or as one URL per line.
fn print_report(report: Option<SearchReport>, json: bool) {
    let Some(report) = report else {
        println!("please enter a valid search string");
        return;
    };
    if json {
        match serde_json::to_string_pretty(&report) {
            Ok(text) => println!("{text}"),
            Err(e) => log::error!("Failed to serialize report: {e}"),
        }
    } else if report.records.is_empty() {
        println!("no matching products found");
    } else {
        for url in report.urls() {
            println!("{url}");
        }
    }
}

async fn run_once(search: &ProductSearch, query: &str, json: bool) -> bool {
    match search.search(query).await {
        Ok(report) => {
            print_report(report, json);
            true
        }
        Err(e) => {
            log::error!("Search failed: {e}");
            false
        }
    }
}

fn prompt(message: &str, lines: &mut impl Iterator<Item = io::Result<String>>) -> Option<String> {
    print!("{message}");
    io::stdout().flush().ok();
    lines.next()?.ok()
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    env_logger::init_from_env(env_logger::Env::default().default_filter_or("info"));

    let config = match RecommenderConfig::load() {
        Ok(config) => config,
        Err(e) => {
            log::error!("{e}");
            std::process::exit(1);
        }
    };
    let json = env::var("RECOMMENDER_OUTPUT").is_ok_and(|value| value == "json");

    let fetcher = match HttpFetcher::new() {
        Ok(fetcher) => Arc::new(fetcher),
        Err(e) => {
            log::error!("{e}");
            std::process::exit(1);
        }
    };
    let crawler = match WebstoreCrawlerAmazon::new(&config, fetcher) {
        Ok(crawler) => crawler,
        Err(e) => {
            log::error!("{e}");
            std::process::exit(1);
        }
    };
    let embedder = match FastEmbedder::try_new(&config.embedding) {
        Ok(embedder) => Arc::new(embedder),
        Err(e) => {
            log::error!("{e}");
            std::process::exit(1);
        }
    };
    let scorer = SimilarityScorer::new(embedder, TextNormalizer::new(&config.normalizer));
    let search = ProductSearch::new(Box::new(crawler), scorer, config.top_k);

    let args: Vec<String> = env::args().skip(1).collect();
    if !args.is_empty() {
        if !run_once(&search, &args.join(" "), json).await {
            std::process::exit(1);
        }
        return;
    }

    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();
    loop {
        let Some(query) = prompt("Enter the search string: ", &mut lines) else {
            break;
        };
        run_once(&search, &query, json).await;

        let Some(flag) = prompt(
            "If you want to search another product press 1 else 0: ",
            &mut lines,
        ) else {
            break;
        };
        if flag.trim() == "0" {
            break;
        }
    }
}
