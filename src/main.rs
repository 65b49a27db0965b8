// orbit-ingest: run one ingest crawl and print the JSON result.
//
// RUST_LOG controls verbosity (env_logger syntax). Library tracing events
// are bridged onto the log facade, so one variable covers both.

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use orbit_ingest::{CrawlOptions, FetchOptions, IngestConfig, IngestService};

const USAGE: &str = "\
usage: orbit-ingest [options] <seed-url>

options:
  --max-pages <n>         page budget for the crawl (default 10)
  --pattern <regex>       path pattern for discovered links; repeatable
  --candidates <urls>     comma-separated URLs to fetch instead of the
                          seed-and-discovery crawl
  --rate-limit-ms <ms>    minimum pause between fetches (default 1500)
  --deadline-secs <n>     wall-clock budget for the whole crawl
  --wait-selector <css>   selector to wait for on each page
  --screenshot            capture a JPEG screenshot per page
  --offsite               follow links beyond the seed's site
  --store <path>          SQLite store path (default: platform data dir)
  --chrome <path>         Chrome/Chromium binary to launch
  --headed                show the browser window
  --check                 report ingest freshness for the URL and exit
";

#[derive(Debug)]
struct Cli {
    seed_url: String,
    config: IngestConfig,
    check_only: bool,
}

fn parse_args(mut args: impl Iterator<Item = String>) -> Result<Cli, String> {
    let mut seed_url: Option<String> = None;
    let mut crawl = CrawlOptions::default();
    let mut fetch = FetchOptions::default();
    let mut config = IngestConfig::default();
    let mut patterns: Vec<String> = Vec::new();
    let mut check_only = false;

    fn value(flag: &str, next: Option<String>) -> Result<String, String> {
        next.ok_or_else(|| format!("{flag} expects a value"))
    }

    fn number<T: std::str::FromStr>(flag: &str, raw: &str) -> Result<T, String> {
        raw.parse()
            .map_err(|_| format!("{flag} expects a number, got `{raw}`"))
    }

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--max-pages" => {
                let raw = value(&arg, args.next())?;
                crawl = crawl.with_max_pages(number(&arg, &raw)?);
            }
            "--pattern" => patterns.push(value(&arg, args.next())?),
            "--candidates" => {
                let raw = value(&arg, args.next())?;
                let urls: Vec<String> = raw
                    .split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(str::to_string)
                    .collect();
                if urls.is_empty() {
                    return Err("--candidates expects at least one URL".into());
                }
                crawl = crawl.with_candidate_urls(urls);
            }
            "--rate-limit-ms" => {
                let raw = value(&arg, args.next())?;
                crawl = crawl.with_rate_limit_ms(number(&arg, &raw)?);
            }
            "--deadline-secs" => {
                let raw = value(&arg, args.next())?;
                crawl = crawl.with_deadline(Duration::from_secs(number(&arg, &raw)?));
            }
            "--wait-selector" => {
                fetch = fetch.with_wait_selector(value(&arg, args.next())?);
            }
            "--screenshot" => fetch = fetch.with_screenshot(true),
            "--offsite" => crawl = crawl.with_same_domain_only(false),
            "--store" => {
                config = config.with_store_path(PathBuf::from(value(&arg, args.next())?));
            }
            "--chrome" => {
                config = config.with_chrome_executable(PathBuf::from(value(&arg, args.next())?));
            }
            "--headed" => config = config.with_headed(true),
            "--check" => check_only = true,
            "--help" | "-h" => return Err(String::new()),
            flag if flag.starts_with('-') => {
                return Err(format!("unknown option `{flag}`"));
            }
            _ => {
                if seed_url.replace(arg).is_some() {
                    return Err("expected exactly one seed URL".into());
                }
            }
        }
    }

    let Some(seed_url) = seed_url else {
        return Err("missing seed URL".into());
    };

    crawl = crawl.with_link_patterns(patterns).with_fetch(fetch);
    Ok(Cli {
        seed_url,
        config: config.with_crawl(crawl),
        check_only,
    })
}

#[tokio::main]
async fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = match parse_args(std::env::args().skip(1)) {
        Ok(cli) => cli,
        // An empty message is the help flag, not a usage error.
        Err(msg) if msg.is_empty() => {
            print!("{USAGE}");
            return ExitCode::SUCCESS;
        }
        Err(msg) => {
            eprintln!("orbit-ingest: {msg}\n");
            eprint!("{USAGE}");
            return ExitCode::from(2);
        }
    };

    let service = match IngestService::new(cli.config).await {
        Ok(service) => service,
        Err(e) => {
            eprintln!("orbit-ingest: {e}");
            return ExitCode::FAILURE;
        }
    };

    if cli.check_only {
        let status = match service.cache_check(&cli.seed_url, None).await {
            Ok(status) => status,
            Err(e) => {
                eprintln!("orbit-ingest: {e}");
                return ExitCode::FAILURE;
            }
        };
        match serde_json::to_string_pretty(&status) {
            Ok(json) => println!("{json}"),
            Err(e) => {
                eprintln!("orbit-ingest: {e}");
                return ExitCode::FAILURE;
            }
        }
        return ExitCode::SUCCESS;
    }

    let outcome = service.ingest(&cli.seed_url, Vec::new()).await;
    if let Err(e) = service.shutdown().await {
        eprintln!("orbit-ingest: browser shutdown failed: {e}");
    }

    match outcome {
        Ok(result) => {
            log::info!(
                "ingest {} finished: {}/{} pages, reason {}",
                result.id,
                result.report.pages_succeeded,
                result.report.pages_attempted,
                result.report.stopped_reason
            );
            match serde_json::to_string_pretty(&result) {
                Ok(json) => println!("{json}"),
                Err(e) => {
                    eprintln!("orbit-ingest: {e}");
                    return ExitCode::FAILURE;
                }
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("orbit-ingest: {e}");
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Result<Cli, String> {
        parse_args(args.iter().map(|s| (*s).to_string()))
    }

    #[test]
    fn seed_url_is_required() {
        assert!(parse(&[]).is_err());
        assert!(parse(&["--max-pages", "3"]).is_err());
    }

    #[test]
    fn flags_fold_into_config() {
        let cli = parse(&[
            "--max-pages",
            "3",
            "--pattern",
            "/posts/",
            "--screenshot",
            "https://example.com",
        ])
        .unwrap();
        assert_eq!(cli.seed_url, "https://example.com");
        assert_eq!(cli.config.crawl().max_pages(), 3);
        assert_eq!(cli.config.crawl().link_patterns(), ["/posts/"]);
        assert!(cli.config.crawl().fetch().capture_screenshot());
        assert!(!cli.check_only);
    }

    #[test]
    fn candidates_split_on_commas() {
        let cli = parse(&[
            "--candidates",
            "https://a.example/x, https://a.example/y",
            "https://a.example",
        ])
        .unwrap();
        assert_eq!(
            cli.config.crawl().candidate_urls().unwrap(),
            ["https://a.example/x", "https://a.example/y"]
        );
    }

    #[test]
    fn bad_numbers_are_rejected() {
        let err = parse(&["--max-pages", "many", "https://example.com"]).unwrap_err();
        assert!(err.contains("--max-pages"));
    }

    #[test]
    fn unknown_flags_are_rejected() {
        let err = parse(&["--frobnicate", "https://example.com"]).unwrap_err();
        assert!(err.contains("--frobnicate"));
    }

    #[test]
    fn two_seeds_are_rejected() {
        assert!(parse(&["https://a.example", "https://b.example"]).is_err());
    }
}
