//! CLI integration tests.
//!
//! Covers config loading, timeframe resolution, and whole commands run
//! against INI, CSV and JSON files in a temp directory.

mod common;

use common::*;
use samscreen::adapters::file_config_adapter::FileConfigAdapter;
use samscreen::cli::{self, Cli, Command};
use samscreen::domain::breakout::ScanContext;
use samscreen::domain::query::QueryState;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tempfile::TempDir;

fn write_temp_ini(content: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file.flush().unwrap();
    file
}

// ExitCode doesn't implement PartialEq, so compare debug reports.
fn assert_exit(actual: ExitCode, expected: u8) {
    assert_eq!(
        format!("{actual:?}"),
        format!("{:?}", ExitCode::from(expected)),
        "unexpected exit code"
    );
}

const QUERY_JSON: &str = r#"{
    "name": "above resistance",
    "groups": [{
        "id": "daily",
        "logic": "AND",
        "timeframe": "1d",
        "conditions": [
            {"leftIndicator": "close", "operator": "greater_than", "rightValue": 103},
            {"leftIndicator": "sma", "leftParams": {"period": 10},
             "operator": "greater_than", "rightValue": "90"}
        ]
    }]
}"#;

/// A workspace with `config.ini`, `query.json` and a `data/` directory
/// holding AAA (breakout) and BBB (flat) daily bars.
fn workspace(config: &str) -> (TempDir, PathBuf, PathBuf) {
    let dir = TempDir::new().unwrap();
    let data = dir.path().join("data");
    std::fs::create_dir(&data).unwrap();
    write_bars_csv(&data, "AAA", "1d", &consolidation_fixture(104.03, 1325.0, 550.0));
    write_bars_csv(&data, "BBB", "1d", &bars_from_closes(&vec![50.0; 70]));

    let config_path = dir.path().join("config.ini");
    std::fs::write(&config_path, config).unwrap();
    let query_path = dir.path().join("query.json");
    std::fs::write(&query_path, QUERY_JSON).unwrap();
    (dir, config_path, query_path)
}

mod config_loading {
    use super::*;

    #[test]
    fn load_config_reads_ini() {
        let file = write_temp_ini("[data]\ndir = /var/bars\n");
        let config = cli::load_config(file.path()).unwrap();
        assert_eq!(config.data_dir(file.path()), Some(PathBuf::from("/var/bars")));
    }

    #[test]
    fn load_config_missing_file_is_config_error() {
        let code = cli::load_config(Path::new("/nonexistent/screen.ini")).unwrap_err();
        assert_exit(code, 2);
    }

    #[test]
    fn data_adapter_requires_data_dir() {
        let config = FileConfigAdapter::from_string("[scan]\nsymbols = BHP\n").unwrap();
        assert!(cli::data_adapter(&config, Path::new("config.ini")).is_err());
    }

    #[test]
    fn listing_timeframe_prefers_config() {
        let query: QueryState = serde_json::from_str(QUERY_JSON).unwrap();

        let config = FileConfigAdapter::from_string("[scan]\ntimeframes = 1w, 1d\n").unwrap();
        assert_eq!(cli::listing_timeframe(&config, &query), "1w");

        let config = FileConfigAdapter::from_string("[data]\ndir = d\n").unwrap();
        assert_eq!(cli::listing_timeframe(&config, &query), "1d");
        assert_eq!(cli::listing_timeframe(&config, &QueryState::default()), "1d");
    }

    #[test]
    fn breakout_timeframe_override_wins() {
        let config = FileConfigAdapter::from_string("[breakout]\ntimeframe = 1w\n").unwrap();
        assert_eq!(cli::breakout_timeframe(&config, None), "1w");
        assert_eq!(cli::breakout_timeframe(&config, Some("1h")), "1h");

        let empty = FileConfigAdapter::from_string("[data]\ndir = d\n").unwrap();
        assert_eq!(cli::breakout_timeframe(&empty, None), "1d");
    }
}

mod argument_parsing {
    use super::*;
    use clap::Parser;

    #[test]
    fn breakout_arguments() {
        let cli = Cli::try_parse_from([
            "samscreen",
            "breakout",
            "--config",
            "c.ini",
            "--context",
            "Positional",
            "--diagnose",
        ])
        .unwrap();
        match cli.command {
            Command::Breakout {
                context,
                timeframe,
                diagnose,
                ..
            } => {
                assert_eq!(context, Some(ScanContext::Positional));
                assert_eq!(timeframe, None);
                assert!(diagnose);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn scan_as_of_must_be_a_date() {
        assert!(
            Cli::try_parse_from(["samscreen", "scan", "-c", "c.ini", "-q", "q.json", "--as-of", "yesterday"])
                .is_err()
        );
        assert!(
            Cli::try_parse_from(["samscreen", "scan", "-c", "c.ini", "-q", "q.json", "--as-of", "2024-03-01"])
                .is_ok()
        );
    }

    #[test]
    fn unknown_context_is_rejected() {
        assert!(
            Cli::try_parse_from(["samscreen", "breakout", "-c", "c.ini", "--context", "intraday"])
                .is_err()
        );
    }
}

mod end_to_end {
    use super::*;

    #[test]
    fn scan_command_succeeds() {
        let (_dir, config, query) = workspace("[data]\ndir = data\n");
        let code = cli::run(Cli {
            command: Command::Scan {
                config,
                query,
                as_of: None,
            },
        });
        assert_exit(code, 0);
    }

    #[test]
    fn scan_with_only_unknown_symbols_is_no_data() {
        let (_dir, config, query) = workspace("[data]\ndir = data\n[scan]\nsymbols = ZZZ\n");
        let code = cli::run(Cli {
            command: Command::Scan {
                config,
                query,
                as_of: None,
            },
        });
        assert_exit(code, 5);
    }

    #[test]
    fn scan_with_bad_query_file_is_query_error() {
        let (dir, config, _) = workspace("[data]\ndir = data\n");
        let query = dir.path().join("broken.json");
        std::fs::write(&query, "{\"groups\": [").unwrap();
        let code = cli::run(Cli {
            command: Command::Scan {
                config,
                query,
                as_of: None,
            },
        });
        assert_exit(code, 4);
    }

    #[test]
    fn breakout_command_succeeds() {
        let (_dir, config, _) = workspace("[data]\ndir = data\n[breakout]\ncontext = swing\n");
        let code = cli::run(Cli {
            command: Command::Breakout {
                config,
                context: None,
                timeframe: None,
                diagnose: true,
            },
        });
        assert_exit(code, 0);
    }

    #[test]
    fn breakout_with_invalid_thresholds_is_config_error() {
        let (_dir, config, _) = workspace(
            "[data]\ndir = data\n[breakout.swing]\nconsolidation_min_days = 40\n",
        );
        let code = cli::run(Cli {
            command: Command::Breakout {
                config,
                context: None,
                timeframe: None,
                diagnose: false,
            },
        });
        assert_exit(code, 2);
    }

    #[test]
    fn validate_command_reports_issues() {
        let (dir, _, query) = workspace("[data]\ndir = data\n");
        assert_exit(cli::run(Cli { command: Command::Validate { query } }), 0);

        let bad = dir.path().join("bad.json");
        std::fs::write(
            &bad,
            r#"{"groups": [{"conditions": [{"leftIndicator": "nope", "operator": "greater_than", "rightValue": 1}]}]}"#,
        )
        .unwrap();
        assert_exit(cli::run(Cli { command: Command::Validate { query: bad } }), 4);
    }

    #[test]
    fn list_symbols_command() {
        let (_dir, config, _) = workspace("[data]\ndir = data\n");
        let code = cli::run(Cli {
            command: Command::ListSymbols {
                config: config.clone(),
                timeframe: "1d".into(),
            },
        });
        assert_exit(code, 0);

        let code = cli::run(Cli {
            command: Command::ListSymbols {
                config: PathBuf::from("/nonexistent/config.ini"),
                timeframe: "1d".into(),
            },
        });
        assert_exit(code, 2);
    }
}
