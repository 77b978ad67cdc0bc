use crate::CLAP_STYLING;
use clap::{arg, command};

pub(crate) fn command_argument_builder() -> clap::Command {
    clap::Command::new("webprobe")
        .version(env!("CARGO_PKG_VERSION"))
        .bin_name("webprobe")
        .styles(CLAP_STYLING)
        .arg(
            arg!(-q --"quiet" "Suppress banner and non-essential output")
                .required(false)
                .global(true),
        )
        .subcommand_required(false)
        .subcommand(
            command!("scan")
                .about(
                    "Crawl a site, probe every discovered URL for XSS, SQL injection and open \
                redirects, and audit its security headers.",
                )
                .arg(
                    arg!(-u --"url" <URL>)
                        .required(true)
                        .help("The target URL (http:// is assumed if no scheme is given)"),
                )
                .arg(
                    arg!(-o --"output" <PATH>)
                        .required(false)
                        .help("Write the JSON report to this file")
                        .value_parser(clap::value_parser!(String)),
                )
                .arg(
                    arg!(-c --"cookies" <PATH>)
                        .required(false)
                        .help("File containing cookies as 'name=value; name2=value2'")
                        .value_parser(clap::value_parser!(String)),
                )
                .arg(
                    arg!(-t --"threads" <NUM_WORKERS>)
                        .required(false)
                        .help("The number of concurrent workers for crawling and probing")
                        .value_parser(clap::value_parser!(usize))
                        .default_value("5"),
                )
                .arg(
                    arg!(-a --"user-agent" <AGENT>)
                        .required(false)
                        .help("User-Agent header to send (default: a desktop Chrome string)"),
                )
                .arg(
                    arg!(-d --"depth" <DEPTH>)
                        .required(false)
                        .help("Maximum crawl depth; 1 scans only the target page")
                        .value_parser(clap::value_parser!(usize))
                        .default_value("2"),
                )
                .arg(
                    arg!(--"timeout" <SECONDS>)
                        .required(false)
                        .help("Request timeout in seconds")
                        .value_parser(clap::value_parser!(u64))
                        .default_value("10"),
                )
                .arg(
                    arg!(-H --"header" <HEADER>)
                        .required(false)
                        .help("Extra request header as 'Name: value' (repeatable)")
                        .action(clap::ArgAction::Append),
                )
                .arg(
                    arg!(-v --"verbose" "Log every request and probe at debug level")
                        .required(false),
                ),
        )
        .subcommand(
            command!("summary")
                .about("Print the summary of a previously saved JSON report")
                .arg(
                    arg!(<FILE>)
                        .required(true)
                        .help("Path to a report written with scan --output")
                        .value_parser(clap::value_parser!(String)),
                )
                .arg(arg!(--"plain" "Print the plain-text summary without colours").required(false)),
        )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;
    use webprobe::handlers::build_scan_config;

    #[test]
    fn test_scan_defaults() {
        let matches = command_argument_builder()
            .try_get_matches_from(["webprobe", "scan", "-u", "http://example.com"])
            .unwrap();
        let (name, scan) = matches.subcommand().unwrap();
        assert_eq!(name, "scan");
        assert_eq!(scan.get_one::<usize>("threads"), Some(&5));
        assert_eq!(scan.get_one::<usize>("depth"), Some(&2));
        assert_eq!(scan.get_one::<u64>("timeout"), Some(&10));
        assert!(!scan.get_flag("verbose"));
    }

    #[test]
    fn test_headers_repeat_and_quiet_is_global() {
        let matches = command_argument_builder()
            .try_get_matches_from([
                "webprobe",
                "scan",
                "-u",
                "example.com",
                "-H",
                "X-Api-Key: abc",
                "--header",
                "Accept: text/html",
                "-q",
            ])
            .unwrap();
        assert!(matches.get_flag("quiet"));
        let scan = matches.subcommand_matches("scan").unwrap();
        let headers: Vec<&String> = scan.get_many::<String>("header").unwrap().collect();
        assert_eq!(headers, vec!["X-Api-Key: abc", "Accept: text/html"]);
    }

    #[test]
    fn test_scan_requires_url() {
        assert!(
            command_argument_builder()
                .try_get_matches_from(["webprobe", "scan"])
                .is_err()
        );
    }

    #[test]
    fn test_build_scan_config_from_arguments() {
        let mut cookie_file = NamedTempFile::new().unwrap();
        writeln!(cookie_file, "session=abc; theme=dark").unwrap();

        let matches = command_argument_builder()
            .try_get_matches_from([
                "webprobe",
                "scan",
                "-u",
                "shop.test/app",
                "-t",
                "3",
                "-d",
                "4",
                "--timeout",
                "7",
                "-a",
                "probe/1.0",
                "-c",
                cookie_file.path().to_str().unwrap(),
                "-H",
                "X-Api-Key: abc",
            ])
            .unwrap();
        let config = build_scan_config(matches.subcommand_matches("scan").unwrap()).unwrap();

        assert_eq!(config.target, "http://shop.test/app");
        assert_eq!(config.threads, 3);
        assert_eq!(config.max_depth, 4);
        assert_eq!(config.timeout_secs, 7);
        assert_eq!(config.user_agent.as_deref(), Some("probe/1.0"));
        assert_eq!(config.cookies.len(), 2);
        assert_eq!(
            config.headers,
            vec![("X-Api-Key".to_string(), "abc".to_string())]
        );
    }

    #[test]
    fn test_build_scan_config_rejects_bad_header() {
        let matches = command_argument_builder()
            .try_get_matches_from(["webprobe", "scan", "-u", "shop.test", "-H", "nonsense"])
            .unwrap();
        assert!(build_scan_config(matches.subcommand_matches("scan").unwrap()).is_err());
    }
}
