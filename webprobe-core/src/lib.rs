pub mod report;
pub mod scan;

pub use report::{FindingSet, Report, ReportBuilder, generate_text_summary};
pub use scan::{ScanOrchestrator, ScanPhase};

pub fn print_banner() {
    println!(
        r#"
                __                        __
 _      _____  / /_  ____  _________  / /_  ___
| | /| / / _ \/ __ \/ __ \/ ___/ __ \/ __ \/ _ \
| |/ |/ /  __/ /_/ / /_/ / /  / /_/ / /_/ /  __/
|__/|__/\___/_.___/ .___/_/   \____/_.___/\___/
                 /_/                       v{}
    crawl, probe, audit - for authorized testing only
"#,
        env!("CARGO_PKG_VERSION")
    );
}
