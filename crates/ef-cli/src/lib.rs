pub mod commands;
pub mod config;
pub mod prompt;
pub mod reporters;

#[derive(clap::ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReportFormat {
    Markdown,
    Json,
}

/// Which part of the project `scan` reports on
#[derive(clap::ValueEnum, Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum ScanMode {
    #[default]
    Full,
    Changes,
    Path,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum MockOutputFormat {
    Json,
    Yaml,
    Playwright,
}

impl From<MockOutputFormat> for ef_mock::MockFormat {
    fn from(format: MockOutputFormat) -> Self {
        match format {
            MockOutputFormat::Json => ef_mock::MockFormat::Json,
            MockOutputFormat::Yaml => ef_mock::MockFormat::Yaml,
            MockOutputFormat::Playwright => ef_mock::MockFormat::Playwright,
        }
    }
}
