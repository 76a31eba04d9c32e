//! Lens CLI - Command-line interface for Session Lens
//!
//! Commands:
//! - analyze: Analyze a recorded session into a semantic log, metrics and signals
//! - validate: Validate raw events against the input schema
//! - doctor: Diagnose installation and configuration
//! - schema: Describe the input and output formats

use clap::{Parser, Subcommand, ValueEnum};
use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::{debug, info, warn, Level};
use tracing_subscriber::EnvFilter;

use session_lens::schema::{ParsedEvents, RawEventAdapter, SCHEMA_VERSION};
use session_lens::{
    render_context, render_transcript, AnalysisRecord, AnalyzeError, AnalyzerConfig,
    SemanticSession, SessionAnalyzer, LENS_VERSION, PRODUCER_NAME,
};

/// Lens - turn recorded browsing sessions into evidence
#[derive(Parser)]
#[command(name = "lens")]
#[command(version = LENS_VERSION)]
#[command(about = "Analyze recorded browsing sessions", long_about = None)]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Analyze a recorded session
    Analyze {
        /// Input file path (use - for stdin)
        #[arg(short, long, default_value = "-")]
        input: PathBuf,

        /// Output file path (use - for stdout)
        #[arg(short, long, default_value = "-")]
        output: PathBuf,

        /// Input format
        #[arg(long, default_value = "auto")]
        input_format: InputFormat,

        /// Output format
        #[arg(long, default_value = "json-pretty")]
        format: OutputFormat,

        /// Thresholds file (JSON; omitted fields keep their defaults)
        #[arg(long)]
        config: Option<PathBuf>,

        /// Emit the result even when the session has no meaningful interactions
        #[arg(long)]
        allow_empty: bool,

        /// Session identifier stored in `record` output
        #[arg(long)]
        session_id: Option<String>,
    },

    /// Validate raw event schema
    Validate {
        /// Input file path (use - for stdin)
        #[arg(short, long, default_value = "-")]
        input: PathBuf,

        /// Input format
        #[arg(long, default_value = "auto")]
        input_format: InputFormat,

        /// Output validation report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Diagnose installation and configuration
    Doctor {
        /// Check a thresholds file
        #[arg(long)]
        config: Option<PathBuf>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print schema information
    Schema {
        /// Schema to print (input, output or config)
        #[arg(value_enum)]
        schema_type: SchemaType,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum InputFormat {
    /// Detect JSON array or NDJSON from the content
    Auto,
    /// JSON array of events (or {"events": [...]})
    Json,
    /// Newline-delimited JSON (one event per line)
    Ndjson,
}

#[derive(Clone, Copy, ValueEnum)]
enum OutputFormat {
    /// Compact semantic session JSON
    Json,
    /// Pretty-printed semantic session JSON
    JsonPretty,
    /// Log lines only
    Transcript,
    /// Overview, signals, metrics and transcript as text
    Context,
    /// Semantic session wrapped in a persistence record
    Record,
}

#[derive(Clone, Copy, ValueEnum)]
enum SchemaType {
    /// Raw event input (session.raw_event.v1)
    Input,
    /// Semantic session output
    Output,
    /// Analyzer thresholds with their defaults
    Config,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!(
                "{}",
                serde_json::to_string(&CliError::from(e)).unwrap_or_else(|_| "Unknown error".to_string())
            );
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };

    // RUST_LOG wins over -v when set
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "session_lens={},lens={}",
            level.as_str().to_lowercase(),
            level.as_str().to_lowercase()
        ))
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn run(cli: Cli) -> Result<(), LensCliError> {
    match cli.command {
        Commands::Analyze {
            input,
            output,
            input_format,
            format,
            config,
            allow_empty,
            session_id,
        } => cmd_analyze(
            &input,
            &output,
            input_format,
            format,
            config.as_deref(),
            allow_empty,
            session_id,
        ),

        Commands::Validate {
            input,
            input_format,
            json,
        } => cmd_validate(&input, input_format, json),

        Commands::Doctor { config, json } => cmd_doctor(config.as_deref(), json),

        Commands::Schema { schema_type } => cmd_schema(schema_type),
    }
}

fn cmd_analyze(
    input: &Path,
    output: &Path,
    input_format: InputFormat,
    format: OutputFormat,
    config: Option<&Path>,
    allow_empty: bool,
    session_id: Option<String>,
) -> Result<(), LensCliError> {
    let config = match config {
        Some(path) => {
            let content = fs::read_to_string(path)?;
            AnalyzerConfig::from_json(&content)?
        }
        None => AnalyzerConfig::default(),
    };
    let analyzer = SessionAnalyzer::with_config(config)?;

    let input_data = read_input(input)?;
    let parsed = parse_input(&input_data, input_format)?;
    report_skipped(&parsed);

    let record = analyzer.analyze_to_record(&parsed.events, session_id);
    check_interactions(&record.session, allow_empty)?;
    let output_str = format_analysis(&record, format)?;

    write_output(output, &output_str)
}

fn cmd_validate(input: &Path, input_format: InputFormat, json: bool) -> Result<(), LensCliError> {
    let input_data = read_input(input)?;
    let parsed = parse_input(&input_data, input_format)?;
    let failures = RawEventAdapter::validate_events(&parsed.events);

    let mut errors: Vec<ValidationErrorDetail> = parsed
        .skipped
        .iter()
        .map(|s| ValidationErrorDetail {
            index: s.index,
            event_type: None,
            error: format!("Malformed entry: {}", s.reason),
        })
        .collect();
    // Failures index into the decoded events; map them back to input positions
    let positions = decoded_positions(&parsed);
    errors.extend(failures.iter().map(|f| ValidationErrorDetail {
        index: positions.get(f.index).copied().unwrap_or(f.index),
        event_type: Some(f.event_type),
        error: f.error.to_string(),
    }));
    errors.sort_by_key(|e| e.index);

    let total = parsed.total_entries();
    let report = ValidationReport {
        schema: SCHEMA_VERSION.to_string(),
        total_events: total,
        valid_events: total - errors.len(),
        invalid_events: errors.len(),
        errors,
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("Validation Report");
        println!("=================");
        println!("Schema:         {}", report.schema);
        println!("Total events:   {}", report.total_events);
        println!("Valid events:   {}", report.valid_events);
        println!("Invalid events: {}", report.invalid_events);

        if !report.errors.is_empty() {
            println!("\nErrors:");
            for err in &report.errors {
                match err.event_type {
                    Some(t) => println!("  - Entry {} (type {}): {}", err.index, t, err.error),
                    None => println!("  - Entry {}: {}", err.index, err.error),
                }
            }
        }
    }

    if report.invalid_events > 0 {
        Err(LensCliError::ValidationFailed(report.invalid_events))
    } else {
        Ok(())
    }
}

fn cmd_doctor(config: Option<&Path>, json: bool) -> Result<(), LensCliError> {
    let mut checks: Vec<DoctorCheck> = Vec::new();

    checks.push(DoctorCheck {
        name: "lens_version".to_string(),
        status: CheckStatus::Ok,
        message: format!("Session Lens version {}", LENS_VERSION),
    });

    checks.push(DoctorCheck {
        name: "schema_version".to_string(),
        status: CheckStatus::Ok,
        message: format!("Input schema: {}", SCHEMA_VERSION),
    });

    if let Some(config_path) = config {
        let check = if !config_path.exists() {
            DoctorCheck {
                name: "config".to_string(),
                status: CheckStatus::Warning,
                message: "Config file does not exist".to_string(),
            }
        } else {
            match fs::read_to_string(config_path) {
                Ok(content) => match AnalyzerConfig::from_json(&content) {
                    Ok(cfg) => DoctorCheck {
                        name: "config".to_string(),
                        status: CheckStatus::Ok,
                        message: format!(
                            "Config valid (rage {}ms/{} clicks, dead-click timeout {}ms, hesitation {}ms)",
                            cfg.rage_click_window_ms,
                            cfg.rage_click_min_clicks,
                            cfg.dead_click_timeout_ms,
                            cfg.hesitation_min_dwell_ms
                        ),
                    },
                    Err(e) => DoctorCheck {
                        name: "config".to_string(),
                        status: CheckStatus::Error,
                        message: e.to_string(),
                    },
                },
                Err(e) => DoctorCheck {
                    name: "config".to_string(),
                    status: CheckStatus::Error,
                    message: format!("Cannot read config file: {}", e),
                },
            }
        };
        checks.push(check);
    }

    // Analyze reads stdin by default
    let stdin_check = if atty::is(atty::Stream::Stdin) {
        DoctorCheck {
            name: "stdin".to_string(),
            status: CheckStatus::Ok,
            message: "stdin is a TTY (pass --input to analyze a file)".to_string(),
        }
    } else {
        DoctorCheck {
            name: "stdin".to_string(),
            status: CheckStatus::Ok,
            message: "stdin is a pipe (ready to analyze piped recordings)".to_string(),
        }
    };
    checks.push(stdin_check);

    let report = DoctorReport {
        producer: PRODUCER_NAME.to_string(),
        version: LENS_VERSION.to_string(),
        checks,
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("Lens Doctor Report");
        println!("==================");
        println!("Producer: {}", report.producer);
        println!("Version:  {}", report.version);
        println!("\nChecks:");

        for check in &report.checks {
            let status_icon = match check.status {
                CheckStatus::Ok => "[OK]",
                CheckStatus::Warning => "[WARN]",
                CheckStatus::Error => "[ERR]",
            };
            println!("  {} {}: {}", status_icon, check.name, check.message);
        }
    }

    let has_errors = report
        .checks
        .iter()
        .any(|c| matches!(c.status, CheckStatus::Error));
    if has_errors {
        Err(LensCliError::DoctorFailed)
    } else {
        Ok(())
    }
}

fn cmd_schema(schema_type: SchemaType) -> Result<(), LensCliError> {
    match schema_type {
        SchemaType::Input => {
            println!("Input Schema: {}", SCHEMA_VERSION);
            println!();
            println!("A JSON array (or NDJSON stream) of events: {{ type, timestamp, data }}");
            println!("timestamp is in milliseconds, absolute epoch or session-relative.");
            println!();
            println!("type:");
            println!("  0 DOM content loaded, 1 load       activity only");
            println!("  2 full snapshot                    node tree for labels, page title");
            println!("  3 incremental snapshot             data.source selects the kind:");
            println!("      0 mutation, 1 mouse move, 2 mouse interaction (2 click,");
            println!("      3 right click, 4 double click, 7 touch), 3 scroll, 4 resize,");
            println!("      5 input, 6 touch move, 7 media (0 play, 1 pause), 11 log,");
            println!("      14 selection");
            println!("  4 meta                             href, width, height");
            println!("  5 custom                           data.tag + data.payload");
            println!("  6 plugin                           console and network plugins");
            println!();
            println!("Targets: data.id (snapshot node), or data.target as a label string");
            println!("or a descriptor {{ tag, id, classes, text, ariaLabel, placeholder, name }}.");
        }
        SchemaType::Output => {
            println!("Output: semantic session (camelCase JSON)");
            println!();
            println!("- pageUrl, pageTitle, totalDuration (ms), eventCount, viewportSize, startedAt");
            println!("- logs: [{{ timestamp \"[MM:SS]\", offsetMs, action, details, flags }}]");
            println!("- summary:");
            println!("  - clicks: totalClicks, rageClicks, deadClicks, doubleClicks, rightClicks");
            println!("  - inputs: totalInputs, formSubmissions, abandonedInputs, clearedInputs");
            println!("  - scrolling: totalScrolls, scrollDepthMax, scrollReversals, rapidScrolls");
            println!("  - attention: totalHovers, hesitations, hoverTime");
            println!("  - touch: touchEvents, swipes, pinchZooms");
            println!("  - media: videoPlays, videoPauses");
            println!("  - selection: textSelections, copyEvents, pasteEvents");
            println!("  - errors: consoleErrors, networkErrors");
            println!("  - engagement: sessionDuration, activeTime, idleTime, idlePeriods,");
            println!("    tabSwitches, navigations, conversions, timeToFirstInteraction");
            println!("  - viewport: resizes, orientationChanges");
            println!("- behavioralSignals: isExploring, isFrustrated, isEngaged, isConfused,");
            println!("  isMobile, completedGoal");
        }
        SchemaType::Config => {
            println!("{}", AnalyzerConfig::default().to_json()?);
        }
    }

    Ok(())
}

// Helper functions

fn read_input(input: &Path) -> Result<String, LensCliError> {
    if input.to_string_lossy() == "-" {
        let mut buffer = String::new();
        io::stdin().read_to_string(&mut buffer)?;
        Ok(buffer)
    } else {
        Ok(fs::read_to_string(input)?)
    }
}

fn write_output(output: &Path, content: &str) -> Result<(), LensCliError> {
    if output.to_string_lossy() == "-" {
        println!("{}", content);
    } else {
        fs::write(output, format!("{}\n", content))?;
        info!(path = %output.display(), "wrote analysis");
    }
    Ok(())
}

fn parse_input(data: &str, format: InputFormat) -> Result<ParsedEvents, LensCliError> {
    let parsed = match format {
        InputFormat::Json => RawEventAdapter::parse_array(data)?,
        InputFormat::Ndjson => RawEventAdapter::parse_ndjson(data)?,
        InputFormat::Auto => {
            let trimmed = data.trim_start();
            if trimmed.starts_with('[') {
                RawEventAdapter::parse_array(data)?
            } else {
                // A single object is either an {"events": [...]} wrapper or NDJSON
                match RawEventAdapter::parse_array(data) {
                    Ok(parsed) => parsed,
                    Err(_) => {
                        debug!("input is not a JSON document, reading as NDJSON");
                        RawEventAdapter::parse_ndjson(data)?
                    }
                }
            }
        }
    };
    Ok(parsed)
}

fn report_skipped(parsed: &ParsedEvents) {
    if !parsed.skipped.is_empty() {
        warn!(
            skipped = parsed.skipped.len(),
            total = parsed.total_entries(),
            "skipped malformed entries (run 'lens validate' for details)"
        );
    }
}

/// Input position of each decoded event
fn decoded_positions(parsed: &ParsedEvents) -> Vec<usize> {
    let skipped: Vec<usize> = parsed.skipped.iter().map(|s| s.index).collect();
    (0..parsed.total_entries())
        .filter(|i| !skipped.contains(i))
        .collect()
}

fn check_interactions(session: &SemanticSession, allow_empty: bool) -> Result<(), LensCliError> {
    if allow_empty || session.has_meaningful_interactions() {
        Ok(())
    } else {
        Err(LensCliError::Analyze(AnalyzeError::NoMeaningfulInteractions {
            event_count: session.event_count,
        }))
    }
}

fn format_analysis(record: &AnalysisRecord, format: OutputFormat) -> Result<String, LensCliError> {
    let session = &record.session;
    let output = match format {
        OutputFormat::Json => session.to_json()?,
        OutputFormat::JsonPretty => session.to_json_pretty()?,
        OutputFormat::Transcript => render_transcript(session),
        OutputFormat::Context => render_context(session),
        OutputFormat::Record => record.to_json_pretty()?,
    };
    Ok(output)
}

// Error types

#[derive(Debug)]
enum LensCliError {
    Io(io::Error),
    Analyze(AnalyzeError),
    Json(serde_json::Error),
    ValidationFailed(usize),
    DoctorFailed,
}

impl From<io::Error> for LensCliError {
    fn from(e: io::Error) -> Self {
        LensCliError::Io(e)
    }
}

impl From<AnalyzeError> for LensCliError {
    fn from(e: AnalyzeError) -> Self {
        LensCliError::Analyze(e)
    }
}

impl From<serde_json::Error> for LensCliError {
    fn from(e: serde_json::Error) -> Self {
        LensCliError::Json(e)
    }
}

#[derive(serde::Serialize)]
struct CliError {
    code: String,
    message: String,
    hint: Option<String>,
}

impl From<LensCliError> for CliError {
    fn from(e: LensCliError) -> Self {
        match e {
            LensCliError::Io(e) => CliError {
                code: "IO_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check file paths and permissions".to_string()),
            },
            LensCliError::Analyze(e @ AnalyzeError::NoMeaningfulInteractions { .. }) => CliError {
                code: "NO_INTERACTIONS".to_string(),
                message: e.to_string(),
                hint: Some("Pass --allow-empty to emit the empty analysis anyway".to_string()),
            },
            LensCliError::Analyze(e @ AnalyzeError::ConfigError(_)) => CliError {
                code: "CONFIG_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Run 'lens schema config' to see the accepted fields".to_string()),
            },
            LensCliError::Analyze(e) => CliError {
                code: "PARSE_ERROR".to_string(),
                message: e.to_string(),
                hint: Some(format!("Ensure input matches the {} schema", SCHEMA_VERSION)),
            },
            LensCliError::Json(e) => CliError {
                code: "JSON_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check JSON syntax".to_string()),
            },
            LensCliError::ValidationFailed(count) => CliError {
                code: "VALIDATION_FAILED".to_string(),
                message: format!("{} events failed validation", count),
                hint: Some("Malformed events are skipped during analysis".to_string()),
            },
            LensCliError::DoctorFailed => CliError {
                code: "DOCTOR_FAILED".to_string(),
                message: "One or more health checks failed".to_string(),
                hint: Some("Review the doctor report for details".to_string()),
            },
        }
    }
}

// Report types

#[derive(serde::Serialize)]
struct ValidationReport {
    schema: String,
    total_events: usize,
    valid_events: usize,
    invalid_events: usize,
    errors: Vec<ValidationErrorDetail>,
}

#[derive(serde::Serialize)]
struct ValidationErrorDetail {
    index: usize,
    event_type: Option<u64>,
    error: String,
}

#[derive(serde::Serialize)]
struct DoctorReport {
    producer: String,
    version: String,
    checks: Vec<DoctorCheck>,
}

#[derive(serde::Serialize)]
struct DoctorCheck {
    name: String,
    status: CheckStatus,
    message: String,
}

#[derive(serde::Serialize)]
#[serde(rename_all = "lowercase")]
enum CheckStatus {
    Ok,
    Warning,
    Error,
}
