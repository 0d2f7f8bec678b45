//! Stress CLI - Command-line interface for Synheart Stress
//!
//! Commands:
//! - transform: Process a sample file into result envelopes (batch mode)
//! - run: Process streaming NDJSON samples from stdin (streaming mode)
//! - validate: Validate sample schema
//! - doctor: Diagnose configuration and environment
//! - schema: Print input/output schema information

use clap::{Parser, Subcommand, ValueEnum};
use std::fs;
use std::io::{self, BufRead, Read, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use synheart_stress::chunker::{ChunkPolicy, DEFAULT_MAX_SAMPLES, DEFAULT_MAX_SPAN_SECS};
use synheart_stress::config::EngineConfig;
use synheart_stress::pipeline::StressProcessor;
use synheart_stress::schema::{SampleAdapter, RESULT_SCHEMA_VERSION, SAMPLE_SCHEMA_VERSION};
use synheart_stress::types::{Sample, StressPayload};
use synheart_stress::{PRODUCER_NAME, STRESS_VERSION};

/// Stress - On-device HRV and stress estimation for wearable sessions
#[derive(Parser)]
#[command(name = "stress")]
#[command(author = "Synheart AI Inc")]
#[command(version = STRESS_VERSION)]
#[command(about = "Estimate HRV and stress from wearable samples", long_about = None)]
struct Cli {
    /// Log level written to stderr (error, warn, info, debug, trace)
    #[arg(long, global = true, default_value = "warn")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

/// Engine and chunking options shared by transform and run
#[derive(clap::Args)]
struct EngineArgs {
    /// PPG sampling rate (Hz), used when a chunk has no inter-beat intervals
    #[arg(long, default_value = "130")]
    sampling_hz: u32,

    /// Engine configuration file (JSON)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Baseline frequency (overrides the config file)
    #[arg(long)]
    freq_hz: Option<u32>,

    /// Maximum samples per chunk
    #[arg(long, default_value_t = DEFAULT_MAX_SAMPLES)]
    max_samples: usize,

    /// Maximum chunk duration in seconds
    #[arg(long, default_value_t = DEFAULT_MAX_SPAN_SECS)]
    max_span_secs: i64,
}

#[derive(Subcommand)]
enum Commands {
    /// Transform a sample file into result envelopes (batch mode)
    Transform {
        /// Input file path (use - for stdin)
        #[arg(short, long)]
        input: PathBuf,

        /// Output file path (use - for stdout)
        #[arg(short, long)]
        output: PathBuf,

        /// Input format
        #[arg(long, default_value = "ndjson")]
        input_format: InputFormat,

        /// Output format
        #[arg(long, default_value = "ndjson")]
        output_format: OutputFormat,

        #[command(flatten)]
        engine: EngineArgs,
    },

    /// Process streaming NDJSON samples from stdin (streaming mode)
    Run {
        /// Output format
        #[arg(long, default_value = "ndjson")]
        output_format: OutputFormat,

        #[command(flatten)]
        engine: EngineArgs,

        /// Flush output after each chunk
        #[arg(long, default_value = "true")]
        flush: bool,
    },

    /// Validate sample schema
    Validate {
        /// Input file path (use - for stdin)
        #[arg(short, long)]
        input: PathBuf,

        /// Input format
        #[arg(long, default_value = "ndjson")]
        input_format: InputFormat,

        /// Output validation report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Diagnose configuration and environment
    Doctor {
        /// Check an engine configuration file
        #[arg(long)]
        config: Option<PathBuf>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print schema information
    Schema {
        /// Schema to print (input or output)
        #[arg(value_enum)]
        schema_type: SchemaType,

        /// Output as JSON schema
        #[arg(long)]
        json_schema: bool,
    },
}

#[derive(Clone, ValueEnum)]
enum InputFormat {
    /// Newline-delimited JSON (one sample per line)
    Ndjson,
    /// JSON array of samples
    Json,
}

#[derive(Clone, ValueEnum)]
enum OutputFormat {
    /// Newline-delimited JSON (one envelope per line)
    Ndjson,
    /// JSON array of envelopes
    Json,
    /// Pretty-printed JSON
    JsonPretty,
}

#[derive(Clone, ValueEnum)]
enum SchemaType {
    /// Input schema (stress.sample.v1)
    Input,
    /// Output schema (stress.result.v1)
    Output,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(cli.log_level.as_str()))
        .init();

    match run(cli.command) {
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

fn run(command: Commands) -> Result<(), StressCliError> {
    match command {
        Commands::Transform {
            input,
            output,
            input_format,
            output_format,
            engine,
        } => cmd_transform(&input, &output, input_format, output_format, &engine),

        Commands::Run {
            output_format,
            engine,
            flush,
        } => cmd_run(output_format, &engine, flush),

        Commands::Validate {
            input,
            input_format,
            json,
        } => cmd_validate(&input, input_format, json),

        Commands::Doctor { config, json } => cmd_doctor(config.as_deref(), json),

        Commands::Schema {
            schema_type,
            json_schema,
        } => cmd_schema(schema_type, json_schema),
    }
}

fn build_processor(args: &EngineArgs) -> Result<StressProcessor, StressCliError> {
    let mut config = match &args.config {
        Some(path) => EngineConfig::from_json(&fs::read_to_string(path)?)?,
        None => EngineConfig::default(),
    };
    if let Some(freq_hz) = args.freq_hz {
        config.freq_hz = freq_hz;
    }

    let policy = ChunkPolicy::new(args.max_samples, args.max_span_secs)?;
    log::info!(
        "engine: freq_hz={} baseline_rows={} sampling_hz={} model={}",
        config.freq_hz,
        config.baseline_rows(),
        args.sampling_hz,
        config.model.version
    );
    Ok(StressProcessor::with_config(config, policy, args.sampling_hz)?)
}

fn read_input(input: &Path) -> Result<String, StressCliError> {
    if input.to_string_lossy() == "-" {
        let mut buffer = String::new();
        io::stdin().read_to_string(&mut buffer)?;
        Ok(buffer)
    } else {
        Ok(fs::read_to_string(input)?)
    }
}

fn parse_samples(input_data: &str, input_format: InputFormat) -> Result<Vec<Sample>, StressCliError> {
    Ok(match input_format {
        InputFormat::Ndjson => SampleAdapter::parse_ndjson(input_data)?,
        InputFormat::Json => SampleAdapter::parse_array(input_data)?,
    })
}

fn cmd_transform(
    input: &Path,
    output: &Path,
    input_format: InputFormat,
    output_format: OutputFormat,
    engine: &EngineArgs,
) -> Result<(), StressCliError> {
    let input_data = read_input(input)?;
    let samples = parse_samples(&input_data, input_format)?;

    if samples.is_empty() {
        return Err(StressCliError::NoSamples);
    }

    let failures = SampleAdapter::validate_samples(&samples);
    if !failures.is_empty() {
        return Err(StressCliError::ValidationFailed(failures.len()));
    }

    let mut processor = build_processor(engine)?;
    let payloads = processor.process_batch(samples)?;
    log::info!(
        "processed {} chunks across {} sessions, {} with warnings",
        payloads.len(),
        processor.router().active_sessions(),
        payloads.iter().filter(|p| p.result.is_warning()).count()
    );

    let output_data = format_output(&payloads, &output_format)?;

    if output.to_string_lossy() == "-" {
        print!("{}", output_data);
    } else {
        fs::write(output, output_data)?;
    }

    Ok(())
}

fn cmd_run(output_format: OutputFormat, engine: &EngineArgs, flush: bool) -> Result<(), StressCliError> {
    let mut processor = build_processor(engine)?;

    let stdin = io::stdin();
    let mut stdout = io::stdout();

    for (line_num, line) in stdin.lock().lines().enumerate() {
        let line = line?;
        let trimmed = line.trim();

        if trimmed.is_empty() {
            continue;
        }

        let sample = SampleAdapter::parse_line(trimmed, line_num + 1)?;
        let Some(payload) = processor.push_sample(sample)? else {
            continue;
        };

        write!(stdout, "{}", format_output(&[payload], &output_format)?)?;
        if flush {
            stdout.flush()?;
        }
    }

    // Close every session's trailing partial chunk
    let remaining = processor.finish()?;
    if !remaining.is_empty() {
        write!(stdout, "{}", format_output(&remaining, &output_format)?)?;
        stdout.flush()?;
    }

    Ok(())
}

fn cmd_validate(input: &Path, input_format: InputFormat, json: bool) -> Result<(), StressCliError> {
    let input_data = read_input(input)?;
    let samples = parse_samples(&input_data, input_format)?;

    let results = SampleAdapter::validate_samples(&samples);

    let report = ValidationReport {
        total_samples: samples.len(),
        valid_samples: samples.len() - results.len(),
        invalid_samples: results.len(),
        errors: results
            .iter()
            .map(|r| ValidationErrorDetail {
                index: r.index,
                session_id: r.session_id.clone(),
                error: r.error.to_string(),
            })
            .collect(),
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("Validation Report");
        println!("=================");
        println!("Total samples:   {}", report.total_samples);
        println!("Valid samples:   {}", report.valid_samples);
        println!("Invalid samples: {}", report.invalid_samples);

        if !report.errors.is_empty() {
            println!("\nErrors:");
            for err in &report.errors {
                let session = if err.session_id.is_empty() {
                    "unknown"
                } else {
                    err.session_id.as_str()
                };
                println!("  - Sample {} (session {}): {}", err.index, session, err.error);
            }
        }
    }

    if report.invalid_samples > 0 {
        Err(StressCliError::ValidationFailed(report.invalid_samples))
    } else {
        Ok(())
    }
}

fn cmd_doctor(config: Option<&Path>, json: bool) -> Result<(), StressCliError> {
    let mut checks: Vec<DoctorCheck> = Vec::new();

    checks.push(DoctorCheck {
        name: "stress_version".to_string(),
        status: CheckStatus::Ok,
        message: format!("Stress version {}", STRESS_VERSION),
    });

    checks.push(DoctorCheck {
        name: "schema_version".to_string(),
        status: CheckStatus::Ok,
        message: format!("Input schema: {}, output schema: {}", SAMPLE_SCHEMA_VERSION, RESULT_SCHEMA_VERSION),
    });

    let default_config = EngineConfig::default();
    checks.push(DoctorCheck {
        name: "model_version".to_string(),
        status: CheckStatus::Ok,
        message: format!("Default model: {}", default_config.model.version),
    });

    if let Some(config_path) = config {
        checks.push(check_config_file(config_path));
    }

    // Check stdin is available (for streaming mode)
    let stdin_message = if atty::is(atty::Stream::Stdin) {
        "stdin is a TTY (interactive mode)"
    } else {
        "stdin is a pipe (streaming mode ready)"
    };
    checks.push(DoctorCheck {
        name: "stdin".to_string(),
        status: CheckStatus::Ok,
        message: stdin_message.to_string(),
    });

    let report = DoctorReport {
        producer: PRODUCER_NAME.to_string(),
        version: STRESS_VERSION.to_string(),
        checks,
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("Stress Doctor Report");
        println!("====================");
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

    let has_errors = report.checks.iter().any(|c| matches!(c.status, CheckStatus::Error));
    if has_errors {
        Err(StressCliError::DoctorFailed)
    } else {
        Ok(())
    }
}

fn check_config_file(path: &Path) -> DoctorCheck {
    if !path.exists() {
        return DoctorCheck {
            name: "config".to_string(),
            status: CheckStatus::Warning,
            message: "Config file does not exist".to_string(),
        };
    }

    let (status, message) = match fs::read_to_string(path) {
        Ok(content) => match EngineConfig::from_json(&content) {
            Ok(config) => (
                CheckStatus::Ok,
                format!(
                    "Config valid (freq {} Hz, {} baseline rows, model {})",
                    config.freq_hz,
                    config.baseline_rows(),
                    config.model.version
                ),
            ),
            Err(e) => (CheckStatus::Error, format!("Invalid config: {}", e)),
        },
        Err(e) => (CheckStatus::Error, format!("Cannot read config file: {}", e)),
    };

    DoctorCheck {
        name: "config".to_string(),
        status,
        message,
    }
}

fn cmd_schema(schema_type: SchemaType, json_schema: bool) -> Result<(), StressCliError> {
    match schema_type {
        SchemaType::Input => {
            if json_schema {
                println!("{}", get_input_json_schema());
            } else {
                println!("Input Schema: {}", SAMPLE_SCHEMA_VERSION);
                println!();
                println!("One JSON object per sensor sample:");
                println!();
                println!("- device, session_id: Session identity (required, non-empty)");
                println!("- timestamp: RFC 3339 sample time (required)");
                println!("- ppg: Raw PPG value");
                println!("- hr: Instantaneous heart rate (bpm), kept when in [30, 220]");
                println!("- ibi_ms: Inter-beat intervals (ms), kept when in (250, 2000)");
                println!("- subject_id, acc_x, acc_y, acc_z, ppg0, ppg2: Carried through, unused");
                println!();
                println!("HRV uses ibi_ms when any chunk sample has it, else PPG peak detection.");
            }
        }
        SchemaType::Output => {
            if json_schema {
                println!("{}", get_output_json_schema());
            } else {
                println!("Output Schema: {}", RESULT_SCHEMA_VERSION);
                println!();
                println!("One envelope per processed chunk:");
                println!();
                println!("- schema_version: {}", RESULT_SCHEMA_VERSION);
                println!("- producer: {{ name, version, instance_id, model_version }}");
                println!("- session: {{ device, session_id, subject_id }}");
                println!("- computed_at_utc, observed_at_utc");
                println!("- window: {{ baseline_rows, baseline_filled, sliding_filled, chunk_index }}");
                println!("- result:");
                println!("  - status: success | warning");
                println!("  - status_basic: success | basic_warning");
                println!("  - status_sliding: success | sliding_warning");
                println!("  - hr_mean, rmssd, pnn50, ppg_mean, ml_score: number or null");
                println!("  - ml_label: ml_stress | ml_relaxed | ml_uncertain | null");
            }
        }
    }

    Ok(())
}

// Helper functions

fn format_output(payloads: &[StressPayload], format: &OutputFormat) -> Result<String, StressCliError> {
    match format {
        OutputFormat::Ndjson => {
            let mut lines: Vec<String> = Vec::new();
            for payload in payloads {
                lines.push(serde_json::to_string(payload)?);
            }
            Ok(lines.join("\n") + "\n")
        }
        OutputFormat::Json => Ok(serde_json::to_string(payloads)? + "\n"),
        OutputFormat::JsonPretty => Ok(serde_json::to_string_pretty(payloads)? + "\n"),
    }
}

fn get_input_json_schema() -> String {
    let number_or_null = serde_json::json!({ "type": ["number", "null"] });
    serde_json::json!({
        "$schema": "https://json-schema.org/draft/2020-12/schema",
        "$id": "https://synheart.ai/schemas/stress.sample.v1.json",
        "title": SAMPLE_SCHEMA_VERSION,
        "description": "Synheart wearable sensor sample",
        "type": "object",
        "required": ["device", "timestamp", "session_id"],
        "properties": {
            "device": { "type": "string", "minLength": 1 },
            "timestamp": { "type": "string", "format": "date-time" },
            "session_id": { "type": "string", "minLength": 1 },
            "subject_id": { "type": ["string", "null"] },
            "ppg": number_or_null,
            "hr": number_or_null,
            "ibi_ms": {
                "type": ["array", "null"],
                "items": { "type": "number" }
            },
            "acc_x": number_or_null,
            "acc_y": number_or_null,
            "acc_z": number_or_null,
            "ppg0": number_or_null,
            "ppg2": number_or_null
        }
    })
    .to_string()
}

fn get_output_json_schema() -> String {
    let number_or_null = serde_json::json!({ "type": ["number", "null"] });
    serde_json::json!({
        "$schema": "https://json-schema.org/draft/2020-12/schema",
        "$id": "https://synheart.ai/schemas/stress.result.v1.json",
        "title": RESULT_SCHEMA_VERSION,
        "description": "Synheart per-chunk stress result",
        "type": "object",
        "required": ["schema_version", "producer", "session", "computed_at_utc", "window", "result"],
        "properties": {
            "schema_version": { "type": "string", "const": RESULT_SCHEMA_VERSION },
            "producer": {
                "type": "object",
                "properties": {
                    "name": { "type": "string" },
                    "version": { "type": "string" },
                    "instance_id": { "type": "string" },
                    "model_version": { "type": "string" }
                }
            },
            "session": {
                "type": "object",
                "properties": {
                    "device": { "type": "string" },
                    "session_id": { "type": "string" },
                    "subject_id": { "type": "string" }
                }
            },
            "computed_at_utc": { "type": "string" },
            "observed_at_utc": { "type": "string" },
            "window": {
                "type": "object",
                "properties": {
                    "baseline_rows": { "type": "integer" },
                    "baseline_filled": { "type": "integer" },
                    "sliding_filled": { "type": "integer" },
                    "chunk_index": { "type": "integer" }
                }
            },
            "result": {
                "type": "object",
                "properties": {
                    "status": { "enum": ["success", "warning"] },
                    "status_basic": { "enum": ["success", "basic_warning"] },
                    "status_sliding": { "enum": ["success", "sliding_warning"] },
                    "hr_mean": number_or_null,
                    "rmssd": number_or_null,
                    "pnn50": number_or_null,
                    "ppg_mean": number_or_null,
                    "ml_score": number_or_null,
                    "ml_label": { "enum": ["ml_stress", "ml_relaxed", "ml_uncertain", null] }
                }
            }
        }
    })
    .to_string()
}

// Error types

#[derive(Debug)]
enum StressCliError {
    Io(io::Error),
    Compute(synheart_stress::ComputeError),
    Json(serde_json::Error),
    NoSamples,
    ValidationFailed(usize),
    DoctorFailed,
}

impl From<io::Error> for StressCliError {
    fn from(e: io::Error) -> Self {
        StressCliError::Io(e)
    }
}

impl From<synheart_stress::ComputeError> for StressCliError {
    fn from(e: synheart_stress::ComputeError) -> Self {
        StressCliError::Compute(e)
    }
}

impl From<serde_json::Error> for StressCliError {
    fn from(e: serde_json::Error) -> Self {
        StressCliError::Json(e)
    }
}

#[derive(serde::Serialize)]
struct CliError {
    code: String,
    message: String,
    hint: Option<String>,
}

impl From<StressCliError> for CliError {
    fn from(e: StressCliError) -> Self {
        use synheart_stress::ComputeError;

        match e {
            StressCliError::Io(e) => CliError {
                code: "IO_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check file paths and permissions".to_string()),
            },
            StressCliError::Compute(e) => {
                let (code, hint) = match &e {
                    ComputeError::InvalidConfig(_) => ("CONFIG_ERROR", "Run 'stress doctor --config <file>'"),
                    ComputeError::StateMismatch(_) => ("STATE_ERROR", "Saved state must come from the same configuration"),
                    ComputeError::EncodingError(_) => ("ENCODING_ERROR", "Report this as a bug"),
                    ComputeError::EmptyChunk => ("EMPTY_CHUNK", "Ensure each chunk has at least one sample"),
                    ComputeError::ParseError(_) | ComputeError::JsonError(_) => {
                        ("PARSE_ERROR", "Ensure input matches stress.sample.v1 schema")
                    }
                };
                CliError {
                    code: code.to_string(),
                    message: e.to_string(),
                    hint: Some(hint.to_string()),
                }
            }
            StressCliError::Json(e) => CliError {
                code: "JSON_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check JSON syntax".to_string()),
            },
            StressCliError::NoSamples => CliError {
                code: "NO_SAMPLES".to_string(),
                message: "No samples found in input".to_string(),
                hint: Some("Ensure input file is not empty".to_string()),
            },
            StressCliError::ValidationFailed(count) => CliError {
                code: "VALIDATION_FAILED".to_string(),
                message: format!("{} samples failed validation", count),
                hint: Some("Run 'stress validate' for details".to_string()),
            },
            StressCliError::DoctorFailed => CliError {
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
    total_samples: usize,
    valid_samples: usize,
    invalid_samples: usize,
    errors: Vec<ValidationErrorDetail>,
}

#[derive(serde::Serialize)]
struct ValidationErrorDetail {
    index: usize,
    session_id: String,
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
