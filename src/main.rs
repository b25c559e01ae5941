//! errprop command-line tool
//!
//! Reads a function, its variables, optional constants and one measurement
//! per variable, then prints the symbolic error formula and its value.

use std::io::{self, BufRead, Write};
use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::Parser;
use env_logger::Env;

use errprop::config::{ConfigLoader, LogLevel};
use errprop::engine::MeasurementInput;
use errprop::input::{parse_variables, split_measurement_literal};
use errprop::{CollisionPolicy, OutputFormat, Precision, Propagator, Report, Request, SymbolTable};

#[derive(Parser, Debug)]
#[command(name = "errprop", version, about = "Symbolic Gaussian error propagation")]
struct Cli {
    /// Function of the measured variables, e.g. "I*R"
    #[arg(short, long)]
    function: Option<String>,

    /// Measured variables, separated by commas or spaces
    #[arg(short, long)]
    variables: Option<String>,

    /// Constants, e.g. "c = 3e8, G = 6.67e-11"
    #[arg(short, long)]
    constants: Option<String>,

    /// Measurement as NAME=VALUE:UNCERTAINTY (repeatable)
    #[arg(short, long = "measure", value_name = "NAME=VALUE:UNCERTAINTY")]
    measurements: Vec<String>,

    /// Output precision: sig:N or dec:N
    #[arg(long)]
    precision: Option<Precision>,

    /// Output format: text or json
    #[arg(long)]
    format: Option<OutputFormat>,

    /// Also print both formulas as LaTeX
    #[arg(long)]
    latex: bool,

    /// What to do with a constant named like a variable: reject or variable-wins
    #[arg(long)]
    collision_policy: Option<CollisionPolicy>,

    /// Keep the partial derivatives unsimplified
    #[arg(long)]
    no_simplify: bool,

    /// Configuration file path
    #[arg(long, env = "ERRPROP_CONFIG")]
    config: Option<PathBuf>,

    /// Log level: off, error, warn, info, debug or trace
    #[arg(long, env = "ERRPROP_LOG_LEVEL")]
    log_level: Option<LogLevel>,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,

    /// Prompt for every missing field on stdin
    #[arg(short, long)]
    interactive: bool,

    /// Print the default configuration and exit
    #[arg(long)]
    generate_config: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    if cli.generate_config {
        print!("{}", ConfigLoader::sample()?);
        return Ok(());
    }

    let mut config =
        ConfigLoader::load(cli.config.as_deref()).context("Failed to load configuration")?;

    // CLI flags take precedence over file and environment
    if let Some(level) = cli.log_level {
        config.logging.level = level;
    }
    if cli.debug {
        config.logging.level = LogLevel::Debug;
    }
    if let Some(precision) = cli.precision {
        config.display.precision = precision;
    }
    if let Some(format) = cli.format {
        config.display.format = format;
    }
    if cli.latex {
        config.display.latex = true;
    }
    if let Some(policy) = cli.collision_policy {
        config.engine.collision_policy = policy;
    }
    if cli.no_simplify {
        config.engine.simplify = false;
    }

    env_logger::Builder::from_env(Env::default().default_filter_or("warn"))
        .filter_level(config.logging.level.to_level_filter())
        .init();

    log::debug!("errprop v{} starting", env!("CARGO_PKG_VERSION"));

    let request = build_request(&cli)?;
    let propagator = Propagator::with_config(config.engine.clone());
    let propagation = propagator
        .propagate(&request)
        .with_context(|| format!("Failed to propagate the error of '{}'", request.function))?;

    let report = Report::new(&propagation, &config.display);
    let output = report
        .render(config.display.format)
        .context("Failed to render the result")?;
    println!("{}", output);

    Ok(())
}

/// Assemble the request from the flags, prompting for what is missing when
/// running interactively
fn build_request(cli: &Cli) -> Result<Request> {
    let stdin = io::stdin();
    let mut prompt = Prompt {
        lines: stdin.lock(),
        enabled: cli.interactive,
    };

    let function = match &cli.function {
        Some(f) => f.clone(),
        None => prompt.ask("function f")?,
    };
    let variables = match &cli.variables {
        Some(v) => v.clone(),
        None => prompt.ask("variables (e.g. I, R)")?,
    };
    let constants = match &cli.constants {
        Some(c) => c.clone(),
        None if cli.interactive => prompt.ask_optional("constants (e.g. c = 3e8, empty for none)")?,
        None => String::new(),
    };

    let mut request = Request::new(function, variables.clone()).constants(constants);

    for literal in &cli.measurements {
        let (name, value, uncertainty) = split_measurement_literal(literal)?;
        request = request.measure(name, value, uncertainty);
    }

    if cli.interactive {
        // Names only; the engine reports a malformed list itself
        let mut scratch = SymbolTable::new();
        let declared = parse_variables(&variables, &mut scratch).unwrap_or_default();
        for name in declared {
            if request.measurements.iter().any(|m| m.name == name) {
                continue;
            }
            let value = prompt.ask(&format!("value of {}", name))?;
            let uncertainty = prompt.ask(&format!("uncertainty of {}", name))?;
            request.measurements.push(MeasurementInput {
                name,
                value,
                uncertainty,
            });
        }
    }

    Ok(request)
}

struct Prompt<R> {
    lines: R,
    enabled: bool,
}

impl<R: BufRead> Prompt<R> {
    fn ask(&mut self, field: &str) -> Result<String> {
        if !self.enabled {
            bail!("missing {} (pass it as a flag or use --interactive)", field);
        }
        let answer = self.ask_optional(field)?;
        if answer.is_empty() {
            bail!("no {} given", field);
        }
        Ok(answer)
    }

    fn ask_optional(&mut self, field: &str) -> Result<String> {
        let mut stderr = io::stderr();
        write!(stderr, "{}: ", field)?;
        stderr.flush()?;

        let mut line = String::new();
        let read = self
            .lines
            .read_line(&mut line)
            .with_context(|| format!("Failed to read {} from stdin", field))?;
        if read == 0 {
            bail!("unexpected end of input while reading {}", field);
        }
        Ok(line.trim().to_string())
    }
}
