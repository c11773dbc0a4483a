use clap::{command, Parser};
use esi_core::{
    config::{self, EsiConfig},
    expression::parse_expression,
    include::IncludeExecutor,
    parser::{Attributes, Directive, ParserRegistry},
    resolver::VariableResolvers,
    Error, EsiResult, ExecutionContext,
};
use reqwest::header::{HeaderName, HeaderValue};
use reqwest::Url;
use std::{path::PathBuf, sync::Arc};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

/// Runs a single `<esi:include>` and prints the fragment.
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Fragment to include, absolute or relative to --base-url
    src: String,

    /// Fallback fragment when src fails
    #[arg(long)]
    alt: Option<String>,

    /// Print nothing instead of failing when both src and alt fail
    #[arg(long)]
    continue_on_error: bool,

    /// Condition guarding the include, e.g. "$(HTTP_HOST) == 'example.com'"
    #[arg(short, long)]
    test: Option<String>,

    /// Incoming request header, as `name: value`. Repeatable.
    #[arg(short = 'H', long = "header")]
    headers: Vec<String>,

    /// URL of the page being processed
    #[arg(short, long)]
    base_url: Option<Url>,

    /// Path to config file
    #[arg(short, long, default_value = "esi.json")]
    config: PathBuf,

    /// Enable debug mode
    #[arg(short, long)]
    verbose: bool,
}

fn parse_header(raw: &str) -> EsiResult<(HeaderName, HeaderValue)> {
    let (name, value) = raw
        .split_once(':')
        .ok_or_else(|| Error::internal(format!("header '{}' is not 'name: value'", raw)))?;
    let name = HeaderName::try_from(name.trim())
        .map_err(|e| Error::internal(format!("invalid header name '{}': {}", name, e)))?;
    let value = HeaderValue::from_str(value.trim())
        .map_err(|e| Error::internal(format!("invalid header value '{}': {}", value, e)))?;
    Ok((name, value))
}

async fn run(cli: &Cli) -> EsiResult<()> {
    let config: EsiConfig = if cli.config.exists() {
        config::from_file(&cli.config)?
    } else {
        EsiConfig::default()
    };

    info!("config loaded.");
    debug!("config: {:?}", config);

    let mut context = match &cli.base_url {
        Some(url) => ExecutionContext::from_page_url(url.clone()),
        None => ExecutionContext::new(),
    };
    for raw in &cli.headers {
        let (name, value) = parse_header(raw)?;
        context = context.with_header(name, value);
    }
    let context = Arc::new(context);

    let mut attributes = Attributes::new();
    attributes.insert("src".to_string(), cli.src.clone());
    if let Some(alt) = &cli.alt {
        attributes.insert("alt".to_string(), alt.clone());
    }
    if cli.continue_on_error {
        attributes.insert("onerror".to_string(), "continue".to_string());
    }
    let Directive::Include(directive) = ParserRegistry::default().parse("esi:include", &attributes, "")?;

    let condition = cli.test.as_deref().map(parse_expression).transpose()?;
    let resolvers = VariableResolvers::standard(context.clone());
    let executor = IncludeExecutor::from_config(&config)?;

    match executor
        .execute(&directive, condition.as_ref(), &resolvers, &context)
        .await?
    {
        Some(body) => print!("{}", body),
        None => debug!("condition is false, nothing included"),
    }

    Ok(())
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::from_default_env()
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run(&cli).await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
