use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use clinical_query_agent::config::AgentConfig;
use clinical_query_agent::dataset::Dataset;
use clinical_query_agent::llm::LlmClient;
use clinical_query_agent::pipeline::QueryPipeline;
use clinical_query_agent::schema::SchemaRegistry;
use clinical_query_agent::{report, risk};
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::EnvFilter;

const DEMO_QUESTIONS: [&str; 3] = [
    "Who died?",
    "Who had fractures?",
    "Who had severe events involving cancer?",
];

#[derive(Parser)]
#[command(name = "clinical-query-agent")]
#[command(about = "Ask natural-language questions about an ADAE adverse-event dataset")]
struct Args {
    /// Path to the ADAE CSV file (or set ADAE_DATA_PATH)
    #[arg(short, long, global = true)]
    data: Option<PathBuf>,

    /// OpenAI API key (or set OPENAI_API_KEY env var)
    #[arg(long, global = true)]
    api_key: Option<String>,

    /// Model name (or set OPENAI_MODEL)
    #[arg(long, global = true)]
    model: Option<String>,

    /// Distinct values sampled when suggesting an alternative filter value
    #[arg(long, global = true)]
    sample_cap: Option<usize>,

    /// Timeout for each LLM call, in seconds
    #[arg(long, global = true)]
    timeout_secs: Option<u64>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Answer a single question
    Ask {
        question: String,

        /// Print the answer as JSON
        #[arg(long)]
        json: bool,
    },
    /// Interactive question loop; type `exit` to quit
    Chat,
    /// Run the example questions
    Demo,
    /// Severity-weighted risk score for one subject
    Risk { subject_id: String },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(io::stderr)
        .init();

    let args = Args::parse();
    let config = load_config(&args)?;

    let dataset = Dataset::load_csv(&config.data_path)?;

    match args.command {
        Commands::Risk { subject_id } => {
            let risk = risk::subject_risk(&dataset, &subject_id)?;
            println!("{}", report::render_risk(&risk));
            Ok(())
        }
        Commands::Ask { question, json } => {
            let pipeline = build_pipeline(&config)?;
            let answer = pipeline.answer(&question, &dataset).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&answer)?);
            } else {
                print!("{}", report::render_answer(&answer)?);
            }
            Ok(())
        }
        Commands::Chat => {
            let pipeline = build_pipeline(&config)?;
            run_chat(&pipeline, &dataset).await
        }
        Commands::Demo => {
            let pipeline = build_pipeline(&config)?;
            run_demo(&pipeline, &dataset).await;
            Ok(())
        }
    }
}

fn load_config(args: &Args) -> Result<AgentConfig> {
    let mut config = AgentConfig::from_env()?;
    if let Some(ref data) = args.data {
        config.data_path = data.clone();
    }
    if let Some(ref key) = args.api_key {
        config.llm.api_key = Some(key.clone());
    }
    if let Some(ref model) = args.model {
        config.llm.model = model.clone();
    }
    if let Some(cap) = args.sample_cap {
        config.pipeline.sample_cap = cap;
    }
    if let Some(secs) = args.timeout_secs {
        config.llm.request_timeout = Duration::from_secs(secs);
        config.pipeline.call_timeout = Some(Duration::from_secs(secs));
    }
    Ok(config)
}

fn build_pipeline(config: &AgentConfig) -> Result<QueryPipeline> {
    if config.llm.api_key.is_none() {
        bail!(
            "OPENAI_API_KEY is not set. To use this agent, set your OpenAI API key:\n\n  \
             Option 1 - Export in your shell:\n    export OPENAI_API_KEY='your-api-key-here'\n\n  \
             Option 2 - Put it in a .env file next to where you run the agent:\n    OPENAI_API_KEY=your-api-key-here\n\n  \
             Option 3 - Pass it directly:\n    clinical-query-agent --api-key 'your-api-key-here' ask \"Who died?\"\n\n\
             Get an API key at: https://platform.openai.com/api-keys"
        );
    }
    let client = LlmClient::from_config(&config.llm)?;
    info!("Using model {}", client.model());
    Ok(QueryPipeline::new(
        Arc::new(client),
        SchemaRegistry::adae().clone(),
        config.pipeline.clone(),
    ))
}

async fn run_chat(pipeline: &QueryPipeline, dataset: &Dataset) -> Result<()> {
    println!("ClinicalTrialDataAgent Ready");
    let stdin = io::stdin();
    loop {
        print!("\nAsk a question (or type exit): ");
        io::stdout().flush()?;

        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            break;
        }
        let question = line.trim();
        if question.is_empty() {
            continue;
        }
        if question.eq_ignore_ascii_case("exit") {
            break;
        }

        match pipeline.answer(question, dataset).await {
            Ok(answer) => print!("{}", report::render_answer(&answer)?),
            Err(e) if e.is_query_error() => eprintln!("  Could not answer that question: {}", e),
            Err(e) => eprintln!("  Error: {}", e),
        }
    }
    Ok(())
}

async fn run_demo(pipeline: &QueryPipeline, dataset: &Dataset) {
    println!("Running {} example queries\n", DEMO_QUESTIONS.len());
    println!("{}", "=".repeat(70));

    for (i, question) in DEMO_QUESTIONS.iter().enumerate() {
        println!("\n--- Query {}: {} ---", i + 1, question);
        match pipeline.answer(question, dataset).await {
            Ok(answer) => print!("{}", report::render_summary(&answer)),
            Err(e) => println!("  Error: {}", e),
        }
        println!();
    }

    println!("{}", "=".repeat(70));
    println!("Done.");
}
