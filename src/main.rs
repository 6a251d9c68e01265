use std::io::{self, Read};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use stratus_config::{InvocationConfig, ResourceMap};
use stratus_generator::{Generator, StepFunctionsGenerator, export};
use stratus_trigger::{InvokeContext, Scheduler, Transports, Trigger};
use stratus_workflow::Workflow;

/// Stratus - compile benchmark workflows and invoke deployed functions
#[derive(Parser)]
#[command(name = "stratus")]
#[command(version, about, long_about = None)]
struct Cli {
  /// Path to the invocation config (default: ~/.config/stratus/config.json)
  #[arg(long, global = true)]
  config: Option<PathBuf>,

  #[command(subcommand)]
  command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
  /// Compile a workflow definition into an orchestration document
  Generate {
    /// Path to the workflow definition (JSON)
    definition: PathBuf,

    /// Path to the function name to resource id map (JSON)
    #[arg(long)]
    resources: PathBuf,

    /// Write the document here instead of stdout
    #[arg(long, short)]
    output: Option<PathBuf>,
  },

  /// Invoke a deployed function through a persisted trigger record
  Invoke {
    /// Path to the trigger record (JSON)
    record: PathBuf,

    /// Path to the payload (JSON); read from stdin when omitted
    #[arg(long)]
    payload: Option<PathBuf>,

    /// Number of invocations
    #[arg(long, short = 'n', default_value_t = 1)]
    repetitions: usize,

    /// Run repetitions concurrently
    #[arg(long)]
    concurrent: bool,
  },
}

fn main() -> Result<()> {
  init_tracing();
  let cli = Cli::parse();

  match cli.command {
    Some(Commands::Generate {
      definition,
      resources,
      output,
    }) => {
      generate(&definition, &resources, output.as_deref())?;
    }
    Some(Commands::Invoke {
      record,
      payload,
      repetitions,
      concurrent,
    }) => {
      let config = load_config(cli.config)?;
      let rt = tokio::runtime::Runtime::new()?;
      rt.block_on(async {
        invoke(config, record, payload, repetitions, concurrent).await
      })?;
    }
    None => {
      println!("stratus - use --help to see available commands");
    }
  }

  Ok(())
}

fn init_tracing() {
  let filter = tracing_subscriber::EnvFilter::try_from_default_env()
    .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
  let _ = tracing_subscriber::fmt()
    .with_env_filter(filter)
    .with_writer(io::stderr)
    .try_init();
}

fn load_config(path: Option<PathBuf>) -> Result<InvocationConfig> {
  let path = match path {
    Some(path) => path,
    None => match dirs::config_dir() {
      Some(dir) => dir.join("stratus").join("config.json"),
      None => return Ok(InvocationConfig::default()),
    },
  };

  if !path.exists() {
    return Ok(InvocationConfig::default());
  }

  let content = std::fs::read_to_string(&path)
    .with_context(|| format!("failed to read config file: {}", path.display()))?;
  serde_json::from_str(&content)
    .with_context(|| format!("failed to parse config file: {}", path.display()))
}

fn generate(definition: &Path, resources: &Path, output: Option<&Path>) -> Result<()> {
  let content = std::fs::read_to_string(definition)
    .with_context(|| format!("failed to read definition: {}", definition.display()))?;
  let workflow = Workflow::from_json(&content)
    .with_context(|| format!("failed to parse definition: {}", definition.display()))?;

  let content = std::fs::read_to_string(resources)
    .with_context(|| format!("failed to read resource map: {}", resources.display()))?;
  let resource_map: ResourceMap = serde_json::from_str(&content)
    .with_context(|| format!("failed to parse resource map: {}", resources.display()))?;

  let graph = workflow.graph();
  let unreachable = graph.unreachable(workflow.root_name());
  if !unreachable.is_empty() {
    warn!(states = ?unreachable, "states not reachable from root");
  }

  let document = StepFunctionsGenerator::new()
    .generate(&workflow, &resource_map)
    .context("failed to generate document")?;
  let text = export(&document)?;

  match output {
    Some(path) => {
      std::fs::write(path, format!("{}\n", text))
        .with_context(|| format!("failed to write document: {}", path.display()))?;
      info!(path = %path.display(), states = workflow.len(), "document written");
    }
    None => println!("{}", text),
  }

  Ok(())
}

async fn invoke(
  config: InvocationConfig,
  record: PathBuf,
  payload: Option<PathBuf>,
  repetitions: usize,
  concurrent: bool,
) -> Result<()> {
  let content = tokio::fs::read_to_string(&record)
    .await
    .with_context(|| format!("failed to read trigger record: {}", record.display()))?;
  let record_value: serde_json::Value = serde_json::from_str(&content)
    .with_context(|| format!("failed to parse trigger record: {}", record.display()))?;
  let trigger = Trigger::from_record(&record_value)?;

  let payload = match payload {
    Some(path) => {
      let content = tokio::fs::read_to_string(&path)
        .await
        .with_context(|| format!("failed to read payload: {}", path.display()))?;
      serde_json::from_str(&content)
        .with_context(|| format!("failed to parse payload: {}", path.display()))?
    }
    None => read_payload_from_stdin()?,
  };

  info!(
    trigger = %trigger.trigger_type(),
    name = %trigger.name(),
    repetitions,
    concurrent,
    "invoking"
  );

  // Provider SDK clients are supplied by deployments embedding the library;
  // the CLI reaches HTTP triggers only.
  let context = InvokeContext::new(Transports::new(), config);

  if concurrent {
    let scheduler = Scheduler::new(context);
    let handles = (0..repetitions)
      .map(|_| trigger.async_invoke(&scheduler, payload.clone()))
      .collect::<Result<Vec<_>, _>>()?;
    for handle in handles {
      let result = handle.join().await.context("invocation failed")?;
      println!("{}", serde_json::to_string(&result)?);
    }
  } else {
    let cancel = CancellationToken::new();
    for _ in 0..repetitions {
      let result = trigger
        .sync_invoke(&context, &payload, &cancel)
        .await
        .context("invocation failed")?;
      println!("{}", serde_json::to_string(&result)?);
    }
  }

  Ok(())
}

fn read_payload_from_stdin() -> Result<serde_json::Value> {
  use std::io::IsTerminal;

  if io::stdin().is_terminal() {
    return Ok(serde_json::json!({}));
  }

  let mut input = String::new();
  io::stdin()
    .read_to_string(&mut input)
    .context("failed to read payload from stdin")?;

  if input.trim().is_empty() {
    Ok(serde_json::json!({}))
  } else {
    serde_json::from_str(&input).context("failed to parse payload JSON from stdin")
  }
}
