mod cli;

use anyhow::{bail, Context as _};
use cli::init::{InitConfig, InitResult};
use cli::output::Output;
use cli::{Cli, Commands};
use delegator::integrations::ReqwestDispatcher;
use delegator::types::{PlanInput, PlanResult};
use delegator::utils::toml_config::{AuthConfig, DelegatorConfig};
use delegator::{CapabilityRegistry, Delegator, PlanContext};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse_args();
    let output = if cli.no_color {
        Output::no_color()
    } else {
        Output::new()
    };

    match cli.command {
        Commands::Init {
            path,
            force,
            provider,
        } => {
            init_tracing("warn", cli.verbose, cli.json_logs);
            let config = InitConfig {
                path,
                force,
                provider,
            };
            match cli::init::run(config, &output) {
                InitResult::Success | InitResult::AlreadyExists => Ok(()),
                InitResult::Error(e) => bail!("initialization failed: {}", e),
            }
        }
        Commands::Validate => {
            init_tracing("warn", cli.verbose, cli.json_logs);
            validate(&cli.config, &output)
        }
        Commands::Capabilities => {
            let config = load_config(&cli.config, &output)?;
            init_tracing(&config.runtime.log_level, cli.verbose, cli.json_logs);
            list_capabilities(&config, &output);
            Ok(())
        }
        Commands::Run {
            plan,
            context,
            resume,
            output: result_path,
        } => {
            let config = load_config(&cli.config, &output)?;
            init_tracing(&config.runtime.log_level, cli.verbose, cli.json_logs);
            let request = RunRequest {
                plan,
                context,
                resume,
                result_path,
            };
            run_plan(config, request, &output).await
        }
    }
}

/// `RUST_LOG` wins over the configured level; `--verbose` forces debug.
fn init_tracing(level: &str, verbose: bool, json: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level))
    };

    let registry = tracing_subscriber::registry().with(filter);
    let result = if json {
        registry.with(fmt::layer().json().with_writer(std::io::stderr)).try_init()
    } else {
        registry.with(fmt::layer().with_writer(std::io::stderr)).try_init()
    };
    if let Err(e) = result {
        eprintln!("failed to install tracing subscriber: {}", e);
    }
}

fn load_config(path: &Path, output: &Output) -> anyhow::Result<DelegatorConfig> {
    DelegatorConfig::load(path).map_err(|e| {
        output.error(&e.to_string());
        output.hint("Run 'plan-delegator init' to create a starter configuration");
        anyhow::anyhow!(e)
    })
}

fn validate(path: &Path, output: &Output) -> anyhow::Result<()> {
    output.header(&format!("Validating {}", path.display()));

    let config = load_config(path, output)?;
    let warnings = config
        .validate_with_warnings()
        .context("configuration is invalid")?;

    output.success("Configuration is valid");
    match config.model.to_provider() {
        Ok(provider) => output.kv("model", &format!("{} ({})", provider.model(), provider.name())),
        Err(e) => output.warning(&e.to_string()),
    }
    output.kv("capabilities", &config.enabled_capabilities().join(", "));
    for warning in &warnings {
        output.warning(&warning.to_string());
    }
    Ok(())
}

fn list_capabilities(config: &DelegatorConfig, output: &Output) {
    output.header("Capabilities");
    output.table_header(&["Name", "Kind", "Auth", "Status"]);
    for (name, capability) in &config.capabilities {
        let auth = match &capability.auth {
            Some(AuthConfig::Bearer { .. }) => "bearer",
            Some(AuthConfig::GoogleProxy { .. }) => "google-proxy",
            Some(AuthConfig::OauthRefresh { .. }) => "oauth-refresh",
            None => "none",
        };
        let status = if capability.enabled {
            "enabled"
        } else {
            "disabled"
        };
        output.table_row(&[name.as_str(), capability.kind.as_str(), auth, status]);
    }
    if config.capabilities.is_empty() {
        output.info("No capabilities configured");
    }
}

struct RunRequest {
    plan: PathBuf,
    context: Option<String>,
    resume: Option<PathBuf>,
    result_path: Option<PathBuf>,
}

async fn run_plan(
    config: DelegatorConfig,
    request: RunRequest,
    output: &Output,
) -> anyhow::Result<()> {
    let plan_text = std::fs::read_to_string(&request.plan)
        .with_context(|| format!("failed to read plan {}", request.plan.display()))?;
    let steps = serde_json::from_str::<PlanInput>(&plan_text)
        .with_context(|| format!("{} is not a valid plan", request.plan.display()))?
        .into_steps();

    let provider = config.model.to_provider()?;
    tracing::info!(provider = provider.name(), model = provider.model(), "Using completion model");
    let llm = provider.create_client().await?;

    let dispatcher = Arc::new(ReqwestDispatcher::new(config.runtime.request_timeout())?);
    let registry = Arc::new(CapabilityRegistry::from_config(&config, dispatcher, None)?);
    if registry.is_empty() {
        output.warning("No capabilities registered; only analysis steps will run");
    }

    let mut delegator = Delegator::new(llm, registry);
    if let Some(time_zone) = &config.delegator.time_zone {
        delegator = delegator.with_time_zone(time_zone.clone());
    }

    let extra = request.context.unwrap_or_default();
    let context = match &request.resume {
        Some(path) => {
            let previous_text = std::fs::read_to_string(path)
                .with_context(|| format!("failed to read previous result {}", path.display()))?;
            let previous: PlanResult = serde_json::from_str(&previous_text)
                .with_context(|| format!("{} is not a plan result", path.display()))?;
            let mut context = PlanContext::resume(&previous);
            context.append_narrative(&extra);
            context
        }
        None => {
            delegator.initial_context(&format!("{}{}", config.delegator.context, extra))
        }
    };

    let cancel = CancellationToken::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupt received, cancelling plan");
            on_signal.cancel();
        }
    });

    output.banner();
    output.info(&format!("Running {} step(s) from {}", steps.len(), request.plan.display()));

    let result = delegator.run_with_context(steps, context, &cancel).await;
    output.plan_summary(&result);

    if let Some(path) = &request.result_path {
        let json = serde_json::to_string_pretty(&result)?;
        std::fs::write(path, json)
            .with_context(|| format!("failed to write result {}", path.display()))?;
        output.created("result", &path.display().to_string());
        output.command(&format!(
            "plan-delegator run <next-plan.json> --resume {}",
            path.display()
        ));
    }

    Ok(())
}
