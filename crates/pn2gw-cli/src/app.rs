use anyhow::{anyhow, Context, Result};
use chrono::Utc;
use pn2gw_config::{AppConfig, ConfigLoader};
use pn2gw_core::report::{self, Presentation};
use pn2gw_wasm::{session, ConversionInvoker, HostConfig, ModuleSource};
use std::io::{IsTerminal, Read, Write};
use std::path::PathBuf;

use crate::args::{build_request, Args};
use crate::logging;

/// Tears the guest session down when the run ends, however it ends.
struct SessionGuard;

impl Drop for SessionGuard {
    fn drop(&mut self) {
        session::teardown();
    }
}

/// Load configuration, start the guest, convert one input.
pub async fn run(args: Args) -> Result<()> {
    let config = args.apply(ConfigLoader::new(&args.config).load()?);
    ConfigLoader::validate(&config)?;

    if let Err(e) = logging::init(&config.logging) {
        eprintln!("warning: {:#}", e);
    }
    pn2gw_core::init();

    if args.print_config {
        print!("{}", config.to_toml()?);
        return Ok(());
    }

    let csv_text = read_input(&args)?;
    let request = build_request(csv_text, &config)?;

    let _guard = SessionGuard;
    let invoker = start_guest(&config).await?;

    let result = invoker.convert(&request);
    match report::present_conversion(&result, Utc::now()) {
        Presentation::Success {
            message,
            hand_history,
            skipped_report,
        } => {
            write_output(&args, &hand_history)?;
            eprintln!("{}", message);

            if let Some(path) = &args.skipped_report {
                match skipped_report {
                    Some(text) => {
                        std::fs::write(path, text).with_context(|| {
                            format!("Failed to write skipped report {}", path.display())
                        })?;
                        tracing::info!(path = %path.display(), "Wrote skipped hands report");
                    }
                    None => tracing::info!("No skipped hands to report"),
                }
            }
            Ok(())
        }
        Presentation::Error { message, detail } => {
            Err(anyhow!("{} {}", message, detail.unwrap_or_default()))
        }
    }
}

async fn start_guest(config: &AppConfig) -> Result<ConversionInvoker> {
    let host_config = HostConfig::default().with_max_memory_pages(config.module.max_memory_pages);
    let source = ModuleSource::Path(config.module.path.clone());

    match session::start(host_config, source).await {
        Ok(loader) => Ok(ConversionInvoker::new(loader)),
        Err(err) => {
            let bundle = session::current().ok().and_then(|loader| loader.diagnostics());
            if let Some(bundle) = bundle {
                if let Presentation::Error { message, detail } = report::present_load_failure(&bundle) {
                    eprintln!("{}", message);
                    if let Some(detail) = detail {
                        eprintln!("{}", detail);
                    }
                }
            }
            Err(err.into())
        }
    }
}

fn read_input(args: &Args) -> Result<String> {
    if let Some(path) = &args.input {
        return std::fs::read_to_string(path)
            .with_context(|| format!("failed to open input file {}", path.display()));
    }

    let stdin = std::io::stdin();
    if stdin.is_terminal() {
        return Err(anyhow!(
            "no input specified. Provide --input (-i) or pipe data to stdin"
        ));
    }

    let mut text = String::new();
    stdin.lock().read_to_string(&mut text)?;
    Ok(text)
}

fn write_output(args: &Args, hand_history: &str) -> Result<()> {
    let path: Option<PathBuf> = if args.auto_name {
        Some(
            args.output_dir
                .join(report::output_file_name(hand_history, Utc::now())),
        )
    } else {
        args.output.clone()
    };

    match path {
        Some(path) => {
            std::fs::write(&path, hand_history)
                .with_context(|| format!("failed to write output file {}", path.display()))?;
            tracing::info!(path = %path.display(), "Wrote converted hand history");
        }
        None => {
            let mut stdout = std::io::stdout().lock();
            stdout.write_all(hand_history.as_bytes())?;
            stdout.flush()?;
        }
    }

    Ok(())
}
