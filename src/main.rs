//! m3u8-downloader - CLI entry point.

use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::{fmt, EnvFilter};

use m3u8_downloader::{
    cli::{forward_interrupts, Args},
    config::{validate_config, Config},
    download::{start_with_options, DownloadOptions, DownloadResult},
    error::{exit_codes, Error, Result},
    output::{
        create_spinner, print_banner, print_config_summary, print_error, print_info,
        print_result_summary, print_success, print_warning,
    },
};

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(result) if result.is_complete_success() => ExitCode::from(exit_codes::SUCCESS as u8),
        Ok(_) => ExitCode::from(exit_codes::PARTIAL_FAILURE as u8),
        Err(e) => {
            print_error(&format!("{}", e));
            let code = match e {
                Error::Config(_)
                | Error::ConfigValidation { .. }
                | Error::TomlParse(_)
                | Error::InvalidFilename(_)
                | Error::FFmpegNotFound => exit_codes::CONFIG_ERROR,
                ref e if e.is_playlist_error() => exit_codes::PLAYLIST_ERROR,
                Error::Transport { .. }
                | Error::HttpStatus { .. }
                | Error::Http(_)
                | Error::Filesystem { .. } => exit_codes::DOWNLOAD_ERROR,
                _ => exit_codes::UNEXPECTED_ERROR,
            };
            ExitCode::from(code as u8)
        }
    }
}

async fn run() -> Result<DownloadResult> {
    // Parse CLI arguments
    let args = Args::parse();

    // Set up logging
    let log_level = if args.debug { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));

    fmt().with_env_filter(filter).with_target(false).init();

    if !args.json {
        print_banner();
    }

    // Load configuration
    let mut config = Config::load_or_default(&args.config)?;

    // Merge CLI arguments into config
    args.merge_into_config(&mut config);

    // Validate configuration
    validate_config(&config)?;

    let options = DownloadOptions::from_config(args.url.trim(), &config);
    if !args.json {
        print_config_summary(&options);
    }

    let spinner = config
        .download
        .show_progress
        .then(|| create_spinner("Resolving playlist..."));
    let started = start_with_options(options).await;
    if let Some(spinner) = spinner {
        spinner.finish_and_clear();
    }
    let status = started?;

    if !args.json {
        print_info(&format!("Downloading {} segment(s)", status.total()));
    }

    let stop = status.stop_token();
    tokio::spawn(async move {
        let forced =
            forward_interrupts(stop, || async { tokio::signal::ctrl_c().await.is_ok() }).await;
        if forced {
            print_error("Interrupted again, exiting");
            std::process::exit(exit_codes::UNEXPECTED_ERROR);
        }
    });

    let result = status.into_result(config.download.show_progress).await;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        print_result_summary(&result);
        match result.final_output() {
            Some(path) => print_success(&format!("Saved {}", path.display())),
            None if result.merge.is_none() && result.conversion.is_none() => {}
            None => print_warning("No final output was produced"),
        }
    }

    Ok(result)
}
