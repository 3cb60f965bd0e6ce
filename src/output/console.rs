//! Console output utilities.

use console::style;

use crate::download::DownloadOptions;

/// Print an info message.
pub fn print_info(message: &str) {
    println!("{} {}", style("INFO").cyan().bold(), message);
}

/// Print a success message.
pub fn print_success(message: &str) {
    println!("{} {}", style("OK").green().bold(), message);
}

/// Print a warning message.
pub fn print_warning(message: &str) {
    println!("{} {}", style("WARN").yellow().bold(), message);
}

/// Print an error message.
pub fn print_error(message: &str) {
    eprintln!("{} {}", style("ERROR").red().bold(), message);
}

/// Print the application banner.
pub fn print_banner() {
    let banner = r#"
╔═══════════════════════════════════════════════════════╗
║     m3u8-downloader                                   ║
║     HLS playlist downloader, merger and converter     ║
╚═══════════════════════════════════════════════════════╝
"#;
    println!("{}", style(banner).cyan());
}

/// Print the effective job settings.
pub fn print_config_summary(options: &DownloadOptions) {
    let directory = if options.output_directory.as_os_str().is_empty() {
        "(timestamped)".to_string()
    } else {
        options.output_directory.display().to_string()
    };
    let prefix = if options.output_file_prefix.trim().is_empty() {
        "(timestamped)"
    } else {
        options.output_file_prefix.as_str()
    };
    let rate = options
        .rate_limit()
        .map(|rps| format!("{} req/s", rps))
        .unwrap_or_else(|| "unlimited".to_string());

    println!();
    println!("{}", style("Configuration:").bold());
    println!("  Playlist:  {}", options.manifest_url);
    println!("  Output:    {}", options.conversion_level);
    println!("  Workers:   {}", options.workers());
    println!("  Rate:      {}", rate);
    println!("  Directory: {}", directory);
    println!("  Prefix:    {}", prefix);
    println!();
}
