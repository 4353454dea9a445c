//! Avatar CLI - store and inspect per-user profile images.
//!
//! Provides both human-friendly and agent-friendly (robot mode) interfaces.
#![forbid(unsafe_code)]

use std::io::{self, IsTerminal};

use base64::Engine;
use clap::Parser;
use console::style;
use serde::Serialize;
use tracing::{debug, error, warn};

use avatar_cache::cli::{self, Cli, Commands};
use avatar_cache::config::Settings;
use avatar_cache::error::{AvatarError, Result};
use avatar_cache::logging;
use avatar_cache::paths::UserId;
use avatar_cache::store::{AvatarInfo, AvatarStore};

/// Build information embedded at compile time.
mod build_info {
    pub const VERSION: &str = env!("CARGO_PKG_VERSION");

    pub fn git_sha() -> &'static str {
        option_env!("VERGEN_GIT_SHA").unwrap_or("unknown")
    }

    pub fn git_dirty() -> &'static str {
        option_env!("VERGEN_GIT_DIRTY").unwrap_or("false")
    }

    pub fn build_timestamp() -> &'static str {
        option_env!("VERGEN_BUILD_TIMESTAMP").unwrap_or("unknown")
    }

    pub fn rustc_semver() -> &'static str {
        option_env!("VERGEN_RUSTC_SEMVER").unwrap_or("unknown")
    }

    pub fn target() -> &'static str {
        option_env!("VERGEN_CARGO_TARGET_TRIPLE").unwrap_or("unknown")
    }
}

fn main() {
    let cli = Cli::parse();

    if cli.no_color || !io::stdout().is_terminal() {
        console::set_colors_enabled(false);
        console::set_colors_enabled_stderr(false);
    }

    logging::init_logging(cli.use_json(), cli.verbose, cli.quiet);

    if let Err(e) = run(&cli) {
        error!(
            kind = e.kind(),
            primary = e.primary().kind(),
            error = %e,
            "Command failed"
        );
        output_error(&cli, &e);
        std::process::exit(1);
    }
}

fn run(cli: &Cli) -> Result<()> {
    match &cli.command {
        None => {
            print_quick_start(cli);
            Ok(())
        }
        Some(Commands::Save(args)) => cmd_save(cli, args),
        Some(Commands::Load(args)) => cmd_load(cli, args),
        Some(Commands::Paths(args)) => cmd_paths(cli, args),
        Some(Commands::Version) => {
            cmd_version(cli);
            Ok(())
        }
        Some(Commands::Completions(args)) => {
            cmd_completions(args);
            Ok(())
        }
    }
}

// === Quick Start ===

fn print_quick_start(cli: &Cli) {
    if cli.use_json() {
        output_json(
            cli,
            &serde_json::json!({
                "tool": "avatar",
                "version": build_info::VERSION,
                "description": "Crash-safe local avatar cache",
                "commands": {
                    "save": "avatar save <USER_ID> <IMAGE>",
                    "load": "avatar load <USER_ID> [--output FILE] [--base64]",
                    "paths": "avatar paths <USER_ID>",
                },
                "output_modes": {
                    "human": "--format=text (default)",
                    "robot": "--robot or --format=json",
                    "compact": "--format=json-compact",
                },
            }),
        );
        return;
    }

    println!(
        "{} {} - avatar cache\n",
        style("avatar").bold().cyan(),
        build_info::VERSION
    );
    println!("{}", style("QUICK START").bold().underlined());
    println!();
    println!("  {}  Store an avatar", style("avatar save 42 photo.jpg").green());
    println!("  {}  Inspect an avatar", style("avatar load 42").green());
    println!("  {}  Export as PNG", style("avatar load 42 -o me.png").green());
    println!("  {}  Show file locations", style("avatar paths 42").green());
    println!();
    println!("Run {} for full help", style("avatar --help").yellow());
}

// === Command Implementations ===

fn open_store(cli: &Cli) -> Result<AvatarStore> {
    let settings = Settings::load(cli.config.as_deref())?.with_data_dir(cli.data_dir.clone());
    let root = settings.resolve_app_data_root();
    debug!(root = %root.display(), "Using data root");
    Ok(AvatarStore::new(root))
}

fn cmd_save(cli: &Cli, args: &cli::SaveArgs) -> Result<()> {
    let user_id = UserId::parse(&args.user_id)?;
    let store = open_store(cli)?;
    let outcome = store.save(&user_id, &args.image)?;

    if cli.use_json() {
        output_json(
            cli,
            &serde_json::json!({ "ok": true, "saved": outcome }),
        );
    } else if !cli.quiet {
        println!(
            "Avatar for {} saved ({} bytes{})",
            style(&user_id).green(),
            outcome.bytes_written,
            if outcome.reencoded {
                ", converted to PNG"
            } else {
                ""
            }
        );
    }
    Ok(())
}

/// Load report for JSON output.
#[derive(Serialize)]
struct LoadReport<'a> {
    user_id: &'a UserId,
    present: bool,
    default_avatar: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    avatar: Option<AvatarInfo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    exported_to: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    data_base64: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error_kind: Option<&'static str>,
}

fn cmd_load(cli: &Cli, args: &cli::LoadArgs) -> Result<()> {
    let user_id = UserId::parse(&args.user_id)?;
    let store = open_store(cli)?;

    // Unreadable avatars fall back to the default; the error only goes to the log.
    let (loaded, error_kind) = match store.load_with_info(&user_id) {
        Ok(loaded) => (loaded, None),
        Err(e) => {
            warn!(user_id = %user_id, kind = e.kind(), error = %e, "Stored avatar unreadable");
            (None, Some(e.kind()))
        }
    };
    let (bytes, info) = loaded.unzip();

    let mut exported_to = None;
    if let (Some(out), Some(data)) = (&args.output, &bytes) {
        std::fs::write(out, data)?;
        exported_to = Some(out.display().to_string());
    }

    let data_base64 = if args.base64 {
        bytes
            .as_deref()
            .map(|b| base64::engine::general_purpose::STANDARD.encode(b))
    } else {
        None
    };

    if cli.use_json() {
        output_json(
            cli,
            &LoadReport {
                user_id: &user_id,
                present: info.is_some(),
                default_avatar: info.is_none(),
                avatar: info,
                exported_to,
                data_base64,
                error_kind,
            },
        );
        return Ok(());
    }

    match info {
        Some(info) => {
            println!("{}: {}", style("User").bold(), user_id);
            println!("{}: {}", style("File").bold(), info.location.target_path.display());
            println!("{}: {}x{} px", style("Size").bold(), info.width, info.height);
            println!("{}: {} bytes", style("Bytes").bold(), info.size_bytes);
            println!("{}: {}", style("SHA-256").bold(), info.sha256);
            if let Some(modified) = info.modified {
                println!("{}: {}", style("Modified").bold(), modified.to_rfc3339());
            }
            if let Some(out) = exported_to {
                println!("Exported to {out}");
            }
            if let Some(data) = data_base64 {
                println!("{data}");
            }
        }
        None if error_kind.is_some() => {
            println!(
                "{}",
                style(format!("Could not load avatar for {user_id}; using default avatar")).yellow()
            );
        }
        None => println!("No avatar stored for {user_id}; using default avatar"),
    }
    Ok(())
}

fn cmd_paths(cli: &Cli, args: &cli::PathsArgs) -> Result<()> {
    let user_id = UserId::parse(&args.user_id)?;
    let store = open_store(cli)?;
    let location = store.location(&user_id);

    if cli.use_json() {
        output_json(
            cli,
            &serde_json::json!({
                "root": store.root().display().to_string(),
                "location": location,
            }),
        );
    } else {
        println!("{}: {}", style("Root").bold(), store.root().display());
        println!("{}: {}", style("Avatar").bold(), location.target_path.display());
        println!("{}: {}", style("Backup").bold(), location.backup_path.display());
    }
    Ok(())
}

fn cmd_version(cli: &Cli) {
    if cli.use_json() {
        output_json(
            cli,
            &serde_json::json!({
                "version": build_info::VERSION,
                "git_sha": build_info::git_sha(),
                "git_dirty": build_info::git_dirty() == "true",
                "build_timestamp": build_info::build_timestamp(),
                "rustc_version": build_info::rustc_semver(),
                "target": build_info::target(),
            }),
        );
    } else {
        println!("avatar {}", build_info::VERSION);
        println!(
            "git: {}{}",
            build_info::git_sha(),
            if build_info::git_dirty() == "true" {
                " (dirty)"
            } else {
                ""
            }
        );
        println!("built: {}", build_info::build_timestamp());
        println!("rustc: {}", build_info::rustc_semver());
        println!("target: {}", build_info::target());
    }
}

fn cmd_completions(args: &cli::CompletionsArgs) {
    use clap::CommandFactory;
    clap_complete::generate(args.shell, &mut Cli::command(), "avatar", &mut io::stdout());
}

// === Utility Functions ===

fn output_json<T: Serialize>(cli: &Cli, data: &T) {
    let json = if cli.use_compact_json() {
        serde_json::to_string(data)
    } else {
        serde_json::to_string_pretty(data)
    };
    match json {
        Ok(json) => println!("{json}"),
        Err(e) => error!(error = %e, "Failed to serialize output"),
    }
}

fn output_error(cli: &Cli, error: &AvatarError) {
    if cli.use_json() {
        let json = serde_json::json!({
            "error": true,
            "message": error.user_message(),
            "kind": error.kind(),
            "suggestion": error.suggestion(),
            "recoverable": error.is_user_recoverable(),
        });
        match serde_json::to_string_pretty(&json) {
            Ok(text) => eprintln!("{text}"),
            Err(_) => eprintln!("{json}"),
        }
    } else {
        eprintln!("{}: {}", style("Error").red().bold(), error.user_message());
        if let Some(suggestion) = error.suggestion() {
            eprintln!("{}: {}", style("Hint").yellow(), suggestion);
        }
    }
}
