mod logging;

use std::path::{Path, PathBuf};

use anyhow::{Result, bail};
use clap::{Args, Parser, Subcommand};
use rawfix_core::config::{ConfigOverrides, FileConfig, RunConfig, load_config};
use rawfix_core::pipeline::{RunOptions, RunReport, run};
use rawfix_core::publish::PublishOutcome;
use rawfix_core::repair::FileOutcome;
use rawfix_core::runtime::{
    PathOverrides, ResolutionContext, ResolvedPaths, resolve_config_path, resolve_paths,
};
use rawfix_core::vcs::{GitCli, find_git_binary};

#[derive(Debug, Parser)]
#[command(
    name = "rawfix",
    version,
    about = "Percent-encode raw GitHub URLs in cached JSON files and publish the result"
)]
struct Cli {
    #[arg(long, global = true, value_name = "PATH")]
    project_root: Option<PathBuf>,
    #[arg(long, global = true, value_name = "PATH", help = "Directory scanned for JSON files")]
    cache_dir: Option<PathBuf>,
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,
    #[arg(long, global = true, help = "Print resolved runtime diagnostics")]
    diagnostics: bool,
    #[arg(short, long, global = true, help = "Enable debug logging on stderr")]
    verbose: bool,
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Clone)]
struct RuntimeOptions {
    project_root: Option<PathBuf>,
    cache_dir: Option<PathBuf>,
    config: Option<PathBuf>,
    diagnostics: bool,
}

impl RuntimeOptions {
    fn from_cli(cli: &Cli) -> Self {
        Self {
            project_root: cli.project_root.clone(),
            cache_dir: cli.cache_dir.clone(),
            config: cli.config.clone(),
            diagnostics: cli.diagnostics,
        }
    }

    fn path_overrides(&self) -> PathOverrides {
        PathOverrides {
            project_root: self.project_root.clone(),
            cache_dir: self.cache_dir.clone(),
            config: self.config.clone(),
        }
    }
}

#[derive(Debug, Subcommand)]
enum Commands {
    #[command(about = "Rewrite URLs, then commit and push (default)")]
    Fix(FixArgs),
    #[command(about = "Report URLs that need encoding; exit non-zero if any")]
    Check(CheckArgs),
    #[command(about = "Show resolved paths and settings")]
    Paths,
}

#[derive(Debug, Args, Default)]
struct RepositoryArgs {
    #[arg(long, help = "Repository owner in raw URLs")]
    owner: Option<String>,
    #[arg(long, help = "Repository name in raw URLs")]
    repo: Option<String>,
    #[arg(long, help = "Branch in raw URLs")]
    branch: Option<String>,
}

#[derive(Debug, Args, Default)]
struct FixArgs {
    #[command(flatten)]
    repository: RepositoryArgs,
    #[arg(long, help = "Show fixes without writing files or publishing")]
    dry_run: bool,
    #[arg(long, help = "Print a unified diff for each changed file")]
    diff: bool,
    #[arg(long, help = "Write fixes but skip commit and push")]
    no_publish: bool,
    #[arg(long, value_name = "NAME", help = "Remote to push to")]
    remote: Option<String>,
    #[arg(short, long, value_name = "TEXT", help = "Commit message")]
    message: Option<String>,
    #[arg(long, help = "Print the run report as JSON")]
    json: bool,
}

#[derive(Debug, Args)]
struct CheckArgs {
    #[command(flatten)]
    repository: RepositoryArgs,
    #[arg(long, help = "Print a unified diff for each file that would change")]
    diff: bool,
    #[arg(long, help = "Print the run report as JSON")]
    json: bool,
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    logging::init_logging(cli.verbose)?;
    let runtime = RuntimeOptions::from_cli(&cli);

    match cli.command {
        Some(Commands::Fix(args)) => run_fix(&runtime, args),
        Some(Commands::Check(args)) => run_check(&runtime, args),
        Some(Commands::Paths) => run_paths(&runtime),
        None => run_fix(&runtime, FixArgs::default()),
    }
}

fn run_fix(runtime: &RuntimeOptions, args: FixArgs) -> Result<()> {
    let (paths, file) = resolve_runtime(runtime)?;
    let overrides = ConfigOverrides {
        owner: args.repository.owner,
        repository: args.repository.repo,
        branch: args.repository.branch,
        remote: args.remote,
        commit_message: args.message,
        publish: args.no_publish.then_some(false),
    };
    let config = RunConfig::resolve(&paths.project_root, paths.cache_dir.clone(), &file, &overrides)?;
    let vcs = GitCli::new(&config.repo_root);
    let report = run(
        &config,
        &vcs,
        RunOptions {
            dry_run: args.dry_run,
            capture_diff: args.diff,
        },
    )?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(if args.dry_run { "fix (dry run)" } else { "fix" }, &config, &report);
    }
    if runtime.diagnostics {
        eprintln!("\n[diagnostics]\n{}", paths.diagnostics());
    }
    Ok(())
}

fn run_check(runtime: &RuntimeOptions, args: CheckArgs) -> Result<()> {
    let (paths, file) = resolve_runtime(runtime)?;
    let overrides = ConfigOverrides {
        owner: args.repository.owner,
        repository: args.repository.repo,
        branch: args.repository.branch,
        ..ConfigOverrides::default()
    };
    let config = RunConfig::resolve(&paths.project_root, paths.cache_dir.clone(), &file, &overrides)?;
    let vcs = GitCli::new(&config.repo_root);
    let report = run(
        &config,
        &vcs,
        RunOptions {
            dry_run: true,
            capture_diff: args.diff,
        },
    )?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report("check", &config, &report);
    }
    if runtime.diagnostics {
        eprintln!("\n[diagnostics]\n{}", paths.diagnostics());
    }

    if report.files_fixed > 0 {
        bail!(
            "{} file(s) contain {} raw URL(s) that need encoding; run `rawfix fix`",
            report.files_fixed,
            report.urls_fixed
        );
    }
    Ok(())
}

fn run_paths(runtime: &RuntimeOptions) -> Result<()> {
    let (paths, file) = resolve_runtime(runtime)?;
    let config = RunConfig::resolve(
        &paths.project_root,
        paths.cache_dir.clone(),
        &file,
        &ConfigOverrides::default(),
    )?;

    println!("runtime paths");
    println!("project_root: {}", normalize_path(&paths.project_root));
    println!(
        "cache_dir: {} ({})",
        normalize_path(&paths.cache_dir),
        if paths.cache_dir.is_dir() { "found" } else { "missing" }
    );
    println!(
        "config_path: {} ({})",
        normalize_path(&paths.config_path),
        if paths.config_path.exists() { "found" } else { "missing" }
    );
    println!(
        "repository: {}/{}@{}",
        config.owner, config.repository, config.branch
    );
    println!("publish.enabled: {}", format_flag(config.publish.enabled));
    println!("publish.remote: {}", config.publish.remote);
    println!("publish.branch: {}", config.publish.branch);
    println!("publish.commit_message: {}", config.publish.commit_message);
    println!("git: {}", normalize_path(&find_git_binary()));
    if runtime.diagnostics {
        println!("\n[diagnostics]\n{}", paths.diagnostics());
    }
    Ok(())
}

fn resolve_runtime(runtime: &RuntimeOptions) -> Result<(ResolvedPaths, FileConfig)> {
    let context = ResolutionContext::from_process()?;
    let overrides = runtime.path_overrides();

    let initial = resolve_paths(&context, &overrides, &FileConfig::default())?;
    let project_env = initial.project_root.join(".env");
    if project_env.exists() {
        let _ = dotenvy::from_path_override(&project_env);
    }

    let (config_path, _) = resolve_config_path(&context, &overrides);
    let file = load_config(&config_path)?;
    let paths = resolve_paths(&context, &overrides, &file)?;
    Ok((paths, file))
}

fn print_report(title: &str, config: &RunConfig, report: &RunReport) {
    println!("rawfix {title}");
    println!("project_root: {}", normalize_path(&config.repo_root));
    println!("cache_dir: {}", report.scan.cache_dir);
    println!(
        "repository: {}/{}@{}",
        config.owner, config.repository, config.branch
    );

    if !report.scan.cache_dir_exists {
        println!("cache_dir_exists: no");
    } else if report.scan.files.is_empty() {
        println!("json_files: <none>");
    } else {
        println!("json_files: {}", report.scan.files.len());
        for file in &report.scan.files {
            match &file.outcome {
                FileOutcome::Unchanged => println!("file: {} (unchanged)", file.relative_path),
                FileOutcome::Fixed {
                    fixes,
                    written,
                    diff,
                } => {
                    println!(
                        "file: {} ({} url(s) {})",
                        file.relative_path,
                        fixes.len(),
                        if *written { "fixed" } else { "to fix" }
                    );
                    for fix in fixes {
                        println!("  - {}", fix.original);
                        println!("  + {}", fix.fixed);
                    }
                    if let Some(diff) = diff {
                        print!("{diff}");
                    }
                }
                FileOutcome::Failed { error } => {
                    println!("file: {} (error: {error})", file.relative_path)
                }
            }
        }
    }

    println!("files_fixed: {}", report.files_fixed);
    println!("urls_fixed: {}", report.urls_fixed);
    println!("files_unchanged: {}", report.files_unchanged());
    println!("files_failed: {}", report.files_failed);
    match &report.publish {
        PublishOutcome::Skipped { reason } => println!("publish: skipped ({reason})"),
        PublishOutcome::Clean => println!("publish: no changes to commit"),
        PublishOutcome::Published { status } => {
            println!("publish: committed and pushed");
            for line in status.lines() {
                println!("publish.status: {line}");
            }
        }
        PublishOutcome::Failed { step, error } => {
            println!("publish: failed at {} ({error})", step.as_str())
        }
    }
}

fn normalize_path(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}

fn format_flag(value: bool) -> &'static str {
    if value { "yes" } else { "no" }
}
