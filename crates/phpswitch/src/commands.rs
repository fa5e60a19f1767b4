use anyhow::{Context, Result, anyhow, bail};
use log::debug;
use std::sync::Arc;

use phpswitch_backend::{PackageRegistry, PhpVersion};
use phpswitch_brew::BrewClient;
use phpswitch_core::{
    AvailableVersions, DiskCache, ServiceReconciler, Switcher, ToolSettings, VersionResolver,
    find_project_version, write_project_version,
};
use phpswitch_platform::AppPaths;
use phpswitch_shell::{ShellKind, ShellSync};

use crate::cli::{CacheCommand, Command};

pub async fn run(command: Command) -> Result<()> {
    let paths = AppPaths::new().context("could not locate the user home directory")?;
    let settings = ToolSettings::load(&paths.config_file());
    debug!("Dispatching {command:?} with {settings:?}");

    match command {
        Command::Use { version, install } => {
            use_version(&paths, &settings, version.as_deref(), install).await
        }
        Command::Install { version } => install(&version).await,
        Command::Uninstall { version } => uninstall(&version).await,
        Command::List { no_cache } => list(&paths, no_cache).await,
        Command::Current => current().await,
        Command::Project { version } => project(version.as_deref()),
        Command::Cache { action } => cache(&paths, action).await,
    }
}

async fn brew() -> Result<Arc<BrewClient>> {
    let client = BrewClient::detect()
        .await
        .context("Homebrew is required; install it from https://brew.sh")?;
    Ok(Arc::new(client))
}

async fn use_version(
    paths: &AppPaths,
    settings: &ToolSettings,
    version: Option<&str>,
    install_if_missing: bool,
) -> Result<()> {
    let requested = resolve_requested(version, settings)?;

    let brew = brew().await?;
    let registry: Arc<dyn PackageRegistry> = brew.clone();
    let services = Arc::new(brew.services());
    let shell = ShellKind::detect();
    let sync = ShellSync::for_home(shell, &paths.home_dir)
        .with_backups(settings.backup_enabled, settings.max_backups);

    let switcher = Switcher::new(
        registry,
        ServiceReconciler::new(services, settings.auto_restart_services),
        sync,
    );

    let report = switcher.switch_to(requested, install_if_missing).await;

    for warning in &report.warnings {
        eprintln!("warning: {warning}");
    }

    if report.succeeded {
        println!("Now using PHP {requested} ({shell} config updated)", shell = shell.name());
        Ok(())
    } else {
        for error in &report.errors {
            eprintln!("error: {error}");
        }
        bail!("switch to PHP {requested} failed")
    }
}

fn resolve_requested(version: Option<&str>, settings: &ToolSettings) -> Result<PhpVersion> {
    if let Some(raw) = version {
        return raw
            .parse()
            .with_context(|| format!("'{raw}' is not a valid PHP version"));
    }

    let cwd = std::env::current_dir().context("could not determine the working directory")?;
    if let Some(pinned) = find_project_version(&cwd) {
        println!("Using project pin: PHP {pinned}");
        return Ok(pinned);
    }

    if let Some(default) = settings.default_version {
        println!("Using configured default: PHP {default}");
        return Ok(default);
    }

    bail!(
        "no version given, no .php-version pin found, and no default_version configured in ~/.phpswitch.conf"
    )
}

async fn install(version: &str) -> Result<()> {
    let version: PhpVersion = version
        .parse()
        .with_context(|| format!("'{version}' is not a valid PHP version"))?;
    let brew = brew().await?;

    println!(
        "Installing {} (this can take a while)...",
        version.formula()
    );
    brew.install(&version).await?;
    println!("Installed PHP {version}; activate it with `phpswitch use {version}`");
    Ok(())
}

async fn uninstall(version: &str) -> Result<()> {
    let version: PhpVersion = version
        .parse()
        .with_context(|| format!("'{version}' is not a valid PHP version"))?;
    let brew = brew().await?;

    if brew.linked_formula().await? == Some(version) {
        eprintln!(
            "warning: PHP {version} is currently linked; switch to another version afterwards"
        );
    }

    brew.uninstall(&version).await?;
    println!("Uninstalled {}", version.formula());
    Ok(())
}

async fn list(paths: &AppPaths, no_cache: bool) -> Result<()> {
    let brew = brew().await?;
    let registry: Arc<dyn PackageRegistry> = brew.clone();
    let lister = AvailableVersions::new(registry.clone(), paths.cache_file());

    // Kick off the slow discovery query first; installed versions print
    // while it runs and the two are only joined at the end.
    let discovery = tokio::spawn(async move { lister.list(!no_cache).await });

    let installed = registry.list_installed().await?;
    println!("Installed:");
    if installed.is_empty() {
        println!("  (none; try `phpswitch install 8.4`)");
    }
    for record in &installed {
        let marker = if record.linked { "  (linked)" } else { "" };
        println!("  {}{marker}", record.version);
    }

    let listing = discovery
        .await
        .map_err(|join_error| anyhow!("available-version task failed: {join_error}"))?
        .context(
            "could not list available versions; `phpswitch cache refresh` retries the search",
        )?;

    let provenance = if listing.stale {
        format!(
            "  (stale cache from {}, refresh with `phpswitch cache refresh`)",
            listing.fetched_at.format("%Y-%m-%d %H:%M UTC")
        )
    } else if listing.from_cache {
        "  (cached)".to_string()
    } else {
        String::new()
    };
    println!("\nAvailable:{provenance}");
    for entry in &listing.versions {
        let marker = if entry.installed { "  (installed)" } else { "" };
        println!("  {}{marker}", entry.version);
    }

    Ok(())
}

async fn current() -> Result<()> {
    let brew = brew().await?;
    let registry: Arc<dyn PackageRegistry> = brew;
    let resolver = VersionResolver::new(registry);

    let active = resolver.active_version().await;

    match active.linked {
        Some(version) => println!("Linked:  {version} ({})", version.formula()),
        None => println!("Linked:  none"),
    }
    match (&active.resolved, &active.binary) {
        (Some(version), Some(binary)) => {
            println!("Active:  {version} ({})", binary.display());
        }
        _ => println!("Active:  unknown (no working `php` on PATH)"),
    }

    if active.path_inconsistent {
        eprintln!(
            "warning: the `php` on PATH does not match the linked formula; restart your terminal or run `hash -r`"
        );
    }

    Ok(())
}

fn project(version: Option<&str>) -> Result<()> {
    let cwd = std::env::current_dir().context("could not determine the working directory")?;

    match version {
        Some(raw) => {
            let version: PhpVersion = raw
                .parse()
                .with_context(|| format!("'{raw}' is not a valid PHP version"))?;
            let pin = write_project_version(&cwd, &version)
                .with_context(|| format!("could not write the pin file in {}", cwd.display()))?;
            println!("Pinned PHP {version} in {}", pin.display());
        }
        None => match find_project_version(&cwd) {
            Some(version) => println!("{version}"),
            None => bail!("no .php-version pin found from {} upward", cwd.display()),
        },
    }

    Ok(())
}

async fn cache(paths: &AppPaths, action: CacheCommand) -> Result<()> {
    match action {
        CacheCommand::Clear => {
            let removed = DiskCache::clear(&paths.cache_file())
                .context("could not delete the cache file")?;
            if removed {
                println!("Available-version cache cleared");
            } else {
                println!("Cache was already empty");
            }
        }
        CacheCommand::Refresh => {
            let brew = brew().await?;
            let registry: Arc<dyn PackageRegistry> = brew;
            let lister = AvailableVersions::new(registry, paths.cache_file());

            let listing = lister
                .refresh()
                .await
                .context("registry search failed; the old cache (if any) was kept")?;
            println!("Cached {} PHP versions", listing.versions.len());
        }
    }

    Ok(())
}
