use std::fs::{self, File};
use std::io::{self, BufReader};
use std::path::Path;

use anyhow::{bail, Context};
use colored::Colorize;

use dddit_engine::{Payload, PayloadFile};
use dddit_graph::{keys, ChainAudit, GraphStore, Label};
use dddit_types::{BranchKey, NewVersion, ResourceKey, VersionKey};

use crate::cli::*;
use crate::home::{Home, CONFIG_FILE};

pub fn run_command(cli: Cli) -> anyhow::Result<()> {
    let home = Home::new(cli.home);
    if !matches!(cli.command, Command::Init) && !home.is_initialized() {
        bail!(
            "{} is not a dddit home (run `dddit init` first)",
            home.root().display()
        );
    }
    match cli.command {
        Command::Init => cmd_init(&home),
        Command::User { action } => cmd_user(&home, action),
        Command::Repo { action } => cmd_repo(&home, action),
        Command::Resource { action } => cmd_resource(&home, action),
        Command::Branch { action } => cmd_branch(&home, action),
        Command::Push(args) => cmd_push(&home, args),
        Command::Pull(args) => cmd_pull(&home, args),
        Command::Log(args) => cmd_log(&home, args),
        Command::Show(args) => cmd_show(&home, args),
        Command::Fsck(args) => cmd_fsck(&home, args),
        Command::Sweep => cmd_sweep(&home),
    }
}

fn cmd_init(home: &Home) -> anyhow::Result<()> {
    fs::create_dir_all(home.root())
        .with_context(|| format!("creating {}", home.root().display()))?;
    let config_path = home.config_path();
    if config_path.is_file() {
        println!("Already initialized in {}", home.root().display().to_string().bold());
        return Ok(());
    }
    let config = dddit_engine::EngineConfig::default();
    fs::write(&config_path, config.to_toml_string()?)
        .with_context(|| format!("writing {CONFIG_FILE}"))?;
    // Opening the engine lays out the store directories and the journal.
    home.engine()?;
    println!(
        "{} Initialized dddit home in {}",
        "✓".green().bold(),
        home.root().display().to_string().bold()
    );
    println!("  Blobs: {}", config.blob.endpoint.cyan());
    println!("  Metadata: {}", config.metadata.locator_prefix.cyan());
    Ok(())
}

fn cmd_user(home: &Home, action: UserAction) -> anyhow::Result<()> {
    match action {
        UserAction::Add { username } => {
            home.catalog()?.create_user(&username)?;
            println!("{} Added user {}", "✓".green(), username.bold());
        }
    }
    Ok(())
}

fn cmd_repo(home: &Home, action: RepoAction) -> anyhow::Result<()> {
    let catalog = home.catalog()?;
    match action {
        RepoAction::Create { name, owner } => {
            catalog.create_repository(&owner, &name)?;
            println!(
                "{} Created repository {} (owner {})",
                "✓".green(),
                name.bold(),
                owner.yellow()
            );
        }
        RepoAction::Contributors { name } => {
            let contributors = catalog.contributors(&name)?;
            if contributors.is_empty() {
                println!("No contributors.");
            }
            for user in contributors {
                let marker = if catalog.is_owner(&user, &name)? {
                    "owner".yellow()
                } else {
                    "contributor".normal()
                };
                println!("  {} ({})", user.bold(), marker);
            }
        }
        RepoAction::Invite { name, username } => {
            if catalog.add_contributor(&name, &username)? {
                println!(
                    "{} {} now contributes to {}",
                    "✓".green(),
                    username.bold(),
                    name.bold()
                );
            } else {
                println!("{} already contributes to {}", username.bold(), name.bold());
            }
        }
    }
    Ok(())
}

fn cmd_resource(home: &Home, action: ResourceAction) -> anyhow::Result<()> {
    let catalog = home.catalog()?;
    match action {
        ResourceAction::Create { resource } => {
            let key = parse_resource(&resource)?;
            catalog.create_resource(&key)?;
            println!("{} Created resource {}", "✓".green(), key.to_string().bold());
        }
        ResourceAction::List { repository } => {
            let resources = catalog.resources(&repository)?;
            if resources.is_empty() {
                println!("No resources.");
            }
            for name in resources {
                println!("  {name}");
            }
        }
    }
    Ok(())
}

fn cmd_branch(home: &Home, action: BranchAction) -> anyhow::Result<()> {
    let catalog = home.catalog()?;
    match action {
        BranchAction::Create { branch } => {
            let key: BranchKey = branch.parse()?;
            catalog.create_branch(&key)?;
            println!("{} Created branch {}", "✓".green(), key.to_string().yellow());
        }
        BranchAction::List { resource } => {
            let key = parse_resource(&resource)?;
            let branches = catalog.branches(&key)?;
            if branches.is_empty() {
                println!("No branches.");
            }
            for name in branches {
                println!("  {}", name.yellow());
            }
        }
    }
    Ok(())
}

fn cmd_push(home: &Home, args: PushArgs) -> anyhow::Result<()> {
    let key: VersionKey = args.version.parse()?;
    let payload = match &args.mesh {
        Some(path) => Payload::Mesh(open_payload_file(path)?),
        None => Payload::Material(
            args.material
                .iter()
                .map(|p| open_payload_file(p))
                .collect::<anyhow::Result<Vec<_>>>()?,
        ),
    };

    let mut version = NewVersion::new(key).with_tags(args.tags);
    if let Some(user) = args.user {
        version = version.by(user);
    }
    if let Some(message) = args.message {
        version = version.with_comment(message);
    }

    let engine = home.engine()?;
    let receipt = match &args.principal {
        Some(principal) => engine.commit_as(principal, version, payload)?,
        None => engine.commit(version, payload)?,
    };

    println!("{} Pushed {}", "✓".green().bold(), receipt.version.to_string().yellow());
    println!("  Commit: {}", receipt.commit.to_string().dimmed());
    println!("  Metadata: {}", receipt.metadata_locator.cyan());
    println!("  Blob: {}", receipt.blob_locator.cyan());
    if receipt.append_attempts > 1 {
        println!("  Tail moved; linked after {} attempts", receipt.append_attempts);
    }
    for timing in &receipt.timings {
        tracing::debug!(stage = %timing.stage, elapsed = ?timing.elapsed, "stage finished");
    }
    Ok(())
}

fn cmd_pull(home: &Home, args: PullArgs) -> anyhow::Result<()> {
    let key: VersionKey = args.version.parse()?;
    let resolved = home.engine()?.resolve(&key)?;
    fs::create_dir_all(&args.output)
        .with_context(|| format!("creating {}", args.output.display()))?;

    println!(
        "Pulling {} ({})",
        key.to_string().yellow(),
        resolved.record.resource_type
    );
    for mut file in resolved.files {
        let target = args.output.join(&file.filename);
        let mut out = File::create(&target)
            .with_context(|| format!("creating {}", target.display()))?;
        let written = io::copy(&mut file.reader, &mut out)?;
        println!("  {} {} ({} bytes)", "wrote".green(), target.display(), written);
    }
    Ok(())
}

fn cmd_log(home: &Home, args: LogArgs) -> anyhow::Result<()> {
    let branch: BranchKey = args.branch.parse()?;
    let engine = home.engine()?;
    let chain = engine.list_chain(&branch)?;
    if chain.is_empty() {
        println!("No versions on {}.", branch.to_string().yellow());
        return Ok(());
    }
    for name in chain {
        if args.oneline {
            println!("{}", name.yellow());
            continue;
        }
        let details = engine.find_metadata(&branch.version(name.as_str()))?;
        let record = details.record;
        println!("{}  {}", record.name.yellow().bold(), record.resource_type.to_string().dimmed());
        println!("  Author: {}", record.username);
        println!("  Date:   {}", record.pushed_at.to_rfc3339());
        if !record.comment.is_empty() {
            println!("  {}", record.comment);
        }
    }
    Ok(())
}

fn cmd_show(home: &Home, args: ShowArgs) -> anyhow::Result<()> {
    let key: VersionKey = args.version.parse()?;
    let details = home.engine()?.find_metadata(&key)?;
    let record = details.record;
    println!("Version {}", key.to_string().yellow().bold());
    println!("  Type:     {}", record.resource_type);
    println!("  Author:   {}", record.username);
    println!("  Pushed:   {}", record.pushed_at.to_rfc3339());
    println!("  Comment:  {}", record.comment);
    println!("  Tags:     {}", record.tags.join(", "));
    println!("  Metadata: {}", record.metadata_locator.cyan());
    println!("  Blob:     {}", details.document.blob_locator.cyan());
    Ok(())
}

fn cmd_fsck(home: &Home, args: FsckArgs) -> anyhow::Result<()> {
    let engine = home.engine()?;
    let branches = if args.branches.is_empty() {
        all_branches(engine.graph())?
    } else {
        args.branches
            .iter()
            .map(|b| b.parse::<BranchKey>())
            .collect::<Result<Vec<_>, _>>()?
    };

    let mut issues = 0;
    for branch in &branches {
        let report = ChainAudit::inspect(engine.graph(), branch)?;
        if report.is_valid() {
            println!("  {} {} ({} versions)", "✓".green(), branch, report.version_count);
            continue;
        }
        for violation in &report.violations {
            issues += 1;
            println!(
                "  {} {} {:?} at {}: {}",
                "✗".red(),
                branch,
                violation.kind,
                violation.vertex,
                violation.description
            );
        }
    }

    if let Some(journal) = engine.journal() {
        for intent in journal.pending()? {
            issues += 1;
            let state = if intent.dirty_compensation {
                "rollback incomplete"
            } else {
                "interrupted"
            };
            println!(
                "  {} commit {} for {} {}",
                "!".yellow(),
                intent.commit.to_string().dimmed(),
                intent.version,
                state
            );
        }
    }

    if issues == 0 {
        println!("{} No issues.", "✓".green().bold());
        Ok(())
    } else {
        bail!("{issues} issue(s) found; run `dddit sweep` to resolve unfinished commits")
    }
}

fn cmd_sweep(home: &Home) -> anyhow::Result<()> {
    let report = home.engine()?.sweep_orphans()?;
    println!("{} Sweep examined {} unfinished commit(s)", "✓".green(), report.examined);
    println!("  Completed:   {}", report.completed);
    println!("  Rolled back: {}", report.compensated);
    if report.dirty > 0 {
        println!("  {} {} could not be fully rolled back", "!".yellow(), report.dirty);
    }
    Ok(())
}

fn parse_resource(s: &str) -> anyhow::Result<ResourceKey> {
    let Some((repository, resource)) = s.split_once('/') else {
        bail!("expected repository/resource, got {s:?}");
    };
    let key = ResourceKey::new(repository, resource);
    key.validate()?;
    Ok(key)
}

fn all_branches<G: GraphStore>(graph: &G) -> anyhow::Result<Vec<BranchKey>> {
    let mut branches = Vec::new();
    for id in graph.vertices(Label::Branch, &[])? {
        let vertex = graph.vertex(id)?;
        let (Some(repository), Some(resource), Some(branch)) = (
            vertex.get(keys::REPOSITORY_NAME),
            vertex.get(keys::RESOURCE_NAME),
            vertex.get(keys::BRANCH_NAME),
        ) else {
            tracing::warn!(vertex = %id, "branch vertex without coordinates");
            continue;
        };
        branches.push(BranchKey::new(repository, resource, branch));
    }
    branches.sort();
    Ok(branches)
}

fn open_payload_file(path: &Path) -> anyhow::Result<PayloadFile> {
    let filename = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .with_context(|| format!("{} has no file name", path.display()))?;
    let file = File::open(path).with_context(|| format!("opening {}", path.display()))?;
    let size = file.metadata()?.len();
    Ok(PayloadFile::new(filename, content_type_for(path), size, BufReader::new(file)))
}

fn content_type_for(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .map(|e| e.to_string_lossy().to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "fbx" => "model/fbx",
        "obj" => "model/obj",
        "stl" => "model/stl",
        "gltf" => "model/gltf+json",
        "glb" => "model/gltf-binary",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "tga" => "image/x-tga",
        "exr" => "image/x-exr",
        _ => "application/octet-stream",
    }
}
