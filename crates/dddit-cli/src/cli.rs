use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "dddit",
    about = "dddit: version control for binary 3D assets",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Directory holding the stores and configuration
    #[arg(long, global = true, default_value = ".dddit")]
    pub home: PathBuf,

    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Command {
    /// Create the store directories and a default configuration
    Init,
    /// Manage users
    User {
        #[command(subcommand)]
        action: UserAction,
    },
    /// Manage repositories and their contributors
    Repo {
        #[command(subcommand)]
        action: RepoAction,
    },
    /// Create or list resources in a repository
    Resource {
        #[command(subcommand)]
        action: ResourceAction,
    },
    /// Create or list branches of a resource
    Branch {
        #[command(subcommand)]
        action: BranchAction,
    },
    /// Commit a new version at the tail of a branch
    Push(PushArgs),
    /// Fetch a version's files into a directory
    Pull(PullArgs),
    /// List the versions of a branch, oldest first
    Log(LogArgs),
    /// Show a version's metadata
    Show(ShowArgs),
    /// Audit branch chains and report unfinished commits
    Fsck(FsckArgs),
    /// Finish or roll back commits interrupted by a crash
    Sweep,
}

#[derive(Subcommand)]
pub enum UserAction {
    /// Register a user
    Add { username: String },
}

#[derive(Subcommand)]
pub enum RepoAction {
    /// Create a repository owned by a user
    Create {
        name: String,
        #[arg(long)]
        owner: String,
    },
    /// List the contributors of a repository
    Contributors { name: String },
    /// Add a contributor to a repository
    Invite { name: String, username: String },
}

#[derive(Subcommand)]
pub enum ResourceAction {
    /// Create a resource, given as `repository/resource`
    Create { resource: String },
    /// List the resources of a repository
    List { repository: String },
}

#[derive(Subcommand)]
pub enum BranchAction {
    /// Create a branch, given as `repository/resource/branch`
    Create { branch: String },
    /// List the branches of a resource, given as `repository/resource`
    List { resource: String },
}

#[derive(Args)]
pub struct PushArgs {
    /// Target version as `repository/resource/branch@version`
    pub version: String,

    /// Mesh file; mutually exclusive with --material
    #[arg(long, conflicts_with = "material", required_unless_present = "material")]
    pub mesh: Option<PathBuf>,

    /// Material texture file; repeat for each file
    #[arg(long)]
    pub material: Vec<PathBuf>,

    #[arg(short, long)]
    pub message: Option<String>,

    #[arg(long = "tag")]
    pub tags: Vec<String>,

    /// Author recorded on the version
    #[arg(long)]
    pub user: Option<String>,

    /// Check naming, membership and placement for this principal first
    #[arg(long = "as")]
    pub principal: Option<String>,
}

#[derive(Args)]
pub struct PullArgs {
    /// Version as `repository/resource/branch@version`
    pub version: String,

    #[arg(short, long, default_value = ".")]
    pub output: PathBuf,
}

#[derive(Args)]
pub struct LogArgs {
    /// Branch as `repository/resource/branch`
    pub branch: String,

    #[arg(long)]
    pub oneline: bool,
}

#[derive(Args)]
pub struct ShowArgs {
    /// Version as `repository/resource/branch@version`
    pub version: String,
}

#[derive(Args)]
pub struct FsckArgs {
    /// Branches to audit as `repository/resource/branch`; all when omitted
    pub branches: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_init_with_home() {
        let cli = Cli::try_parse_from(["dddit", "--home", "/tmp/h", "init"]).unwrap();
        assert!(matches!(cli.command, Command::Init));
        assert_eq!(cli.home, PathBuf::from("/tmp/h"));
    }

    #[test]
    fn home_defaults_to_dot_dddit() {
        let cli = Cli::try_parse_from(["dddit", "sweep"]).unwrap();
        assert_eq!(cli.home, PathBuf::from(".dddit"));
        assert!(!cli.verbose);
    }

    #[test]
    fn parse_repo_create() {
        let cli =
            Cli::try_parse_from(["dddit", "repo", "create", "game", "--owner", "alice"]).unwrap();
        if let Command::Repo { action: RepoAction::Create { name, owner } } = cli.command {
            assert_eq!(name, "game");
            assert_eq!(owner, "alice");
        } else { panic!("wrong command"); }
    }

    #[test]
    fn parse_push_mesh() {
        let cli = Cli::try_parse_from([
            "dddit",
            "push",
            "game/charA/main@v1",
            "--mesh",
            "hero.fbx",
            "-m",
            "block-out",
            "--tag",
            "wip",
        ])
        .unwrap();
        if let Command::Push(args) = cli.command {
            assert_eq!(args.version, "game/charA/main@v1");
            assert_eq!(args.mesh, Some(PathBuf::from("hero.fbx")));
            assert!(args.material.is_empty());
            assert_eq!(args.message, Some("block-out".into()));
            assert_eq!(args.tags, vec!["wip"]);
            assert!(args.principal.is_none());
        } else { panic!("wrong command"); }
    }

    #[test]
    fn parse_push_material_as_principal() {
        let cli = Cli::try_parse_from([
            "dddit",
            "push",
            "game/rock/main@v1",
            "--material",
            "a.png",
            "--material",
            "b.png",
            "--as",
            "bob",
        ])
        .unwrap();
        if let Command::Push(args) = cli.command {
            assert_eq!(args.material.len(), 2);
            assert_eq!(args.principal, Some("bob".into()));
        } else { panic!("wrong command"); }
    }

    #[test]
    fn push_needs_exactly_one_payload_kind() {
        assert!(Cli::try_parse_from(["dddit", "push", "g/r/b@v"]).is_err());
        assert!(Cli::try_parse_from([
            "dddit", "push", "g/r/b@v", "--mesh", "a.fbx", "--material", "b.png",
        ])
        .is_err());
    }

    #[test]
    fn parse_log_oneline() {
        let cli =
            Cli::try_parse_from(["dddit", "-v", "log", "game/charA/main", "--oneline"]).unwrap();
        assert!(cli.verbose);
        if let Command::Log(args) = cli.command {
            assert!(args.oneline);
            assert_eq!(args.branch, "game/charA/main");
        } else { panic!("wrong command"); }
    }

    #[test]
    fn parse_fsck_without_branches() {
        let cli = Cli::try_parse_from(["dddit", "fsck"]).unwrap();
        if let Command::Fsck(args) = cli.command {
            assert!(args.branches.is_empty());
        } else { panic!("wrong command"); }
    }
}
