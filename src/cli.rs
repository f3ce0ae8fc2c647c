use clap::Parser;

#[derive(Parser, Debug)]
#[command(name = "commentcase")]
#[command(about = "Lower-case the text of `--` comments in every .lua file of a directory")]
#[command(version)]
pub struct Cli {
    /// Directory holding the .lua files (not searched recursively)
    #[arg(default_value = ".")]
    pub path: String,

    /// Keep processing after a file fails; exit non-zero at the end
    #[arg(short, long)]
    pub keep_going: bool,

    /// Write each file through a temporary file and rename it into place
    #[arg(long)]
    pub atomic: bool,

    /// Hide notes and the closing summary
    #[arg(short, long)]
    pub quiet: bool,
}

#[test]
fn defaults_to_current_directory() {
    let cli = Cli::try_parse_from(["commentcase"]).unwrap();
    assert_eq!(cli.path, ".");
    assert!(!cli.keep_going && !cli.atomic && !cli.quiet);
}

#[test]
fn parses_path_and_flags() {
    let cli = Cli::try_parse_from(["commentcase", "scripts", "-k", "--atomic", "-q"]).unwrap();
    assert_eq!(cli.path, "scripts");
    assert!(cli.keep_going && cli.atomic && cli.quiet);
}

#[test]
fn verify_cli() {
    use clap::CommandFactory;
    Cli::command().debug_assert();
}
