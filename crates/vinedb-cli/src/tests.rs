use super::*;

#[test]
fn parses_db_ping_command() {
    let cli = Cli::try_parse_from(["vinedb", "db", "ping"]).expect("expected valid cli args");

    assert!(matches!(
        cli.command,
        Some(Commands::Db {
            command: DbCommands::Ping
        })
    ));
}

#[test]
fn parses_db_migrate_command() {
    let cli = Cli::try_parse_from(["vinedb", "db", "migrate"]).expect("expected valid cli args");

    assert!(matches!(
        cli.command,
        Some(Commands::Db {
            command: DbCommands::Migrate
        })
    ));
}

#[test]
fn no_command_is_none() {
    let cli = Cli::try_parse_from(["vinedb"]).expect("expected valid cli args");
    assert!(cli.command.is_none());
}

#[test]
fn scrape_defaults_to_all_kinds_and_writes() {
    let cli = Cli::try_parse_from(["vinedb", "scrape"]).unwrap();
    let Some(Commands::Scrape(args)) = cli.command else {
        panic!("expected scrape command");
    };
    assert!(args.kind.is_none());
    assert!(args.only.is_none());
    assert!(args.limit.is_none());
    assert!(!args.force);
    assert!(!args.dry_run);
}

#[test]
fn scrape_accepts_every_flag() {
    let cli = Cli::try_parse_from([
        "vinedb",
        "scrape",
        "--kind",
        "wine",
        "--sources",
        "config/sources.csv",
        "--ledger",
        "/tmp/progress.json",
        "--only",
        "opus-one-2019",
        "--limit",
        "5",
        "--force",
        "--dry-run",
    ])
    .unwrap();
    let Some(Commands::Scrape(args)) = cli.command else {
        panic!("expected scrape command");
    };
    assert_eq!(args.kind, Some(EntityKind::Wine));
    assert_eq!(args.sources, Some(PathBuf::from("config/sources.csv")));
    assert_eq!(args.ledger, Some(PathBuf::from("/tmp/progress.json")));
    assert_eq!(args.only.as_deref(), Some("opus-one-2019"));
    assert_eq!(args.limit, Some(5));
    assert!(args.force);
    assert!(args.dry_run);
}

#[test]
fn scrape_accepts_plural_kind() {
    let cli = Cli::try_parse_from(["vinedb", "scrape", "--kind", "wineries"]).unwrap();
    assert!(matches!(
        cli.command,
        Some(Commands::Scrape(ScrapeArgs {
            kind: Some(EntityKind::Winery),
            ..
        }))
    ));
}

#[test]
fn scrape_rejects_unknown_kind() {
    assert!(Cli::try_parse_from(["vinedb", "scrape", "--kind", "beer"]).is_err());
}

#[test]
fn parses_ledger_commands() {
    let cli = Cli::try_parse_from(["vinedb", "ledger", "show"]).unwrap();
    assert!(matches!(
        cli.command,
        Some(Commands::Ledger {
            command: LedgerCommands::Show,
            ..
        })
    ));

    let cli = Cli::try_parse_from(["vinedb", "ledger", "reset", "--ledger", "/tmp/p.json"]).unwrap();
    let Some(Commands::Ledger {
        ledger_path,
        command,
    }) = cli.command
    else {
        panic!("expected ledger command");
    };
    assert!(matches!(command, LedgerCommands::Reset));
    assert_eq!(ledger_path, PathBuf::from("/tmp/p.json"));
}

#[test]
fn verify_images_defaults() {
    let cli = Cli::try_parse_from(["vinedb", "verify-images"]).unwrap();
    assert!(matches!(
        cli.command,
        Some(Commands::VerifyImages {
            kind: None,
            concurrency: 8
        })
    ));
}
