use anyhow::{anyhow, Context, Result};
use clap::{crate_version, App, AppSettings, Arg, ArgMatches, SubCommand};
use scrivener::config::Config;
use scrivener::index::YearArchive;
use scrivener::{Collection, Indexer, Snapshot};
use std::path::Path;
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let matches = app().get_matches();
    let (name, sub) = matches.subcommand();
    let sub = sub.ok_or_else(|| anyhow!("missing subcommand"))?;
    let global = |key: &str| sub.value_of(key).or_else(|| matches.value_of(key));

    let mut config = match global("content") {
        Some(dir) => Config::for_content_directory(dir),
        None => Config::from_directory(Path::new(global("project").unwrap_or(".")))?,
    };
    if let Some(threads) = global("threads") {
        config.threads = Some(threads.parse::<usize>().context("parsing --threads")?);
    }

    let snapshot = Indexer::from_config(&config).build()?;
    match name {
        "posts" => list_posts(&snapshot, sub),
        "tags" => {
            for tag in snapshot.tags.iter() {
                println!("{}", tag);
            }
            Ok(())
        }
        "archive" => {
            for (year, entry) in snapshot.archive.years() {
                print_year(*year, entry);
            }
            Ok(())
        }
        "show" => show(&snapshot, sub.value_of("slug").unwrap_or_default()),
        other => Err(anyhow!("unknown subcommand `{}`", other)),
    }
}

fn app() -> App<'static, 'static> {
    App::new("scrivener")
        .version(crate_version!())
        .about("Indexes a directory of Markdown posts by date, tag, and archive period")
        .setting(AppSettings::SubcommandRequiredElseHelp)
        .arg(
            Arg::with_name("project")
                .long("project")
                .short("p")
                .takes_value(true)
                .global(true)
                .help("Directory in which to start looking for scrivener.yaml"),
        )
        .arg(
            Arg::with_name("content")
                .long("content")
                .short("c")
                .takes_value(true)
                .global(true)
                .help("Index this directory with default settings, ignoring scrivener.yaml"),
        )
        .arg(
            Arg::with_name("threads")
                .long("threads")
                .short("t")
                .takes_value(true)
                .global(true)
                .help("Number of parser threads"),
        )
        .subcommand(
            SubCommand::with_name("posts")
                .about("Lists posts, most recent first")
                .arg(Arg::with_name("tag").long("tag").takes_value(true))
                .arg(Arg::with_name("year").long("year").takes_value(true))
                .arg(
                    Arg::with_name("month")
                        .long("month")
                        .takes_value(true)
                        .requires("year"),
                ),
        )
        .subcommand(SubCommand::with_name("tags").about("Lists every tag in use"))
        .subcommand(
            SubCommand::with_name("archive").about("Shows post counts per year and month"),
        )
        .subcommand(
            SubCommand::with_name("show")
                .about("Shows a single post")
                .arg(Arg::with_name("slug").required(true).index(1)),
        )
}

fn list_posts(snapshot: &Snapshot, matches: &ArgMatches) -> Result<()> {
    let mut posts: Collection = snapshot.posts.list_all();
    if let Some(tag) = matches.value_of("tag") {
        posts = posts.by_tag(tag);
    }
    if let Some(year) = matches.value_of("year") {
        let year = year.parse::<i32>().context("parsing --year")?;
        posts = match matches.value_of("month") {
            Some(month) => posts.by_year_month(year, month.parse::<u32>().context("parsing --month")?),
            None => posts.by_year(year),
        };
    }

    for post in &posts {
        let date = post
            .date
            .map(|d| d.format("%Y-%m-%d").to_string())
            .unwrap_or_else(|| String::from("----------"));
        println!("{}  {}  {}  [{}]", date, post.slug, post.title, post.tags.join(", "));
    }
    Ok(())
}

fn print_year(year: i32, entry: &YearArchive) {
    println!("{} ({})", year, entry.total);
    for (month, count) in &entry.months {
        println!("  {}-{:02} ({})", year, month, count);
    }
}

fn show(snapshot: &Snapshot, slug: &str) -> Result<()> {
    let post = snapshot.get(slug)?;
    println!("slug:  {}", post.slug);
    println!("title: {}", post.title);
    if let Some(date) = post.date {
        println!("date:  {}", date.format("%Y-%m-%d"));
    }
    if !post.tags.is_empty() {
        println!("tags:  {}", post.tags.join(", "));
    }
    println!("file:  {}", post.source_path.display());
    println!();
    print!("{}", post.rendered_html);
    Ok(())
}
