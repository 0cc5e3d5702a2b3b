use std::error::Error;
use std::path::PathBuf;

use atty::Stream;
use clap::{Args, Parser, Subcommand};
use lexica_rs::linkify::Segment;
use lexica_rs::{EntryView, Lexicon, QueryState, ResultsView, alphabet, view};
use serde_json::json;
use termimad::{FmtText, MadSkin, terminal_size};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "lexica-rs", about = "Search and browse a structured lexicon", version)]
pub struct Cli {
    /// Lexicon JSON document to load.
    #[arg(
        long,
        global = true,
        env = "LEXICA_DATA",
        default_value = "data/lexicon.json"
    )]
    data: PathBuf,

    /// Emit JSON instead of human-readable tables.
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Args, Debug, Default)]
struct FacetArgs {
    /// Only entries with this part-of-speech code.
    #[arg(long)]
    pos: Option<String>,
    /// Only entries carrying this tag. Repeat to require several.
    #[arg(long = "tag")]
    tags: Vec<String>,
    /// Maximum number of rows to print.
    #[arg(short, long)]
    limit: Option<usize>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Ranked free-text search. Every word must occur in the entry.
    Search {
        /// Query words; empty lists everything alphabetically.
        query: Vec<String>,
        #[command(flatten)]
        facets: FacetArgs,
    },
    /// List entries by first letter.
    Browse {
        /// Alphabet letter; omit to browse everything.
        letter: Option<String>,
        #[command(flatten)]
        facets: FacetArgs,
    },
    /// Show one entry by permalink address or headword.
    Show {
        /// `headword`, `#headword` or `id:<id>`, URL-escaped or not.
        address: String,
    },
    /// Tag frequencies, most common first.
    Tags {
        /// How many tags to list.
        #[arg(long)]
        top: Option<usize>,
    },
    /// Which browse letters have entries.
    Letters,
    /// Part-of-speech codes present in the lexicon.
    Pos,
    /// Serve the lexicon over HTTP.
    #[cfg(feature = "web")]
    Serve {
        /// Socket address to bind.
        #[arg(long, default_value = "127.0.0.1:8080")]
        addr: std::net::SocketAddr,
        /// Public base URL used in canonical links.
        #[arg(long)]
        base_url: Option<String>,
        /// Page styling.
        #[arg(long, value_enum, default_value_t = ThemeArg::Tailwind)]
        theme: ThemeArg,
    },
}

#[cfg(feature = "web")]
#[derive(clap::ValueEnum, Debug, Clone, Copy)]
enum ThemeArg {
    Tailwind,
    Bootstrap,
}

pub fn run() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();
    init_tracing(&cli.command);

    #[cfg(feature = "web")]
    if let Command::Serve {
        addr,
        base_url,
        theme,
    } = &cli.command
    {
        return handle_serve(cli.data.clone(), *addr, base_url.clone(), *theme);
    }

    let lexicon = Lexicon::load(&cli.data)?;
    match cli.command {
        Command::Search { query, facets } => {
            let state = facets.apply(QueryState::search(query.join(" ")));
            handle_results(&lexicon, &state, facets.limit, cli.json)
        }
        Command::Browse { letter, facets } => {
            let letter = match letter {
                Some(raw) => Some(
                    alphabet::parse_letter(&raw)
                        .ok_or_else(|| format!("{raw:?} is not a browse letter"))?,
                ),
                None => None,
            };
            let state = facets.apply(QueryState::browse(letter));
            handle_results(&lexicon, &state, facets.limit, cli.json)
        }
        Command::Show { address } => handle_show(&lexicon, &address, cli.json),
        Command::Tags { top } => handle_tags(&lexicon, top, cli.json),
        Command::Letters => handle_letters(&lexicon, cli.json),
        Command::Pos => handle_pos(&lexicon, cli.json),
        #[cfg(feature = "web")]
        Command::Serve { .. } => Ok(()),
    }
}

impl FacetArgs {
    fn apply(&self, mut state: QueryState) -> QueryState {
        state.set_pos(self.pos.clone());
        for tag in &self.tags {
            state.add_tag(tag);
        }
        state
    }
}

fn init_tracing(command: &Command) {
    let default = match command {
        #[cfg(feature = "web")]
        Command::Serve { .. } => "lexica_rs=info,tower_http=info",
        _ => "warn",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

#[cfg(feature = "web")]
fn handle_serve(
    data: PathBuf,
    addr: std::net::SocketAddr,
    base_url: Option<String>,
    theme: ThemeArg,
) -> Result<(), Box<dyn Error>> {
    use lexica_rs::web::{WebConfig, WebTheme, serve};

    let config = WebConfig {
        addr,
        theme: match theme {
            ThemeArg::Tailwind => WebTheme::Tailwind,
            ThemeArg::Bootstrap => WebTheme::Bootstrap,
        },
        base_url: base_url.unwrap_or_else(|| format!("http://{addr}")),
        data_path: data,
    };
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    runtime.block_on(serve(config))?;
    Ok(())
}

fn handle_results(
    lexicon: &Lexicon,
    state: &QueryState,
    limit: Option<usize>,
    as_json: bool,
) -> Result<(), Box<dyn Error>> {
    let cap = limit.unwrap_or(lexicon.config().result_cap).max(1);
    let results = lexicon.query_capped(state, cap);
    let table = ResultsView::from(&results);

    if as_json {
        let payload = json!({
            "query": state.query,
            "mode": state.mode,
            "pos": state.pos,
            "tags": state.tags,
            "total": table.total,
            "truncated": table.truncated,
            "results": table.rows,
        });
        println!("{}", serde_json::to_string_pretty(&payload)?);
    } else {
        print_results_table(&table);
    }
    Ok(())
}

fn handle_show(lexicon: &Lexicon, address: &str, as_json: bool) -> Result<(), Box<dyn Error>> {
    let position = lexicon
        .resolve_position(address)
        .ok_or_else(|| format!("No entry found for {address:?}"))?;
    let entry_view = lexicon
        .entry_view(position)
        .ok_or_else(|| format!("No entry found for {address:?}"))?;

    if as_json {
        println!("{}", serde_json::to_string_pretty(&entry_view)?);
    } else if stdout_is_tty() {
        println!("{}", render_markdown(&entry_view, markdown_width()));
    } else if let Some(entry) = lexicon.entry(position) {
        println!("{}", view::entry_text(entry));
        print_cross_references(&entry_view);
    }
    Ok(())
}

fn handle_tags(lexicon: &Lexicon, top: Option<usize>, as_json: bool) -> Result<(), Box<dyn Error>> {
    let limit = top.unwrap_or(lexicon.config().top_tags);
    let tags = lexica_rs::index::top_tags(lexicon.tag_frequencies(), limit);

    if as_json {
        println!("{}", serde_json::to_string_pretty(&tags)?);
        return Ok(());
    }
    if tags.is_empty() {
        println!("No tags in this lexicon.");
        return Ok(());
    }
    let width = tags
        .iter()
        .map(|tag| tag.label.chars().count())
        .max()
        .unwrap_or(3)
        .max("TAG".len());
    println!("{:<width$}  {}", "TAG", "COUNT", width = width);
    println!("{:-<width$}  {}", "", "-----", width = width);
    for tag in &tags {
        println!("{:<width$}  {}", tag.label, tag.count, width = width);
    }
    Ok(())
}

fn handle_letters(lexicon: &Lexicon, as_json: bool) -> Result<(), Box<dyn Error>> {
    let overview = lexicon.overview();
    if as_json {
        println!("{}", serde_json::to_string_pretty(&overview.letters)?);
        return Ok(());
    }
    let rendered: Vec<String> = overview
        .letters
        .iter()
        .map(|slot| {
            if slot.enabled {
                slot.letter.to_uppercase().to_string()
            } else {
                "·".to_string()
            }
        })
        .collect();
    println!("{}", rendered.join(" "));
    Ok(())
}

fn handle_pos(lexicon: &Lexicon, as_json: bool) -> Result<(), Box<dyn Error>> {
    let options = lexicon.parts_of_speech();
    if as_json {
        println!("{}", serde_json::to_string_pretty(&options)?);
        return Ok(());
    }
    if options.is_empty() {
        println!("No part-of-speech codes in this lexicon.");
        return Ok(());
    }
    let width = options
        .iter()
        .map(|option| option.code.chars().count())
        .max()
        .unwrap_or(4)
        .max("CODE".len());
    println!("{:<width$}  {}", "CODE", "LABEL", width = width);
    println!("{:-<width$}  {}", "", "-----", width = width);
    for option in &options {
        println!("{:<width$}  {}", option.code, option.label, width = width);
    }
    Ok(())
}

fn print_results_table(results: &ResultsView) {
    if results.rows.is_empty() {
        println!("No matches.");
        return;
    }
    let width = results
        .rows
        .iter()
        .map(|row| row.headword.chars().count())
        .max()
        .unwrap_or(8)
        .max("HEADWORD".len());
    println!("{:<width$}  {:<12}  {}", "HEADWORD", "POS", "GLOSS", width = width);
    println!("{:-<width$}  {:-<12}  {}", "", "", "-----", width = width);
    for row in &results.rows {
        println!(
            "{:<width$}  {:<12}  {}",
            row.headword,
            row.pos_label,
            row.primary_gloss,
            width = width
        );
    }
    let noun = if results.total == 1 { "match" } else { "matches" };
    if results.truncated {
        println!("\n{} {noun} (first {} shown)", results.total, results.rows.len());
    } else {
        println!("\n{} {noun}", results.total);
    }
}

fn print_cross_references(entry: &EntryView) {
    let mut seen: Vec<&str> = Vec::new();
    let texts = entry
        .definitions
        .iter()
        .flat_map(|def| std::iter::once(&def.gloss).chain(def.notes.as_ref()))
        .chain(entry.examples.iter().map(|example| &example.src));
    for text in texts {
        for (_, address) in text.links() {
            if !seen.contains(&address.as_str()) {
                seen.push(address.as_str());
            }
        }
    }
    if !seen.is_empty() {
        println!("\nSee also: {}", seen.join(", "));
    }
}

fn entry_markdown(entry: &EntryView) -> String {
    let mut out = format!("# {}", entry.headword);
    if let Some(pron) = &entry.pron {
        out.push_str(&format!("  *{pron}*"));
    }
    out.push_str(&format!("\n\n**{}**\n", entry.pos_label));
    if !entry.definitions.is_empty() {
        out.push_str("\n## Definitions\n");
        for (idx, def) in entry.definitions.iter().enumerate() {
            out.push_str(&format!("{}. {}", idx + 1, rich_markdown(&def.gloss)));
            if let Some(notes) = &def.notes {
                out.push_str(&format!(" — *{}*", rich_markdown(notes)));
            }
            out.push('\n');
        }
    }
    if !entry.examples.is_empty() {
        out.push_str("\n## Examples\n");
        for example in &entry.examples {
            out.push_str(&format!("* {}\n", rich_markdown(&example.src)));
            if let Some(gloss) = &example.gloss {
                out.push_str(&format!("  {gloss}\n"));
            }
        }
    }
    if !entry.tags.is_empty() {
        out.push_str(&format!("\nTags: {}\n", entry.tags.join(", ")));
    }
    out
}

fn render_markdown(entry: &EntryView, width: usize) -> String {
    let skin = markdown_skin();
    let markdown = entry_markdown(entry);
    FmtText::from(&skin, &markdown, Some(width)).to_string()
}

fn rich_markdown(text: &lexica_rs::RichText) -> String {
    text.segments()
        .iter()
        .map(|segment| match segment {
            Segment::Text { text } => text.clone(),
            Segment::Link { text, .. } => format!("**{text}**"),
        })
        .collect()
}

fn stdout_is_tty() -> bool {
    atty::is(Stream::Stdout)
}

fn markdown_width() -> usize {
    let (width, _) = terminal_size();
    width.max(60) as usize
}

fn markdown_skin() -> MadSkin {
    MadSkin::default()
}
