use anyhow::Result;
use canonref::{xml, BookArg, Canon, CanonSource, FormatOptions, RefParser};
use clap::{Arg, ArgAction, Command};
use std::path::Path;

fn main() -> Result<()> {
    env_logger::init();

    let matches = Command::new(env!("CARGO_PKG_NAME"))
        .version(env!("CARGO_PKG_VERSION"))
        .about(env!("CARGO_PKG_DESCRIPTION"))
        .subcommand_required(true)
        .arg(
            Arg::new("canon")
                .short('c')
                .long("canon")
                .help("Path to a canon XML document (defaults to the embedded English canon)"),
        )
        .subcommand(
            Command::new("parse")
                .about("Parse a reference string ('Gen 3:15-17; Exod 1:1') into completed ranges")
                .arg(Arg::new("reference").help("The reference string").required(true))
                .arg(
                    Arg::new("book")
                        .short('b')
                        .long("book")
                        .help("Book hint for inputs that carry no book name ('3:16')"),
                ),
        )
        .subcommand(
            Command::new("normalize")
                .about("Fold a reference string into its canonical delimiter form")
                .arg(Arg::new("reference").help("The reference string").required(true)),
        )
        .subcommand(
            Command::new("format")
                .about("Parse a reference string and render it back under formatting options")
                .arg(Arg::new("reference").help("The reference string").required(true))
                .arg(
                    Arg::new("title")
                        .short('t')
                        .long("title")
                        .action(ArgAction::SetTrue)
                        .help("Print display titles instead of short book names"),
                )
                .arg(
                    Arg::new("cvsep")
                        .long("cvsep")
                        .help("Chapter-verse separator (default ':')"),
                )
                .arg(
                    Arg::new("html")
                        .long("html")
                        .action(ArgAction::SetTrue)
                        .help("Emit anchor tags"),
                )
                .arg(
                    Arg::new("uri")
                        .long("uri")
                        .help("Link target prefix for --html"),
                )
                .arg(
                    Arg::new("qarg")
                        .long("qarg")
                        .help("Query argument appended to the uri (default '?bref=')"),
                ),
        )
        .subcommand(
            Command::new("keys")
                .about("Reconstruct a reference string from compact integer keys ('003015007')")
                .arg(Arg::new("ids").help("Keys separated by ',' and '-'").required(true)),
        )
        .get_matches();

    let canon = match matches.get_one::<String>("canon") {
        Some(path) => xml::Parser::new(Path::new(path)).load()?,
        None => Canon::from_default_source()?,
    };
    let parser = RefParser::new(canon);

    match matches.subcommand() {
        Some(("parse", submatches)) => {
            let reference = submatches.get_one::<String>("reference").unwrap();
            let book = submatches.get_one::<String>("book").map(String::as_str);
            let list = parser.parse(reference, book);
            for range in &list {
                println!("{} - {}", range.start, range.end);
            }
        }
        Some(("normalize", submatches)) => {
            let reference = submatches.get_one::<String>("reference").unwrap();
            println!("{}", canonref::normalize(reference));
        }
        Some(("format", submatches)) => {
            let reference = submatches.get_one::<String>("reference").unwrap();
            let mut opts = FormatOptions::default();
            if submatches.get_flag("title") {
                opts.bkarg = BookArg::Title;
            }
            if let Some(cvsep) = submatches.get_one::<String>("cvsep") {
                opts.cvsep = cvsep.clone();
            }
            if submatches.get_flag("html") {
                opts.html = true;
            }
            if let Some(uri) = submatches.get_one::<String>("uri") {
                opts.uri = uri.clone();
            }
            if let Some(qarg) = submatches.get_one::<String>("qarg") {
                opts.qarg = qarg.clone();
            }
            let list = parser.parse(reference, None);
            println!("{}", parser.format(&list, &opts));
        }
        Some(("keys", submatches)) => {
            let ids = submatches.get_one::<String>("ids").unwrap();
            println!("{}", parser.refstr_from_ids(ids));
        }
        _ => unreachable!("subcommand is required"),
    }

    Ok(())
}
