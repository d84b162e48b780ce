mod dump;
mod error;

use clap::{crate_version, value_parser, Arg, ArgAction, Command};
use dump::Dump;
use error::FmtError;
use std::fs;
use std::io::{self, IsTerminal, Read, Write};
use termcolor::{ColorChoice, StandardStream, WriteColor};
use trex::printer::WriteSink;
use trex::{Platform, Settings, Style};

fn main() -> Result<(), FmtError> {
    env_logger::init();

    let matches = Command::new("Exception tree formatter")
        .version(crate_version!())
        .about("Re-render textual stack trace dumps")
        .arg(
            Arg::new("style")
                .long("style")
                .value_name("STYLE")
                .value_parser(["default", "jni"])
                .default_value("default")
                .help("Frame syntax: descriptors (`default`) or source signatures (`jni`)"),
        )
        .arg(
            Arg::new("no-fold")
                .long("no-fold")
                .action(ArgAction::SetTrue)
                .help("Print frames shared with the enclosing trace instead of `... N more`"),
        )
        .arg(
            Arg::new("no-duplicates")
                .long("no-duplicates")
                .action(ArgAction::SetTrue)
                .help("Do not compress repeated blocks of frames"),
        )
        .arg(
            Arg::new("max-duplicate-size")
                .long("max-duplicate-size")
                .value_name("FRAMES")
                .value_parser(value_parser!(usize))
                .default_value("8")
                .help("Largest block of frames checked for repetition"),
        )
        .arg(
            Arg::new("exact-duplicates")
                .long("exact-duplicates")
                .action(ArgAction::SetTrue)
                .help("Compare frames structurally when looking for repetition"),
        )
        .arg(
            Arg::new("ids")
                .long("ids")
                .action(ArgAction::SetTrue)
                .help("Tag every exception with a `<n>` display id"),
        )
        .arg(
            Arg::new("tab")
                .long("tab")
                .value_name("TAB")
                .help("Indentation to use instead of the style's (`\\t` for a tab)"),
        )
        .arg(
            Arg::new("color")
                .long("color")
                .value_name("WHEN")
                .value_parser(["auto", "always", "never"])
                .default_value("auto")
                .help("Whether to color the output"),
        )
        .arg(
            Arg::new("INPUT")
                .help("Dump to read (standard input if missing)")
                .index(1),
        )
        .get_matches();

    let color = color_choice(
        matches.get_one::<String>("color").map(String::as_str),
        io::stdout().is_terminal(),
    );
    let stdout = StandardStream::stdout(color);

    let style: Style = matches
        .get_one::<String>("style")
        .map_or(Ok(Style::Default), |style| style.parse())
        .map_err(|err| FmtError::Render(trex::Error::InvalidConfiguration(err)))?;
    let mut settings = Settings::builder()
        .style(style)
        .tab(
            matches
                .get_one::<String>("tab")
                .map(|tab| tab.replace("\\t", "\t")),
        )
        .fold_enabled(!matches.get_flag("no-fold"))
        .check_duplicate_trace_enabled(!matches.get_flag("no-duplicates"))
        .only_compare_hash_code_enabled(!matches.get_flag("exact-duplicates"))
        .throwable_id_visible(matches.get_flag("ids"))
        .color_scheme_enabled(stdout.supports_color());
    if let Some(max_size) = matches.get_one::<usize>("max-duplicate-size") {
        settings = settings.duplicate_trace_max_size(*max_size);
    }
    let settings = settings.build()?;

    let text = match matches.get_one::<String>("INPUT") {
        Some(path) => {
            log::info!("Reading '{}'", path);
            fs::read_to_string(path)?
        }
        None => {
            log::info!("Reading standard input");
            let mut text = String::new();
            io::stdin().read_to_string(&mut text)?;
            text
        }
    };

    let (graph, roots) = Dump::parse(&text)?.into_graph()?;
    if roots.is_empty() {
        log::warn!("No exception found in the input");
    }

    let platform = Platform::detached();
    let mut sink = WriteSink::new(stdout.lock());
    for root in roots {
        platform.render_to(&graph, root, Some(&settings), &mut sink)?;
    }
    sink.into_inner().flush()?;

    Ok(())
}

/// `auto` only colors a terminal
fn color_choice(when: Option<&str>, terminal: bool) -> ColorChoice {
    match when {
        Some("always") => ColorChoice::Always,
        Some("never") => ColorChoice::Never,
        _ if terminal => ColorChoice::Auto,
        _ => ColorChoice::Never,
    }
}
