use std::io::Write;
use std::path::PathBuf;

use monohead::normalize::DEFAULT_TOC_ID;
use monohead::page::resolve_source;
use monohead::{Error, Normalizer, Page, Result};
use pico_args::Arguments;
use tracing::{info, Level};
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

const USAGE: &str = "\
usage: monohead [-t|--trace] [--toc-id ID] [-o|--output FILE] [-i|--in-place] INPUT...

INPUT is a local path, a file:// URL or an http(s):// URL.
Without --in-place a single INPUT is written to FILE, or to stdout.";

struct Args {
    pub inputs: Vec<String>,
    pub output: Option<PathBuf>,
    pub in_place: bool,
    pub toc_id: String,
    pub trace: bool,
}

fn main() {
    std::process::exit(run_cli(Arguments::from_env()));
}

/// Runs the command line, returning the exit status
fn run_cli(pargs: Arguments) -> i32 {
    let args = match parse_args(pargs) {
        Ok(Some(args)) => args,
        Ok(None) => {
            println!("{}", USAGE);
            return 0;
        }
        Err(e) => {
            eprintln!("monohead: {}\n\n{}", e, USAGE);
            return 1;
        }
    };
    if args.trace {
        tracing_subscriber::fmt::fmt()
            .with_span_events(FmtSpan::ACTIVE)
            .with_max_level(Level::DEBUG)
            .with_env_filter(EnvFilter::from_default_env())
            .with_writer(std::io::stderr)
            .finish()
            .init();
        info!("Logger initialized");
    }

    match check(&args).and_then(|()| run(&args)) {
        Ok(()) => 0,
        Err(e @ Error::Usage(_)) => {
            eprintln!("monohead: {}\n\n{}", e, USAGE);
            1
        }
        Err(e) => {
            eprintln!("monohead: {}", e);
            1
        }
    }
}

/// Reads the arguments, or `None` when help was asked for
fn parse_args(mut pargs: Arguments) -> Result<Option<Args>> {
    let usage = |e: pico_args::Error| Error::Usage(e.to_string());
    if pargs.contains(["-h", "--help"]) {
        return Ok(None);
    }
    let mut args = Args {
        inputs: vec![],
        output: pargs.opt_value_from_str(["-o", "--output"]).map_err(usage)?,
        in_place: pargs.contains(["-i", "--in-place"]),
        toc_id: pargs
            .opt_value_from_str("--toc-id")
            .map_err(usage)?
            .unwrap_or_else(|| DEFAULT_TOC_ID.to_string()),
        trace: pargs.contains(["-t", "--trace"]),
    };
    for free in pargs.finish() {
        let free = free
            .into_string()
            .map_err(|_| usage(pico_args::Error::NonUtf8Argument))?;
        if free.starts_with('-') {
            return Err(Error::Usage(format!("unknown option {}", free)));
        }
        args.inputs.push(free);
    }
    Ok(Some(args))
}

/// Rejects argument combinations before any page is loaded
fn check(args: &Args) -> Result<()> {
    if args.inputs.is_empty() {
        return Err(Error::Usage("no input given".to_string()));
    }
    if args.in_place && args.output.is_some() {
        return Err(Error::Usage(
            "--output cannot be combined with --in-place".to_string(),
        ));
    }
    if !args.in_place && args.inputs.len() > 1 {
        return Err(Error::Usage("several inputs need --in-place".to_string()));
    }
    if args.in_place {
        for input in &args.inputs {
            if resolve_source(input)?.scheme() != "file" {
                return Err(Error::Usage(format!("cannot rewrite {} in place", input)));
            }
        }
    }
    Ok(())
}

fn run(args: &Args) -> Result<()> {
    let normalizer = Normalizer::new(args.toc_id.as_str());
    for input in &args.inputs {
        let mut page = Page::load(input)?;
        page.run_hooks(&[&normalizer]);
        if args.in_place {
            let path = page.local_path().ok_or_else(|| {
                Error::Usage(format!("cannot rewrite {} in place", page.url()))
            })?;
            page.save(&path)?;
        } else if let Some(output) = &args.output {
            page.save(output)?;
        } else {
            std::io::stdout()
                .write_all(page.render().as_bytes())
                .map_err(|source| Error::Io {
                    path: "stdout".to_string(),
                    source,
                })?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod test {
    use std::ffi::OsString;

    use super::*;

    fn cli(list: &[&str]) -> Arguments {
        Arguments::from_vec(list.iter().map(OsString::from).collect())
    }

    fn check_cli(list: &[&str]) -> Result<()> {
        check(&parse_args(cli(list))?.unwrap())
    }

    #[test]
    fn test_no_input() {
        assert!(matches!(check_cli(&[]), Err(Error::Usage(_))));
        assert!(matches!(check_cli(&["--toc-id", "toc"]), Err(Error::Usage(_))));
        assert_eq!(run_cli(cli(&[])), 1);
    }

    #[test]
    fn test_output_with_in_place() {
        let list = ["-i", "-o", "out.html", "page.html"];
        assert!(matches!(check_cli(&list), Err(Error::Usage(_))));
        assert_eq!(run_cli(cli(&list)), 1);
    }

    #[test]
    fn test_several_inputs_need_in_place() {
        assert!(matches!(check_cli(&["a.html", "b.html"]), Err(Error::Usage(_))));
        assert_eq!(run_cli(cli(&["a.html", "b.html"])), 1);
        assert!(check_cli(&["--in-place", "a.html", "b.html"]).is_ok());
    }

    #[test]
    fn test_url_in_place() {
        let list = ["-i", "page.html", "https://example.org/index.html"];
        let err = check_cli(&list).unwrap_err();
        assert!(err.to_string().contains("https://example.org/index.html"));
        assert_eq!(run_cli(cli(&list)), 1);
        assert!(check_cli(&["-i", "file:///tmp/page.html"]).is_ok());
    }

    #[test]
    fn test_bad_arguments() {
        assert!(matches!(parse_args(cli(&["--toc-id"])), Err(Error::Usage(_))));
        assert!(matches!(parse_args(cli(&["--frobnicate", "a.html"])), Err(Error::Usage(_))));
        assert_eq!(run_cli(cli(&["--toc-id"])), 1);
        assert_eq!(run_cli(cli(&["-x", "a.html"])), 1);
    }

    #[test]
    fn test_help() {
        assert!(parse_args(cli(&["a.html", "--help"])).unwrap().is_none());
        assert_eq!(run_cli(cli(&["-h"])), 0);
    }

    #[test]
    fn test_missing_file_fails() {
        assert_eq!(run_cli(cli(&["/nonexistent/monohead/page.html"])), 1);
    }

    #[test]
    fn test_output_file() {
        let dir = std::env::temp_dir().join(format!("monohead-cli-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let input = dir.join("in.html");
        let output = dir.join("out.html");
        std::fs::write(&input, "<h1>&lt;code&gt;x&lt;/code&gt;</h1>").unwrap();

        let status = run_cli(cli(&[
            "--output",
            output.to_str().unwrap(),
            input.to_str().unwrap(),
        ]));
        assert_eq!(status, 0);
        assert_eq!(
            std::fs::read_to_string(&output).unwrap(),
            "<h1><code>x</code></h1>"
        );
        assert_eq!(
            std::fs::read_to_string(&input).unwrap(),
            "<h1>&lt;code&gt;x&lt;/code&gt;</h1>"
        );
        std::fs::remove_dir_all(&dir).unwrap();
    }
}
