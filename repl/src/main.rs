use std::{
    error::Error,
    io::{self, BufRead, Write},
};

use clap::Parser;
use genlist::{default_heap_stats, GenList, ReaderConfig};

/// Reads generalized lists such as `(a, (b, c), d)` and prints each with its depth.
#[derive(Parser, Debug)]
#[clap(about = "Parse and inspect reference-counted generalized lists")]
struct CmdOptions {
    #[clap(help = "Lists to evaluate instead of reading standard input")]
    exprs: Vec<String>,
    #[clap(long, help = "Print the shared-sublist demonstration and exit")]
    demo: bool,
    #[clap(
        long,
        help = "Deepest list nesting the reader accepts",
        default_value_t = ReaderConfig::DEFAULT_MAX_NESTING
    )]
    max_nesting: usize,
    #[clap(long, help = "Print heap statistics after each list")]
    stats: bool,
}

fn describe(list: &GenList) -> String {
    format!("{}, Depth = {}", list, list.depth())
}

/// Builds the lists A = (), B = (x, y, z), C = (B, y, z) sharing B, and D = (x, (y, z)).
fn demo(out: &mut impl Write) -> Result<(), Box<dyn Error>> {
    let a = GenList::new()?;
    writeln!(out, "A = {}", describe(&a))?;

    let b = GenList::parse("(x, y, z)")?;
    writeln!(out, "B = {}", describe(&b))?;

    // Pushes prepend, so push in reverse.
    let mut c = GenList::new()?;
    c.push_atom('z')?;
    c.push_atom('y')?;
    c.push_list(&b)?;
    writeln!(out, "C = {}", describe(&c))?;

    let d = GenList::parse("(x, (y, z))")?;
    writeln!(out, "D = {}", describe(&d))?;

    if let Some(first) = b.first() {
        writeln!(out, "B.first = {}", b.element(first)?)?;

        if let Some(second) = b.next(first)? {
            writeln!(out, "B.next(first) = {}", b.element(second)?)?;
        }
    }

    Ok(())
}

fn evaluate(
    line: &str,
    options: &CmdOptions,
    config: &ReaderConfig,
    out: &mut impl Write,
) -> io::Result<()> {
    match GenList::parse_with(line, config) {
        Ok(list) => writeln!(out, "{}", describe(&list))?,
        Err(error) => {
            log::debug!("rejected input {:?}", line);
            writeln!(out, "error: {}", error)?
        }
    }

    if options.stats {
        let stats = default_heap_stats();
        writeln!(
            out,
            "heap: {} live, {} free, {} slots",
            stats.live, stats.free, stats.capacity
        )?;
    }

    Ok(())
}

fn run(options: &CmdOptions) -> Result<(), Box<dyn Error>> {
    let stdout = io::stdout();
    let mut out = stdout.lock();

    if options.demo {
        return demo(&mut out);
    }

    let config = ReaderConfig::default().with_max_nesting(options.max_nesting);

    if !options.exprs.is_empty() {
        for expr in &options.exprs {
            evaluate(expr, options, &config, &mut out)?;
        }
        return Ok(());
    }

    for line in io::stdin().lock().lines() {
        let line = line?;

        if line.trim().is_empty() {
            continue;
        }

        evaluate(&line, options, &config, &mut out)?;
        out.flush()?;
    }

    Ok(())
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let options = CmdOptions::parse();

    if let Err(error) = run(&options) {
        log::error!("{}", error);
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn options(args: &[&str]) -> CmdOptions {
        CmdOptions::parse_from(std::iter::once("genlist").chain(args.iter().copied()))
    }

    #[test]
    fn demo_output() {
        let mut out = Vec::new();
        demo(&mut out).unwrap();

        assert_eq!(
            String::from_utf8(out).unwrap(),
            "A = (), Depth = 1\n\
             B = (x, y, z), Depth = 1\n\
             C = ((x, y, z), y, z), Depth = 2\n\
             D = (x, (y, z)), Depth = 2\n\
             B.first = x\n\
             B.next(first) = y\n"
        );
    }

    #[test]
    fn evaluates_lines_and_reports_errors() {
        let options = options(&[]);
        let config = ReaderConfig::default();
        let mut out = Vec::new();

        evaluate("(a,(b,c),d)", &options, &config, &mut out).unwrap();
        evaluate("(a b)", &options, &config, &mut out).unwrap();

        assert_eq!(
            String::from_utf8(out).unwrap(),
            "(a, (b, c), d), Depth = 2\n\
             error: parse error at position 3: expected ',' or ')' between elements, found 'b'\n"
        );
    }

    #[test]
    fn max_nesting_flag() {
        let options = options(&["--max-nesting", "1", "(a)"]);
        assert_eq!(options.max_nesting, 1);
        assert_eq!(options.exprs, ["(a)"]);

        let config = ReaderConfig::default().with_max_nesting(options.max_nesting);
        let mut out = Vec::new();

        evaluate("((a))", &options, &config, &mut out).unwrap();

        assert_eq!(
            String::from_utf8(out).unwrap(),
            "error: parse error at position 1: nesting exceeds the limit of 1\n"
        );
    }
}
