use anyhow::{anyhow, bail, Context, Result};
use getopts::Options;
use log::{info, warn};
use mime_parser::{Message, ParserBuilder};
use mime_stream::{
    copy, BufferMode, BufferStream, FsStream, MemStream, MmapStream, Stream,
};
use regex::Regex;
use simplelog::{ColorChoice, Config, LevelFilter, SimpleLogger, TermLogger, TerminalMode};
use std::env;
use std::io;
use std::io::Write;

const DEFAULT_MATCH: &str = "^X-Evolution$";

// Command line option names
const OPT_HELP: &str = "help";
const OPT_MMAP: &str = "mmap";
const OPT_MEM: &str = "mem";
const OPT_BUFFER: &str = "buffer";
const OPT_NO_SCAN_FROM: &str = "no-scan-from";
const OPT_MATCH: &str = "match";
const OPT_MAX_DEPTH: &str = "max-depth";
const OPT_VERBOSE: &str = "verbose";

// Where the bytes of the input file live while parsing
#[derive(Debug, Clone, Copy, PartialEq)]
enum Backing {
    File,
    Mmap,
    Memory,
}

fn setup_logger(verbose: bool) -> Result<()> {
    let log_level = if verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Warn
    };
    // Try to create a terminal logger, if this fails use a simple logger
    TermLogger::init(
        log_level,
        Config::default(),
        TerminalMode::Stderr,
        ColorChoice::Auto,
    )
    .or_else(|_| SimpleLogger::init(log_level, Config::default()))
    .map_err(|err| anyhow!("Cannot initialize logger: {}", err))
}

fn print_usage(program: &str, opts: &Options) {
    let brief = format!("Usage: {} [options] FILE", program);
    print!("{}", opts.usage(&brief));
}

fn open_stream(path: &str, backing: Backing, buffered: bool) -> Result<Box<dyn Stream>> {
    let stream: Box<dyn Stream> = match backing {
        Backing::File => Box::new(FsStream::open(path)?),
        Backing::Mmap => Box::new(MmapStream::open(path)?),
        Backing::Memory => {
            let mut file = FsStream::open(path)?;
            let mut mem = MemStream::new();
            let size = copy(&mut file, &mut mem)?;
            file.close()?;
            mem.reset()?;
            info!("copied {} bytes into memory", size);
            Box::new(mem)
        }
    };
    if buffered {
        Ok(Box::new(BufferStream::new(stream, BufferMode::BlockRead)))
    } else {
        Ok(stream)
    }
}

// Envelope then one indented line per part
fn print_message<W: Write>(out: &mut W, message: &Message) -> io::Result<()> {
    if let Some(envelope) = message.envelope() {
        writeln!(out, "{}", envelope)?;
    }
    let mut result = Ok(());
    message.walk(|part, depth| {
        if result.is_ok() {
            result = writeln!(
                out,
                "{}Content-Type: {}",
                "   ".repeat(depth),
                part.content_type()
            );
        }
    });
    result
}

fn format_header(name: &[u8], value: &[u8], offset: u64) -> String {
    format!(
        "found \"{}:\" header at {} with a value of \"{}\"",
        String::from_utf8_lossy(name),
        offset,
        String::from_utf8_lossy(value)
    )
}

fn print_header(name: &[u8], value: &[u8], offset: u64) {
    eprintln!("{}", format_header(name, value, offset));
}

fn run() -> Result<()> {
    let args: Vec<String> = env::args().collect();
    let mut opts = getopts::Options::new();
    opts.optflag("h", OPT_HELP, "print this help menu");
    opts.optflag("", OPT_MMAP, "memory map the input file");
    opts.optflag("", OPT_MEM, "copy the input file into memory first");
    opts.optflag("b", OPT_BUFFER, "read through a block buffer");
    opts.optflag("", OPT_NO_SCAN_FROM, "treat the input as one message");
    opts.optopt(
        "m",
        OPT_MATCH,
        "report headers whose name matches (default ^X-Evolution$)",
        "REGEX",
    );
    opts.optopt("", OPT_MAX_DEPTH, "maximum nesting of containers", "N");
    opts.optflag("v", OPT_VERBOSE, "log parser diagnostics");
    let matches = opts
        .parse(&args[1..])
        .map_err(|err| anyhow!("Error parsing command line: {}", err))?;
    if matches.opt_present(OPT_HELP) {
        print_usage(&args[0], &opts);
        return Ok(());
    }
    let path = match matches.free.first() {
        Some(path) => path.clone(),
        None => {
            print_usage(&args[0], &opts);
            bail!("No input file given");
        }
    };
    setup_logger(matches.opt_present(OPT_VERBOSE))?;

    let backing = match (matches.opt_present(OPT_MMAP), matches.opt_present(OPT_MEM)) {
        (true, true) => bail!("--{} and --{} cannot be combined", OPT_MMAP, OPT_MEM),
        (true, false) => Backing::Mmap,
        (false, true) => Backing::Memory,
        (false, false) => Backing::File,
    };
    let pattern = matches
        .opt_str(OPT_MATCH)
        .unwrap_or_else(|| DEFAULT_MATCH.to_owned());
    let matcher = Regex::new(&pattern).with_context(|| format!("Invalid pattern {}", pattern))?;
    let mut builder = ParserBuilder::new()
        .scan_from(!matches.opt_present(OPT_NO_SCAN_FROM))
        .header_callback(matcher, print_header);
    if let Some(depth) = matches.opt_str(OPT_MAX_DEPTH) {
        let depth = depth
            .parse::<usize>()
            .with_context(|| format!("Invalid depth {}", depth))?;
        builder = builder.max_depth(depth);
    }

    let stream = open_stream(&path, backing, matches.opt_present(OPT_BUFFER))?;
    let mut parser = builder.build(stream);
    let stdout = io::stdout();
    let mut out = stdout.lock();
    let mut count = 0;
    for message in parser.messages() {
        let message = message.with_context(|| format!("Cannot parse {}", path))?;
        for diagnostic in message.diagnostics() {
            warn!("{}", diagnostic);
        }
        print_message(&mut out, &message)?;
        count += 1;
    }
    info!("{} messages in {}", count, path);
    Ok(())
}

fn main() {
    if let Err(err) = run() {
        eprintln!("{:#}", err);
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const MBOX: &[u8] = b"From a@example.com Thu Jan  1 00:00:00 1970\n\
Content-Type: multipart/mixed; boundary=x\n\
\n\
--x\n\
Content-Type: message/rfc822\n\
\n\
Subject: inner\n\
\n\
text\n\
--x--\n";

    #[test]
    fn prints_indented_tree() {
        let mut parser = ParserBuilder::new()
            .scan_from(true)
            .build(MemStream::from_slice(MBOX));
        let message = parser.next_message().unwrap().unwrap();
        let mut out = Vec::new();
        print_message(&mut out, &message).unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            concat!(
                "From a@example.com Thu Jan  1 00:00:00 1970\n",
                "Content-Type: multipart/mixed\n",
                "   Content-Type: message/rfc822\n",
                "      Content-Type: text/plain\n",
            )
        );
    }

    #[test]
    fn formats_matched_header() {
        assert_eq!(
            format_header(b"X-Evolution", b"00000001-0010", 143),
            "found \"X-Evolution:\" header at 143 with a value of \"00000001-0010\""
        );
    }

    #[test]
    fn every_backing_gives_the_same_output() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(MBOX).unwrap();
        file.flush().unwrap();
        let path = file.path().to_str().unwrap();
        let mut outputs = Vec::new();
        for backing in [Backing::File, Backing::Mmap, Backing::Memory] {
            for buffered in [false, true] {
                let stream = open_stream(path, backing, buffered).unwrap();
                let mut parser = ParserBuilder::new().scan_from(true).build(stream);
                let mut out = Vec::new();
                for message in parser.messages() {
                    print_message(&mut out, &message.unwrap()).unwrap();
                }
                outputs.push(out);
            }
        }
        assert_eq!(outputs.len(), 6);
        assert!(outputs.windows(2).all(|w| w[0] == w[1]));
        assert!(!outputs[0].is_empty());
    }
}
