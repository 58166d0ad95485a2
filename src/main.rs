use std::fs;
use std::path::{Path, PathBuf};
use std::thread::sleep;
use std::time::Duration;

use clap::{Parser, Subcommand};
use colored::Colorize;
use hotwatch::notify::Event;
use hotwatch::{
    blocking::{Flow, Hotwatch},
    EventKind,
};
use miette::{bail, IntoDiagnostic, NamedSource, Report, Result};

use mic1::{
    disassemble, AsmError, AsmOptions, Config, DecodedView, Memory, MemoryError, Program,
    Workbench,
};

/// mic1 assembles MAC-1 programs and shows how they look in MIC-1 main memory.
#[derive(Parser)]
#[command(version)]
struct Args {
    #[command(subcommand)]
    command: Option<Command>,

    /// Produce minimal output, suited for blackbox tests
    #[arg(short, long, global = true)]
    minimal: bool,

    /// Fail when instructions run into the variable region
    #[arg(short, long, global = true)]
    strict: bool,
}

#[derive(Subcommand)]
enum Command {
    /// Assemble a `.asm` file into an annotated binary listing
    Assemble {
        /// `.asm` file to assemble
        name: PathBuf,
        /// Destination of the listing, `<name>.lst` by default
        dest: Option<PathBuf>,
    },
    /// Check a `.asm` file without writing a listing
    Check {
        /// File to check
        name: PathBuf,
    },
    /// Write a `.asm` file or an existing listing to main memory and show its contents
    Load {
        /// `.asm` source or listing file
        name: PathBuf,
        /// First address to show
        #[arg(long, default_value_t = 0)]
        from: u16,
        /// Last address to show
        #[arg(long, default_value_t = 4095)]
        to: u16,
        /// Also show words that are zero
        #[arg(short, long)]
        all: bool,
    },
    /// Decode raw words, given as `0b...`, `0x...` or decimal
    Decode {
        #[arg(required = true, allow_negative_numbers = true)]
        words: Vec<String>,
    },
    /// Place a watch on a `.asm` file to receive constant assembler updates
    Watch {
        /// `.asm` file to watch
        name: PathBuf,
    },
}

fn main() -> miette::Result<()> {
    use MsgColor::*;
    let args = Args::parse();
    let config = Config::from_env().with_flags(args.strict, args.minimal);

    if config.minimal {
        colored::control::set_override(false);
    }
    let options = config.asm_options();

    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new() //
                .context_lines(mic1::DIAGNOSTIC_CONTEXT_LINES)
                .build(),
        )
    }))?;

    let Some(command) = args.command else {
        println!("\n~ mic1 v{VERSION} ~");
        println!("{SHORT_INFO}");
        return Ok(());
    };

    match command {
        Command::Assemble { name, dest } => {
            file_message(Green, "Assembling", &name);
            let src = fs::read_to_string(&name).into_diagnostic()?;
            let program = assemble(&name, &src, options)?;

            let dest = dest.unwrap_or_else(|| name.with_extension("lst"));
            fs::write(&dest, program.listing()).into_diagnostic()?;

            message(Green, "Finished", &format!("{} words", program.len()));
            file_message(Green, "Saved", &dest);
            Ok(())
        }
        Command::Check { name } => {
            file_message(Green, "Checking", &name);
            let src = fs::read_to_string(&name).into_diagnostic()?;
            let program = assemble(&name, &src, options)?;
            message(
                Green,
                "Success",
                &format!(
                    "no errors found! {} words, {} symbols",
                    program.len(),
                    program.symbols().len()
                ),
            );
            Ok(())
        }
        Command::Load {
            name,
            from,
            to,
            all,
        } => {
            let last = usize::from(to).min(mic1::MEMORY_SIZE - 1);
            if usize::from(from) > last {
                bail!("Start address {from} is past end address {last}");
            }
            let memory = load(&name, options)?;
            let rows = memory.views()[usize::from(from)..=last]
                .iter()
                .zip(&memory.words()[usize::from(from)..=last])
                .filter(|&(_, &word)| all || word != 0);
            print_header();
            for (view, &word) in rows {
                print_row(view, word);
            }
            Ok(())
        }
        Command::Decode { words } => {
            print_header();
            for (index, raw) in words.iter().enumerate() {
                let word = match parse_word(raw) {
                    Some(word) => word,
                    None => bail!("Cannot read `{raw}` as a 16-bit word"),
                };
                print_row(&DecodedView::new(index as u16, word), word);
            }
            Ok(())
        }
        Command::Watch { name } => {
            if !name.exists() {
                bail!("File does not exist. Exiting...")
            }
            // Vim breaks if watching a single file
            let folder_path = match name.parent() {
                Some(pth) if pth.is_dir() => pth.to_path_buf(),
                _ => Path::new(".").to_path_buf(),
            };

            // Clear screen and move cursor to top left
            print!("\x1B[2J\x1B[2;1H");
            file_message(Green, "Watching", &name);
            message(Cyan, "Help", "press CTRL+C to exit");

            let mut watcher =
                Hotwatch::new_with_custom_delay(Duration::from_millis(500)).into_diagnostic()?;

            watcher
                .watch(folder_path, move |event: Event| match event.kind {
                    // Watch remove for vim changes
                    EventKind::Modify(_) | EventKind::Remove(_) => {
                        print!("\x1B[2J\x1B[2;1H");
                        file_message(Green, "Watching", &name);
                        message(Green, "Re-checking", "file change detected");
                        message(Cyan, "Help", "press CTRL+C to exit");

                        // Give the editor time to finish writing
                        sleep(Duration::from_millis(50));

                        let src = match fs::read_to_string(&name) {
                            Ok(src) => src,
                            Err(e) => {
                                eprintln!("{e}. Exiting...");
                                std::process::exit(1)
                            }
                        };
                        match assemble(&name, &src, options) {
                            Ok(program) => message(
                                Green,
                                "Success",
                                &format!("no errors found! {} words", program.len()),
                            ),
                            Err(e) => println!("\n{:?}", e),
                        }
                        Flow::Continue
                    }
                    _ => Flow::Continue,
                })
                .into_diagnostic()?;
            watcher.run();
            Ok(())
        }
    }
}

#[allow(unused)]
enum MsgColor {
    Green,
    Cyan,
    Red,
}

fn file_message(color: MsgColor, left: &str, right: &Path) {
    let right = format!("target {}", right.display());
    message(color, left, &right);
}

fn message(color: MsgColor, left: &str, right: &str) {
    let left = match color {
        MsgColor::Green => left.green(),
        MsgColor::Cyan => left.cyan(),
        MsgColor::Red => left.red(),
    };
    println!("{left:>12} {right}");
}

/// Assemble source text, attaching it to any diagnostic.
fn assemble(name: &Path, src: &str, options: AsmOptions) -> Result<Program> {
    mic1::assemble_with(src, options).map_err(|err| diagnostic(name, src, err))
}

fn diagnostic(name: &Path, src: &str, err: AsmError) -> Report {
    Report::new(err).with_source_code(NamedSource::new(
        name.display().to_string(),
        src.to_string(),
    ))
}

/// Fill a fresh main memory from a `.asm` source or a listing file.
fn load(name: &Path, options: AsmOptions) -> Result<Memory> {
    let src = fs::read_to_string(name).into_diagnostic()?;
    let memory = match name.extension().and_then(|ext| ext.to_str()) {
        Some("asm") => {
            file_message(MsgColor::Green, "Assembling", name);
            let mut bench = Workbench::new(src.as_str()).with_options(options);
            bench.link_memory(Memory::new());
            bench
                .assemble()
                .map_err(|err| diagnostic(name, &src, err))?;
            let written = bench.write_to_memory()?;
            message(MsgColor::Green, "Loaded", &format!("{written} words"));
            bench.unlink_memory().ok_or(MemoryError::NotLinked)?
        }
        _ => {
            file_message(MsgColor::Green, "Reading", name);
            let mut memory = Memory::new();
            let written = memory.load_program(&src)?;
            message(MsgColor::Green, "Loaded", &format!("{written} words"));
            memory
        }
    };
    Ok(memory)
}

fn parse_word(raw: &str) -> Option<i16> {
    let (digits, radix) = match raw.get(..2) {
        Some("0b") => (&raw[2..], 2),
        Some("0x") => (&raw[2..], 16),
        _ => {
            return raw
                .parse::<i16>()
                .ok()
                .or_else(|| raw.parse::<u16>().ok().map(|w| w as i16))
        }
    };
    u16::from_str_radix(digits, radix).ok().map(|w| w as i16)
}

fn print_header() {
    println!(
        "{}",
        format!(
            "{:<7} {:<16} {:>7} {:>4}  {}",
            "address", "binary", "decimal", "hex", "instruction"
        )
        .bold()
    );
}

fn print_row(view: &DecodedView, word: i16) {
    println!(
        "{:<7} {} {:>7} {:>4}  {}",
        view.address().dimmed(),
        view.binary(),
        view.decimal().yellow(),
        view.hex().cyan(),
        disassemble(word).green()
    );
}

const SHORT_INFO: &str = r"
Welcome to mic1, a two-pass assembler and main memory viewer for the MAC-1
instruction set of the MIC-1 machine.
Please use `-h` or `--help` to access the usage instructions and documentation.
";

const VERSION: &str = env!("CARGO_PKG_VERSION");
