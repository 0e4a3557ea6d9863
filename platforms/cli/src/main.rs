use clap::Parser;
use ftm::{Console, FtmError, Machine, ProgramManager, ScriptLoader, Settings};
use std::io::{self, BufRead, Write};
use std::path::Path;
use std::process;

#[derive(Parser)]
#[clap(author, version, about = "Run Functional Turing Machine scripts", long_about = None)]
struct Cli {
    /// The .ftm script to execute; prompts for a file name when omitted
    script: Option<String>,

    /// Run an embedded demo instead of a script file
    #[clap(long, conflicts_with = "script")]
    demo: Option<String>,

    /// List the embedded demos and exit
    #[clap(long)]
    list_demos: bool,

    /// Maximum number of tape cells
    #[clap(long, default_value_t = ftm::DEFAULT_MAX_TAPE_SIZE)]
    max_tape: usize,

    /// Maximum call-stack depth
    #[clap(long, default_value_t = ftm::DEFAULT_MAX_STACK_SIZE)]
    max_stack: usize,

    /// Print the tape before every step
    #[clap(long)]
    print_tape: bool,

    /// Print the tape and pending state before every step
    #[clap(long)]
    print_state: bool,
}

/// Console wired to stdin/stdout.
struct StdConsole;

impl Console for StdConsole {
    fn print(&mut self, text: &str) {
        println!("{text}");
    }

    fn trace(&mut self, text: &str) {
        println!("{text}");
    }

    fn read_line(&mut self, prompt: &str) -> Option<String> {
        prompt_line(prompt)
    }
}

/// Shows `prompt` and reads one line from stdin; `None` on EOF.
fn prompt_line(prompt: &str) -> Option<String> {
    print!("{prompt}");
    io::stdout().flush().ok()?;

    let mut line = String::new();
    match io::stdin().lock().read_line(&mut line) {
        Ok(0) | Err(_) => None,
        Ok(_) => Some(line.trim_end_matches(['\n', '\r']).to_string()),
    }
}

fn main() {
    let cli = Cli::parse();

    if cli.max_tape < 1 {
        eprintln!("Maximum tape size must be at least 1.");
        process::exit(2);
    }
    if cli.max_stack < 1 {
        eprintln!("Maximum stack size must be at least 1.");
        process::exit(2);
    }

    if cli.list_demos {
        for demo in ftm::DEMOS {
            println!("{} - {}", demo.name, demo.description);
        }
        return;
    }

    let settings = Settings {
        max_tape_size: cli.max_tape,
        max_stack_size: cli.max_stack,
        trace_tape: cli.print_tape,
        trace_state: cli.print_state,
    };

    if let Err(e) = run(&cli, settings) {
        eprintln!("{e}");
        process::exit(1);
    }
}

fn run(cli: &Cli, settings: Settings) -> Result<(), FtmError> {
    let program = if let Some(name) = &cli.demo {
        ProgramManager::get(name)?
    } else {
        let script = match &cli.script {
            Some(script) => script.clone(),
            None => prompt_line("Enter input file name: ")
                .ok_or_else(|| FtmError::File("No input file name given".to_string()))?,
        };
        ScriptLoader::load_script(Path::new(&script))?
    };

    let mut machine = Machine::new(&program, settings)?;
    let mut console = StdConsole;
    machine.run(&mut console)
}
