use std::error::Error;
use std::fs::File;
use std::io::BufReader;
use std::io::BufWriter;
use std::process::ExitCode;

use clap::Parser;
use log::info;

use cascade_automaton::Automaton;
use cascade_decomposition::CascadeDecomposition;
use cascade_io::io_dot::read_dot;
use cascade_utilities::Timing;

/// The ratio between the tree size and the number of distinct subformulas
/// above which the formula is printed with definitions.
const SHARING_FACTOR: usize = 4;

#[derive(clap::Parser, Debug)]
#[command(about = "Translates a counter-free automaton into a past-time temporal logic formula")]
struct Cli {
    /// The automaton in the DOT format produced by MONA.
    filename: String,

    /// The atomic propositions, by default the propositions of the guards.
    #[arg(short, long, value_delimiter = ',')]
    propositions: Vec<String>,

    /// Decomposes the automaton of the reversed language.
    #[arg(long)]
    reverse: bool,

    /// Replaces the past operators of the result by future operators.
    #[arg(long)]
    future: bool,

    /// Writes the tree subset automaton to the given file.
    #[arg(long)]
    tsa_dot: Option<String>,

    /// Writes the cascade decomposition to the given file.
    #[arg(long)]
    cascade_dot: Option<String>,

    #[arg(long)]
    time: bool,
}

fn main() -> Result<ExitCode, Box<dyn Error>> {
    env_logger::init();

    let cli = Cli::parse();

    let mut timing = Timing::new();

    let mut read_time = timing.start("read");
    let automaton = read_dot(BufReader::new(File::open(&cli.filename)?), cli.propositions)?;
    read_time.finish();
    info!("Read automaton:\n{}", automaton);

    let mut minimize_time = timing.start("minimize");
    let automaton = prepare(&automaton, cli.reverse);
    minimize_time.finish();
    info!("Decomposing automaton:\n{}", automaton);

    let mut decompose_time = timing.start("decompose");
    let cascade = CascadeDecomposition::new(&automaton)?;
    decompose_time.finish();
    info!(
        "Tree subset automaton with {} nodes and {} layers",
        cascade.tsa().num_of_nodes(),
        cascade.num_of_layers()
    );

    if let Some(path) = &cli.tsa_dot {
        cascade.tsa().write_dot(BufWriter::new(File::create(path)?), true)?;
    }

    if let Some(path) = &cli.cascade_dot {
        cascade.write_dot(BufWriter::new(File::create(path)?))?;
    }

    let mut synthesis_time = timing.start("synthesis");
    let mut formula = cascade.synthesize_formula();
    if cli.future {
        formula = formula.switch_direction();
    }
    synthesis_time.finish();
    info!("Formula has {} distinct subformulas", formula.size());

    // Subformulas shared by many operators are written once as definitions.
    if formula.tree_size() > SHARING_FACTOR.saturating_mul(formula.size()) {
        println!("{}", formula.display_shared());
    } else {
        println!("{}", formula);
    }

    if cli.time {
        timing.print();
    }

    Ok(ExitCode::SUCCESS)
}

/// Returns the minimal total automaton of the language, or of its reversal.
fn prepare(automaton: &Automaton, reverse: bool) -> Automaton {
    let automaton = if reverse {
        automaton.reverse_transitions(true).determinize(true)
    } else {
        automaton.clone()
    };

    automaton.minimize().complete()
}
