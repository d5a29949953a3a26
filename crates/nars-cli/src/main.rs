use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use nars_core::{
    Budget, EventKind, Memory, MemoryStats, Parameters, Passive, Sentence, Task, Term, TruthValue,
};
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "nars", about = "Attention substrate driver for a non-axiomatic reasoner")]
struct Cli {
    /// Parameter file (TOML); missing fields take their defaults
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging to stderr
    #[arg(long, global = true)]
    verbose: bool,

    /// Print machine-readable JSON instead of text
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print the effective parameters as TOML
    Config,
    /// Feed random judgments and questions, run cycles, print statistics
    Simulate {
        /// Cycles to run in total, split across workers
        #[arg(long, default_value_t = 200)]
        cycles: u64,
        /// Number of atomic terms to draw statements from
        #[arg(long, default_value_t = 8)]
        vocabulary: usize,
        /// Seed for input generation and bag sampling
        #[arg(long, default_value_t = 42)]
        seed: u64,
        /// Threads driving cycles against the shared memory
        #[arg(long, default_value_t = 1)]
        workers: usize,
    },
}

#[derive(Serialize)]
struct Report {
    #[serde(flatten)]
    stats: MemoryStats,
    inputs: usize,
    answers: usize,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match &cli.command {
        Command::Config => cmd_config(&cli),
        Command::Simulate {
            cycles,
            vocabulary,
            seed,
            workers,
        } => cmd_simulate(&cli, *cycles, *vocabulary, *seed, *workers),
    }
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::from_default_env().add_directive(tracing::Level::WARN.into())
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();
}

fn load_params(path: Option<&Path>) -> Result<Parameters> {
    let params = match path {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("failed to read {}", path.display()))?;
            toml::from_str::<Parameters>(&text)
                .with_context(|| format!("failed to parse {}", path.display()))?
        }
        None => Parameters::default(),
    };
    params.validate().context("invalid parameters")?;
    Ok(params)
}

fn cmd_config(cli: &Cli) -> Result<()> {
    let params = load_params(cli.config.as_deref())?;
    if cli.json {
        println!("{}", serde_json::to_string_pretty(&params)?);
    } else {
        print!(
            "{}",
            toml::to_string_pretty(&params).context("failed to serialize parameters")?
        );
    }
    Ok(())
}

fn cmd_simulate(
    cli: &Cli,
    cycles: u64,
    vocabulary: usize,
    seed: u64,
    workers: usize,
) -> Result<()> {
    anyhow::ensure!(vocabulary >= 3, "vocabulary must hold at least three atoms");
    anyhow::ensure!(workers >= 1, "workers must be at least one");

    let mut params = load_params(cli.config.as_deref())?;
    params.rng_seed = Some(seed);
    let memory = Memory::new(params).context("failed to create memory")?;

    let answers = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&answers);
    memory.events().subscribe(move |event| {
        if event.kind() == EventKind::Answer {
            counter.fetch_add(1, Ordering::Relaxed);
        }
    });

    let mut rng = SmallRng::seed_from_u64(seed);
    let atoms: Vec<Term> = (0..vocabulary)
        .map(|i| Term::named(&format!("w{i}")))
        .collect::<Result<_, _>>()
        .context("failed to build vocabulary")?;

    let mut inputs = 0;
    for task in generate_tasks(&memory, &atoms, &mut rng)? {
        memory.input(task);
        inputs += 1;
    }
    info!(inputs, concepts = memory.concept_count(), "input complete");

    let per_worker = cycles / workers as u64;
    let remainder = cycles % workers as u64;
    std::thread::scope(|s| {
        for w in 0..workers as u64 {
            let memory = &memory;
            let share = per_worker + u64::from(w < remainder);
            s.spawn(move || {
                for _ in 0..share {
                    memory.cycle(&Passive);
                }
            });
        }
    });

    let report = Report {
        stats: memory.stats(),
        inputs,
        answers: answers.load(Ordering::Relaxed),
    };

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        let stats = &report.stats;
        println!("time:        {}", stats.time);
        println!("inputs:      {}", report.inputs);
        println!("concepts:    {}", stats.concepts);
        println!("task links:  {}", stats.task_links);
        println!("term links:  {}", stats.term_links);
        println!("beliefs:     {}", stats.beliefs);
        println!("questions:   {}", stats.questions);
        println!(
            "balance:     task={:.4}, term={:.4}",
            stats.task_balance, stats.term_balance
        );
        println!("answers:     {}", report.answers);
    }
    Ok(())
}

/// Two random inheritance judgments per atom, a product relation and an
/// implication per pair of atoms, then questions about stored statements.
fn generate_tasks(memory: &Memory, atoms: &[Term], rng: &mut SmallRng) -> Result<Vec<Arc<Task>>> {
    let mut tasks = Vec::new();
    let mut statements = Vec::new();

    for _ in 0..atoms.len() * 2 {
        let (s, p) = distinct_pair(atoms, rng);
        let statement = Term::inheritance(s.clone(), p.clone())?;
        let truth = TruthValue::new(rng.random_range(0.6..=1.0), 0.9);
        tasks.push(Task::new(
            Sentence::judgment(statement.clone(), truth, memory.new_stamp(None)),
            Budget::new(rng.random_range(0.5..0.9), 0.8, 0.5),
        ));
        statements.push(statement);
    }

    for _ in 0..atoms.len() / 2 {
        let picked = rand::seq::index::sample(rng, atoms.len(), 3);
        let (a, b, c) = (
            &atoms[picked.index(0)],
            &atoms[picked.index(1)],
            &atoms[picked.index(2)],
        );
        let product = Term::product(vec![a.clone(), b.clone()])?;
        let relation = Term::inheritance(product, c.clone())?;
        let rule = Term::implication(
            Term::inheritance(a.clone(), c.clone())?,
            Term::inheritance(b.clone(), c.clone())?,
        )?;
        for term in [relation, rule] {
            tasks.push(Task::new(
                Sentence::judgment(term, TruthValue::new(0.9, 0.8), memory.new_stamp(None)),
                Budget::new(0.7, 0.7, 0.6),
            ));
        }
    }

    for _ in 0..atoms.len() {
        let statement = statements[rng.random_range(0..statements.len())].clone();
        tasks.push(Task::new(
            Sentence::question(statement, memory.new_stamp(None)),
            Budget::new(0.9, 0.9, 0.9),
        ));
    }
    Ok(tasks)
}

fn distinct_pair<'a>(atoms: &'a [Term], rng: &mut SmallRng) -> (&'a Term, &'a Term) {
    let i = rng.random_range(0..atoms.len());
    let offset = rng.random_range(1..atoms.len());
    (&atoms[i], &atoms[(i + offset) % atoms.len()])
}
